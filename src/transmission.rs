use log::trace;

use crate::context::Context;
use crate::define_rng;
use crate::error::SimulationError;
use crate::nodes::NodeCategory;
use crate::parameters::ContextParametersExt;
use crate::people::{ContextPeopleExt, DiseaseState};
use crate::random::ContextRandomExt;
use crate::PersonId;

define_rng!(TransmissionRng);

/// A group of people sharing the same air for one phase: a whole node, one sub-group of a
/// partitioned node, or the riders of the commute.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub category: NodeCategory,
    pub members: Vec<PersonId>,
}

impl Room {
    #[must_use]
    pub fn new(category: NodeCategory, members: Vec<PersonId>) -> Self {
        Room { category, members }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfectionOutcome {
    /// Per-person infection probability that applied in the room.
    pub probability: f64,
    pub n_infectious: usize,
    pub n_susceptible: usize,
    pub newly_exposed: Vec<PersonId>,
}

pub trait ContextTransmissionExt {
    /// Runs one Bernoulli trial per susceptible member of `room` with the Wells-Riley probability
    /// for `duration_hours` of shared air, and moves the infected to `exposed`.
    fn apply_infection(
        &mut self,
        room: &Room,
        duration_hours: f64,
    ) -> Result<InfectionOutcome, SimulationError>;
}

impl ContextTransmissionExt for Context {
    fn apply_infection(
        &mut self,
        room: &Room,
        duration_hours: f64,
    ) -> Result<InfectionOutcome, SimulationError> {
        let mut susceptible = Vec::new();
        let mut n_infectious = 0;
        for person_id in &room.members {
            let state = self.get_person(*person_id)?.disease_state;
            if state == DiseaseState::Susceptible {
                susceptible.push(*person_id);
            } else if state.is_contagious() {
                n_infectious += 1;
            }
        }

        let mut outcome = InfectionOutcome {
            n_infectious,
            n_susceptible: susceptible.len(),
            ..InfectionOutcome::default()
        };
        if susceptible.is_empty() || n_infectious == 0 {
            return Ok(outcome);
        }

        let parameters = self.get_parameters()?;
        let Some(environment) = parameters.environment(room.category) else {
            return Ok(outcome);
        };
        outcome.probability = environment.infection_probability(
            n_infectious,
            duration_hours * 3600.0,
            parameters.infectivity,
        );
        if outcome.probability <= 0.0 {
            return Ok(outcome);
        }

        for person_id in susceptible {
            if self.sample_bool::<TransmissionRng>(outcome.probability) {
                self.set_disease_state(person_id, DiseaseState::Exposed)?;
                outcome.newly_exposed.push(person_id);
            }
        }
        trace!(
            "{} room: p={:.4}, {} infectious, {} exposed",
            room.category,
            outcome.probability,
            n_infectious,
            outcome.newly_exposed.len()
        );
        Ok(outcome)
    }
}
