/*!

The three daily movement phases. Each phase empties every node, sends every person to the
destination the phase (and any confinement) dictates, and then applies infection over the new
occupancy, splitting large venues into rooms where a subgroup size is configured.

*/

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Display};

use crate::context::Context;
use crate::define_rng;
use crate::error::SimulationError;
use crate::history::ContextHistoryExt;
use crate::interventions::{confinement, is_commuter, open_social_choices, Confinement, SocialChoice};
use crate::nodes::{ContextNodesExt, NodeCategory};
use crate::parameters::{ContextParametersExt, Parameters, PhaseHours};
use crate::people::ContextPeopleExt;
use crate::random::ContextRandomExt;
use crate::transmission::{ContextTransmissionExt, InfectionOutcome, Room};
use crate::{NodeId, PersonId};

define_rng!(MovementRng);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Work,
    Social,
    Home,
}

impl Phase {
    /// Phases in the order they run each day.
    pub const ALL: [Phase; 3] = [Phase::Work, Phase::Social, Phase::Home];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::Social => "social",
            Phase::Home => "home",
        }
    }

    #[must_use]
    pub fn hours(self, phase_hours: &PhaseHours) -> f64 {
        match self {
            Phase::Work => phase_hours.work,
            Phase::Social => phase_hours.social,
            Phase::Home => phase_hours.home,
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A person whose location changed during a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Movement {
    pub person: PersonId,
    pub from: NodeId,
    pub to: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSummary {
    pub phase: Phase,
    pub transport_riders: usize,
    /// Rooms in which infection was evaluated, including the commute.
    pub rooms: usize,
    pub newly_exposed: Vec<PersonId>,
    pub movements: Vec<Movement>,
}

impl PhaseSummary {
    fn new(phase: Phase) -> Self {
        PhaseSummary {
            phase,
            transport_riders: 0,
            rooms: 0,
            newly_exposed: Vec::new(),
            movements: Vec::new(),
        }
    }

    fn absorb(&mut self, outcome: InfectionOutcome) {
        self.rooms += 1;
        self.newly_exposed.extend(outcome.newly_exposed);
    }
}

pub trait ContextMovementExt {
    /// Runs one movement phase followed by infection over the resulting occupancy.
    fn move_and_infect(&mut self, phase: Phase) -> Result<PhaseSummary, SimulationError>;
}

trait ContextMovementInternalExt {
    fn ride_public_transport(
        &mut self,
        parameters: &Parameters,
        summary: &mut PhaseSummary,
    ) -> Result<(), SimulationError>;
    fn relocate_everyone(
        &mut self,
        phase: Phase,
        parameters: &Parameters,
        summary: &mut PhaseSummary,
    ) -> Result<(), SimulationError>;
    fn infect_at_node(
        &mut self,
        node_id: NodeId,
        parameters: &Parameters,
        duration_hours: f64,
        summary: &mut PhaseSummary,
    ) -> Result<(), SimulationError>;
    fn log_infection(&mut self, parameters: &Parameters, room: &Room, outcome: &InfectionOutcome);
}

impl ContextMovementInternalExt for Context {
    fn ride_public_transport(
        &mut self,
        parameters: &Parameters,
        summary: &mut PhaseSummary,
    ) -> Result<(), SimulationError> {
        let profile = parameters.physics_params.transport;
        let mut riders = Vec::new();
        for person_id in self.people_ids() {
            let person = *self.get_person(person_id)?;
            let commutes = is_commuter(&person, self.get_node(person.work)?);
            if commutes && self.sample_bool::<MovementRng>(profile.ridership) {
                riders.push(person_id);
            }
        }
        if riders.is_empty() {
            return Ok(());
        }

        summary.transport_riders = riders.len();
        self.log_message(format!(
            "  {} people are using public transport.",
            riders.len()
        ));
        let room = Room::new(NodeCategory::Transport, riders);
        let outcome = self.apply_infection(&room, profile.duration_hours)?;
        self.log_infection(parameters, &room, &outcome);
        summary.absorb(outcome);
        Ok(())
    }

    fn relocate_everyone(
        &mut self,
        phase: Phase,
        parameters: &Parameters,
        summary: &mut PhaseSummary,
    ) -> Result<(), SimulationError> {
        let hospitals = self.nodes_of_category(NodeCategory::Hospital);
        let social_choices = open_social_choices(parameters);
        let social_weights: Vec<f64> = social_choices.iter().map(|(_, weight)| *weight).collect();
        let venues: BTreeMap<NodeCategory, Vec<NodeId>> = social_choices
            .iter()
            .filter_map(|(choice, _)| match choice {
                SocialChoice::Venue(category) => {
                    Some((*category, self.nodes_of_category(*category)))
                }
                SocialChoice::Home => None,
            })
            .collect();

        self.clear_occupancy();
        for person_id in self.people_ids() {
            let person = *self.get_person(person_id)?;
            let destination = match confinement(&person, !hospitals.is_empty()) {
                Some(Confinement::Home) => person.home,
                Some(Confinement::Hospital) => self
                    .sample_choice::<MovementRng, NodeId>(&hospitals)
                    .unwrap_or(person.home),
                None => match phase {
                    Phase::Work => person.work,
                    Phase::Home => person.home,
                    Phase::Social => {
                        let index = self.sample_weighted::<MovementRng>(&social_weights);
                        match social_choices[index].0 {
                            SocialChoice::Home => person.home,
                            SocialChoice::Venue(category) => venues
                                .get(&category)
                                .and_then(|nodes| self.sample_choice::<MovementRng, NodeId>(nodes))
                                .unwrap_or(person.home),
                        }
                    }
                },
            };

            if destination != person.location {
                summary.movements.push(Movement {
                    person: person_id,
                    from: person.location,
                    to: destination,
                });
            }
            self.set_location(person_id, destination)?;
            self.place_person(person_id, destination)?;
        }
        Ok(())
    }

    fn infect_at_node(
        &mut self,
        node_id: NodeId,
        parameters: &Parameters,
        duration_hours: f64,
        summary: &mut PhaseSummary,
    ) -> Result<(), SimulationError> {
        let node = self.get_node(node_id)?;
        let category = node.category;
        let label = node.label.clone();
        let mut occupants = node.occupants.clone();

        let mut n_infectious = 0;
        for person_id in &occupants {
            if self.get_person(*person_id)?.disease_state.is_contagious() {
                n_infectious += 1;
            }
        }
        self.log_message(format!(
            "  At node {label}: {} people ({n_infectious} infectious).",
            occupants.len()
        ));

        match parameters.subgroup_size(category) {
            Some(room_size) => {
                self.sample_shuffle::<MovementRng, _>(&mut occupants);
                self.log_message(format!(
                    "    -> Dividing into 'rooms' of ~{room_size} people."
                ));
                for (i, members) in occupants.chunks(room_size).enumerate() {
                    let room = Room::new(category, members.to_vec());
                    let outcome = self.apply_infection(&room, duration_hours)?;
                    if !outcome.newly_exposed.is_empty() {
                        self.log_message(format!(
                            "      - In Room #{}: {} new person(s) exposed.",
                            i + 1,
                            outcome.newly_exposed.len()
                        ));
                    }
                    self.log_infection(parameters, &room, &outcome);
                    summary.absorb(outcome);
                }
            }
            None => {
                let room = Room::new(category, occupants);
                let outcome = self.apply_infection(&room, duration_hours)?;
                self.log_infection(parameters, &room, &outcome);
                summary.absorb(outcome);
            }
        }
        Ok(())
    }

    fn log_infection(&mut self, parameters: &Parameters, room: &Room, outcome: &InfectionOutcome) {
        if outcome.newly_exposed.is_empty() {
            return;
        }
        let Some(environment) = parameters.environment(room.category) else {
            return;
        };
        self.log_message(format!(
            "      - Infection calc: Prob={:.4}, N_I={}, V={}, ACH={:.1} -> {} exposed.",
            outcome.probability,
            outcome.n_infectious,
            environment.volume,
            environment.ventilation_rate * 3600.0,
            outcome.newly_exposed.len()
        ));
    }
}

impl ContextMovementExt for Context {
    fn move_and_infect(&mut self, phase: Phase) -> Result<PhaseSummary, SimulationError> {
        let parameters = self.get_parameters()?;
        let mut summary = PhaseSummary::new(phase);
        let mut title = phase.name().to_string();
        title[..1].make_ascii_uppercase();
        self.log_message(format!("--- Turn: {title} ---"));

        // Riders share the commute before anyone arrives at work.
        if phase == Phase::Work && parameters.public_transport_on {
            self.ride_public_transport(&parameters, &mut summary)?;
        }
        self.relocate_everyone(phase, &parameters, &mut summary)?;

        let duration_hours = phase.hours(&parameters.phase_hours);
        self.log_message(format!("Applying infection for {duration_hours} hours..."));
        for node_id in self.occupied_nodes() {
            self.infect_at_node(node_id, &parameters, duration_hours, &mut summary)?;
        }
        Ok(summary)
    }
}
