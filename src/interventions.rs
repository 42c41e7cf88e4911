/*!

Public health measures: vaccination at construction, quarantine and hospital care for detected
cases, closing venues to social visits and shutting down public transport.

Detection itself happens during disease progression; this module decides what a detected or
quarantined person is allowed to do.

*/

use log::debug;

use crate::context::Context;
use crate::define_rng;
use crate::error::SimulationError;
use crate::nodes::{Node, NodeCategory};
use crate::parameters::{ContextParametersExt, Parameters};
use crate::people::{ContextPeopleExt, DiseaseState, Person};
use crate::random::ContextRandomExt;

define_rng!(VaccinationRng);

/// Where a person may go during the social phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialChoice {
    Venue(NodeCategory),
    Home,
}

/// Relative popularity of social destinations before closures are applied.
pub const SOCIAL_WEIGHTS: [(SocialChoice, f64); 7] = [
    (SocialChoice::Venue(NodeCategory::Restaurant), 0.1),
    (SocialChoice::Venue(NodeCategory::Shop), 0.15),
    (SocialChoice::Venue(NodeCategory::Church), 0.05),
    (SocialChoice::Venue(NodeCategory::Theater), 0.05),
    (SocialChoice::Venue(NodeCategory::Stadium), 0.05),
    (SocialChoice::Venue(NodeCategory::PartyVenue), 0.1),
    (SocialChoice::Home, 0.5),
];

/// Social destinations that are currently allowed, with their weights. Home is always allowed,
/// so the result is never empty.
#[must_use]
pub fn open_social_choices(parameters: &Parameters) -> Vec<(SocialChoice, f64)> {
    SOCIAL_WEIGHTS
        .iter()
        .copied()
        .filter(|(choice, _)| match choice {
            SocialChoice::Venue(category) => parameters.is_open(*category),
            SocialChoice::Home => true,
        })
        .collect()
}

/// A destination imposed on a person regardless of the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confinement {
    Home,
    Hospital,
}

/// Quarantined people stay home, detected active cases are cared for in a hospital when the city
/// has one, and the dead stay where they lived.
#[must_use]
pub fn confinement(person: &Person, hospitals_available: bool) -> Option<Confinement> {
    if person.is_quarantined {
        Some(Confinement::Home)
    } else if person.needs_hospital() && hospitals_available {
        Some(Confinement::Hospital)
    } else if person.disease_state == DiseaseState::Dead {
        Some(Confinement::Home)
    } else {
        None
    }
}

/// Whether `person` could ride public transport to `work_node` today. Only quarantine keeps a
/// living commuter off the ride.
#[must_use]
pub fn is_commuter(person: &Person, work_node: &Node) -> bool {
    !person.is_quarantined
        && person.disease_state != DiseaseState::Dead
        && person.work != person.home
        && work_node.neighborhood.is_none()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VaccinationSummary {
    /// People who received a dose.
    pub vaccinated: usize,
    /// Vaccinated people who became immune.
    pub immunized: usize,
}

pub trait ContextInterventionsExt {
    /// Offers a dose to a random share of the still susceptible population. Every dosed person is
    /// marked vaccinated and becomes removed with probability equal to the vaccine effectiveness.
    fn apply_vaccination(&mut self) -> Result<VaccinationSummary, SimulationError>;
}

impl ContextInterventionsExt for Context {
    fn apply_vaccination(&mut self) -> Result<VaccinationSummary, SimulationError> {
        let parameters = self.get_parameters()?;
        let measures = &parameters.preventative_measures;

        let mut susceptible = self.query_people_in_state(DiseaseState::Susceptible);
        self.sample_shuffle::<VaccinationRng, _>(&mut susceptible);

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let target = (parameters.total_population as f64 * measures.vaccination_percentage)
            .floor() as usize;

        let mut summary = VaccinationSummary::default();
        for person_id in susceptible.into_iter().take(target) {
            self.set_vaccinated(person_id)?;
            summary.vaccinated += 1;
            if self.sample_bool::<VaccinationRng>(measures.vaccination_effectiveness) {
                self.seed_disease_state(person_id, DiseaseState::Removed)?;
                summary.immunized += 1;
            }
        }
        debug!(
            "vaccinated {} people, {} immune",
            summary.vaccinated, summary.immunized
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_almost_eq;
    use crate::nodes::NeighborhoodId;
    use crate::{NodeId, PersonId};

    fn person() -> Person {
        Person {
            id: PersonId(0),
            neighborhood: NeighborhoodId(0),
            age_group: crate::people::AgeGroup::Adult,
            employment: crate::people::Employment::OfficeWorker,
            disease_state: DiseaseState::Susceptible,
            days_in_state: 0,
            is_vaccinated: false,
            is_quarantined: false,
            is_detected: false,
            home: NodeId(0),
            work: NodeId(1),
            location: NodeId(0),
        }
    }

    fn office() -> Node {
        Node {
            id: NodeId(1),
            category: NodeCategory::Office,
            label: "o-0".to_string(),
            neighborhood: None,
            occupants: Vec::new(),
        }
    }

    #[test]
    fn closures_renormalize_over_open_choices() {
        let mut parameters = Parameters::default();
        assert_eq!(open_social_choices(&parameters).len(), 7);
        let total: f64 = SOCIAL_WEIGHTS.iter().map(|(_, weight)| weight).sum();
        assert_almost_eq!(total, 1.0, 1e-12);

        for open in parameters.active_nodes.values_mut() {
            *open = false;
        }
        assert_eq!(
            open_social_choices(&parameters),
            vec![(SocialChoice::Home, 0.5)]
        );

        parameters.active_nodes.insert(NodeCategory::Shop, true);
        let choices = open_social_choices(&parameters);
        assert_eq!(choices.len(), 2);
        assert!(choices.contains(&(SocialChoice::Venue(NodeCategory::Shop), 0.15)));
    }

    #[test]
    fn confinement_rules() {
        let mut p = person();
        assert_eq!(confinement(&p, true), None);

        p.disease_state = DiseaseState::Infectious;
        p.is_detected = true;
        assert_eq!(confinement(&p, true), Some(Confinement::Hospital));
        assert_eq!(confinement(&p, false), None);

        p.is_quarantined = true;
        assert_eq!(confinement(&p, true), Some(Confinement::Home));

        p.is_quarantined = false;
        p.disease_state = DiseaseState::Removed;
        assert_eq!(confinement(&p, true), None);

        p.disease_state = DiseaseState::Dead;
        assert_eq!(confinement(&p, true), Some(Confinement::Home));
    }

    #[test]
    fn commuters_work_city_wide() {
        let mut p = person();
        let mut work = office();
        assert!(is_commuter(&p, &work));

        // Detection alone does not keep anyone off the commute.
        p.disease_state = DiseaseState::Infectious;
        p.is_detected = true;
        assert!(is_commuter(&p, &work));

        p.is_quarantined = true;
        assert!(!is_commuter(&p, &work));
        p.is_quarantined = false;

        work.neighborhood = Some(NeighborhoodId(0));
        assert!(!is_commuter(&p, &work));
        work.neighborhood = None;

        p.work = p.home;
        assert!(!is_commuter(&p, &work));
    }
}
