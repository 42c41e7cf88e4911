/*!

Builds the city for a run: neighborhoods, the location graph, the synthetic population with its
home and work anchors, and the initial epidemic (seeded cases, prior immunity and vaccination).

Everything is drawn from the `PopulationRng` and `VaccinationRng` streams, so a world is fully
determined by its parameters.

*/

use log::info;

use crate::context::Context;
use crate::define_rng;
use crate::error::SimulationError;
use crate::history::ContextHistoryExt;
use crate::interventions::ContextInterventionsExt;
use crate::nodes::{ContextNodesExt, NeighborhoodId, NodeCategory};
use crate::parameters::{ContextParametersExt, Parameters};
use crate::people::{AgeGroup, ContextPeopleExt, DiseaseState, Employment, PersonInit};
use crate::random::ContextRandomExt;
use crate::NodeId;

define_rng!(PopulationRng);

/// Sizes of the constructed world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldSummary {
    pub neighborhoods: usize,
    pub nodes: usize,
    pub people: usize,
    pub initially_infectious: usize,
    pub initially_removed: usize,
    pub vaccinated: usize,
    pub immunized: usize,
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn scaled_count(total_population: usize, fraction: f64) -> usize {
    (total_population as f64 * fraction).floor() as usize
}

/// Number of neighborhoods, at least one and never more than there are people.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub(crate) fn neighborhood_count(parameters: &Parameters) -> usize {
    let total = parameters.total_population;
    ((total as f64 / parameters.neighborhood_population).ceil() as usize).clamp(1, total.max(1))
}

/// Number of nodes of a category for the given density per 10,000 people.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub(crate) fn node_count_for(total_population: usize, density_per_10k: f64) -> usize {
    (total_population as f64 * density_per_10k / 10_000.0).ceil() as usize
}

pub trait ContextWorldBuilderExt {
    /// Constructs the world described by the context's parameters. Requires `init_parameters`
    /// (and, for reproducibility, `init_random`) to have been called.
    ///
    /// Fails with a `ConstructionError` if no household is created.
    fn build_world(&mut self) -> Result<WorldSummary, SimulationError>;
}

trait ContextWorldBuilderInternalExt {
    fn create_neighborhoods(&mut self, parameters: &Parameters) -> Vec<NeighborhoodId>;
    fn create_nodes(
        &mut self,
        parameters: &Parameters,
        neighborhoods: &[NeighborhoodId],
    ) -> Result<(), SimulationError>;
    fn create_people(
        &mut self,
        parameters: &Parameters,
        neighborhoods: &[NeighborhoodId],
    ) -> Result<(), SimulationError>;
    fn seed_initial_states(&mut self, parameters: &Parameters)
        -> Result<(usize, usize), SimulationError>;
}

impl ContextWorldBuilderInternalExt for Context {
    fn create_neighborhoods(&mut self, parameters: &Parameters) -> Vec<NeighborhoodId> {
        (0..neighborhood_count(parameters))
            .map(|_| self.add_neighborhood())
            .collect()
    }

    fn create_nodes(
        &mut self,
        parameters: &Parameters,
        neighborhoods: &[NeighborhoodId],
    ) -> Result<(), SimulationError> {
        for category in NodeCategory::ALL {
            let density = parameters
                .node_density
                .get(&category)
                .copied()
                .unwrap_or(0.0);
            for i in 0..node_count_for(parameters.total_population, density) {
                let neighborhood = category
                    .is_neighborhood_local()
                    .then(|| neighborhoods[i % neighborhoods.len()]);
                self.add_node(category, neighborhood)?;
            }
        }
        Ok(())
    }

    fn create_people(
        &mut self,
        parameters: &Parameters,
        neighborhoods: &[NeighborhoodId],
    ) -> Result<(), SimulationError> {
        let households = self.nodes_of_category(NodeCategory::Household);
        let age_weights = parameters.age_of_population.distribution();
        let (roles, role_weights): (Vec<Employment>, Vec<f64>) = parameters
            .employment_distribution
            .iter()
            .map(|(role, weight)| (*role, *weight))
            .unzip();

        let total = parameters.total_population;
        let per_neighborhood = (total / neighborhoods.len()).max(1);
        for i in 0..total {
            // Any remainder joins the last neighborhood.
            let neighborhood = neighborhoods[(i / per_neighborhood).min(neighborhoods.len() - 1)];

            let age_group = AgeGroup::ALL[self.sample_weighted::<PopulationRng>(&age_weights)];
            let employment = match age_group {
                AgeGroup::Child => Employment::Student,
                AgeGroup::Senior => Employment::Retired,
                AgeGroup::Adult => roles[self.sample_weighted::<PopulationRng>(&role_weights)],
            };

            let home = self
                .sample_choice::<PopulationRng, NodeId>(&households)
                .ok_or_else(|| {
                    SimulationError::ConstructionError("no household nodes".to_string())
                })?;
            let work = match employment.workplace_category() {
                Some(category) => {
                    let workplaces = self.nodes_of_category(category);
                    self.sample_choice::<PopulationRng, NodeId>(&workplaces)
                        .unwrap_or(home)
                }
                None => home,
            };

            self.add_person(PersonInit {
                neighborhood,
                age_group,
                employment,
                home,
                work,
            })?;
        }
        Ok(())
    }

    fn seed_initial_states(
        &mut self,
        parameters: &Parameters,
    ) -> Result<(usize, usize), SimulationError> {
        let mut person_ids = self.people_ids();
        self.sample_shuffle::<PopulationRng, _>(&mut person_ids);

        let n_infectious = scaled_count(person_ids.len(), parameters.percentage_infected);
        let n_removed = scaled_count(person_ids.len(), parameters.percentage_removed);
        for (i, person_id) in person_ids.into_iter().enumerate() {
            if i < n_infectious {
                self.seed_disease_state(person_id, DiseaseState::Infectious)?;
            } else if i < n_infectious + n_removed {
                self.seed_disease_state(person_id, DiseaseState::Removed)?;
            } else {
                break;
            }
        }
        Ok((n_infectious, n_removed))
    }
}

impl ContextWorldBuilderExt for Context {
    fn build_world(&mut self) -> Result<WorldSummary, SimulationError> {
        let parameters = self.get_parameters()?;
        self.log_message("--- Initializing Simulation World ---");

        let neighborhoods = self.create_neighborhoods(&parameters);
        self.create_nodes(&parameters, &neighborhoods)?;
        if self.nodes_of_category(NodeCategory::Household).is_empty() {
            return Err(SimulationError::ConstructionError(
                "cannot assign homes, no household nodes were created; check node_density"
                    .to_string(),
            ));
        }
        self.create_people(&parameters, &neighborhoods)?;

        let (initially_infectious, initially_removed) = self.seed_initial_states(&parameters)?;
        let vaccination = self.apply_vaccination()?;

        let summary = WorldSummary {
            neighborhoods: neighborhoods.len(),
            nodes: self.node_count(),
            people: self.get_current_population(),
            initially_infectious,
            initially_removed,
            vaccinated: vaccination.vaccinated,
            immunized: vaccination.immunized,
        };
        info!("built world: {summary:?}");
        self.log_message(format!(
            "Created {} people in {} neighborhoods with {} locations.",
            summary.people, summary.neighborhoods, summary.nodes
        ));
        self.log_message(format!(
            "Seeded {} infectious and {} removed; vaccinated {} ({} immune).",
            summary.initially_infectious,
            summary.initially_removed,
            summary.vaccinated,
            summary.immunized
        ));
        self.log_message("--- Initialization Complete ---");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::people::Person;
    use std::collections::BTreeMap;

    fn build(parameters: Parameters) -> Result<(Context, WorldSummary), SimulationError> {
        let mut context = Context::new();
        context.init_random(parameters.seed);
        context.init_parameters(parameters)?;
        let summary = context.build_world()?;
        Ok((context, summary))
    }

    fn everyone(context: &Context) -> Vec<Person> {
        context
            .people_ids()
            .into_iter()
            .map(|id| *context.get_person(id).unwrap())
            .collect()
    }

    #[test]
    fn world_has_expected_shape() {
        let (context, summary) = build(Parameters {
            total_population: 1000,
            ..Parameters::default()
        })
        .unwrap();

        // ceil(1000 / (10000 / 15)) = 2
        assert_eq!(summary.neighborhoods, 2);
        assert_eq!(summary.people, 1000);
        assert_eq!(context.nodes_of_category(NodeCategory::Household).len(), 800);
        assert_eq!(context.nodes_of_category(NodeCategory::Restaurant).len(), 5);
        assert_eq!(context.nodes_of_category(NodeCategory::School).len(), 1);
        assert_eq!(context.nodes_of_category(NodeCategory::Hospital).len(), 1);

        for node_id in context.nodes_of_category(NodeCategory::Shop) {
            assert!(context.get_node(node_id).unwrap().neighborhood.is_some());
        }
        for node_id in context.nodes_of_category(NodeCategory::Office) {
            assert!(context.get_node(node_id).unwrap().neighborhood.is_none());
        }

        let members: usize = (0..summary.neighborhoods)
            .map(|n| context.get_neighborhood(NeighborhoodId(n)).unwrap().people.len())
            .sum();
        assert_eq!(members, 1000);
    }

    #[test]
    fn everyone_starts_at_home() {
        let (context, _) = build(Parameters {
            total_population: 500,
            ..Parameters::default()
        })
        .unwrap();

        let people = everyone(&context);
        for person in &people {
            assert_eq!(person.location, person.home);
            let home = context.get_node(person.home).unwrap();
            assert_eq!(home.category, NodeCategory::Household);
            assert!(home.occupants.contains(&person.id));
        }
        let placed: usize = context
            .nodes_of_category(NodeCategory::Household)
            .into_iter()
            .map(|id| context.get_node(id).unwrap().occupants.len())
            .sum();
        assert_eq!(placed, 500);
    }

    #[test]
    fn roles_follow_age_and_workplaces_exist() {
        let (context, _) = build(Parameters {
            total_population: 2000,
            ..Parameters::default()
        })
        .unwrap();

        for person in everyone(&context) {
            match person.age_group {
                AgeGroup::Child => assert_eq!(person.employment, Employment::Student),
                AgeGroup::Senior => assert_eq!(person.employment, Employment::Retired),
                AgeGroup::Adult => assert!(!person.employment.is_age_determined()),
            }
            let work = context.get_node(person.work).unwrap();
            match person.employment.workplace_category() {
                Some(category) => assert_eq!(work.category, category),
                None => assert_eq!(person.work, person.home),
            }
        }
    }

    #[test]
    fn missing_workplaces_fall_back_to_home() {
        let mut node_density = BTreeMap::new();
        node_density.insert(NodeCategory::Household, 8000.0);
        let (context, _) = build(Parameters {
            total_population: 300,
            node_density,
            ..Parameters::default()
        })
        .unwrap();

        for person in everyone(&context) {
            assert_eq!(person.work, person.home);
        }
    }

    #[test]
    fn initial_states_are_seeded_by_fraction() {
        let (context, summary) = build(Parameters {
            total_population: 1000,
            percentage_infected: 0.01,
            percentage_removed: 0.05,
            ..Parameters::default()
        })
        .unwrap();

        assert_eq!(summary.initially_infectious, 10);
        assert_eq!(summary.initially_removed, 50);
        assert_eq!(context.count_people_in_state(DiseaseState::Infectious), 10);
        assert_eq!(context.count_people_in_state(DiseaseState::Removed), 50);
        assert_eq!(context.count_people_in_state(DiseaseState::Susceptible), 940);
    }

    #[test]
    fn perfect_vaccination_immunizes_all_remaining_susceptibles() {
        let mut parameters = Parameters {
            total_population: 400,
            percentage_infected: 0.05,
            percentage_removed: 0.0,
            ..Parameters::default()
        };
        parameters.preventative_measures.vaccination_percentage = 1.0;
        parameters.preventative_measures.vaccination_effectiveness = 1.0;
        let (context, summary) = build(parameters).unwrap();

        assert_eq!(summary.vaccinated, 380);
        assert_eq!(summary.immunized, 380);
        assert_eq!(context.count_people_in_state(DiseaseState::Susceptible), 0);
        assert_eq!(context.count_people_in_state(DiseaseState::Removed), 380);
    }

    #[test]
    fn failed_vaccination_still_marks_vaccinated() {
        let mut parameters = Parameters {
            total_population: 200,
            percentage_infected: 0.0,
            percentage_removed: 0.0,
            ..Parameters::default()
        };
        parameters.preventative_measures.vaccination_percentage = 0.5;
        parameters.preventative_measures.vaccination_effectiveness = 0.0;
        let (context, summary) = build(parameters).unwrap();

        assert_eq!(summary.vaccinated, 100);
        assert_eq!(summary.immunized, 0);
        let vaccinated = everyone(&context)
            .iter()
            .filter(|person| person.is_vaccinated)
            .count();
        assert_eq!(vaccinated, 100);
        assert_eq!(context.count_people_in_state(DiseaseState::Susceptible), 200);
    }

    #[test]
    fn no_households_is_a_construction_error() {
        let mut parameters = Parameters {
            total_population: 100,
            ..Parameters::default()
        };
        parameters
            .node_density
            .insert(NodeCategory::Household, 0.0);
        assert!(matches!(
            build(parameters),
            Err(SimulationError::ConstructionError(_))
        ));
    }

    #[test]
    fn same_seed_same_world() {
        let parameters = Parameters {
            total_population: 300,
            seed: 5,
            ..Parameters::default()
        };
        let (first, _) = build(parameters.clone()).unwrap();
        let (second, _) = build(parameters).unwrap();
        assert_eq!(everyone(&first), everyone(&second));
    }

    #[test]
    fn tiny_population_still_gets_a_home() {
        let (context, summary) = build(Parameters {
            total_population: 1,
            percentage_infected: 0.0,
            ..Parameters::default()
        })
        .unwrap();
        assert_eq!(summary.neighborhoods, 1);
        assert_eq!(context.nodes_of_category(NodeCategory::Household).len(), 1);
    }
}
