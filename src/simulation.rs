/*!

Running a simulation day by day.

A day is disease progression followed by the work, social and home phases, after which the
state counts are appended to the history. [`ContextSimulationExt`] drives this on a bare
[`Context`]; [`Simulation`] owns a context and refuses to continue after a day has failed, so a
half-applied day is never reported as a result.

```
use airborne_city_sim::{Parameters, Simulation};

let parameters = Parameters {
    total_population: 300,
    ..Parameters::default()
};
let mut simulation = Simulation::new(parameters).unwrap();
simulation.run(3).unwrap();
assert_eq!(simulation.history().len(), 3);
assert_eq!(simulation.get_results().total(), 300);
```

*/

use log::{debug, error};
use serde::Serialize;

use crate::context::Context;
use crate::disease_progression::{ContextDiseaseProgressionExt, ProgressionSummary};
use crate::error::SimulationError;
use crate::history::{ContextHistoryExt, StateCounts};
use crate::movement::{ContextMovementExt, Phase, PhaseSummary};
use crate::nodes::{ContextNodesExt, NeighborhoodId, NodeCategory};
use crate::parameters::{ContextParametersExt, Parameters};
use crate::people::{ContextPeopleExt, DiseaseState};
use crate::random::ContextRandomExt;
use crate::world_builder::{ContextWorldBuilderExt, WorldSummary};
use crate::{NodeId, PersonId};

/// Everything that happened on one simulated day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayReport {
    pub day: u32,
    pub progression: ProgressionSummary,
    pub phases: Vec<PhaseSummary>,
    /// Counts at the end of the day, as appended to the history.
    pub counts: StateCounts,
}

impl DayReport {
    #[must_use]
    pub fn newly_exposed(&self) -> usize {
        self.phases
            .iter()
            .map(|phase| phase.newly_exposed.len())
            .sum()
    }
}

pub trait ContextSimulationExt {
    /// Seeds the random streams from `parameters.seed`, stores the parameters and builds the
    /// world.
    fn init_simulation(&mut self, parameters: Parameters) -> Result<WorldSummary, SimulationError>;

    /// Simulates the next day and records it in the history.
    fn run_one_day(&mut self) -> Result<DayReport, SimulationError>;

    fn run_days(&mut self, days: u32) -> Result<(), SimulationError>;
}

impl ContextSimulationExt for Context {
    fn init_simulation(&mut self, parameters: Parameters) -> Result<WorldSummary, SimulationError> {
        self.init_random(parameters.seed);
        self.init_parameters(parameters)?;
        self.build_world()
    }

    fn run_one_day(&mut self) -> Result<DayReport, SimulationError> {
        let day = self.advance_day();
        self.log_message(format!(
            "\n==================== DAY {day} ===================="
        ));

        let progression = self.update_disease_progression()?;
        let mut phases = Vec::with_capacity(Phase::ALL.len());
        for phase in Phase::ALL {
            phases.push(self.move_and_infect(phase)?);
        }
        self.record_history();

        let counts = self.get_results();
        debug!("day {day}: {:?}", counts.as_map());
        Ok(DayReport {
            day,
            progression,
            phases,
            counts,
        })
    }

    fn run_days(&mut self, days: u32) -> Result<(), SimulationError> {
        for _ in 0..days {
            self.run_one_day()?;
        }
        Ok(())
    }
}

/// One person as shown in a neighborhood view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidentView {
    pub id: PersonId,
    pub disease_state: DiseaseState,
    pub location: NodeId,
    pub location_label: String,
    pub is_quarantined: bool,
    pub is_detected: bool,
}

/// One location of a neighborhood with its current head count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationView {
    pub id: NodeId,
    pub category: NodeCategory,
    pub label: String,
    pub occupants: usize,
}

/// The current state of one neighborhood: its residents wherever they are and its own locations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborhoodSnapshot {
    pub neighborhood: NeighborhoodId,
    pub day: u32,
    pub residents: Vec<ResidentView>,
    pub locations: Vec<LocationView>,
}

/// An independent simulation run. Owns all of its state, including its random streams, so
/// separate runs can be executed on separate threads.
pub struct Simulation {
    context: Context,
    world: WorldSummary,
    aborted: Option<String>,
}

impl Simulation {
    /// Validates `parameters` and builds the world.
    pub fn new(parameters: Parameters) -> Result<Simulation, SimulationError> {
        let mut context = Context::new();
        let world = context.init_simulation(parameters)?;
        Ok(Simulation {
            context,
            world,
            aborted: None,
        })
    }

    fn guard<T>(
        &mut self,
        step: impl FnOnce(&mut Context) -> Result<T, SimulationError>,
    ) -> Result<T, SimulationError> {
        if let Some(reason) = &self.aborted {
            return Err(SimulationError::SimulationAborted(reason.clone()));
        }
        step(&mut self.context).inspect_err(|e| {
            error!("aborting run on day {}: {e}", self.context.get_current_day());
            self.aborted = Some(e.to_string());
        })
    }

    pub fn run_one_day(&mut self) -> Result<DayReport, SimulationError> {
        self.guard(|context| context.run_one_day())
    }

    /// Runs `days` more days and returns the whole history.
    pub fn run(&mut self, days: u32) -> Result<&[StateCounts], SimulationError> {
        for _ in 0..days {
            self.run_one_day()?;
        }
        Ok(self.history())
    }

    /// Runs a single movement phase without advancing the clock or recording history, for
    /// stepping through a day one phase at a time.
    pub fn run_phase(&mut self, phase: Phase) -> Result<PhaseSummary, SimulationError> {
        self.guard(|context| context.move_and_infect(phase))
    }

    /// Applies one day of disease progression without moving anyone.
    pub fn progress_disease(&mut self) -> Result<ProgressionSummary, SimulationError> {
        self.guard(|context| context.update_disease_progression())
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    #[must_use]
    pub fn day(&self) -> u32 {
        self.context.get_current_day()
    }

    #[must_use]
    pub fn world(&self) -> WorldSummary {
        self.world
    }

    #[must_use]
    pub fn history(&self) -> &[StateCounts] {
        self.context.get_history()
    }

    #[must_use]
    pub fn log(&self) -> &[String] {
        self.context.get_log()
    }

    /// The last day's counts, for aggregation across runs.
    #[must_use]
    pub fn get_results(&self) -> StateCounts {
        self.context.get_results()
    }

    /// Read access to the underlying context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn neighborhood_snapshot(
        &self,
        neighborhood_id: NeighborhoodId,
    ) -> Result<NeighborhoodSnapshot, SimulationError> {
        let neighborhood = self.context.get_neighborhood(neighborhood_id)?;

        let mut residents = Vec::with_capacity(neighborhood.people.len());
        for person_id in &neighborhood.people {
            let person = self.context.get_person(*person_id)?;
            residents.push(ResidentView {
                id: person.id,
                disease_state: person.disease_state,
                location: person.location,
                location_label: self.context.get_node(person.location)?.label.clone(),
                is_quarantined: person.is_quarantined,
                is_detected: person.is_detected,
            });
        }

        let mut locations = Vec::with_capacity(neighborhood.nodes.len());
        for node_id in &neighborhood.nodes {
            let node = self.context.get_node(*node_id)?;
            locations.push(LocationView {
                id: node.id,
                category: node.category,
                label: node.label.clone(),
                occupants: node.occupants.len(),
            });
        }

        Ok(NeighborhoodSnapshot {
            neighborhood: neighborhood_id,
            day: self.day(),
            residents,
            locations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::people::PersonInit;

    fn small(seed: u64) -> Parameters {
        Parameters {
            total_population: 400,
            seed,
            ..Parameters::default()
        }
    }

    #[test]
    fn each_day_is_recorded() {
        let mut simulation = Simulation::new(small(1)).unwrap();
        assert!(simulation.history().is_empty());

        let report = simulation.run_one_day().unwrap();
        assert_eq!(report.day, 1);
        assert_eq!(report.phases.len(), 3);
        assert_eq!(report.phases[0].phase, Phase::Work);
        assert_eq!(simulation.history(), &[report.counts]);

        simulation.run(4).unwrap();
        assert_eq!(simulation.day(), 5);
        assert_eq!(simulation.history().len(), 5);
        for counts in simulation.history() {
            assert_eq!(counts.total(), 400);
        }
    }

    #[test]
    fn log_has_day_and_turn_headers() {
        let mut simulation = Simulation::new(small(2)).unwrap();
        simulation.run_one_day().unwrap();
        let log = simulation.log();
        assert_eq!(log[0], "--- Initializing Simulation World ---");
        assert!(log.iter().any(|line| line.contains("DAY 1")));
        for turn in ["--- Turn: Work ---", "--- Turn: Social ---", "--- Turn: Home ---"] {
            assert!(log.iter().any(|line| line == turn), "missing {turn}");
        }
    }

    #[test]
    fn same_seed_same_history() {
        let mut first = Simulation::new(small(9)).unwrap();
        let mut second = Simulation::new(small(9)).unwrap();
        assert_eq!(first.run(6).unwrap(), second.run(6).unwrap());
        assert_eq!(first.log(), second.log());
    }

    #[test]
    fn failed_day_aborts_the_run() {
        // No parameters were ever stored, so the first day fails during progression.
        let mut simulation = Simulation {
            context: Context::new(),
            world: WorldSummary::default(),
            aborted: None,
        };
        assert!(simulation.run_one_day().is_err());
        assert!(simulation.is_aborted());
        assert!(simulation.history().is_empty());
        assert!(matches!(
            simulation.run_one_day(),
            Err(SimulationError::SimulationAborted(_))
        ));
        assert!(matches!(
            simulation.run_phase(Phase::Home),
            Err(SimulationError::SimulationAborted(_))
        ));
    }

    #[test]
    fn phases_can_be_stepped() {
        let mut simulation = Simulation::new(small(4)).unwrap();
        let work = simulation.run_phase(Phase::Work).unwrap();
        assert!(!work.movements.is_empty());
        for movement in &work.movements {
            let person = simulation.context().get_person(movement.person).unwrap();
            assert_eq!(movement.from, person.home);
            assert_eq!(movement.to, person.location);
        }
        simulation.progress_disease().unwrap();
        assert_eq!(simulation.day(), 0);
        assert!(simulation.history().is_empty());
    }

    #[test]
    fn neighborhood_snapshot_lists_residents_and_locations() {
        let simulation = Simulation::new(small(5)).unwrap();
        let snapshot = simulation
            .neighborhood_snapshot(NeighborhoodId(0))
            .unwrap();
        assert_eq!(snapshot.day, 0);
        assert_eq!(
            snapshot.residents.len(),
            simulation
                .context()
                .get_neighborhood(NeighborhoodId(0))
                .unwrap()
                .people
                .len()
        );
        assert!(
            snapshot
                .locations
                .iter()
                .all(|location| location.category.is_neighborhood_local())
        );
        for resident in &snapshot.residents {
            assert!(resident.location_label.starts_with("h-"));
        }
        assert!(simulation.neighborhood_snapshot(NeighborhoodId(99)).is_err());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["residents"].is_array());
    }

    #[test]
    fn people_added_after_construction_join_the_run() {
        let mut context = Context::new();
        context.init_simulation(small(6)).unwrap();
        let home = context.nodes_of_category(NodeCategory::Household)[0];
        let person_id = context
            .add_person(PersonInit {
                neighborhood: NeighborhoodId(0),
                age_group: crate::people::AgeGroup::Adult,
                employment: crate::people::Employment::FromHome,
                home,
                work: home,
            })
            .unwrap();
        context.run_days(2).unwrap();
        assert_eq!(context.get_history()[1].total(), 401);
        assert_eq!(context.get_person(person_id).unwrap().location, home);
    }
}
