use log::trace;

use crate::{
    context::Context,
    error::SimulationError,
    history::StateCounts,
    nodes::ContextNodesExt,
    people::{DiseaseState, PeopleData, Person, PersonInit},
    NodeId, PersonId,
};

pub trait ContextPeopleExt {
    fn get_current_population(&self) -> usize;

    /// Adds a new susceptible person living at `init.home`. The person's current location is
    /// their home, and they are registered with their neighborhood.
    fn add_person(&mut self, init: PersonInit) -> Result<PersonId, SimulationError>;

    fn get_person(&self, person_id: PersonId) -> Result<&Person, SimulationError>;

    /// All person ids in ascending order.
    fn people_ids(&self) -> Vec<PersonId>;

    /// Moves a person along an edge of the progression graph, resetting their day counter.
    /// Returns an `InvalidTransition` error for any other change.
    fn set_disease_state(
        &mut self,
        person_id: PersonId,
        state: DiseaseState,
    ) -> Result<(), SimulationError>;

    /// Places a still-susceptible person directly into `state`. Only meant for seeding the
    /// initial outbreak and immunity while building the world.
    fn seed_disease_state(
        &mut self,
        person_id: PersonId,
        state: DiseaseState,
    ) -> Result<(), SimulationError>;

    fn query_people_in_state(&self, state: DiseaseState) -> Vec<PersonId>;
    fn count_people_in_state(&self, state: DiseaseState) -> usize;

    /// Counts of people in every disease state.
    fn get_state_counts(&self) -> StateCounts;

    fn set_vaccinated(&mut self, person_id: PersonId) -> Result<(), SimulationError>;
    fn set_detected(&mut self, person_id: PersonId, quarantine: bool)
        -> Result<(), SimulationError>;
    fn set_location(&mut self, person_id: PersonId, node_id: NodeId)
        -> Result<(), SimulationError>;

    /// Adds one to everyone's days-in-state counter.
    fn increment_days_in_state(&mut self);
}

impl ContextPeopleExt for Context {
    fn get_current_population(&self) -> usize {
        match self.get_data_container::<PeopleData>() {
            None => 0,
            Some(people_data) => people_data.people.len(),
        }
    }

    fn add_person(&mut self, init: PersonInit) -> Result<PersonId, SimulationError> {
        // Both anchors must exist so that a person's location is always a real node.
        self.get_node(init.home)?;
        self.get_node(init.work)?;
        self.get_neighborhood(init.neighborhood)?;

        let person_id = self.get_data_container_mut::<PeopleData>().add_person(init);
        self.add_to_neighborhood(init.neighborhood, person_id)?;
        self.place_person(person_id, init.home)?;
        Ok(person_id)
    }

    fn get_person(&self, person_id: PersonId) -> Result<&Person, SimulationError> {
        self.get_data_container::<PeopleData>()
            .ok_or(SimulationError::UnknownPerson(person_id))?
            .get_person(person_id)
    }

    fn people_ids(&self) -> Vec<PersonId> {
        (0..self.get_current_population()).map(PersonId).collect()
    }

    fn set_disease_state(
        &mut self,
        person_id: PersonId,
        state: DiseaseState,
    ) -> Result<(), SimulationError> {
        let current = self.get_person(person_id)?.disease_state;
        if !current.can_transition_to(state) {
            return Err(SimulationError::InvalidTransition {
                person: person_id,
                from: current,
                to: state,
            });
        }
        trace!("{person_id:?}: {current} -> {state}");
        self.get_data_container_mut::<PeopleData>()
            .force_disease_state(person_id, state)?;
        Ok(())
    }

    fn seed_disease_state(
        &mut self,
        person_id: PersonId,
        state: DiseaseState,
    ) -> Result<(), SimulationError> {
        let current = self.get_person(person_id)?.disease_state;
        if current != DiseaseState::Susceptible {
            return Err(SimulationError::InvalidTransition {
                person: person_id,
                from: current,
                to: state,
            });
        }
        self.get_data_container_mut::<PeopleData>()
            .force_disease_state(person_id, state)?;
        Ok(())
    }

    fn query_people_in_state(&self, state: DiseaseState) -> Vec<PersonId> {
        self.get_data_container::<PeopleData>()
            .map(|people_data| people_data.state_index.people_in(state).collect())
            .unwrap_or_default()
    }

    fn count_people_in_state(&self, state: DiseaseState) -> usize {
        self.get_data_container::<PeopleData>()
            .map_or(0, |people_data| people_data.state_index.count(state))
    }

    fn get_state_counts(&self) -> StateCounts {
        self.get_data_container::<PeopleData>()
            .map(|people_data| people_data.state_index.counts())
            .unwrap_or_default()
    }

    fn set_vaccinated(&mut self, person_id: PersonId) -> Result<(), SimulationError> {
        self.get_data_container_mut::<PeopleData>()
            .get_person_mut(person_id)?
            .is_vaccinated = true;
        Ok(())
    }

    fn set_detected(
        &mut self,
        person_id: PersonId,
        quarantine: bool,
    ) -> Result<(), SimulationError> {
        let person = self
            .get_data_container_mut::<PeopleData>()
            .get_person_mut(person_id)?;
        person.is_detected = true;
        if quarantine {
            person.is_quarantined = true;
        }
        Ok(())
    }

    fn set_location(
        &mut self,
        person_id: PersonId,
        node_id: NodeId,
    ) -> Result<(), SimulationError> {
        self.get_node(node_id)?;
        self.get_data_container_mut::<PeopleData>()
            .get_person_mut(person_id)?
            .location = node_id;
        Ok(())
    }

    fn increment_days_in_state(&mut self) {
        for person in &mut self.get_data_container_mut::<PeopleData>().people {
            person.days_in_state += 1;
        }
    }
}
