use crate::context::DataPlugin;
use crate::error::SimulationError;
use crate::people::index::StateIndex;
use crate::people::{DiseaseState, Person, PersonInit};
use crate::PersonId;

/// Stores all data associated to people.
#[derive(Default)]
pub(crate) struct PeopleData {
    // Indexed by `PersonId.0`. People are never removed, so ids stay dense.
    pub(crate) people: Vec<Person>,
    pub(crate) state_index: StateIndex,
}

impl DataPlugin for PeopleData {
    const new: &'static dyn Fn() -> Self = &PeopleData::default;
}

impl PeopleData {
    pub fn add_person(&mut self, init: PersonInit) -> PersonId {
        let person_id = PersonId(self.people.len());
        self.people.push(Person {
            id: person_id,
            neighborhood: init.neighborhood,
            age_group: init.age_group,
            employment: init.employment,
            disease_state: DiseaseState::Susceptible,
            days_in_state: 0,
            is_vaccinated: false,
            is_quarantined: false,
            is_detected: false,
            home: init.home,
            work: init.work,
            location: init.home,
        });
        self.state_index
            .add_person(person_id, DiseaseState::Susceptible);
        person_id
    }

    pub fn get_person(&self, person_id: PersonId) -> Result<&Person, SimulationError> {
        self.people
            .get(person_id.0)
            .ok_or(SimulationError::UnknownPerson(person_id))
    }

    pub fn get_person_mut(&mut self, person_id: PersonId) -> Result<&mut Person, SimulationError> {
        self.people
            .get_mut(person_id.0)
            .ok_or(SimulationError::UnknownPerson(person_id))
    }

    /// Changes the disease state without checking the progression graph. Resets the day counter
    /// and, on reaching a terminal state, lifts quarantine.
    pub(crate) fn force_disease_state(
        &mut self,
        person_id: PersonId,
        state: DiseaseState,
    ) -> Result<DiseaseState, SimulationError> {
        let person = self.get_person_mut(person_id)?;
        let previous = person.disease_state;
        person.disease_state = state;
        person.days_in_state = 0;
        if state.is_terminal() {
            person.is_quarantined = false;
        }
        self.state_index.move_person(person_id, previous, state);
        Ok(previous)
    }
}
