use std::collections::BTreeSet;

use crate::history::StateCounts;
use crate::people::DiseaseState;
use crate::PersonId;

/// An index from disease state to the people currently in that state. Kept up to date on every
/// state change so that per-day snapshots and "who is contagious" queries never scan the whole
/// population.
#[derive(Debug, Default)]
pub(crate) struct StateIndex {
    members: [BTreeSet<PersonId>; 6],
}

impl StateIndex {
    pub(crate) fn add_person(&mut self, person_id: PersonId, state: DiseaseState) {
        self.members[state.index()].insert(person_id);
    }

    pub(crate) fn move_person(&mut self, person_id: PersonId, from: DiseaseState, to: DiseaseState) {
        let removed = self.members[from.index()].remove(&person_id);
        debug_assert!(removed, "{person_id:?} was not indexed under {from}");
        self.members[to.index()].insert(person_id);
    }

    /// People in `state`, in ascending id order.
    pub(crate) fn people_in(&self, state: DiseaseState) -> impl Iterator<Item = PersonId> + '_ {
        self.members[state.index()].iter().copied()
    }

    pub(crate) fn count(&self, state: DiseaseState) -> usize {
        self.members[state.index()].len()
    }

    pub(crate) fn counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for state in DiseaseState::ALL {
            counts.set(state, self.count(state));
        }
        counts
    }
}
