//! Per-day aggregate state counts and the textual event log of a run.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

use crate::context::{Context, DataPlugin};
use crate::people::{ContextPeopleExt, DiseaseState};

/// Number of people in each disease state. Serializes as a map from state name to count that
/// always contains all six states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    counts: [usize; 6],
}

impl StateCounts {
    #[must_use]
    pub fn get(&self, state: DiseaseState) -> usize {
        self.counts[state.index()]
    }

    pub fn set(&mut self, state: DiseaseState, count: usize) {
        self.counts[state.index()] = count;
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// People who are exposed, infectious or asymptomatic.
    #[must_use]
    pub fn active_infections(&self) -> usize {
        self.get(DiseaseState::Exposed)
            + self.get(DiseaseState::Infectious)
            + self.get(DiseaseState::Asymptomatic)
    }

    #[must_use]
    pub fn as_map(&self) -> BTreeMap<&'static str, usize> {
        DiseaseState::ALL
            .iter()
            .map(|state| (state.name(), self.get(*state)))
            .collect()
    }
}

impl Serialize for StateCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(DiseaseState::ALL.len()))?;
        for state in DiseaseState::ALL {
            map.serialize_entry(state.name(), &self.get(state))?;
        }
        map.end()
    }
}

#[derive(Default)]
struct HistoryData {
    days: Vec<StateCounts>,
    log: Vec<String>,
}

impl DataPlugin for HistoryData {
    const new: &'static dyn Fn() -> Self = &HistoryData::default;
}

pub trait ContextHistoryExt {
    /// Appends a line to the event log. The line is also emitted as a `trace` diagnostic.
    fn log_message(&mut self, message: impl Into<String>);

    /// Snapshots the current state counts as the next history entry.
    fn record_history(&mut self);

    /// One entry per completed day, oldest first.
    fn get_history(&self) -> &[StateCounts];

    fn get_log(&self) -> &[String];

    /// The last recorded day's counts, or the current counts if no day has been recorded.
    fn get_results(&self) -> StateCounts;
}

impl ContextHistoryExt for Context {
    fn log_message(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::trace!("{message}");
        self.get_data_container_mut::<HistoryData>().log.push(message);
    }

    fn record_history(&mut self) {
        let counts = self.get_state_counts();
        self.get_data_container_mut::<HistoryData>().days.push(counts);
    }

    fn get_history(&self) -> &[StateCounts] {
        self.get_data_container::<HistoryData>()
            .map(|data| data.days.as_slice())
            .unwrap_or_default()
    }

    fn get_log(&self) -> &[String] {
        self.get_data_container::<HistoryData>()
            .map(|data| data.log.as_slice())
            .unwrap_or_default()
    }

    fn get_results(&self) -> StateCounts {
        self.get_history()
            .last()
            .copied()
            .unwrap_or_else(|| self.get_state_counts())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_serialize_every_state() {
        let mut counts = StateCounts::default();
        counts.set(DiseaseState::Infectious, 3);
        counts.set(DiseaseState::Susceptible, 7);

        let value = serde_json::to_value(counts).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 6);
        assert_eq!(object["infectious"], 3);
        assert_eq!(object["dead"], 0);
        assert_eq!(counts.total(), 10);
        assert_eq!(counts.active_infections(), 3);
        assert_eq!(counts.as_map()["susceptible"], 7);
    }

    #[test]
    fn empty_context_has_no_history() {
        let mut context = Context::new();
        assert!(context.get_history().is_empty());
        assert_eq!(context.get_results().total(), 0);

        context.record_history();
        context.log_message("day one");
        assert_eq!(context.get_history().len(), 1);
        assert_eq!(context.get_log(), ["day one".to_string()]);
    }
}
