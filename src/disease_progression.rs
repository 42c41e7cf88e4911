use crate::context::Context;
use crate::define_rng;
use crate::error::SimulationError;
use crate::history::ContextHistoryExt;
use crate::parameters::ContextParametersExt;
use crate::people::{ContextPeopleExt, DiseaseState};
use crate::random::ContextRandomExt;

define_rng!(ProgressionRng);

/// What happened during one day of progression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressionSummary {
    pub became_infectious: usize,
    pub became_asymptomatic: usize,
    pub recovered: usize,
    pub died: usize,
    pub detected: usize,
    pub quarantined: usize,
}

pub trait ContextDiseaseProgressionExt {
    /// Advances every person's clinical course by one day.
    ///
    /// Every day-in-state counter is incremented first. Then, in id order, an exposed person past
    /// the incubation period becomes infectious or asymptomatic, and a contagious person past the
    /// infectious period dies or is removed. Finally each undetected symptomatic person may be
    /// detected, which also quarantines them when that policy is on.
    fn update_disease_progression(&mut self) -> Result<ProgressionSummary, SimulationError>;
}

impl ContextDiseaseProgressionExt for Context {
    fn update_disease_progression(&mut self) -> Result<ProgressionSummary, SimulationError> {
        let parameters = self.get_parameters()?;
        self.increment_days_in_state();

        let mut candidates = self.query_people_in_state(DiseaseState::Exposed);
        candidates.extend(self.query_people_in_state(DiseaseState::Infectious));
        candidates.extend(self.query_people_in_state(DiseaseState::Asymptomatic));
        candidates.sort_unstable();

        let mut summary = ProgressionSummary::default();
        for person_id in candidates {
            let person = *self.get_person(person_id)?;
            let mut state = person.disease_state;

            if state == DiseaseState::Exposed && person.days_in_state > parameters.time_of_incubation
            {
                state = if self.sample_bool::<ProgressionRng>(parameters.symptomatic_fraction) {
                    summary.became_infectious += 1;
                    DiseaseState::Infectious
                } else {
                    summary.became_asymptomatic += 1;
                    DiseaseState::Asymptomatic
                };
                self.set_disease_state(person_id, state)?;
            } else if state.is_contagious() && person.days_in_state > parameters.time_of_activation
            {
                state = if self.sample_bool::<ProgressionRng>(parameters.percentage_of_death) {
                    summary.died += 1;
                    DiseaseState::Dead
                } else {
                    summary.recovered += 1;
                    DiseaseState::Removed
                };
                self.set_disease_state(person_id, state)?;
            }

            if state == DiseaseState::Infectious
                && !person.is_detected
                && self.sample_bool::<ProgressionRng>(parameters.detection_of_disease_rate)
            {
                let quarantine = parameters.preventative_measures.quarantine_on_detection;
                self.set_detected(person_id, quarantine)?;
                summary.detected += 1;
                if quarantine {
                    summary.quarantined += 1;
                }
            }
        }

        self.log_message(format!(
            "Progression: {} became infectious, {} asymptomatic, {} removed, {} died, {} detected.",
            summary.became_infectious,
            summary.became_asymptomatic,
            summary.recovered,
            summary.died,
            summary.detected
        ));
        Ok(summary)
    }
}
