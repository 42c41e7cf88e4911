use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::nodes::{NeighborhoodId, NodeCategory};
use crate::{NodeId, PersonId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    #[serde(alias = "1-18")]
    Child,
    #[serde(alias = "18-64")]
    Adult,
    #[serde(alias = "65+")]
    Senior,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 3] = [AgeGroup::Child, AgeGroup::Adult, AgeGroup::Senior];
}

/// What a person does during the work phase. Children are always students and seniors are
/// always retired; adults draw one of the remaining roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Employment {
    Student,
    Teacher,
    Clerk,
    FoodIndustry,
    OfficeWorker,
    HealthcareWorker,
    FromHome,
    Retired,
}

impl Employment {
    /// The kind of location this role works or studies at, or `None` for roles that stay home.
    #[must_use]
    pub fn workplace_category(self) -> Option<NodeCategory> {
        match self {
            Employment::Student | Employment::Teacher => Some(NodeCategory::School),
            Employment::Clerk => Some(NodeCategory::Shop),
            Employment::FoodIndustry => Some(NodeCategory::Restaurant),
            Employment::OfficeWorker => Some(NodeCategory::Office),
            Employment::HealthcareWorker => Some(NodeCategory::Hospital),
            Employment::FromHome | Employment::Retired => None,
        }
    }

    /// Roles that are assigned by age group rather than drawn from the employment distribution.
    #[must_use]
    pub fn is_age_determined(self) -> bool {
        matches!(self, Employment::Student | Employment::Retired)
    }
}

/// Clinical state of a person.
///
/// ```text
/// susceptible -> exposed -> infectious   -> removed
///                        \> asymptomatic \> dead
/// ```
///
/// `Removed` and `Dead` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiseaseState {
    Susceptible,
    Exposed,
    Infectious,
    Asymptomatic,
    Removed,
    Dead,
}

impl DiseaseState {
    pub const ALL: [DiseaseState; 6] = [
        DiseaseState::Susceptible,
        DiseaseState::Exposed,
        DiseaseState::Infectious,
        DiseaseState::Asymptomatic,
        DiseaseState::Removed,
        DiseaseState::Dead,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            DiseaseState::Susceptible => "susceptible",
            DiseaseState::Exposed => "exposed",
            DiseaseState::Infectious => "infectious",
            DiseaseState::Asymptomatic => "asymptomatic",
            DiseaseState::Removed => "removed",
            DiseaseState::Dead => "dead",
        }
    }

    /// Position in `ALL`, used to index per-state tables.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, DiseaseState::Removed | DiseaseState::Dead)
    }

    /// Whether a person in this state sheds infectious quanta.
    #[must_use]
    pub fn is_contagious(self) -> bool {
        matches!(self, DiseaseState::Infectious | DiseaseState::Asymptomatic)
    }

    /// The edges of the progression graph.
    #[must_use]
    pub fn can_transition_to(self, next: DiseaseState) -> bool {
        use DiseaseState::{Asymptomatic, Dead, Exposed, Infectious, Removed, Susceptible};
        matches!(
            (self, next),
            (Susceptible, Exposed)
                | (Exposed, Infectious | Asymptomatic)
                | (Infectious | Asymptomatic, Removed | Dead)
        )
    }
}

impl Display for DiseaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One agent of the synthetic population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Person {
    pub id: PersonId,
    pub neighborhood: NeighborhoodId,
    pub age_group: AgeGroup,
    pub employment: Employment,
    pub disease_state: DiseaseState,
    /// Days since the last disease state change.
    pub days_in_state: u32,
    pub is_vaccinated: bool,
    pub is_quarantined: bool,
    pub is_detected: bool,
    pub home: NodeId,
    pub work: NodeId,
    pub location: NodeId,
}

impl Person {
    /// A detected person who has not yet reached a terminal state is cared for in a hospital.
    #[must_use]
    pub fn needs_hospital(&self) -> bool {
        self.is_detected && !self.disease_state.is_terminal()
    }
}

/// Values needed to add a person. Everyone starts susceptible, unvaccinated and at home.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonInit {
    pub neighborhood: NeighborhoodId,
    pub age_group: AgeGroup,
    pub employment: Employment,
    pub home: NodeId,
    pub work: NodeId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progression_graph_edges() {
        use DiseaseState::*;
        assert!(Susceptible.can_transition_to(Exposed));
        assert!(Exposed.can_transition_to(Infectious));
        assert!(Exposed.can_transition_to(Asymptomatic));
        assert!(Infectious.can_transition_to(Dead));
        assert!(Asymptomatic.can_transition_to(Removed));

        assert!(!Susceptible.can_transition_to(Infectious));
        assert!(!Exposed.can_transition_to(Removed));
        assert!(!Infectious.can_transition_to(Asymptomatic));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for terminal in [DiseaseState::Removed, DiseaseState::Dead] {
            assert!(terminal.is_terminal());
            for next in DiseaseState::ALL {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn index_matches_position_in_all() {
        for (position, state) in DiseaseState::ALL.iter().enumerate() {
            assert_eq!(state.index(), position);
        }
    }

    #[test]
    fn workplaces_by_role() {
        assert_eq!(
            Employment::Teacher.workplace_category(),
            Some(NodeCategory::School)
        );
        assert_eq!(
            Employment::HealthcareWorker.workplace_category(),
            Some(NodeCategory::Hospital)
        );
        assert_eq!(Employment::Retired.workplace_category(), None);
        assert_eq!(Employment::FromHome.workplace_category(), None);
    }

    #[test]
    fn age_group_accepts_range_labels() {
        let child: AgeGroup = serde_json::from_str("\"1-18\"").unwrap();
        assert_eq!(child, AgeGroup::Child);
        let senior: AgeGroup = serde_json::from_str("\"senior\"").unwrap();
        assert_eq!(senior, AgeGroup::Senior);
    }
}
