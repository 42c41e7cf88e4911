use std::fmt::{self, Display};
use std::io;

use crate::people::DiseaseState;
use crate::{NodeId, PersonId};

/// Every fallible operation in the crate returns a `SimulationError`. Errors from the libraries we
/// call into are wrapped so that `?` works everywhere.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum SimulationError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    /// A configuration value failed validation.
    InvalidParameter(String),
    /// The world could not be built from the configuration.
    ConstructionError(String),
    /// A disease state change that is not an edge of the progression graph.
    InvalidTransition {
        person: PersonId,
        from: DiseaseState,
        to: DiseaseState,
    },
    UnknownNode(NodeId),
    UnknownPerson(PersonId),
    /// A previous day failed part-way, so the simulation state can no longer be trusted.
    SimulationAborted(String),
}

impl From<io::Error> for SimulationError {
    fn from(error: io::Error) -> Self {
        SimulationError::IoError(error)
    }
}

impl From<serde_json::Error> for SimulationError {
    fn from(error: serde_json::Error) -> Self {
        SimulationError::JsonError(error)
    }
}

impl From<String> for SimulationError {
    fn from(error: String) -> Self {
        SimulationError::InvalidParameter(error)
    }
}

impl From<&str> for SimulationError {
    fn from(error: &str) -> Self {
        SimulationError::InvalidParameter(error.to_string())
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::IoError(error) => Some(error),
            SimulationError::JsonError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimulationError::IoError(error) => write!(f, "I/O error: {error}"),
            SimulationError::JsonError(error) => write!(f, "invalid JSON: {error}"),
            SimulationError::InvalidParameter(message) => {
                write!(f, "invalid parameter: {message}")
            }
            SimulationError::ConstructionError(message) => {
                write!(f, "could not construct world: {message}")
            }
            SimulationError::InvalidTransition { person, from, to } => write!(
                f,
                "{person:?} cannot move from {} to {}",
                from.name(),
                to.name()
            ),
            SimulationError::UnknownNode(node_id) => write!(f, "no such node: {node_id:?}"),
            SimulationError::UnknownPerson(person_id) => {
                write!(f, "no such person: {person_id:?}")
            }
            SimulationError::SimulationAborted(message) => {
                write!(f, "simulation aborted: {message}")
            }
        }
    }
}
