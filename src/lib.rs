/*!

An agent-based simulation of airborne disease spread through a synthetic city.

People live in households grouped into neighborhoods and move each day between their home, their
workplace and social venues. Wherever people share air, the chance that a susceptible person is
infected follows the Wells-Riley model for the venue's volume and ventilation. Infected people
progress through exposed, infectious or asymptomatic, and finally removed or dead.

All state of one run lives in a [`Context`] as typed data plugins, and every concern is exposed
as a `Context*Ext` extension trait. [`Simulation`] wraps a context for the common case of building
a world and running it for some days.

*/

pub mod context;
pub mod disease_progression;
pub mod error;
pub mod hashing;
pub mod history;
pub mod interventions;
pub mod log;
pub mod movement;
pub mod nodes;
pub mod numeric;
pub mod parameters;
pub mod people;
pub mod random;
pub mod runner;
pub mod simulation;
pub mod transmission;
pub mod wells_riley;
pub mod world_builder;

use serde::Serialize;

// All modules import `crate::TypeId` in case we want to change the underlying type of `TypeId`.
pub(crate) use std::any::TypeId;

pub use context::Context;
pub use error::SimulationError;
pub use history::StateCounts;
pub use parameters::Parameters;
pub use simulation::{ContextSimulationExt, Simulation};

// Re-exported so that `define_rng!` expands correctly in any crate.
pub use rand;

// Replace with `typeid::of as type_of` if necessary.
#[inline(always)]
pub fn type_of<T: 'static>() -> TypeId {
    TypeId::of::<T>()
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct PersonId(pub usize);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct NodeId(pub usize);
