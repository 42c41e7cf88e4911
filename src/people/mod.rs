/*!

The synthetic population. Every person is a fixed-shape [`Person`] record; the plugin keeps the
records in id order alongside an index from disease state to people.

*/

mod context_ext;
mod index;
mod people_data;
mod person;

// `ContextPeopleExt` is the public API to `PeopleData`.
pub(crate) use people_data::PeopleData;

pub use context_ext::ContextPeopleExt;
pub use person::{AgeGroup, DiseaseState, Employment, Person, PersonInit};
