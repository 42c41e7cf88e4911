/*!

Deterministic hashing for the containers the engine iterates over.

The standard library's `HashMap` is seeded randomly per process, which would make iteration order
(and therefore the order in which random numbers are consumed) differ between two runs with the
same seed. Everything in this crate uses the `rustc-hash` variants instead. Create them with
`HashMap::default()`.

*/

use rustc_hash::FxHasher;
use std::hash::Hasher;

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// A convenience method to compute the hash of a `&str`. Used to derive the seed of a named
/// random stream from the base seed.
pub fn hash_str(data: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data.as_bytes());
    hasher.finish()
}
