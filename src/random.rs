use crate::{
    context::{Context, DataPlugin},
    hashing::{hash_str, HashMap},
    type_of, TypeId,
};
use log::trace;
use rand::{
    distr::{
        uniform::{SampleRange, SampleUniform},
        weighted::WeightedIndex,
    },
    prelude::Distribution,
    seq::{IndexedRandom, SliceRandom},
    Rng, SeedableRng,
};
use std::any::Any;

/// A named random stream. Use `define_rng!` rather than implementing this by hand.
pub trait RngId: Any {
    #![allow(non_upper_case_globals)]
    const new: &'static dyn Fn(u64) -> Self;
    const name: &'static str;
    type RngType: SeedableRng + Rng;
    fn rng(&mut self) -> &mut Self::RngType;
}

struct RngPlugin {
    base_seed: u64,
    // Actually a `HashMap<TypeId, R: RngId>`.
    rng_map: HashMap<TypeId, Box<dyn Any>>,
}

impl RngPlugin {
    fn clear(&mut self) {
        self.rng_map.clear();
    }

    fn get_rng<R: RngId>(&mut self) -> &mut R::RngType {
        let base_seed = self.base_seed;
        self.rng_map
            .entry(type_of::<R>())
            .or_insert_with(|| {
                let seed_offset = base_seed.wrapping_add(hash_str(R::name));
                Box::new((R::new)(seed_offset))
            })
            .downcast_mut::<R>()
            .unwrap() // Only an `R` is ever stored under `type_of::<R>()`
            .rng()
    }
}

impl DataPlugin for RngPlugin {
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self = &|| RngPlugin {
        base_seed: 0,
        rng_map: HashMap::default(),
    };
}

/// Gets a mutable reference to the random number generator associated with the given
/// `RngId`.
// This is a private free function so that it's not leaked to the public API.
fn get_rng<R: RngId>(context: &mut Context) -> &mut R::RngType {
    context.get_data_container_mut::<RngPlugin>().get_rng::<R>()
}

pub trait ContextRandomExt {
    /// Sets the base seed of this context and discards every existing stream so that they are
    /// re-seeded on next use.
    fn init_random(&mut self, base_seed: u64);

    /// Gets a random sample from the random number generator associated with the given
    /// `RngId` by applying the specified sampler function. If the Rng has not been used
    /// before, one will be created from the base seed set in `init_random`.
    fn sample<R: RngId, T>(&mut self, sampler: impl FnOnce(&mut R::RngType) -> T) -> T;

    /// Gets a random sample within the range provided by `range`
    /// using the generator associated with the given `RngId`.
    fn sample_range<R: RngId, S, T>(&mut self, range: S) -> T
    where
        S: SampleRange<T>,
        T: SampleUniform;

    /// Gets a random boolean value which is true with probability `p`
    /// using the generator associated with the given `RngId`. `p` is clamped to `[0, 1]`.
    fn sample_bool<R: RngId>(&mut self, p: f64) -> bool;

    /// Draws an index into `weights` with probability proportional to its weight. The weights
    /// need not be normalized, but must be non-negative with a positive sum.
    fn sample_weighted<R: RngId>(&mut self, weights: &[f64]) -> usize;

    /// Picks one element of `items` uniformly, or `None` if it is empty.
    fn sample_choice<R: RngId, T: Copy>(&mut self, items: &[T]) -> Option<T>;

    /// Shuffles `items` in place.
    fn sample_shuffle<R: RngId, T>(&mut self, items: &mut [T]);
}

impl ContextRandomExt for Context {
    /// Initializes the `RngPlugin` data container to store rngs as well as a base
    /// seed. Note that rngs are created lazily when `get_rng` is called.
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module with seed {base_seed}");
        let rng_container = self.get_data_container_mut::<RngPlugin>();
        rng_container.base_seed = base_seed;

        // Clear any existing Rngs to ensure they get re-seeded when `get_rng` is called
        rng_container.clear();
    }

    fn sample<R: RngId, T>(&mut self, sampler: impl FnOnce(&mut R::RngType) -> T) -> T {
        let rng = get_rng::<R>(self);
        sampler(rng)
    }

    fn sample_range<R: RngId, S, T>(&mut self, range: S) -> T
    where
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample::<R, T>(|rng| rng.random_range(range))
    }

    fn sample_bool<R: RngId>(&mut self, p: f64) -> bool {
        let p = p.clamp(0.0, 1.0);
        self.sample::<R, bool>(|rng| rng.random_bool(p))
    }

    fn sample_weighted<R: RngId>(&mut self, weights: &[f64]) -> usize {
        let index = WeightedIndex::new(weights)
            .expect("weights must be non-negative with a positive sum");
        let rng = get_rng::<R>(self);
        index.sample(rng)
    }

    fn sample_choice<R: RngId, T: Copy>(&mut self, items: &[T]) -> Option<T> {
        let rng = get_rng::<R>(self);
        items.choose(rng).copied()
    }

    fn sample_shuffle<R: RngId, T>(&mut self, items: &mut [T]) {
        let rng = get_rng::<R>(self);
        items.shuffle(rng);
    }
}

/// Declares a named random stream. The stream's seed is derived from the context's base seed and
/// the identifier, so streams are independent of each other and of the order they're first used in.
#[macro_export]
macro_rules! define_rng {
    ($random_id:ident) => {
        $crate::define_rng!($random_id, $crate::rand::rngs::StdRng);
    };
    ($random_id:ident, $rng_type:ty) => {
        struct $random_id {
            rng: $rng_type,
        }

        impl $crate::random::RngId for $random_id {
            #![allow(non_upper_case_globals)]
            type RngType = $rng_type;
            const name: &'static str = stringify!($random_id);
            const new: &'static dyn Fn(u64) -> Self = &|seed| {
                use $crate::rand::SeedableRng;
                Self {
                    rng: <$rng_type>::seed_from_u64(seed),
                }
            };

            fn rng(&mut self) -> &mut Self::RngType {
                &mut self.rng
            }
        }
    };
}
pub use define_rng;
