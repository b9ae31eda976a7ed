use crate::{
    context::{Context, DataPlugin},
    hashing::hash_str,
    trace,
    type_of,
    TypeId,
};
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use std::any::Any;

/// A named random number stream. Every stream is seeded from the context's base seed offset by
/// a hash of its name, so streams are independent of one another and of the order in which they
/// are first used.
pub trait RngId: Any {
    #![allow(non_upper_case_globals)]
    const new: &'static dyn Fn(u64) -> Self;
    const name: &'static str;
    type RngType: SeedableRng;
    fn rng(&mut self) -> &mut Self::RngType;
}

struct RngPlugin {
    base_seed: u64,
    rng_map: FxHashMap<TypeId, Box<dyn Any>>,
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
                trace!("creating random stream {} with seed {}", R::name, seed_offset);
                Box::new((R::new)(seed_offset))
            })
            .downcast_mut::<R>()
            .unwrap() // Keyed by `type_of::<R>()`
            .rng()
    }
}

impl DataPlugin for RngPlugin {
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self = &|| RngPlugin {
        base_seed: 0,
        rng_map: FxHashMap::default(),
    };
}

pub trait ContextRandomExt {
    /// Sets the base seed and drops every stream created so far, so that streams are re-seeded
    /// on their next use.
    fn init_random(&mut self, base_seed: u64);

    /// The base seed all streams are derived from.
    fn base_seed(&self) -> u64;

    /// Gets a random sample from the random number generator associated with the given
    /// `RngId` by applying the specified sampler function. If the Rng has not been used
    /// before, one will be created with the base seed you defined in `init_random`.
    fn sample<R: RngId + 'static, T>(&mut self, sampler: impl FnOnce(&mut R::RngType) -> T) -> T;
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module with base seed {}", base_seed);
        let rng_container = self.get_data_container_mut::<RngPlugin>();
        rng_container.base_seed = base_seed;
        rng_container.clear();
    }

    fn base_seed(&self) -> u64 {
        self.get_data_container::<RngPlugin>()
            .map_or(0, |plugin| plugin.base_seed)
    }

    fn sample<R: RngId + 'static, T>(&mut self, sampler: impl FnOnce(&mut R::RngType) -> T) -> T {
        let rng = self.get_data_container_mut::<RngPlugin>().get_rng::<R>();
        sampler(rng)
    }
}

/// Defines a named random stream backed by `StdRng`.
#[macro_export]
macro_rules! define_rng {
    ($vis:vis $random_id:ident) => {
        $vis struct $random_id {
            rng: $crate::rand::rngs::StdRng,
        }

        impl $crate::random::RngId for $random_id {
            #![allow(non_upper_case_globals)]
            type RngType = $crate::rand::rngs::StdRng;
            const name: &'static str = stringify!($random_id);
            const new: &'static dyn Fn(u64) -> Self = &|seed| {
                use $crate::rand::SeedableRng;
                Self {
                    rng: $crate::rand::rngs::StdRng::seed_from_u64(seed),
                }
            };

            fn rng(&mut self) -> &mut Self::RngType {
                &mut self.rng
            }
        }
    };
}
#[allow(unused_imports)]
pub use define_rng;

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::random::ContextRandomExt;
    use crate::simulation::{DailyRng, NetworkRng};
    use rand::{seq::SliceRandom, Rng, RngCore};

    fn daily_draws(context: &mut Context, count: usize) -> Vec<u64> {
        (0..count)
            .map(|_| context.sample::<DailyRng, _>(RngCore::next_u64))
            .collect()
    }

    #[test]
    fn network_and_daily_streams_are_distinct() {
        let mut context = Context::new();
        context.init_random(42);

        let network = context.sample::<NetworkRng, _>(RngCore::next_u64);
        let daily = context.sample::<DailyRng, _>(RngCore::next_u64);
        assert_ne!(network, daily);
    }

    #[test]
    fn reseeding_replays_the_daily_stream() {
        let mut context = Context::new();
        context.init_random(2020);
        assert_eq!(context.base_seed(), 2020);
        let first_run = daily_draws(&mut context, 5);

        context.init_random(2020);
        assert_eq!(daily_draws(&mut context, 5), first_run);

        context.init_random(2021);
        assert_ne!(daily_draws(&mut context, 5), first_run);
    }

    #[test]
    fn streams_do_not_depend_on_use_order() {
        let mut first = Context::new();
        first.init_random(7);
        let _ = first.sample::<NetworkRng, _>(RngCore::next_u64);
        let daily_after_network = first.sample::<DailyRng, _>(RngCore::next_u64);

        let mut second = Context::new();
        second.init_random(7);
        let daily_alone = second.sample::<DailyRng, _>(RngCore::next_u64);

        assert_eq!(daily_after_network, daily_alone);
    }

    #[test]
    fn sampler_closure_receives_stream() {
        let mut context = Context::new();
        context.init_random(42);
        let household_size: usize = context.sample::<NetworkRng, _>(|rng| rng.random_range(1..=6));
        assert!((1..=6).contains(&household_size));

        let mut order: Vec<usize> = (0..10).collect();
        context.sample::<DailyRng, _>(|rng| order.shuffle(rng));
        order.sort_unstable();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }
}
