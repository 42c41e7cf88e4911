use crate::hashing::HashMap;
use crate::{type_of, TypeId};
use std::any::Any;

/// A type that can live in a [`Context`] as a data container. Each plugin knows how to construct
/// its own empty state, so containers can be created lazily on first use.
pub trait DataPlugin: Any {
    /// A constant reference to a constructor
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self;
}

/// Owns all state of one simulation instance: people, locations, parameters, random streams and
/// history are each stored in their own data plugin. Two contexts never share anything, which is
/// what makes independent runs safe to execute side by side.
pub struct Context {
    // This is actually a `HashMap<TypeId, Box<dyn DataPlugin>>` but must be declared this way so
    // that we can downcast.
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    // Number of fully simulated days. Day 0 is the freshly built world.
    current_day: u32,
}

impl Context {
    pub fn new() -> Self {
        Context {
            data_plugins: HashMap::default(),
            current_day: 0,
        }
    }

    /// Returns a mutable reference for the data container for `T`, creating it if it doesn't exist yet.
    pub fn get_data_container_mut<T: DataPlugin>(&mut self) -> &mut T {
        self.data_plugins
            .entry(type_of::<T>())
            .or_insert_with(|| Box::new((T::new)()))
            .downcast_mut::<T>()
            .unwrap() // Will never panic as data container has the matching type
    }

    /// Returns a reference to the data container for `T` if it exists.
    /// If you need a mutable reference or lazy instantiation, use `Context::get_data_container_mut()`.
    pub fn get_data_container<T: DataPlugin>(&self) -> Option<&T> {
        self.data_plugins
            .get(&type_of::<T>())
            .and_then(|data| data.downcast_ref::<T>())
    }

    #[must_use]
    pub fn get_current_day(&self) -> u32 {
        self.current_day
    }

    /// Moves the clock forward one day and returns the new day number.
    pub fn advance_day(&mut self) -> u32 {
        self.current_day += 1;
        self.current_day
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Tally {
        values: Vec<u32>,
    }

    impl DataPlugin for Tally {
        const new: &'static dyn Fn() -> Self = &Tally::default;
    }

    #[test]
    fn data_container_is_created_lazily() {
        let mut context = Context::new();
        assert!(context.get_data_container::<Tally>().is_none());

        context.get_data_container_mut::<Tally>().values.push(4);
        context.get_data_container_mut::<Tally>().values.push(7);

        let tally = context.get_data_container::<Tally>().unwrap();
        assert_eq!(tally.values, vec![4, 7]);
    }

    #[test]
    fn contexts_do_not_share_plugins() {
        let mut first = Context::new();
        let second = Context::new();
        first.get_data_container_mut::<Tally>().values.push(1);
        assert!(second.get_data_container::<Tally>().is_none());
    }

    #[test]
    fn clock_advances_one_day_at_a_time() {
        let mut context = Context::new();
        assert_eq!(context.get_current_day(), 0);
        assert_eq!(context.advance_day(), 1);
        assert_eq!(context.advance_day(), 2);
        assert_eq!(context.get_current_day(), 2);
    }
}
