use crate::{type_of, TypeId};
use rustc_hash::FxHashMap;
use std::any::Any;

/// A type that can live in a `Context` as a data plugin. The plugin is constructed lazily with
/// `new` the first time it is requested.
pub trait DataPlugin: Any + 'static {
    /// A constant reference to a constructor
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self;
}

/// Owns every piece of state of a simulation run, keyed by type.
pub struct Context {
    // This is actually a `HashMap<TypeId, Box<dyn DataPlugin>>` but must be declared this way to
    // avoid having to implement an `as_any()` method on everything.
    data_plugins: FxHashMap<TypeId, Box<dyn Any>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Context {
            data_plugins: FxHashMap::default(),
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

    /// Replaces the data container for `T`, returning the previous one if there was one.
    pub fn set_data_container<T: DataPlugin>(&mut self, value: T) -> Option<T> {
        self.data_plugins
            .insert(type_of::<T>(), Box::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
            .map(|previous| *previous)
    }

    /// Lends the data container for `T` to `f` together with the rest of the context, so that
    /// `f` can mutate the container while still drawing from the context's other plugins (its
    /// random number generators, for example). The container is detached from the context for
    /// the duration of the call.
    pub fn with_data_container<T: DataPlugin, R>(
        &mut self,
        f: impl FnOnce(&mut T, &mut Context) -> R,
    ) -> R {
        let mut container: Box<dyn Any> = self
            .data_plugins
            .remove(&type_of::<T>())
            .unwrap_or_else(|| Box::new((T::new)()));
        let result = f(
            container.downcast_mut::<T>().unwrap(), // Keyed by `type_of::<T>()`
            self,
        );
        self.data_plugins.insert(type_of::<T>(), container);
        result
    }
}
