//! Name-to-factory component registry.
//!
//! Built-in brokers, policies, and channel agents live in a closed registry;
//! external implementations are mounted through [`Registry::register`] at
//! startup. Resolution only constructs — lifecycle hooks are the caller's
//! job.

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;

use crate::error::{Error, Result};

type Factory<T> = Box<dyn Fn(&Value) -> Result<Arc<T>> + Send + Sync>;

/// Registry of constructors for one capability interface (broker, policy,
/// channel agent). Names are matched case-insensitively.
pub struct Registry<T: ?Sized> {
    factories: HashMap<String, Factory<T>>,
}

impl<T: ?Sized> Registry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under `name`, replacing any previous registration.
    ///
    /// The factory receives the component's argument table (an arbitrary JSON
    /// value taken from configuration) and returns a constructed instance.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Value) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.into().to_ascii_lowercase(), Box::new(factory));
    }

    /// Construct the component registered under `name`.
    ///
    /// Fails with [`Error::ComponentNotFound`] (critical) for unknown names.
    pub fn resolve(&self, name: &str, args: &Value) -> Result<Arc<T>> {
        let factory = self
            .factories
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| Error::component_not_found(name))?;
        factory(args)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered names, sorted for stable listings.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
