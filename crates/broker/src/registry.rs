use std::sync::Arc;

use {parlor_common::{Error, Registry, Result}, serde_json::Value};

use crate::{broker::MessageBroker, memory::{MemoryBroker, MemoryBrokerConfig}};

/// Registry of built-in broker backends. External backends (e.g. an AMQP
/// adapter) are added through [`Registry::register`] before resolution.
#[must_use]
pub fn builtin_registry() -> Registry<dyn MessageBroker> {
    let mut registry = Registry::new();
    registry.register("memory", |args: &Value| {
        let config: MemoryBrokerConfig = parse_args(args)?;
        Ok(Arc::new(MemoryBroker::new(config)) as Arc<dyn MessageBroker>)
    });
    registry
}

fn parse_args<T: serde::de::DeserializeOwned + Default>(args: &Value) -> Result<T> {
    if args.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(args.clone()).map_err(Error::config)
}
