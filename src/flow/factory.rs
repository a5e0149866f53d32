//! Filter factory for creating filters by registered name.

use super::config::ParamMap;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::filters::{KeyFrameGate, PassThrough};
use std::collections::HashMap;

/// Type alias for filter constructor functions.
pub type FilterConstructor = fn(&ParamMap) -> Result<Box<dyn Filter>>;

/// Registry of filter constructors.
///
/// Applications register their own stages next to the built-ins and then
/// instantiate everything uniformly from name plus parameter map.
pub struct FilterFactory {
    constructors: HashMap<String, FilterConstructor>,
}

impl FilterFactory {
    /// Create a new factory with built-in filters registered.
    pub fn new() -> Self {
        let mut factory = Self {
            constructors: HashMap::new(),
        };
        factory.register("passthrough", create_passthrough);
        factory.register("keyframe-gate", create_keyframe_gate);
        factory
    }

    /// Register a custom filter constructor. A later registration under
    /// the same name replaces the earlier one.
    pub fn register(&mut self, name: &str, constructor: FilterConstructor) {
        self.constructors.insert(name.to_string(), constructor);
    }

    /// Create a filter by registered name.
    ///
    /// # Errors
    ///
    /// Fails for an unknown name, or when the constructor rejects its
    /// parameters.
    pub fn create(&self, name: &str, params: &ParamMap) -> Result<Box<dyn Filter>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown filter: {name}")))?;
        constructor(params)
    }

    /// Check if a filter name is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// List all registered filter names, sorted.
    pub fn list_filters(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for FilterFactory {
    fn default() -> Self {
        Self::new()
    }
}

// Built-in filter constructors

fn create_passthrough(_params: &ParamMap) -> Result<Box<dyn Filter>> {
    Ok(Box::new(PassThrough::new()))
}

fn create_keyframe_gate(params: &ParamMap) -> Result<Box<dyn Filter>> {
    let active = params
        .get("active")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    Ok(Box::new(KeyFrameGate::new(active)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::config::ParamValue;

    #[test]
    fn test_builtins_registered() {
        let factory = FilterFactory::new();
        assert!(factory.is_registered("passthrough"));
        assert!(factory.is_registered("keyframe-gate"));
        assert!(!factory.is_registered("unknown"));
        assert_eq!(factory.list_filters(), vec!["keyframe-gate", "passthrough"]);
    }

    #[test]
    fn test_create_by_name() {
        let factory = FilterFactory::new();
        let filter = factory.create("passthrough", &ParamMap::new()).unwrap();
        assert_eq!(filter.name(), "passthrough");
    }

    #[test]
    fn test_unknown_filter_fails() {
        let factory = FilterFactory::new();
        assert!(factory.create("nope", &ParamMap::new()).is_err());
    }

    #[test]
    fn test_custom_registration() {
        let mut factory = FilterFactory::new();
        factory.register("gate", create_keyframe_gate);

        let mut params = ParamMap::new();
        params.insert("active".to_string(), ParamValue::Bool(false));
        let filter = factory.create("gate", &params).unwrap();
        assert_eq!(filter.name(), "keyframe-gate");
    }
}
