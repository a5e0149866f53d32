//! Flow construction configuration.

use super::flow::ScheduleMode;
use super::slot::{FullPolicy, SlotConfig};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// A loosely-typed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// String value.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
}

impl ParamValue {
    /// As a string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// As a signed integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// As an unsigned integer (negative values read as `None`).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParamValue::Int(i) if *i >= 0 => Some(*i as u64),
            _ => None,
        }
    }

    /// As a float; integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// As a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Name/value parameter map consumed at construction time.
pub type ParamMap = HashMap<String, ParamValue>;

/// Keys recognized by [`FlowConfig::from_params`].
const KNOWN_KEYS: &[&str] = &[
    "input-slots",
    "slot-cache",
    "full-policy",
    "schedule-mode",
    "fixed-rate",
];

/// Configuration for one flow.
///
/// Built either programmatically (explicit slot list) or from a
/// [`ParamMap`] with uniform slot settings.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Ordered input slot configurations.
    pub slots: Vec<SlotConfig>,
    /// Explicit scheduling mode. `None` applies the default rule: atomic
    /// when a fixed rate is set, common otherwise.
    pub mode: Option<ScheduleMode>,
    /// Fixed output rate in units per second; paces an atomic worker.
    pub fixed_rate: Option<f64>,
}

impl FlowConfig {
    /// Config with the given slots and default scheduling.
    pub fn new(slots: Vec<SlotConfig>) -> Self {
        Self {
            slots,
            mode: None,
            fixed_rate: None,
        }
    }

    /// Config with `count` identical slots.
    pub fn uniform(count: usize, slot: SlotConfig) -> Self {
        Self::new(vec![slot; count])
    }

    /// Set an explicit scheduling mode; always wins over the default rule.
    pub fn with_mode(mut self, mode: ScheduleMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set a fixed output rate hint.
    pub fn with_fixed_rate(mut self, rate: f64) -> Self {
        self.fixed_rate = Some(rate);
        self
    }

    /// Build a config from a parameter map.
    ///
    /// Recognized keys:
    ///
    /// | key             | type   | default         |
    /// |-----------------|--------|-----------------|
    /// | `input-slots`   | int    | required        |
    /// | `slot-cache`    | int    | 2               |
    /// | `full-policy`   | string | `drop-current`  |
    /// | `schedule-mode` | string | derived         |
    /// | `fixed-rate`    | float  | none            |
    ///
    /// `full-policy` accepts `drop-current` (alias `drop-incoming`),
    /// `drop-oldest`, and `block`. `schedule-mode` accepts `common` and
    /// `atomic`. Unrecognized keys are ignored; missing required keys fail
    /// construction.
    pub fn from_params(params: &ParamMap) -> Result<Self> {
        for key in params.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                tracing::debug!(key, "ignoring unrecognized flow parameter");
            }
        }

        let slot_count = params
            .get("input-slots")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::InvalidConfig("missing required key: input-slots".into()))?
            as usize;

        let max_cache = params
            .get("slot-cache")
            .and_then(|v| v.as_u64())
            .unwrap_or(2) as usize;

        let policy = match params.get("full-policy").and_then(|v| v.as_str()) {
            None | Some("drop-current") | Some("drop-incoming") => FullPolicy::DropIncoming,
            Some("drop-oldest") => FullPolicy::DropOldest,
            Some("block") => FullPolicy::Block,
            Some(other) => {
                return Err(Error::InvalidConfig(format!("unknown full-policy: {other}")));
            }
        };

        let mode = match params.get("schedule-mode").and_then(|v| v.as_str()) {
            None => None,
            Some("common") => Some(ScheduleMode::AsyncCommon),
            Some("atomic") => Some(ScheduleMode::AsyncAtomic),
            Some(other) => {
                return Err(Error::InvalidConfig(format!(
                    "unknown schedule-mode: {other}"
                )));
            }
        };

        let fixed_rate = params.get("fixed-rate").and_then(|v| v.as_f64());

        let config = Self {
            slots: vec![SlotConfig::new(max_cache, policy); slot_count],
            mode,
            fixed_rate,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the config for construction-failing problems.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.slots.is_empty() {
            return Err(Error::InvalidConfig("flow needs at least one slot".into()));
        }
        if self.slots.iter().any(|s| s.max_cache == 0) {
            return Err(Error::InvalidConfig("slot cache must be > 0".into()));
        }
        if let Some(rate) = self.fixed_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "fixed-rate must be positive, got {rate}"
                )));
            }
        }
        Ok(())
    }

    /// The scheduling mode after applying the default-selection rule.
    pub fn resolve_mode(&self) -> ScheduleMode {
        match self.mode {
            Some(mode) => mode,
            // Default rule: a fixed output rate needs one paced worker
            // with a consistent snapshot across slots.
            None if self.fixed_rate.is_some() => ScheduleMode::AsyncAtomic,
            None => ScheduleMode::AsyncCommon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, ParamValue)]) -> ParamMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_from_params_minimal() {
        let config =
            FlowConfig::from_params(&params(&[("input-slots", ParamValue::Int(2))])).unwrap();
        assert_eq!(config.slots.len(), 2);
        assert_eq!(config.slots[0].max_cache, 2);
        assert_eq!(config.slots[0].policy, FullPolicy::DropIncoming);
        assert_eq!(config.resolve_mode(), ScheduleMode::AsyncCommon);
    }

    #[test]
    fn test_from_params_missing_required_key_fails() {
        assert!(FlowConfig::from_params(&ParamMap::new()).is_err());
    }

    #[test]
    fn test_from_params_unrecognized_keys_ignored() {
        let config = FlowConfig::from_params(&params(&[
            ("input-slots", ParamValue::Int(1)),
            ("vendor-magic", ParamValue::Str("on".into())),
        ]))
        .unwrap();
        assert_eq!(config.slots.len(), 1);
    }

    #[test]
    fn test_from_params_policy_and_mode() {
        let config = FlowConfig::from_params(&params(&[
            ("input-slots", ParamValue::Int(1)),
            ("full-policy", ParamValue::Str("drop-oldest".into())),
            ("schedule-mode", ParamValue::Str("atomic".into())),
        ]))
        .unwrap();
        assert_eq!(config.slots[0].policy, FullPolicy::DropOldest);
        assert_eq!(config.resolve_mode(), ScheduleMode::AsyncAtomic);

        let bad = FlowConfig::from_params(&params(&[
            ("input-slots", ParamValue::Int(1)),
            ("full-policy", ParamValue::Str("explode".into())),
        ]));
        assert!(bad.is_err());
    }

    #[test]
    fn test_fixed_rate_implies_atomic_unless_overridden() {
        let config = FlowConfig::uniform(1, SlotConfig::default()).with_fixed_rate(30.0);
        assert_eq!(config.resolve_mode(), ScheduleMode::AsyncAtomic);

        let forced = config.with_mode(ScheduleMode::AsyncCommon);
        assert_eq!(forced.resolve_mode(), ScheduleMode::AsyncCommon);
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        assert!(FlowConfig::new(vec![]).validate().is_err());
        assert!(
            FlowConfig::uniform(1, SlotConfig::new(0, FullPolicy::Block))
                .validate()
                .is_err()
        );
        assert!(
            FlowConfig::uniform(1, SlotConfig::default())
                .with_fixed_rate(-5.0)
                .validate()
                .is_err()
        );
    }
}
