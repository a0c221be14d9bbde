//! Schema bindings between typed configuration structs and [`TaskParameters`].
//!
//! A task's configuration is usually a plain struct with known fields,
//! bounds and defaults. The [`ConfigBinding`] trait is the contract that
//! maps such a struct to the generic parameter store and back:
//!
//! - `to_parameters` / `from_parameters` round-trip losslessly,
//! - conversion from a store fails loudly on names the schema does not
//!   know (guarding against task/parameter-store skew),
//! - absent fields take their compiled default,
//! - out-of-range numeric values are clamped into `[min, max]` — clamping
//!   is the uniform bounds policy, a conversion never rejects a value the
//!   schema has bounds for.
//!
//! Bindings are typically mechanical; [`field`] and [`check_names`] do the
//! heavy lifting so an implementation is one line per field.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::params::{is_base_param, ParamKind, ParamType, ParamValue, TaskParameters};

/// Schema-level conversion failures.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("parameter '{0}' is not part of the schema")]
    UnknownParameter(String),

    #[error("parameter '{name}' has kind {found}, schema expects {expected}")]
    KindMismatch {
        name: String,
        expected: ParamKind,
        found: ParamKind,
    },

    #[error("schema has no field named '{0}'")]
    MissingField(String),

    #[error("field '{name}' is {kind} in the schema and cannot be read as the requested type")]
    WrongFieldType { name: String, kind: ParamKind },
}

/// Description of one schema field: name, kind, bounds, default and the
/// change-level bit used to decide what a reconfiguration invalidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    /// Bit(s) OR-ed into the change level when this field differs between
    /// two configurations.
    pub level: u32,
    pub default: ParamValue,
    pub min: Option<ParamValue>,
    pub max: Option<ParamValue>,
}

impl ParamSpec {
    /// Describe a field. The kind is taken from the default value.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        level: u32,
        default: impl Into<ParamValue>,
    ) -> Self {
        let default = default.into();
        Self {
            name: name.into(),
            kind: default.kind(),
            description: description.into(),
            level,
            default,
            min: None,
            max: None,
        }
    }

    /// Attach inclusive bounds. Only meaningful for numeric kinds.
    ///
    /// # Panics
    /// When a bound's kind differs from the field's kind — `clamp` would
    /// silently ignore such a bound, leaving the field unbounded.
    pub fn bounded(mut self, min: impl Into<ParamValue>, max: impl Into<ParamValue>) -> Self {
        let min = min.into();
        let max = max.into();
        assert_eq!(
            min.kind(),
            self.kind,
            "min bound kind must match field '{}'",
            self.name
        );
        assert_eq!(
            max.kind(),
            self.kind,
            "max bound kind must match field '{}'",
            self.name
        );
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Clamp a numeric value into this field's bounds. Non-numeric values
    /// and unbounded fields pass through unchanged.
    pub fn clamp(&self, value: ParamValue) -> ParamValue {
        match (&value, &self.min, &self.max) {
            (ParamValue::Int(v), min, max) => {
                let mut v = *v;
                if let Some(ParamValue::Int(lo)) = min {
                    v = v.max(*lo);
                }
                if let Some(ParamValue::Int(hi)) = max {
                    v = v.min(*hi);
                }
                ParamValue::Int(v)
            }
            (ParamValue::Float(v), min, max) => {
                let mut v = *v;
                if let Some(ParamValue::Float(lo)) = min {
                    v = v.max(*lo);
                }
                if let Some(ParamValue::Float(hi)) = max {
                    v = v.min(*hi);
                }
                ParamValue::Float(v)
            }
            _ => value,
        }
    }
}

/// Ordered list of the fields a configuration schema defines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDescription {
    params: Vec<ParamSpec>,
}

impl ConfigDescription {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self { params }
    }

    /// The shared description for tasks with no configuration of their own.
    pub fn empty() -> &'static ConfigDescription {
        static EMPTY: OnceLock<ConfigDescription> = OnceLock::new();
        EMPTY.get_or_init(ConfigDescription::default)
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn find(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|spec| spec.name == name)
    }

    /// A parameter store holding every field's compiled default.
    pub fn default_parameters(&self) -> TaskParameters {
        let mut params = TaskParameters::new();
        for spec in &self.params {
            params.set(spec.name.clone(), spec.default.clone());
        }
        params
    }
}

/// Binding between a fixed typed configuration struct and the generic
/// parameter store.
///
/// # Round-trip invariant
/// `from_parameters(&to_parameters(&c)) == Ok(c)` for every `c` whose
/// values respect the schema bounds.
pub trait ConfigBinding: Sized + Clone + PartialEq {
    /// The schema, built once per process (memoize with `OnceLock`).
    fn description() -> &'static ConfigDescription;

    /// The compiled-in defaults.
    fn defaults() -> Self;

    /// Lossless conversion into the untyped transport representation.
    fn to_parameters(&self) -> TaskParameters;

    /// Strict conversion from a store.
    ///
    /// # Errors
    /// Fails on names absent from the schema and on kind mismatches; never
    /// silently drops an entry. Absent fields take their compiled default,
    /// out-of-range numeric values are clamped.
    fn from_parameters(params: &TaskParameters) -> Result<Self, SchemaError>;

    /// Bitmask of the change levels of every field that differs between
    /// `self` and `other`; used to decide what must be reinitialised
    /// versus hot-reloaded.
    fn change_level(&self, other: &Self) -> u32;
}

/// Reject any store entry whose name the schema does not know.
///
/// The reserved base parameters (`task_rename`, `main_task`, `task_period`,
/// `task_timeout`) are owned by the lifecycle wrapper and are always
/// allowed through.
pub fn check_names(params: &TaskParameters, desc: &ConfigDescription) -> Result<(), SchemaError> {
    for (name, _) in params.iter() {
        if is_base_param(name) {
            continue;
        }
        if desc.find(name).is_none() {
            return Err(SchemaError::UnknownParameter(name.to_string()));
        }
    }
    Ok(())
}

/// Extract one schema field from a store: default when absent, kind-checked
/// and clamped when present.
pub fn field<T: ParamType>(
    params: &TaskParameters,
    desc: &ConfigDescription,
    name: &str,
) -> Result<T, SchemaError> {
    let spec = desc
        .find(name)
        .ok_or_else(|| SchemaError::MissingField(name.to_string()))?;
    let value = match params.value(name) {
        None => spec.default.clone(),
        Some(value) => {
            if value.kind() != spec.kind {
                return Err(SchemaError::KindMismatch {
                    name: name.to_string(),
                    expected: spec.kind,
                    found: value.kind(),
                });
            }
            spec.clamp(value.clone())
        }
    };
    // At this point the value's kind matches the schema, so a conversion
    // failure means the caller requested a Rust type the schema does not
    // declare for this field.
    T::from_value(&value).ok_or_else(|| SchemaError::WrongFieldType {
        name: name.to_string(),
        kind: spec.kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hand-written stand-in for what a generated binding looks like.
    #[derive(Debug, Clone, PartialEq)]
    struct PenConfig {
        width: i64,
        color: String,
        opacity: f64,
    }

    const LEVEL_RESTART: u32 = 1;
    const LEVEL_RELOAD: u32 = 2;

    impl ConfigBinding for PenConfig {
        fn description() -> &'static ConfigDescription {
            static DESC: OnceLock<ConfigDescription> = OnceLock::new();
            DESC.get_or_init(|| {
                ConfigDescription::new(vec![
                    ParamSpec::new("width", "pen width in pixels", LEVEL_RESTART, 3i64)
                        .bounded(1i64, 10i64),
                    ParamSpec::new("color", "pen color name", LEVEL_RELOAD, "black"),
                    ParamSpec::new("opacity", "pen opacity", LEVEL_RELOAD, 1.0).bounded(0.0, 1.0),
                ])
            })
        }

        fn defaults() -> Self {
            Self {
                width: 3,
                color: "black".to_string(),
                opacity: 1.0,
            }
        }

        fn to_parameters(&self) -> TaskParameters {
            let mut params = TaskParameters::new();
            params.set("width", self.width);
            params.set("color", self.color.clone());
            params.set("opacity", self.opacity);
            params
        }

        fn from_parameters(params: &TaskParameters) -> Result<Self, SchemaError> {
            let desc = Self::description();
            check_names(params, desc)?;
            Ok(Self {
                width: field(params, desc, "width")?,
                color: field(params, desc, "color")?,
                opacity: field(params, desc, "opacity")?,
            })
        }

        fn change_level(&self, other: &Self) -> u32 {
            let mut level = 0;
            if self.width != other.width {
                level |= LEVEL_RESTART;
            }
            if self.color != other.color {
                level |= LEVEL_RELOAD;
            }
            if self.opacity != other.opacity {
                level |= LEVEL_RELOAD;
            }
            level
        }
    }

    #[test]
    fn test_round_trip() {
        let cfg = PenConfig {
            width: 7,
            color: "teal".to_string(),
            opacity: 0.5,
        };
        let params = cfg.to_parameters();
        let back = PenConfig::from_parameters(&params).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_unknown_name_fails_loudly() {
        let mut params = PenConfig::defaults().to_parameters();
        params.set("pressure", 0.5);

        let err = PenConfig::from_parameters(&params).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownParameter(name) if name == "pressure"));
    }

    #[test]
    fn test_base_params_are_always_allowed() {
        let mut params = PenConfig::defaults().to_parameters();
        params.merge(&TaskParameters::with_defaults());

        assert!(PenConfig::from_parameters(&params).is_ok());
    }

    #[test]
    fn test_absent_field_takes_default() {
        let mut params = TaskParameters::new();
        params.set("width", 5i64);

        let cfg = PenConfig::from_parameters(&params).unwrap();
        assert_eq!(cfg.width, 5);
        assert_eq!(cfg.color, "black");
        assert_eq!(cfg.opacity, 1.0);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let mut params = TaskParameters::new();
        params.set("width", -4i64);
        params.set("opacity", 3.0);

        let cfg = PenConfig::from_parameters(&params).unwrap();
        assert_eq!(cfg.width, 1);
        assert_eq!(cfg.opacity, 1.0);
    }

    #[test]
    fn test_kind_mismatch_is_an_error() {
        let mut params = TaskParameters::new();
        params.set("width", "wide");

        let err = PenConfig::from_parameters(&params).unwrap_err();
        assert!(matches!(err, SchemaError::KindMismatch { name, .. } if name == "width"));
    }

    #[test]
    fn test_requesting_the_wrong_rust_type_names_the_schema_kind() {
        let params = PenConfig::defaults().to_parameters();

        // Store and schema agree on Int; the caller asked for bool.
        let err = field::<bool>(&params, PenConfig::description(), "width").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::WrongFieldType { ref name, kind: ParamKind::Int } if name == "width"
        ));
    }

    #[test]
    #[should_panic(expected = "min bound kind must match field 'width'")]
    fn test_mistyped_bound_is_rejected_at_construction() {
        // Float bounds on an Int field would never clamp anything.
        let _ = ParamSpec::new("width", "pen width in pixels", LEVEL_RESTART, 3i64)
            .bounded(1.0, 10.0);
    }

    #[test]
    fn test_change_level() {
        let a = PenConfig::defaults();
        let mut b = a.clone();
        assert_eq!(a.change_level(&b), 0);

        b.color = "red".to_string();
        assert_eq!(a.change_level(&b), LEVEL_RELOAD);

        b.width = 9;
        assert_eq!(a.change_level(&b), LEVEL_RESTART | LEVEL_RELOAD);
    }

    #[test]
    fn test_description_defaults_match_compiled_defaults() {
        let from_desc = PenConfig::description().default_parameters();
        let from_struct = PenConfig::defaults().to_parameters();
        assert_eq!(from_desc, from_struct);
    }
}
