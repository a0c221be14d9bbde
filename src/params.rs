//! Generic typed parameter store.
//!
//! [`TaskParameters`] carries configuration into and out of tasks without
//! either side needing compile-time knowledge of the other's exact schema.
//! Values are one of four primitive kinds (bool, integer, float, string),
//! stored in a single ordered mapping keyed by name.
//!
//! # Invariants
//! - A name maps to exactly one value (and therefore one kind) at a time.
//! - Iteration order is insertion order and is stable across calls as long
//!   as the store is not mutated.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the rename override every store carries by default.
pub const TASK_RENAME: &str = "task_rename";
/// Name of the main/foreground flag every store carries by default.
pub const MAIN_TASK: &str = "main_task";
/// Name of the iteration period (seconds) every store carries by default.
pub const TASK_PERIOD: &str = "task_period";
/// Name of the timeout (seconds, negative = unbounded) every store carries by default.
pub const TASK_TIMEOUT: &str = "task_timeout";

/// Check whether `name` is one of the reserved base parameters owned by the
/// lifecycle wrapper rather than by a task's own schema.
pub fn is_base_param(name: &str) -> bool {
    matches!(name, TASK_RENAME | MAIN_TASK | TASK_PERIOD | TASK_TIMEOUT)
}

/// The kind tag of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    Str,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Bool => write!(f, "bool"),
            ParamKind::Int => write!(f, "int"),
            ParamKind::Float => write!(f, "float"),
            ParamKind::Str => write!(f, "str"),
        }
    }
}

/// A single tagged parameter value.
///
/// The tagged-variant representation lets typed configuration flow through
/// an untyped transport: senders and receivers agree on names and kinds by
/// convention (see [`crate::schema`]), not by shared struct layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// The kind tag of this value.
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Str(_) => ParamKind::Str,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "'{v}'"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// Typed extraction from a [`ParamValue`].
///
/// Returns `None` on a kind mismatch so callers can apply their own default
/// instead of handling an error.
pub trait ParamType: Sized {
    fn from_value(value: &ParamValue) -> Option<Self>;
}

impl ParamType for bool {
    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl ParamType for i64 {
    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl ParamType for f64 {
    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl ParamType for String {
    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Str(v) => Some(v.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ParamEntry {
    name: String,
    value: ParamValue,
}

/// Order-preserving, name-keyed container of typed parameter values.
///
/// # Invariants
/// - Each name appears at most once.
/// - Updating an existing name keeps its position; inserting appends.
///
/// Stores are built up in layers (compiled defaults, persisted
/// configuration, caller overrides) via [`merge`](TaskParameters::merge),
/// then handed to a task's configure/initialise step as a snapshot. Tasks
/// must copy out any values they need past that call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskParameters {
    entries: Vec<ParamEntry>,
}

impl TaskParameters {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store carrying the base entries every task understands:
    /// `task_rename` (""), `main_task` (true), `task_period` (1.0 s) and
    /// `task_timeout` (-1.0 s, meaning no timeout).
    pub fn with_defaults() -> Self {
        let mut params = Self::new();
        params.set(TASK_RENAME, "");
        params.set(MAIN_TASK, true);
        params.set(TASK_PERIOD, 1.0);
        params.set(TASK_TIMEOUT, -1.0);
        params
    }

    /// Typed lookup by name.
    ///
    /// Returns `None` if the name is absent or the stored kind does not
    /// match `T`. Never panics; callers apply their own default.
    pub fn get<T: ParamType>(&self, name: &str) -> Option<T> {
        self.value(name).and_then(T::from_value)
    }

    /// Raw lookup by name.
    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.value)
    }

    /// The kind stored under `name`, if any.
    pub fn kind_of(&self, name: &str) -> Option<ParamKind> {
        self.value(name).map(ParamValue::kind)
    }

    /// Check whether `name` is present under any kind.
    pub fn contains(&self, name: &str) -> bool {
        self.value(name).is_some()
    }

    /// Typed insert-or-update.
    ///
    /// Updating an existing name keeps its position in the iteration order
    /// and overwrites the stored value, including its kind. There is no
    /// silent coercion between kinds; callers are expected to use
    /// consistent schemas.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.value = value,
            None => self.entries.push(ParamEntry { name, value }),
        }
    }

    /// Apply every entry of `other` onto this store.
    ///
    /// Names present in both stores take `other`'s value; names present
    /// only in `self` are preserved. Merging the same store twice yields
    /// the same result as merging it once.
    pub fn merge(&mut self, other: &TaskParameters) {
        for entry in &other.entries {
            self.set(entry.name.clone(), entry.value.clone());
        }
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), &entry.value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for TaskParameters {
    /// One `kind: name = value` line per entry, for diagnostics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            writeln!(f, "{}: {} = {}", value.kind(), name, value)?;
        }
        Ok(())
    }
}
