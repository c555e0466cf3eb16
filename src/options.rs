//! Typed, validated per-part option schema.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{RigError, RigResult};
use crate::naming::NameConvention;
use crate::scene::graph::NodeType;

/// Name of the side option every part carries.
pub const SIDE: &str = "side";
/// Name of the name option every part carries.
pub const NAME: &str = "name";

/// Declared type of an option.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Signed integer.
    Int,
    /// Floating-point number.
    Float,
    /// Boolean flag.
    Bool,
    /// Free text.
    String,
    /// One of a fixed set of strings.
    Enum,
    /// A single scene node name.
    SingleSelection,
    /// A list of scene node names.
    Selection,
    /// Node the part's rig groups are spatially parented under.
    ParentDriver,
    /// Node whose attributes drive the part.
    AttributeDriver,
    /// Another part (`side_name`) this part depends on.
    RigPart,
}

impl DataType {
    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Enum => "enum",
            Self::SingleSelection => "single_selection",
            Self::Selection => "selection",
            Self::ParentDriver => "parent_driver",
            Self::AttributeDriver => "attribute_driver",
            Self::RigPart => "rig_part",
        }
    }

    /// Driver options each get their own rig group pair.
    pub fn is_driver(self) -> bool {
        matches!(self, Self::ParentDriver | Self::AttributeDriver)
    }

    /// Options whose string value names a sided node and is rewritten by mirroring.
    pub fn is_sided_reference(self) -> bool {
        matches!(
            self,
            Self::ParentDriver | Self::AttributeDriver | Self::SingleSelection | Self::RigPart
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "int" => Self::Int,
            "float" => Self::Float,
            "bool" => Self::Bool,
            "string" => Self::String,
            "enum" => Self::Enum,
            "single_selection" => Self::SingleSelection,
            "selection" => Self::Selection,
            "parent_driver" => Self::ParentDriver,
            "attribute_driver" => Self::AttributeDriver,
            "rig_part" => Self::RigPart,
            other => {
                return Err(RigError::configuration(format!(
                    "unknown option data type '{other}'"
                )));
            }
        })
    }
}

/// Dynamically-typed option value as stored on guide metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// No value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// String.
    Str(String),
    /// List of strings.
    List(Vec<String>),
}

impl OptionValue {
    /// Python-style truthiness used by `value_required`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
        }
    }

    /// String payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric payload; integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// List payload.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

fn default_true() -> bool {
    true
}

/// Declaration and current value of one option.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    /// Position in the part's option list.
    #[serde(default)]
    pub order_index: usize,
    /// Declared type.
    pub data_type: DataType,
    /// Value restored by a reset.
    pub default: OptionValue,
    /// Current value.
    pub value: OptionValue,
    /// Inclusive numeric lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive numeric upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Allowed values for [`DataType::Enum`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    /// Part types a [`DataType::RigPart`] value may point at; empty allows all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_part_types: Vec<String>,
    /// Help text.
    #[serde(default)]
    pub tool_tip: String,
    /// Whether updates are accepted at all.
    #[serde(default = "default_true")]
    pub editable: bool,
    /// Whether a change needs the guide rebuilt before it takes effect.
    #[serde(default)]
    pub rebuild_required: bool,
    /// Whether falsy values are rejected.
    #[serde(default)]
    pub value_required: bool,
}

impl OptionSpec {
    /// Editable option with `value == default`.
    pub fn new(data_type: DataType, default: impl Into<OptionValue>) -> Self {
        let default = default.into();
        Self {
            order_index: 0,
            data_type,
            value: default.clone(),
            default,
            min: None,
            max: None,
            enum_values: Vec::new(),
            allowed_part_types: Vec::new(),
            tool_tip: String::new(),
            editable: true,
            rebuild_required: false,
            value_required: false,
        }
    }

    /// Set inclusive numeric bounds.
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Set the inclusive lower bound.
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Set the allowed enum values.
    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the part types a rig-part value may point at.
    pub fn allowed_part_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_part_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set help text.
    pub fn tool_tip(mut self, tip: impl Into<String>) -> Self {
        self.tool_tip = tip.into();
        self
    }

    /// Set editability.
    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    /// Mark the option as needing a guide rebuild.
    pub fn rebuild_required(mut self) -> Self {
        self.rebuild_required = true;
        self
    }

    /// Reject falsy values.
    pub fn value_required(mut self) -> Self {
        self.value_required = true;
        self
    }
}

/// Reason an option update was skipped.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum Rejection {
    /// The key is not part of the schema.
    #[error("unknown option")]
    UnknownKey,
    /// The option is read-only.
    #[error("option is not editable")]
    NotEditable,
    /// A required option received a falsy value.
    #[error("a value is required")]
    ValueRequired,
    /// The value does not fit the declared type.
    #[error("expected a {expected} value, got {got:?}")]
    TypeMismatch {
        /// Declared type.
        expected: DataType,
        /// Offending value.
        got: OptionValue,
    },
    /// Numeric bounds violated.
    #[error("{value} is outside [{min:?}, {max:?}]")]
    OutOfBounds {
        /// Offending value.
        value: f64,
        /// Lower bound.
        min: Option<f64>,
        /// Upper bound.
        max: Option<f64>,
    },
    /// Enum value outside the declared set.
    #[error("'{0}' is not an allowed value")]
    NotInEnum(String),
    /// A rig-part value points at a part of a disallowed type.
    #[error("'{target}' is a '{found}' part, expected one of {allowed:?}")]
    DisallowedPartType {
        /// Referenced part.
        target: String,
        /// Its registered type.
        found: String,
        /// Allowed types.
        allowed: Vec<String>,
    },
}

impl Rejection {
    /// Whether the skip is logged as an error rather than a warning.
    ///
    /// Unknown keys, read-only options and disallowed part types are warnings; bad values are
    /// errors.
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            Self::UnknownKey | Self::NotEditable | Self::DisallowedPartType { .. }
        )
    }
}

/// Ordered option schema owned by one part.
///
/// `side` and `name` always exist and are always strings.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionTable {
    specs: IndexMap<String, OptionSpec>,
    build_last: bool,
}

impl OptionTable {
    /// Table holding only the `side` and `name` options.
    pub fn new(side: &str, name: &str) -> Self {
        let mut specs = IndexMap::new();
        let mut side_spec = OptionSpec::new(DataType::String, side).value_required();
        side_spec.tool_tip = "Side token leading every node name.".to_owned();
        let mut name_spec = OptionSpec::new(DataType::String, name).value_required();
        name_spec.tool_tip = "Part name token following the side.".to_owned();
        name_spec.order_index = 1;
        specs.insert(SIDE.to_owned(), side_spec);
        specs.insert(NAME.to_owned(), name_spec);
        Self {
            specs,
            build_last: false,
        }
    }

    /// Insert or overwrite an option declaration.
    ///
    /// Overwrites keep their original position. `rig_part` options flag the owning part to build
    /// after every other part.
    pub fn register(&mut self, name: &str, mut spec: OptionSpec) -> RigResult<()> {
        if name == SIDE || name == NAME {
            spec.data_type = DataType::String;
        }
        if spec.data_type == DataType::Enum && spec.enum_values.is_empty() {
            let err = RigError::configuration(format!(
                "enum option '{name}' declares no enum values"
            ));
            tracing::error!(option = name, "{err}");
            return Err(err);
        }
        spec.order_index = self
            .specs
            .get_index_of(name)
            .unwrap_or(self.specs.len());
        if spec.data_type == DataType::RigPart {
            self.build_last = true;
        }
        self.specs.insert(name.to_owned(), spec);
        Ok(())
    }

    /// Register from an untyped declaration, as found in part manifests.
    pub fn register_raw(
        &mut self,
        name: &str,
        data_type: &str,
        default: OptionValue,
    ) -> RigResult<()> {
        let data_type = data_type.parse::<DataType>().inspect_err(|e| {
            tracing::error!(option = name, "{e}");
        })?;
        self.register(name, OptionSpec::new(data_type, default))
    }

    /// Current value of an option.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.specs.get(name).map(|s| &s.value)
    }

    /// Declaration of an option.
    pub fn spec(&self, name: &str) -> Option<&OptionSpec> {
        self.specs.get(name)
    }

    /// String value of an option.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(OptionValue::as_str)
    }

    /// Integer value of an option.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(OptionValue::as_i64)
    }

    /// Numeric value of an option.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(OptionValue::as_f64)
    }

    /// Boolean value of an option.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(OptionValue::as_bool)
    }

    /// Current side token.
    pub fn side(&self) -> &str {
        self.get_str(SIDE).unwrap_or_default()
    }

    /// Current name token.
    pub fn name(&self) -> &str {
        self.get_str(NAME).unwrap_or_default()
    }

    /// Whether a `rig_part` option forces this part to build last.
    pub fn build_last(&self) -> bool {
        self.build_last
    }

    /// Declarations in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionSpec)> {
        self.specs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Current values in order.
    pub fn values(&self) -> IndexMap<String, OptionValue> {
        self.specs
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }

    /// Schema-level check of a candidate value; returns the value as it would be stored.
    pub fn check(&self, key: &str, value: &OptionValue) -> Result<OptionValue, Rejection> {
        let spec = self.specs.get(key).ok_or(Rejection::UnknownKey)?;
        if !spec.editable {
            return Err(Rejection::NotEditable);
        }
        if spec.value_required && !value.is_truthy() {
            return Err(Rejection::ValueRequired);
        }
        let mismatch = || Rejection::TypeMismatch {
            expected: spec.data_type,
            got: value.clone(),
        };
        let typed = match (spec.data_type, value) {
            (DataType::Int, OptionValue::Int(_)) => value.clone(),
            (DataType::Float, OptionValue::Int(i)) => OptionValue::Float(*i as f64),
            (DataType::Float, OptionValue::Float(_)) => value.clone(),
            (DataType::Bool, OptionValue::Bool(_)) => value.clone(),
            (DataType::Enum, OptionValue::Str(s)) => {
                if !spec.enum_values.contains(s) {
                    return Err(Rejection::NotInEnum(s.clone()));
                }
                value.clone()
            }
            (DataType::Enum, OptionValue::Int(i)) => usize::try_from(*i)
                .ok()
                .and_then(|i| spec.enum_values.get(i))
                .map(|s| OptionValue::Str(s.clone()))
                .ok_or_else(|| Rejection::NotInEnum(i.to_string()))?,
            (DataType::Selection, OptionValue::List(_)) => value.clone(),
            (DataType::Selection, OptionValue::Str(s)) => OptionValue::List(vec![s.clone()]),
            (
                DataType::String
                | DataType::SingleSelection
                | DataType::ParentDriver
                | DataType::AttributeDriver
                | DataType::RigPart,
                OptionValue::Str(_),
            ) => value.clone(),
            (_, OptionValue::Null) => value.clone(),
            _ => return Err(mismatch()),
        };
        if let Some(v) = typed.as_f64() {
            let below = spec.min.is_some_and(|min| v < min);
            let above = spec.max.is_some_and(|max| v > max);
            if below || above {
                return Err(Rejection::OutOfBounds {
                    value: v,
                    min: spec.min,
                    max: spec.max,
                });
            }
        }
        Ok(typed)
    }

    /// Store a value without validation. Returns `false` for unknown keys.
    pub fn set_unchecked(&mut self, key: &str, value: OptionValue) -> bool {
        match self.specs.get_mut(key) {
            Some(spec) => {
                spec.value = value;
                true
            }
            None => false,
        }
    }

    /// Replace both the default and the current value. Returns `false` for unknown keys.
    pub fn set_default(&mut self, key: &str, value: OptionValue) -> bool {
        match self.specs.get_mut(key) {
            Some(spec) => {
                spec.default = value.clone();
                spec.value = value;
                true
            }
            None => false,
        }
    }

    /// Restore every value to its default.
    pub fn reset_to_defaults(&mut self) {
        for spec in self.specs.values_mut() {
            spec.value = spec.default.clone();
        }
    }

    /// Apply stored values for known keys; unknown keys are ignored with a warning.
    pub fn load_values<'a, I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (&'a String, &'a OptionValue)>,
    {
        for (k, v) in values {
            if !self.set_unchecked(k, v.clone()) {
                tracing::warn!(option = %k, "ignoring stored value for unknown option");
            }
        }
    }

    /// Serialize the full declaration set for the guide-root `options` attribute.
    pub fn to_metadata(&self) -> RigResult<String> {
        serde_json::to_string(&self.specs)
            .map_err(|e| RigError::serde(format!("serialize options: {e}")))
    }

    /// Parse an `options` attribute written by [`OptionTable::to_metadata`].
    pub fn parse_metadata(s: &str) -> RigResult<IndexMap<String, OptionSpec>> {
        serde_json::from_str(s).map_err(|e| RigError::serde(format!("parse options metadata: {e}")))
    }
}

/// Normalise a `parent_driver` value: trim whitespace and stray delimiters, and point guide
/// placers at the joint built from them.
pub fn canonical_parent_driver(naming: &NameConvention, value: &str) -> String {
    let d = naming.delimiter();
    let trimmed = value.trim().trim_matches(d);
    let placer = NodeType::Placer.suffix();
    match trimmed.strip_suffix(placer) {
        Some(stem) if stem.ends_with(d) => format!("{stem}{}", NodeType::Joint.suffix()),
        _ => trimmed.to_owned(),
    }
}

/// Normalise a `rig_part` value to a `side_name` part identifier.
pub fn canonical_rig_part(naming: &NameConvention, value: &str) -> String {
    let d = naming.delimiter();
    let trimmed = value.trim().trim_matches(d);
    naming
        .part_id_from_guide_root(trimmed)
        .unwrap_or_else(|| trimmed.to_owned())
}

#[cfg(test)]
#[path = "../tests/unit/options.rs"]
mod tests;
