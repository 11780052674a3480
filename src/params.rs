//! Ordered request parameters.
//!
//! A parameter value is either a single scalar or a sequence of scalars; a
//! sequence serializes as one `key=value` pair per element, all sharing the
//! same key.

use std::collections::BTreeSet;

use serde_json::Value;
use url::form_urlencoded;

use crate::ClientError;

/// Value of a single request parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamValue {
    /// One scalar value.
    Single(String),
    /// Repeated values sent under the same key.
    Many(Vec<String>),
}

impl ParamValue {
    /// Converts a JSON value into a parameter value.
    ///
    /// Strings are taken verbatim, arrays become [`ParamValue::Many`], and
    /// every other value is rendered as JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::Many(items.iter().map(render_scalar).collect()),
            other => Self::Single(render_scalar(other)),
        }
    }

    /// Appends `value`, turning a single value into a list.
    pub fn push(&mut self, value: impl Into<String>) {
        let value = value.into();
        match self {
            Self::Single(first) => {
                let first = std::mem::take(first);
                *self = Self::Many(vec![first, value]);
            }
            Self::Many(values) => values.push(value),
        }
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_owned())
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Single(value.clone())
    }
}

macro_rules! scalar_param_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    Self::Single(value.to_string())
                }
            }
        )*
    };
}

scalar_param_value!(bool, i32, i64, u32, u64, usize);

impl<T: ToString> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values.iter().map(ToString::to_string).collect())
    }
}

impl<T: ToString> From<&[T]> for ParamValue {
    fn from(values: &[T]) -> Self {
        Self::Many(values.iter().map(ToString::to_string).collect())
    }
}

/// Insertion-ordered parameter set for one API call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads parameters from a JSON object, keeping its key order.
    ///
    /// Array values become lists; any other value is sent as its JSON text,
    /// strings unquoted.
    pub fn from_json_str(raw: &str) -> Result<Self, ClientError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(object) = value else {
            return Err(ClientError::InvalidParams("expected a JSON object".to_owned()));
        };
        Ok(object
            .iter()
            .map(|(key, value)| (key.clone(), ParamValue::from_json(value)))
            .collect())
    }

    /// Adds a parameter and returns the set, for call-site chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a parameter, returning the previous value for that key.
    ///
    /// Replacing an existing key keeps its original position.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        let key = key.into();
        let value = value.into();
        if let Some((_, slot)) = self.entries.iter_mut().find(|(name, _)| *name == key) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut ParamValue> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        let index = self.entries.iter().position(|(name, _)| name == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Returns parameter names with any `:qualifier` suffix removed.
    ///
    /// `query:id` contributes `query`.
    pub fn root_names(&self) -> BTreeSet<&str> {
        self.entries
            .iter()
            .map(|(key, _)| key.split(':').next().unwrap_or(key))
            .collect()
    }

    /// Flattens into ordered key/value pairs. See [`params_list`].
    pub fn flatten(&self) -> Vec<(String, String)> {
        params_list(self)
    }

    /// URL-form-encodes the flattened pairs.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.flatten())
            .finish()
    }
}

/// Flattens parameters into ordered `(key, value)` pairs.
///
/// Keys keep insertion order. A [`ParamValue::Many`] entry expands into one
/// pair per element, in element order.
pub fn params_list(params: &Params) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len());
    for (key, value) in &params.entries {
        match value {
            ParamValue::Single(single) => pairs.push((key.clone(), single.clone())),
            ParamValue::Many(values) => {
                pairs.extend(values.iter().map(|item| (key.clone(), item.clone())));
            }
        }
    }
    pairs
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

impl<K, V> Extend<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}
