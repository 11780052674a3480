use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Continuation metadata returned alongside list responses.
///
/// `more` and `id` drive pagination; any other keys the API sends
/// (`next`, `prev`, `hasNext`, ...) are kept in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    #[serde(default)]
    pub more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Cursor {
    /// Creates a cursor pointing at `id`.
    pub fn new(more: bool, id: impl Into<Value>) -> Self {
        Self {
            more,
            id: Some(id.into()),
            extra: Map::new(),
        }
    }

    /// Returns the continuation token as a request parameter value.
    ///
    /// Returns `None` when no further page is available.
    pub fn next_id(&self) -> Option<String> {
        if !self.more {
            return None;
        }
        match self.id.as_ref()? {
            Value::Null => None,
            Value::String(token) => Some(token.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A decoded list response plus its cursor.
///
/// Iteration, length and lookups operate on the items only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    items: Vec<Value>,
    cursor: Cursor,
}

impl Page {
    pub fn new(items: Vec<Value>, cursor: Option<Cursor>) -> Self {
        Self {
            items,
            cursor: cursor.unwrap_or_default(),
        }
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Returns the items in `range`, clamped to the page bounds.
    pub fn slice(&self, range: Range<usize>) -> &[Value] {
        let end = range.end.min(self.items.len());
        let start = range.start.min(end);
        &self.items[start..end]
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.items.contains(value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn into_parts(self) -> (Vec<Value>, Cursor) {
        (self.items, self.cursor)
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Result: {}>", Value::Array(self.items.clone()))
    }
}

impl IntoIterator for Page {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Page {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl std::ops::Index<usize> for Page {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.items[index]
    }
}

/// Decoded payload of a successful call.
///
/// List payloads are wrapped in a [`Page`]; everything else is passed
/// through as-is.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    List(Page),
    Value(Value),
}

impl Response {
    pub fn as_page(&self) -> Option<&Page> {
        match self {
            Self::List(page) => Some(page),
            Self::Value(_) => None,
        }
    }

    pub fn into_page(self) -> Option<Page> {
        match self {
            Self::List(page) => Some(page),
            Self::Value(_) => None,
        }
    }

    /// Converts back into a plain JSON value, dropping any cursor.
    pub fn into_value(self) -> Value {
        match self {
            Self::List(page) => Value::Array(page.into_items()),
            Self::Value(value) => value,
        }
    }
}
