//! Declarative interface map driving resource resolution.
//!
//! The map is a tree: every node may declare the `required` parameter names
//! and the HTTP `method` of the endpoint it describes, and any number of named
//! children. Nodes are shared by reference, so a child inserted through one
//! handle is visible through every other handle derived from the same root.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::ClientError;

const REQUIRED_KEY: &str = "required";
const METHOD_KEY: &str = "method";

#[derive(Debug, Default)]
struct InterfaceNode {
    required: Vec<String>,
    method: Option<String>,
    children: BTreeMap<String, Interface>,
}

/// Shared handle to one node of the interface map.
///
/// Cloning the handle does not copy the node. Equality compares node
/// contents, so two independently built maps with the same shape are equal.
#[derive(Clone, Default)]
pub struct Interface {
    node: Arc<RwLock<InterfaceNode>>,
}

/// One callable endpoint found in the interface map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointDefinition {
    /// Slash-joined resource path, for example `forums/listThreads`.
    pub path: String,
    /// Declared HTTP method.
    pub method: String,
    /// Declared required parameter names.
    pub required: Vec<String>,
}

impl Interface {
    /// Creates an empty interface node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an interface description from JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self, ClientError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    /// Builds an interface map from a decoded JSON document.
    ///
    /// `required` must be an array of strings and `method` a string. Every
    /// other key holding an object becomes a child; remaining keys (docs,
    /// format lists) are ignored.
    pub fn from_value(value: &Value) -> Result<Self, ClientError> {
        let object = value
            .as_object()
            .ok_or_else(|| ClientError::InvalidInterface("expected a JSON object".to_owned()))?;

        let mut node = InterfaceNode::default();
        for (key, entry) in object {
            match key.as_str() {
                REQUIRED_KEY => node.required = parse_required(entry)?,
                METHOD_KEY => {
                    let method = entry.as_str().ok_or_else(|| {
                        ClientError::InvalidInterface(format!(
                            "`method` must be a string, got {entry}"
                        ))
                    })?;
                    node.method = Some(method.to_owned());
                }
                _ if entry.is_object() => {
                    node.children.insert(key.clone(), Self::from_value(entry)?);
                }
                _ => {}
            }
        }

        Ok(Self::from_node(node))
    }

    /// Returns a copy of the declared required parameter names.
    pub fn required(&self) -> Vec<String> {
        self.read().required.clone()
    }

    /// Returns the declared HTTP method, if any.
    pub fn method(&self) -> Option<String> {
        self.read().method.clone()
    }

    /// Sets the required parameter names on this node.
    ///
    /// Writes through to the shared node, so every handle to it sees the change.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_required<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write().required = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the declared HTTP method on this node, writing through to the
    /// shared node.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_method(self, method: impl Into<String>) -> Self {
        self.write().method = Some(method.into());
        self
    }

    /// Returns `true` when a child named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.read().children.contains_key(name)
    }

    /// Returns the child named `name` without creating it.
    pub fn child(&self, name: &str) -> Option<Self> {
        self.read().children.get(name).cloned()
    }

    /// Returns the child named `name`, inserting an empty node on a miss.
    ///
    /// The inserted node stays in the map, so later lookups of the same name
    /// return the same shared instance.
    pub fn child_or_insert(&self, name: &str) -> Self {
        if let Some(existing) = self.child(name) {
            return existing;
        }
        self.write()
            .children
            .entry(name.to_owned())
            .or_default()
            .clone()
    }

    /// Returns `true` when this node declares nothing and has no children.
    pub fn is_empty(&self) -> bool {
        let node = self.read();
        node.required.is_empty() && node.method.is_none() && node.children.is_empty()
    }

    /// Returns `true` when both handles point at the same node.
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Lists every descendant that declares an HTTP method, sorted by path.
    pub fn endpoints(&self) -> Vec<EndpointDefinition> {
        let mut found = Vec::new();
        self.collect_endpoints(&mut Vec::new(), &mut found);
        found
    }

    fn collect_endpoints(&self, prefix: &mut Vec<String>, found: &mut Vec<EndpointDefinition>) {
        let node = self.read();
        if let Some(method) = &node.method
            && !prefix.is_empty()
        {
            found.push(EndpointDefinition {
                path: prefix.join("/"),
                method: method.clone(),
                required: node.required.clone(),
            });
        }
        for (name, child) in &node.children {
            prefix.push(name.clone());
            child.collect_endpoints(prefix, found);
            prefix.pop();
        }
    }

    fn from_node(node: InterfaceNode) -> Self {
        Self {
            node: Arc::new(RwLock::new(node)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, InterfaceNode> {
        self.node.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InterfaceNode> {
        self.node.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for Interface {
    fn eq(&self, other: &Self) -> bool {
        if self.same_instance(other) {
            return true;
        }
        let (left, right) = (self.read(), other.read());
        left.required == right.required
            && left.method == right.method
            && left.children == right.children
    }
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.read();
        f.debug_struct("Interface")
            .field("required", &node.required)
            .field("method", &node.method)
            .field("children", &node.children)
            .finish()
    }
}

fn parse_required(entry: &Value) -> Result<Vec<String>, ClientError> {
    let invalid = || {
        ClientError::InvalidInterface(format!(
            "`required` must be a list of strings, got {entry}"
        ))
    };
    entry
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|name| name.as_str().map(str::to_owned).ok_or_else(invalid))
        .collect()
}
