//! Path-accumulating resource resolution.
//!
//! Each [`ResourceElement::child`] step descends one level into the interface
//! map and returns a new element whose tree is the parent's tree plus the
//! child name:
//!
//! ```rust,no_run
//! use disqus_api::{DisqusApi, Interface, Params, ResourceElement};
//!
//! # fn run() -> Result<(), disqus_api::ClientError> {
//! let api = DisqusApi::new(Interface::new()).with_secret_key("secret");
//! let list_threads = api.child("forums").child("listThreads");
//! assert_eq!(list_threads.tree(), ["forums", "listThreads"]);
//!
//! let params = Params::new().with("forum", "disqus").with("method", "GET");
//! let response = list_threads.call(params)?;
//! println!("{:?}", response.into_value());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use tracing::debug;

use crate::request::DisqusRequest;
use crate::{ClientError, Interface, ParamValue, Params, Response};

/// A node that can resolve children from the interface map.
///
/// Implementors decide what kind of element a child step builds through
/// [`ResourceElement::new_element`]; the lookup itself, including insertion
/// of unknown names, is shared.
pub trait ResourceElement {
    /// Element built for each child step.
    type Element;

    /// Interface fragment this element points at.
    fn interface(&self) -> &Interface;

    /// Path segments accumulated so far.
    fn tree(&self) -> &[String];

    /// Builds the element for a resolved child.
    fn new_element(&self, interface: Interface, tree: Vec<String>) -> Self::Element;

    /// Descends into `name`, inserting an empty interface node if the map
    /// does not know it yet.
    fn child(&self, name: &str) -> Self::Element {
        let interface = self.interface().child_or_insert(name);
        let mut tree = self.tree().to_vec();
        tree.push(name.to_owned());
        self.new_element(interface, tree)
    }
}

/// A callable API resource such as `forums/listThreads`.
#[derive(Clone)]
pub struct Resource {
    request: Arc<DisqusRequest>,
    interface: Interface,
    tree: Vec<String>,
}

impl Resource {
    pub(crate) fn new(
        request: Arc<DisqusRequest>,
        interface: Interface,
        tree: Vec<String>,
    ) -> Self {
        Self {
            request,
            interface,
            tree,
        }
    }

    /// Returns the slash-joined resource path.
    pub fn path(&self) -> String {
        self.tree.join("/")
    }

    /// Descends through every `/`- or `.`-separated segment of `path`.
    #[must_use]
    pub fn resource(&self, path: &str) -> Self {
        split_path(path).fold(self.clone(), |element, name| element.child(name))
    }

    /// Calls the resource.
    ///
    /// Fails with [`ClientError::MissingArgument`] when a required parameter
    /// is absent and with [`ClientError::InterfaceNotDefined`] when no HTTP
    /// method can be determined. A `method` entry in `params` overrides the
    /// declared method and is not sent to the API.
    pub fn call(&self, mut params: Params) -> Result<Response, ClientError> {
        self.validate_arguments(&params)?;
        let method = self.validate_method(&mut params)?;
        let path = self.path();
        debug!(%method, %path, "calling resource");
        self.request.dispatch(&method, &path, params)
    }

    fn validate_arguments(&self, params: &Params) -> Result<(), ClientError> {
        let names = params.root_names();
        for required in self.interface.required() {
            if !names.contains(required.as_str()) {
                return Err(ClientError::MissingArgument(required));
            }
        }
        Ok(())
    }

    fn validate_method(&self, params: &mut Params) -> Result<Method, ClientError> {
        let method = match params.remove("method") {
            Some(explicit) => Some(method_name(explicit)),
            None => self.interface.method(),
        };
        let method = method
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ClientError::InterfaceNotDefined { path: self.path() })?;
        Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| ClientError::InvalidMethod(method))
    }
}

impl ResourceElement for Resource {
    type Element = Resource;

    fn interface(&self) -> &Interface {
        &self.interface
    }

    fn tree(&self) -> &[String] {
        &self.tree
    }

    fn new_element(&self, interface: Interface, tree: Vec<String>) -> Resource {
        Resource::new(Arc::clone(&self.request), interface, tree)
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.request, &other.request)
            && self.interface == other.interface
            && self.tree == other.tree
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("tree", &self.tree)
            .field("interface", &self.interface)
            .finish_non_exhaustive()
    }
}

pub(crate) fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '.']).filter(|segment| !segment.is_empty())
}

fn method_name(value: ParamValue) -> String {
    match value {
        ParamValue::Single(name) => name,
        ParamValue::Many(names) => names.into_iter().next().unwrap_or_default(),
    }
}
