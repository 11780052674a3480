//! Interface-driven Rust and Python-facing client for the Disqus JSON API.
//!
//! Public API layers:
//! - [`Interface`]: the declarative map of resources, their HTTP methods and
//!   required parameters.
//! - [`DisqusApi`]/[`Resource`]: resolve resource paths through
//!   [`ResourceElement::child`] and call them with [`Params`].
//! - [`Paginator`] and the [`paginator`] decorators: follow cursors across
//!   list responses.
//! - [`ClientError`]: unified error type used by all operations.
//!
//! The HTTP transport is pluggable through [`transport::Connector`]; the
//! default connector uses a blocking `reqwest` client.

mod client;
mod error;
mod interface;
pub mod paginator;
mod params;
mod request;
mod resource;
mod response;
pub mod transport;

/// Client root and its settings.
pub use client::{ClientConfig, DEFAULT_API_VERSION, DisqusApi};
/// Error type returned by all client operations.
pub use error::ClientError;
pub use interface::{EndpointDefinition, Interface};
pub use paginator::{Endpoint, ItemSource, Paginator};
pub use params::{ParamValue, Params, params_list};
pub use request::{DEFAULT_HOST, DisqusRequest, USER_AGENT};
pub use resource::{Resource, ResourceElement};
pub use response::{Cursor, Page, Response};

#[cfg(feature = "python")]
mod python;
