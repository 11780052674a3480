use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::request::{DEFAULT_HOST, DisqusRequest};
use crate::resource::split_path;
use crate::transport::{Connector, ReqwestConnector};
use crate::{Interface, Params, Resource, ResourceElement};

/// Default API version segment used in request paths.
pub const DEFAULT_API_VERSION: &str = "3.0";

/// Construction-time client settings.
///
/// The three credentials become default parameters (`api_secret`, `api_key`
/// and `access_token`) merged into every request unless a call sets them
/// explicitly. Missing or empty credentials are not sent.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub secret_key: Option<String>,
    pub public_key: Option<String>,
    pub access_token: Option<String>,
    pub api_version: String,
    pub host: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            public_key: None,
            access_token: None,
            api_version: DEFAULT_API_VERSION.to_owned(),
            host: DEFAULT_HOST.to_owned(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("secret_key", &redact(self.secret_key.as_ref()))
            .field("public_key", &redact(self.public_key.as_ref()))
            .field("access_token", &redact(self.access_token.as_ref()))
            .field("api_version", &self.api_version)
            .field("host", &self.host)
            .finish()
    }
}

fn redact(value: Option<&String>) -> Option<&'static str> {
    value.map(|_| "<redacted>")
}

impl ClientConfig {
    /// Default parameters derived from the credentials, in wire order.
    pub fn default_params(&self) -> Params {
        [
            ("api_secret", &self.secret_key),
            ("api_key", &self.public_key),
            ("access_token", &self.access_token),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|value| (name, value.clone())))
        .collect()
    }
}

/// Root of the resource tree for one Disqus API client.
///
/// Owns the interface map and the request dispatcher; every [`Resource`]
/// resolved from it shares both.
///
/// ```rust,no_run
/// use disqus_api::{DisqusApi, Interface, Params, ResourceElement};
///
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let interface = Interface::from_json_str(&std::fs::read_to_string("interfaces.json")?)?;
/// let api = DisqusApi::new(interface).with_secret_key("secret");
/// let threads = api.resource("trends/listThreads").call(Params::new())?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct DisqusApi {
    interface: Interface,
    config: ClientConfig,
    request: Arc<DisqusRequest>,
}

impl DisqusApi {
    /// Creates a client with default settings over `interface`.
    pub fn new(interface: Interface) -> Self {
        Self::from_config(interface, ClientConfig::default())
    }

    /// Creates a client from explicit settings using the HTTPS connector.
    pub fn from_config(interface: Interface, config: ClientConfig) -> Self {
        Self::build(interface, config, Arc::new(ReqwestConnector::new()))
    }

    /// Returns a new client with the API secret key set.
    #[must_use]
    pub fn with_secret_key(mut self, key: impl Into<String>) -> Self {
        self.config.secret_key = Some(key.into());
        self.rebuild()
    }

    /// Returns a new client with the public API key set.
    #[must_use]
    pub fn with_public_key(mut self, key: impl Into<String>) -> Self {
        self.config.public_key = Some(key.into());
        self.rebuild()
    }

    /// Returns a new client with the user access token set.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = Some(token.into());
        self.rebuild()
    }

    /// Returns a new client targeting another API version.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self.rebuild()
    }

    /// Returns a new client sending requests through `connector`.
    #[must_use]
    pub fn with_connector(self, connector: impl Connector + 'static) -> Self {
        Self::build(self.interface, self.config, Arc::new(connector))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the shared request dispatcher.
    pub fn request(&self) -> &Arc<DisqusRequest> {
        &self.request
    }

    /// Resolves a `/`- or `.`-separated resource path, for example
    /// `forums/listThreads`.
    pub fn resource(&self, path: &str) -> Resource {
        let mut segments = split_path(path);
        let Some(first) = segments.next() else {
            return self.new_element(self.interface.clone(), Vec::new());
        };
        segments.fold(self.child(first), |element, name| element.child(name))
    }

    fn rebuild(self) -> Self {
        let connector = self.request.connector();
        Self::build(self.interface, self.config, connector)
    }

    fn build(interface: Interface, config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let request = DisqusRequest::with_shared_connector(
            config.default_params(),
            config.api_version.clone(),
            connector,
        )
        .with_host(config.host.clone());
        Self {
            interface,
            config,
            request: Arc::new(request),
        }
    }
}

impl ResourceElement for DisqusApi {
    type Element = Resource;

    fn interface(&self) -> &Interface {
        &self.interface
    }

    fn tree(&self) -> &[String] {
        &[]
    }

    fn new_element(&self, interface: Interface, tree: Vec<String>) -> Resource {
        Resource::new(Arc::clone(&self.request), interface, tree)
    }
}
