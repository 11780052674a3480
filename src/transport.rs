//! Pluggable HTTP connector.
//!
//! The dispatcher only needs to open a connection to a host, issue a single
//! request on it and read the full response back. [`ReqwestConnector`] is the
//! default implementation; tests and callers with custom transports provide
//! their own [`Connector`].

use std::fmt::Debug;
use std::time::Duration;

use reqwest::{Method, Url};

use crate::ClientError;

/// Status and raw body of a completed HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Opens connections to an API host.
pub trait Connector: Debug + Send + Sync {
    fn open(&self, host: &str) -> Result<Box<dyn Connection>, ClientError>;
}

/// One request/response exchange with a host.
pub trait Connection {
    /// Issues a request. `path` already carries the query string, if any.
    fn request(
        &mut self,
        method: &Method,
        path: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Result<(), ClientError>;

    /// Reads the response to the last issued request.
    fn response(&mut self) -> Result<HttpResponse, ClientError>;
}

/// HTTPS connector backed by a blocking `reqwest` client.
#[derive(Clone, Debug, Default)]
pub struct ReqwestConnector {
    http: reqwest::blocking::Client,
}

impl ReqwestConnector {
    /// Creates a connector with `reqwest` defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector whose requests fail after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }
}

impl Connector for ReqwestConnector {
    fn open(&self, host: &str) -> Result<Box<dyn Connection>, ClientError> {
        let origin = format!("https://{host}");
        let base_url = Url::parse(&origin).map_err(|_| ClientError::InvalidUrl(origin))?;
        Ok(Box::new(ReqwestConnection {
            http: self.http.clone(),
            base_url,
            pending: None,
        }))
    }
}

struct ReqwestConnection {
    http: reqwest::blocking::Client,
    base_url: Url,
    pending: Option<reqwest::blocking::RequestBuilder>,
}

impl Connection for ReqwestConnection {
    fn request(
        &mut self,
        method: &Method,
        path: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|_| ClientError::InvalidUrl(path.to_owned()))?;

        let mut request = self.http.request(method.clone(), url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if !body.is_empty() {
            request = request.body(body.to_owned());
        }

        self.pending = Some(request);
        Ok(())
    }

    fn response(&mut self) -> Result<HttpResponse, ClientError> {
        let request = self.pending.take().ok_or_else(|| {
            ClientError::UnexpectedResponse("no request was issued on this connection".to_owned())
        })?;
        let response = request.send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        Ok(HttpResponse { status, body })
    }
}
