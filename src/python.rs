use std::sync::Mutex;

use pyo3::create_exception;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use serde_json::Value;

use crate::{ClientConfig, ClientError, DisqusApi, Interface, Paginator, Params, ResourceElement};

create_exception!(disqus_api, APIError, PyRuntimeError, "Error reported by the Disqus API.");
create_exception!(disqus_api, RateLimitError, APIError, "The API rate limit was exceeded.");
create_exception!(
    disqus_api,
    InvalidAccessToken,
    APIError,
    "The API rejected the access token."
);

#[pyclass(name = "EndpointDefinition", get_all)]
pub struct PyEndpointDefinition {
    pub path: String,
    pub method: String,
    pub required: Vec<String>,
}

#[pyclass(name = "Client")]
pub struct PyClient {
    inner: Mutex<DisqusApi>,
}

#[pymethods]
impl PyClient {
    #[new]
    #[pyo3(signature = (interfaces_json, secret_key=None, public_key=None, access_token=None, version=None))]
    fn new(
        interfaces_json: String,
        secret_key: Option<String>,
        public_key: Option<String>,
        access_token: Option<String>,
        version: Option<String>,
    ) -> PyResult<Self> {
        let interface = Interface::from_json_str(&interfaces_json).map_err(to_py_value_error)?;
        let mut config = ClientConfig {
            secret_key,
            public_key,
            access_token,
            ..ClientConfig::default()
        };
        if let Some(version) = version {
            config.api_version = version;
        }

        Ok(Self {
            inner: Mutex::new(DisqusApi::from_config(interface, config)),
        })
    }

    fn endpoints(&self) -> PyResult<Vec<PyEndpointDefinition>> {
        let client = self
            .inner
            .lock()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        Ok(client
            .interface()
            .endpoints()
            .into_iter()
            .map(|endpoint| PyEndpointDefinition {
                path: endpoint.path,
                method: endpoint.method,
                required: endpoint.required,
            })
            .collect())
    }

    #[pyo3(signature = (path, params_json=None, method=None))]
    fn call(
        &self,
        path: String,
        params_json: Option<String>,
        method: Option<String>,
    ) -> PyResult<String> {
        let mut params = parse_params_arg(params_json)?;
        if let Some(method) = method {
            params.insert("method", method);
        }

        let client = self
            .inner
            .lock()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        let value = client
            .resource(&path)
            .call(params)
            .map_err(to_py_error)?
            .into_value();

        Ok(value.to_string())
    }

    #[pyo3(signature = (path, params_json=None, limit=None, silence_limit=false))]
    fn paginate(
        &self,
        path: String,
        params_json: Option<String>,
        limit: Option<usize>,
        silence_limit: bool,
    ) -> PyResult<String> {
        let params = parse_params_arg(params_json)?;

        let client = self
            .inner
            .lock()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        let paginator = Paginator::new(client.resource(&path), params);
        let items = paginator
            .run(limit, silence_limit)
            .collect::<Result<Vec<_>, _>>()
            .map_err(to_py_error)?;

        Ok(Value::Array(items).to_string())
    }
}

#[pymodule]
fn disqus_api(_py: Python<'_>, module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyEndpointDefinition>()?;
    module.add_class::<PyClient>()?;
    let py = module.py();
    module.add("APIError", py.get_type::<APIError>())?;
    module.add("RateLimitError", py.get_type::<RateLimitError>())?;
    module.add("InvalidAccessToken", py.get_type::<InvalidAccessToken>())?;
    Ok(())
}

fn to_py_value_error(error: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(error.to_string())
}

/// Local validation failures map to `ValueError`, API failures to the
/// `APIError` family, everything else to `RuntimeError`.
fn to_py_error(error: ClientError) -> PyErr {
    match &error {
        ClientError::MissingArgument(_)
        | ClientError::InterfaceNotDefined { .. }
        | ClientError::InvalidMethod(_)
        | ClientError::InvalidParams(_) => to_py_value_error(error),
        ClientError::RateLimit { .. } => RateLimitError::new_err(error.to_string()),
        ClientError::InvalidAccessToken { .. } => InvalidAccessToken::new_err(error.to_string()),
        ClientError::Api { .. } => APIError::new_err(error.to_string()),
        _ => PyRuntimeError::new_err(error.to_string()),
    }
}

fn parse_params_arg(raw_json: Option<String>) -> PyResult<Params> {
    match raw_json {
        Some(raw_json) => Params::from_json_str(&raw_json).map_err(to_py_value_error),
        None => Ok(Params::new()),
    }
}
