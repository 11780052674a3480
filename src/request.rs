use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::transport::{Connector, ReqwestConnector};
use crate::{ClientError, Cursor, Page, ParamValue, Params, Response};

/// Host every request is sent to unless overridden.
pub const DEFAULT_HOST: &str = "disqus.com";

/// `User-Agent` header value sent with every request.
pub const USER_AGENT: &str = concat!("disqus-api/", env!("CARGO_PKG_VERSION"));

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Sends one API call and decodes its response.
///
/// Holds the default credential parameters, the API version and the
/// connector used to reach the API host.
pub struct DisqusRequest {
    defaults: Params,
    version: String,
    host: String,
    connector: Arc<dyn Connector>,
}

impl DisqusRequest {
    /// Creates a dispatcher using the default HTTPS connector.
    pub fn new(defaults: Params, version: impl Into<String>) -> Self {
        Self::with_connector(defaults, version, ReqwestConnector::new())
    }

    /// Creates a dispatcher using a custom connector.
    pub fn with_connector(
        defaults: Params,
        version: impl Into<String>,
        connector: impl Connector + 'static,
    ) -> Self {
        Self::with_shared_connector(defaults, version, Arc::new(connector))
    }

    /// Creates a dispatcher over a connector shared with other dispatchers.
    pub fn with_shared_connector(
        defaults: Params,
        version: impl Into<String>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            defaults,
            version: version.into(),
            host: DEFAULT_HOST.to_owned(),
            connector,
        }
    }

    /// Overrides the API host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub(crate) fn connector(&self) -> Arc<dyn Connector> {
        Arc::clone(&self.connector)
    }

    /// Headers attached to every request.
    pub fn headers() -> [(&'static str, &'static str); 1] {
        [("User-Agent", USER_AGENT)]
    }

    /// Sends `params` to the resource at `path` and decodes the answer.
    ///
    /// Default parameters are merged in first; caller-supplied values win.
    /// `GET` requests carry the encoded parameters in the query string, all
    /// other methods send them as a form body.
    pub fn dispatch(
        &self,
        method: &Method,
        path: &str,
        mut params: Params,
    ) -> Result<Response, ClientError> {
        self.merge_defaults(&mut params);
        let encoded = params.encode();
        let versioned = format!("/api/{}/{}.json", self.version, path);

        let mut headers = Self::headers().to_vec();
        let (request_path, body) = if *method == Method::GET {
            (format!("{versioned}?{encoded}"), String::new())
        } else {
            headers.push(("Content-Type", FORM_CONTENT_TYPE));
            (versioned.clone(), encoded)
        };

        let names: Vec<&str> = params.iter().map(|(name, _)| name).collect();
        debug!(%method, path = %versioned, params = ?names, "dispatching API request");
        let mut connection = self.connector.open(&self.host)?;
        connection.request(method, &request_path, &body, &headers)?;
        let response = connection.response()?;
        debug!(status = response.status, "received API response");

        let data: Value = serde_json::from_slice(&response.body)?;
        if response.status != 200 {
            let code = data
                .get("code")
                .and_then(Value::as_i64)
                .unwrap_or_else(|| i64::from(response.status));
            let message = data.get("response").cloned().unwrap_or(Value::Null);
            warn!(code, status = response.status, %path, "API returned an error");
            return Err(ClientError::from_api_code(code, message));
        }

        decode_success(data)
    }

    fn merge_defaults(&self, params: &mut Params) {
        for (name, value) in self.defaults.iter() {
            if is_blank(value) || params.contains_key(name) {
                continue;
            }
            params.insert(name, value.clone());
        }
    }
}

impl fmt::Debug for DisqusRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Omits credentials.
        f.debug_struct("DisqusRequest")
            .field("version", &self.version)
            .field("host", &self.host)
            .field("connector", &self.connector)
            .finish_non_exhaustive()
    }
}

fn is_blank(value: &ParamValue) -> bool {
    match value {
        ParamValue::Single(single) => single.is_empty(),
        ParamValue::Many(values) => values.is_empty(),
    }
}

fn decode_success(mut data: Value) -> Result<Response, ClientError> {
    let payload = data
        .get_mut("response")
        .map(Value::take)
        .ok_or_else(|| ClientError::UnexpectedResponse("missing `response` field".to_owned()))?;

    match payload {
        Value::Array(items) => {
            let cursor = match data.get_mut("cursor").map(Value::take) {
                None | Some(Value::Null) => None,
                Some(raw) => Some(serde_json::from_value::<Cursor>(raw)?),
            };
            Ok(Response::List(Page::new(items, cursor)))
        }
        other => Ok(Response::Value(other)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use reqwest::Method;
    use serde_json::json;

    use super::{DEFAULT_HOST, DisqusRequest, USER_AGENT};
    use crate::transport::{Connection, Connector, HttpResponse};
    use crate::{ClientError, Cursor, Page, Params, Response};

    /// One request as seen by [`ScriptedConnector`].
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub(crate) struct RecordedRequest {
        pub host: String,
        pub method: Method,
        pub path: String,
        pub body: String,
        pub headers: Vec<(String, String)>,
    }

    /// Connector replaying canned responses and recording every request.
    #[derive(Clone, Debug, Default)]
    pub(crate) struct ScriptedConnector {
        responses: Arc<Mutex<VecDeque<HttpResponse>>>,
        requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    impl ScriptedConnector {
        pub(crate) fn reply(self, status: u16, body: &str) -> Self {
            self.responses
                .lock()
                .expect("lock")
                .push_back(HttpResponse {
                    status,
                    body: body.as_bytes().to_vec(),
                });
            self
        }

        pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().expect("lock").clone()
        }

        pub(crate) fn last_request(&self) -> RecordedRequest {
            self.requests().pop().expect("a request was sent")
        }
    }

    impl Connector for ScriptedConnector {
        fn open(&self, host: &str) -> Result<Box<dyn Connection>, ClientError> {
            Ok(Box::new(ScriptedConnection {
                connector: self.clone(),
                host: host.to_owned(),
            }))
        }
    }

    struct ScriptedConnection {
        connector: ScriptedConnector,
        host: String,
    }

    impl Connection for ScriptedConnection {
        fn request(
            &mut self,
            method: &Method,
            path: &str,
            body: &str,
            headers: &[(&str, &str)],
        ) -> Result<(), ClientError> {
            self.connector
                .requests
                .lock()
                .expect("lock")
                .push(RecordedRequest {
                    host: self.host.clone(),
                    method: method.clone(),
                    path: path.to_owned(),
                    body: body.to_owned(),
                    headers: headers
                        .iter()
                        .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
                        .collect(),
                });
            Ok(())
        }

        fn response(&mut self) -> Result<HttpResponse, ClientError> {
            self.connector
                .responses
                .lock()
                .expect("lock")
                .pop_front()
                .ok_or_else(|| ClientError::UnexpectedResponse("no scripted response".into()))
        }
    }

    fn dispatcher(connector: &ScriptedConnector) -> DisqusRequest {
        let defaults = Params::new().with("api_secret", "secret");
        DisqusRequest::with_connector(defaults, "3.0", connector.clone())
    }

    fn ok(body: &str) -> ScriptedConnector {
        ScriptedConnector::default().reply(200, body)
    }

    #[test]
    fn merges_default_secret() {
        let connector = ok(r#"{"response": 1}"#);
        dispatcher(&connector)
            .dispatch(&Method::POST, "a/b", Params::new())
            .expect("success");
        assert_eq!(connector.last_request().body, "api_secret=secret");
    }

    /// Shared buffer collecting formatted log output.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn debug_logs_leave_out_credential_values() {
        let connector = ok(r#"{"response": 1}"#);
        let defaults = Params::new()
            .with("api_secret", "TOPSECRET")
            .with("access_token", "USERTOKEN");
        let request = DisqusRequest::with_connector(defaults, "3.0", connector.clone());

        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            request
                .dispatch(&Method::GET, "a/b", Params::new().with("forum", "disqus"))
                .expect("success");
        });

        let logs = String::from_utf8(buffer.0.lock().expect("lock").clone()).expect("utf-8");
        assert!(logs.contains("/api/3.0/a/b.json"));
        assert!(logs.contains("api_secret"));
        assert!(!logs.contains("TOPSECRET"));
        assert!(!logs.contains("USERTOKEN"));
        assert!(connector.last_request().path.contains("api_secret=TOPSECRET"));
    }

    #[test]
    fn caller_values_override_defaults() {
        let connector = ok(r#"{"response": 1}"#);
        dispatcher(&connector)
            .dispatch(&Method::POST, "a/b", Params::new().with("api_secret", "mine"))
            .expect("success");
        assert_eq!(connector.last_request().body, "api_secret=mine");
    }

    #[test]
    fn blank_defaults_are_skipped() {
        let connector = ok(r#"{"response": 1}"#);
        let defaults = Params::new()
            .with("api_secret", "secret")
            .with("api_key", "")
            .with("access_token", "");
        DisqusRequest::with_connector(defaults, "3.0", connector.clone())
            .dispatch(&Method::POST, "a/b", Params::new())
            .expect("success");
        assert_eq!(connector.last_request().body, "api_secret=secret");
    }

    #[test]
    fn connects_to_api_host() {
        let connector = ok(r#"{"response": 1}"#);
        dispatcher(&connector)
            .dispatch(&Method::POST, "a/b", Params::new())
            .expect("success");
        assert_eq!(connector.last_request().host, DEFAULT_HOST);
    }

    #[test]
    fn host_can_be_overridden() {
        let connector = ok(r#"{"response": 1}"#);
        dispatcher(&connector)
            .with_host("staging.disqus.com")
            .dispatch(&Method::POST, "a/b", Params::new())
            .expect("success");
        assert_eq!(connector.last_request().host, "staging.disqus.com");
    }

    #[test]
    fn post_sends_form_body() {
        let connector = ok(r#"{"response": 1}"#);
        dispatcher(&connector)
            .dispatch(&Method::POST, "a/b", Params::new())
            .expect("success");
        let request = connector.last_request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/api/3.0/a/b.json");
        assert_eq!(request.body, "api_secret=secret");
        assert!(
            request
                .headers
                .contains(&("User-Agent".to_owned(), USER_AGENT.to_owned()))
        );
        assert!(request.headers.contains(&(
            "Content-Type".to_owned(),
            "application/x-www-form-urlencoded".to_owned()
        )));
    }

    #[test]
    fn get_sends_query_string() {
        let connector = ok(r#"{"response": 1}"#);
        dispatcher(&connector)
            .dispatch(&Method::GET, "a/b", Params::new())
            .expect("success");
        let request = connector.last_request();
        assert_eq!(request.path, "/api/3.0/a/b.json?api_secret=secret");
        assert_eq!(request.body, "");
        assert_eq!(
            request.headers,
            vec![("User-Agent".to_owned(), USER_AGENT.to_owned())]
        );
    }

    #[test]
    fn get_expands_list_parameters() {
        let connector = ok(r#"{"response": []}"#);
        dispatcher(&connector)
            .dispatch(
                &Method::GET,
                "threads/set",
                Params::new().with("thread", vec![1, 2]),
            )
            .expect("success");
        assert_eq!(
            connector.last_request().path,
            "/api/3.0/threads/set.json?thread=1&thread=2&api_secret=secret"
        );
    }

    #[test]
    fn scalar_response_is_passed_through() {
        let connector = ok(r#"{"response": 1}"#);
        let response = dispatcher(&connector)
            .dispatch(&Method::POST, "a/b", Params::new())
            .expect("success");
        assert_eq!(response, Response::Value(json!(1)));
    }

    #[test]
    fn list_response_is_wrapped_with_cursor() {
        let connector = ok(r#"{"response": [1, 2], "cursor": {"more": true, "id": 3}}"#);
        let response = dispatcher(&connector)
            .dispatch(&Method::POST, "a/b", Params::new())
            .expect("success");
        assert_eq!(
            response,
            Response::List(Page::new(
                vec![json!(1), json!(2)],
                Some(Cursor::new(true, 3))
            ))
        );
    }

    #[test]
    fn list_response_without_cursor_gets_empty_cursor() {
        let connector = ok(r#"{"response": [1], "cursor": null}"#);
        let response = dispatcher(&connector)
            .dispatch(&Method::GET, "a/b", Params::new())
            .expect("success");
        let page = response.into_page().expect("list response");
        assert!(page.cursor().is_empty());
    }

    #[test]
    fn missing_response_field_is_rejected() {
        let connector = ok(r#"{"code": 0}"#);
        let error = dispatcher(&connector)
            .dispatch(&Method::GET, "a/b", Params::new())
            .expect_err("no response field");
        assert!(matches!(error, ClientError::UnexpectedResponse(_)));
    }

    fn error_for_code(code: i64) -> ClientError {
        let connector = ScriptedConnector::default()
            .reply(500, &format!(r#"{{"response": [1, 2], "code": {code}}}"#));
        dispatcher(&connector)
            .dispatch(&Method::POST, "a/b", Params::new())
            .expect_err("error status")
    }

    #[test]
    fn generic_api_error() {
        let error = error_for_code(1);
        assert!(matches!(error, ClientError::Api { code: 1, .. }));
        assert_eq!(error.api_message(), Some(&json!([1, 2])));
    }

    #[test]
    fn rate_limit_errors() {
        assert!(matches!(error_for_code(13), ClientError::RateLimit { code: 13, .. }));
        assert!(matches!(error_for_code(14), ClientError::RateLimit { code: 14, .. }));
    }

    #[test]
    fn invalid_access_token_error() {
        assert!(matches!(
            error_for_code(18),
            ClientError::InvalidAccessToken { code: 18, .. }
        ));
    }

    #[test]
    fn error_without_code_uses_http_status() {
        let connector = ScriptedConnector::default().reply(503, r#"{"response": "down"}"#);
        let error = dispatcher(&connector)
            .dispatch(&Method::GET, "a/b", Params::new())
            .expect_err("error status");
        assert_eq!(error.api_code(), Some(503));
    }

    #[test]
    fn malformed_json_propagates() {
        let connector = ScriptedConnector::default().reply(200, "<html>");
        let error = dispatcher(&connector)
            .dispatch(&Method::GET, "a/b", Params::new())
            .expect_err("not json");
        assert!(matches!(error, ClientError::Json(_)));
    }
}
