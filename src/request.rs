//! Generic HTTP request execution
//!
//! Every operation funnels into [`Executor::execute`]: one blocking call with
//! basic-auth credentials, unset parameters stripped, and the response body
//! parsed as JSON when possible.

use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::DispatchError;

/// Parameter key carrying the request body rather than a query parameter.
pub const BODY_PARAM: &str = "data";

/// Opaque credential pair sent as HTTP basic auth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

/// Outcome of one HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestResult {
    /// Parsed JSON body, or the raw text when it is not JSON
    pub body: Value,
    /// Whether the response status was 2xx
    pub ok: bool,
}

/// Blocking client with no request timeout: a call waits until the transport
/// resolves or fails.
pub fn build_client() -> Result<Client, DispatchError> {
    Client::builder()
        .timeout(None)
        .build()
        .map_err(DispatchError::ClientBuild)
}

/// Sends requests against a fixed base URL with fixed credentials.
#[derive(Debug, Clone)]
pub struct Executor {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl Executor {
    pub fn new(client: Client, base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            credentials,
        }
    }

    /// Perform a single request.
    ///
    /// `data` in `params` becomes the request body; other non-null entries are
    /// sent as query parameters. Non-2xx responses are not errors: they come
    /// back with `ok == false`. Transport failures are returned as errors.
    pub fn execute(
        &self,
        method: Method,
        path: &str,
        params: Option<Map<String, Value>>,
    ) -> Result<RequestResult, DispatchError> {
        let (query, body) = split_params(params.unwrap_or_default());
        let url = join_url(&self.base_url, path);
        debug!(%method, %url, params = query.len(), has_body = body.is_some(), "sending request");

        let mut req = self.client.request(method, &url).basic_auth(
            &self.credentials.access_key,
            Some(&self.credentials.secret_key),
        );
        if !query.is_empty() {
            req = req.query(&query);
        }
        match body {
            Some(Value::String(text)) => req = req.body(text),
            Some(other) => req = req.json(&other),
            None => {}
        }

        send_request(req)
    }
}

fn send_request(req: reqwest::blocking::RequestBuilder) -> Result<RequestResult, DispatchError> {
    let resp = req.send().map_err(DispatchError::RequestFailed)?;
    let status = resp.status();
    let text = resp.text().map_err(DispatchError::ResponseRead)?;
    debug!(%status, bytes = text.len(), "received response");

    let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok(RequestResult {
        body,
        ok: status.is_success(),
    })
}

/// Pull the body out of `params` and flatten the rest into query pairs,
/// dropping anything null.
fn split_params(mut params: Map<String, Value>) -> (Vec<(String, String)>, Option<Value>) {
    let body = params.remove(BODY_PARAM).filter(|v| !v.is_null());

    let mut pairs = Vec::new();
    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    pairs.push((key.clone(), scalar_to_string(item)));
                }
            }
            other => pairs.push((key, scalar_to_string(&other))),
        }
    }
    (pairs, body)
}

/// Render a value the way it appears in a URL: strings unquoted, everything
/// else as JSON text.
pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_matches('/')
    )
}
