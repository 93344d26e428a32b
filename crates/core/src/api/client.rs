use std::sync::Arc;

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::transport::{ApiRequest, HttpTransport, Transport};
use crate::{
    config::AppConfig,
    error::{Error, Result},
    session::SessionStore,
};

/// Single chokepoint for every call to the REST API.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: SessionStore,
}

impl ApiClient {
    /// Client sending through `transport` and authenticating with `session`.
    pub fn new(transport: Arc<dyn Transport>, session: SessionStore) -> Self {
        Self { transport, session }
    }

    /// Client talking HTTP to the configured API.
    pub fn from_config(config: &AppConfig, session: SessionStore) -> Self {
        Self::new(Arc::new(HttpTransport::new(config.api_url.clone())), session)
    }

    /// Session the client reads its token from.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Send a request and return the parsed JSON body.
    ///
    /// 401 clears the session and yields [`Error::SessionExpired`]; other
    /// non-2xx statuses yield [`Error::Request`]. Empty 2xx bodies parse as
    /// `null`. Nothing is retried.
    pub async fn request(&self, path: &str, method: Method, body: Option<&Value>) -> Result<Value> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.session.token() {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => {
                    warn!("stored token is not a valid header value; clearing session");
                    self.session.clear();
                    return Err(Error::SessionExpired);
                }
            }
        }

        let request = ApiRequest {
            method: method.clone(),
            path: path.to_string(),
            headers,
            body: body.cloned(),
        };
        let response = self.transport.send(request).await.map_err(|err| {
            warn!(%method, path, %err, "request failed before a response arrived");
            err
        })?;
        debug!(%method, path, status = response.status, "api call");

        if response.status == 401 {
            info!(%method, path, "received 401; clearing session");
            self.session.clear();
            return Err(Error::SessionExpired);
        }

        if !response.is_success() {
            let message = error_message(response.status, &response.body);
            warn!(%method, path, status = response.status, %message, "api error");
            return Err(Error::Request {
                status: response.status,
                message,
            });
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body)
            .map_err(|err| Error::InvalidResponse(format!("{method} {path}: {err}")))
    }

    /// `GET path`.
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.request(path, Method::GET, None).await
    }

    /// `POST path` with a JSON body.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let body = encode(body)?;
        self.request(path, Method::POST, Some(&body)).await
    }

    /// `PUT path` with a JSON body.
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let body = encode(body)?;
        self.request(path, Method::PUT, Some(&body)).await
    }

    /// `DELETE path`.
    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.request(path, Method::DELETE, None).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|err| Error::Encode(err.to_string()))
}

/// `message` or `error` from a JSON error body, else `HTTP <status>`.
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error"].iter().find_map(|key| {
                value
                    .get(*key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| format!("HTTP {status}"))
}

/// Deserialize the value at JSON `pointer` (e.g. `/data`), failing when absent.
pub fn extract_data<T: DeserializeOwned>(value: &Value, pointer: &str) -> Result<T> {
    let found = value
        .pointer(pointer)
        .filter(|found| !found.is_null())
        .ok_or_else(|| Error::InvalidResponse(format!("missing `{pointer}` in response")))?;
    serde_json::from_value(found.clone())
        .map_err(|err| Error::InvalidResponse(format!("`{pointer}`: {err}")))
}

/// Deserialize the list at JSON `pointer`; a missing or null list is empty.
pub fn extract_list<T: DeserializeOwned>(value: &Value, pointer: &str) -> Result<Vec<T>> {
    match value.pointer(pointer) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(found) => serde_json::from_value(found.clone())
            .map_err(|err| Error::InvalidResponse(format!("`{pointer}`: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::mock::MockTransport, models::Profile};
    use serde_json::json;

    fn logged_in() -> SessionStore {
        let session = SessionStore::in_memory();
        session.set_session(
            "T1",
            false,
            Profile {
                operator_id: 7,
                name: "Ana".to_string(),
                email: "a@b.com".to_string(),
                is_admin: false,
            },
        );
        session
    }

    #[tokio::test]
    async fn omits_authorization_without_token() {
        let transport = MockTransport::new();
        transport.respond(200, json!({ "ok": true }));
        let client = ApiClient::new(transport.clone(), SessionStore::in_memory());

        let body = client.get("/cliente/").await.expect("success");
        assert_eq!(body, json!({ "ok": true }));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].header("authorization").is_none());
        assert_eq!(requests[0].header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn attaches_bearer_token_and_json_body() {
        let transport = MockTransport::new();
        transport.respond(201, json!({ "data": { "id_cliente": 5 } }));
        let client = ApiClient::new(transport.clone(), logged_in());

        client
            .post("/cliente/cad", &json!({ "nome": "Joao" }))
            .await
            .expect("created");

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.header("authorization"), Some("Bearer T1"));
        assert_eq!(request.body, Some(json!({ "nome": "Joao" })));
    }

    #[tokio::test]
    async fn unauthorized_clears_session() {
        let transport = MockTransport::new();
        transport.respond(401, json!({ "message": "jwt expired" }));
        let session = logged_in();
        let client = ApiClient::new(transport.clone(), session.clone());

        let err = client.get("/operador/").await.expect_err("401 must fail");
        assert!(err.is_session_expired());
        assert!(session.token().is_none());
        assert!(session.profile().is_none());
    }

    #[tokio::test]
    async fn error_messages_come_from_the_body_when_possible() {
        let transport = MockTransport::new();
        transport
            .respond(400, json!({ "message": "email already registered" }))
            .respond(409, json!({ "error": "plate taken" }))
            .respond_raw(500, "<html>boom</html>")
            .respond(422, json!({ "message": 12 }));
        let client = ApiClient::new(transport.clone(), logged_in());

        let mut messages = Vec::new();
        for _ in 0..4 {
            match client.get("/x").await {
                Err(Error::Request { status, message }) => messages.push((status, message)),
                other => panic!("unexpected result: {other:?}"),
            }
        }
        assert_eq!(
            messages,
            vec![
                (400, "email already registered".to_string()),
                (409, "plate taken".to_string()),
                (500, "HTTP 500".to_string()),
                (422, "HTTP 422".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn empty_success_body_is_null_and_garbage_is_rejected() {
        let transport = MockTransport::new();
        transport.respond_raw(204, "").respond_raw(200, "not json");
        let client = ApiClient::new(transport.clone(), logged_in());

        assert_eq!(client.delete("/carro/delete/1").await.expect("ok"), Value::Null);
        assert!(matches!(
            client.get("/cliente/").await,
            Err(Error::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn transport_failures_are_network_errors() {
        let transport = MockTransport::new();
        transport.fail("connection refused");
        let session = logged_in();
        let client = ApiClient::new(transport.clone(), session.clone());

        assert!(matches!(client.get("/cliente/").await, Err(Error::Network(_))));
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn unusable_token_is_never_sent() {
        let transport = MockTransport::new();
        let session = SessionStore::in_memory();
        session.set_session(
            "bad\ntoken",
            false,
            Profile {
                operator_id: 1,
                name: String::new(),
                email: String::new(),
                is_admin: false,
            },
        );
        let client = ApiClient::new(transport.clone(), session.clone());

        assert!(client.get("/cliente/").await.expect_err("rejected").is_session_expired());
        assert!(transport.requests().is_empty());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn extracts_envelopes() {
        let body = json!({ "data": { "clientes": [{ "id": 1 }], "vazio": null } });
        let list: Vec<Value> = extract_list(&body, "/data/clientes").expect("list");
        assert_eq!(list.len(), 1);
        let empty: Vec<Value> = extract_list(&body, "/data/vazio").expect("empty");
        assert!(empty.is_empty());
        let missing: Vec<Value> = extract_list(&body, "/data/nada").expect("missing");
        assert!(missing.is_empty());
        assert!(extract_data::<Value>(&body, "/dados").is_err());
    }
}
