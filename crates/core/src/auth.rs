//! Login and logout against `POST /login`.

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    api::ApiClient,
    error::{Error, Result},
    models::{LoginResponse, Profile},
    session::SessionStore,
};

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    senha: &'a str,
}

/// Starts and ends operator sessions.
#[derive(Debug, Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    /// Service using `api` and its session store.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn session(&self) -> &SessionStore {
        self.api.session()
    }

    /// Exchange credentials for a token and store the resulting session.
    ///
    /// Any previous session is dropped first, so the login request never
    /// carries a stale token. Every rejection reads as
    /// [`Error::InvalidCredentials`]; transport failures stay [`Error::Network`].
    pub async fn login(&self, email: &str, password: &str) -> Result<Profile> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(Error::Validation(
                "email and password are required".to_string(),
            ));
        }

        self.session().clear();
        let credentials = Credentials {
            email,
            senha: password,
        };
        let body = match self.api.post("/login", &credentials).await {
            Ok(body) => body,
            Err(err @ Error::Network(_)) => return Err(err),
            Err(err) => {
                warn!(%err, "login rejected");
                return Err(Error::InvalidCredentials);
            }
        };

        let response: LoginResponse = serde_json::from_value(body)
            .map_err(|err| Error::InvalidResponse(format!("login: {err}")))?;
        if response.token.trim().is_empty() {
            return Err(Error::InvalidResponse("login: empty token".to_string()));
        }

        let profile = response.profile();
        self.session()
            .set_session(response.token, response.admin, profile.clone());
        info!(operator_id = profile.operator_id, admin = profile.is_admin, "logged in");
        Ok(profile)
    }

    /// Forget the current session.
    pub fn logout(&self) {
        self.session().clear();
        info!("session cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::mock::MockTransport,
        guard::{Navigation, Route, RouteGuard},
    };
    use serde_json::json;

    #[tokio::test]
    async fn login_stores_session_and_unlocks_customers() {
        let transport = MockTransport::new();
        transport.respond(
            200,
            json!({ "token": "T1", "admin": false, "id_operador": 7, "nome": "Ana", "email": "a@b.com" }),
        );
        let session = SessionStore::in_memory();
        let auth = AuthService::new(ApiClient::new(transport.clone(), session.clone()));
        let mut guard = RouteGuard::new(session.clone());

        let profile = auth.login("a@b.com", "1234").await.expect("login succeeds");

        assert_eq!(profile.operator_id, 7);
        assert_eq!(session.token().as_deref(), Some("T1"));
        assert!(!session.is_admin());
        assert_eq!(session.profile().map(|p| p.operator_id), Some(7));

        let request = &transport.requests()[0];
        assert_eq!(request.path, "/login");
        assert_eq!(request.body, Some(json!({ "email": "a@b.com", "senha": "1234" })));
        assert!(request.header("authorization").is_none());

        assert_eq!(guard.logged_in(), Navigation::Redirect(Route::Customers));
        assert_eq!(
            guard.navigate("/app/clientes"),
            Navigation::Render(Route::Customers)
        );
    }

    #[tokio::test]
    async fn rejected_login_leaves_no_session() {
        let transport = MockTransport::new();
        transport
            .respond(401, json!({ "message": "bad credentials" }))
            .respond(500, json!({}));
        let session = SessionStore::in_memory();
        let auth = AuthService::new(ApiClient::new(transport.clone(), session.clone()));

        for _ in 0..2 {
            let err = auth.login("a@b.com", "wrong").await.expect_err("rejected");
            assert!(matches!(err, Error::InvalidCredentials));
            assert!(!session.is_authenticated());
        }
    }

    #[tokio::test]
    async fn blank_credentials_skip_the_network() {
        let transport = MockTransport::new();
        let auth = AuthService::new(ApiClient::new(transport.clone(), SessionStore::in_memory()));

        let err = auth.login("  ", "1234").await.expect_err("blank email");
        assert!(matches!(err, Error::Validation(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let transport = MockTransport::new();
        transport.respond(
            200,
            json!({ "token": "T9", "admin": true, "id_operador": "1", "nome": "Root", "email": "r@y.com" }),
        );
        let session = SessionStore::in_memory();
        let auth = AuthService::new(ApiClient::new(transport.clone(), session.clone()));

        auth.login("r@y.com", "root").await.expect("login");
        assert!(session.is_admin());
        auth.logout();
        assert!(session.token().is_none());
    }
}
