//! Route table and the authentication gate in front of private views.

use std::fmt;

use tracing::info;

use crate::{
    error::{Error, Result},
    session::SessionStore,
};

/// Every screen the console can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Public login entry point.
    Login,
    /// Customer listing.
    Customers,
    /// Empty customer form.
    NewCustomer,
    /// Customer form for an existing id.
    EditCustomer(i64),
    /// Operator listing.
    Operators,
    /// Empty operator form.
    NewOperator,
    /// Operator form for an existing id.
    EditOperator(i64),
}

enum Matched {
    Route(Route),
    PrivateIndex,
}

impl Route {
    /// Canonical path of the route.
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Customers => "/app/clientes".to_string(),
            Route::NewCustomer => "/app/cadastrarCliente".to_string(),
            Route::EditCustomer(id) => format!("/app/cliente/editar/{id}"),
            Route::Operators => "/app/operador".to_string(),
            Route::NewOperator => "/app/cadastrarOperador".to_string(),
            Route::EditOperator(id) => format!("/app/operador/editar/{id}"),
        }
    }

    /// Whether the route sits behind the session check.
    pub fn is_private(&self) -> bool {
        !matches!(self, Route::Login)
    }

    fn parse(path: &str) -> Option<Matched> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let lowered: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_lowercase)
            .collect();
        let parts: Vec<&str> = lowered.iter().map(String::as_str).collect();

        let route = match parts.as_slice() {
            ["login"] => Route::Login,
            ["app"] => return Some(Matched::PrivateIndex),
            ["app", "clientes"] => Route::Customers,
            ["app", "cadastrarcliente"] => Route::NewCustomer,
            ["app", "cliente", "editar", id] => Route::EditCustomer(id.parse().ok()?),
            ["app", "operador"] => Route::Operators,
            ["app", "cadastraroperador"] => Route::NewOperator,
            ["app", "operador", "editar", id] => Route::EditOperator(id.parse().ok()?),
            _ => return None,
        };
        Some(Matched::Route(route))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// What the front end should do for a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Show the route.
    Render(Route),
    /// Go to another route instead; the requested view must not be shown.
    Redirect(Route),
    /// A private view was requested without a session; show login with a notice.
    Denied,
}

impl Navigation {
    /// Route that ends up on screen.
    pub fn target(&self) -> Route {
        match self {
            Navigation::Render(route) | Navigation::Redirect(route) => *route,
            Navigation::Denied => Route::Login,
        }
    }
}

/// Row actions offered by the customer and operator listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    /// Open the record's edit form.
    Edit,
    /// Delete the record after confirmation.
    Delete,
}

impl RowAction {
    fn verb(self) -> &'static str {
        match self {
            RowAction::Edit => "edit",
            RowAction::Delete => "delete",
        }
    }
}

/// Authentication state tracked by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No usable session.
    Unauthenticated,
    /// Logged in.
    Authenticated,
}

/// Decides per navigation whether the session allows the requested view.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: SessionStore,
    state: AuthState,
}

impl RouteGuard {
    /// Guard over `session`; a restored session starts authenticated.
    pub fn new(session: SessionStore) -> Self {
        let state = if session.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        };
        Self { session, state }
    }

    /// Current state.
    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Resolve a raw path. Unknown paths always land on login.
    pub fn navigate(&mut self, path: &str) -> Navigation {
        match Route::parse(path) {
            Some(Matched::Route(route)) => self.resolve(route),
            Some(Matched::PrivateIndex) => match self.resolve(Route::Customers) {
                Navigation::Render(route) => Navigation::Redirect(route),
                redirect => redirect,
            },
            None => Navigation::Redirect(Route::Login),
        }
    }

    /// Check the session before showing `route`.
    pub fn resolve(&mut self, route: Route) -> Navigation {
        if !route.is_private() {
            return Navigation::Render(route);
        }
        if self.session.token().is_none() {
            self.state = AuthState::Unauthenticated;
            info!(%route, "no session; login required");
            return Navigation::Denied;
        }
        Navigation::Render(route)
    }

    /// Listing row actions are reserved to admins.
    pub fn authorize(&self, action: RowAction) -> Result<()> {
        if self.session.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden(action.verb()))
        }
    }

    /// Record a successful login; lands on the customer list.
    pub fn logged_in(&mut self) -> Navigation {
        if self.session.is_authenticated() {
            self.state = AuthState::Authenticated;
            info!("session started");
            Navigation::Redirect(Route::Customers)
        } else {
            Navigation::Redirect(Route::Login)
        }
    }

    /// Explicit logout: forget the session and return to login.
    pub fn logout(&mut self) -> Navigation {
        self.session.clear();
        self.state = AuthState::Unauthenticated;
        info!("logged out");
        Navigation::Redirect(Route::Login)
    }

    /// The API reported 401. Only the first report of a chain yields the redirect.
    pub fn session_expired(&mut self) -> Option<Navigation> {
        self.session.clear();
        match self.state {
            AuthState::Authenticated => {
                self.state = AuthState::Unauthenticated;
                info!("session expired; redirecting to login");
                Some(Navigation::Redirect(Route::Login))
            }
            AuthState::Unauthenticated => None,
        }
    }

    /// Route a failed action: session expiry redirects, anything else stays put.
    pub fn handle_error(&mut self, err: &Error) -> Option<Navigation> {
        if err.is_session_expired() {
            self.session_expired()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Profile;

    fn ana() -> Profile {
        Profile {
            operator_id: 7,
            name: "Ana".to_string(),
            email: "a@b.com".to_string(),
            is_admin: false,
        }
    }

    #[test]
    fn parses_every_route_path() {
        let session = SessionStore::in_memory();
        session.set_session("T1", false, ana());
        let mut guard = RouteGuard::new(session);

        for route in [
            Route::Login,
            Route::Customers,
            Route::NewCustomer,
            Route::EditCustomer(4),
            Route::Operators,
            Route::NewOperator,
            Route::EditOperator(9),
        ] {
            assert_eq!(guard.navigate(&route.path()), Navigation::Render(route));
        }
        assert_eq!(
            guard.navigate("/app/Operador"),
            Navigation::Render(Route::Operators)
        );
    }

    #[test]
    fn private_routes_redirect_without_token() {
        let mut guard = RouteGuard::new(SessionStore::in_memory());
        assert_eq!(guard.state(), AuthState::Unauthenticated);
        assert_eq!(guard.navigate("/app/clientes"), Navigation::Denied);
        assert_eq!(guard.navigate("/app/cliente/editar/3"), Navigation::Denied);
        assert_eq!(guard.resolve(Route::Operators), Navigation::Denied);
        assert_eq!(Navigation::Denied.target(), Route::Login);
        assert_eq!(guard.navigate("/login"), Navigation::Render(Route::Login));
    }

    #[test]
    fn unknown_paths_go_to_login_even_when_authenticated() {
        let session = SessionStore::in_memory();
        session.set_session("T1", true, ana());
        let mut guard = RouteGuard::new(session);

        for path in ["/", "/nope", "/app/patio/extra", "/app/cliente/editar/abc"] {
            assert_eq!(guard.navigate(path), Navigation::Redirect(Route::Login));
        }
        assert_eq!(guard.state(), AuthState::Authenticated);
    }

    #[test]
    fn private_index_redirects_to_customers() {
        let session = SessionStore::in_memory();
        let mut guard = RouteGuard::new(session.clone());
        assert_eq!(guard.navigate("/app"), Navigation::Denied);

        session.set_session("T1", false, ana());
        assert_eq!(guard.logged_in(), Navigation::Redirect(Route::Customers));
        assert_eq!(guard.navigate("/app/"), Navigation::Redirect(Route::Customers));
    }

    #[test]
    fn expiry_redirects_exactly_once() {
        let session = SessionStore::in_memory();
        session.set_session("T1", false, ana());
        let mut guard = RouteGuard::new(session.clone());

        assert_eq!(
            guard.handle_error(&Error::SessionExpired),
            Some(Navigation::Redirect(Route::Login))
        );
        assert_eq!(guard.handle_error(&Error::SessionExpired), None);
        assert_eq!(guard.state(), AuthState::Unauthenticated);
        assert!(session.token().is_none());
    }

    #[test]
    fn other_errors_do_not_navigate() {
        let session = SessionStore::in_memory();
        session.set_session("T1", false, ana());
        let mut guard = RouteGuard::new(session);
        let err = Error::Request {
            status: 500,
            message: "HTTP 500".to_string(),
        };
        assert_eq!(guard.handle_error(&err), None);
        assert_eq!(guard.state(), AuthState::Authenticated);
    }

    #[test]
    fn row_actions_need_an_admin_session() {
        let session = SessionStore::in_memory();
        session.set_session("T1", false, ana());
        let guard = RouteGuard::new(session.clone());

        let err = guard.authorize(RowAction::Delete).unwrap_err();
        assert!(matches!(err, Error::Forbidden("delete")));
        assert_eq!(err.to_string(), "only administrators can delete records");
        assert!(guard.authorize(RowAction::Edit).is_err());

        session.set_session("T2", true, ana());
        assert!(guard.authorize(RowAction::Edit).is_ok());
        assert!(guard.authorize(RowAction::Delete).is_ok());

        session.clear();
        assert!(guard.authorize(RowAction::Edit).is_err());
    }

    #[test]
    fn logout_clears_session() {
        let session = SessionStore::in_memory();
        session.set_session("T1", false, ana());
        let mut guard = RouteGuard::new(session.clone());

        assert_eq!(guard.logout(), Navigation::Redirect(Route::Login));
        assert!(!session.is_authenticated());
        assert_eq!(guard.session_expired(), None);
    }
}
