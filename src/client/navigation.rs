// src/client/navigation.rs

//! Route guard evaluated before every client-side transition.

use std::sync::Arc;

use tokio::sync::Mutex;
use url::form_urlencoded;

use super::{
    progress::ProgressIndicator,
    route_table::Destination,
    session::AuthStore,
};

/// Well-known destinations the guard redirects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardRoutes {
    pub login: String,
    pub forbidden: String,
    pub home: String,
}

impl Default for GuardRoutes {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            forbidden: "/403".to_string(),
            home: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Redirect {
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Value of a query parameter, e.g. `redirect`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Path with the url-encoded query appended.
    pub fn location(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{}", self.path, query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Allowed,
    Redirected(Redirect),
}

impl NavigationOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, NavigationOutcome::Allowed)
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            NavigationOutcome::Redirected(redirect) => Some(redirect),
            NavigationOutcome::Allowed => None,
        }
    }
}

pub struct NavigationGuard {
    routes: GuardRoutes,
    progress: Arc<dyn ProgressIndicator>,
    // Attempts run one at a time, in arrival order.
    serial: Mutex<u64>,
}

impl NavigationGuard {
    pub fn new(routes: GuardRoutes, progress: Arc<dyn ProgressIndicator>) -> Self {
        Self {
            routes,
            progress,
            serial: Mutex::new(0),
        }
    }

    pub fn routes(&self) -> &GuardRoutes {
        &self.routes
    }

    /// Runs one navigation attempt to its terminal outcome. A second call
    /// made while this one is restoring the session waits for it to finish.
    pub async fn navigate<A>(&self, session: &A, destination: &Destination) -> NavigationOutcome
    where
        A: AuthStore + ?Sized,
    {
        let mut attempt = self.serial.lock().await;
        *attempt += 1;

        self.progress.start();
        let outcome = self.decide(session, destination).await;
        self.progress.done();

        tracing::debug!(attempt = *attempt, to = %destination.full_path, ?outcome, "Navigation resolved");
        outcome
    }

    async fn decide<A>(&self, session: &A, destination: &Destination) -> NavigationOutcome
    where
        A: AuthStore + ?Sized,
    {
        if destination.meta.requires_auth {
            if !session.is_authenticated() {
                if let Err(e) = session.initialize_auth().await {
                    tracing::warn!(error = %e, "Session restore failed, continuing unauthenticated");
                }

                if !session.is_authenticated() {
                    return NavigationOutcome::Redirected(
                        Redirect::to(&self.routes.login)
                            .with_query("redirect", &destination.full_path),
                    );
                }
            }

            let role = session.role();
            if !destination.meta.allows_role(role.as_deref()) {
                tracing::info!(to = %destination.path, role = ?role, "Role not allowed");
                return NavigationOutcome::Redirected(Redirect::to(&self.routes.forbidden));
            }
        }

        if destination.path == self.routes.login && session.is_authenticated() {
            return NavigationOutcome::Redirected(Redirect::to(&self.routes.home));
        }

        NavigationOutcome::Allowed
    }
}
