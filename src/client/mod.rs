// src/client/mod.rs

//! Client-side session guard.
//!
//! `ClientApp` owns the session context, the route table and the navigation
//! guard for the lifetime of the client, from `start` to `shutdown`.

pub mod diagnostics;
pub mod navigation;
pub mod progress;
pub mod route_table;
pub mod session;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::AppError;

use self::{
    diagnostics::ErrorSink,
    navigation::{GuardRoutes, NavigationGuard, NavigationOutcome},
    progress::ProgressIndicator,
    route_table::RouteTable,
    session::SessionContext,
};

/// Redirect chains longer than this are treated as a routing loop.
const MAX_REDIRECTS: usize = 8;

/// Result of following a navigation through every redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// Outcome of the first guard evaluation.
    pub outcome: NavigationOutcome,
    /// Where the client ended up.
    pub location: String,
}

pub struct ClientApp {
    session: SessionContext,
    routes: RouteTable,
    guard: NavigationGuard,
    errors: ErrorSink,
    location: RwLock<Option<String>>,
}

impl ClientApp {
    pub fn start(
        session: SessionContext,
        routes: RouteTable,
        progress: Arc<dyn ProgressIndicator>,
    ) -> Self {
        Self::start_with(session, routes, progress, GuardRoutes::default(), ErrorSink::new())
    }

    pub fn start_with(
        session: SessionContext,
        routes: RouteTable,
        progress: Arc<dyn ProgressIndicator>,
        guard_routes: GuardRoutes,
        errors: ErrorSink,
    ) -> Self {
        tracing::info!("Client started");
        Self {
            session,
            routes,
            guard: NavigationGuard::new(guard_routes, progress),
            errors,
            location: RwLock::new(None),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn errors(&self) -> &ErrorSink {
        &self.errors
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    pub async fn location(&self) -> Option<String> {
        self.location.read().await.clone()
    }

    /// Navigates to `full_path`, following guard redirects.
    pub async fn navigate(&self, full_path: &str) -> Result<Navigation, AppError> {
        let mut target = full_path.to_string();
        let mut first = None;

        for _ in 0..=MAX_REDIRECTS {
            let destination = self.routes.resolve(&target);
            let outcome = self.guard.navigate(&self.session, &destination).await;
            let next = outcome.redirect().map(|redirect| redirect.location());
            let first_outcome = first.get_or_insert(outcome).clone();

            match next {
                Some(location) => target = location,
                None => {
                    *self.location.write().await = Some(target.clone());
                    return Ok(Navigation {
                        outcome: first_outcome,
                        location: target,
                    });
                }
            }
        }

        tracing::error!(from = %full_path, "Redirect loop");
        Err(AppError::InternalServerError(format!(
            "Too many redirects navigating to {full_path}"
        )))
    }

    pub async fn shutdown(self) {
        let location = self.location.read().await.clone();
        tracing::info!(location = ?location, errors = self.errors.captured(), "Client shut down");
    }
}
