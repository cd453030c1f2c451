//! Client dependencies for triggers (using traits for testability)
//!
//! This module provides the dependency container handed to every trigger,
//! the TMDB-backed adapters, and the classifier that turns provider errors
//! into failure actions.

use anyhow::Result;
use async_trait::async_trait;
use relay::{Categorizable, Failure, FailureKind};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tmdb::{
    AccountList, Genre, Movie, MovieCategory, MovieDetails, RequestToken, Session, TmdbClient,
    TmdbOptions,
};
use tracing::info;

use crate::kernel::{BaseAuthProvider, BaseMovieProvider, BaseNavigator, BaseSessionStore};
use crate::routes::Route;

// =============================================================================
// TmdbMovieProvider Adapter (implements BaseMovieProvider trait)
// =============================================================================

/// Wrapper around TmdbClient that reads the session id for account calls
pub struct TmdbMovieProvider {
    client: Arc<TmdbClient>,
    session: Arc<dyn BaseSessionStore>,
}

impl TmdbMovieProvider {
    pub fn new(client: Arc<TmdbClient>, session: Arc<dyn BaseSessionStore>) -> Self {
        Self { client, session }
    }

    fn session_id(&self) -> Result<String> {
        Ok(self
            .session
            .session_id()
            .ok_or(tmdb::Error::MissingSession)?)
    }
}

#[async_trait]
impl BaseMovieProvider for TmdbMovieProvider {
    async fn movies(&self, category: MovieCategory) -> Result<Vec<Movie>> {
        Ok(self.client.movies(category).await?.results)
    }

    async fn movie_details(&self, movie_id: u64) -> Result<MovieDetails> {
        Ok(self.client.movie_details(movie_id).await?)
    }

    async fn search(&self, query: &str) -> Result<Vec<Movie>> {
        Ok(self.client.search(query).await?.results)
    }

    async fn movies_by_genres(&self, genres: &[u32]) -> Result<Vec<Movie>> {
        Ok(self.client.discover_by_genres(genres).await?.results)
    }

    async fn movies_by_rating(&self, rating: f32) -> Result<Vec<Movie>> {
        Ok(self.client.discover_by_rating(rating).await?.results)
    }

    async fn genres(&self) -> Result<Vec<Genre>> {
        Ok(self.client.genres().await?)
    }

    async fn list_movies(&self, list: AccountList) -> Result<Vec<Movie>> {
        let session_id = self.session_id()?;
        Ok(self.client.account_movies(list, &session_id).await?.results)
    }

    async fn update_list(&self, list: AccountList, movie_id: u64, member: bool) -> Result<()> {
        let session_id = self.session_id()?;
        self.client
            .update_account_list(list, movie_id, member, &session_id)
            .await?;
        Ok(())
    }
}

// =============================================================================
// TmdbAuthProvider Adapter (implements BaseAuthProvider trait)
// =============================================================================

pub struct TmdbAuthProvider(pub Arc<TmdbClient>);

impl TmdbAuthProvider {
    pub fn new(client: Arc<TmdbClient>) -> Self {
        Self(client)
    }
}

#[async_trait]
impl BaseAuthProvider for TmdbAuthProvider {
    async fn request_token(&self) -> Result<RequestToken> {
        Ok(self.0.request_token().await?)
    }

    async fn validate_with_login(
        &self,
        username: &str,
        password: &str,
        request_token: &str,
    ) -> Result<RequestToken> {
        Ok(self
            .0
            .validate_with_login(username, password, request_token)
            .await?)
    }

    async fn create_session(&self, request_token: &str) -> Result<Session> {
        Ok(self.0.create_session(request_token).await?)
    }
}

// =============================================================================
// InMemorySession (implements BaseSessionStore trait)
// =============================================================================

/// Session id held for the lifetime of the process
#[derive(Debug, Default)]
pub struct InMemorySession {
    session_id: RwLock<Option<String>>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BaseSessionStore for InMemorySession {
    fn session_id(&self) -> Option<String> {
        self.session_id
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_session_id(&self, session_id: &str) {
        *self
            .session_id
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session_id.to_string());
    }
}

// =============================================================================
// TracingNavigator (implements BaseNavigator trait)
// =============================================================================

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("unknown route: {0}")]
    UnknownRoute(String),
}

impl Categorizable for NavigationError {
    fn kind(&self) -> FailureKind {
        FailureKind::Navigation
    }
}

/// Headless navigator: validates the target and logs the route change
#[derive(Debug, Default)]
pub struct TracingNavigator {
    current: RwLock<Option<Route>>,
}

impl TracingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last route navigated to
    pub fn current(&self) -> Option<Route> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl BaseNavigator for TracingNavigator {
    async fn navigate(&self, target: &str) -> Result<()> {
        let route =
            Route::parse(target).ok_or_else(|| NavigationError::UnknownRoute(target.to_string()))?;
        info!(target, route = ?route, "navigating");
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(route);
        Ok(())
    }
}

// =============================================================================
// ClientDeps
// =============================================================================

/// Client dependencies accessible to triggers (using traits for testability)
#[derive(Clone)]
pub struct ClientDeps {
    pub movies: Arc<dyn BaseMovieProvider>,
    pub auth: Arc<dyn BaseAuthProvider>,
    /// Written by the login trigger, read by account-list calls
    pub session: Arc<dyn BaseSessionStore>,
    pub navigator: Arc<dyn BaseNavigator>,
}

impl ClientDeps {
    pub fn new(
        movies: Arc<dyn BaseMovieProvider>,
        auth: Arc<dyn BaseAuthProvider>,
        session: Arc<dyn BaseSessionStore>,
        navigator: Arc<dyn BaseNavigator>,
    ) -> Self {
        Self {
            movies,
            auth,
            session,
            navigator,
        }
    }

    /// Production wiring: one TMDB client shared by both providers and one
    /// in-memory session.
    pub fn tmdb(options: TmdbOptions) -> Self {
        let client = Arc::new(TmdbClient::new(options));
        let session: Arc<dyn BaseSessionStore> = Arc::new(InMemorySession::new());

        Self::new(
            Arc::new(TmdbMovieProvider::new(client.clone(), session.clone())),
            Arc::new(TmdbAuthProvider::new(client)),
            session,
            Arc::new(TracingNavigator::new()),
        )
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Map an operation error to the failure carried by the failure action.
///
/// A `Failure` already in the chain wins, then TMDB errors, then navigation
/// errors. Anything else is `Internal`.
pub fn classify(error: &anyhow::Error) -> Failure {
    for cause in error.chain() {
        if let Some(failure) = cause.downcast_ref::<Failure>() {
            return failure.clone();
        }
        if let Some(tmdb_error) = cause.downcast_ref::<tmdb::Error>() {
            return Failure::new(tmdb_kind(tmdb_error), tmdb_error.to_string());
        }
        if let Some(nav_error) = cause.downcast_ref::<NavigationError>() {
            return Failure::from_categorizable(nav_error);
        }
    }
    Failure::internal(error.to_string())
}

fn tmdb_kind(error: &tmdb::Error) -> FailureKind {
    match error {
        tmdb::Error::Http(_) => FailureKind::Network,
        tmdb::Error::Decode(_) => FailureKind::InvalidResponse,
        tmdb::Error::MissingSession => FailureKind::Unauthorized,
        tmdb::Error::Api { status, .. } => match status {
            401 | 403 => FailureKind::Unauthorized,
            404 => FailureKind::NotFound,
            429 => FailureKind::RateLimited,
            500..=599 => FailureKind::Network,
            _ => FailureKind::Internal,
        },
    }
}
