// TestDependencies - mock implementations for testing
//
// Provides mock providers that can be injected into the client engine for
// tests. Every mock records its calls; the movie provider answers from
// scripted data and can hold any operation open behind a relay `Gate`.

use anyhow::Result;
use async_trait::async_trait;
use relay::testing::Gate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tmdb::{AccountList, Genre, Movie, MovieCategory, MovieDetails, RequestToken, Session};

use super::{BaseAuthProvider, BaseMovieProvider, BaseNavigator, BaseSessionStore, ClientDeps};
use super::deps::NavigationError;

/// Minimal movie record for fixtures.
pub fn movie(id: u64, title: &str) -> Movie {
    Movie {
        id,
        title: title.to_string(),
        overview: String::new(),
        poster_path: None,
        backdrop_path: None,
        release_date: None,
        vote_average: 0.0,
        vote_count: 0,
        popularity: 0.0,
        genre_ids: Vec::new(),
    }
}

/// Minimal details record for fixtures.
pub fn movie_details(id: u64, title: &str) -> MovieDetails {
    MovieDetails {
        id,
        title: title.to_string(),
        overview: String::new(),
        tagline: None,
        poster_path: None,
        backdrop_path: None,
        release_date: None,
        runtime: None,
        status: None,
        vote_average: 0.0,
        vote_count: 0,
        genres: Vec::new(),
    }
}

fn api_error(status: u16, message: &str) -> tmdb::Error {
    tmdb::Error::Api {
        status,
        status_code: None,
        message: message.to_string(),
    }
}

// =============================================================================
// Mock Movie Provider
// =============================================================================

/// A call made against [`MockMovieProvider`]
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    Movies(MovieCategory),
    MovieDetails(u64),
    Search(String),
    MoviesByGenres(Vec<u32>),
    MoviesByRating(f32),
    Genres,
    ListMovies(AccountList),
    UpdateList {
        list: AccountList,
        movie_id: u64,
        member: bool,
    },
}

impl ProviderCall {
    /// Operation name used for gates and scripted failures.
    pub fn operation(&self) -> &'static str {
        match self {
            ProviderCall::Movies(_) => "movies",
            ProviderCall::MovieDetails(_) => "movie_details",
            ProviderCall::Search(_) => "search",
            ProviderCall::MoviesByGenres(_) => "movies_by_genres",
            ProviderCall::MoviesByRating(_) => "movies_by_rating",
            ProviderCall::Genres => "genres",
            ProviderCall::ListMovies(_) => "list_movies",
            ProviderCall::UpdateList { .. } => "update_list",
        }
    }

    /// Operation name plus its argument, e.g. `search:alien`.
    fn keyed(&self) -> Option<String> {
        match self {
            ProviderCall::Movies(category) => Some(format!("movies:{}", category.as_str())),
            ProviderCall::MovieDetails(id) => Some(format!("movie_details:{}", id)),
            ProviderCall::Search(query) => Some(format!("search:{}", query)),
            ProviderCall::MoviesByRating(rating) => Some(format!("movies_by_rating:{}", rating)),
            ProviderCall::ListMovies(list) => Some(format!("list_movies:{}", list)),
            ProviderCall::UpdateList { list, .. } => Some(format!("update_list:{}", list)),
            ProviderCall::MoviesByGenres(_) | ProviderCall::Genres => None,
        }
    }
}

pub struct MockMovieProvider {
    categories: Arc<Mutex<HashMap<MovieCategory, Vec<Movie>>>>,
    details: Arc<Mutex<HashMap<u64, MovieDetails>>>,
    search_results: Arc<Mutex<HashMap<String, Vec<Movie>>>>,
    by_genres: Arc<Mutex<Vec<Movie>>>,
    by_rating: Arc<Mutex<Vec<Movie>>>,
    genres: Arc<Mutex<Vec<Genre>>>,
    lists: Arc<Mutex<HashMap<AccountList, Vec<Movie>>>>,
    failures: Arc<Mutex<HashMap<String, (u16, String)>>>,
    gates: Arc<Mutex<HashMap<String, Gate>>>,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
}

impl MockMovieProvider {
    pub fn new() -> Self {
        Self {
            categories: Arc::new(Mutex::new(HashMap::new())),
            details: Arc::new(Mutex::new(HashMap::new())),
            search_results: Arc::new(Mutex::new(HashMap::new())),
            by_genres: Arc::new(Mutex::new(Vec::new())),
            by_rating: Arc::new(Mutex::new(Vec::new())),
            genres: Arc::new(Mutex::new(Vec::new())),
            lists: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            gates: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_category(self, category: MovieCategory, movies: Vec<Movie>) -> Self {
        self.categories.lock().unwrap().insert(category, movies);
        self
    }

    pub fn with_details(self, details: MovieDetails) -> Self {
        self.details.lock().unwrap().insert(details.id, details);
        self
    }

    /// Results for one exact query. Unknown queries return no results.
    pub fn with_search_results(self, query: &str, movies: Vec<Movie>) -> Self {
        self.search_results
            .lock()
            .unwrap()
            .insert(query.to_string(), movies);
        self
    }

    pub fn with_movies_by_genres(self, movies: Vec<Movie>) -> Self {
        *self.by_genres.lock().unwrap() = movies;
        self
    }

    pub fn with_movies_by_rating(self, movies: Vec<Movie>) -> Self {
        *self.by_rating.lock().unwrap() = movies;
        self
    }

    pub fn with_genres(self, genres: Vec<Genre>) -> Self {
        *self.genres.lock().unwrap() = genres;
        self
    }

    /// Initial contents of an account list
    pub fn with_list(self, list: AccountList, movies: Vec<Movie>) -> Self {
        self.lists.lock().unwrap().insert(list, movies);
        self
    }

    /// Fail an operation with a provider error.
    ///
    /// `operation` is either a bare name (`"search"`) or a keyed name
    /// (`"search:alien"`, `"movies:upcoming"`, `"update_list:favorite"`).
    pub fn with_failure(self, operation: &str, status: u16, message: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(operation.to_string(), (status, message.to_string()));
        self
    }

    /// Hold an operation until the gate opens. Keys as in [`with_failure`](Self::with_failure).
    pub fn with_gate(self, operation: &str, gate: Gate) -> Self {
        self.gates
            .lock()
            .unwrap()
            .insert(operation.to_string(), gate);
        self
    }

    /// Get all calls in arrival order
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Count calls of one operation
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Get all membership updates
    pub fn list_updates(&self) -> Vec<(AccountList, u64, bool)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                ProviderCall::UpdateList {
                    list,
                    movie_id,
                    member,
                } => Some((*list, *movie_id, *member)),
                _ => None,
            })
            .collect()
    }

    /// Record the call, wait at its gate, then apply any scripted failure.
    async fn enter(&self, call: ProviderCall) -> Result<()> {
        self.calls.lock().unwrap().push(call.clone());

        let gate = scripted(&self.gates.lock().unwrap(), &call);
        if let Some(gate) = gate {
            gate.wait().await;
        }

        let failure = scripted(&self.failures.lock().unwrap(), &call);
        match failure {
            Some((status, message)) => Err(api_error(status, &message).into()),
            None => Ok(()),
        }
    }
}

/// The entry for the keyed operation name, falling back to the bare name.
fn scripted<V: Clone>(map: &HashMap<String, V>, call: &ProviderCall) -> Option<V> {
    call.keyed()
        .and_then(|key| map.get(&key).cloned())
        .or_else(|| map.get(call.operation()).cloned())
}

impl Default for MockMovieProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseMovieProvider for MockMovieProvider {
    async fn movies(&self, category: MovieCategory) -> Result<Vec<Movie>> {
        self.enter(ProviderCall::Movies(category)).await?;
        Ok(self
            .categories
            .lock()
            .unwrap()
            .get(&category)
            .cloned()
            .unwrap_or_default())
    }

    async fn movie_details(&self, movie_id: u64) -> Result<MovieDetails> {
        self.enter(ProviderCall::MovieDetails(movie_id)).await?;
        let details = self.details.lock().unwrap().get(&movie_id).cloned();
        details.ok_or_else(|| {
            anyhow::Error::from(api_error(
                404,
                "The resource you requested could not be found.",
            ))
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<Movie>> {
        self.enter(ProviderCall::Search(query.to_string())).await?;
        Ok(self
            .search_results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn movies_by_genres(&self, genres: &[u32]) -> Result<Vec<Movie>> {
        self.enter(ProviderCall::MoviesByGenres(genres.to_vec()))
            .await?;
        Ok(self.by_genres.lock().unwrap().clone())
    }

    async fn movies_by_rating(&self, rating: f32) -> Result<Vec<Movie>> {
        self.enter(ProviderCall::MoviesByRating(rating)).await?;
        Ok(self
            .by_rating
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.vote_average >= f64::from(rating))
            .cloned()
            .collect())
    }

    async fn genres(&self) -> Result<Vec<Genre>> {
        self.enter(ProviderCall::Genres).await?;
        Ok(self.genres.lock().unwrap().clone())
    }

    async fn list_movies(&self, list: AccountList) -> Result<Vec<Movie>> {
        self.enter(ProviderCall::ListMovies(list)).await?;
        Ok(self
            .lists
            .lock()
            .unwrap()
            .get(&list)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_list(&self, list: AccountList, movie_id: u64, member: bool) -> Result<()> {
        self.enter(ProviderCall::UpdateList {
            list,
            movie_id,
            member,
        })
        .await?;

        let mut lists = self.lists.lock().unwrap();
        let movies = lists.entry(list).or_default();
        movies.retain(|m| m.id != movie_id);
        if member {
            movies.push(movie(movie_id, &format!("Movie {}", movie_id)));
        }
        Ok(())
    }
}

// =============================================================================
// Mock Auth Provider
// =============================================================================

pub struct MockAuthProvider {
    session_id: String,
    failing_step: Option<(&'static str, String)>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self {
            session_id: "mock-session".to_string(),
            failing_step: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_session_id(mut self, session_id: &str) -> Self {
        self.session_id = session_id.to_string();
        self
    }

    /// Reject the credentials with a 401 carrying `message`
    pub fn failing_validation(mut self, message: &str) -> Self {
        self.failing_step = Some(("validate_with_login", message.to_string()));
        self
    }

    /// Fail the session exchange with a 401 carrying `message`
    pub fn failing_session(mut self, message: &str) -> Self {
        self.failing_step = Some(("create_session", message.to_string()));
        self
    }

    /// Get the steps called, in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn step(&self, name: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(name);
        match &self.failing_step {
            Some((step, message)) if *step == name => Err(api_error(401, message).into()),
            _ => Ok(()),
        }
    }
}

impl Default for MockAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAuthProvider for MockAuthProvider {
    async fn request_token(&self) -> Result<RequestToken> {
        self.step("request_token")?;
        Ok(RequestToken {
            success: true,
            expires_at: None,
            request_token: "mock-token".to_string(),
        })
    }

    async fn validate_with_login(
        &self,
        _username: &str,
        _password: &str,
        request_token: &str,
    ) -> Result<RequestToken> {
        self.step("validate_with_login")?;
        Ok(RequestToken {
            success: true,
            expires_at: None,
            request_token: request_token.to_string(),
        })
    }

    async fn create_session(&self, _request_token: &str) -> Result<Session> {
        self.step("create_session")?;
        Ok(Session {
            success: true,
            session_id: self.session_id.clone(),
        })
    }
}

// =============================================================================
// Recording Session Store
// =============================================================================

#[derive(Default)]
pub struct RecordingSession {
    current: Mutex<Option<String>>,
    writes: Mutex<Vec<String>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session store that starts logged in
    pub fn logged_in(session_id: &str) -> Self {
        let session = Self::new();
        *session.current.lock().unwrap() = Some(session_id.to_string());
        session
    }

    /// Get every session id written, in order
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

impl BaseSessionStore for RecordingSession {
    fn session_id(&self) -> Option<String> {
        self.current.lock().unwrap().clone()
    }

    fn set_session_id(&self, session_id: &str) {
        *self.current.lock().unwrap() = Some(session_id.to_string());
        self.writes.lock().unwrap().push(session_id.to_string());
    }
}

// =============================================================================
// Recording Navigator
// =============================================================================

#[derive(Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
    reject: Mutex<Vec<String>>,
    gate: Option<Gate>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail navigation to `target`
    pub fn rejecting(self, target: &str) -> Self {
        self.reject.lock().unwrap().push(target.to_string());
        self
    }

    /// Hold every navigation until the gate opens
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Get every target navigated to successfully
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseNavigator for RecordingNavigator {
    async fn navigate(&self, target: &str) -> Result<()> {
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        if self.reject.lock().unwrap().iter().any(|t| t == target) {
            return Err(NavigationError::UnknownRoute(target.to_string()).into());
        }
        self.visited.lock().unwrap().push(target.to_string());
        Ok(())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Builder for [`ClientDeps`] backed by mocks.
///
/// Anything not supplied gets a fresh default mock.
#[derive(Default)]
pub struct TestDependencies {
    movies: Option<Arc<dyn BaseMovieProvider>>,
    auth: Option<Arc<dyn BaseAuthProvider>>,
    session: Option<Arc<dyn BaseSessionStore>>,
    navigator: Option<Arc<dyn BaseNavigator>>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn movies(mut self, movies: Arc<dyn BaseMovieProvider>) -> Self {
        self.movies = Some(movies);
        self
    }

    pub fn auth(mut self, auth: Arc<dyn BaseAuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn session(mut self, session: Arc<dyn BaseSessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn BaseNavigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn build(self) -> ClientDeps {
        ClientDeps::new(
            self.movies
                .unwrap_or_else(|| Arc::new(MockMovieProvider::new())),
            self.auth.unwrap_or_else(|| Arc::new(MockAuthProvider::new())),
            self.session
                .unwrap_or_else(|| Arc::new(RecordingSession::new())),
            self.navigator
                .unwrap_or_else(|| Arc::new(RecordingNavigator::new())),
        )
    }
}
