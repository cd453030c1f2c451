// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Triggers in domains/*/effects.rs decide what to call and how outcomes map
// back onto actions.
//
// Naming convention: Base* for trait names (e.g., BaseMovieProvider)

use anyhow::Result;
use async_trait::async_trait;
use tmdb::{AccountList, Genre, Movie, MovieCategory, MovieDetails, RequestToken, Session};

// =============================================================================
// Movie Provider Trait (Infrastructure - catalog and account lists)
// =============================================================================

#[async_trait]
pub trait BaseMovieProvider: Send + Sync {
    /// One of the four fixed listings
    async fn movies(&self, category: MovieCategory) -> Result<Vec<Movie>>;

    async fn movie_details(&self, movie_id: u64) -> Result<MovieDetails>;

    async fn search(&self, query: &str) -> Result<Vec<Movie>>;

    async fn movies_by_genres(&self, genres: &[u32]) -> Result<Vec<Movie>>;

    /// Movies rated at least `rating`, best first
    async fn movies_by_rating(&self, rating: f32) -> Result<Vec<Movie>>;

    async fn genres(&self) -> Result<Vec<Genre>>;

    /// Favourites or watch-list of the logged-in account
    async fn list_movies(&self, list: AccountList) -> Result<Vec<Movie>>;

    /// Add (`member = true`) or remove a movie from an account list
    async fn update_list(&self, list: AccountList, movie_id: u64, member: bool) -> Result<()>;
}

// =============================================================================
// Auth Provider Trait (Infrastructure - request-token login)
// =============================================================================

#[async_trait]
pub trait BaseAuthProvider: Send + Sync {
    async fn request_token(&self) -> Result<RequestToken>;

    async fn validate_with_login(
        &self,
        username: &str,
        password: &str,
        request_token: &str,
    ) -> Result<RequestToken>;

    async fn create_session(&self, request_token: &str) -> Result<Session>;
}

// =============================================================================
// Session Store Trait (Infrastructure - where the session id lives)
// =============================================================================

pub trait BaseSessionStore: Send + Sync {
    fn session_id(&self) -> Option<String>;

    fn set_session_id(&self, session_id: &str);
}

// =============================================================================
// Navigator Trait (Infrastructure - route changes)
// =============================================================================

#[async_trait]
pub trait BaseNavigator: Send + Sync {
    /// Navigate to a route path such as `/favourites` or `/movie/550`
    async fn navigate(&self, target: &str) -> Result<()>;
}
