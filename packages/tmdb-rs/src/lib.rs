//! TMDB v3 REST client
//!
//! A thin typed client for the movie catalog, the account lists, and the
//! request-token login flow. No caching and no retries.
//!
//! # Example
//!
//! ```rust,ignore
//! use tmdb::{MovieCategory, TmdbClient, TmdbOptions};
//!
//! let client = TmdbClient::new(TmdbOptions::new(api_key));
//!
//! let popular = client.movies(MovieCategory::Popular).await?;
//! let found = client.search("alien").await?;
//!
//! // Login
//! let token = client.request_token().await?;
//! client.validate_with_login("johnny", "secret", &token.request_token).await?;
//! let session = client.create_session(&token.request_token).await?;
//! ```

pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{Genre, Movie, MovieDetails, Page, RequestToken, Session, StatusResponse};

use std::time::Instant;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::models::{GenreList, LoginRequest, SessionRequest};

/// Public TMDB v3 endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Clone)]
pub struct TmdbOptions {
    pub api_key: String,
    pub base_url: String,
    /// Account path segment. TMDB resolves `"null"` from the session.
    pub account_id: String,
}

impl TmdbOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            account_id: "null".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }
}

/// The four fixed movie listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovieCategory {
    Popular,
    NowPlaying,
    TopRated,
    Upcoming,
}

impl MovieCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovieCategory::Popular => "popular",
            MovieCategory::NowPlaying => "now_playing",
            MovieCategory::TopRated => "top_rated",
            MovieCategory::Upcoming => "upcoming",
        }
    }
}

/// The two per-account movie lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountList {
    Favorite,
    Watchlist,
}

impl AccountList {
    /// Path segment and body key: `"favorite"` or `"watchlist"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountList::Favorite => "favorite",
            AccountList::Watchlist => "watchlist",
        }
    }
}

impl std::fmt::Display for AccountList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    http_client: Client,
    options: TmdbOptions,
}

impl TmdbClient {
    pub fn new(options: TmdbOptions) -> Self {
        Self {
            http_client: Client::new(),
            options,
        }
    }

    pub fn options(&self) -> &TmdbOptions {
        &self.options
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// `GET /movie/{category}`
    pub async fn movies(&self, category: MovieCategory) -> Result<Page<Movie>> {
        self.get(&format!("/movie/{}", category.as_str()), &[]).await
    }

    /// `GET /movie/{id}`
    pub async fn movie_details(&self, movie_id: u64) -> Result<MovieDetails> {
        self.get(&format!("/movie/{}", movie_id), &[]).await
    }

    /// `GET /search/movie?query=`
    pub async fn search(&self, query: &str) -> Result<Page<Movie>> {
        self.get("/search/movie", &[("query", query.to_string())])
            .await
    }

    /// `GET /discover/movie?with_genres=a,b`
    pub async fn discover_by_genres(&self, genres: &[u32]) -> Result<Page<Movie>> {
        self.get("/discover/movie", &[("with_genres", genre_filter(genres))])
            .await
    }

    /// `GET /discover/movie?vote_average.gte=`, best rated first.
    pub async fn discover_by_rating(&self, min_rating: f32) -> Result<Page<Movie>> {
        self.get(
            "/discover/movie",
            &[
                ("vote_average.gte", min_rating.to_string()),
                ("sort_by", "vote_average.desc".to_string()),
            ],
        )
        .await
    }

    /// `GET /genre/movie/list`
    pub async fn genres(&self) -> Result<Vec<Genre>> {
        let list: GenreList = self.get("/genre/movie/list", &[]).await?;
        Ok(list.genres)
    }

    // =========================================================================
    // Account lists
    // =========================================================================

    /// `GET /account/{id}/{favorite|watchlist}/movies?session_id=`
    pub async fn account_movies(&self, list: AccountList, session_id: &str) -> Result<Page<Movie>> {
        if session_id.is_empty() {
            return Err(Error::MissingSession);
        }
        let path = format!("/account/{}/{}/movies", self.options.account_id, list);
        self.get(&path, &[("session_id", session_id.to_string())])
            .await
    }

    /// `POST /account/{id}/{favorite|watchlist}`
    pub async fn update_account_list(
        &self,
        list: AccountList,
        movie_id: u64,
        member: bool,
        session_id: &str,
    ) -> Result<StatusResponse> {
        if session_id.is_empty() {
            return Err(Error::MissingSession);
        }
        let path = format!("/account/{}/{}", self.options.account_id, list);
        let mut body = json!({
            "media_type": "movie",
            "media_id": movie_id,
        });
        body[list.as_str()] = json!(member);
        let request = self
            .http_client
            .post(self.url(&path))
            .query(&[("api_key", self.options.api_key.as_str()), ("session_id", session_id)])
            .json(&body);
        self.send(&path, request).await
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// `GET /authentication/token/new`
    pub async fn request_token(&self) -> Result<RequestToken> {
        self.get("/authentication/token/new", &[]).await
    }

    /// `POST /authentication/token/validate_with_login`
    pub async fn validate_with_login(
        &self,
        username: &str,
        password: &str,
        request_token: &str,
    ) -> Result<RequestToken> {
        let body = LoginRequest {
            username,
            password,
            request_token,
        };
        self.post("/authentication/token/validate_with_login", &body)
            .await
    }

    /// `POST /authentication/session/new`
    pub async fn create_session(&self, request_token: &str) -> Result<Session> {
        self.post(
            "/authentication/session/new",
            &SessionRequest { request_token },
        )
        .await
    }

    // =========================================================================
    // Transport
    // =========================================================================

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.options.base_url.trim_end_matches('/'), path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let request = self
            .http_client
            .get(self.url(path))
            .query(&[("api_key", self.options.api_key.as_str())])
            .query(query);
        self.send(path, request).await
    }

    async fn post<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self
            .http_client
            .post(self.url(path))
            .query(&[("api_key", self.options.api_key.as_str())])
            .json(body);
        self.send(path, request).await
    }

    async fn send<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T> {
        let start = Instant::now();

        let response = request.send().await.map_err(|e| {
            warn!(path, error = %e, "TMDB request failed");
            Error::Http(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        debug!(
            path,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis(),
            "TMDB request"
        );

        decode(status.as_u16(), &body)
    }
}

fn genre_filter(genres: &[u32]) -> String {
    genres
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn decode<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
    if !(200..300).contains(&status) {
        let err = Error::from_response(status, body);
        warn!(status, error = %err, "TMDB API error");
        return Err(err);
    }
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> TmdbClient {
        TmdbClient::new(TmdbOptions::new("key").with_base_url(base_url))
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        assert_eq!(
            client("https://api.themoviedb.org/3/").url("/movie/popular"),
            "https://api.themoviedb.org/3/movie/popular"
        );
        assert_eq!(
            client(DEFAULT_BASE_URL).url("/genre/movie/list"),
            "https://api.themoviedb.org/3/genre/movie/list"
        );
    }

    #[test]
    fn test_category_paths() {
        assert_eq!(MovieCategory::NowPlaying.as_str(), "now_playing");
        assert_eq!(MovieCategory::TopRated.as_str(), "top_rated");
    }

    #[test]
    fn test_account_list_names() {
        assert_eq!(AccountList::Favorite.to_string(), "favorite");
        assert_eq!(AccountList::Watchlist.as_str(), "watchlist");
    }

    #[test]
    fn test_genre_filter_is_comma_separated() {
        assert_eq!(genre_filter(&[28, 12, 16]), "28,12,16");
        assert_eq!(genre_filter(&[]), "");
    }

    #[test]
    fn test_default_options() {
        let options = TmdbOptions::new("key");
        assert_eq!(options.base_url, DEFAULT_BASE_URL);
        assert_eq!(options.account_id, "null");
    }

    #[test]
    fn test_decode_success_and_failure() {
        let genres: GenreList =
            decode(200, r#"{"genres":[{"id":28,"name":"Action"}]}"#).unwrap();
        assert_eq!(genres.genres[0].name, "Action");

        let err = decode::<GenreList>(404, r#"{"status_code":34,"status_message":"The resource you requested could not be found."}"#)
            .unwrap_err();
        assert_eq!(err.status(), Some(404));

        let err = decode::<GenreList>(200, "not json").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn test_account_calls_need_a_session() {
        let client = client("http://127.0.0.1:9");

        let err = client
            .account_movies(AccountList::Favorite, "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingSession));

        let err = client
            .update_account_list(AccountList::Watchlist, 550, true, "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingSession));
    }
}
