//! Wire models for TMDB v3 responses and request bodies.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// A movie as it appears in list, search, and discover results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default, deserialize_with = "release_date")]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

/// Full record from `/movie/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default, deserialize_with = "release_date")]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub page: u32,
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GenreList {
    pub genres: Vec<Genre>,
}

/// Request token from `/authentication/token/new` or `validate_with_login`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestToken {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub expires_at: Option<String>,
    pub request_token: String,
}

/// Session from `/authentication/session/new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub success: bool,
    pub session_id: String,
}

/// Generic `{status_code, status_message}` body used by writes and errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub status_code: i32,
    #[serde(default)]
    pub status_message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub request_token: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionRequest<'a> {
    pub request_token: &'a str,
}

/// TMDB release dates are `YYYY-MM-DD`, `""`, or `null`.
fn release_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(date) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
