//! The closed action vocabulary of the movie client.
//!
//! Request variants carry their parameters, success variants carry the
//! provider's data, and failure variants carry a [`Failure`]. Everything an
//! integrator can do is publish one of these and observe the state.

use relay::{Action, Failure};
use serde::Serialize;
use tmdb::{Genre, Movie, MovieDetails};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MovieAction {
    // Category listings
    LoadPopularMovies,
    LoadPopularMoviesSuccess { movies: Vec<Movie> },
    LoadPopularMoviesFailure { error: Failure },

    LoadNowPlayingMovies,
    LoadNowPlayingMoviesSuccess { movies: Vec<Movie> },
    LoadNowPlayingMoviesFailure { error: Failure },

    LoadTopRatedMovies,
    LoadTopRatedMoviesSuccess { movies: Vec<Movie> },
    LoadTopRatedMoviesFailure { error: Failure },

    LoadUpcomingMovies,
    LoadUpcomingMoviesSuccess { movies: Vec<Movie> },
    LoadUpcomingMoviesFailure { error: Failure },

    // Details
    LoadMovieDetails { movie_id: u64 },
    LoadMovieDetailsSuccess { movie: MovieDetails },
    LoadMovieDetailsFailure { error: Failure },

    // Favourites
    LoadFavouriteMovies,
    LoadFavouriteMoviesSuccess { movies: Vec<Movie> },
    LoadFavouriteMoviesFailure { error: Failure },
    SetMovieToFavourites { movie_id: u64 },
    RemoveMovieFromFavourites { movie_id: u64 },

    // Watch list
    LoadWatchListMovies,
    LoadWatchListMoviesSuccess { movies: Vec<Movie> },
    LoadWatchListMoviesFailure { error: Failure },
    SetMovieToWatchList { movie_id: u64 },
    RemoveMovieFromWatchList { movie_id: u64 },

    // Auth
    Login {
        username: String,
        #[serde(skip_serializing)]
        password: String,
        redirect_url: Option<String>,
    },
    LoginSuccess {
        session_id: String,
        redirect_url: Option<String>,
    },
    LoginFailure { error: Failure },
    OpenLoginPrompt,
    CloseLoginPrompt,

    // Search
    SearchMovies { query: String },
    SearchMoviesSuccess { movies: Vec<Movie> },
    SearchMoviesFailure { error: Failure },
    ClearSearchResults,

    // Genres
    LoadGenres,
    LoadGenresSuccess { genres: Vec<Genre> },
    LoadGenresFailure { error: Failure },

    LoadMoviesByGenres { genres: Vec<u32> },
    LoadMoviesByGenresSuccess { movies: Vec<Movie> },
    LoadMoviesByGenresFailure { error: Failure },

    LoadMoviesByRating { rating: f32 },
    LoadMoviesByRatingSuccess { movies: Vec<Movie> },
    LoadMoviesByRatingFailure { error: Failure },
}

/// Payload-free discriminant of [`MovieAction`], used for trigger matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionTag {
    LoadPopularMovies,
    LoadPopularMoviesSuccess,
    LoadPopularMoviesFailure,
    LoadNowPlayingMovies,
    LoadNowPlayingMoviesSuccess,
    LoadNowPlayingMoviesFailure,
    LoadTopRatedMovies,
    LoadTopRatedMoviesSuccess,
    LoadTopRatedMoviesFailure,
    LoadUpcomingMovies,
    LoadUpcomingMoviesSuccess,
    LoadUpcomingMoviesFailure,
    LoadMovieDetails,
    LoadMovieDetailsSuccess,
    LoadMovieDetailsFailure,
    LoadFavouriteMovies,
    LoadFavouriteMoviesSuccess,
    LoadFavouriteMoviesFailure,
    SetMovieToFavourites,
    RemoveMovieFromFavourites,
    LoadWatchListMovies,
    LoadWatchListMoviesSuccess,
    LoadWatchListMoviesFailure,
    SetMovieToWatchList,
    RemoveMovieFromWatchList,
    Login,
    LoginSuccess,
    LoginFailure,
    OpenLoginPrompt,
    CloseLoginPrompt,
    SearchMovies,
    SearchMoviesSuccess,
    SearchMoviesFailure,
    ClearSearchResults,
    LoadGenres,
    LoadGenresSuccess,
    LoadGenresFailure,
    LoadMoviesByGenres,
    LoadMoviesByGenresSuccess,
    LoadMoviesByGenresFailure,
    LoadMoviesByRating,
    LoadMoviesByRatingSuccess,
    LoadMoviesByRatingFailure,
}

impl ActionTag {
    /// The kebab-case tag name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTag::LoadPopularMovies => "load-popular-movies",
            ActionTag::LoadPopularMoviesSuccess => "load-popular-movies-success",
            ActionTag::LoadPopularMoviesFailure => "load-popular-movies-failure",
            ActionTag::LoadNowPlayingMovies => "load-now-playing-movies",
            ActionTag::LoadNowPlayingMoviesSuccess => "load-now-playing-movies-success",
            ActionTag::LoadNowPlayingMoviesFailure => "load-now-playing-movies-failure",
            ActionTag::LoadTopRatedMovies => "load-top-rated-movies",
            ActionTag::LoadTopRatedMoviesSuccess => "load-top-rated-movies-success",
            ActionTag::LoadTopRatedMoviesFailure => "load-top-rated-movies-failure",
            ActionTag::LoadUpcomingMovies => "load-upcoming-movies",
            ActionTag::LoadUpcomingMoviesSuccess => "load-upcoming-movies-success",
            ActionTag::LoadUpcomingMoviesFailure => "load-upcoming-movies-failure",
            ActionTag::LoadMovieDetails => "load-movie-details",
            ActionTag::LoadMovieDetailsSuccess => "load-movie-details-success",
            ActionTag::LoadMovieDetailsFailure => "load-movie-details-failure",
            ActionTag::LoadFavouriteMovies => "load-favourite-movies",
            ActionTag::LoadFavouriteMoviesSuccess => "load-favourite-movies-success",
            ActionTag::LoadFavouriteMoviesFailure => "load-favourite-movies-failure",
            ActionTag::SetMovieToFavourites => "set-movie-to-favourites",
            ActionTag::RemoveMovieFromFavourites => "remove-movie-from-favourites",
            ActionTag::LoadWatchListMovies => "load-watch-list-movies",
            ActionTag::LoadWatchListMoviesSuccess => "load-watch-list-movies-success",
            ActionTag::LoadWatchListMoviesFailure => "load-watch-list-movies-failure",
            ActionTag::SetMovieToWatchList => "set-movie-to-watch-list",
            ActionTag::RemoveMovieFromWatchList => "remove-movie-from-watch-list",
            ActionTag::Login => "login",
            ActionTag::LoginSuccess => "login-success",
            ActionTag::LoginFailure => "login-failure",
            ActionTag::OpenLoginPrompt => "open-login-prompt",
            ActionTag::CloseLoginPrompt => "close-login-prompt",
            ActionTag::SearchMovies => "search-movies",
            ActionTag::SearchMoviesSuccess => "search-movies-success",
            ActionTag::SearchMoviesFailure => "search-movies-failure",
            ActionTag::ClearSearchResults => "clear-search-results",
            ActionTag::LoadGenres => "load-genres",
            ActionTag::LoadGenresSuccess => "load-genres-success",
            ActionTag::LoadGenresFailure => "load-genres-failure",
            ActionTag::LoadMoviesByGenres => "load-movies-by-genres",
            ActionTag::LoadMoviesByGenresSuccess => "load-movies-by-genres-success",
            ActionTag::LoadMoviesByGenresFailure => "load-movies-by-genres-failure",
            ActionTag::LoadMoviesByRating => "load-movies-by-rating",
            ActionTag::LoadMoviesByRatingSuccess => "load-movies-by-rating-success",
            ActionTag::LoadMoviesByRatingFailure => "load-movies-by-rating-failure",
        }
    }
}

impl std::fmt::Display for ActionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Action for MovieAction {
    type Tag = ActionTag;

    fn tag(&self) -> ActionTag {
        use MovieAction as A;
        match self {
            A::LoadPopularMovies => ActionTag::LoadPopularMovies,
            A::LoadPopularMoviesSuccess { .. } => ActionTag::LoadPopularMoviesSuccess,
            A::LoadPopularMoviesFailure { .. } => ActionTag::LoadPopularMoviesFailure,
            A::LoadNowPlayingMovies => ActionTag::LoadNowPlayingMovies,
            A::LoadNowPlayingMoviesSuccess { .. } => ActionTag::LoadNowPlayingMoviesSuccess,
            A::LoadNowPlayingMoviesFailure { .. } => ActionTag::LoadNowPlayingMoviesFailure,
            A::LoadTopRatedMovies => ActionTag::LoadTopRatedMovies,
            A::LoadTopRatedMoviesSuccess { .. } => ActionTag::LoadTopRatedMoviesSuccess,
            A::LoadTopRatedMoviesFailure { .. } => ActionTag::LoadTopRatedMoviesFailure,
            A::LoadUpcomingMovies => ActionTag::LoadUpcomingMovies,
            A::LoadUpcomingMoviesSuccess { .. } => ActionTag::LoadUpcomingMoviesSuccess,
            A::LoadUpcomingMoviesFailure { .. } => ActionTag::LoadUpcomingMoviesFailure,
            A::LoadMovieDetails { .. } => ActionTag::LoadMovieDetails,
            A::LoadMovieDetailsSuccess { .. } => ActionTag::LoadMovieDetailsSuccess,
            A::LoadMovieDetailsFailure { .. } => ActionTag::LoadMovieDetailsFailure,
            A::LoadFavouriteMovies => ActionTag::LoadFavouriteMovies,
            A::LoadFavouriteMoviesSuccess { .. } => ActionTag::LoadFavouriteMoviesSuccess,
            A::LoadFavouriteMoviesFailure { .. } => ActionTag::LoadFavouriteMoviesFailure,
            A::SetMovieToFavourites { .. } => ActionTag::SetMovieToFavourites,
            A::RemoveMovieFromFavourites { .. } => ActionTag::RemoveMovieFromFavourites,
            A::LoadWatchListMovies => ActionTag::LoadWatchListMovies,
            A::LoadWatchListMoviesSuccess { .. } => ActionTag::LoadWatchListMoviesSuccess,
            A::LoadWatchListMoviesFailure { .. } => ActionTag::LoadWatchListMoviesFailure,
            A::SetMovieToWatchList { .. } => ActionTag::SetMovieToWatchList,
            A::RemoveMovieFromWatchList { .. } => ActionTag::RemoveMovieFromWatchList,
            A::Login { .. } => ActionTag::Login,
            A::LoginSuccess { .. } => ActionTag::LoginSuccess,
            A::LoginFailure { .. } => ActionTag::LoginFailure,
            A::OpenLoginPrompt => ActionTag::OpenLoginPrompt,
            A::CloseLoginPrompt => ActionTag::CloseLoginPrompt,
            A::SearchMovies { .. } => ActionTag::SearchMovies,
            A::SearchMoviesSuccess { .. } => ActionTag::SearchMoviesSuccess,
            A::SearchMoviesFailure { .. } => ActionTag::SearchMoviesFailure,
            A::ClearSearchResults => ActionTag::ClearSearchResults,
            A::LoadGenres => ActionTag::LoadGenres,
            A::LoadGenresSuccess { .. } => ActionTag::LoadGenresSuccess,
            A::LoadGenresFailure { .. } => ActionTag::LoadGenresFailure,
            A::LoadMoviesByGenres { .. } => ActionTag::LoadMoviesByGenres,
            A::LoadMoviesByGenresSuccess { .. } => ActionTag::LoadMoviesByGenresSuccess,
            A::LoadMoviesByGenresFailure { .. } => ActionTag::LoadMoviesByGenresFailure,
            A::LoadMoviesByRating { .. } => ActionTag::LoadMoviesByRating,
            A::LoadMoviesByRatingSuccess { .. } => ActionTag::LoadMoviesByRatingSuccess,
            A::LoadMoviesByRatingFailure { .. } => ActionTag::LoadMoviesByRatingFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay::FailureKind;

    #[test]
    fn test_tags_are_kebab_case() {
        assert_eq!(
            MovieAction::LoadPopularMovies.tag().as_str(),
            "load-popular-movies"
        );
        assert_eq!(
            MovieAction::SetMovieToFavourites { movie_id: 42 }
                .tag()
                .to_string(),
            "set-movie-to-favourites"
        );
        assert_eq!(
            MovieAction::CloseLoginPrompt.tag().as_str(),
            "close-login-prompt"
        );
    }

    #[test]
    fn test_failure_variants_carry_failure() {
        let action = MovieAction::SearchMoviesFailure {
            error: Failure::new(FailureKind::Network, "offline"),
        };
        assert_eq!(action.tag(), ActionTag::SearchMoviesFailure);
    }

    #[test]
    fn test_password_is_never_serialized() {
        let action = MovieAction::Login {
            username: "johnny".into(),
            password: "hunter2".into(),
            redirect_url: Some("/favourites".into()),
        };
        let json = serde_json::to_string(&action).unwrap();

        assert!(json.contains("\"type\":\"login\""));
        assert!(json.contains("johnny"));
        assert!(!json.contains("hunter2"));
    }
}
