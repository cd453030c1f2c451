//! Movie state and the reducer that folds actions into it.
//!
//! Failures are ordinary transitions: a failure action records its
//! [`Failure`] on the slice it belongs to and ends that slice's loading.

use relay::{Failure, Reducer};
use serde::Serialize;
use tmdb::{Genre, Movie, MovieDetails};

use super::actions::MovieAction;

/// One listing with its request status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Collection {
    pub movies: Vec<Movie>,
    pub loading: bool,
    pub error: Option<Failure>,
}

impl Collection {
    fn request(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn loaded(&mut self, movies: &[Movie]) {
        self.movies = movies.to_vec();
        self.loading = false;
        self.error = None;
    }

    fn failed(&mut self, error: &Failure) {
        self.loading = false;
        self.error = Some(error.clone());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenreCatalog {
    pub genres: Vec<Genre>,
    pub loading: bool,
    pub error: Option<Failure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectedMovie {
    pub movie: Option<MovieDetails>,
    pub loading: bool,
    pub error: Option<Failure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<Movie>,
    pub loading: bool,
    pub error: Option<Failure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthState {
    pub session_id: Option<String>,
    pub login_prompt_open: bool,
    pub logging_in: bool,
    pub error: Option<Failure>,
}

impl AuthState {
    pub fn is_logged_in(&self) -> bool {
        self.session_id.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MovieState {
    pub popular: Collection,
    pub now_playing: Collection,
    pub top_rated: Collection,
    pub upcoming: Collection,
    pub favourites: Collection,
    pub watch_list: Collection,
    pub by_genres: Collection,
    pub by_rating: Collection,
    pub genres: GenreCatalog,
    pub selected: SelectedMovie,
    pub search: SearchState,
    pub auth: AuthState,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MovieReducer;

impl Reducer for MovieReducer {
    type State = MovieState;
    type Action = MovieAction;

    fn reduce(&self, state: &mut MovieState, action: &MovieAction) {
        use MovieAction as A;

        match action {
            A::LoadPopularMovies => state.popular.request(),
            A::LoadPopularMoviesSuccess { movies } => state.popular.loaded(movies),
            A::LoadPopularMoviesFailure { error } => state.popular.failed(error),

            A::LoadNowPlayingMovies => state.now_playing.request(),
            A::LoadNowPlayingMoviesSuccess { movies } => state.now_playing.loaded(movies),
            A::LoadNowPlayingMoviesFailure { error } => state.now_playing.failed(error),

            A::LoadTopRatedMovies => state.top_rated.request(),
            A::LoadTopRatedMoviesSuccess { movies } => state.top_rated.loaded(movies),
            A::LoadTopRatedMoviesFailure { error } => state.top_rated.failed(error),

            A::LoadUpcomingMovies => state.upcoming.request(),
            A::LoadUpcomingMoviesSuccess { movies } => state.upcoming.loaded(movies),
            A::LoadUpcomingMoviesFailure { error } => state.upcoming.failed(error),

            A::LoadFavouriteMovies => state.favourites.request(),
            A::LoadFavouriteMoviesSuccess { movies } => state.favourites.loaded(movies),
            A::LoadFavouriteMoviesFailure { error } => state.favourites.failed(error),

            A::LoadWatchListMovies => state.watch_list.request(),
            A::LoadWatchListMoviesSuccess { movies } => state.watch_list.loaded(movies),
            A::LoadWatchListMoviesFailure { error } => state.watch_list.failed(error),

            A::LoadMoviesByGenres { .. } => state.by_genres.request(),
            A::LoadMoviesByGenresSuccess { movies } => state.by_genres.loaded(movies),
            A::LoadMoviesByGenresFailure { error } => state.by_genres.failed(error),

            A::LoadMoviesByRating { .. } => state.by_rating.request(),
            A::LoadMoviesByRatingSuccess { movies } => state.by_rating.loaded(movies),
            A::LoadMoviesByRatingFailure { error } => state.by_rating.failed(error),

            // List contents only change once the follow-up reload lands
            A::SetMovieToFavourites { .. }
            | A::RemoveMovieFromFavourites { .. }
            | A::SetMovieToWatchList { .. }
            | A::RemoveMovieFromWatchList { .. } => {}

            A::LoadMovieDetails { movie_id } => {
                let selected = &mut state.selected;
                if selected.movie.as_ref().map(|m| m.id) != Some(*movie_id) {
                    selected.movie = None;
                }
                selected.loading = true;
                selected.error = None;
            }
            A::LoadMovieDetailsSuccess { movie } => {
                state.selected.movie = Some(movie.clone());
                state.selected.loading = false;
                state.selected.error = None;
            }
            A::LoadMovieDetailsFailure { error } => {
                state.selected.loading = false;
                state.selected.error = Some(error.clone());
            }

            A::LoadGenres => {
                state.genres.loading = true;
                state.genres.error = None;
            }
            A::LoadGenresSuccess { genres } => {
                state.genres.genres = genres.clone();
                state.genres.loading = false;
                state.genres.error = None;
            }
            A::LoadGenresFailure { error } => {
                state.genres.loading = false;
                state.genres.error = Some(error.clone());
            }

            A::SearchMovies { query } => {
                state.search.query = query.clone();
                state.search.loading = true;
                state.search.error = None;
            }
            A::SearchMoviesSuccess { movies } => {
                state.search.results = movies.clone();
                state.search.loading = false;
                state.search.error = None;
            }
            A::SearchMoviesFailure { error } => {
                state.search.loading = false;
                state.search.error = Some(error.clone());
            }
            A::ClearSearchResults => state.search = SearchState::default(),

            A::Login { .. } => {
                state.auth.logging_in = true;
                state.auth.error = None;
            }
            A::LoginSuccess { session_id, .. } => {
                state.auth.session_id = Some(session_id.clone());
                state.auth.logging_in = false;
                state.auth.error = None;
            }
            A::LoginFailure { error } => {
                state.auth.logging_in = false;
                state.auth.error = Some(error.clone());
            }
            A::OpenLoginPrompt => state.auth.login_prompt_open = true,
            A::CloseLoginPrompt => state.auth.login_prompt_open = false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay::FailureKind;

    fn movie(id: u64, title: &str) -> Movie {
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

    fn apply(state: &mut MovieState, actions: &[MovieAction]) {
        for action in actions {
            MovieReducer.reduce(state, action);
        }
    }

    #[test]
    fn test_request_success_failure_cycle() {
        let mut state = MovieState::default();

        apply(&mut state, &[MovieAction::LoadPopularMovies]);
        assert!(state.popular.loading);

        apply(
            &mut state,
            &[MovieAction::LoadPopularMoviesSuccess {
                movies: vec![movie(550, "Fight Club")],
            }],
        );
        assert!(!state.popular.loading);
        assert_eq!(state.popular.movies[0].title, "Fight Club");

        let error = Failure::new(FailureKind::Network, "offline");
        apply(
            &mut state,
            &[
                MovieAction::LoadPopularMovies,
                MovieAction::LoadPopularMoviesFailure {
                    error: error.clone(),
                },
            ],
        );
        assert!(!state.popular.loading);
        assert_eq!(state.popular.error, Some(error));
        // previous data survives a failed reload
        assert_eq!(state.popular.movies.len(), 1);
    }

    #[test]
    fn test_new_request_clears_error() {
        let mut state = MovieState::default();
        apply(
            &mut state,
            &[
                MovieAction::LoadFavouriteMoviesFailure {
                    error: Failure::new(FailureKind::Unauthorized, "no session"),
                },
                MovieAction::LoadFavouriteMovies,
            ],
        );
        assert!(state.favourites.loading);
        assert_eq!(state.favourites.error, None);
    }

    #[test]
    fn test_lists_are_independent() {
        let mut state = MovieState::default();
        apply(
            &mut state,
            &[
                MovieAction::LoadWatchListMovies,
                MovieAction::LoadTopRatedMoviesSuccess {
                    movies: vec![movie(1, "A")],
                },
            ],
        );
        assert!(state.watch_list.loading);
        assert!(!state.top_rated.loading);
        assert!(state.upcoming.movies.is_empty());
    }

    #[test]
    fn test_clear_search_results() {
        let mut state = MovieState::default();
        apply(
            &mut state,
            &[
                MovieAction::SearchMovies {
                    query: "alien".into(),
                },
                MovieAction::SearchMoviesSuccess {
                    movies: vec![movie(348, "Alien")],
                },
            ],
        );
        assert_eq!(state.search.query, "alien");
        assert_eq!(state.search.results.len(), 1);

        apply(&mut state, &[MovieAction::ClearSearchResults]);
        assert_eq!(state.search, SearchState::default());
    }

    #[test]
    fn test_login_flow_and_prompt() {
        let mut state = MovieState::default();
        apply(
            &mut state,
            &[
                MovieAction::OpenLoginPrompt,
                MovieAction::Login {
                    username: "johnny".into(),
                    password: "secret".into(),
                    redirect_url: None,
                },
            ],
        );
        assert!(state.auth.login_prompt_open);
        assert!(state.auth.logging_in);

        apply(
            &mut state,
            &[
                MovieAction::LoginSuccess {
                    session_id: "79191836ddaa".into(),
                    redirect_url: None,
                },
                MovieAction::CloseLoginPrompt,
            ],
        );
        assert!(state.auth.is_logged_in());
        assert!(!state.auth.logging_in);
        assert!(!state.auth.login_prompt_open);
    }

    #[test]
    fn test_login_failure_keeps_prompt_open() {
        let mut state = MovieState::default();
        let error = Failure::new(FailureKind::Unauthorized, "Invalid username and/or password");
        apply(
            &mut state,
            &[
                MovieAction::OpenLoginPrompt,
                MovieAction::Login {
                    username: "johnny".into(),
                    password: "wrong".into(),
                    redirect_url: None,
                },
                MovieAction::LoginFailure {
                    error: error.clone(),
                },
            ],
        );
        assert!(state.auth.login_prompt_open);
        assert!(!state.auth.is_logged_in());
        assert_eq!(state.auth.error, Some(error));
    }

    #[test]
    fn test_details_for_another_movie_drops_stale_record() {
        let mut state = MovieState::default();
        let details = MovieDetails {
            id: 603,
            title: "The Matrix".into(),
            overview: String::new(),
            tagline: None,
            poster_path: None,
            backdrop_path: None,
            release_date: None,
            runtime: Some(136),
            status: None,
            vote_average: 8.2,
            vote_count: 0,
            genres: Vec::new(),
        };
        apply(
            &mut state,
            &[MovieAction::LoadMovieDetailsSuccess { movie: details }],
        );

        apply(&mut state, &[MovieAction::LoadMovieDetails { movie_id: 603 }]);
        assert!(state.selected.movie.is_some());

        apply(&mut state, &[MovieAction::LoadMovieDetails { movie_id: 550 }]);
        assert!(state.selected.movie.is_none());
        assert!(state.selected.loading);
    }
}
