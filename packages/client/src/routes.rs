//! Routes and the intents published when one is entered.

use std::fmt;

use crate::domains::movies::MovieAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Popular,
    NowPlaying,
    TopRated,
    Upcoming,
    Favourites,
    WatchList,
    MovieDetails(u64),
    Search,
    Genres,
}

impl Route {
    /// Map a path such as a login redirect target back to a route.
    ///
    /// `/` is the popular listing. Trailing slashes are ignored.
    pub fn parse(path: &str) -> Option<Route> {
        let trimmed = path.trim().trim_end_matches('/');
        let route = match trimmed {
            "" | "/popular" => Route::Popular,
            "/now-playing" => Route::NowPlaying,
            "/top-rated" => Route::TopRated,
            "/upcoming" => Route::Upcoming,
            "/favourites" => Route::Favourites,
            "/watch-list" => Route::WatchList,
            "/search" => Route::Search,
            "/genres" => Route::Genres,
            other => {
                let id = other.strip_prefix("/movie/")?;
                Route::MovieDetails(id.parse().ok()?)
            }
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Popular => "/popular".to_string(),
            Route::NowPlaying => "/now-playing".to_string(),
            Route::TopRated => "/top-rated".to_string(),
            Route::Upcoming => "/upcoming".to_string(),
            Route::Favourites => "/favourites".to_string(),
            Route::WatchList => "/watch-list".to_string(),
            Route::MovieDetails(id) => format!("/movie/{}", id),
            Route::Search => "/search".to_string(),
            Route::Genres => "/genres".to_string(),
        }
    }

    /// Intents to publish, in order, when the route is entered.
    ///
    /// Search publishes nothing on entry; queries come from user input.
    pub fn entry_actions(&self) -> Vec<MovieAction> {
        match self {
            Route::Popular => vec![MovieAction::LoadPopularMovies],
            Route::NowPlaying => vec![MovieAction::LoadNowPlayingMovies],
            Route::TopRated => vec![MovieAction::LoadTopRatedMovies],
            Route::Upcoming => vec![MovieAction::LoadGenres, MovieAction::LoadUpcomingMovies],
            Route::Favourites => vec![MovieAction::LoadFavouriteMovies],
            Route::WatchList => vec![MovieAction::LoadWatchListMovies],
            Route::MovieDetails(movie_id) => vec![MovieAction::LoadMovieDetails {
                movie_id: *movie_id,
            }],
            Route::Search => Vec::new(),
            Route::Genres => vec![MovieAction::LoadGenres],
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
