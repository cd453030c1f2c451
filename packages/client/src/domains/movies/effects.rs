use anyhow::{anyhow, Result};
use async_trait::async_trait;
use relay::{
    smallvec, Action, ConcurrencyPolicy, Effect, EffectContext, EngineBuilder, Failure, MatchTags,
    Reducer,
};
use tmdb::{AccountList, Genre, Movie, MovieCategory, MovieDetails};
use tracing::debug;

use super::actions::{ActionTag, MovieAction};
use crate::kernel::ClientDeps;

/// Register every movie trigger on the builder.
pub fn register<R>(
    builder: EngineBuilder<MovieAction, ClientDeps, R>,
) -> EngineBuilder<MovieAction, ClientDeps, R>
where
    R: Reducer<Action = MovieAction>,
{
    builder
        .with_effect(CategoryEffect::new(MovieCategory::Popular))
        .with_effect(CategoryEffect::new(MovieCategory::NowPlaying))
        .with_effect(CategoryEffect::new(MovieCategory::TopRated))
        .with_effect(CategoryEffect::new(MovieCategory::Upcoming))
        .with_effect(MovieDetailsEffect)
        .with_effect(AccountListEffect::new(AccountList::Favorite))
        .with_effect(AccountListEffect::new(AccountList::Watchlist))
        .with_effect(MembershipEffect::new(AccountList::Favorite))
        .with_effect(MembershipEffect::new(AccountList::Watchlist))
        .with_effect(GenresEffect)
        .with_effect(MoviesByGenresEffect)
        .with_effect(MoviesByRatingEffect)
        .with_effect(SearchEffect)
}

fn unexpected(action: &MovieAction) -> anyhow::Error {
    anyhow!("unexpected action: {}", action.tag())
}

// =============================================================================
// Category listings
// =============================================================================

/// Loads one of the four fixed listings, one request at a time.
pub struct CategoryEffect {
    category: MovieCategory,
}

impl CategoryEffect {
    pub fn new(category: MovieCategory) -> Self {
        Self { category }
    }
}

#[async_trait]
impl Effect<MovieAction, ClientDeps> for CategoryEffect {
    type Output = Vec<Movie>;

    fn name(&self) -> &'static str {
        match self.category {
            MovieCategory::Popular => "load_popular_movies",
            MovieCategory::NowPlaying => "load_now_playing_movies",
            MovieCategory::TopRated => "load_top_rated_movies",
            MovieCategory::Upcoming => "load_upcoming_movies",
        }
    }

    fn matches(&self) -> MatchTags<ActionTag> {
        let tag = match self.category {
            MovieCategory::Popular => ActionTag::LoadPopularMovies,
            MovieCategory::NowPlaying => ActionTag::LoadNowPlayingMovies,
            MovieCategory::TopRated => ActionTag::LoadTopRatedMovies,
            MovieCategory::Upcoming => ActionTag::LoadUpcomingMovies,
        };
        smallvec![tag]
    }

    fn policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::Serialized
    }

    async fn run(&self, _action: MovieAction, ctx: EffectContext<ClientDeps>) -> Result<Vec<Movie>> {
        ctx.deps().movies.movies(self.category).await
    }

    fn on_success(&self, movies: Vec<Movie>) -> MovieAction {
        match self.category {
            MovieCategory::Popular => MovieAction::LoadPopularMoviesSuccess { movies },
            MovieCategory::NowPlaying => MovieAction::LoadNowPlayingMoviesSuccess { movies },
            MovieCategory::TopRated => MovieAction::LoadTopRatedMoviesSuccess { movies },
            MovieCategory::Upcoming => MovieAction::LoadUpcomingMoviesSuccess { movies },
        }
    }

    fn on_failure(&self, error: Failure) -> MovieAction {
        match self.category {
            MovieCategory::Popular => MovieAction::LoadPopularMoviesFailure { error },
            MovieCategory::NowPlaying => MovieAction::LoadNowPlayingMoviesFailure { error },
            MovieCategory::TopRated => MovieAction::LoadTopRatedMoviesFailure { error },
            MovieCategory::Upcoming => MovieAction::LoadUpcomingMoviesFailure { error },
        }
    }
}

// =============================================================================
// Movie details
// =============================================================================

pub struct MovieDetailsEffect;

#[async_trait]
impl Effect<MovieAction, ClientDeps> for MovieDetailsEffect {
    type Output = MovieDetails;

    fn name(&self) -> &'static str {
        "load_movie_details"
    }

    fn matches(&self) -> MatchTags<ActionTag> {
        smallvec![ActionTag::LoadMovieDetails]
    }

    fn policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::Serialized
    }

    async fn run(&self, action: MovieAction, ctx: EffectContext<ClientDeps>) -> Result<MovieDetails> {
        let movie_id = match action {
            MovieAction::LoadMovieDetails { movie_id } => movie_id,
            other => return Err(unexpected(&other)),
        };
        ctx.deps().movies.movie_details(movie_id).await
    }

    fn on_success(&self, movie: MovieDetails) -> MovieAction {
        MovieAction::LoadMovieDetailsSuccess { movie }
    }

    fn on_failure(&self, error: Failure) -> MovieAction {
        MovieAction::LoadMovieDetailsFailure { error }
    }
}

// =============================================================================
// Account lists
// =============================================================================

/// Loads the favourites or the watch-list of the logged-in account.
pub struct AccountListEffect {
    list: AccountList,
}

impl AccountListEffect {
    pub fn new(list: AccountList) -> Self {
        Self { list }
    }
}

/// The reload intent for an account list.
fn load_list_action(list: AccountList) -> MovieAction {
    match list {
        AccountList::Favorite => MovieAction::LoadFavouriteMovies,
        AccountList::Watchlist => MovieAction::LoadWatchListMovies,
    }
}

fn load_list_failure(list: AccountList, error: Failure) -> MovieAction {
    match list {
        AccountList::Favorite => MovieAction::LoadFavouriteMoviesFailure { error },
        AccountList::Watchlist => MovieAction::LoadWatchListMoviesFailure { error },
    }
}

#[async_trait]
impl Effect<MovieAction, ClientDeps> for AccountListEffect {
    type Output = Vec<Movie>;

    fn name(&self) -> &'static str {
        match self.list {
            AccountList::Favorite => "load_favourite_movies",
            AccountList::Watchlist => "load_watch_list_movies",
        }
    }

    fn matches(&self) -> MatchTags<ActionTag> {
        smallvec![load_list_action(self.list).tag()]
    }

    fn policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::Concurrent
    }

    async fn run(&self, _action: MovieAction, ctx: EffectContext<ClientDeps>) -> Result<Vec<Movie>> {
        ctx.deps().movies.list_movies(self.list).await
    }

    fn on_success(&self, movies: Vec<Movie>) -> MovieAction {
        match self.list {
            AccountList::Favorite => MovieAction::LoadFavouriteMoviesSuccess { movies },
            AccountList::Watchlist => MovieAction::LoadWatchListMoviesSuccess { movies },
        }
    }

    fn on_failure(&self, error: Failure) -> MovieAction {
        load_list_failure(self.list, error)
    }
}

/// Adds or removes a movie from an account list, then asks for a reload.
///
/// A failed update is reported as the list's load failure.
pub struct MembershipEffect {
    list: AccountList,
}

impl MembershipEffect {
    pub fn new(list: AccountList) -> Self {
        Self { list }
    }

    /// `(movie_id, member)` for a set or remove intent on this list.
    fn membership(&self, action: &MovieAction) -> Option<(u64, bool)> {
        match (self.list, action) {
            (AccountList::Favorite, MovieAction::SetMovieToFavourites { movie_id }) => {
                Some((*movie_id, true))
            }
            (AccountList::Favorite, MovieAction::RemoveMovieFromFavourites { movie_id }) => {
                Some((*movie_id, false))
            }
            (AccountList::Watchlist, MovieAction::SetMovieToWatchList { movie_id }) => {
                Some((*movie_id, true))
            }
            (AccountList::Watchlist, MovieAction::RemoveMovieFromWatchList { movie_id }) => {
                Some((*movie_id, false))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl Effect<MovieAction, ClientDeps> for MembershipEffect {
    type Output = ();

    fn name(&self) -> &'static str {
        match self.list {
            AccountList::Favorite => "update_favourites_membership",
            AccountList::Watchlist => "update_watch_list_membership",
        }
    }

    fn matches(&self) -> MatchTags<ActionTag> {
        match self.list {
            AccountList::Favorite => smallvec![
                ActionTag::SetMovieToFavourites,
                ActionTag::RemoveMovieFromFavourites
            ],
            AccountList::Watchlist => smallvec![
                ActionTag::SetMovieToWatchList,
                ActionTag::RemoveMovieFromWatchList
            ],
        }
    }

    fn policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::Concurrent
    }

    async fn run(&self, action: MovieAction, ctx: EffectContext<ClientDeps>) -> Result<()> {
        let (movie_id, member) = self
            .membership(&action)
            .ok_or_else(|| unexpected(&action))?;
        debug!(list = %self.list, movie_id, member, "updating list membership");
        ctx.deps()
            .movies
            .update_list(self.list, movie_id, member)
            .await
    }

    fn on_success(&self, _: ()) -> MovieAction {
        load_list_action(self.list)
    }

    fn on_failure(&self, error: Failure) -> MovieAction {
        load_list_failure(self.list, error)
    }
}

// =============================================================================
// Genres
// =============================================================================

pub struct GenresEffect;

#[async_trait]
impl Effect<MovieAction, ClientDeps> for GenresEffect {
    type Output = Vec<Genre>;

    fn name(&self) -> &'static str {
        "load_genres"
    }

    fn matches(&self) -> MatchTags<ActionTag> {
        smallvec![ActionTag::LoadGenres]
    }

    fn policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::Concurrent
    }

    async fn run(&self, _action: MovieAction, ctx: EffectContext<ClientDeps>) -> Result<Vec<Genre>> {
        ctx.deps().movies.genres().await
    }

    fn on_success(&self, genres: Vec<Genre>) -> MovieAction {
        MovieAction::LoadGenresSuccess { genres }
    }

    fn on_failure(&self, error: Failure) -> MovieAction {
        MovieAction::LoadGenresFailure { error }
    }
}

pub struct MoviesByGenresEffect;

#[async_trait]
impl Effect<MovieAction, ClientDeps> for MoviesByGenresEffect {
    type Output = Vec<Movie>;

    fn name(&self) -> &'static str {
        "load_movies_by_genres"
    }

    fn matches(&self) -> MatchTags<ActionTag> {
        smallvec![ActionTag::LoadMoviesByGenres]
    }

    fn policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::Concurrent
    }

    async fn run(&self, action: MovieAction, ctx: EffectContext<ClientDeps>) -> Result<Vec<Movie>> {
        let genres = match action {
            MovieAction::LoadMoviesByGenres { genres } => genres,
            other => return Err(unexpected(&other)),
        };
        ctx.deps().movies.movies_by_genres(&genres).await
    }

    fn on_success(&self, movies: Vec<Movie>) -> MovieAction {
        MovieAction::LoadMoviesByGenresSuccess { movies }
    }

    fn on_failure(&self, error: Failure) -> MovieAction {
        MovieAction::LoadMoviesByGenresFailure { error }
    }
}

/// Minimum-rating filter. A newer rating abandons the pending request.
pub struct MoviesByRatingEffect;

#[async_trait]
impl Effect<MovieAction, ClientDeps> for MoviesByRatingEffect {
    type Output = Vec<Movie>;

    fn name(&self) -> &'static str {
        "load_movies_by_rating"
    }

    fn matches(&self) -> MatchTags<ActionTag> {
        smallvec![ActionTag::LoadMoviesByRating]
    }

    fn policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::LatestOnly
    }

    async fn run(&self, action: MovieAction, ctx: EffectContext<ClientDeps>) -> Result<Vec<Movie>> {
        let rating = match action {
            MovieAction::LoadMoviesByRating { rating } => rating,
            other => return Err(unexpected(&other)),
        };
        ctx.deps().movies.movies_by_rating(rating).await
    }

    fn on_success(&self, movies: Vec<Movie>) -> MovieAction {
        MovieAction::LoadMoviesByRatingSuccess { movies }
    }

    fn on_failure(&self, error: Failure) -> MovieAction {
        MovieAction::LoadMoviesByRatingFailure { error }
    }
}

// =============================================================================
// Search
// =============================================================================

/// Free-text search. Only the latest query's results are ever published.
pub struct SearchEffect;

#[async_trait]
impl Effect<MovieAction, ClientDeps> for SearchEffect {
    type Output = Vec<Movie>;

    fn name(&self) -> &'static str {
        "search_movies"
    }

    fn matches(&self) -> MatchTags<ActionTag> {
        smallvec![ActionTag::SearchMovies]
    }

    fn policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::LatestOnly
    }

    async fn run(&self, action: MovieAction, ctx: EffectContext<ClientDeps>) -> Result<Vec<Movie>> {
        let query = match action {
            MovieAction::SearchMovies { query } => query,
            other => return Err(unexpected(&other)),
        };
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        ctx.deps().movies.search(query).await
    }

    fn on_success(&self, movies: Vec<Movie>) -> MovieAction {
        MovieAction::SearchMoviesSuccess { movies }
    }

    fn on_failure(&self, error: Failure) -> MovieAction {
        MovieAction::SearchMoviesFailure { error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_triggers_have_distinct_names_and_tags() {
        let categories = [
            MovieCategory::Popular,
            MovieCategory::NowPlaying,
            MovieCategory::TopRated,
            MovieCategory::Upcoming,
        ];
        let effects: Vec<_> = categories.into_iter().map(CategoryEffect::new).collect();

        let mut names: Vec<_> = effects
            .iter()
            .map(|e| Effect::<MovieAction, ClientDeps>::name(e))
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);

        let upcoming = &effects[3];
        assert_eq!(
            Effect::<MovieAction, ClientDeps>::matches(upcoming).as_slice(),
            &[ActionTag::LoadUpcomingMovies]
        );
    }

    #[test]
    fn test_membership_reads_set_and_remove() {
        let favourites = MembershipEffect::new(AccountList::Favorite);

        assert_eq!(
            favourites.membership(&MovieAction::SetMovieToFavourites { movie_id: 42 }),
            Some((42, true))
        );
        assert_eq!(
            favourites.membership(&MovieAction::RemoveMovieFromFavourites { movie_id: 42 }),
            Some((42, false))
        );
        assert_eq!(
            favourites.membership(&MovieAction::SetMovieToWatchList { movie_id: 42 }),
            None
        );
    }

    #[test]
    fn test_membership_outcomes_target_the_list() {
        let watch_list = MembershipEffect::new(AccountList::Watchlist);

        assert_eq!(
            Effect::<MovieAction, ClientDeps>::on_success(&watch_list, ()),
            MovieAction::LoadWatchListMovies
        );
        let failure = Failure::internal("boom");
        assert_eq!(
            Effect::<MovieAction, ClientDeps>::on_failure(&watch_list, failure.clone()),
            MovieAction::LoadWatchListMoviesFailure { error: failure }
        );
    }

    #[test]
    fn test_policies() {
        assert_eq!(
            Effect::<MovieAction, ClientDeps>::policy(&SearchEffect),
            ConcurrencyPolicy::LatestOnly
        );
        assert_eq!(
            Effect::<MovieAction, ClientDeps>::policy(&MoviesByRatingEffect),
            ConcurrencyPolicy::LatestOnly
        );
        assert_eq!(
            Effect::<MovieAction, ClientDeps>::policy(&MovieDetailsEffect),
            ConcurrencyPolicy::Serialized
        );
        assert_eq!(
            Effect::<MovieAction, ClientDeps>::policy(&AccountListEffect::new(
                AccountList::Favorite
            )),
            ConcurrencyPolicy::Concurrent
        );
    }
}
