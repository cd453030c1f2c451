//! Integration tests for login and the account lists.
//!
//! Covers:
//! - The token → validation → session pipeline and its short-circuit
//! - Redirect and prompt closing after login
//! - Favourites and watch-list membership with reload chaining

mod common;

use client_core::kernel::test_dependencies::{
    MockAuthProvider, MockMovieProvider, RecordingNavigator, RecordingSession,
};
use client_core::{ActionTag, MovieAction};
use common::{movie, TestClient};
use relay::testing::Gate;
use relay::{Action, FailureKind};
use tmdb::AccountList;

fn login(redirect_url: Option<&str>) -> MovieAction {
    MovieAction::Login {
        username: "johnny".into(),
        password: "test123".into(),
        redirect_url: redirect_url.map(String::from),
    }
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn login_captures_session_redirects_and_closes_prompt() {
    let mut client = TestClient::builder()
        .auth(MockAuthProvider::new().with_session_id("79191836ddaa"))
        .start();

    client.run(MovieAction::OpenLoginPrompt).await;
    let state = client.run(login(Some("/favourites"))).await;

    assert_eq!(client.session.writes(), vec!["79191836ddaa".to_string()]);
    assert_eq!(client.navigator.visited(), vec!["/favourites".to_string()]);
    assert_eq!(
        client.recorder.tags(),
        vec![
            ActionTag::OpenLoginPrompt,
            ActionTag::Login,
            ActionTag::LoginSuccess,
            ActionTag::CloseLoginPrompt,
        ]
    );

    let success = client
        .recorder
        .actions()
        .into_iter()
        .find(|a| a.tag() == ActionTag::LoginSuccess);
    assert_eq!(
        success,
        Some(MovieAction::LoginSuccess {
            session_id: "79191836ddaa".into(),
            redirect_url: Some("/favourites".into()),
        })
    );

    assert_eq!(state.auth.session_id.as_deref(), Some("79191836ddaa"));
    assert!(!state.auth.login_prompt_open);
    assert!(!state.auth.logging_in);
}

#[tokio::test]
async fn redirect_happens_after_login_success() {
    let gate = Gate::new();
    let mut client = TestClient::builder()
        .navigator(RecordingNavigator::new().with_gate(gate.clone()))
        .start();

    client.handle.dispatch(login(Some("/watch-list")));
    gate.wait_arrivals(1).await;

    // Navigation has started: the success is already out, the close is not.
    assert_eq!(
        client.recorder.tags(),
        vec![ActionTag::Login, ActionTag::LoginSuccess]
    );

    gate.open();
    let state = client.settle().await;

    assert_eq!(client.navigator.visited(), vec!["/watch-list".to_string()]);
    assert_eq!(
        client.recorder.tags(),
        vec![
            ActionTag::Login,
            ActionTag::LoginSuccess,
            ActionTag::CloseLoginPrompt,
        ]
    );
    assert!(state.auth.is_logged_in());
}

#[tokio::test]
async fn rejected_credentials_fail_once_without_side_effects() {
    let mut client = TestClient::builder()
        .auth(MockAuthProvider::new().failing_validation(
            "Invalid username and/or password: You did not provide a valid login.",
        ))
        .start();

    client.run(MovieAction::OpenLoginPrompt).await;
    let state = client.run(login(Some("/favourites"))).await;

    assert_eq!(client.recorder.count(ActionTag::LoginFailure), 1);
    assert_eq!(client.recorder.count(ActionTag::LoginSuccess), 0);
    assert_eq!(client.recorder.count(ActionTag::CloseLoginPrompt), 0);
    assert!(client.session.writes().is_empty());
    assert!(client.navigator.visited().is_empty());
    assert_eq!(
        client.auth.calls(),
        vec!["request_token", "validate_with_login"]
    );

    let error = state.auth.error.clone().expect("login should have failed");
    assert_eq!(error.kind, FailureKind::Unauthorized);
    assert_eq!(
        error.message,
        "Invalid username and/or password: You did not provide a valid login."
    );
    assert!(state.auth.login_prompt_open);
    assert!(!state.auth.is_logged_in());
}

#[tokio::test]
async fn failed_session_exchange_never_captures() {
    let client = TestClient::builder()
        .auth(MockAuthProvider::new().failing_session("Session denied."))
        .start();

    let state = client.run(login(None)).await;

    assert_eq!(
        client.auth.calls(),
        vec!["request_token", "validate_with_login", "create_session"]
    );
    assert!(client.session.writes().is_empty());
    assert_eq!(
        state.auth.error.map(|e| e.message),
        Some("Session denied.".to_string())
    );
}

#[tokio::test]
async fn login_without_redirect_still_closes_prompt() {
    let mut client = TestClient::builder().start();

    client.run(MovieAction::OpenLoginPrompt).await;
    let state = client.run(login(None)).await;

    assert!(client.navigator.visited().is_empty());
    assert_eq!(client.recorder.count(ActionTag::CloseLoginPrompt), 1);
    assert!(!state.auth.login_prompt_open);
}

#[tokio::test]
async fn failed_redirect_still_closes_prompt() {
    let mut client = TestClient::builder()
        .navigator(RecordingNavigator::new().rejecting("/nowhere"))
        .start();

    client.run(MovieAction::OpenLoginPrompt).await;
    let state = client.run(login(Some("/nowhere"))).await;

    assert!(client.navigator.visited().is_empty());
    assert_eq!(client.recorder.count(ActionTag::CloseLoginPrompt), 1);
    assert!(!state.auth.login_prompt_open);
    assert!(state.auth.is_logged_in());
}

// ============================================================================
// Membership
// ============================================================================

#[tokio::test]
async fn adding_a_favourite_updates_then_reloads() {
    let mut client = TestClient::builder()
        .session(RecordingSession::logged_in("79191836ddaa"))
        .start();

    let state = client
        .run(MovieAction::SetMovieToFavourites { movie_id: 42 })
        .await;

    assert_eq!(
        client.movies.list_updates(),
        vec![(AccountList::Favorite, 42, true)]
    );
    assert_eq!(
        client.recorder.tags(),
        vec![
            ActionTag::SetMovieToFavourites,
            ActionTag::LoadFavouriteMovies,
            ActionTag::LoadFavouriteMoviesSuccess,
        ]
    );
    let ids: Vec<_> = state.favourites.movies.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![42]);
}

#[tokio::test]
async fn removing_from_watch_list_reloads_without_it() {
    let client = TestClient::builder()
        .movies(
            MockMovieProvider::new()
                .with_list(AccountList::Watchlist, vec![movie(7, "Se7en"), movie(8, "8MM")]),
        )
        .start();

    let state = client.run(MovieAction::LoadWatchListMovies).await;
    assert_eq!(state.watch_list.movies.len(), 2);

    let state = client
        .run(MovieAction::RemoveMovieFromWatchList { movie_id: 7 })
        .await;

    assert_eq!(
        client.movies.list_updates(),
        vec![(AccountList::Watchlist, 7, false)]
    );
    let ids: Vec<_> = state.watch_list.movies.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![8]);
}

#[tokio::test]
async fn failed_update_reports_list_failure_without_reload() {
    let mut client = TestClient::with_movies(MockMovieProvider::new().with_failure(
        "update_list:favorite",
        401,
        "Authentication failed: You do not have permissions to access the service.",
    ));

    let state = client
        .run(MovieAction::SetMovieToFavourites { movie_id: 42 })
        .await;

    assert_eq!(
        client.recorder.tags(),
        vec![
            ActionTag::SetMovieToFavourites,
            ActionTag::LoadFavouriteMoviesFailure,
        ]
    );
    assert_eq!(client.movies.call_count("list_movies"), 0);
    assert_eq!(
        state.favourites.error.map(|e| e.kind),
        Some(FailureKind::Unauthorized)
    );
}

#[tokio::test]
async fn overlapping_updates_converge() {
    let mut client = TestClient::with_movies(MockMovieProvider::new());

    client
        .handle
        .dispatch(MovieAction::SetMovieToFavourites { movie_id: 1 });
    client
        .handle
        .dispatch(MovieAction::SetMovieToFavourites { movie_id: 2 });
    client.settle().await;

    assert_eq!(client.recorder.count(ActionTag::LoadFavouriteMovies), 2);
    assert_eq!(client.recorder.count(ActionTag::LoadFavouriteMoviesSuccess), 2);

    // Reloads run concurrently, so the final snapshot may hold either one.
    // The reload caused by whichever update finished last sees both.
    let reloads: Vec<Vec<u64>> = client
        .recorder
        .actions()
        .into_iter()
        .filter_map(|a| match a {
            MovieAction::LoadFavouriteMoviesSuccess { movies } => {
                let mut ids: Vec<_> = movies.iter().map(|m| m.id).collect();
                ids.sort();
                Some(ids)
            }
            _ => None,
        })
        .collect();
    assert!(reloads.contains(&vec![1, 2]));
    assert!(reloads.iter().all(|ids| ids == &vec![1, 2] || ids.len() == 1));
}

#[tokio::test]
async fn lists_are_independent() {
    let client = TestClient::builder()
        .movies(
            MockMovieProvider::new()
                .with_list(AccountList::Favorite, vec![movie(1, "Heat")])
                .with_list(AccountList::Watchlist, vec![movie(2, "Ronin")]),
        )
        .start();

    let state = client
        .run(MovieAction::SetMovieToWatchList { movie_id: 3 })
        .await;

    assert!(state.favourites.movies.is_empty());
    let mut ids: Vec<_> = state.watch_list.movies.iter().map(|m| m.id).collect();
    ids.sort();
    assert_eq!(ids, vec![2, 3]);
}
