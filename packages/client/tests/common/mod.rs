// Common test utilities

use client_core::kernel::test_dependencies::{
    MockAuthProvider, MockMovieProvider, RecordingNavigator, RecordingSession, TestDependencies,
};
use client_core::{engine_builder, ClientHandle, MovieAction, MovieState};
use relay::testing::ActionRecorder;
use std::sync::Arc;
use std::time::Duration;

pub use client_core::kernel::test_dependencies::{movie, movie_details};

/// A started client wired to mocks, plus a recorder of every action.
pub struct TestClient {
    pub handle: ClientHandle,
    pub movies: Arc<MockMovieProvider>,
    pub auth: Arc<MockAuthProvider>,
    pub session: Arc<RecordingSession>,
    pub navigator: Arc<RecordingNavigator>,
    pub recorder: ActionRecorder<MovieAction>,
}

pub struct TestClientBuilder {
    movies: MockMovieProvider,
    auth: MockAuthProvider,
    session: RecordingSession,
    navigator: RecordingNavigator,
}

impl TestClientBuilder {
    pub fn movies(mut self, movies: MockMovieProvider) -> Self {
        self.movies = movies;
        self
    }

    pub fn auth(mut self, auth: MockAuthProvider) -> Self {
        self.auth = auth;
        self
    }

    pub fn session(mut self, session: RecordingSession) -> Self {
        self.session = session;
        self
    }

    pub fn navigator(mut self, navigator: RecordingNavigator) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn start(self) -> TestClient {
        let movies = Arc::new(self.movies);
        let auth = Arc::new(self.auth);
        let session = Arc::new(self.session);
        let navigator = Arc::new(self.navigator);

        let deps = TestDependencies::new()
            .movies(movies.clone())
            .auth(auth.clone())
            .session(session.clone())
            .navigator(navigator.clone())
            .build();

        let handle = engine_builder(deps)
            .with_settle_timeout(Duration::from_secs(5))
            .build()
            .start();
        let recorder = ActionRecorder::new(handle.bus());

        TestClient {
            handle,
            movies,
            auth,
            session,
            navigator,
            recorder,
        }
    }
}

impl TestClient {
    pub fn builder() -> TestClientBuilder {
        TestClientBuilder {
            movies: MockMovieProvider::new(),
            auth: MockAuthProvider::new(),
            session: RecordingSession::new(),
            navigator: RecordingNavigator::new(),
        }
    }

    pub fn with_movies(movies: MockMovieProvider) -> TestClient {
        Self::builder().movies(movies).start()
    }

    /// Publish and wait until every consequence has landed in state.
    pub async fn run(&self, action: MovieAction) -> MovieState {
        self.handle
            .dispatch_and_settle(action)
            .await
            .expect("client should settle")
    }

    pub async fn settle(&self) -> MovieState {
        self.handle.settle().await.expect("client should settle")
    }
}
