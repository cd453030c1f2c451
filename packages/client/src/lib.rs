// Movie Browser - Client Core
//
// Action-driven application core for a movie catalog browser backed by TMDB.
// Every user intent and every provider outcome is a `MovieAction` on the
// relay bus; triggers in `domains/*/effects.rs` do the I/O and the reducer in
// `domains/movies/state.rs` folds outcomes into `MovieState`.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod routes;

pub use config::Config;
pub use domains::movies::{ActionTag, Collection, MovieAction, MovieReducer, MovieState};
pub use kernel::ClientDeps;
pub use routes::Route;

use relay::{EngineBuilder, EngineHandle};

/// Running client: the relay engine with every trigger and the movie reducer.
pub type ClientHandle = EngineHandle<MovieAction, MovieState>;

/// Assemble the engine with every movie and auth trigger registered.
pub fn engine_builder(deps: ClientDeps) -> EngineBuilder<MovieAction, ClientDeps, MovieReducer> {
    let builder = EngineBuilder::new(deps).with_classifier(kernel::classify);
    let builder = domains::movies::effects::register(builder);
    let builder = domains::auth::effects::register(builder);
    builder.with_reducer(MovieReducer, MovieState::default())
}

/// Build and start the client engine.
pub fn start(deps: ClientDeps, config: &Config) -> ClientHandle {
    engine_builder(deps)
        .with_settle_timeout(config.settle_timeout)
        .build()
        .start()
}
