//! Kernel module - provider traits, adapters, and dependency wiring.

pub mod deps;
pub mod test_dependencies;
pub mod traits;

pub use deps::{
    classify, ClientDeps, InMemorySession, NavigationError, TmdbAuthProvider, TmdbMovieProvider,
    TracingNavigator,
};
pub use traits::*;
