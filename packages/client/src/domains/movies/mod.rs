//! Movies domain - catalog listings, details, account lists, search, genres
//!
//! Architecture:
//!   route entry / UI → dispatch(MovieAction) → trigger → provider → follow-up MovieAction → MovieReducer

pub mod actions;
pub mod effects;
pub mod state;

pub use actions::{ActionTag, MovieAction};
pub use state::{AuthState, Collection, GenreCatalog, MovieReducer, MovieState, SearchState, SelectedMovie};
