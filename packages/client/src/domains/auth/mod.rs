//! Auth domain - request-token login against TMDB
//!
//! Responsibilities:
//! - Token → validated token → session pipeline
//! - Capturing the session id for account-list calls
//! - Redirecting and closing the login prompt once logged in

pub mod effects;

pub use effects::{ClosePromptAfterLogin, LoggedIn, LoginEffect};
