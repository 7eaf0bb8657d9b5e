//! Web server module
//!
//! Provides the JSON API and serves the map front-end.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
