//! Web layer.
//!
//! Exposes the cached weather client and the marker writer as plain REST
//! endpoints. Successful reads are JSON; errors are plain text.

mod error;
mod routes;
mod state;

pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
