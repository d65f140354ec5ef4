//! HTTP surface for remote mood classification.
//!
//! Two JSON endpoints: `/api/analyze` forwards a captured face to a
//! vision model and `/api/feedback` acknowledges user corrections.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
