//! HTTP front end for the emotion detection pipeline.
//!
//! - `GET /` and `GET /health` report which models are loaded
//! - `POST /predict` classifies the first face in a base64 image
//! - every route answers CORS preflight

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
