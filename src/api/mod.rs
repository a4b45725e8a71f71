//! # Capa de API
//! src/api/mod.rs
//!
//! Mapeo del motor de jobs al contrato HTTP:
//!
//! - `POST /api/stories` → [`StoryApi::submit`]
//! - `GET /api/stories/<id>` → [`StoryApi::status`]
//! - `GET /api/stories/<id>/result` → [`StoryApi::result`]

pub mod handlers;
pub mod status;

pub use handlers::{result_response, status_response, ApiResponse, StoryApi};
pub use status::StatusCode;
