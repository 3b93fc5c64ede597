//! REST API surface.

pub mod error;
pub mod handlers;
pub mod rest;
pub mod types;

pub use error::{ApiError, ErrorCode};
pub use rest::{public_router, router};
