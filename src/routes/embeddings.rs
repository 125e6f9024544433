//! Embeddings endpoint
//!
//! The vendor has no embedding model; the route exists so clients get a
//! clear error instead of a 404.

use crate::error::{AppError, AppResult};

pub async fn embeddings() -> AppResult<()> {
    Err(AppError::BadRequest(
        "Embeddings are not supported by this server".to_string(),
    ))
}
