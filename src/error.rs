//! # Errores del Motor de Jobs
//! src/error.rs
//!
//! Taxonomía única de errores para el ciclo de vida de jobs y la
//! reconciliación de resultados.
//!
//! Las fallas parciales (audio o ilustraciones) NO son errores: viven solo
//! en el campo `service_error` del resumen de assets.

use crate::api::StatusCode;

/// Error del crate
#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    /// Job, run directory o artefacto inexistente
    #[error("Not found: {0}")]
    NotFound(String),

    /// Ya existe un registro para ese ID
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Artefacto o registro persistido malformado
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Payload de request rechazado
    #[error("Validation failed: {0}")]
    Validation(String),

    /// La etapa primaria (texto) falló; es fatal para el job
    #[error("Stage failed: {0}")]
    StageFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoryError {
    /// Código HTTP que la capa de API debe usar para este error
    pub fn status_code(&self) -> StatusCode {
        match self {
            StoryError::NotFound(_) => StatusCode::NotFound,
            StoryError::AlreadyExists(_) => StatusCode::Conflict,
            StoryError::Validation(_) => StatusCode::BadRequest,
            StoryError::InvalidData(_)
            | StoryError::StageFailed(_)
            | StoryError::Io(_)
            | StoryError::Json(_) => StatusCode::InternalServerError,
        }
    }

    /// `true` si el error indica ausencia (job o artefacto)
    pub fn is_not_found(&self) -> bool {
        match self {
            StoryError::NotFound(_) => true,
            StoryError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoryError>;
