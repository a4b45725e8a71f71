//! # Tipos y Estructuras para el Sistema de Jobs
//! src/jobs/types.rs
//!
//! Define el registro de ciclo de vida de un job y sus estados.

use crate::assets::SubsystemManifest;
use crate::request::StoryRequest;
use crate::result::{AssetsSummary, ServiceErrors, StoryResult};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Código de error cuando falla la etapa primaria
pub const GENERATION_FAILED: &str = "GENERATION_FAILED";

/// Estado de un job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job creado, esperando ejecución
    Queued,

    /// Job ejecutándose actualmente
    Running,

    /// Job completado (puede tener fallas parciales)
    Completed,

    /// La etapa primaria falló
    Failed,

    /// Cancelado por acción administrativa externa
    Canceled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
        }
    }

    /// Estados para los que existe un documento de resultado
    pub fn has_result(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error terminal de un job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub code: String,
    pub message: String,
    pub detail: Option<serde_json::Value>,
}

impl JobError {
    /// Falla de la generación primaria
    pub fn generation_failed(reason: &str) -> Self {
        Self {
            code: GENERATION_FAILED.to_string(),
            message: "story generation job failed".to_string(),
            detail: Some(serde_json::json!({ "reason": reason })),
        }
    }
}

/// Manifests devueltos por los generadores opcionales
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawServiceResults {
    pub tts: Option<SubsystemManifest>,
    pub illustrations: Option<SubsystemManifest>,
}

/// Resumen guardado en el registro al llegar a un estado terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub story_json_url: Option<String>,
    pub page_count: usize,
    pub assets: AssetsSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_service_results: Option<RawServiceResults>,
}

impl JobResult {
    /// Resumen a guardar a partir del documento reconstruido
    pub fn from_result(result: &StoryResult, raw: Option<RawServiceResults>) -> Self {
        Self {
            story_json_url: result.story_json_url.clone(),
            page_count: result.meta.page_count,
            assets: result.assets.clone(),
            raw_service_results: raw,
        }
    }

    /// Errores de etapa registrados, para reconstruir el resultado
    pub fn service_errors(&self) -> ServiceErrors {
        ServiceErrors {
            tts: self.assets.tts.service_error.clone(),
            illustrations: self.assets.illustrations.service_error.clone(),
        }
    }
}

/// Registro persistido de un job (`meta.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// ID del job; también es el nombre del run directory
    pub id: String,

    pub status: JobStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Request original validado
    pub request: StoryRequest,

    pub result: Option<JobResult>,

    pub error: Option<JobError>,
}

impl Job {
    /// Crea un job nuevo en estado `queued`
    pub fn new(id: String, request: StoryRequest) -> Self {
        let now = now();
        Self {
            id,
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
            request,
            result: None,
            error: None,
        }
    }

    /// Aplica una transición.
    ///
    /// El resultado solo se reemplaza si viene uno nuevo. El error se guarda
    /// si viene; si no, se limpia salvo que el nuevo estado sea `failed`.
    pub fn apply_transition(
        &mut self,
        status: JobStatus,
        result: Option<JobResult>,
        error: Option<JobError>,
    ) {
        self.status = status;
        self.updated_at = now();
        if let Some(result) = result {
            self.result = Some(result);
        }
        match error {
            Some(error) => self.error = Some(error),
            None if status != JobStatus::Failed => self.error = None,
            None => {}
        }
    }
}

/// Timestamp actual con precisión de segundos
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}
