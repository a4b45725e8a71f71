//! # Handlers de la API de Cuentos
//! src/api/handlers.rs
//!
//! Contrato que debe cumplir cualquier capa de transporte:
//! - `submit`: valida, crea el job y lo ejecuta en background (202)
//! - `status`: registro del job (200 / 404)
//! - `result`: resultado reconstruido (200 / 404 / 409 / 500)
//!
//! Los errores siempre tienen la forma
//! `{"error": {"code": ..., "message": ..., "detail": ...}}`.

use crate::api::status::StatusCode;
use crate::config::Config;
use crate::error::{Result, StoryError};
use crate::generators::Generators;
use crate::jobs::{Job, JobError, JobRunner, JobStore};
use crate::request::{RequestLimits, StoryRequest};
use crate::result::{ResultAssembler, ServiceErrors};
use crate::storage::OutputLayout;
use serde_json::{json, Value};
use std::thread::JoinHandle;

/// Respuesta de un handler: código + body JSON
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// Body de error estándar
    pub fn error(status: StatusCode, code: &str, message: &str, detail: Value) -> Self {
        Self {
            status,
            body: json!({
                "error": {
                    "code": code,
                    "message": message,
                    "detail": detail,
                }
            }),
        }
    }

    /// Código de error del body, si es una respuesta de error
    pub fn error_code(&self) -> Option<&str> {
        self.body
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(Value::as_str)
    }
}

/// Fachada de la API sobre store, runner y assembler
#[derive(Clone)]
pub struct StoryApi {
    runner: JobRunner,
    limits: RequestLimits,
}

impl StoryApi {
    pub fn new(runner: JobRunner, limits: RequestLimits) -> Self {
        Self { runner, limits }
    }

    pub fn from_config(config: &Config, generators: Generators) -> Self {
        let store = JobStore::new(OutputLayout::from_config(config));
        Self::new(JobRunner::new(store, generators), config.request_limits())
    }

    pub fn store(&self) -> &JobStore {
        self.runner.store()
    }

    /// Handler de creación. El body es el JSON del request.
    ///
    /// # Ejemplo de response
    /// ```json
    /// {"id": "20260101_120000_story_mina", "status": "queued",
    ///  "status_url": "/api/stories/20260101_120000_story_mina",
    ///  "result_url": "/api/stories/20260101_120000_story_mina/result"}
    /// ```
    pub fn submit(&self, payload: Value) -> ApiResponse {
        let request: StoryRequest = match serde_json::from_value(payload) {
            Ok(request) => request,
            Err(e) => return validation_error(&e.to_string()),
        };

        match self.enqueue(request) {
            Ok((job, _handle)) => ApiResponse::json(
                StatusCode::Accepted,
                json!({
                    "id": job.id,
                    "status": job.status,
                    "status_url": format!("/api/stories/{}", job.id),
                    "result_url": format!("/api/stories/{}/result", job.id),
                }),
            ),
            Err(StoryError::Validation(reason)) => validation_error(&reason),
            Err(e) => ApiResponse::error(
                e.status_code(),
                "INTERNAL_SERVER_ERROR",
                "internal server error",
                json!({ "reason": e.to_string() }),
            ),
        }
    }

    /// Valida, crea el registro y lanza el runner.
    ///
    /// Retorna el job recién creado y el handle del hilo que lo ejecuta.
    pub fn enqueue(&self, request: StoryRequest) -> Result<(Job, JoinHandle<()>)> {
        let request = request.validate(&self.limits)?;
        let request_id = uuid::Uuid::new_v4().to_string();

        let story_id = self
            .store()
            .layout()
            .make_story_id(&request.child_name, &request.theme)?;
        let job = self.store().create(&story_id, request.clone())?;

        let handle = match self.runner.spawn(story_id.clone(), request) {
            Ok(handle) => handle,
            Err(e) => {
                // Sin hilo el job quedaría en `queued` para siempre
                let error = JobError::generation_failed(&e.to_string());
                if let Err(record_error) = self.store().mark_failed(&story_id, None, error) {
                    tracing::error!(
                        story_id = %story_id,
                        error = %record_error,
                        "Could not record spawn failure"
                    );
                }
                return Err(e.into());
            }
        };
        tracing::info!(
            request_id = %request_id,
            story_id = %story_id,
            status = %job.status,
            "story.job.queued"
        );
        Ok((job, handle))
    }

    /// Handler de estado: el registro completo del job
    pub fn status(&self, story_id: &str) -> ApiResponse {
        status_response(self.store(), story_id)
    }

    /// Handler de resultado: se reconstruye en cada llamada
    pub fn result(&self, story_id: &str) -> ApiResponse {
        result_response(self.store(), self.runner.assembler(), story_id)
    }
}

/// Estado de un job sin necesidad de runner (solo lectura)
pub fn status_response(store: &JobStore, story_id: &str) -> ApiResponse {
    match store.load(story_id) {
        Ok(job) => match serde_json::to_value(&job) {
            Ok(body) => ApiResponse::json(StatusCode::Ok, body),
            Err(e) => internal_error(story_id, &e.to_string()),
        },
        Err(e) if e.is_not_found() => story_not_found(story_id),
        Err(e) => internal_error(story_id, &e.to_string()),
    }
}

/// Resultado de un job sin necesidad de runner (solo lectura)
pub fn result_response(store: &JobStore, assembler: &ResultAssembler, story_id: &str) -> ApiResponse {
    let job = match store.load(story_id) {
        Ok(job) => job,
        Err(e) if e.is_not_found() => return story_not_found(story_id),
        Err(e) => return internal_error(story_id, &e.to_string()),
    };

    if !job.status.has_result() {
        return ApiResponse::error(
            StatusCode::Conflict,
            "STORY_NOT_READY",
            "story result is not ready",
            json!({ "id": story_id, "status": job.status }),
        );
    }

    let (include_tts, include_illustration) = job.request.feature_flags();
    let service_errors = job
        .result
        .as_ref()
        .map(|result| result.service_errors())
        .unwrap_or_else(ServiceErrors::default);

    let built = assembler.build(
        story_id,
        include_tts,
        include_illustration,
        job.status,
        &service_errors,
    );

    match built.and_then(|result| serde_json::to_value(&result).map_err(StoryError::from)) {
        Ok(body) => ApiResponse::json(StatusCode::Ok, body),
        Err(e) if e.is_not_found() => ApiResponse::error(
            StatusCode::NotFound,
            "STORY_RESULT_NOT_FOUND",
            "story result not found",
            json!({ "id": story_id }),
        ),
        Err(e) => ApiResponse::error(
            StatusCode::InternalServerError,
            "STORY_RESULT_INVALID",
            "story result is invalid",
            json!({ "id": story_id, "reason": e.to_string() }),
        ),
    }
}

fn story_not_found(story_id: &str) -> ApiResponse {
    ApiResponse::error(
        StatusCode::NotFound,
        "STORY_NOT_FOUND",
        "story not found",
        json!({ "id": story_id }),
    )
}

fn validation_error(reason: &str) -> ApiResponse {
    ApiResponse::error(
        StatusCode::BadRequest,
        "VALIDATION_ERROR",
        "request validation failed",
        json!({ "errors": [reason] }),
    )
}

fn internal_error(story_id: &str, reason: &str) -> ApiResponse {
    ApiResponse::error(
        StatusCode::InternalServerError,
        "INTERNAL_SERVER_ERROR",
        "internal server error",
        json!({ "id": story_id, "reason": reason }),
    )
}
