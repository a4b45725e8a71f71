//! # Documento de Resultado
//! src/result/types.rs
//!
//! Vista de lectura de un job. Nunca se persiste como registro propio:
//! se recalcula en cada lectura desde el job, el artefacto primario, los
//! manifests y el filesystem.

use crate::assets::AssetStatus;
use crate::jobs::JobStatus;
use serde::{Deserialize, Serialize};

/// Resumen agregado de un subsistema (tts o ilustraciones)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub enabled: bool,
    pub total_tasks: u32,
    pub generated: u32,
    pub skipped: u32,
    pub failed: u32,
    pub manifest_url: Option<String>,
    /// Falla de la etapa completa (falla parcial del job)
    pub service_error: Option<String>,
}

impl AssetSummary {
    /// Resumen de un subsistema deshabilitado: cero tareas, nunca fallido
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            total_tasks: 0,
            generated: 0,
            skipped: 0,
            failed: 0,
            manifest_url: None,
            service_error: None,
        }
    }

    /// `true` si este subsistema aporta a `has_partial_failures`
    pub fn has_failures(&self) -> bool {
        self.enabled && (self.failed > 0 || self.service_error.is_some())
    }
}

/// Bloque `assets` del resultado
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetsSummary {
    pub tts: AssetSummary,
    pub illustrations: AssetSummary,
    pub has_partial_failures: bool,
}

impl AssetsSummary {
    pub fn new(tts: AssetSummary, illustrations: AssetSummary) -> Self {
        let has_partial_failures = tts.has_failures() || illustrations.has_failures();
        Self {
            tts,
            illustrations,
            has_partial_failures,
        }
    }
}

/// Errores a nivel de etapa que se arrastran al resultado
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceErrors {
    pub tts: Option<String>,
    pub illustrations: Option<String>,
}

/// Metadatos del cuento
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMeta {
    pub title_primary: String,
    pub title_secondary: String,
    pub primary_language: String,
    pub secondary_language: String,
    pub page_count: usize,
}

/// Vista de una página con el estado de cada asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageView {
    pub page_number: u32,
    pub text_primary: String,
    pub text_secondary: String,
    pub audio_primary_url: Option<String>,
    pub audio_secondary_url: Option<String>,
    pub illustration_url: Option<String>,
    pub audio_primary_status: AssetStatus,
    pub audio_primary_error: Option<String>,
    pub audio_secondary_status: AssetStatus,
    pub audio_secondary_error: Option<String>,
    pub illustration_status: AssetStatus,
    pub illustration_error: Option<String>,
    pub illustration_prompt: String,
    pub illustration_scene_prompt: String,
    pub has_primary_audio: bool,
    pub has_secondary_audio: bool,
    pub has_illustration: bool,
}

/// Documento de resultado completo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryResult {
    pub id: String,
    pub status: JobStatus,
    pub story_json_url: Option<String>,
    pub assets: AssetsSummary,
    pub meta: ResultMeta,
    pub pages: Vec<PageView>,
}
