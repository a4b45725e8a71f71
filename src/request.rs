//! # Request de Generación
//! src/request.rs
//!
//! Payload que envía el cliente para producir un cuento. Se guarda tal
//! cual (ya validado) en el registro del job para auditoría y replay.

use crate::config::{
    DEFAULT_ILLUSTRATION_MODEL, DEFAULT_LANGUAGES, DEFAULT_STORY_MODEL, DEFAULT_TTS_MODEL,
};
use crate::error::{Result, StoryError};
use serde::{Deserialize, Serialize};

/// Opciones de generación por etapa
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub story_model: String,
    pub enable_tts: bool,
    pub tts_model: String,
    pub tts_voice: String,
    pub tts_temperature: f64,
    pub tts_request_interval_sec: f64,
    pub enable_illustration: bool,
    pub illustration_model: String,
    pub illustration_aspect_ratio: String,
    pub illustration_request_interval_sec: f64,
    pub illustration_skip_existing: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            story_model: DEFAULT_STORY_MODEL.to_string(),
            enable_tts: false,
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            tts_voice: "Achernar".to_string(),
            tts_temperature: 1.0,
            tts_request_interval_sec: 10.0,
            enable_illustration: false,
            illustration_model: DEFAULT_ILLUSTRATION_MODEL.to_string(),
            illustration_aspect_ratio: "16:9".to_string(),
            illustration_request_interval_sec: 1.0,
            illustration_skip_existing: true,
        }
    }
}

/// Request para crear un cuento
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRequest {
    pub child_name: String,
    #[serde(default)]
    pub child_age: Option<u32>,
    pub primary_lang: String,
    pub secondary_lang: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub extra_prompt: String,
    #[serde(default)]
    pub include_style_guide: bool,
    #[serde(default)]
    pub generation: GenerationOptions,
}

/// Par de idiomas del cuento (primario, secundario)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    pub primary: String,
    pub secondary: String,
}

impl StoryRequest {
    /// Flags de las dos etapas opcionales: (tts, ilustraciones)
    pub fn feature_flags(&self) -> (bool, bool) {
        (self.generation.enable_tts, self.generation.enable_illustration)
    }

    pub fn language_pair(&self) -> LanguagePair {
        LanguagePair {
            primary: self.primary_lang.clone(),
            secondary: self.secondary_lang.clone(),
        }
    }

    /// Normaliza y valida el request contra los límites configurados.
    ///
    /// Retorna una copia normalizada: strings recortados e idiomas con
    /// la capitalización canónica de la lista permitida.
    pub fn validate(&self, limits: &RequestLimits) -> Result<StoryRequest> {
        let mut request = self.clone();

        request.child_name = request.child_name.trim().to_string();
        if request.child_name.is_empty() {
            return Err(StoryError::Validation("child_name must not be empty".to_string()));
        }
        check_len("child_name", &request.child_name, limits.child_name_max_len)?;

        request.theme = request.theme.trim().to_string();
        check_len("theme", &request.theme, limits.theme_max_len)?;

        request.extra_prompt = request.extra_prompt.trim().to_string();
        check_len("extra_prompt", &request.extra_prompt, limits.extra_prompt_max_len)?;

        request.primary_lang = canonical_language(&request.primary_lang, limits)?;
        request.secondary_lang = canonical_language(&request.secondary_lang, limits)?;

        let generation = &mut request.generation;
        generation.story_model =
            check_allowed("story_model", &generation.story_model, &limits.allowed_story_models)?;
        generation.tts_model =
            check_allowed("tts_model", &generation.tts_model, &limits.allowed_tts_models)?;
        generation.illustration_model = check_allowed(
            "illustration_model",
            &generation.illustration_model,
            &limits.allowed_illustration_models,
        )?;

        Ok(request)
    }
}

/// Límites de validación (derivados de la configuración)
#[derive(Debug, Clone)]
pub struct RequestLimits {
    pub child_name_max_len: usize,
    pub theme_max_len: usize,
    pub extra_prompt_max_len: usize,
    pub allowed_languages: Vec<String>,
    pub allowed_story_models: Vec<String>,
    pub allowed_tts_models: Vec<String>,
    pub allowed_illustration_models: Vec<String>,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            child_name_max_len: 40,
            theme_max_len: 120,
            extra_prompt_max_len: 500,
            allowed_languages: DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            allowed_story_models: vec![DEFAULT_STORY_MODEL.to_string()],
            allowed_tts_models: vec![DEFAULT_TTS_MODEL.to_string()],
            allowed_illustration_models: vec![DEFAULT_ILLUSTRATION_MODEL.to_string()],
        }
    }
}

fn check_len(field: &str, value: &str, max_len: usize) -> Result<()> {
    if value.chars().count() > max_len {
        return Err(StoryError::Validation(format!(
            "{} must be <= {} characters",
            field, max_len
        )));
    }
    Ok(())
}

fn canonical_language(value: &str, limits: &RequestLimits) -> Result<String> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(StoryError::Validation("language must not be empty".to_string()));
    }
    limits
        .allowed_languages
        .iter()
        .find(|allowed| allowed.to_lowercase() == normalized.to_lowercase())
        .cloned()
        .ok_or_else(|| {
            StoryError::Validation(format!(
                "language must be one of {:?}",
                limits.allowed_languages
            ))
        })
}

fn check_allowed(field: &str, value: &str, allowed: &[String]) -> Result<String> {
    let normalized = value.trim();
    if allowed.iter().any(|a| a == normalized) {
        Ok(normalized.to_string())
    } else {
        Err(StoryError::Validation(format!(
            "{} must be one of {:?}",
            field, allowed
        )))
    }
}
