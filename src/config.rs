//! # Configuración del Motor de Jobs
//! src/config.rs
//!
//! Configuración con soporte para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./story_jobs --outputs-dir ./outputs \
//!   --static-prefix /static/outputs \
//!   status 20260101_120000_story_mina
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! STORY_OUTPUTS_DIR=/srv/outputs STORY_LOG_JSON=true ./story_jobs result <id>
//! ```

use crate::logging::LogConfig;
use crate::request::RequestLimits;
use clap::Args;
use std::path::PathBuf;

/// Idiomas aceptados por defecto
pub const DEFAULT_LANGUAGES: &[&str] = &[
    "Korean", "English", "Japanese", "Chinese", "Spanish", "French", "German",
];

pub const DEFAULT_STORY_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_ILLUSTRATION_MODEL: &str = "gemini-2.5-flash-image";

/// Configuración del motor de jobs
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Directorio raíz donde vive un run directory por job
    #[arg(long = "outputs-dir", default_value = "./outputs", env = "STORY_OUTPUTS_DIR")]
    pub outputs_dir: PathBuf,

    /// Prefijo de URL bajo el que se sirven los archivos de outputs
    #[arg(long = "static-prefix", default_value = "/static/outputs", env = "STORY_STATIC_PREFIX")]
    pub static_outputs_prefix: String,

    // === Límites del request ===

    /// Largo máximo de child_name
    #[arg(long = "child-name-max-len", default_value = "40", env = "STORY_CHILD_NAME_MAX_LEN")]
    pub child_name_max_len: usize,

    /// Largo máximo de theme
    #[arg(long = "theme-max-len", default_value = "120", env = "STORY_THEME_MAX_LEN")]
    pub theme_max_len: usize,

    /// Largo máximo de extra_prompt
    #[arg(long = "extra-prompt-max-len", default_value = "500", env = "STORY_EXTRA_PROMPT_MAX_LEN")]
    pub extra_prompt_max_len: usize,

    /// Idiomas permitidos (separados por coma)
    #[arg(
        long = "languages",
        value_delimiter = ',',
        default_value = "Korean,English,Japanese,Chinese,Spanish,French,German",
        env = "STORY_ALLOWED_LANGUAGES"
    )]
    pub allowed_languages: Vec<String>,

    /// Modelos de texto permitidos
    #[arg(long = "story-models", value_delimiter = ',', default_value = DEFAULT_STORY_MODEL, env = "STORY_ALLOWED_STORY_MODELS")]
    pub allowed_story_models: Vec<String>,

    /// Modelos de TTS permitidos
    #[arg(long = "tts-models", value_delimiter = ',', default_value = DEFAULT_TTS_MODEL, env = "STORY_ALLOWED_TTS_MODELS")]
    pub allowed_tts_models: Vec<String>,

    /// Modelos de ilustración permitidos
    #[arg(long = "illustration-models", value_delimiter = ',', default_value = DEFAULT_ILLUSTRATION_MODEL, env = "STORY_ALLOWED_ILLUSTRATION_MODELS")]
    pub allowed_illustration_models: Vec<String>,

    // === Logging ===

    /// Emitir logs en formato JSON
    #[arg(long = "log-json", default_value_t = false, env = "STORY_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.outputs_dir.as_os_str().is_empty() {
            return Err("Outputs dir must not be empty".to_string());
        }
        if !self.static_outputs_prefix.starts_with('/') {
            return Err("Static prefix must start with '/'".to_string());
        }

        if self.child_name_max_len == 0 {
            return Err("Child name max length must be >= 1".to_string());
        }
        if self.theme_max_len == 0 {
            return Err("Theme max length must be >= 1".to_string());
        }
        if self.extra_prompt_max_len == 0 {
            return Err("Extra prompt max length must be >= 1".to_string());
        }

        if self.allowed_languages.iter().all(|l| l.trim().is_empty()) {
            return Err("At least one language must be allowed".to_string());
        }
        if self.allowed_story_models.is_empty() {
            return Err("At least one story model must be allowed".to_string());
        }

        Ok(())
    }

    /// Límites derivados para validar requests
    pub fn request_limits(&self) -> RequestLimits {
        RequestLimits {
            child_name_max_len: self.child_name_max_len,
            theme_max_len: self.theme_max_len,
            extra_prompt_max_len: self.extra_prompt_max_len,
            allowed_languages: clean_list(&self.allowed_languages),
            allowed_story_models: clean_list(&self.allowed_story_models),
            allowed_tts_models: clean_list(&self.allowed_tts_models),
            allowed_illustration_models: clean_list(&self.allowed_illustration_models),
        }
    }

    /// Configuración de logging
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            json: self.log_json,
            ..LogConfig::default()
        }
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("Story jobs configuration");
        println!("   Outputs dir:  {}", self.outputs_dir.display());
        println!("   Static URL:   {}", self.static_outputs_prefix);
        println!("   Languages:    {}", self.allowed_languages.join(", "));
        println!(
            "   Limits:       name={} theme={} extra_prompt={}",
            self.child_name_max_len, self.theme_max_len, self.extra_prompt_max_len
        );
        println!("   Log format:   {}", if self.log_json { "json" } else { "text" });
    }
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            outputs_dir: PathBuf::from("./outputs"),
            static_outputs_prefix: "/static/outputs".to_string(),
            child_name_max_len: 40,
            theme_max_len: 120,
            extra_prompt_max_len: 500,
            allowed_languages: DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            allowed_story_models: vec![DEFAULT_STORY_MODEL.to_string()],
            allowed_tts_models: vec![DEFAULT_TTS_MODEL.to_string()],
            allowed_illustration_models: vec![DEFAULT_ILLUSTRATION_MODEL.to_string()],
            log_json: false,
        }
    }
}
