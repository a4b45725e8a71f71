//! # Logging
//! src/logging.rs
//!
//! Inicializa `tracing-subscriber` con filtro por variable de entorno
//! (`RUST_LOG`) y salida en texto o JSON.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filtro por defecto cuando `RUST_LOG` no está definido
pub const DEFAULT_FILTER: &str = "story_jobs=info";

/// Opciones de logging
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Salida JSON (una línea por evento)
    pub json: bool,

    /// Directiva de filtro si `RUST_LOG` no existe
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            json: false,
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }
}

/// Instala el subscriber global.
///
/// Retorna error si ya había uno instalado (por ejemplo en tests).
pub fn init(config: &LogConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    }
}
