//! # Manifests de Subsistemas
//! src/assets/manifest.rs
//!
//! Cada etapa opcional (audio, ilustraciones) escribe un `manifest.json`
//! en su subdirectorio del run directory:
//!
//! ```json
//! {
//!   "total_tasks": 48, "generated": 46, "skipped": 1, "failed": 1,
//!   "entries": [
//!     {"page_number": 1, "role": "primary", "status": "generated", "path": "..."},
//!     {"page_number": 1, "role": "secondary", "status": "failed", "error": "quota"}
//!   ]
//! }
//! ```
//!
//! La lectura es tolerante: el archivo puede estar a medio escribir si la
//! etapa murió, así que nada aquí propaga errores de formato.

use crate::assets::status::AssetStatus;
use crate::storage::{self, MANIFEST_FILE_NAME};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Entrada por tarea de un manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(default = "invalid_page", deserialize_with = "lenient_int")]
    pub page_number: i64,

    /// `primary` / `secondary` (solo audio)
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default = "missing_status")]
    pub status: AssetStatus,

    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Ruta declarada por el generador (ilustraciones)
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ManifestEntry {
    pub fn new(page_number: u32, status: AssetStatus) -> Self {
        Self {
            page_number: i64::from(page_number),
            role: None,
            language: None,
            status,
            error: None,
            path: None,
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    /// Número de página válido (>= 1)
    pub fn page(&self) -> Option<u32> {
        if self.page_number < 1 {
            return None;
        }
        u32::try_from(self.page_number).ok()
    }
}

/// Contadores agregados que escribe la propia etapa
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestCounts {
    pub total_tasks: u32,
    pub generated: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// Manifest de un subsistema (audio o ilustraciones)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsystemManifest {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_tasks: u32,

    #[serde(default, deserialize_with = "lenient_count")]
    pub generated: u32,

    #[serde(default, deserialize_with = "lenient_count")]
    pub skipped: u32,

    #[serde(default, deserialize_with = "lenient_count")]
    pub failed: u32,

    #[serde(default, deserialize_with = "lenient_entries")]
    pub entries: Vec<ManifestEntry>,

    /// Metadatos propios del generador (modelo, idiomas, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl SubsystemManifest {
    /// Construye un manifest contando los estados de las entradas
    pub fn from_entries(entries: Vec<ManifestEntry>) -> Self {
        let mut manifest = Self {
            total_tasks: entries.len() as u32,
            ..Self::default()
        };
        for entry in &entries {
            match entry.status {
                AssetStatus::Generated => manifest.generated += 1,
                s if s.is_skipped() => manifest.skipped += 1,
                s if s.counts_as_failed() => manifest.failed += 1,
                _ => {}
            }
        }
        manifest.entries = entries;
        manifest
    }

    pub fn counts(&self) -> ManifestCounts {
        ManifestCounts {
            total_tasks: self.total_tasks,
            generated: self.generated,
            skipped: self.skipped,
            failed: self.failed,
        }
    }

    /// Escribe `dir/manifest.json` de forma atómica
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(MANIFEST_FILE_NAME);
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        storage::write_atomic(&path, &bytes)?;
        Ok(path)
    }
}

/// Resultado de buscar el manifest de un subsistema
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    /// Ruta del archivo (existe aunque no se haya podido parsear)
    pub path: PathBuf,

    /// `None` si el archivo está corrupto o incompleto
    pub manifest: Option<SubsystemManifest>,
}

/// Carga `dir/manifest.json`.
///
/// `None` si el archivo no existe. Un archivo ilegible se reporta con
/// `manifest: None` y se trata como ausente.
pub fn load_manifest(dir: &Path) -> Option<LoadedManifest> {
    let path = dir.join(MANIFEST_FILE_NAME);
    if !path.is_file() {
        return None;
    }

    let parsed = fs::read(&path)
        .map_err(|e| e.to_string())
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).map_err(|e| e.to_string()))
        .and_then(|value| {
            if value.is_object() {
                serde_json::from_value::<SubsystemManifest>(value).map_err(|e| e.to_string())
            } else {
                Err("manifest is not a JSON object".to_string())
            }
        });

    let manifest = match parsed {
        Ok(manifest) => Some(manifest),
        Err(reason) => {
            tracing::warn!(path = %path.display(), %reason, "Ignoring unreadable manifest");
            None
        }
    };

    Some(LoadedManifest { path, manifest })
}

fn invalid_page() -> i64 {
    -1
}

fn missing_status() -> AssetStatus {
    AssetStatus::Missing
}

/// Entero desde número o string numérico; cualquier otra cosa es -1
fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_int(&value).unwrap_or(-1))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_int(&value)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0))
}

fn value_as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Strings recortados; vacíos y null se vuelven `None`
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let text = match value {
        Value::Null => return Ok(None),
        Value::String(s) => s,
        other => other.to_string(),
    };
    let trimmed = text.trim();
    Ok(if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    })
}

/// Descarta entradas que no son objetos en vez de fallar todo el manifest
fn lenient_entries<'de, D>(deserializer: D) -> Result<Vec<ManifestEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}
