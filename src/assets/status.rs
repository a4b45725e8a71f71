//! # Estado de un Asset
//! src/assets/status.rs
//!
//! Enumeración cerrada del estado de cada sub-asset (audio o ilustración)
//! de una página.

use serde::{Deserialize, Deserializer, Serialize};

/// Estado de un asset individual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    /// El subsistema no fue habilitado para el job
    NotRequested,

    /// Archivo generado en este run
    Generated,

    /// Se omitió porque el archivo ya existía
    SkippedExists,

    /// Se omitió porque el texto de la página estaba vacío
    SkippedEmptyText,

    /// El generador reportó error
    Failed,

    /// Sin entrada de manifest ni archivo en disco
    Missing,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::NotRequested => "not_requested",
            AssetStatus::Generated => "generated",
            AssetStatus::SkippedExists => "skipped_exists",
            AssetStatus::SkippedEmptyText => "skipped_empty_text",
            AssetStatus::Failed => "failed",
            AssetStatus::Missing => "missing",
        }
    }

    /// Normaliza un string arbitrario; lo desconocido o vacío es `Missing`
    pub fn normalize(raw: &str) -> Self {
        match raw.trim() {
            "not_requested" => AssetStatus::NotRequested,
            "generated" => AssetStatus::Generated,
            "skipped_exists" => AssetStatus::SkippedExists,
            "skipped_empty_text" => AssetStatus::SkippedEmptyText,
            "failed" => AssetStatus::Failed,
            _ => AssetStatus::Missing,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, AssetStatus::SkippedExists | AssetStatus::SkippedEmptyText)
    }

    /// `failed` y `missing` cuentan como fallidos en los agregados
    pub fn counts_as_failed(&self) -> bool {
        matches!(self, AssetStatus::Failed | AssetStatus::Missing)
    }
}

impl Default for AssetStatus {
    fn default() -> Self {
        AssetStatus::NotRequested
    }
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AssetStatus {
    /// Acepta cualquier valor JSON: strings conocidos se mapean a su
    /// variante, todo lo demás (null, números, strings raros) a `Missing`
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(s) => AssetStatus::normalize(&s),
            _ => AssetStatus::Missing,
        })
    }
}
