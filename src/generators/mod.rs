//! # Generadores Externos
//! src/generators/mod.rs
//!
//! Contratos de las tres etapas de producción. Las implementaciones reales
//! llaman a proveedores externos; este crate solo las invoca, como máximo
//! una vez por job, y nunca reintenta.

use crate::assets::SubsystemManifest;
use crate::request::{LanguagePair, StoryRequest};
use crate::story::Story;
use std::path::Path;

/// Artefacto primario recién generado
#[derive(Debug, Clone)]
pub struct GeneratedStory {
    pub story: Story,

    /// Modelo usado; define el nombre `story_<modelo>.json`
    pub model_name: String,
}

/// Etapa primaria (texto). Su falla es fatal para el job.
pub trait StoryGenerator: Send + Sync {
    fn generate(&self, request: &StoryRequest) -> anyhow::Result<GeneratedStory>;
}

/// Narración. Escribe archivos y `manifest.json` bajo `run_dir/audio/`.
pub trait AudioGenerator: Send + Sync {
    fn generate(
        &self,
        story: &Story,
        run_dir: &Path,
        languages: &LanguagePair,
    ) -> anyhow::Result<SubsystemManifest>;
}

/// Ilustraciones. Escribe archivos y `manifest.json` bajo `run_dir/illustrations/`.
pub trait IllustrationGenerator: Send + Sync {
    fn generate(&self, story: &Story, run_dir: &Path) -> anyhow::Result<SubsystemManifest>;
}

/// Conjunto de generadores que usa el runner
#[derive(Clone)]
pub struct Generators {
    pub story: std::sync::Arc<dyn StoryGenerator>,
    pub audio: std::sync::Arc<dyn AudioGenerator>,
    pub illustrations: std::sync::Arc<dyn IllustrationGenerator>,
}
