//! # Reconciliación de Assets
//! src/assets/reconciler.rs
//!
//! Deriva el estado de cada sub-asset esperado de un job (dos audios y una
//! ilustración por página) combinando, en este orden:
//!
//! 1. La entrada del manifest para esa tarea exacta (página, rol)
//! 2. Un sondeo del filesystem sobre la ruta esperada
//! 3. `missing` sintetizado
//!
//! Solo lee archivos ya durables; nunca toma locks ni escribe.

use crate::assets::manifest::{load_manifest, LoadedManifest, ManifestEntry};
use crate::assets::status::AssetStatus;
use crate::request::LanguagePair;
use crate::result::AssetSummary;
use crate::storage::{self, AudioRole, OutputLayout, AUDIO_DIR_NAME, ILLUSTRATIONS_DIR_NAME};
use std::collections::HashMap;
use std::path::PathBuf;

/// De dónde salió el estado de una tarea
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSource {
    /// Subsistema deshabilitado
    Disabled,

    /// Entrada explícita del manifest
    Manifest,

    /// Archivo encontrado en disco sin entrada de manifest
    Filesystem,

    /// Ni entrada ni archivo
    Synthesized,
}

/// Estado reconciliado de una tarea
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTask {
    pub page_number: u32,

    /// Solo para audio
    pub role: Option<AudioRole>,

    pub status: AssetStatus,

    pub error: Option<String>,

    /// URL estática del archivo, si existe uno descubrible
    pub url: Option<String>,

    pub source: TaskSource,
}

/// Tareas de un subsistema (en orden de página) más su resumen
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub tasks: Vec<AssetTask>,
    pub summary: AssetSummary,
}

impl Reconciliation {
    /// Tarea de una página (y rol, para audio)
    pub fn task(&self, page_number: u32, role: Option<AudioRole>) -> Option<&AssetTask> {
        self.tasks
            .iter()
            .find(|task| task.page_number == page_number && task.role == role)
    }
}

/// Reconciliador para un run directory
pub struct AssetReconciler<'a> {
    layout: &'a OutputLayout,
    story_id: String,
    run_dir: PathBuf,
}

impl<'a> AssetReconciler<'a> {
    pub fn new(layout: &'a OutputLayout, story_id: &str) -> Self {
        Self {
            layout,
            story_id: story_id.to_string(),
            run_dir: layout.run_dir(story_id),
        }
    }

    /// Reconcilia los audios (primario y secundario) de cada página
    pub fn reconcile_audio(
        &self,
        enabled: bool,
        pages: &[u32],
        languages: &LanguagePair,
    ) -> Reconciliation {
        let loaded = load_manifest(&self.run_dir.join(AUDIO_DIR_NAME));

        let mut entries: HashMap<(u32, AudioRole), &ManifestEntry> = HashMap::new();
        if let Some(manifest) = loaded.as_ref().and_then(|l| l.manifest.as_ref()) {
            for entry in &manifest.entries {
                let role = entry.role.as_deref().and_then(AudioRole::from_str);
                if let (Some(page), Some(role)) = (entry.page(), role) {
                    entries.insert((page, role), entry);
                }
            }
        }

        let mut tasks = Vec::with_capacity(pages.len() * 2);
        for &page_number in pages {
            for role in AudioRole::ALL {
                let language = match role {
                    AudioRole::Primary => &languages.primary,
                    AudioRole::Secondary => &languages.secondary,
                };
                let relative =
                    self.layout
                        .audio_relative_path(&self.story_id, role, language, page_number);
                let exists = storage::is_non_empty_file(&self.layout.outputs_dir().join(&relative));

                // La URL sigue al archivo aunque el subsistema esté deshabilitado
                let url = exists.then(|| self.layout.static_url_for_relative(&relative));

                let (status, error, source) = if !enabled {
                    (AssetStatus::NotRequested, None, TaskSource::Disabled)
                } else if let Some(entry) = entries.get(&(page_number, role)) {
                    (entry.status, entry.error.clone(), TaskSource::Manifest)
                } else if exists {
                    (AssetStatus::Generated, None, TaskSource::Filesystem)
                } else {
                    (AssetStatus::Missing, None, TaskSource::Synthesized)
                };

                tasks.push(AssetTask {
                    page_number,
                    role: Some(role),
                    status,
                    error,
                    url,
                    source,
                });
            }
        }

        let summary = self.summarize(enabled, &tasks, loaded);
        Reconciliation { tasks, summary }
    }

    /// Reconcilia la ilustración de cada página
    pub fn reconcile_illustrations(&self, enabled: bool, pages: &[u32]) -> Reconciliation {
        let loaded = load_manifest(&self.run_dir.join(ILLUSTRATIONS_DIR_NAME));

        let mut entries: HashMap<u32, &ManifestEntry> = HashMap::new();
        if let Some(manifest) = loaded.as_ref().and_then(|l| l.manifest.as_ref()) {
            for entry in &manifest.entries {
                if let Some(page) = entry.page() {
                    entries.insert(page, entry);
                }
            }
        }

        let tasks: Vec<AssetTask> = pages
            .iter()
            .map(|&page_number| {
                let (status, error, url, source) = if !enabled {
                    (AssetStatus::NotRequested, None, None, TaskSource::Disabled)
                } else if let Some(entry) = entries.get(&page_number) {
                    // La ruta declarada solo cuenta si resuelve a un archivo real
                    let url = entry
                        .path
                        .as_deref()
                        .and_then(|raw| self.layout.resolve_manifest_asset_path(&self.run_dir, raw))
                        .and_then(|path| self.layout.to_static_url(&path));
                    (entry.status, entry.error.clone(), url, TaskSource::Manifest)
                } else {
                    match self
                        .layout
                        .first_existing_illustration(&self.run_dir, page_number)
                        .and_then(|path| self.layout.to_static_url(&path))
                    {
                        Some(url) => (AssetStatus::Generated, None, Some(url), TaskSource::Filesystem),
                        None => (AssetStatus::Missing, None, None, TaskSource::Synthesized),
                    }
                };

                AssetTask {
                    page_number,
                    role: None,
                    status,
                    error,
                    url,
                    source,
                }
            })
            .collect();

        let summary = self.summarize(enabled, &tasks, loaded);
        Reconciliation { tasks, summary }
    }

    /// Agregado del subsistema.
    ///
    /// Con manifest legible se usan sus contadores, sumando a `failed` las
    /// tareas sin entrada ni archivo; sin manifest se cuentan los estados.
    fn summarize(
        &self,
        enabled: bool,
        tasks: &[AssetTask],
        loaded: Option<LoadedManifest>,
    ) -> AssetSummary {
        if !enabled {
            return AssetSummary::disabled();
        }

        let manifest_url = loaded
            .as_ref()
            .and_then(|l| self.layout.to_static_url(&l.path));
        let observed = tasks.len() as u32;

        match loaded.and_then(|l| l.manifest) {
            Some(manifest) => {
                let counts = manifest.counts();
                let synthesized = tasks
                    .iter()
                    .filter(|task| task.source == TaskSource::Synthesized)
                    .count() as u32;

                let mut total_tasks = counts.total_tasks;
                if synthesized > 0 && total_tasks < observed {
                    total_tasks = observed;
                }

                AssetSummary {
                    enabled: true,
                    total_tasks,
                    generated: counts.generated,
                    skipped: counts.skipped,
                    failed: counts.failed.saturating_add(synthesized),
                    manifest_url,
                    service_error: None,
                }
            }
            None => {
                let mut summary = AssetSummary {
                    enabled: true,
                    total_tasks: observed,
                    generated: 0,
                    skipped: 0,
                    failed: 0,
                    manifest_url,
                    service_error: None,
                };
                for task in tasks {
                    match task.status {
                        AssetStatus::Generated => summary.generated += 1,
                        s if s.is_skipped() => summary.skipped += 1,
                        s if s.counts_as_failed() => summary.failed += 1,
                        _ => {}
                    }
                }
                summary
            }
        }
    }
}
