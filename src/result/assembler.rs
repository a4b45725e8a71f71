//! # Ensamblador de Resultados
//! src/result/assembler.rs
//!
//! Composición de lectura pura e idempotente: artefacto primario +
//! reconciliación de audio e ilustraciones = documento de resultado.
//! Puede llamarse concurrentemente sobre el mismo job; no toca el JobStore.

use crate::assets::{AssetReconciler, AssetTask};
use crate::error::{Result, StoryError};
use crate::jobs::JobStatus;
use crate::request::LanguagePair;
use crate::result::types::{
    AssetSummary, AssetsSummary, PageView, ResultMeta, ServiceErrors, StoryResult,
};
use crate::story::{self, StoryDocument};
use crate::storage::OutputLayout;

/// Construye documentos de resultado a partir del run directory
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    layout: OutputLayout,
}

impl ResultAssembler {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Reconstruye el resultado de un job.
    ///
    /// # Errores
    /// - `NotFound` si no existe el run directory o el artefacto primario
    /// - `InvalidData` si el artefacto no tiene una lista `pages` válida
    pub fn build(
        &self,
        story_id: &str,
        include_tts: bool,
        include_illustration: bool,
        job_status: JobStatus,
        service_errors: &ServiceErrors,
    ) -> Result<StoryResult> {
        let run_dir = self.layout.run_dir(story_id);
        if !run_dir.is_dir() {
            return Err(StoryError::NotFound(format!("run not found: {}", story_id)));
        }

        let story_path = story::find_story_json_path(&run_dir).ok_or_else(|| {
            StoryError::NotFound(format!("story json not found for run: {}", story_id))
        })?;
        let story_json_url = self.layout.to_static_url(&story_path);
        let document = StoryDocument::load(&story_path)?;

        let languages = LanguagePair {
            primary: document.primary_language.clone(),
            secondary: document.secondary_language.clone(),
        };
        let page_numbers = document.page_numbers();

        let reconciler = AssetReconciler::new(&self.layout, story_id);
        let audio = reconciler.reconcile_audio(include_tts, &page_numbers, &languages);
        let illustrations = reconciler.reconcile_illustrations(include_illustration, &page_numbers);

        let pages = document
            .pages
            .iter()
            .zip(audio.tasks.chunks(2))
            .zip(illustrations.tasks.iter())
            .map(|((page, audio_pair), illustration)| {
                let (primary, secondary) = (&audio_pair[0], &audio_pair[1]);
                PageView {
                    page_number: page.page_number,
                    text_primary: page.text_primary.clone(),
                    text_secondary: page.text_secondary.clone(),
                    audio_primary_url: primary.url.clone(),
                    audio_secondary_url: secondary.url.clone(),
                    illustration_url: illustration.url.clone(),
                    audio_primary_status: primary.status,
                    audio_primary_error: primary.error.clone(),
                    audio_secondary_status: secondary.status,
                    audio_secondary_error: secondary.error.clone(),
                    illustration_status: illustration.status,
                    illustration_error: illustration.error.clone(),
                    illustration_prompt: page.illustration_prompt.clone(),
                    illustration_scene_prompt: page.illustration_scene_prompt.clone(),
                    has_primary_audio: has_file(primary),
                    has_secondary_audio: has_file(secondary),
                    has_illustration: has_file(illustration),
                }
            })
            .collect::<Vec<_>>();

        let assets = AssetsSummary::new(
            with_service_error(audio.summary, &service_errors.tts),
            with_service_error(illustrations.summary, &service_errors.illustrations),
        );

        Ok(StoryResult {
            id: story_id.to_string(),
            status: job_status,
            story_json_url,
            assets,
            meta: ResultMeta {
                title_primary: document.title_primary,
                title_secondary: document.title_secondary,
                primary_language: document.primary_language,
                secondary_language: document.secondary_language,
                page_count: pages.len(),
            },
            pages,
        })
    }
}

fn has_file(task: &AssetTask) -> bool {
    task.url.is_some()
}

/// Un subsistema deshabilitado nunca arrastra errores de etapa
fn with_service_error(mut summary: AssetSummary, error: &Option<String>) -> AssetSummary {
    if summary.enabled {
        summary.service_error = error.clone();
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetStatus, ManifestEntry, SubsystemManifest};
    use crate::storage::ILLUSTRATIONS_DIR_NAME;
    use crate::story::tests::sample_story;
    use crate::story::PAGE_COUNT;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::TempDir;

    const STORY_ID: &str = "20260101_120000_story_mina";

    fn setup() -> (TempDir, ResultAssembler) {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path().join("outputs"), "/static/outputs");
        story::write_story_json(&layout, STORY_ID, &sample_story(), "gemini-2.5-flash").unwrap();
        (dir, ResultAssembler::new(layout))
    }

    fn failed_illustration_manifest(assembler: &ResultAssembler) {
        let entries = (1..=PAGE_COUNT as u32)
            .map(|n| {
                if n == 5 {
                    ManifestEntry::new(n, AssetStatus::Failed).with_error("blocked")
                } else {
                    ManifestEntry::new(n, AssetStatus::Generated)
                        .with_path(&format!("illustrations/page_{:02}.png", n))
                }
            })
            .collect();
        SubsystemManifest::from_entries(entries)
            .write_to(&assembler.layout().run_dir(STORY_ID).join(ILLUSTRATIONS_DIR_NAME))
            .unwrap();
    }

    // ==================== Errors ====================

    #[test]
    fn test_missing_run_dir() {
        let (_dir, assembler) = setup();
        let result = assembler.build("nope", false, false, JobStatus::Completed, &ServiceErrors::default());
        assert_matches!(result, Err(StoryError::NotFound(msg)) if msg.contains("run not found"));
    }

    #[test]
    fn test_missing_story_json() {
        let (_dir, assembler) = setup();
        fs::create_dir_all(assembler.layout().run_dir("empty")).unwrap();
        let result = assembler.build("empty", false, false, JobStatus::Failed, &ServiceErrors::default());
        assert_matches!(result, Err(StoryError::NotFound(_)));
    }

    #[test]
    fn test_invalid_pages() {
        let (_dir, assembler) = setup();
        let run_dir = assembler.layout().run_dir("broken");
        fs::create_dir_all(&run_dir).unwrap();
        fs::write(run_dir.join("story_m.json"), br#"{"pages": {"1": "x"}}"#).unwrap();

        let result = assembler.build("broken", false, false, JobStatus::Completed, &ServiceErrors::default());
        assert_matches!(result, Err(StoryError::InvalidData(_)));
    }

    // ==================== Composition ====================

    #[test]
    fn test_build_text_only() {
        let (_dir, assembler) = setup();
        let result = assembler
            .build(STORY_ID, false, false, JobStatus::Completed, &ServiceErrors::default())
            .unwrap();

        assert_eq!(result.id, STORY_ID);
        assert_eq!(result.status, JobStatus::Completed);
        assert_eq!(
            result.story_json_url.as_deref(),
            Some("/static/outputs/20260101_120000_story_mina/story_gemini-2.5-flash.json")
        );
        assert_eq!(result.meta.page_count, PAGE_COUNT);
        assert_eq!(result.meta.title_secondary, "Mina and the Moon");
        assert_eq!(result.pages[0].text_primary, "Primary text 1");
        assert_eq!(result.pages[23].illustration_scene_prompt, "Scene prompt 24");
        assert_eq!(result.pages[0].audio_primary_status, AssetStatus::NotRequested);
        assert_eq!(result.pages[0].illustration_status, AssetStatus::NotRequested);
        assert!(!result.assets.has_partial_failures);
    }

    #[test]
    fn test_enabled_without_outputs_reports_missing() {
        let (_dir, assembler) = setup();
        let result = assembler
            .build(STORY_ID, true, false, JobStatus::Completed, &ServiceErrors::default())
            .unwrap();

        assert_eq!(result.assets.tts.total_tasks, 48);
        assert_eq!(result.assets.tts.failed, 48);
        assert_eq!(result.pages[3].audio_secondary_status, AssetStatus::Missing);
        assert!(result.assets.has_partial_failures);
    }

    #[test]
    fn test_partial_failure_flag_follows_enablement() {
        let (_dir, assembler) = setup();
        failed_illustration_manifest(&assembler);

        let enabled = assembler
            .build(STORY_ID, false, true, JobStatus::Completed, &ServiceErrors::default())
            .unwrap();
        assert!(enabled.assets.has_partial_failures);
        assert_eq!(enabled.assets.illustrations.failed, 1);
        assert_eq!(enabled.pages[4].illustration_error.as_deref(), Some("blocked"));

        let disabled = assembler
            .build(STORY_ID, false, false, JobStatus::Completed, &ServiceErrors::default())
            .unwrap();
        assert!(!disabled.assets.has_partial_failures);
        assert_eq!(disabled.assets.illustrations.total_tasks, 0);
    }

    #[test]
    fn test_service_error_propagated() {
        let (_dir, assembler) = setup();
        failed_illustration_manifest(&assembler);
        let errors = ServiceErrors {
            tts: Some("TTS quota exceeded".to_string()),
            illustrations: None,
        };

        let result = assembler
            .build(STORY_ID, true, false, JobStatus::Completed, &errors)
            .unwrap();
        assert_eq!(result.assets.tts.service_error.as_deref(), Some("TTS quota exceeded"));
        assert!(result.assets.tts.enabled);

        // Deshabilitado: el error de etapa no aparece
        let result = assembler
            .build(STORY_ID, false, false, JobStatus::Completed, &errors)
            .unwrap();
        assert_eq!(result.assets.tts.service_error, None);
        assert!(!result.assets.has_partial_failures);
    }

    #[test]
    fn test_build_is_idempotent() {
        let (_dir, assembler) = setup();
        failed_illustration_manifest(&assembler);

        let first = assembler
            .build(STORY_ID, true, true, JobStatus::Completed, &ServiceErrors::default())
            .unwrap();
        let second = assembler
            .build(STORY_ID, true, true, JobStatus::Completed, &ServiceErrors::default())
            .unwrap();
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }
}
