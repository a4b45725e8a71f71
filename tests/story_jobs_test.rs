//! Tests de integración del motor de jobs
//! tests/story_jobs_test.rs
//!
//! Ejecutan jobs completos contra un directorio temporal usando
//! generadores falsos en lugar de los proveedores reales.

use anyhow::anyhow;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use story_jobs::api::{StatusCode, StoryApi};
use story_jobs::assets::{AssetStatus, ManifestEntry, SubsystemManifest};
use story_jobs::generators::{
    AudioGenerator, GeneratedStory, Generators, IllustrationGenerator, StoryGenerator,
};
use story_jobs::jobs::{JobRunner, JobStatus, JobStore, GENERATION_FAILED};
use story_jobs::request::{GenerationOptions, LanguagePair, RequestLimits, StoryRequest};
use story_jobs::storage::{slugify_language_name, OutputLayout};
use story_jobs::story::{self, Page, Story, PAGE_COUNT};
use tempfile::TempDir;

// ==================== Fakes ====================

fn build_story() -> Story {
    Story {
        title_primary: "별을 찾는 미나".to_string(),
        title_secondary: "Mina Finds a Star".to_string(),
        author_name: "Mina".to_string(),
        primary_language: "Korean".to_string(),
        secondary_language: "English".to_string(),
        image_style: "Crayon".to_string(),
        main_character_design: "Girl with a red scarf".to_string(),
        pages: (1..=PAGE_COUNT as u32)
            .map(|n| Page {
                page_number: n,
                text_primary: format!("페이지 {}", n),
                text_secondary: format!("Page {}", n),
                illustration_prompt: format!("Mina on page {}", n),
                illustration_scene_prompt: String::new(),
            })
            .collect(),
    }
}

enum Behavior {
    Succeed,
    Fail(&'static str),
    Panic(&'static str),
}

struct FakeStory(Behavior);

impl StoryGenerator for FakeStory {
    fn generate(&self, _request: &StoryRequest) -> anyhow::Result<GeneratedStory> {
        match self.0 {
            Behavior::Succeed => Ok(GeneratedStory {
                story: build_story(),
                model_name: "gemini-2.5-flash".to_string(),
            }),
            Behavior::Fail(reason) => Err(anyhow!(reason)),
            Behavior::Panic(reason) => panic!("{}", reason),
        }
    }
}

/// Escribe ambos audios de cada página y el manifest
struct FakeAudio(Behavior);

impl AudioGenerator for FakeAudio {
    fn generate(
        &self,
        story: &Story,
        run_dir: &Path,
        languages: &LanguagePair,
    ) -> anyhow::Result<SubsystemManifest> {
        match self.0 {
            Behavior::Fail(reason) => return Err(anyhow!(reason)),
            Behavior::Panic(reason) => panic!("{}", reason),
            Behavior::Succeed => {}
        }

        let audio_dir = run_dir.join("audio");
        let mut entries = Vec::new();
        for page in &story.pages {
            for (index, role, language) in [
                (1, "primary", &languages.primary),
                (2, "secondary", &languages.secondary),
            ] {
                let dir = audio_dir.join(format!("{:02}_{}", index, slugify_language_name(language)));
                fs::create_dir_all(&dir)?;
                fs::write(
                    dir.join(format!("page_{:02}_{}.wav", page.page_number, role)),
                    b"RIFF....WAVE",
                )?;
                entries.push(
                    ManifestEntry::new(page.page_number, AssetStatus::Generated)
                        .with_role(role)
                        .with_language(language),
                );
            }
        }

        let manifest = SubsystemManifest::from_entries(entries);
        manifest.write_to(&audio_dir)?;
        Ok(manifest)
    }
}

/// Escribe una imagen por página salvo `failed_page`.
///
/// Con `corrupt_record` además pisa `meta.json` con basura.
struct FakeIllustrations {
    behavior: Behavior,
    failed_page: Option<u32>,
    corrupt_record: bool,
}

impl IllustrationGenerator for FakeIllustrations {
    fn generate(&self, story: &Story, run_dir: &Path) -> anyhow::Result<SubsystemManifest> {
        match self.behavior {
            Behavior::Fail(reason) => return Err(anyhow!(reason)),
            Behavior::Panic(reason) => panic!("{}", reason),
            Behavior::Succeed => {}
        }

        if self.corrupt_record {
            fs::write(run_dir.join("meta.json"), b"{ truncated")?;
        }

        let dir = run_dir.join("illustrations");
        fs::create_dir_all(&dir)?;
        let entries = story
            .pages
            .iter()
            .map(|page| -> anyhow::Result<ManifestEntry> {
                let n = page.page_number;
                if Some(n) == self.failed_page {
                    return Ok(ManifestEntry::new(n, AssetStatus::Failed).with_error("content blocked"));
                }
                let name = format!("page_{:02}.png", n);
                fs::write(dir.join(&name), b"\x89PNG")?;
                Ok(ManifestEntry::new(n, AssetStatus::Generated)
                    .with_path(&format!("illustrations/{}", name)))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let manifest = SubsystemManifest::from_entries(entries);
        manifest.write_to(&dir)?;
        Ok(manifest)
    }
}

// ==================== Helpers ====================

fn generators(story: Behavior, audio: Behavior, illustrations: Behavior) -> Generators {
    Generators {
        story: Arc::new(FakeStory(story)),
        audio: Arc::new(FakeAudio(audio)),
        illustrations: Arc::new(FakeIllustrations {
            behavior: illustrations,
            failed_page: None,
            corrupt_record: false,
        }),
    }
}

fn layout(dir: &TempDir) -> OutputLayout {
    OutputLayout::new(dir.path().join("outputs"), "/static/outputs")
}

fn api(dir: &TempDir, generators: Generators) -> StoryApi {
    let runner = JobRunner::new(JobStore::new(layout(dir)), generators);
    StoryApi::new(runner, RequestLimits::default())
}

fn request(enable_tts: bool, enable_illustration: bool) -> StoryRequest {
    StoryRequest {
        child_name: "Mina".to_string(),
        child_age: Some(6),
        primary_lang: "Korean".to_string(),
        secondary_lang: "English".to_string(),
        theme: "Falling star".to_string(),
        extra_prompt: String::new(),
        include_style_guide: false,
        generation: GenerationOptions {
            enable_tts,
            enable_illustration,
            ..GenerationOptions::default()
        },
    }
}

/// Encola y espera a que el hilo del job termine
fn run_to_end(api: &StoryApi, request: StoryRequest) -> String {
    let (job, handle) = api.enqueue(request).unwrap();
    handle.join().unwrap();
    job.id
}

// ==================== Primary Stage ====================

#[test]
fn test_primary_failure_marks_job_failed() {
    let dir = TempDir::new().unwrap();
    let api = api(
        &dir,
        generators(Behavior::Fail("model overloaded"), Behavior::Succeed, Behavior::Succeed),
    );

    let id = run_to_end(&api, request(true, true));

    let job = api.store().load(&id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert_eq!(error.code, GENERATION_FAILED);
    assert_eq!(error.detail.unwrap()["reason"], "model overloaded");
    assert!(job.result.is_none());

    let response = api.result(&id);
    assert_eq!(response.status, StatusCode::NotFound);
    assert_eq!(response.error_code(), Some("STORY_RESULT_NOT_FOUND"));
}

#[test]
fn test_primary_panic_is_contained() {
    let dir = TempDir::new().unwrap();
    let api = api(
        &dir,
        generators(Behavior::Panic("parser blew up"), Behavior::Succeed, Behavior::Succeed),
    );

    let id = run_to_end(&api, request(false, false));

    let job = api.store().load(&id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.unwrap().detail.unwrap()["reason"], "parser blew up");
}

#[test]
fn test_primary_failure_with_prior_artifact_has_best_effort_result() {
    let dir = TempDir::new().unwrap();
    let layout = layout(&dir);
    let store = JobStore::new(layout.clone());
    let runner = JobRunner::new(
        store.clone(),
        generators(Behavior::Fail("timeout"), Behavior::Succeed, Behavior::Succeed),
    );

    // Artefacto de un intento anterior
    store.create("retry_run", request(false, false)).unwrap();
    story::write_story_json(&layout, "retry_run", &build_story(), "gemini-2.5-flash").unwrap();

    let job = runner.run("retry_run", &request(false, false)).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let summary = job.result.unwrap();
    assert_eq!(summary.page_count, PAGE_COUNT);
    assert!(summary.raw_service_results.is_none());

    let api = StoryApi::new(runner, RequestLimits::default());
    let response = api.result("retry_run");
    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.body["status"], "failed");
    assert_eq!(response.body["pages"].as_array().unwrap().len(), PAGE_COUNT);
}

// ==================== Optional Stages ====================

#[test]
fn test_full_success() {
    let dir = TempDir::new().unwrap();
    let api = api(&dir, generators(Behavior::Succeed, Behavior::Succeed, Behavior::Succeed));

    let id = run_to_end(&api, request(true, true));

    let status = api.status(&id);
    assert_eq!(status.status, StatusCode::Ok);
    assert_eq!(status.body["status"], "completed");
    assert!(status.body["error"].is_null());
    assert_eq!(status.body["result"]["page_count"], 24);
    assert_eq!(status.body["result"]["raw_service_results"]["tts"]["total_tasks"], 48);

    let result = api.result(&id);
    assert_eq!(result.status, StatusCode::Ok);
    let body = &result.body;
    assert_eq!(body["assets"]["has_partial_failures"], false);
    assert_eq!(body["assets"]["tts"]["generated"], 48);
    assert_eq!(body["assets"]["illustrations"]["generated"], 24);
    assert_eq!(body["meta"]["title_secondary"], "Mina Finds a Star");

    let page = &body["pages"][0];
    assert_eq!(page["audio_primary_status"], "generated");
    assert_eq!(
        page["audio_primary_url"],
        format!("/static/outputs/{}/audio/01_korean/page_01_primary.wav", id)
    );
    assert_eq!(
        page["illustration_url"],
        format!("/static/outputs/{}/illustrations/page_01.png", id)
    );
    assert_eq!(page["has_illustration"], true);
}

#[test]
fn test_tts_failure_is_partial() {
    let dir = TempDir::new().unwrap();
    let api = api(
        &dir,
        generators(Behavior::Succeed, Behavior::Fail("TTS quota exceeded"), Behavior::Succeed),
    );

    let id = run_to_end(&api, request(true, true));

    let job = api.store().load(&id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error.is_none());

    let result = api.result(&id);
    let tts = &result.body["assets"]["tts"];
    assert_eq!(tts["enabled"], true);
    assert_eq!(tts["service_error"], "TTS quota exceeded");
    assert_eq!(result.body["assets"]["illustrations"]["service_error"], json!(null));
    assert_eq!(result.body["assets"]["has_partial_failures"], true);
    assert_eq!(result.body["pages"][2]["audio_secondary_status"], "missing");
}

#[test]
fn test_illustration_panic_is_partial() {
    let dir = TempDir::new().unwrap();
    let api = api(
        &dir,
        generators(Behavior::Succeed, Behavior::Succeed, Behavior::Panic("gpu lost")),
    );

    let id = run_to_end(&api, request(false, true));

    let job = api.store().load(&id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    let assets = job.result.unwrap().assets;
    assert_eq!(assets.illustrations.service_error.as_deref(), Some("gpu lost"));
    assert!(assets.has_partial_failures);
}

#[test]
fn test_single_failed_illustration_sets_partial_flag() {
    let dir = TempDir::new().unwrap();
    let api = api(
        &dir,
        Generators {
            story: Arc::new(FakeStory(Behavior::Succeed)),
            audio: Arc::new(FakeAudio(Behavior::Succeed)),
            illustrations: Arc::new(FakeIllustrations {
                behavior: Behavior::Succeed,
                failed_page: Some(7),
                corrupt_record: false,
            }),
        },
    );

    let id = run_to_end(&api, request(false, true));

    let result = api.result(&id);
    assert_eq!(result.body["assets"]["has_partial_failures"], true);
    assert_eq!(result.body["assets"]["illustrations"]["failed"], 1);
    assert_eq!(result.body["pages"][6]["illustration_status"], "failed");
    assert_eq!(result.body["pages"][6]["illustration_error"], "content blocked");
    assert_eq!(result.body["pages"][6]["has_illustration"], false);
    assert_eq!(result.body["assets"]["tts"]["enabled"], false);
}

#[test]
fn test_disabled_tts_ignores_stray_audio() {
    let dir = TempDir::new().unwrap();
    let api = api(&dir, generators(Behavior::Succeed, Behavior::Succeed, Behavior::Succeed));

    let id = run_to_end(&api, request(false, false));

    // Audio que aparece después por otro medio
    let stray = layout(&dir).run_dir(&id).join("audio/01_korean");
    fs::create_dir_all(&stray).unwrap();
    fs::write(stray.join("page_01_primary.wav"), b"RIFF").unwrap();

    let result = api.result(&id);
    let tts = &result.body["assets"]["tts"];
    assert_eq!(tts["enabled"], false);
    assert_eq!(tts["total_tasks"], 0);
    assert_eq!(tts["failed"], 0);
    assert_eq!(result.body["pages"][0]["audio_primary_status"], "not_requested");
    assert_eq!(result.body["assets"]["has_partial_failures"], false);
}

// ==================== Result Queries ====================

#[test]
fn test_result_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let api = api(&dir, generators(Behavior::Succeed, Behavior::Fail("tts down"), Behavior::Succeed));

    let id = run_to_end(&api, request(true, true));

    let first = serde_json::to_vec(&api.result(&id).body).unwrap();
    let second = serde_json::to_vec(&api.result(&id).body).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_result_not_ready_and_unknown() {
    let dir = TempDir::new().unwrap();
    let api = api(&dir, generators(Behavior::Succeed, Behavior::Succeed, Behavior::Succeed));
    api.store().create("pending", request(false, false)).unwrap();

    let response = api.result("pending");
    assert_eq!(response.status, StatusCode::Conflict);
    assert_eq!(response.error_code(), Some("STORY_NOT_READY"));
    assert_eq!(response.body["error"]["detail"]["status"], "queued");

    assert_eq!(api.status("pending").body["status"], "queued");

    let response = api.status("missing");
    assert_eq!(response.status, StatusCode::NotFound);
    assert_eq!(response.error_code(), Some("STORY_NOT_FOUND"));
    assert_eq!(api.result("missing").error_code(), Some("STORY_NOT_FOUND"));
}

#[test]
fn test_canceled_job_has_no_result() {
    let dir = TempDir::new().unwrap();
    let api = api(&dir, generators(Behavior::Succeed, Behavior::Succeed, Behavior::Succeed));
    api.store().create("stopped", request(false, false)).unwrap();
    api.store()
        .transition("stopped", JobStatus::Canceled, None, None)
        .unwrap();

    assert_eq!(api.status("stopped").body["status"], "canceled");
    assert_eq!(api.result("stopped").status, StatusCode::Conflict);
}

#[test]
fn test_result_invalid_artifact() {
    let dir = TempDir::new().unwrap();
    let api = api(&dir, generators(Behavior::Succeed, Behavior::Succeed, Behavior::Succeed));

    let id = run_to_end(&api, request(false, false));
    let run_dir = layout(&dir).run_dir(&id);
    fs::write(run_dir.join("story_gemini-2.5-flash.json"), br#"{"title_primary": "x"}"#).unwrap();

    let response = api.result(&id);
    assert_eq!(response.status, StatusCode::InternalServerError);
    assert_eq!(response.error_code(), Some("STORY_RESULT_INVALID"));
}

#[test]
fn test_unreadable_record_still_ends_failed() {
    let dir = TempDir::new().unwrap();
    let api = api(
        &dir,
        Generators {
            story: Arc::new(FakeStory(Behavior::Succeed)),
            audio: Arc::new(FakeAudio(Behavior::Fail("tts down"))),
            illustrations: Arc::new(FakeIllustrations {
                behavior: Behavior::Succeed,
                failed_page: None,
                corrupt_record: true,
            }),
        },
    );

    let id = run_to_end(&api, request(true, true));

    let job = api.store().load(&id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert_eq!(error.code, GENERATION_FAILED);
    let reason = error.detail.unwrap()["reason"].as_str().unwrap().to_string();
    assert!(reason.contains("could not record completion"), "{}", reason);

    // El resumen best-effort conserva el error de la etapa opcional
    let assets = job.result.unwrap().assets;
    assert_eq!(assets.tts.service_error.as_deref(), Some("tts down"));
    assert!(assets.has_partial_failures);

    let response = api.result(&id);
    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.body["status"], "failed");
    assert_eq!(response.body["assets"]["tts"]["service_error"], "tts down");
}

// ==================== Submission ====================

#[test]
fn test_submit_accepts_and_completes() {
    let dir = TempDir::new().unwrap();
    let api = api(&dir, generators(Behavior::Succeed, Behavior::Succeed, Behavior::Succeed));

    let response = api.submit(json!({
        "child_name": "  Mina ",
        "primary_lang": "korean",
        "secondary_lang": "English",
        "theme": "Falling star"
    }));
    assert_eq!(response.status, StatusCode::Accepted);
    let id = response.body["id"].as_str().unwrap().to_string();
    assert!(id.ends_with("_story_mina-falling-star"));
    assert_eq!(response.body["status"], "queued");
    assert_eq!(response.body["status_url"], format!("/api/stories/{}", id));
    assert_eq!(response.body["result_url"], format!("/api/stories/{}/result", id));

    // Polling hasta estado terminal
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let status = api.status(&id);
        if status.body["status"] == "completed" {
            break;
        }
        assert!(Instant::now() < deadline, "job did not finish: {}", status.body);
        thread::sleep(Duration::from_millis(20));
    }

    let job = api.store().load(&id).unwrap();
    assert_eq!(job.request.child_name, "Mina");
    assert_eq!(job.request.primary_lang, "Korean");
}

#[test]
fn test_concurrent_submissions_get_distinct_ids() {
    let dir = TempDir::new().unwrap();
    let api = api(&dir, generators(Behavior::Succeed, Behavior::Succeed, Behavior::Succeed));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let api = api.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                api.submit(json!({
                    "child_name": "Mina",
                    "primary_lang": "Korean",
                    "secondary_lang": "English",
                    "theme": "Star",
                    "generation": { "enable_tts": false, "enable_illustration": false }
                }))
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let response = handle.join().unwrap();
        assert_eq!(response.status, StatusCode::Accepted, "{}", response.body);
        ids.push(response.body["id"].as_str().unwrap().to_string());
    }

    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 8);

    let deadline = Instant::now() + Duration::from_secs(10);
    for id in &ids {
        while api.status(id).body["status"] != "completed" {
            assert!(Instant::now() < deadline, "job {} did not finish", id);
            thread::sleep(Duration::from_millis(20));
        }
    }
}

#[test]
fn test_submit_rejects_invalid_payload() {
    let dir = TempDir::new().unwrap();
    let api = api(&dir, generators(Behavior::Succeed, Behavior::Succeed, Behavior::Succeed));

    let response = api.submit(json!({ "child_name": "Mina" }));
    assert_eq!(response.status, StatusCode::BadRequest);
    assert_eq!(response.error_code(), Some("VALIDATION_ERROR"));

    let response = api.submit(json!({
        "child_name": "Mina",
        "primary_lang": "Klingon",
        "secondary_lang": "English"
    }));
    assert_eq!(response.status, StatusCode::BadRequest);

    // Nada quedó en disco
    let outputs = layout(&dir).outputs_dir().to_path_buf();
    let runs = fs::read_dir(&outputs).map(|entries| entries.count()).unwrap_or(0);
    assert_eq!(runs, 0);
}
