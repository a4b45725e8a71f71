//! # Ejecutor de Jobs
//! src/jobs/runner.rs
//!
//! Lleva un job por `queued -> running -> {completed, failed}`:
//!
//! 1. `running`
//! 2. Generación primaria (texto). Si falla, el job termina en `failed`.
//! 3. Audio e ilustraciones, cada uno aislado: su falla queda como
//!    `service_error` y el job sigue.
//! 4. Resumen vía `ResultAssembler` y `completed`.
//!
//! Cada etapa se invoca a lo sumo una vez; nunca se reintenta.

use crate::error::Result;
use crate::generators::Generators;
use crate::jobs::store::JobStore;
use crate::jobs::types::{Job, JobError, JobResult, JobStatus, RawServiceResults};
use crate::request::StoryRequest;
use crate::result::{ResultAssembler, ServiceErrors};
use crate::story;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Orquestador de la ejecución de un job
#[derive(Clone)]
pub struct JobRunner {
    store: JobStore,
    assembler: ResultAssembler,
    generators: Generators,
}

impl JobRunner {
    pub fn new(store: JobStore, generators: Generators) -> Self {
        let assembler = ResultAssembler::new(store.layout().clone());
        Self {
            store,
            assembler,
            generators,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn assembler(&self) -> &ResultAssembler {
        &self.assembler
    }

    /// Ejecuta el job en un hilo propio.
    ///
    /// El hilo recibe su propia copia del ID y del request.
    pub fn spawn(&self, id: String, request: StoryRequest) -> std::io::Result<JoinHandle<()>> {
        let runner = self.clone();
        thread::Builder::new()
            .name(format!("story-job-{}", id))
            .spawn(move || {
                if let Err(e) = runner.run(&id, &request) {
                    tracing::error!(story_id = %id, error = %e, "Job runner aborted");
                }
            })
    }

    /// Ejecuta el job de forma síncrona y retorna el registro final.
    ///
    /// Las fallas de las etapas quedan registradas en el job. Si el store
    /// no logra escribir el estado terminal se intenta dejar `failed`; solo
    /// se retorna `Err` cuando tampoco eso es posible.
    pub fn run(&self, id: &str, request: &StoryRequest) -> Result<Job> {
        let started = Instant::now();
        let (enable_tts, enable_illustration) = request.feature_flags();

        let running = match self.store.mark_running(id) {
            Ok(job) => job,
            Err(e) => {
                let error = JobError::generation_failed(&e.to_string());
                if let Err(fallback) = self.store.mark_failed(id, None, error) {
                    tracing::error!(story_id = %id, error = %fallback, "Could not record job failure");
                }
                return Err(e);
            }
        };
        tracing::info!(
            story_id = %id,
            enable_tts,
            enable_illustration,
            "story.job.start"
        );

        let mut service_errors = ServiceErrors::default();
        let generated = match self.generate_primary(id, request) {
            Ok(generated) => generated,
            Err(reason) => {
                return self.fail(&running, request, &reason, &service_errors, started)
            }
        };

        let run_dir = self.store.layout().run_dir(id);
        let mut raw = RawServiceResults::default();

        if enable_tts {
            let languages = request.language_pair();
            match guarded(|| {
                self.generators
                    .audio
                    .generate(&generated.story, &run_dir, &languages)
            }) {
                Ok(manifest) => raw.tts = Some(manifest),
                Err(reason) => {
                    tracing::warn!(story_id = %id, stage = "tts", %reason, "Optional stage failed");
                    service_errors.tts = Some(reason);
                }
            }
        }

        if enable_illustration {
            match guarded(|| {
                self.generators
                    .illustrations
                    .generate(&generated.story, &run_dir)
            }) {
                Ok(manifest) => raw.illustrations = Some(manifest),
                Err(reason) => {
                    tracing::warn!(story_id = %id, stage = "illustrations", %reason, "Optional stage failed");
                    service_errors.illustrations = Some(reason);
                }
            }
        }

        let summary = match self.assembler.build(
            id,
            enable_tts,
            enable_illustration,
            JobStatus::Completed,
            &service_errors,
        ) {
            Ok(summary) => summary,
            Err(e) => {
                return self.fail(&running, request, &e.to_string(), &service_errors, started)
            }
        };

        let job = match self
            .store
            .mark_completed(id, JobResult::from_result(&summary, Some(raw)))
        {
            Ok(job) => job,
            Err(e) => {
                let reason = format!("could not record completion: {}", e);
                return self.fail(&running, request, &reason, &service_errors, started);
            }
        };
        tracing::info!(
            story_id = %id,
            has_partial_failures = summary.assets.has_partial_failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "story.job.completed"
        );
        Ok(job)
    }

    /// Genera, valida y persiste el artefacto primario
    fn generate_primary(
        &self,
        id: &str,
        request: &StoryRequest,
    ) -> std::result::Result<crate::generators::GeneratedStory, String> {
        let generated = guarded(|| self.generators.story.generate(request))?;
        generated.story.validate().map_err(|e| e.to_string())?;
        story::write_story_json(
            self.store.layout(),
            id,
            &generated.story,
            &generated.model_name,
        )
        .map_err(|e| e.to_string())?;
        Ok(generated)
    }

    /// Termina el job en `failed`, con un resumen si hay artefacto en disco.
    ///
    /// Si el registro en disco ya no se puede leer se reescribe desde
    /// `running`, la última copia conocida.
    fn fail(
        &self,
        running: &Job,
        request: &StoryRequest,
        reason: &str,
        service_errors: &ServiceErrors,
        started: Instant,
    ) -> Result<Job> {
        let id = running.id.as_str();
        let (enable_tts, enable_illustration) = request.feature_flags();

        let best_effort = self
            .assembler
            .build(
                id,
                enable_tts,
                enable_illustration,
                JobStatus::Failed,
                service_errors,
            )
            .ok()
            .map(|summary| JobResult::from_result(&summary, None));

        let error = JobError::generation_failed(reason);
        let job = match self.store.mark_failed(id, best_effort.clone(), error.clone()) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(story_id = %id, error = %e, "Rewriting job record from last known state");
                self.store.restore_failed(running, best_effort, error)?
            }
        };
        tracing::error!(
            story_id = %id,
            %reason,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "story.job.failed"
        );
        Ok(job)
    }
}

/// Ejecuta una etapa externa convirtiendo errores y panics en texto
fn guarded<T>(stage: impl FnOnce() -> anyhow::Result<T>) -> std::result::Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(stage)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{:#}", e)),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "stage panicked".to_string()
    }
}
