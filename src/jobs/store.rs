//! # Persistencia de Jobs
//! src/jobs/store.rs
//!
//! Un registro `meta.json` por job dentro de su run directory. Cada
//! escritura va a `meta.tmp` y se renombra, así que un lector nunca ve un
//! registro a medio escribir. Las escrituras se serializan con un mutex
//! compartido entre clones del store.

use crate::error::{Result, StoryError};
use crate::jobs::types::{Job, JobError, JobResult, JobStatus};
use crate::request::StoryRequest;
use crate::storage::{self, OutputLayout};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Store durable de registros de jobs
#[derive(Debug, Clone)]
pub struct JobStore {
    layout: OutputLayout,

    /// Sección crítica de escritura (todas las escrituras del proceso)
    write_lock: Arc<Mutex<()>>,
}

impl JobStore {
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Crea el registro en estado `queued`.
    ///
    /// Falla con `AlreadyExists` si ya hay un registro para `id`.
    pub fn create(&self, id: &str, request: StoryRequest) -> Result<Job> {
        if !is_safe_id(id) {
            return Err(StoryError::Validation(format!("invalid job id: {:?}", id)));
        }

        let _guard = self.lock();
        let meta_path = self.layout.meta_path(id);
        if meta_path.exists() {
            return Err(StoryError::AlreadyExists(format!("job already exists: {}", id)));
        }

        fs::create_dir_all(self.layout.run_dir(id))?;
        let job = Job::new(id.to_string(), request);
        self.write(&job)?;

        tracing::debug!(story_id = %id, "Job record created");
        Ok(job)
    }

    /// Lee el registro actual
    pub fn load(&self, id: &str) -> Result<Job> {
        if !is_safe_id(id) {
            return Err(not_found(id));
        }

        let bytes = match fs::read(self.layout.meta_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found(id)),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes)
            .map_err(|e| StoryError::InvalidData(format!("job record {} is corrupted: {}", id, e)))
    }

    /// Aplica una transición de estado y persiste el registro.
    ///
    /// El resultado solo se reemplaza si viene `Some`; el error se limpia
    /// al pasar a cualquier estado distinto de `failed`.
    pub fn transition(
        &self,
        id: &str,
        status: JobStatus,
        result: Option<JobResult>,
        error: Option<JobError>,
    ) -> Result<Job> {
        let _guard = self.lock();

        let mut job = self.load(id)?;
        job.apply_transition(status, result, error);
        self.write(&job)?;

        tracing::debug!(story_id = %id, status = %status, "Job transitioned");
        Ok(job)
    }

    /// Marca el job como en ejecución
    pub fn mark_running(&self, id: &str) -> Result<Job> {
        self.transition(id, JobStatus::Running, None, None)
    }

    /// Marca el job como completado con su resumen
    pub fn mark_completed(&self, id: &str, result: JobResult) -> Result<Job> {
        self.transition(id, JobStatus::Completed, Some(result), None)
    }

    /// Marca el job como fallido
    pub fn mark_failed(&self, id: &str, result: Option<JobResult>, error: JobError) -> Result<Job> {
        self.transition(id, JobStatus::Failed, result, Some(error))
    }

    /// Reescribe el registro como `failed` a partir de una copia conocida.
    ///
    /// Sirve cuando `meta.json` ya no se puede leer y `transition` falla
    /// antes de escribir.
    pub fn restore_failed(
        &self,
        last_known: &Job,
        result: Option<JobResult>,
        error: JobError,
    ) -> Result<Job> {
        let _guard = self.lock();

        let mut job = last_known.clone();
        job.apply_transition(JobStatus::Failed, result, Some(error));
        self.write(&job)?;

        tracing::debug!(story_id = %job.id, "Job record restored as failed");
        Ok(job)
    }

    fn write(&self, job: &Job) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(job)?;
        storage::write_atomic(&self.layout.meta_path(&job.id), &bytes)?;
        Ok(())
    }

    /// Un panic en otro hilo no invalida el store: los datos viven en disco
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(id: &str) -> StoryError {
    StoryError::NotFound(format!("job not found: {}", id))
}

/// El ID es un nombre de directorio: un solo componente normal
fn is_safe_id(id: &str) -> bool {
    let mut components = Path::new(id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !id.contains(['/', '\\'])
}
