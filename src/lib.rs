//! # Story Jobs
//! src/lib.rs
//!
//! Motor de ciclo de vida de jobs y capa de reconciliación de resultados
//! para cuentos bilingües ilustrados (texto, narración e ilustraciones).
//!
//! ## Arquitectura
//!
//! - `jobs`: registro durable (`JobStore`) y orquestación (`JobRunner`)
//! - `assets`: manifests de cada subsistema y reconciliación con el disco
//! - `result`: documento de resultado, recalculado en cada lectura
//! - `story`: artefacto primario (24 páginas)
//! - `storage`: layout del run directory, IDs y URLs estáticas
//! - `generators`: contratos de las etapas externas
//! - `request`: payload del cliente y su validación
//! - `api`: contrato de status/result para la capa de transporte
//! - `config`, `logging`, `error`: stack transversal
//!
//! ## Ejemplo de uso
//!
//! ```ignore
//! use story_jobs::api::StoryApi;
//! use story_jobs::config::Config;
//!
//! let api = StoryApi::from_config(&Config::default(), generators);
//! let accepted = api.submit(payload);
//! let status = api.status(accepted.body["id"].as_str().unwrap());
//! ```

pub mod api;
pub mod assets;
pub mod config;
pub mod error;
pub mod generators;
pub mod jobs;
pub mod logging;
pub mod request;
pub mod result;
pub mod storage;
pub mod story;

pub use error::{Result, StoryError};
