//! # Assets por Página
//! src/assets/mod.rs
//!
//! Estado, manifests y reconciliación de los sub-assets opcionales
//! (audio y ilustraciones).

pub mod manifest;
pub mod reconciler;
pub mod status;

pub use manifest::{load_manifest, LoadedManifest, ManifestCounts, ManifestEntry, SubsystemManifest};
pub use reconciler::{AssetReconciler, AssetTask, Reconciliation, TaskSource};
pub use status::AssetStatus;
