//! # Resultados
//! src/result/mod.rs

pub mod assembler;
pub mod types;

pub use assembler::ResultAssembler;
pub use types::{AssetSummary, AssetsSummary, PageView, ResultMeta, ServiceErrors, StoryResult};
