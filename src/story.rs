//! # Artefacto Primario (Story)
//! src/story.rs
//!
//! El cuento generado: títulos, idiomas y exactamente 24 páginas con
//! texto en ambos idiomas y los prompts de ilustración.
//!
//! Se escribe una vez como `story_<modelo>.json` en el run directory y se
//! lee muchas veces al reconstruir resultados.

use crate::error::{Result, StoryError};
use crate::storage::{self, OutputLayout};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Cantidad fija de páginas por cuento
pub const PAGE_COUNT: usize = 24;

const STORY_FILE_PREFIX: &str = "story_";
const STORY_FILE_SUFFIX: &str = ".json";

/// Una página del cuento
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_number: u32,
    pub text_primary: String,
    pub text_secondary: String,
    pub illustration_prompt: String,
    #[serde(default)]
    pub illustration_scene_prompt: String,
}

/// Cuento completo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub title_primary: String,
    pub title_secondary: String,
    pub author_name: String,
    pub primary_language: String,
    pub secondary_language: String,
    pub image_style: String,
    pub main_character_design: String,
    pub pages: Vec<Page>,
}

impl Story {
    /// Verifica el contrato de páginas: 24 páginas numeradas 1..=24 en orden
    pub fn validate(&self) -> Result<()> {
        if self.pages.len() != PAGE_COUNT {
            return Err(StoryError::InvalidData(format!(
                "Story must have exactly {} pages, but got {}",
                PAGE_COUNT,
                self.pages.len()
            )));
        }
        for (index, page) in self.pages.iter().enumerate() {
            let expected = index as u32 + 1;
            if page.page_number != expected {
                return Err(StoryError::InvalidData(format!(
                    "Page {} has page_number {}",
                    expected, page.page_number
                )));
            }
        }
        Ok(())
    }
}

/// Escribe el artefacto primario en el run directory
pub fn write_story_json(
    layout: &OutputLayout,
    story_id: &str,
    story: &Story,
    story_model: &str,
) -> Result<PathBuf> {
    let run_dir = layout.run_dir(story_id);
    fs::create_dir_all(&run_dir)?;

    let path = run_dir.join(format!("{}{}{}", STORY_FILE_PREFIX, story_model, STORY_FILE_SUFFIX));
    let bytes = serde_json::to_vec_pretty(story)?;
    storage::write_atomic(&path, &bytes)?;
    Ok(path)
}

/// Primer `story_*.json` (orden lexicográfico) del run directory
pub fn find_story_json_path(run_dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(run_dir).ok()?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(STORY_FILE_PREFIX) && name.ends_with(STORY_FILE_SUFFIX))
                .unwrap_or(false)
        })
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// Texto de una página tal como se lee del disco
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub page_number: u32,
    pub text_primary: String,
    pub text_secondary: String,
    pub illustration_prompt: String,
    pub illustration_scene_prompt: String,
}

/// Vista tolerante del artefacto primario para el lado de lectura
#[derive(Debug, Clone, PartialEq)]
pub struct StoryDocument {
    pub title_primary: String,
    pub title_secondary: String,
    pub primary_language: String,
    pub secondary_language: String,
    pub pages: Vec<PageText>,
}

impl StoryDocument {
    /// Lee y valida la forma mínima del artefacto.
    ///
    /// Solo `pages` es obligatorio; páginas que no son objetos se omiten y
    /// un `page_number` inválido se reemplaza por la posición (1-based).
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| StoryError::InvalidData(format!("story json is not valid JSON: {}", e)))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let pages = value
            .get("pages")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                StoryError::InvalidData("story json is missing a valid 'pages' list".to_string())
            })?;

        let pages = pages
            .iter()
            .enumerate()
            .filter(|(_, page)| page.is_object())
            .map(|(index, page)| PageText {
                page_number: page_number_of(page).unwrap_or(index as u32 + 1),
                text_primary: string_field(page, "text_primary"),
                text_secondary: string_field(page, "text_secondary"),
                illustration_prompt: string_field(page, "illustration_prompt"),
                illustration_scene_prompt: string_field(page, "illustration_scene_prompt"),
            })
            .collect();

        Ok(Self {
            title_primary: string_field(value, "title_primary"),
            title_secondary: string_field(value, "title_secondary"),
            primary_language: string_field(value, "primary_language"),
            secondary_language: string_field(value, "secondary_language"),
            pages,
        })
    }

    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.iter().map(|p| p.page_number).collect()
    }
}

fn page_number_of(page: &Value) -> Option<u32> {
    match page.get("page_number")? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
