//! # Layout de Outputs
//! src/storage.rs
//!
//! Todo lo que un job deja en disco vive bajo su run directory:
//!
//! ```text
//! outputs/
//! └── <story_id>/
//!     ├── meta.json                  registro del job
//!     ├── story_<model>.json         artefacto primario
//!     ├── audio/
//!     │   ├── manifest.json
//!     │   ├── 01_<idioma>/page_NN_primary.wav
//!     │   └── 02_<idioma>/page_NN_secondary.wav
//!     └── illustrations/
//!         ├── manifest.json
//!         └── page_NN.<ext>
//! ```

use crate::error::Result;
use chrono::Local;
use regex::Regex;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

pub const META_FILE_NAME: &str = "meta.json";
pub const MANIFEST_FILE_NAME: &str = "manifest.json";
pub const AUDIO_DIR_NAME: &str = "audio";
pub const ILLUSTRATIONS_DIR_NAME: &str = "illustrations";

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"))
}

/// Minúsculas, todo lo no alfanumérico colapsado a `-`, sin guiones en los bordes
pub fn slugify(text: &str) -> String {
    slug_pattern()
        .replace_all(&text.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// Slug para nombres de idioma; nunca vacío
pub fn slugify_language_name(text: &str) -> String {
    let slug = slugify(text);
    if slug.is_empty() {
        "language".to_string()
    } else {
        slug
    }
}

/// Prefijo de los archivos de ilustración de una página (`page_NN.`)
pub fn page_asset_prefix(page_number: u32) -> String {
    format!("page_{:02}.", page_number)
}

/// Escribe `bytes` de forma atómica: archivo temporal + rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_extension("tmp");
    {
        let file = fs::File::create(&temp_path)?;
        let mut writer = std::io::BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
    }
    // Renombrar (atómico en sistemas Unix)
    fs::rename(&temp_path, path)
}

/// `true` si `path` es un archivo regular no vacío
pub fn is_non_empty_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

/// Rol de un archivo de audio dentro de la página
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioRole {
    Primary,
    Secondary,
}

impl AudioRole {
    pub const ALL: [AudioRole; 2] = [AudioRole::Primary, AudioRole::Secondary];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioRole::Primary => "primary",
            AudioRole::Secondary => "secondary",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "primary" => Some(AudioRole::Primary),
            "secondary" => Some(AudioRole::Secondary),
            _ => None,
        }
    }

    /// Prefijo numérico del directorio de idioma (`01_`, `02_`)
    fn dir_index(&self) -> u8 {
        match self {
            AudioRole::Primary => 1,
            AudioRole::Secondary => 2,
        }
    }
}

/// Resolución de rutas y URLs bajo el directorio de outputs
#[derive(Debug, Clone)]
pub struct OutputLayout {
    outputs_dir: PathBuf,
    static_prefix: String,
}

impl OutputLayout {
    pub fn new(outputs_dir: impl Into<PathBuf>, static_prefix: &str) -> Self {
        Self {
            outputs_dir: outputs_dir.into(),
            static_prefix: static_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(config.outputs_dir.clone(), &config.static_outputs_prefix)
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }

    /// Crea el directorio de outputs si no existe
    pub fn ensure_outputs_dir(&self) -> Result<&Path> {
        fs::create_dir_all(&self.outputs_dir)?;
        Ok(&self.outputs_dir)
    }

    pub fn run_dir(&self, story_id: &str) -> PathBuf {
        self.outputs_dir.join(story_id)
    }

    pub fn meta_path(&self, story_id: &str) -> PathBuf {
        self.run_dir(story_id).join(META_FILE_NAME)
    }

    /// Genera un ID `YYYYmmdd_HHMMSS_story_<slug>` y reserva su run
    /// directory.
    ///
    /// La reserva es `fs::create_dir`: si otro hilo o proceso ganó el
    /// nombre se prueba el siguiente sufijo, así que dos llamadas nunca
    /// retornan el mismo ID.
    pub fn make_story_id(&self, child_name: &str, theme: &str) -> Result<String> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let source = [child_name.trim(), theme.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("-");
        let mut slug = slugify(&source);
        if slug.is_empty() {
            slug = "story".to_string();
        }
        let base = format!("{}_story_{}", timestamp, slug);

        self.ensure_outputs_dir()?;
        let mut story_id = base.clone();
        let mut suffix = 1;
        loop {
            match fs::create_dir(self.run_dir(&story_id)) {
                Ok(()) => return Ok(story_id),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    story_id = format!("{}-{:02}", base, suffix);
                    suffix += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Ruta relativa a outputs del audio esperado para una página
    pub fn audio_relative_path(
        &self,
        story_id: &str,
        role: AudioRole,
        language: &str,
        page_number: u32,
    ) -> PathBuf {
        Path::new(story_id)
            .join(AUDIO_DIR_NAME)
            .join(format!(
                "{:02}_{}",
                role.dir_index(),
                slugify_language_name(language)
            ))
            .join(format!("page_{:02}_{}.wav", page_number, role.as_str()))
    }

    /// URL estática para una ruta relativa a outputs
    pub fn static_url_for_relative(&self, relative: &Path) -> String {
        format!("{}/{}", self.static_prefix, to_posix(relative))
    }

    /// URL estática para `path`, si está dentro de outputs
    pub fn to_static_url(&self, path: &Path) -> Option<String> {
        let outputs = absolutize(&self.outputs_dir);
        let target = absolutize(path);
        let relative = target.strip_prefix(&outputs).ok()?;
        Some(self.static_url_for_relative(relative))
    }

    /// Resuelve la ruta declarada por un manifest contra las ubicaciones
    /// candidatas; solo retorna archivos regulares existentes
    pub fn resolve_manifest_asset_path(&self, run_dir: &Path, raw_path: &str) -> Option<PathBuf> {
        let normalized = raw_path.trim().replace('\\', "/");
        if normalized.is_empty() {
            return None;
        }

        let candidate = PathBuf::from(&normalized);
        let mut candidates = Vec::new();

        if candidate.is_absolute() {
            candidates.push(candidate);
        } else {
            candidates.push(run_dir.join(&candidate));
            candidates.push(self.outputs_dir.join(&candidate));

            let outputs_name = self.outputs_dir.file_name();
            let first = candidate.components().next();
            if let (Some(name), Some(Component::Normal(first))) = (outputs_name, first) {
                if name == first {
                    if let Some(parent) = self.outputs_dir.parent() {
                        candidates.push(parent.join(&candidate));
                    }
                }
            }
        }

        candidates.into_iter().find(|path| path.is_file())
    }

    /// Primer archivo `page_NN.*` no vacío del directorio de ilustraciones,
    /// en orden lexicográfico
    pub fn first_existing_illustration(&self, run_dir: &Path, page_number: u32) -> Option<PathBuf> {
        let dir = run_dir.join(ILLUSTRATIONS_DIR_NAME);
        let entries = fs::read_dir(&dir).ok()?;

        let prefix = page_asset_prefix(page_number);
        let mut matches: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map(|name| name.starts_with(&prefix))
                    .unwrap_or(false)
            })
            .map(|entry| entry.path())
            .collect();
        matches.sort();

        matches.into_iter().find(|path| is_non_empty_file(path))
    }
}

fn to_posix(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Ruta absoluta y canónica cuando es posible
fn absolutize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
