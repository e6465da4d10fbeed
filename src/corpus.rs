//! Corpus en memoria: contenido del curso + posts del foro.
//!
//! Se carga una sola vez al arrancar y después sólo se lee. Se construye
//! explícitamente y se comparte como `Arc<CorpusStore>` en el estado de axum.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::info;

use crate::{
    error::LoadError,
    models::{CorpusItem, CourseRecord, ForumRecord, Source},
    processor::extract_keywords,
};

/// Rutas de los dos ficheros JSON que produce el scraper.
#[derive(Debug, Clone)]
pub struct CorpusPaths {
    pub course_content: PathBuf,
    pub forum_posts: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct CorpusStore {
    items: Vec<CorpusItem>,
}

impl CorpusStore {
    /// Carga ambos ficheros. Cualquier fichero ausente o corrupto es fatal.
    pub fn load(paths: &CorpusPaths) -> Result<Self, LoadError> {
        let course: Vec<CourseRecord> = read_json(&paths.course_content)?;
        let forum: Vec<ForumRecord> = read_json(&paths.forum_posts)?;

        let store = Self::from_records(course, forum);
        info!(
            "📚 Corpus cargado: {} elementos del curso y {} posts del foro.",
            store.count_by(Source::Course),
            store.count_by(Source::Forum)
        );
        Ok(store)
    }

    /// Convierte los registros crudos en elementos del corpus, en orden de carga.
    pub fn from_records(course: Vec<CourseRecord>, forum: Vec<ForumRecord>) -> Self {
        let course_items = course
            .into_iter()
            .enumerate()
            .map(|(index, record)| course_item(index, record));
        let forum_items = forum
            .into_iter()
            .enumerate()
            .map(|(index, record)| forum_item(index, record));

        Self {
            items: course_items.chain(forum_items).collect(),
        }
    }

    /// Corpus de prueba construido a mano.
    pub fn from_items(items: Vec<CorpusItem>) -> Self {
        Self { items }
    }

    /// Recorre el corpus en orden de carga. Cada llamada empieza de nuevo.
    pub fn all(&self) -> impl Iterator<Item = &CorpusItem> + '_ {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count_by(&self, source: Source) -> usize {
        self.items.iter().filter(|item| item.source == source).count()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let raw = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => LoadError::Missing(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    serde_json::from_str(&raw).map_err(|source| LoadError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn course_item(index: usize, record: CourseRecord) -> CorpusItem {
    let keywords = extract_keywords(&format!("{} {}", record.title, record.content));
    CorpusItem {
        id: format!("{}-{}", Source::Course, index + 1),
        title: record.title,
        content: record.content,
        url: record.url,
        source: Source::Course,
        created_at: record.content_date.and_then(non_empty),
        username: None,
        keywords,
    }
}

fn forum_item(index: usize, record: ForumRecord) -> CorpusItem {
    let mut keywords = extract_keywords(&format!("{} {}", record.title, record.content));
    keywords.extend(
        record
            .keywords
            .iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty()),
    );
    CorpusItem {
        id: format!("{}-{}", Source::Forum, index + 1),
        title: record.title,
        content: record.content,
        url: record.url,
        source: Source::Forum,
        created_at: non_empty(record.created_at),
        username: non_empty(record.username),
        keywords,
    }
}
