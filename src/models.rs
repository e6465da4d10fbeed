//! Modelos de dominio (corpus, preguntas, ranking y respuesta de la API).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Origen de un elemento del corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Course,
    Forum,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Course => "course",
            Source::Forum => "forum",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registro de `course_content.json` tal como lo escribe el scraper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub title: String,
    pub content: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_date: Option<String>,
}

/// Registro de `discourse_posts.json` tal como lo escribe el scraper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumRecord {
    pub title: String,
    pub content: String,
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Elemento del corpus, inmutable tras la carga.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusItem {
    /// `"<source>-<n>"`, único dentro de su colección.
    pub id: String,
    pub title: String,
    pub content: String,
    pub url: String,
    pub source: Source,
    /// Marca temporal tal cual aparece en el fichero.
    pub created_at: Option<String>,
    pub username: Option<String>,
    /// Siempre en minúsculas.
    pub keywords: BTreeSet<String>,
}

/// Categoría gruesa de la pregunta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ModelApi,
    Installation,
    Troubleshooting,
    Assessment,
    Tools,
    General,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::ModelApi => "model_api",
            Category::Installation => "installation",
            Category::Troubleshooting => "troubleshooting",
            Category::Assessment => "assessment",
            Category::Tools => "tools",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pregunta procesada; vive lo que dura la petición.
#[derive(Debug, Clone)]
pub struct Question {
    pub raw_text: String,
    pub normalized_text: String,
    pub keywords: BTreeSet<String>,
    pub category: Category,
    pub image: Option<Vec<u8>>,
    pub image_caption: Option<String>,
}

/// Elemento puntuado durante el ranking.
#[derive(Debug, Clone, Copy)]
pub struct ScoredMatch<'a> {
    pub item: &'a CorpusItem,
    pub score: u32,
    /// Posición de carga, para desempates estables.
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub text: String,
}

/// Cuerpo de respuesta de `POST /api/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub links: Vec<Link>,
}
