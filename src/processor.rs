//! Procesado de preguntas: normalización, palabras clave, categoría e imagen.
//!
//! El mismo tokenizador se usa para indexar el corpus, de modo que el
//! solapamiento de palabras clave compara términos normalizados igual.

use std::collections::BTreeSet;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

use crate::{
    caption::{ImageCaptioner, NoCaptioner},
    error::ValidationError,
    models::{Category, Question},
};

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "am", "an", "and", "any", "are", "as", "at",
    "be", "been", "before", "being", "below", "both", "but", "by", "can", "could", "did", "do",
    "does", "doing", "down", "during", "each", "either", "few", "for", "from", "further", "had",
    "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if", "in",
    "into", "is", "it", "its", "itself", "just", "me", "might", "more", "most", "must", "my",
    "need", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "our",
    "out", "over", "own", "same", "shall", "she", "should", "so", "some", "such", "than", "that",
    "the", "their", "them", "then", "there", "these", "they", "this", "those", "through", "to",
    "too", "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "whose", "why", "will", "with", "would", "you", "your", "yours",
];

/// Tablas de categoría, en orden de prioridad: gana la primera que coincide.
const CATEGORY_TABLES: &[(Category, &[&str])] = &[
    (
        Category::ModelApi,
        &[
            "gpt", "openai", "llm", "model", "models", "api", "ai", "chatgpt", "embedding",
            "embeddings", "token", "tokens", "proxy", "aiproxy",
        ],
    ),
    (
        Category::Installation,
        &[
            "install", "installation", "installing", "installed", "setup", "pip", "uv", "docker",
            "podman", "container", "containers", "venv", "environment", "windows", "mac", "macos",
            "linux", "configure",
        ],
    ),
    (
        Category::Troubleshooting,
        &[
            "error", "errors", "bug", "issue", "issues", "problem", "broken", "failing", "failed",
            "crash", "traceback", "exception",
        ],
    ),
    (
        Category::Assessment,
        &[
            "assignment", "assignments", "ga", "ga1", "ga2", "ga3", "ga4", "ga5", "ga6", "ga7",
            "project", "grading", "grade", "marks", "score", "bonus", "exam", "roe", "deadline",
            "submission", "submit", "dashboard",
        ],
    ),
    (
        Category::Tools,
        &[
            "vscode", "git", "github", "terminal", "bash", "shell", "editor", "python", "pandas",
            "numpy", "jupyter", "notebook", "scraping", "unicode", "markdown",
        ],
    ),
];

/// Minúsculas, puntuación fuera (salvo `-` y `.` dentro de un token) y
/// separación por espacios.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .map(|token| token.trim_matches(|c| c == '-' || c == '.'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Palabras clave de un texto: tokens sin stop words, más las partes de los
/// tokens compuestos (`gpt-4o-mini` aporta también `gpt`, `4o`, `mini`).
pub fn extract_keywords(text: &str) -> BTreeSet<String> {
    let mut keywords = BTreeSet::new();
    for token in tokenize(text) {
        if token.contains('-') {
            keywords.extend(
                token
                    .split('-')
                    .filter(|part| !part.is_empty() && !is_stop_word(part))
                    .map(str::to_string),
            );
        }
        if !is_stop_word(&token) {
            keywords.insert(token);
        }
    }
    keywords
}

pub fn classify(keywords: &BTreeSet<String>) -> Category {
    CATEGORY_TABLES
        .iter()
        .find(|(_, table)| table.iter().any(|word| keywords.contains(*word)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::General)
}

/// Decodifica base64, aceptando también el prefijo `data:<mime>;base64,`.
pub fn decode_image(encoded: &str) -> Option<Vec<u8>> {
    let trimmed = encoded.trim();
    let payload = match trimmed.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => trimmed,
    };
    if payload.is_empty() {
        return None;
    }
    // Saltos de línea habituales en base64 copiado a mano.
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact).ok()
}

/// Procesador de preguntas. Sin estado mutable: se comparte entre peticiones.
#[derive(Clone)]
pub struct QuestionProcessor {
    captioner: Arc<dyn ImageCaptioner>,
}

impl Default for QuestionProcessor {
    fn default() -> Self {
        Self::new(Arc::new(NoCaptioner))
    }
}

impl QuestionProcessor {
    pub fn new(captioner: Arc<dyn ImageCaptioner>) -> Self {
        Self { captioner }
    }

    pub fn process(&self, raw_text: &str, image: Option<&str>) -> Result<Question, ValidationError> {
        let raw_text = raw_text.trim();
        if raw_text.is_empty() {
            return Err(ValidationError::EmptyQuestion);
        }

        let normalized_text = tokenize(raw_text).join(" ");
        let mut keywords = extract_keywords(raw_text);
        let category = classify(&keywords);

        let image = image.and_then(|encoded| {
            let decoded = decode_image(encoded);
            if decoded.is_none() {
                debug!("Imagen adjunta no decodificable; se ignora.");
            }
            decoded
        });

        let image_caption = image.as_deref().and_then(|bytes| self.captioner.caption(bytes));
        if let Some(caption) = &image_caption {
            debug!("Descripción de imagen: {caption}");
            keywords.extend(extract_keywords(caption));
        }

        Ok(Question {
            raw_text: raw_text.to_string(),
            normalized_text,
            keywords,
            category,
            image,
            image_caption,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::{tests::png_header, LayoutCaptioner};

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn tokenize_strips_punctuation_but_keeps_model_names() {
        assert_eq!(
            tokenize("Should I use GPT-4o-mini, or gpt-3.5-turbo?!"),
            vec!["should", "i", "use", "gpt-4o-mini", "or", "gpt-3.5-turbo"]
        );
        assert_eq!(tokenize("...  --  "), Vec::<String>::new());
    }

    #[test]
    fn keywords_drop_stop_words_and_split_compounds() {
        let keywords = extract_keywords("Should I use gpt-4o-mini or gpt-3.5-turbo?");
        assert_eq!(
            keywords,
            set(&["3.5", "4o", "gpt", "gpt-3.5-turbo", "gpt-4o-mini", "mini", "turbo", "use"])
        );
    }

    #[test]
    fn stop_word_only_text_has_no_keywords() {
        assert!(extract_keywords("What is the...?").is_empty());
    }

    #[test]
    fn first_matching_category_wins() {
        // "model" (ModelApi) y "error" (Troubleshooting): gana ModelApi.
        assert_eq!(classify(&set(&["error", "model"])), Category::ModelApi);
        assert_eq!(classify(&set(&["install", "error"])), Category::Installation);
        assert_eq!(classify(&set(&["traceback"])), Category::Troubleshooting);
        assert_eq!(classify(&set(&["ga4", "bonus"])), Category::Assessment);
        assert_eq!(classify(&set(&["vscode"])), Category::Tools);
        assert_eq!(classify(&set(&["weather"])), Category::General);
    }

    #[test]
    fn process_rejects_blank_questions() {
        let processor = QuestionProcessor::default();
        assert_eq!(
            processor.process("   \n\t ", None).unwrap_err(),
            ValidationError::EmptyQuestion
        );
    }

    #[test]
    fn process_builds_question() {
        let processor = QuestionProcessor::default();
        let question = processor.process("  How do I install Podman on Windows?  ", None).unwrap();
        assert_eq!(question.raw_text, "How do I install Podman on Windows?");
        assert_eq!(question.normalized_text, "how do i install podman on windows");
        assert_eq!(question.keywords, set(&["install", "podman", "windows"]));
        assert_eq!(question.category, Category::Installation);
        assert!(question.image.is_none());
    }

    #[test]
    fn invalid_image_is_ignored_silently() {
        let processor = QuestionProcessor::new(Arc::new(LayoutCaptioner));
        let question = processor.process("docker help", Some("%%% not base64 %%%")).unwrap();
        assert!(question.image.is_none());
        assert!(question.image_caption.is_none());
    }

    #[test]
    fn caption_tokens_are_appended_to_keywords() {
        let encoded = format!("data:image/png;base64,{}", STANDARD.encode(png_header(1600, 900)));
        let processor = QuestionProcessor::new(Arc::new(LayoutCaptioner));
        let question = processor.process("what is this?", Some(&encoded)).unwrap();
        assert!(question.image.is_some());
        assert!(question.keywords.contains("dashboard"));
        assert!(question.keywords.contains("png"));
    }

    #[test]
    fn image_without_captioner_is_kept_but_not_described() {
        let encoded = STANDARD.encode(png_header(10, 10));
        let question = QuestionProcessor::default()
            .process("what is this?", Some(&encoded))
            .unwrap();
        assert!(question.image.is_some());
        assert!(question.image_caption.is_none());
        assert!(question.keywords.is_empty());
    }
}
