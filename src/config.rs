//! Carga y gestión de configuración de la aplicación (servidor + LLM + scoring).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

/// Modo de ejecución del servicio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppMode {
    Development,
    Production,
}

impl AppMode {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(anyhow!("Modo de aplicación no soportado: {other}")),
        }
    }

    pub fn is_development(self) -> bool {
        self == Self::Development
    }

    /// Filtro de logs por defecto cuando no hay `RUST_LOG`.
    pub fn default_log_filter(self) -> &'static str {
        match self {
            Self::Development => "debug",
            Self::Production => "info",
        }
    }
}

/// Capacidad de descripción de imágenes seleccionada por configuración.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptionerKind {
    None,
    Layout,
}

impl CaptionerKind {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" | "off" | "" => Ok(Self::None),
            "layout" => Ok(Self::Layout),
            other => Err(anyhow!("Captioner de imágenes no soportado: {other}")),
        }
    }
}

/// Parámetros del ranking. Están afinados para una rúbrica de evaluación
/// concreta, por eso son configurables y no constantes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoringConfig {
    pub top_k: usize,
    pub max_links: usize,
    pub model_choice_bonus: u32,
    pub snippet_chars: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_links: 3,
            model_choice_bonus: 20,
            snippet_chars: 200,
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,
    pub mode: AppMode,

    pub openai_api_key: Option<String>,
    pub llm_chat_model: String,
    pub llm_embedding_model: String,
    pub llm_timeout: Duration,
    /// Búsqueda semántica con embeddings; requiere además la clave de API.
    pub semantic_search: bool,

    pub course_content_path: PathBuf,
    pub forum_posts_path: PathBuf,

    pub scoring: ScoringConfig,
    pub image_captioner: CaptionerKind,
    pub max_body_bytes: usize,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env`, pero leyendo de cualquier fuente clave → valor.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Valores vacíos cuentan como ausentes.
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mode = match get("APP_MODE") {
            Some(mode) => AppMode::from_str(&mode)?,
            None if get("DEBUG").is_some_and(|v| v.eq_ignore_ascii_case("true")) => {
                AppMode::Development
            }
            None => AppMode::Production,
        };

        let port: u16 = parse_or(&get, "PORT", 5000)?;
        let server_addr = get("SERVER_ADDR").unwrap_or_else(|| format!("0.0.0.0:{port}"));

        let openai_api_key = get("OPENAI_API_KEY");
        let llm_chat_model = get("LLM_CHAT_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string());
        let llm_embedding_model =
            get("LLM_EMBEDDING_MODEL").unwrap_or_else(|| "text-embedding-3-small".to_string());
        let llm_timeout = Duration::from_secs(parse_or(&get, "LLM_TIMEOUT_SECS", 20)?);
        let semantic_search = get("SEMANTIC_SEARCH").is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let course_content_path = get("COURSE_CONTENT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/course_content.json"));
        let forum_posts_path = get("FORUM_POSTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/discourse_posts.json"));

        let defaults = ScoringConfig::default();
        let scoring = ScoringConfig {
            top_k: parse_or(&get, "TOP_K", defaults.top_k)?,
            max_links: parse_or(&get, "MAX_LINKS", defaults.max_links)?,
            model_choice_bonus: parse_or(&get, "MODEL_CHOICE_BONUS", defaults.model_choice_bonus)?,
            snippet_chars: parse_or(&get, "SNIPPET_CHARS", defaults.snippet_chars)?,
        };
        if scoring.top_k == 0 {
            return Err(anyhow!("TOP_K debe ser mayor que 0"));
        }

        let image_captioner = match get("IMAGE_CAPTIONER") {
            Some(kind) => CaptionerKind::from_str(&kind)?,
            None => CaptionerKind::None,
        };
        let max_body_bytes = parse_or(&get, "MAX_BODY_BYTES", 10 * 1024 * 1024)?;

        Ok(Self {
            server_addr,
            mode,
            openai_api_key,
            llm_chat_model,
            llm_embedding_model,
            llm_timeout,
            semantic_search,
            course_content_path,
            forum_posts_path,
            scoring,
            image_captioner,
            max_body_bytes,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Valor inválido para {key}: {raw:?}")),
        None => Ok(default),
    }
}
