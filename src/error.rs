//! Taxonomía de errores del servicio y del scraper offline.
//!
//! - `ValidationError`: petición mal formada (→ 400).
//! - `ApiError::PayloadTooLarge`: cuerpo por encima de `MAX_BODY_BYTES` (→ 413).
//! - `UpstreamError`: fallo del LLM externo; el responder lo recupera con la
//!   respuesta de plantilla y nunca llega al cliente.
//! - `LoadError`: corpus ausente o corrupto al arrancar (fatal).
//! - `ScrapeError`: fallo de red/autenticación durante el scraping.

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing 'question' field")]
    MissingQuestion,

    #[error("The 'question' field must not be empty")]
    EmptyQuestion,

    #[error("Please send JSON data: {0}")]
    MalformedBody(String),
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("síntesis LLM deshabilitada (sin OPENAI_API_KEY)")]
    Disabled,

    #[error("el LLM no respondió en {0:?}")]
    Timeout(Duration),

    #[error("el LLM devolvió una respuesta vacía")]
    EmptyCompletion,

    #[error("error en la llamada al LLM: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no existe el fichero de corpus {}", .0.display())]
    Missing(PathBuf),

    #[error("no se pudo leer {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON mal formado en {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("faltan credenciales para {0}")]
    MissingCredentials(&'static str),

    #[error("autenticación rechazada por {site}: {reason}")]
    Auth { site: &'static str, reason: String },

    #[error("HTTP {status} al pedir {url}")]
    Status { url: String, status: u16 },

    #[error("no se extrajo ningún elemento de {0}")]
    Empty(&'static str),

    #[error("cabecera HTTP inválida: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("error de red: {0}")]
    Http(#[from] reqwest::Error),

    #[error("respuesta inesperada de {url}: {reason}")]
    Unexpected { url: String, reason: String },

    #[error("error de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("error de serialización: {0}")]
    Json(#[from] serde_json::Error),

    #[error("entrada interactiva fallida: {0}")]
    Prompt(#[from] dialoguer::Error),
}

impl ScrapeError {
    /// Timeouts, errores de conexión, 5xx y 429 merecen un reintento.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScrapeError::Http(e) => e.is_timeout() || e.is_connect(),
            ScrapeError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Error devuelto por los handlers HTTP.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Request body is too large (limit {limit} bytes)")]
    PayloadTooLarge { limit: usize },

    /// `detail` sólo se expone en modo desarrollo.
    #[error("Something went wrong")]
    Internal { detail: Option<String> },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(e) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response()
            }
            ApiError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, Json(json!({ "error": self.to_string() }))).into_response()
            }
            ApiError::Internal { detail } => {
                let body = match detail {
                    Some(message) => json!({ "error": "Something went wrong", "message": message }),
                    None => json!({ "error": "Something went wrong" }),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
