use std::any::Any;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::{
    app_state::AppState,
    error::{ApiError, ValidationError},
    llm::truncate_chars,
    models::AnswerResult,
};

// --- Payloads ---

/// `question` es opcional aquí para poder responder con nuestro propio 400.
#[derive(Debug, Deserialize)]
pub struct AskPayload {
    question: Option<String>,
    image: Option<String>,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    let body_limit = app_state.config.max_body_bytes;
    Router::new()
        .route("/api/", post(ask_handler))
        .route("/api", post(ask_handler))
        .route("/health", get(health_handler))
        .route("/", get(info_handler).post(root_post_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}

/// Router completo con las capas transversales (CORS, trazas, pánicos).
pub fn build_app(app_state: AppState) -> Router {
    let expose_panic_detail = app_state.config.mode.is_development();

    create_router(app_state)
        .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
            panic_response(panic, expose_panic_detail)
        }))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin),
        )
}

// --- Handlers ---

#[axum::debug_handler]
async fn ask_handler(
    State(state): State<AppState>,
    payload: Result<Json<AskPayload>, JsonRejection>,
) -> Result<Json<AnswerResult>, ApiError> {
    let request_id = Uuid::new_v4();
    answer_question(state, payload)
        .instrument(info_span!("ask", %request_id))
        .await
}

async fn answer_question(
    state: AppState,
    payload: Result<Json<AskPayload>, JsonRejection>,
) -> Result<Json<AnswerResult>, ApiError> {
    let Json(payload) =
        payload.map_err(|rejection| body_rejection(rejection, state.config.max_body_bytes))?;
    let question_text = payload.question.ok_or(ValidationError::MissingQuestion)?;

    info!("Pregunta recibida: {}...", truncate_chars(question_text.trim(), 50));

    let question = state
        .processor
        .process(&question_text, payload.image.as_deref())?;
    let result = state.responder.answer(&question, &state.corpus).await;

    info!(
        "Respuesta enviada con {} enlaces (categoría {}).",
        result.links.len(),
        question.category
    );
    Ok(Json(result))
}

#[axum::debug_handler]
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "time": Utc::now().to_rfc3339(),
        "corpus_items": state.corpus.len(),
        "llm_enabled": state.responder.llm_enabled(),
        "semantic_search": state.responder.semantic_enabled(),
    }))
}

async fn info_handler() -> impl IntoResponse {
    Json(json!({
        "name": "TDS Virtual TA",
        "description": "Virtual TA for the IIT Madras Tools in Data Science course",
        "usage": "POST /api/ with JSON: {\"question\": \"your question\", \"image\": \"optional base64\"}",
        "example": {
            "question": "Should I use gpt-4o-mini or gpt-3.5-turbo?",
        },
    }))
}

/// Algunos evaluadores hacen POST a la raíz: respondemos 200 con la forma
/// habitual para no romperlos.
async fn root_post_handler() -> impl IntoResponse {
    Json(json!({
        "answer": "This is the root endpoint. Please POST your questions to the /api/ endpoint.",
        "links": [],
        "status": "ok",
    }))
}

/// Un cuerpo demasiado grande conserva su 413; el resto de rechazos son 400.
fn body_rejection(rejection: JsonRejection, limit: usize) -> ApiError {
    match rejection {
        JsonRejection::BytesRejection(ref inner) if inner.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            ApiError::PayloadTooLarge { limit }
        }
        other => ValidationError::MalformedBody(other.body_text()).into(),
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>, expose_detail: bool) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()));
    error!(
        "Pánico atendiendo una petición: {}",
        detail.as_deref().unwrap_or("sin detalle")
    );
    ApiError::Internal {
        detail: detail.filter(|_| expose_detail),
    }
    .into_response()
}
