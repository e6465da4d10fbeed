use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use virtual_ta_webapp::{
    api,
    app_state::AppState,
    config::AppConfig,
    corpus::{CorpusPaths, CorpusStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Cargar .env y configuración
    dotenvy::dotenv().ok();
    let cfg = AppConfig::from_env().context("Error al cargar la configuración")?;

    // 2. Inicializar logging (RUST_LOG manda; si no, según el modo)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.mode.default_log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // 3. Cargar el corpus: si falta o está corrupto, no se sirve nada
    let corpus = CorpusStore::load(&CorpusPaths {
        course_content: cfg.course_content_path.clone(),
        forum_posts: cfg.forum_posts_path.clone(),
    })
    .context("Error al cargar el corpus")?;

    if cfg.openai_api_key.is_none() {
        warn!("⚠ Sin OPENAI_API_KEY: se responderá siempre con la plantilla.");
        if cfg.semantic_search {
            warn!("⚠ SEMANTIC_SEARCH ignorado: requiere OPENAI_API_KEY.");
        }
    } else if cfg.semantic_search {
        info!("🧭 Búsqueda semántica con {}", cfg.llm_embedding_model);
    }

    // 4. Estado compartido y router
    let app_state = AppState::new(cfg, corpus);
    let server_addr = app_state.config.server_addr.clone();
    let app = api::build_app(app_state);

    // 5. Iniciar el servidor
    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {server_addr}"))?;
    info!("🚀 Servidor escuchando en http://{}", server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await
        .context("Error en el servidor HTTP")?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}
