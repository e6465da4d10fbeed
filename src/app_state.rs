use std::sync::Arc;

use crate::{
    caption::captioner_for, config::AppConfig, corpus::CorpusStore, processor::QuestionProcessor,
    responder::Responder,
};

/// Estado compartido por los handlers. Todo es de sólo lectura tras el
/// arranque, así que no hace falta ningún lock.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub corpus: Arc<CorpusStore>,
    pub processor: Arc<QuestionProcessor>,
    pub responder: Arc<Responder>,
}

impl AppState {
    /// Monta el estado a partir de la configuración y un corpus ya cargado.
    pub fn new(config: AppConfig, corpus: CorpusStore) -> Self {
        let processor = QuestionProcessor::new(captioner_for(config.image_captioner));
        let responder = Responder::from_config(&config);
        Self::with_parts(config, corpus, processor, responder)
    }

    /// Para pruebas: permite inyectar un responder con otro sintetizador.
    pub fn with_parts(
        config: AppConfig,
        corpus: CorpusStore,
        processor: QuestionProcessor,
        responder: Responder,
    ) -> Self {
        Self {
            config: Arc::new(config),
            corpus: Arc::new(corpus),
            processor: Arc::new(processor),
            responder: Arc::new(responder),
        }
    }
}
