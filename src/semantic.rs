//! Búsqueda semántica opcional con embeddings de OpenAI (vía Rig).
//!
//! Sólo complementa el solapamiento de palabras clave: con la capacidad
//! deshabilitada (el valor por defecto) el ranking es exactamente el de
//! palabras clave.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rig::embeddings::EmbeddingModel; // <- para .embed_texts
use tokio::sync::RwLock;
use tracing::debug;

use crate::{config::AppConfig, error::UpstreamError};

/// Similitud coseno mínima para que un documento sume puntos.
pub const MIN_SIMILARITY: f64 = 0.3;

/// Escala de la similitud [0, 1] a la misma escala entera que el solapamiento.
const POINTS_PER_UNIT: f64 = 10.0;

/// Documento a comparar: id estable (para cachear) + texto.
#[derive(Debug, Clone, Copy)]
pub struct Document<'a> {
    pub id: &'a str,
    pub text: &'a str,
}

/// Capacidad de similitud semántica pregunta ↔ documentos.
#[async_trait]
pub trait SemanticScorer: Send + Sync {
    fn is_enabled(&self) -> bool {
        true
    }

    /// Una similitud en [-1, 1] por documento, en el mismo orden.
    async fn similarities(
        &self,
        query: &str,
        documents: &[Document<'_>],
    ) -> Result<Vec<f64>, UpstreamError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledScorer;

#[async_trait]
impl SemanticScorer for DisabledScorer {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn similarities(
        &self,
        _query: &str,
        _documents: &[Document<'_>],
    ) -> Result<Vec<f64>, UpstreamError> {
        Err(UpstreamError::Disabled)
    }
}

/// Embeddings de OpenAI. Los vectores del corpus se calculan una vez y se
/// guardan por id; cada pregunta sólo embebe su propio texto.
pub struct OpenAiEmbeddingScorer {
    client: rig::providers::openai::Client,
    embedding_model: String,
    cache: RwLock<HashMap<String, Vec<f64>>>,
}

impl OpenAiEmbeddingScorer {
    pub fn new(api_key: &str, embedding_model: &str) -> Self {
        use rig::providers::openai::{self, TEXT_EMBEDDING_3_SMALL};

        Self {
            client: openai::Client::new(api_key),
            embedding_model: if embedding_model.is_empty() {
                TEXT_EMBEDDING_3_SMALL.to_string()
            } else {
                embedding_model.to_string()
            },
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f64>>, UpstreamError> {
        // Trait para client.embedding_model(...)
        use rig::client::EmbeddingsClient as _;

        let expected = texts.len();
        let model = self.client.embedding_model(&self.embedding_model);
        let embeddings = model
            .embed_texts(texts)
            .await
            .map_err(|e| UpstreamError::Request(e.to_string()))?;

        if embeddings.len() != expected {
            return Err(UpstreamError::Request(format!(
                "Número de embeddings ({}) distinto al de textos ({expected})",
                embeddings.len()
            )));
        }
        Ok(embeddings.into_iter().map(|e| e.vec).collect())
    }
}

#[async_trait]
impl SemanticScorer for OpenAiEmbeddingScorer {
    async fn similarities(
        &self,
        query: &str,
        documents: &[Document<'_>],
    ) -> Result<Vec<f64>, UpstreamError> {
        let missing: Vec<Document<'_>> = {
            let cache = self.cache.read().await;
            documents
                .iter()
                .filter(|doc| !cache.contains_key(doc.id))
                .copied()
                .collect()
        };

        if !missing.is_empty() {
            debug!("Calculando {} embeddings del corpus", missing.len());
            let vectors = self
                .embed(missing.iter().map(|doc| doc.text.to_string()).collect())
                .await?;
            let mut cache = self.cache.write().await;
            for (doc, vector) in missing.iter().zip(vectors) {
                cache.insert(doc.id.to_string(), vector);
            }
        }

        let query_vector = self
            .embed(vec![query.to_string()])
            .await?
            .pop()
            .ok_or(UpstreamError::EmptyCompletion)?;

        let cache = self.cache.read().await;
        Ok(documents
            .iter()
            .map(|doc| {
                cache
                    .get(doc.id)
                    .map_or(0.0, |vector| cosine_similarity(&query_vector, vector))
            })
            .collect())
    }
}

/// Sin clave o sin `SEMANTIC_SEARCH=true`, deshabilitado.
pub fn scorer_from_config(cfg: &AppConfig) -> Arc<dyn SemanticScorer> {
    match cfg.openai_api_key.as_deref() {
        Some(key) if cfg.semantic_search => {
            Arc::new(OpenAiEmbeddingScorer::new(key, &cfg.llm_embedding_model))
        }
        _ => Arc::new(DisabledScorer),
    }
}

pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Puntos enteros para el ranking; 0 por debajo de `MIN_SIMILARITY`.
pub fn similarity_points(similarity: f64) -> u32 {
    if !similarity.is_finite() || similarity < MIN_SIMILARITY {
        return 0;
    }
    (similarity.min(1.0) * POINTS_PER_UNIT).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_parallel_and_orthogonal_vectors() {
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn points_ignore_weak_or_invalid_similarities() {
        assert_eq!(similarity_points(0.29), 0);
        assert_eq!(similarity_points(-1.0), 0);
        assert_eq!(similarity_points(f64::NAN), 0);
        assert_eq!(similarity_points(0.84), 8);
        assert_eq!(similarity_points(1.5), 10);
    }

    #[test]
    fn scorer_needs_key_and_flag() {
        let without_flag = AppConfig::from_lookup(|key| {
            (key == "OPENAI_API_KEY").then(|| "sk-test".to_string())
        })
        .unwrap();
        assert!(!scorer_from_config(&without_flag).is_enabled());

        let without_key = AppConfig::from_lookup(|key| {
            (key == "SEMANTIC_SEARCH").then(|| "true".to_string())
        })
        .unwrap();
        assert!(!scorer_from_config(&without_key).is_enabled());

        let enabled = AppConfig::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "SEMANTIC_SEARCH" => Some("true".to_string()),
            _ => None,
        })
        .unwrap();
        assert!(scorer_from_config(&enabled).is_enabled());
    }

    #[tokio::test]
    async fn disabled_scorer_reports_disabled() {
        let docs = [Document { id: "course-1", text: "pip" }];
        let err = DisabledScorer.similarities("pip", &docs).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Disabled));
    }
}
