//! Abstracción sobre Rig para sintetizar la respuesta con un LLM externo.
//!
//! La síntesis es opcional: sin `OPENAI_API_KEY` se usa `DisabledSynthesizer`
//! y el responder contesta siempre con su plantilla determinista.

use std::sync::Arc;

use async_trait::async_trait;
use rig::completion::Prompt;

use crate::{
    config::AppConfig,
    error::UpstreamError,
    models::{Question, ScoredMatch},
};

const SYSTEM_PROMPT: &str = r#"
You are a helpful teaching assistant for the IIT Madras "Tools in Data Science" (TDS) course.
Answer the student's question clearly and concisely, using only the course material and forum
posts supplied in the context. If the context does not contain the answer, say so and give
general guidance on where to look.
"#;

/// Máximo de caracteres de cada candidato que se mandan como contexto.
const CONTEXT_CHARS_PER_ITEM: usize = 1500;

/// Prompt ya montado: contexto (candidatos) + pregunta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisPrompt {
    pub context: String,
    pub question: String,
}

impl SynthesisPrompt {
    pub fn build(question: &Question, candidates: &[ScoredMatch<'_>]) -> Self {
        let context_parts: Vec<String> = candidates
            .iter()
            .map(|candidate| {
                format!(
                    "Title: {}\nSource: {}\nURL: {}\nContent: {}",
                    candidate.item.title,
                    candidate.item.source,
                    candidate.item.url,
                    truncate_chars(&candidate.item.content, CONTEXT_CHARS_PER_ITEM)
                )
            })
            .collect();

        let mut question_text = format!(
            "Student question ({} question): {}",
            question.category, question.raw_text
        );
        if let Some(caption) = &question.image_caption {
            question_text.push_str(&format!("\nAttached image: {caption}"));
        }

        Self {
            context: format!(
                "Context from course materials and forum posts:\n\n{}",
                context_parts.join("\n\n---\n\n")
            ),
            question: question_text,
        }
    }
}

/// Capacidad de síntesis de respuestas.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn synthesize(&self, prompt: &SynthesisPrompt) -> Result<String, UpstreamError>;
}

/// Sin clave de API: nunca llama a nadie.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSynthesizer;

#[async_trait]
impl AnswerSynthesizer for DisabledSynthesizer {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn synthesize(&self, _prompt: &SynthesisPrompt) -> Result<String, UpstreamError> {
        Err(UpstreamError::Disabled)
    }
}

/// Síntesis con la API de chat de OpenAI a través de Rig.
pub struct OpenAiSynthesizer {
    client: rig::providers::openai::Client,
    chat_model: String,
}

impl OpenAiSynthesizer {
    pub fn new(api_key: &str, chat_model: &str) -> Self {
        use rig::providers::openai;

        Self {
            client: openai::Client::new(api_key),
            chat_model: if chat_model.is_empty() {
                "gpt-3.5-turbo".to_string()
            } else {
                chat_model.to_string()
            },
        }
    }
}

#[async_trait]
impl AnswerSynthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, prompt: &SynthesisPrompt) -> Result<String, UpstreamError> {
        // Trait para client.agent(...)
        use rig::client::CompletionClient as _;

        let agent = self
            .client
            .agent(&self.chat_model)
            .preamble(SYSTEM_PROMPT)
            .context(&prompt.context)
            .max_tokens(400)
            .temperature(0.7)
            .build();

        let answer = agent
            .prompt(prompt.question.as_str())
            .await
            .map_err(|e| UpstreamError::Request(e.to_string()))?;

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(UpstreamError::EmptyCompletion);
        }
        Ok(answer.to_string())
    }
}

/// Elige el sintetizador según la configuración: sin clave, deshabilitado.
pub fn synthesizer_from_config(cfg: &AppConfig) -> Arc<dyn AnswerSynthesizer> {
    match cfg.openai_api_key.as_deref() {
        Some(key) => Arc::new(OpenAiSynthesizer::new(key, &cfg.llm_chat_model)),
        None => Arc::new(DisabledSynthesizer),
    }
}

/// Corta en frontera de carácter, nunca en mitad de un UTF-8.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
