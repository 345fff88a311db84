use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Config, RetrievalConfig};
use crate::embeddings::{DocumentProcessor, Embedder, FlatL2Index};
use crate::llm::{LLMProviderConfig, LLM};
use crate::rag::prompt;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RagOptions {
    pub top_k: usize,
    pub context_chars: usize,
    pub fallback_chars: usize,
}

impl Default for RagOptions {
    fn default() -> Self {
        Self {
            top_k: 3,
            context_chars: 3000,
            fallback_chars: 2000,
        }
    }
}

impl From<&RetrievalConfig> for RagOptions {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            top_k: config.top_k,
            context_chars: config.context_chars,
            fallback_chars: config.fallback_chars,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RetrievedChunk {
    /// Page index within the document
    pub index: usize,
    pub text: String,
    pub distance: f32,
}

/// Where the answer text came from
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    /// Generated by the language model
    Model,
    /// The model call failed; raw retrieved text
    Fallback,
    /// No model configured; raw retrieved text
    Offline,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub content: String,
    pub source: AnswerSource,
    pub chunks: Vec<RetrievedChunk>,
}

pub struct RagEngine {
    chunks: Vec<String>,
    embedder: Arc<dyn Embedder>,
    index: FlatL2Index,
    llm: Option<LLM>,
    options: RagOptions,
}

impl RagEngine {
    /// Embed every chunk and index it
    pub fn build(
        chunks: Vec<String>,
        embedder: Box<dyn Embedder>,
        llm: Option<LLM>,
        options: RagOptions,
    ) -> AppResult<Self> {
        if chunks.is_empty() {
            return Err(AppError::Index("Cannot build an index without chunks".to_string()));
        }

        info!(
            chunks = chunks.len(),
            embedder = embedder.name(),
            "Embedding document chunks"
        );
        let embeddings = embedder.embed(&chunks)?;
        if embeddings.len() != chunks.len() {
            return Err(AppError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut index = FlatL2Index::new(embedder.dimension());
        index.add(&embeddings)?;

        info!(
            vectors = index.len(),
            dimension = index.dimension(),
            llm = llm.as_ref().map(|l| l.model()).unwrap_or("none"),
            "Index built"
        );

        Ok(Self {
            chunks,
            embedder: Arc::from(embedder),
            index,
            llm,
            options,
        })
    }

    /// Load the document (one chunk per page) and build the engine over it
    pub fn from_document(
        path: &Path,
        embedder: Box<dyn Embedder>,
        llm: Option<LLM>,
        options: RagOptions,
    ) -> AppResult<Self> {
        let pages = DocumentProcessor::load_pages(path)?;
        Self::build(pages, embedder, llm, options)
    }

    /// Build everything the configuration describes
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let embedder = crate::embeddings::embedder_from_config(&config.embedding)?;
        let llm = match config.llm.api_key() {
            Some(api_key) => Some(LLM::new(LLMProviderConfig {
                name: config.llm.provider.clone(),
                api_key: api_key.to_string(),
                model: config.llm.model.clone(),
                api_base: Some(config.llm.api_base.clone()),
            })?),
            None => {
                warn!("No LLM API key configured, answers will contain retrieved text only");
                None
            }
        };
        Self::from_document(
            &config.document.path,
            embedder,
            llm,
            RagOptions::from(&config.retrieval),
        )
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn options(&self) -> RagOptions {
        self.options
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// The `min(top_k, chunk_count)` chunks nearest to the query
    pub fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedChunk>> {
        let query_embedding = self.embedder.embed_one(query)?;
        self.nearest(&query_embedding, top_k)
    }

    /// Same as [`retrieve`](Self::retrieve), with the model inference moved
    /// off the async worker threads
    pub async fn retrieve_blocking(
        &self,
        query: &str,
        top_k: usize,
    ) -> AppResult<Vec<RetrievedChunk>> {
        let embedder = Arc::clone(&self.embedder);
        let query = query.to_string();
        let query_embedding = tokio::task::spawn_blocking(move || embedder.embed_one(&query))
            .await
            .map_err(|e| AppError::Internal(format!("Query embedding task failed: {}", e)))??;
        self.nearest(&query_embedding, top_k)
    }

    fn nearest(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<RetrievedChunk>> {
        let hits = self.index.search(query_embedding, top_k)?;

        debug!(top_k, hits = hits.len(), "Retrieved chunks");

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                index: hit.index,
                text: self.chunks[hit.index].clone(),
                distance: hit.distance,
            })
            .collect())
    }

    pub async fn ask(&self, question: &str) -> AppResult<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidRequest("Question must not be empty".to_string()));
        }

        let chunks = self.retrieve_blocking(question, self.options.top_k).await?;
        let context = prompt::join_context(chunks.iter().map(|c| c.text.as_str()));

        let Some(llm) = &self.llm else {
            return Ok(Answer {
                content: prompt::offline_answer(&context, self.options.fallback_chars),
                source: AnswerSource::Offline,
                chunks,
            });
        };

        let request = LLMRequest {
            provider: llm.provider_name().to_string(),
            model: llm.model().to_string(),
            messages: vec![LLMMessage::user(prompt::build_prompt(
                &context,
                question,
                self.options.context_chars,
            ))],
            max_tokens: None,
            temperature: None,
            system_instruction: None,
        };

        match llm.create_chat_completion(&request).await {
            Ok(response) => {
                info!(
                    finish_reason = %response.finish_reason,
                    total_tokens = response.usage.total_tokens,
                    "Model answered"
                );
                Ok(Answer {
                    content: response.content,
                    source: AnswerSource::Model,
                    chunks,
                })
            }
            Err(e) => {
                warn!(error = %e, "Model call failed, answering with retrieved text");
                Ok(Answer {
                    content: prompt::fallback_answer(&context, self.options.fallback_chars),
                    source: AnswerSource::Fallback,
                    chunks,
                })
            }
        }
    }

    /// Check the model API is reachable; trivially fine when no model is loaded
    pub async fn check_connection(&self) -> AppResult<()> {
        match &self.llm {
            Some(llm) => llm.check_connection().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::llm::LLMAdapter;
    use crate::types::{LLMResponse, TokenUsage};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    pub(crate) fn policy_pages() -> Vec<String> {
        vec![
            "Water damage from burst pipes is covered up to the dwelling limit.".to_string(),
            "To file a claim for roof damage call the claims line within 30 days.".to_string(),
            "The deductible for fire damage is 500 dollars per occurrence.".to_string(),
            "Home office equipment is covered under personal property.".to_string(),
            "Emergency repairs may be made to prevent further damage.".to_string(),
        ]
    }

    /// Returns a fixed answer and records the prompts it was sent
    pub(crate) struct CannedAdapter {
        pub answer: String,
        pub prompts: Arc<Mutex<Vec<String>>>,
        pub connected: bool,
    }

    #[async_trait]
    impl LLMAdapter for CannedAdapter {
        async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
            self.prompts
                .lock()
                .unwrap()
                .extend(request.messages.iter().map(|m| m.content.clone()));
            Ok(LLMResponse {
                content: self.answer.clone(),
                finish_reason: "STOP".to_string(),
                usage: TokenUsage::default(),
            })
        }

        async fn check_connection(&self) -> AppResult<()> {
            if self.connected {
                Ok(())
            } else {
                Err(AppError::LLMApi("unreachable".to_string()))
            }
        }
    }

    pub(crate) struct FailingAdapter;

    #[async_trait]
    impl LLMAdapter for FailingAdapter {
        async fn create_chat_completion(&self, _request: &LLMRequest) -> AppResult<LLMResponse> {
            Err(AppError::LLMApi("quota exceeded".to_string()))
        }
    }

    pub(crate) fn engine_with(llm: Option<LLM>) -> RagEngine {
        RagEngine::build(
            policy_pages(),
            Box::new(HashingEmbedder::default()),
            llm,
            RagOptions::default(),
        )
        .unwrap()
    }

    #[derive(Clone, Copy)]
    pub(crate) enum Misbehaviour {
        Fail,
        TooFewVectors,
        WrongDimension,
        FailQueries,
    }

    /// Embedder that breaks in a chosen way
    pub(crate) struct MisbehavingEmbedder(pub Misbehaviour);

    impl Embedder for MisbehavingEmbedder {
        fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            match self.0 {
                Misbehaviour::Fail => Err(AppError::Embedding("model not loaded".to_string())),
                Misbehaviour::TooFewVectors => Ok(vec![vec![0.5; 4]; texts.len() - 1]),
                Misbehaviour::WrongDimension => Ok(vec![vec![0.5; 3]; texts.len()]),
                Misbehaviour::FailQueries if texts.len() == 1 => {
                    Err(AppError::Embedding("query rejected".to_string()))
                }
                Misbehaviour::FailQueries => {
                    Ok((0..texts.len()).map(|i| vec![i as f32; 4]).collect())
                }
            }
        }

        fn dimension(&self) -> usize {
            4
        }

        fn name(&self) -> &str {
            "misbehaving"
        }
    }

    /// Builds fine but cannot embed questions
    pub(crate) fn engine_failing_queries() -> RagEngine {
        RagEngine::build(
            policy_pages(),
            Box::new(MisbehavingEmbedder(Misbehaviour::FailQueries)),
            None,
            RagOptions::default(),
        )
        .unwrap()
    }

    pub(crate) fn canned_llm(answer: &str, prompts: Arc<Mutex<Vec<String>>>) -> LLM {
        LLM::from_adapter(
            Box::new(CannedAdapter {
                answer: answer.to_string(),
                prompts,
                connected: true,
            }),
            "google",
            "gemini-test",
        )
    }

    #[test]
    fn test_build_rejects_empty_corpus() {
        let result = RagEngine::build(
            Vec::new(),
            Box::new(HashingEmbedder::default()),
            None,
            RagOptions::default(),
        );
        assert!(matches!(result, Err(AppError::Index(_))));
    }

    #[test]
    fn test_build_surfaces_embedder_failures() {
        let build = |mode| {
            RagEngine::build(
                policy_pages(),
                Box::new(MisbehavingEmbedder(mode)),
                None,
                RagOptions::default(),
            )
            .err()
        };

        assert!(matches!(build(Misbehaviour::Fail), Some(AppError::Embedding(_))));
        assert!(matches!(
            build(Misbehaviour::TooFewVectors),
            Some(AppError::Embedding(m)) if m == "Expected 5 embeddings, got 4"
        ));
        assert!(matches!(build(Misbehaviour::WrongDimension), Some(AppError::Index(_))));
    }

    #[tokio::test]
    async fn test_query_embedding_failure_propagates() {
        let engine = engine_failing_queries();
        assert!(matches!(engine.retrieve("fire", 3), Err(AppError::Embedding(_))));
        assert!(matches!(engine.ask("fire").await, Err(AppError::Embedding(_))));
    }

    #[tokio::test]
    async fn test_from_config_with_text_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.txt");
        std::fs::write(&path, policy_pages().join("\u{0c}")).unwrap();

        let vars: HashMap<&str, String> = HashMap::from([
            ("POLICY_DOCUMENT_PATH", path.display().to_string()),
            ("EMBEDDING_MODEL", "hashing".to_string()),
            ("RAG_TOP_K", "2".to_string()),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let engine = RagEngine::from_config(&config).unwrap();

        assert_eq!(engine.chunk_count(), 5);
        assert_eq!(engine.embedder_name(), "hashing");
        assert_eq!(engine.options().top_k, 2);
        assert!(!engine.has_llm());

        let answer = engine.ask("fire damage deductible").await.unwrap();
        assert_eq!(answer.source, AnswerSource::Offline);
        assert_eq!(answer.chunks.len(), 2);
        assert_eq!(answer.chunks[0].index, 2);
    }

    #[test]
    fn test_from_config_rejects_unknown_provider() {
        let vars: HashMap<&str, String> = HashMap::from([
            ("LLM_PROVIDER", "openai".to_string()),
            ("GEMINI_API_KEY", "k".to_string()),
            ("EMBEDDING_MODEL", "hashing".to_string()),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        assert!(matches!(RagEngine::from_config(&config), Err(AppError::Config(_))));
    }

    #[test]
    fn test_from_document_missing_file() {
        let result = RagEngine::from_document(
            Path::new("does/not/exist.txt"),
            Box::new(HashingEmbedder::default()),
            None,
            RagOptions::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_retrieve_returns_min_k_chunks() {
        let engine = engine_with(None);
        assert_eq!(engine.chunk_count(), 5);
        for k in 1..=5 {
            assert_eq!(engine.retrieve("damage", k).unwrap().len(), k);
        }
        assert_eq!(engine.retrieve("damage", 50).unwrap().len(), 5);
        assert!(engine.retrieve("damage", 0).unwrap().is_empty());
    }

    #[test]
    fn test_retrieve_ranks_relevant_page_first() {
        let engine = engine_with(None);
        let hits = engine.retrieve("What is the deductible for fire damage?", 3).unwrap();
        assert_eq!(hits[0].index, 2);
        assert!(hits[0].text.contains("deductible"));
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_ask_uses_model_with_prompt() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let engine = engine_with(Some(canned_llm("You are covered.", prompts.clone())));

        let answer = engine.ask("  Is water damage from burst pipes covered?  ").await.unwrap();
        assert_eq!(answer.source, AnswerSource::Model);
        assert_eq!(answer.content, "You are covered.");
        assert_eq!(answer.chunks.len(), 3);

        let sent = prompts.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("Use the context from the insurance policy"));
        assert!(sent[0].contains("burst pipes is covered"));
        assert!(sent[0].ends_with("Question:\nIs water damage from burst pipes covered?\n\nAnswer:"));
    }

    #[tokio::test]
    async fn test_ask_falls_back_when_model_fails() {
        let llm = LLM::from_adapter(Box::new(FailingAdapter), "google", "gemini-test");
        let engine = engine_with(Some(llm));

        let answer = engine.ask("roof damage claim").await.unwrap();
        assert_eq!(answer.source, AnswerSource::Fallback);
        assert!(answer.content.starts_with("(Fallback) Relevant content:\n\n"));
        assert!(answer.content.contains(&answer.chunks[0].text));
    }

    #[tokio::test]
    async fn test_ask_without_model() {
        let engine = engine_with(None);
        let answer = engine.ask("home office equipment").await.unwrap();
        assert_eq!(answer.source, AnswerSource::Offline);
        assert!(answer.content.starts_with("(API not loaded) Relevant content:\n\n"));
        assert!(engine.check_connection().await.is_ok());
    }

    #[tokio::test]
    async fn test_fallback_is_truncated() {
        let pages = vec!["claim ".repeat(1000), "claim ".repeat(1000)];
        let engine = RagEngine::build(
            pages,
            Box::new(HashingEmbedder::default()),
            None,
            RagOptions {
                top_k: 2,
                context_chars: 3000,
                fallback_chars: 100,
            },
        )
        .unwrap();

        let answer = engine.ask("claim").await.unwrap();
        let body = answer
            .content
            .strip_prefix("(API not loaded) Relevant content:\n\n")
            .unwrap();
        assert_eq!(body.chars().count(), 100);
    }

    #[tokio::test]
    async fn test_ask_rejects_blank_question() {
        let engine = engine_with(None);
        assert!(matches!(engine.ask("   ").await, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_check_connection_failure() {
        let llm = LLM::from_adapter(
            Box::new(CannedAdapter {
                answer: String::new(),
                prompts: Arc::new(Mutex::new(Vec::new())),
                connected: false,
            }),
            "google",
            "gemini-test",
        );
        let engine = engine_with(Some(llm));
        assert!(matches!(engine.check_connection().await, Err(AppError::LLMApi(_))));
    }
}
