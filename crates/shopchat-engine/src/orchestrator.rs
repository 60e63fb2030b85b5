//! The per-turn conversation pipeline.

use crate::error::{EngineError, TurnStage};
use crate::params::{TurnParameters, TurnSettings};
use crate::prompt;
use crate::Result;
use shopchat_core::{ChatMessage, EngineConfig, SessionId, Source};
use shopchat_index::{ScoredRecord, SimilarityQuery, VectorIndex};
use shopchat_providers::{ChatProvider, EmbeddingProvider};
use shopchat_session::{SessionError, SessionStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of one successful turn.
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// Generated answer text.
    pub answer: String,

    /// Catalog records used as context, in ranking order.
    pub sources: Vec<Source>,

    /// Session the turn was committed to (generated if none was supplied).
    pub session_id: SessionId,
}

/// Passive readiness report.
#[derive(Debug, Clone, Copy)]
pub struct Health {
    /// Both collaborators reachable.
    pub ready: bool,

    /// Catalog index reachable.
    pub index_ok: bool,

    /// Session store reachable.
    pub store_ok: bool,
}

/// Stateless coordinator of one conversation turn.
///
/// Owns no persistent state: sessions belong to the store, records to the
/// index. No session-level lock is held across the embedding, search, or
/// generation calls; only the final commit serializes per session (inside
/// the store).
pub struct Orchestrator {
    config: EngineConfig,
    embeddings: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatProvider>,
    index: Arc<dyn VectorIndex>,
    sessions: Arc<dyn SessionStore>,
}

impl Orchestrator {
    /// Create an orchestrator over the four collaborators.
    pub fn new(
        config: EngineConfig,
        embeddings: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatProvider>,
        index: Arc<dyn VectorIndex>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            embeddings,
            chat,
            index,
            sessions,
        }
    }

    /// The engine configuration in effect.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle one conversation turn.
    ///
    /// On any failure before the commit, the session history is left
    /// untouched; the one distinct case is [`EngineError::Commit`], where
    /// the answer was generated but persisting it failed.
    pub async fn handle_turn(
        &self,
        session_id: Option<SessionId>,
        message: &str,
        params: TurnParameters,
    ) -> Result<TurnReply> {
        params.validate(message)?;
        let settings = params.resolve(&self.config);

        let session_id = session_id.unwrap_or_else(SessionId::generate);
        debug!(session = %session_id, "Handling turn");

        // Load history. Unknown ids yield an empty session; nothing is
        // persisted until the commit.
        let session = self
            .bounded(TurnStage::HistoryLoad, self.sessions.load(&session_id))
            .await?
            .map_err(|source| EngineError::Store {
                stage: TurnStage::HistoryLoad,
                source,
            })?;
        let history = session.messages;

        // Rewrite follow-ups into a standalone query; a bare first turn
        // passes through unchanged.
        let standalone = self.reformulate(&settings, &history, message).await?;

        // Embed and retrieve. Zero hits is not an error: the turn proceeds
        // with an empty context block.
        let hits = self.retrieve(&settings, &standalone).await?;
        let sources: Vec<Source> = hits
            .iter()
            .map(|hit| Source {
                id: hit.record.id,
                title: hit.record.title.clone(),
                category: hit.record.category.clone(),
            })
            .collect();

        // Generate the answer from instructions + history + context.
        let request = prompt::answer_request(
            &settings.chat_model,
            settings.temperature,
            settings.system_prompt.as_deref(),
            &hits,
            &history,
            message,
        );
        let answer = self
            .bounded(TurnStage::Generation, self.chat.generate(&request))
            .await?
            .map_err(|source| EngineError::Provider {
                stage: TurnStage::Generation,
                source,
            })?;

        // Commit the original message (not the reformulation) plus the
        // answer; history must reflect what the user actually typed.
        self.commit(&session_id, message, &answer, &sources).await?;

        info!(
            session = %session_id,
            sources = sources.len(),
            "Turn completed"
        );

        Ok(TurnReply {
            answer,
            sources,
            session_id,
        })
    }

    /// Clear a session's history; the identifier stays valid.
    pub async fn reset_session(&self, session_id: &SessionId) -> Result<()> {
        self.sessions
            .clear(session_id)
            .await
            .map_err(|source| EngineError::Store {
                stage: TurnStage::Maintenance,
                source,
            })?;
        info!(session = %session_id, "Session reset");
        Ok(())
    }

    /// Delete sessions idle longer than the configured TTL.
    ///
    /// Out-of-band maintenance; never part of per-turn logic.
    pub async fn sweep_sessions(&self) -> Result<usize> {
        self.sessions
            .sweep(self.config.session_ttl())
            .await
            .map_err(|source| EngineError::Store {
                stage: TurnStage::Maintenance,
                source,
            })
    }

    /// Verify the index and session store are reachable without running a
    /// real query.
    pub async fn health_check(&self) -> Health {
        let index_ok = self.index.ping().await.is_ok();
        let store_ok = self.sessions.ping().await.is_ok();
        Health {
            ready: index_ok && store_ok,
            index_ok,
            store_ok,
        }
    }

    async fn reformulate(
        &self,
        settings: &TurnSettings,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String> {
        if history.is_empty() {
            return Ok(message.to_string());
        }

        let request = prompt::condense_request(
            &settings.chat_model,
            settings.temperature,
            history,
            message,
        );
        let standalone = self
            .bounded(TurnStage::Reformulation, self.chat.generate(&request))
            .await?
            .map_err(|source| EngineError::Provider {
                stage: TurnStage::Reformulation,
                source,
            })?;

        let standalone = standalone.trim();
        if standalone.is_empty() {
            Ok(message.to_string())
        } else {
            debug!(query = standalone, "Reformulated follow-up");
            Ok(standalone.to_string())
        }
    }

    async fn retrieve(
        &self,
        settings: &TurnSettings,
        standalone: &str,
    ) -> Result<Vec<ScoredRecord>> {
        let vector = self
            .bounded(
                TurnStage::Embedding,
                self.embeddings
                    .embed_one(standalone, &settings.embedding_model),
            )
            .await?
            .map_err(|source| EngineError::Provider {
                stage: TurnStage::Embedding,
                source,
            })?;

        let query = SimilarityQuery::new(vector)
            .with_limit(settings.k)
            .with_threshold(settings.threshold)
            .with_filter(settings.filter.clone());

        let hits = self
            .bounded(TurnStage::Retrieval, self.index.search(&query))
            .await??;

        debug!(hits = hits.len(), k = settings.k, "Retrieved context");
        Ok(hits)
    }

    async fn commit(
        &self,
        session_id: &SessionId,
        message: &str,
        answer: &str,
        sources: &[Source],
    ) -> Result<()> {
        let user = ChatMessage::user(message);
        let assistant = ChatMessage::assistant(answer);

        let mut attempt = 0;
        loop {
            let result = self
                .bounded(
                    TurnStage::Commit,
                    self.sessions
                        .append(session_id, user.clone(), assistant.clone()),
                )
                .await;

            let source = match result {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(source)) => source,
                Err(EngineError::Timeout { secs, .. }) => {
                    SessionError::Unavailable(format!("commit timed out after {secs}s"))
                }
                Err(other) => return Err(other),
            };

            if attempt >= self.config.commit_retries {
                return Err(EngineError::Commit {
                    answer: answer.to_string(),
                    sources: sources.to_vec(),
                    source,
                });
            }

            attempt += 1;
            warn!(session = %session_id, attempt, error = %source, "Retrying commit");
            tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
        }
    }

    async fn bounded<T, F>(&self, stage: TurnStage, fut: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        let secs = self.config.request_timeout_secs;
        tokio::time::timeout(self.config.request_timeout(), fut)
            .await
            .map_err(|_| EngineError::Timeout { stage, secs })
    }
}
