//! Mood search pipeline: embed the mood, retrieve the nearest tracks, then
//! optionally ask a chat model why they fit and what to listen to next.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::{PipelineMode, SearchConfig};
use crate::embedding::{EmbeddingClient, EmbeddingError};
use crate::llm::{ChatModel, LlmError};
use crate::mood::{analysis_messages, expand_mood_context, recommendation_messages};
use crate::parse::{extract_with_fallback, parse_recommendations, Recommendation};
use crate::storage::{StorageError, VectorStorage};
use crate::types::{MatchedSong, SearchResponse, Song};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No mood provided")]
    EmptyMood,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl PipelineError {
    /// True for rejected input, false for failures of an upstream service
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyMood)
    }
}

/// Everything one search produced
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub matches: Vec<MatchedSong>,
    pub analysis: Option<String>,
    /// Present only when the recommendation stage ran and succeeded
    pub recommendations: Option<Vec<Recommendation>>,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        let matches = match outcome.recommendations {
            Some(recs) => recs.into_iter().map(Song::from).collect(),
            None => outcome.matches.iter().map(Song::from).collect(),
        };

        Self {
            matches,
            source_songs: outcome.matches,
            analysis: outcome.analysis,
        }
    }
}

pub struct MoodSearchPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    storage: Arc<dyn VectorStorage>,
    chat: Arc<dyn ChatModel>,
    settings: SearchConfig,
}

impl std::fmt::Debug for MoodSearchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoodSearchPipeline")
            .field("embedding_model", &self.embedder.model())
            .field("chat_model", &self.chat.model())
            .field("settings", &self.settings)
            .finish()
    }
}

impl MoodSearchPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        storage: Arc<dyn VectorStorage>,
        chat: Arc<dyn ChatModel>,
        settings: SearchConfig,
    ) -> Self {
        Self {
            embedder,
            storage,
            chat,
            settings,
        }
    }

    pub fn mode(&self) -> PipelineMode {
        self.settings.mode
    }

    /// Run the configured stages for one mood.
    ///
    /// A blank mood is rejected before any network call. With
    /// `fallback_to_matches` set, a failing chat stage degrades the result to
    /// whatever was produced so far instead of failing the search.
    pub async fn search(&self, mood: &str) -> Result<SearchOutcome, PipelineError> {
        let mood = mood.trim();
        if mood.is_empty() {
            return Err(PipelineError::EmptyMood);
        }

        info!(%mood, mode = %self.settings.mode, "Searching by mood");

        let mut outcome = SearchOutcome {
            matches: self.find_matching_songs(mood).await?,
            ..Default::default()
        };

        if self.settings.mode == PipelineMode::Matches {
            return Ok(outcome);
        }

        let analysis = match self.analyze_songs(mood, &outcome.matches).await {
            Ok(analysis) => analysis,
            Err(e) => return self.degrade(outcome, e),
        };

        if self.settings.mode == PipelineMode::Analyze {
            outcome.analysis = Some(analysis);
            return Ok(outcome);
        }

        let recommendations = self
            .get_recommendations(mood, &analysis, &outcome.matches)
            .await;
        outcome.analysis = Some(analysis);

        match recommendations {
            Ok(recs) => {
                outcome.recommendations = Some(recs);
                Ok(outcome)
            }
            Err(e) => self.degrade(outcome, e),
        }
    }

    fn degrade(
        &self,
        outcome: SearchOutcome,
        error: LlmError,
    ) -> Result<SearchOutcome, PipelineError> {
        if !self.settings.fallback_to_matches {
            return Err(error.into());
        }
        warn!(error = %error, "Chat stage failed, returning matched songs");
        Ok(outcome)
    }

    /// Embed the (expanded) mood once and map the nearest entries to songs.
    #[instrument(skip(self), fields(top_k = self.settings.top_k))]
    pub async fn find_matching_songs(
        &self,
        mood: &str,
    ) -> Result<Vec<MatchedSong>, PipelineError> {
        let query = if self.settings.expand_context {
            expand_mood_context(mood)
        } else {
            mood.to_string()
        };

        let embedding = self.embedder.embed(&query).await?;
        let results = self
            .storage
            .search(&embedding, self.settings.top_k, self.settings.min_score)
            .await?;

        let songs: Vec<MatchedSong> = results
            .into_iter()
            .map(|hit| {
                let fields = extract_with_fallback(&hit.metadata);
                MatchedSong::new(hit.id, hit.score, fields, hit.metadata.genres)
            })
            .collect();

        debug!(count = songs.len(), "Matched songs");
        Ok(songs)
    }

    #[instrument(skip(self, songs), fields(songs = songs.len()))]
    pub async fn analyze_songs(
        &self,
        mood: &str,
        songs: &[MatchedSong],
    ) -> Result<String, LlmError> {
        let analysis = self.chat.complete(&analysis_messages(mood, songs)).await?;
        debug!(chars = analysis.len(), "Analysis complete");
        Ok(analysis)
    }

    #[instrument(skip(self, analysis, songs), fields(songs = songs.len()))]
    pub async fn get_recommendations(
        &self,
        mood: &str,
        analysis: &str,
        songs: &[MatchedSong],
    ) -> Result<Vec<Recommendation>, LlmError> {
        let text = self
            .chat
            .complete(&recommendation_messages(mood, analysis, songs))
            .await?;

        let recommendations = parse_recommendations(&text);
        debug!(count = recommendations.len(), "Parsed recommendations");
        Ok(recommendations)
    }
}
