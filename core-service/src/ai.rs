//! AI features backed by the host's [`InferenceClient`].
//!
//! Each call builds its request, invokes the backend once and decodes the
//! answer with the fallback of its payload type. Song and playlist
//! generation publish a [`GenerationEvent`]; failures are also returned to
//! the caller. Nothing is retried.

use std::sync::Arc;

use bridge_traits::InferenceClient;
use core_metadata::{
    CatalogSong, GeneratedSong, LearningRecommendations, ListeningSummary, LyricLine,
    LyricsTranslator, MetadataError, PlaylistBrief, PlaylistSuggestion, ProgressSnapshot,
    SongBrief, WordDefinition,
};
use core_runtime::events::{CoreEvent, EventBus, GenerationEvent};
use tracing::{info, instrument, warn};

use crate::error::Result;

pub struct AiService {
    client: Arc<dyn InferenceClient>,
    translator: LyricsTranslator,
    events: EventBus,
}

impl AiService {
    pub fn new(client: Arc<dyn InferenceClient>, events: EventBus) -> Self {
        Self {
            translator: LyricsTranslator::new(Arc::clone(&client)),
            client,
            events,
        }
    }

    /// Generate a song. Nothing is created when the answer is unusable.
    #[instrument(skip(self, brief), fields(theme = %brief.theme))]
    pub async fn generate_song(&self, brief: &SongBrief) -> Result<GeneratedSong> {
        let outcome = match self.client.invoke(brief.request()).await {
            Ok(answer) => GeneratedSong::decode(answer),
            Err(e) => Err(MetadataError::from(e)),
        };

        match outcome {
            Ok(song) => {
                info!(title = %song.title, "Song generated");
                self.emit(GenerationEvent::SongGenerated {
                    title: song.title.clone(),
                });
                Ok(song)
            }
            Err(e) => {
                warn!(error = %e, "Song generation failed");
                self.emit(GenerationEvent::Failed {
                    kind: "song".to_string(),
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Look up a tapped word. `None` when the backend fails or has no answer.
    #[instrument(skip(self))]
    pub async fn define_word(&self, word: &str) -> Option<WordDefinition> {
        match self.client.invoke(WordDefinition::request(word)).await {
            Ok(answer) => WordDefinition::decode(answer),
            Err(e) => {
                warn!(error = %e, "Word definition request failed");
                None
            }
        }
    }

    /// Ask for a playlist drawn from `catalog`.
    ///
    /// A backend failure is an error; a malformed answer is an empty
    /// suggestion.
    #[instrument(skip_all, fields(name = %brief.name, catalog = catalog.len()))]
    pub async fn suggest_playlist(
        &self,
        brief: &PlaylistBrief,
        history: &ListeningSummary,
        catalog: &[CatalogSong],
    ) -> Result<PlaylistSuggestion> {
        let request = PlaylistSuggestion::request(brief, history, catalog);
        let answer = match self.client.invoke(request).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Playlist suggestion failed");
                self.emit(GenerationEvent::Failed {
                    kind: "playlist".to_string(),
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let suggestion = PlaylistSuggestion::decode(answer, catalog);
        self.emit(GenerationEvent::PlaylistSuggested {
            song_count: suggestion.song_ids.len(),
        });
        Ok(suggestion)
    }

    /// Personalized recommendations; empty when anything goes wrong.
    #[instrument(skip_all, fields(catalog = catalog.len()))]
    pub async fn recommend(
        &self,
        progress: &ProgressSnapshot,
        catalog: &[CatalogSong],
    ) -> LearningRecommendations {
        if catalog.is_empty() {
            return LearningRecommendations::default();
        }
        match self
            .client
            .invoke(LearningRecommendations::request(progress, catalog))
            .await
        {
            Ok(answer) => LearningRecommendations::decode(answer, catalog),
            Err(e) => {
                warn!(error = %e, "Recommendation request failed");
                LearningRecommendations::default()
            }
        }
    }

    /// Lines with translations in `language`, or the input unchanged.
    pub async fn translate_lyrics(
        &self,
        lines: &[LyricLine],
        language: Option<&str>,
    ) -> Vec<LyricLine> {
        self.translator.translate(lines, language).await
    }

    fn emit(&self, event: GenerationEvent) {
        self.events.emit(CoreEvent::Generation(event)).ok();
    }
}
