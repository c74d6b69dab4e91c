//! # AI Generated Content
//!
//! Request builders and decoders for the inference backend. Every request
//! carries the JSON schema its decoder expects, and every decoder treats the
//! answer as untrusted:
//!
//! | Payload | Malformed answer |
//! |---------|------------------|
//! | [`GeneratedSong`] | `Err(MetadataError::InvalidResponse)` |
//! | [`WordDefinition`] | `None` |
//! | [`PlaylistSuggestion`] | empty suggestion |
//! | [`LearningRecommendations`] | `LearningRecommendations::default()` |
//!
//! Song ids coming back from the model are checked against the catalog that
//! was offered in the prompt; ids the catalog does not contain are dropped.

use std::collections::HashSet;

use bridge_traits::InferenceRequest;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{MetadataError, Result};
use crate::lyrics::{LyricLine, LyricSheet};

/// Song length used when the model omits one
pub const DEFAULT_SONG_DURATION_SECS: u32 = 180;

/// Decode a raw answer. Some backends hand back the JSON document as a
/// string, so a string value is parsed first.
pub(crate) fn parse<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    let invalid = |e: serde_json::Error| MetadataError::InvalidResponse(format!("{}: {}", what, e));
    let value = match value {
        Value::String(text) => serde_json::from_str(text.trim()).map_err(invalid)?,
        other => other,
    };
    serde_json::from_value(value).map_err(invalid)
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn positive_whole(value: Option<f64>) -> Option<u32> {
    value
        .filter(|v| v.is_finite() && *v >= 1.0 && *v <= u32::MAX as f64)
        .map(|v| v.round() as u32)
}

fn display_language(code: &str) -> String {
    let mut chars = code.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn string_array() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

/// Learner level of a song or playlist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// CEFR band the level maps to
    pub fn cefr_range(&self) -> &'static str {
        match self {
            Self::Beginner => "A1-A2",
            Self::Intermediate => "B1-B2",
            Self::Advanced => "C1-C2",
        }
    }
}

// =============================================================================
// Generated songs
// =============================================================================

/// What the learner asked the song generator for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongBrief {
    pub theme: String,
    pub artist: String,
    pub language: String,
    pub difficulty: Difficulty,
    pub genre: String,
    pub mood: String,
    pub vocab_focus: Option<String>,
}

impl SongBrief {
    pub fn new(theme: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            artist: artist.into(),
            language: "german".to_string(),
            difficulty: Difficulty::Beginner,
            genre: "pop".to_string(),
            mood: "upbeat".to_string(),
            vocab_focus: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = mood.into();
        self
    }

    pub fn with_vocab_focus(mut self, focus: impl Into<String>) -> Self {
        self.vocab_focus = non_empty(Some(focus.into()));
        self
    }

    pub fn request(&self) -> InferenceRequest {
        let language = display_language(&self.language);
        let focus = self
            .vocab_focus
            .as_ref()
            .map(|f| format!("Vocabulary focus: {}\n", f))
            .unwrap_or_default();

        let prompt = format!(
            "Write a complete song that helps learners practise {language}.\n\
             \n\
             Language: {language}\n\
             Level: {level} (CEFR {cefr})\n\
             Genre: {genre}\n\
             Mood: {mood}\n\
             Theme: {theme}\n\
             Artist: {artist}\n\
             {focus}\
             \n\
             Keep the lyrics short and memorable for {level} learners, use everyday \
             vocabulary and grammar for that level, and follow a verse-chorus-verse-\
             chorus-bridge-chorus structure.\n\
             \n\
             Give every lyric line a start time in seconds, the line in {language} \
             and an English translation. List the key vocabulary with a translation \
             and an example sentence.",
            language = language,
            level = self.difficulty.as_str(),
            cefr = self.difficulty.cefr_range(),
            genre = self.genre,
            mood = self.mood,
            theme = self.theme,
            artist = self.artist,
            focus = focus,
        );

        InferenceRequest::new(prompt).with_schema(GeneratedSong::schema())
    }

    /// Prompt for the cover image of a generated song.
    pub fn cover_art_prompt(&self, title: &str) -> String {
        format!(
            "Album cover art for a {} song titled \"{}\" by {}. Modern, vibrant, \
             professional, abstract design with a {} mood.",
            self.genre, title, self.artist, self.mood
        )
    }
}

/// One vocabulary entry attached to a generated song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyItem {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

#[derive(Deserialize)]
struct SongAnswer {
    title: Option<String>,
    lyrics: Option<Vec<LyricLine>>,
    vocabulary: Option<Vec<VocabularyItem>>,
    chord_progression: Option<String>,
    bpm: Option<f64>,
    key: Option<String>,
    duration_seconds: Option<f64>,
}

/// A validated song from the generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedSong {
    pub title: String,
    /// Ordered by time
    pub lyrics: Vec<LyricLine>,
    pub vocabulary: Vec<VocabularyItem>,
    pub chord_progression: Option<String>,
    pub bpm: Option<u32>,
    pub key: Option<String>,
    pub duration_seconds: u32,
}

impl GeneratedSong {
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "lyrics": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "time": { "type": "number" },
                            "original": { "type": "string" },
                            "translation": { "type": "string" }
                        }
                    }
                },
                "vocabulary": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "word": { "type": "string" },
                            "translation": { "type": "string" },
                            "example": { "type": "string" }
                        }
                    }
                },
                "chord_progression": { "type": "string" },
                "bpm": { "type": "number" },
                "key": { "type": "string" },
                "duration_seconds": { "type": "number" }
            }
        })
    }

    /// Validate a generator answer.
    ///
    /// A song needs a title and at least one lyric line with a valid time.
    /// Lines are put in time order; vocabulary entries without a word are
    /// dropped; a missing duration becomes [`DEFAULT_SONG_DURATION_SECS`].
    pub fn decode(value: Value) -> Result<Self> {
        let answer: SongAnswer = parse(value, "generated song")?;

        let title = non_empty(answer.title)
            .ok_or_else(|| MetadataError::InvalidResponse("generated song has no title".into()))?;

        let lyrics = answer.lyrics.unwrap_or_default();
        if lyrics.is_empty() {
            return Err(MetadataError::InvalidResponse(
                "generated song has no lyrics".into(),
            ));
        }
        let sheet = LyricSheet::sorted(lyrics)
            .map_err(|e| MetadataError::InvalidResponse(format!("generated song: {}", e)))?;

        let offered = answer.vocabulary.unwrap_or_default();
        let offered_count = offered.len();
        let vocabulary: Vec<VocabularyItem> = offered
            .into_iter()
            .filter(|item| !item.word.trim().is_empty())
            .collect();
        if vocabulary.len() < offered_count {
            debug!(
                dropped = offered_count - vocabulary.len(),
                "Dropped vocabulary entries without a word"
            );
        }

        let song = Self {
            title,
            lyrics: sheet.into_lines(),
            vocabulary,
            chord_progression: non_empty(answer.chord_progression),
            bpm: positive_whole(answer.bpm),
            key: non_empty(answer.key),
            duration_seconds: positive_whole(answer.duration_seconds)
                .unwrap_or(DEFAULT_SONG_DURATION_SECS),
        };
        debug!(title = %song.title, lines = song.lyrics.len(), "Decoded generated song");
        Ok(song)
    }
}

// =============================================================================
// Word definitions
// =============================================================================

#[derive(Deserialize)]
struct DefinitionAnswer {
    translation: Option<String>,
    definition: Option<String>,
    examples: Option<Vec<String>>,
    phrases: Option<Vec<String>>,
}

/// Dictionary card for a tapped lyric word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WordDefinition {
    pub translation: String,
    pub definition: String,
    pub examples: Vec<String>,
    pub phrases: Vec<String>,
}

impl WordDefinition {
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "translation": { "type": "string" },
                "definition": { "type": "string" },
                "examples": string_array(),
                "phrases": string_array()
            }
        })
    }

    pub fn request(word: &str) -> InferenceRequest {
        let prompt = format!(
            "Define the word \"{}\" for a language learner. Give its translation, \
             a definition, a few example sentences and common phrases that use it.",
            word
        );
        InferenceRequest::new(prompt).with_schema(Self::schema())
    }

    /// Validate a definition answer. `None` means "no definition available".
    pub fn decode(value: Value) -> Option<Self> {
        let answer: DefinitionAnswer = match parse(value, "word definition") {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Discarding word definition");
                return None;
            }
        };

        let clean = |items: Option<Vec<String>>| -> Vec<String> {
            items
                .unwrap_or_default()
                .into_iter()
                .filter_map(|s| non_empty(Some(s)))
                .collect()
        };

        let definition = Self {
            translation: non_empty(answer.translation).unwrap_or_default(),
            definition: non_empty(answer.definition).unwrap_or_default(),
            examples: clean(answer.examples),
            phrases: clean(answer.phrases),
        };

        if definition.translation.is_empty() && definition.definition.is_empty() {
            warn!("Word definition has neither translation nor definition");
            return None;
        }
        Some(definition)
    }
}

// =============================================================================
// Catalog context
// =============================================================================

/// A catalog song as offered to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSong {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub language: String,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grammar_topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cefr_level: Option<String>,
}

impl CatalogSong {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            language: language.into(),
            ..Self::default()
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }
}

fn catalog_ids(catalog: &[CatalogSong]) -> HashSet<&str> {
    catalog.iter().map(|song| song.id.as_str()).collect()
}

/// Number of related songs shown next to the player
pub const SIMILAR_SONG_LIMIT: usize = 4;

/// Catalog songs related to `current`, in catalog order.
///
/// A song is related when it shares the language, the genre or the
/// difficulty. Songs without a genre never match on genre.
pub fn similar_songs<'a>(
    current: &CatalogSong,
    catalog: &'a [CatalogSong],
    limit: usize,
) -> Vec<&'a CatalogSong> {
    catalog
        .iter()
        .filter(|song| song.id != current.id)
        .filter(|song| {
            song.language == current.language
                || (song.genre.is_some() && song.genre == current.genre)
                || song.difficulty == current.difficulty
        })
        .take(limit)
        .collect()
}

// =============================================================================
// Playlist suggestions
// =============================================================================

/// The playlist the learner wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistBrief {
    pub name: String,
    pub language: String,
    pub difficulty: Difficulty,
    pub genre: Option<String>,
    pub goal: Option<String>,
}

impl PlaylistBrief {
    pub fn new(name: impl Into<String>, language: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            difficulty,
            genre: None,
            goal: None,
        }
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = non_empty(Some(genre.into()));
        self
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = non_empty(Some(goal.into()));
        self
    }
}

/// What the learner has listened to so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListeningSummary {
    pub songs_played: usize,
    pub favorites: Vec<CatalogSong>,
    pub words_learned: usize,
}

#[derive(Deserialize)]
struct PlaylistAnswer {
    song_ids: Option<Vec<String>>,
    reasoning: Option<String>,
}

/// Songs picked by the model for a playlist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaylistSuggestion {
    /// Catalog ids in the model's order, without duplicates
    pub song_ids: Vec<String>,
    pub reasoning: Option<String>,
}

impl PlaylistSuggestion {
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "song_ids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Selected song IDs for the playlist"
                },
                "reasoning": {
                    "type": "string",
                    "description": "Brief explanation of the selection"
                }
            }
        })
    }

    pub fn request(
        brief: &PlaylistBrief,
        history: &ListeningSummary,
        catalog: &[CatalogSong],
    ) -> InferenceRequest {
        let favorites = if history.favorites.is_empty() {
            "none yet".to_string()
        } else {
            history
                .favorites
                .iter()
                .map(|s| format!("{} by {} ({}, {})", s.title, s.artist, s.language, s.difficulty.as_str()))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let songs = catalog
            .iter()
            .map(|s| {
                format!(
                    "- ID: {}, Title: \"{}\", Artist: \"{}\", Language: {}, Difficulty: {}, Genre: {}",
                    s.id,
                    s.title,
                    s.artist,
                    s.language,
                    s.difficulty.as_str(),
                    s.genre.as_deref().unwrap_or("unknown")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Build a language-learning playlist from the songs below.\n\
             \n\
             Learner:\n\
             - Songs played: {played}\n\
             - Favourites: {favorites}\n\
             - Words learned: {words}\n\
             \n\
             Playlist:\n\
             - Name: \"{name}\"\n\
             - Language: {language}\n\
             - Difficulty: {difficulty}\n\
             - Genre: {genre}\n\
             - Goal: {goal}\n\
             \n\
             Songs:\n\
             {songs}\n\
             \n\
             Pick 8 to 12 songs that match the language and difficulty, vary the \
             artists, and mix familiar songs with new vocabulary. Answer with song IDs \
             from the list only.",
            played = history.songs_played,
            favorites = favorites,
            words = history.words_learned,
            name = brief.name,
            language = brief.language,
            difficulty = brief.difficulty.as_str(),
            genre = brief.genre.as_deref().unwrap_or("any"),
            goal = brief.goal.as_deref().unwrap_or("general language learning"),
            songs = songs,
        );

        InferenceRequest::new(prompt).with_schema(Self::schema())
    }

    /// Validate a suggestion against the catalog it was built from.
    ///
    /// A malformed answer yields an empty suggestion.
    pub fn decode(value: Value, catalog: &[CatalogSong]) -> Self {
        let answer: PlaylistAnswer = match parse(value, "playlist suggestion") {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Discarding playlist suggestion");
                return Self::default();
            }
        };

        let known = catalog_ids(catalog);
        let mut seen = HashSet::new();
        let mut dropped = 0usize;
        let song_ids: Vec<String> = answer
            .song_ids
            .unwrap_or_default()
            .into_iter()
            .filter(|id| {
                let keep = known.contains(id.as_str());
                if !keep {
                    dropped += 1;
                }
                keep
            })
            .filter(|id| seen.insert(id.clone()))
            .collect();

        if dropped > 0 {
            debug!(dropped, "Dropped song ids outside the catalog");
        }

        Self {
            song_ids,
            reasoning: non_empty(answer.reasoning),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.song_ids.is_empty()
    }

    /// Playlist description: the model's reasoning, or a generic line.
    pub fn description(&self, brief: &PlaylistBrief) -> String {
        match &self.reasoning {
            Some(reasoning) => reasoning.clone(),
            None => format!(
                "AI-generated playlist for {}",
                brief.goal.as_deref().unwrap_or("language learning")
            ),
        }
    }
}

// =============================================================================
// Learning recommendations
// =============================================================================

/// The learner's progress as shown to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub learned_words: Vec<String>,
    pub completed_exercises: usize,
    pub favorite_songs: usize,
    pub languages: Vec<String>,
}

/// Sample of learned words included in the prompt
const LEARNED_WORD_SAMPLE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecommendation {
    #[serde(default)]
    pub song_id: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize)]
struct RecommendationAnswer {
    recommended_songs: Option<Vec<SongRecommendation>>,
    vocabulary_topics: Option<Vec<String>>,
    grammar_topics: Option<Vec<String>>,
    current_level: Option<String>,
    learning_path: Option<Vec<String>>,
}

/// Personalized next steps for the learner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LearningRecommendations {
    pub recommended_songs: Vec<SongRecommendation>,
    pub vocabulary_topics: Vec<String>,
    pub grammar_topics: Vec<String>,
    /// Estimated CEFR level, e.g. "A2"
    pub current_level: Option<String>,
    pub learning_path: Vec<String>,
}

impl LearningRecommendations {
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "recommended_songs": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "song_id": { "type": "string" },
                            "reason": { "type": "string" }
                        }
                    }
                },
                "vocabulary_topics": string_array(),
                "grammar_topics": string_array(),
                "current_level": { "type": "string" },
                "learning_path": string_array()
            }
        })
    }

    pub fn request(progress: &ProgressSnapshot, catalog: &[CatalogSong]) -> InferenceRequest {
        let sample: Vec<&str> = progress
            .learned_words
            .iter()
            .take(LEARNED_WORD_SAMPLE)
            .map(String::as_str)
            .collect();
        // Serializing plain structs of strings cannot fail.
        let songs = serde_json::to_string(catalog).unwrap_or_else(|_| "[]".to_string());

        let prompt = format!(
            "Recommend what this language learner should do next.\n\
             \n\
             Progress:\n\
             - Learned words: {words}\n\
             - Completed exercises: {exercises}\n\
             - Favourite songs: {favorites}\n\
             - Languages practised: {languages}\n\
             - Some learned words: {sample}\n\
             \n\
             Available songs: {songs}\n\
             \n\
             Provide the next 3 songs to study (IDs from the available songs), 5 \
             vocabulary topics, 5 grammar topics, the learner's estimated level \
             (A1-C2) and 5 concrete next steps.",
            words = progress.learned_words.len(),
            exercises = progress.completed_exercises,
            favorites = progress.favorite_songs,
            languages = progress.languages.join(", "),
            sample = sample.join(", "),
            songs = songs,
        );

        InferenceRequest::new(prompt).with_schema(Self::schema())
    }

    /// Validate recommendations against the catalog.
    ///
    /// A malformed answer yields the empty default; recommended songs outside
    /// the catalog are dropped.
    pub fn decode(value: Value, catalog: &[CatalogSong]) -> Self {
        let answer: RecommendationAnswer = match parse(value, "learning recommendations") {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Discarding learning recommendations");
                return Self::default();
            }
        };

        let known = catalog_ids(catalog);
        let topics = |items: Option<Vec<String>>| -> Vec<String> {
            items
                .unwrap_or_default()
                .into_iter()
                .filter_map(|s| non_empty(Some(s)))
                .collect()
        };

        let offered = answer.recommended_songs.unwrap_or_default();
        let offered_count = offered.len();
        let recommended_songs: Vec<SongRecommendation> = offered
            .into_iter()
            .filter(|rec| !rec.song_id.is_empty() && known.contains(rec.song_id.as_str()))
            .collect();
        if recommended_songs.len() < offered_count {
            debug!(
                dropped = offered_count - recommended_songs.len(),
                "Dropped recommendations without a catalog song"
            );
        }

        Self {
            recommended_songs,
            vocabulary_topics: topics(answer.vocabulary_topics),
            grammar_topics: topics(answer.grammar_topics),
            current_level: non_empty(answer.current_level),
            learning_path: topics(answer.learning_path),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.recommended_songs.is_empty()
            && self.vocabulary_topics.is_empty()
            && self.grammar_topics.is_empty()
            && self.learning_path.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<CatalogSong> {
        vec![
            CatalogSong::new("s1", "Guten Morgen", "Lena", "german"),
            CatalogSong::new("s2", "Hello Sun", "Max", "english")
                .with_difficulty(Difficulty::Intermediate)
                .with_genre("rock"),
        ]
    }

    #[test]
    fn test_song_decode_orders_lyrics_and_fills_defaults() {
        let song = GeneratedSong::decode(json!({
            "title": "  Der Morgen ",
            "lyrics": [
                { "time": 5, "original": "Die Sonne scheint", "translation": "The sun shines" },
                { "time": 0, "original": "Guten Morgen" }
            ],
            "vocabulary": [
                { "word": "Sonne", "translation": "sun", "example": "Die Sonne ist warm." },
                { "word": " ", "translation": "nothing" }
            ],
            "bpm": 118.6
        }))
        .unwrap();

        assert_eq!(song.title, "Der Morgen");
        assert_eq!(song.lyrics[0].original, "Guten Morgen");
        assert_eq!(song.lyrics[1].translation.as_deref(), Some("The sun shines"));
        assert_eq!(song.vocabulary.len(), 1);
        assert_eq!(song.bpm, Some(119));
        assert_eq!(song.duration_seconds, DEFAULT_SONG_DURATION_SECS);
        assert_eq!(song.key, None);
    }

    #[test]
    fn test_song_decode_rejects_incomplete_answers() {
        for answer in [
            json!({ "lyrics": [{ "time": 0, "original": "a" }] }),
            json!({ "title": "No words", "lyrics": [] }),
            json!({ "title": "Bad time", "lyrics": [{ "time": -4, "original": "a" }] }),
            json!({ "title": "Bad line", "lyrics": [{ "time": 0 }] }),
            json!("not json at all"),
            json!(42),
        ] {
            assert!(matches!(
                GeneratedSong::decode(answer),
                Err(MetadataError::InvalidResponse(_))
            ));
        }
    }

    #[test]
    fn test_song_decode_accepts_stringified_json() {
        let text = r#"{"title":"T","lyrics":[{"time":0,"original":"x"}],"duration_seconds":0}"#;
        let song = GeneratedSong::decode(Value::String(text.to_string())).unwrap();
        assert_eq!(song.title, "T");
        assert_eq!(song.duration_seconds, DEFAULT_SONG_DURATION_SECS);
    }

    #[test]
    fn test_song_request_carries_brief_and_schema() {
        let brief = SongBrief::new("Travel", "Die Wanderer")
            .with_difficulty(Difficulty::Intermediate)
            .with_vocab_focus("train station");
        let request = brief.request();

        assert!(request.prompt.contains("German"));
        assert!(request.prompt.contains("CEFR B1-B2"));
        assert!(request.prompt.contains("Vocabulary focus: train station"));
        assert_eq!(request.response_schema, Some(GeneratedSong::schema()));
        assert!(brief.cover_art_prompt("Reise").contains("\"Reise\" by Die Wanderer"));
    }

    #[test]
    fn test_blank_vocab_focus_is_omitted() {
        let request = SongBrief::new("Food", "Koch").with_vocab_focus("  ").request();
        assert!(!request.prompt.contains("Vocabulary focus"));
    }

    #[test]
    fn test_definition_decode() {
        let definition = WordDefinition::decode(json!({
            "translation": "love",
            "definition": "A strong feeling of affection",
            "examples": ["Ich liebe dich.", ""],
        }))
        .unwrap();
        assert_eq!(definition.examples, vec!["Ich liebe dich."]);
        assert!(definition.phrases.is_empty());

        assert_eq!(WordDefinition::decode(json!({ "examples": ["x"] })), None);
        assert_eq!(WordDefinition::decode(json!([1, 2])), None);
        assert_eq!(WordDefinition::decode(Value::Null), None);
    }

    #[test]
    fn test_definition_request_names_word() {
        let request = WordDefinition::request("Liebe");
        assert!(request.prompt.contains("\"Liebe\""));
        assert!(request.response_schema.is_some());
    }

    #[test]
    fn test_playlist_filters_unknown_and_duplicate_ids() {
        let suggestion = PlaylistSuggestion::decode(
            json!({ "song_ids": ["s2", "ghost", "s1", "s2"], "reasoning": "Mix of levels" }),
            &catalog(),
        );
        assert_eq!(suggestion.song_ids, vec!["s2", "s1"]);
        assert_eq!(suggestion.reasoning.as_deref(), Some("Mix of levels"));
    }

    #[test]
    fn test_playlist_malformed_answer_is_empty() {
        let suggestion = PlaylistSuggestion::decode(json!({ "song_ids": "s1" }), &catalog());
        assert!(suggestion.is_empty());
        assert_eq!(suggestion, PlaylistSuggestion::default());
    }

    #[test]
    fn test_playlist_description_fallback() {
        let brief = PlaylistBrief::new("Commute", "german", Difficulty::Beginner).with_goal("travel");
        assert_eq!(
            PlaylistSuggestion::default().description(&brief),
            "AI-generated playlist for travel"
        );
    }

    #[test]
    fn test_playlist_request_lists_catalog() {
        let brief = PlaylistBrief::new("Commute", "german", Difficulty::Beginner);
        let request = PlaylistSuggestion::request(&brief, &ListeningSummary::default(), &catalog());
        assert!(request.prompt.contains("- ID: s2, Title: \"Hello Sun\""));
        assert!(request.prompt.contains("Genre: rock"));
        assert!(request.prompt.contains("Favourites: none yet"));
    }

    #[test]
    fn test_recommendations_drop_unknown_songs() {
        let recs = LearningRecommendations::decode(
            json!({
                "recommended_songs": [
                    { "song_id": "s1", "reason": "Matches your level" },
                    { "song_id": "nope", "reason": "Invented" }
                ],
                "vocabulary_topics": ["food", ""],
                "current_level": "A2"
            }),
            &catalog(),
        );
        assert_eq!(recs.recommended_songs.len(), 1);
        assert_eq!(recs.recommended_songs[0].song_id, "s1");
        assert_eq!(recs.vocabulary_topics, vec!["food"]);
        assert_eq!(recs.current_level.as_deref(), Some("A2"));
        assert!(recs.grammar_topics.is_empty());
    }

    #[test]
    fn test_song_decode_skips_vocabulary_without_word() {
        let song = GeneratedSong::decode(json!({
            "title": "T",
            "lyrics": [{ "time": 0, "original": "x" }],
            "vocabulary": [
                { "translation": "orphan" },
                { "word": "Haus", "translation": "house" }
            ]
        }))
        .unwrap();
        assert_eq!(song.vocabulary.len(), 1);
        assert_eq!(song.vocabulary[0].word, "Haus");
    }

    #[test]
    fn test_recommendations_skip_entries_without_song_id() {
        let recs = LearningRecommendations::decode(
            json!({
                "recommended_songs": [
                    { "song_id": "s1", "reason": "Good fit" },
                    { "reason": "No id" }
                ]
            }),
            &catalog(),
        );
        assert_eq!(recs.recommended_songs.len(), 1);
        assert_eq!(recs.recommended_songs[0].song_id, "s1");
    }

    #[test]
    fn test_similar_songs_match_any_attribute() {
        let current = CatalogSong::new("now", "Current", "A", "german").with_genre("pop");
        let catalog = vec![
            current.clone(),
            CatalogSong::new("lang", "L", "B", "german").with_difficulty(Difficulty::Advanced),
            CatalogSong::new("genre", "G", "C", "french")
                .with_difficulty(Difficulty::Advanced)
                .with_genre("pop"),
            CatalogSong::new("level", "D", "D", "spanish"),
            CatalogSong::new("none", "N", "E", "italian")
                .with_difficulty(Difficulty::Advanced)
                .with_genre("jazz"),
        ];

        let ids: Vec<&str> = similar_songs(&current, &catalog, SIMILAR_SONG_LIMIT)
            .into_iter()
            .map(|song| song.id.as_str())
            .collect();
        assert_eq!(ids, vec!["lang", "genre", "level"]);
    }

    #[test]
    fn test_similar_songs_capped_and_ignore_missing_genre() {
        let current = CatalogSong::new("now", "Current", "A", "german");
        let mut catalog: Vec<CatalogSong> = (0..6)
            .map(|i| CatalogSong::new(format!("g{}", i), "S", "B", "german"))
            .collect();
        catalog.push(
            CatalogSong::new("other", "O", "C", "french").with_difficulty(Difficulty::Advanced),
        );

        let similar = similar_songs(&current, &catalog, SIMILAR_SONG_LIMIT);
        assert_eq!(similar.len(), 4);
        assert!(similar.iter().all(|song| song.id.starts_with('g')));

        let lone = [current.clone(), catalog[6].clone()];
        assert!(similar_songs(&current, &lone, SIMILAR_SONG_LIMIT).is_empty());
    }

    #[test]
    fn test_recommendations_malformed_answer_is_default() {
        let recs = LearningRecommendations::decode(json!({ "recommended_songs": 3 }), &catalog());
        assert!(recs.is_empty());
        assert_eq!(recs, LearningRecommendations::default());
    }

    #[test]
    fn test_recommendations_request_samples_words() {
        let progress = ProgressSnapshot {
            learned_words: (0..30).map(|i| format!("w{}", i)).collect(),
            languages: vec!["german".into()],
            ..ProgressSnapshot::default()
        };
        let request = LearningRecommendations::request(&progress, &catalog());
        assert!(request.prompt.contains("Learned words: 30"));
        assert!(request.prompt.contains("w19"));
        assert!(!request.prompt.contains("w20"));
        assert!(request.prompt.contains("\"id\":\"s1\""));
    }
}
