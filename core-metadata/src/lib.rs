//! # Lyrics & Generated Content
//!
//! Everything the player and the learning views need from song text.
//!
//! ## Overview
//!
//! This module handles:
//! - Timed lyric lines and the active-line lookup used while playing
//! - Word lookup rules for the tap-to-define lyric view
//! - Decoding of AI generated songs, definitions, playlists and
//!   recommendations, each with a fallback for malformed answers
//! - Lyric translation through the inference backend
//! - Picking related catalog songs for the player sidebar

pub mod error;
pub mod generation;
pub mod lyrics;
pub mod translation;

pub use error::{MetadataError, Result};
pub use generation::{
    CatalogSong, Difficulty, GeneratedSong, LearningRecommendations, ListeningSummary,
    PlaylistBrief, PlaylistSuggestion, ProgressSnapshot, SongBrief, SongRecommendation,
    VocabularyItem, WordDefinition, similar_songs, SIMILAR_SONG_LIMIT,
};
pub use lyrics::{active_line_index, lookup_candidate, words, LyricCursor, LyricLine, LyricSheet};
pub use translation::LyricsTranslator;
