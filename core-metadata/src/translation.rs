//! # Lyric Translation
//!
//! Songs ship with English translations. Learners whose own language is not
//! English get each translation re-translated through the inference backend.
//! All lines are requested concurrently; if any request fails or comes back
//! malformed, the untranslated lines are used as they are.

use std::sync::Arc;

use bridge_traits::{InferenceClient, InferenceRequest};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::error::{MetadataError, Result};
use crate::generation::parse;
use crate::lyrics::LyricLine;

/// Language the stored translations are written in
const SOURCE_LANGUAGE: &str = "english";

#[derive(Deserialize)]
struct TranslationAnswer {
    translation: Option<String>,
}

/// Build the request for translating one piece of text.
pub fn translation_request(text: &str, language: &str) -> InferenceRequest {
    let prompt = format!(
        "Translate this text to {}: \"{}\"\n\nReturn ONLY the translation, no explanations.",
        language, text
    );
    InferenceRequest::new(prompt).with_schema(json!({
        "type": "object",
        "properties": {
            "translation": { "type": "string" }
        }
    }))
}

fn decode_translation(value: Value) -> Result<String> {
    let answer: TranslationAnswer = parse(value, "translation")?;
    answer
        .translation
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| MetadataError::InvalidResponse("translation is empty".into()))
}

/// Translates lyric lines into the learner's language.
pub struct LyricsTranslator {
    client: Arc<dyn InferenceClient>,
}

impl LyricsTranslator {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    /// Whether lines need translating for `target_language` at all.
    pub fn needs_translation(target_language: Option<&str>) -> bool {
        target_language
            .map(str::trim)
            .map_or(false, |lang| !lang.is_empty() && !lang.eq_ignore_ascii_case(SOURCE_LANGUAGE))
    }

    /// Translate every line that has a translation.
    ///
    /// Returns the input unchanged when no translation is needed, when
    /// `lines` is empty, or when any line fails.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn translate(
        &self,
        lines: &[LyricLine],
        target_language: Option<&str>,
    ) -> Vec<LyricLine> {
        let language = match target_language {
            Some(lang) if Self::needs_translation(Some(lang)) && !lines.is_empty() => lang.trim(),
            _ => return lines.to_vec(),
        };

        match self.try_translate(lines, language).await {
            Ok(translated) => {
                debug!(language, "Translated lyrics");
                translated
            }
            Err(e) => {
                warn!(language, error = %e, "Lyric translation failed, keeping original lines");
                lines.to_vec()
            }
        }
    }

    /// Translate every line or fail as a whole.
    pub async fn try_translate(&self, lines: &[LyricLine], language: &str) -> Result<Vec<LyricLine>> {
        let results = join_all(lines.iter().map(|line| self.translate_line(line, language))).await;
        results.into_iter().collect()
    }

    async fn translate_line(&self, line: &LyricLine, language: &str) -> Result<LyricLine> {
        let Some(text) = line.translation.as_deref() else {
            return Ok(line.clone());
        };

        let answer = self.client.invoke(translation_request(text, language)).await?;
        let translation = decode_translation(answer)?;
        Ok(LyricLine {
            translation: Some(translation),
            ..line.clone()
        })
    }
}
