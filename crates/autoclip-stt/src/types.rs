//! Wire types for the external STT endpoint's `verbose_json` response shape
//! (word- and segment-level timestamps, per §4.4.3).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct VerboseJsonResponse {
    pub language: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub segments: Vec<SegmentTimestamp>,
    #[serde(default)]
    pub words: Vec<WordTimestamp>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentTimestamp {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WordTimestamp {
    pub start: f64,
    pub end: f64,
    pub word: String,
}

/// The result of transcribing one segment, relative to the segment's own
/// start (the caller is responsible for offset accumulation, §4.4.4).
#[derive(Debug, Clone, Default)]
pub struct SegmentTranscription {
    pub language: Option<String>,
    pub text: String,
    pub segments: Vec<autoclip_models::Segment>,
    pub words: Vec<autoclip_models::Word>,
}

impl From<VerboseJsonResponse> for SegmentTranscription {
    fn from(resp: VerboseJsonResponse) -> Self {
        Self {
            language: resp.language,
            text: resp.text.unwrap_or_default(),
            segments: resp.segments.into_iter().map(|s| autoclip_models::Segment { start: s.start, end: s.end, text: s.text }).collect(),
            words: resp.words.into_iter().map(|w| autoclip_models::Word { start: w.start, end: w.end, word: w.word }).collect(),
        }
    }
}
