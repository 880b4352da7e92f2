//! Transcript data model: segments, words, and the merged transcript.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A contiguous time interval with text produced by the STT API for one audio chunk.
///
/// `start` is always strictly less than `end`, and `text` is always non-empty —
/// callers should not construct a `Segment` that violates either invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A single transcribed word with absolute timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Word {
    pub start: f64,
    pub end: f64,
    pub word: String,
}

/// The merged result of a transcription job: segments and words in absolute
/// (offset-accumulated) source-video time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Transcript {
    pub segments: Vec<Segment>,
    pub words: Vec<Word>,
    pub text: String,
    pub language: Option<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one successfully-transcribed segment's worth of output, translating
    /// its relative timestamps by `offset_seconds` before appending.
    ///
    /// `language` is only recorded the first time a non-empty value is observed,
    /// per the "first non-empty reported language across segments" rule.
    pub fn merge_segment(
        &mut self,
        offset_seconds: f64,
        segments: Vec<Segment>,
        words: Vec<Word>,
        text: &str,
        language: Option<&str>,
    ) {
        for seg in segments {
            self.segments.push(Segment {
                start: seg.start + offset_seconds,
                end: seg.end + offset_seconds,
                text: seg.text,
            });
        }
        for w in words {
            self.words.push(Word {
                start: w.start + offset_seconds,
                end: w.end + offset_seconds,
                word: w.word,
            });
        }
        if !text.trim().is_empty() {
            if self.text.is_empty() {
                self.text = text.trim().to_string();
            } else {
                self.text.push(' ');
                self.text.push_str(text.trim());
            }
        }
        if self.language.is_none() {
            if let Some(lang) = language {
                if !lang.trim().is_empty() {
                    self.language = Some(lang.trim().to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_accumulation_shifts_timestamps() {
        let mut t = Transcript::new();
        t.merge_segment(
            0.0,
            vec![Segment { start: 0.0, end: 2.0, text: "hello".into() }],
            vec![],
            "hello",
            Some("en"),
        );
        t.merge_segment(
            60.0,
            vec![Segment { start: 0.0, end: 3.0, text: "world".into() }],
            vec![],
            "world",
            Some(""),
        );

        assert_eq!(t.segments[0].start, 0.0);
        assert_eq!(t.segments[1].start, 60.0);
        assert_eq!(t.segments[1].end, 63.0);
        assert_eq!(t.text, "hello world");
        assert_eq!(t.language.as_deref(), Some("en"));
    }

    #[test]
    fn skipped_segment_still_advances_offset_at_call_site() {
        // merge_segment itself doesn't know about skipping; the pipeline is
        // responsible for calling it only on success and advancing the
        // offset accumulator regardless. This test documents the contract:
        // a skip that never calls merge_segment leaves segments unaffected.
        let mut t = Transcript::new();
        t.merge_segment(
            0.0,
            vec![Segment { start: 0.0, end: 1.0, text: "a".into() }],
            vec![],
            "a",
            None,
        );
        // segment at offset 60 was "skipped" (not merged)
        t.merge_segment(
            120.0,
            vec![Segment { start: 0.0, end: 1.0, text: "c".into() }],
            vec![],
            "c",
            None,
        );
        assert_eq!(t.segments.len(), 2);
        assert_eq!(t.segments[1].start, 120.0);
    }
}
