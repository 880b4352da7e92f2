//! Timeline snapshot model: the editor's clip/asset graph, consumed (not authored)
//! by the render/export pipelines.
//!
//! Assets are tagged by `kind` via a `#[serde(tag = ...)]` enum rather than relying
//! on structural typing, so the audio-mix builder can enumerate exactly the
//! audio-contributing variants.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Discriminant for `Asset`. Only `Video` and `Audio` ever contribute to the
/// audio mix; `Image` and any future kind never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Video,
    Audio,
    Image,
}

impl AssetKind {
    /// Whether assets of this kind can contribute an audio track to the mix.
    pub fn is_audio_contributing(&self) -> bool {
        matches!(self, AssetKind::Video | AssetKind::Audio)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Asset {
    pub id: String,
    pub kind: AssetKind,
    /// Source URL for the asset's media. Absent assets (no URL) never
    /// contribute to the audio mix regardless of kind.
    #[serde(default)]
    pub url: Option<String>,
}

/// A placement of an asset on the timeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Clip {
    pub id: String,
    pub asset_id: String,
    /// Where this clip begins on the master timeline, in seconds.
    pub start_time: f64,
    /// Offset into the source asset where playback begins, in seconds.
    pub start_offset: f64,
    /// Duration of the clip on the timeline, in seconds.
    pub duration: f64,
}

/// Per-clip playback settings, keyed by clip id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClipSettings {
    #[serde(default)]
    pub muted: bool,
    /// Playback volume multiplier; 1.0 is unity gain.
    #[serde(default = "default_volume")]
    pub volume: f64,
    /// Playback speed multiplier; 1.0 is unchanged.
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub fade_enabled: bool,
    #[serde(default)]
    pub fade_in: f64,
    #[serde(default)]
    pub fade_out: f64,
}

fn default_volume() -> f64 {
    1.0
}

fn default_speed() -> f64 {
    1.0
}

impl ClipSettings {
    pub fn unmuted_default() -> Self {
        Self {
            muted: false,
            volume: 1.0,
            speed: 1.0,
            fade_enabled: false,
            fade_in: 0.0,
            fade_out: 0.0,
        }
    }
}

/// The editor's full state as consumed by the render/export pipelines.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TimelineSnapshot {
    pub assets: Vec<Asset>,
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub clip_settings: HashMap<String, ClipSettings>,
}

impl TimelineSnapshot {
    pub fn asset_for(&self, clip: &Clip) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == clip.asset_id)
    }

    pub fn settings_for(&self, clip: &Clip) -> ClipSettings {
        self.clip_settings
            .get(&clip.id)
            .cloned()
            .unwrap_or_else(ClipSettings::unmuted_default)
    }

    /// Clips that qualify to contribute a filter-graph fragment to the audio mix:
    /// asset kind is video/audio, the asset has a URL, duration is finite and
    /// positive, the clip is not muted, and volume is positive.
    pub fn audio_contributing_clips(&self) -> Vec<(&Clip, &Asset, ClipSettings)> {
        self.clips
            .iter()
            .filter_map(|clip| {
                let asset = self.asset_for(clip)?;
                if !asset.kind.is_audio_contributing() {
                    return None;
                }
                if asset.url.as_deref().unwrap_or("").is_empty() {
                    return None;
                }
                if !clip.duration.is_finite() || clip.duration <= 0.0 {
                    return None;
                }
                let settings = self.settings_for(clip);
                if settings.muted || settings.volume <= 0.0 {
                    return None;
                }
                Some((clip, asset, settings))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(clip: Clip, asset: Asset, settings: Option<ClipSettings>) -> TimelineSnapshot {
        let mut clip_settings = HashMap::new();
        if let Some(s) = settings {
            clip_settings.insert(clip.id.clone(), s);
        }
        TimelineSnapshot { assets: vec![asset], clips: vec![clip], clip_settings }
    }

    fn base_clip() -> Clip {
        Clip { id: "c1".into(), asset_id: "a1".into(), start_time: 0.0, start_offset: 0.0, duration: 5.0 }
    }

    fn base_asset() -> Asset {
        Asset { id: "a1".into(), kind: AssetKind::Video, url: Some("https://x/y.mp4".into()) }
    }

    #[test]
    fn qualifying_clip_contributes_exactly_one() {
        let snap = snapshot_with(base_clip(), base_asset(), None);
        assert_eq!(snap.audio_contributing_clips().len(), 1);
    }

    #[test]
    fn muted_clip_is_excluded() {
        let mut settings = ClipSettings::unmuted_default();
        settings.muted = true;
        let snap = snapshot_with(base_clip(), base_asset(), Some(settings));
        assert!(snap.audio_contributing_clips().is_empty());
    }

    #[test]
    fn zero_volume_is_excluded() {
        let mut settings = ClipSettings::unmuted_default();
        settings.volume = 0.0;
        let snap = snapshot_with(base_clip(), base_asset(), Some(settings));
        assert!(snap.audio_contributing_clips().is_empty());
    }

    #[test]
    fn image_asset_is_excluded() {
        let mut asset = base_asset();
        asset.kind = AssetKind::Image;
        let snap = snapshot_with(base_clip(), asset, None);
        assert!(snap.audio_contributing_clips().is_empty());
    }

    #[test]
    fn non_finite_duration_is_excluded() {
        let mut clip = base_clip();
        clip.duration = f64::NAN;
        let snap = snapshot_with(clip, base_asset(), None);
        assert!(snap.audio_contributing_clips().is_empty());
    }

    #[test]
    fn missing_url_is_excluded() {
        let mut asset = base_asset();
        asset.url = None;
        let snap = snapshot_with(base_clip(), asset, None);
        assert!(snap.audio_contributing_clips().is_empty());
    }
}
