//! FFmpeg filter fragments for the vertical render pipeline (§4.6).

/// Target height in pixels for a given render quality, per §4.6.
pub fn target_height(quality: autoclip_models::RenderQuality, configured_min_height: u32) -> u32 {
    match quality {
        autoclip_models::RenderQuality::High => 1920,
        autoclip_models::RenderQuality::Medium => 1600,
        autoclip_models::RenderQuality::Low => configured_min_height,
    }
}

/// Clamp a source fps to `[24, configured_max]`.
pub fn clamp_fps(source_fps: Option<f64>, configured_max: f64) -> f64 {
    source_fps.unwrap_or(configured_max).min(configured_max).max(24.0)
}

/// Build a 9:16 scale+pad filter targeting `height` (width derived as
/// `height * 9 / 16`, rounded down to even).
pub fn filter_vertical_scale(height: u32) -> String {
    let width = ((height as f64 * 9.0 / 16.0) / 2.0).floor() as u32 * 2;
    let height = (height / 2) * 2;
    format!(
        "scale={width}:{height}:force_original_aspect_ratio=decrease,pad={width}:{height}:(ow-iw)/2:(oh-ih)/2"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoclip_models::RenderQuality;

    #[test]
    fn target_height_matches_quality_table() {
        assert_eq!(target_height(RenderQuality::High, 800), 1920);
        assert_eq!(target_height(RenderQuality::Medium, 800), 1600);
        assert_eq!(target_height(RenderQuality::Low, 800), 800);
    }

    #[test]
    fn fps_is_clamped_to_24_minimum() {
        assert_eq!(clamp_fps(Some(10.0), 30.0), 24.0);
        assert_eq!(clamp_fps(Some(60.0), 30.0), 30.0);
        assert_eq!(clamp_fps(None, 30.0), 30.0);
    }

    #[test]
    fn vertical_scale_dimensions_are_even_and_9_16() {
        let filter = filter_vertical_scale(1601);
        assert!(filter.contains("scale=900:1600"));
    }
}
