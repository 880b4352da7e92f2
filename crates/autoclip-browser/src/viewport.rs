//! Viewport and scaling mode selection (§4.5.2).

use autoclip_models::Dimensions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// The browser context is created at `preview` size with a device scale
    /// factor; the encoder does no further scaling.
    DeviceScale,
    /// The browser context is created at `output` size; the encoder
    /// optionally scales if the viewport differs from `output`.
    Css,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderPlan {
    pub mode: RenderMode,
    pub viewport: Dimensions,
    pub device_scale_factor: f64,
}

/// Round a dimension down to the nearest even integer.
pub fn round_down_even(n: u32) -> u32 {
    (n / 2) * 2
}

fn round_down_even_dims(d: Dimensions) -> Dimensions {
    Dimensions { width: round_down_even(d.width), height: round_down_even(d.height) }
}

const SCALE_AGREEMENT_TOLERANCE: f64 = 0.02;

/// Choose device-scale vs. css rendering per §4.5.2. `preview` qualifies for
/// device-scale only when it's smaller than or equal to `output` in both
/// axes and the x/y scale factors agree within 2%.
pub fn compute_render_mode(output: Dimensions, preview: Option<Dimensions>) -> RenderPlan {
    let output = round_down_even_dims(output);

    let Some(preview) = preview.map(round_down_even_dims) else {
        return RenderPlan { mode: RenderMode::Css, viewport: output, device_scale_factor: 1.0 };
    };

    if preview.width > output.width || preview.height > output.height || preview.width == 0 || preview.height == 0 {
        return RenderPlan { mode: RenderMode::Css, viewport: output, device_scale_factor: 1.0 };
    }

    let scale_x = output.width as f64 / preview.width as f64;
    let scale_y = output.height as f64 / preview.height as f64;
    let relative_diff = (scale_x - scale_y).abs() / scale_x.max(scale_y);

    if relative_diff <= SCALE_AGREEMENT_TOLERANCE {
        RenderPlan { mode: RenderMode::DeviceScale, viewport: preview, device_scale_factor: scale_x }
    } else {
        RenderPlan { mode: RenderMode::Css, viewport: output, device_scale_factor: 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_preview_falls_back_to_css_at_output_size() {
        let plan = compute_render_mode(Dimensions { width: 1080, height: 1920 }, None);
        assert_eq!(plan.mode, RenderMode::Css);
        assert_eq!(plan.viewport.width, 1080);
    }

    #[test]
    fn matching_aspect_ratio_preview_uses_device_scale() {
        let output = Dimensions { width: 1080, height: 1920 };
        let preview = Dimensions { width: 540, height: 960 };
        let plan = compute_render_mode(output, Some(preview));
        assert_eq!(plan.mode, RenderMode::DeviceScale);
        assert_eq!(plan.viewport.width, 540);
        assert!((plan.device_scale_factor - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mismatched_aspect_ratio_preview_falls_back_to_css() {
        let output = Dimensions { width: 1080, height: 1920 };
        let preview = Dimensions { width: 540, height: 800 };
        let plan = compute_render_mode(output, Some(preview));
        assert_eq!(plan.mode, RenderMode::Css);
        assert_eq!(plan.viewport.width, 1080);
    }

    #[test]
    fn preview_larger_than_output_falls_back_to_css() {
        let output = Dimensions { width: 540, height: 960 };
        let preview = Dimensions { width: 1080, height: 1920 };
        let plan = compute_render_mode(output, Some(preview));
        assert_eq!(plan.mode, RenderMode::Css);
    }

    #[test]
    fn odd_dimensions_are_rounded_down_to_even() {
        assert_eq!(round_down_even(1079), 1078);
        assert_eq!(round_down_even(1920), 1920);
    }
}
