//! Navigation target construction for the editor export renderer (§4.5.3).
//!
//! Plain WebDriver sessions have no equivalent of a pre-navigation script
//! hook (no `addScriptToEvaluateOnNewDocument`), so the render payload isn't
//! injected into `window.__EDITOR_EXPORT__` by this crate directly. Instead
//! the navigation URL carries a `payloadId` the renderer resolves against the
//! core's own API, authenticated with the same render key — see DESIGN.md.

use autoclip_models::JobId;

/// Build the navigation target: the editor URL with `export=1`, the
/// shared-secret render key, and the id the renderer uses to fetch its
/// payload from the core.
pub fn build_navigation_url(editor_base_url: &str, render_key: &str, job_id: &JobId) -> String {
    let separator = if editor_base_url.contains('?') { '&' } else { '?' };
    format!("{editor_base_url}{separator}export=1&renderKey={render_key}&payloadId={job_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_query_params_with_correct_separator() {
        let job_id = JobId::from_string("job1".to_string());
        let url = build_navigation_url("https://editor.example.com/render", "secret", &job_id);
        assert_eq!(url, "https://editor.example.com/render?export=1&renderKey=secret&payloadId=job1");
    }

    #[test]
    fn preserves_existing_query_params() {
        let job_id = JobId::from_string("job1".to_string());
        let url = build_navigation_url("https://editor.example.com/render?theme=dark", "secret", &job_id);
        assert_eq!(url, "https://editor.example.com/render?theme=dark&export=1&renderKey=secret&payloadId=job1");
    }
}
