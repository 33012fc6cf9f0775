//! Port substitution for tool configs.
//!
//! The accessibility and performance configs in the repository point at the
//! development server origin (`http://localhost:8000`). Before an audit runs,
//! the URLs are rewritten to the audit port and written to a derived copy;
//! the original file is only ever read.

use serde_json::Value;
use std::path::Path;
use tracing::debug;

use siteqa_utils::error::RewriteError;

use crate::temp_config::{TempConfig, temp_path_for};

/// JSON pointer to the accessibility tester's URL list.
pub const ACCESSIBILITY_URLS: &str = "/urls";

/// JSON pointer to the performance auditor's URL, a string or a list.
pub const PERFORMANCE_URLS: &str = "/ci/collect/url";

/// `http://localhost:<port>`
#[must_use]
pub fn local_origin(port: u16) -> String {
    format!("http://localhost:{port}")
}

/// Replace every occurrence of `from` with `to` in the URL field at `pointer`.
///
/// The field may be a string or an array of strings. A missing field is left
/// alone. Any other shape is rejected before anything is modified. Returns
/// the number of URLs that changed.
pub fn rewrite_urls(
    doc: &mut Value,
    pointer: &str,
    from: &str,
    to: &str,
) -> Result<usize, RewriteError> {
    let Some(field) = doc.pointer_mut(pointer) else {
        debug!(pointer, "URL field absent, nothing to rewrite");
        return Ok(0);
    };

    match field {
        Value::String(url) => Ok(usize::from(replace_in(url, from, to))),
        Value::Array(items) if items.iter().all(Value::is_string) => Ok(items
            .iter_mut()
            .filter_map(|item| match item {
                Value::String(url) => Some(replace_in(url, from, to)),
                _ => None,
            })
            .filter(|changed| *changed)
            .count()),
        _ => Err(RewriteError::UnexpectedShape {
            field: pointer.to_string(),
        }),
    }
}

fn replace_in(url: &mut String, from: &str, to: &str) -> bool {
    if from.is_empty() || from == to || !url.contains(from) {
        return false;
    }
    *url = url.replace(from, to);
    true
}

/// Read `source`, rewrite its URLs, and write the result next to it.
///
/// The returned guard deletes the derived file when dropped.
pub fn derive_config(
    source: &Path,
    pointer: &str,
    from: &str,
    to: &str,
) -> Result<TempConfig, RewriteError> {
    let raw = std::fs::read_to_string(source).map_err(|e| RewriteError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;
    let mut doc: Value = serde_json::from_str(&raw).map_err(|e| RewriteError::Parse {
        path: source.to_path_buf(),
        source: e,
    })?;

    let changed = rewrite_urls(&mut doc, pointer, from, to)?;
    debug!(source = %source.display(), pointer, changed, to, "Rewrote tool config URLs");

    let mut body =
        serde_json::to_vec_pretty(&doc).map_err(|e| RewriteError::Write(std::io::Error::other(e)))?;
    body.push(b'\n');

    TempConfig::write(temp_path_for(source), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const DEV: &str = "http://localhost:8000";
    const AUDIT: &str = "http://localhost:8001";

    #[test]
    fn test_accessibility_urls_rewritten() {
        let mut doc = json!({"urls": ["http://localhost:8000/index.html"]});

        let changed = rewrite_urls(&mut doc, ACCESSIBILITY_URLS, DEV, AUDIT).unwrap();

        assert_eq!(changed, 1);
        assert_eq!(doc, json!({"urls": ["http://localhost:8001/index.html"]}));
    }

    #[test]
    fn test_performance_url_string_and_list() {
        let mut single = json!({"ci": {"collect": {"url": "http://localhost:8000/", "numberOfRuns": 3}}});
        rewrite_urls(&mut single, PERFORMANCE_URLS, DEV, AUDIT).unwrap();
        assert_eq!(
            single,
            json!({"ci": {"collect": {"url": "http://localhost:8001/", "numberOfRuns": 3}}})
        );

        let mut list = json!({"ci": {"collect": {"url": [
            "http://localhost:8000/",
            "http://localhost:8000/resume.html",
            "https://example.com/"
        ]}}});
        let changed = rewrite_urls(&mut list, PERFORMANCE_URLS, DEV, AUDIT).unwrap();
        assert_eq!(changed, 2);
        assert_eq!(list["ci"]["collect"]["url"][2], "https://example.com/");
    }

    #[test]
    fn test_missing_field_is_noop() {
        let mut doc = json!({"defaults": {"standard": "WCAG2AA"}});
        let before = doc.clone();

        assert_eq!(rewrite_urls(&mut doc, ACCESSIBILITY_URLS, DEV, AUDIT).unwrap(), 0);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_same_origin_is_noop() {
        let mut doc = json!({"urls": ["http://localhost:8000/a", "http://localhost:8000/b"]});
        let before = doc.clone();

        assert_eq!(rewrite_urls(&mut doc, ACCESSIBILITY_URLS, DEV, DEV).unwrap(), 0);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_mixed_array_rejected_untouched() {
        let mut doc = json!({"urls": ["http://localhost:8000/", 42]});
        let before = doc.clone();

        let err = rewrite_urls(&mut doc, ACCESSIBILITY_URLS, DEV, AUDIT).unwrap_err();
        assert!(matches!(err, RewriteError::UnexpectedShape { .. }));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_derive_config_leaves_original_untouched() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("pa11yci.json");
        let original = r#"{"urls": ["http://localhost:8000/index.html"], "defaults": {"timeout": 30000}}"#;
        std::fs::write(&source, original).unwrap();

        let derived = derive_config(&source, ACCESSIBILITY_URLS, DEV, AUDIT).unwrap();
        let derived_path = derived.path().to_path_buf();

        assert_eq!(derived_path, dir.path().join("pa11yci_temp.json"));
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&derived_path).unwrap()).unwrap();
        assert_eq!(written["urls"][0], "http://localhost:8001/index.html");
        assert_eq!(written["defaults"]["timeout"], 30000);
        assert_eq!(std::fs::read_to_string(&source).unwrap(), original);

        drop(derived);
        assert!(!derived_path.exists());
    }

    #[test]
    fn test_derive_config_errors() {
        let dir = TempDir::new().unwrap();

        let missing = derive_config(&dir.path().join("nope.json"), ACCESSIBILITY_URLS, DEV, AUDIT);
        assert!(matches!(missing, Err(RewriteError::Read { .. })));

        let broken = dir.path().join("lighthouserc.json");
        std::fs::write(&broken, "{ not json").unwrap();
        let parse = derive_config(&broken, PERFORMANCE_URLS, DEV, AUDIT);
        assert!(matches!(parse, Err(RewriteError::Parse { .. })));
        assert!(!dir.path().join("lighthouserc_temp.json").exists());
    }
}
