// src/plugins/mod.rs
pub mod info_disclosure;
pub mod reflection;
pub mod security_headers;
pub mod sql_injection;

use crate::error::AegisResult;
use crate::plugin::{PluginRegistry, ScannerPlugin};

/// The built-in detection set.
pub fn builtin() -> Vec<Box<dyn ScannerPlugin>> {
    vec![
        Box::new(security_headers::SecurityHeadersPlugin::new()),
        Box::new(info_disclosure::InfoDisclosurePlugin::new()),
        Box::new(reflection::ReflectionDetectorPlugin::new()),
        Box::new(sql_injection::SqlInjectionPlugin::new()),
    ]
}

/// Register every built-in plugin.
pub fn register_builtins(registry: &PluginRegistry) -> AegisResult<()> {
    for plugin in builtin() {
        registry.register(plugin)?;
    }
    Ok(())
}

/// Snippet of `text` around `position`, whitespace-collapsed.
pub(crate) fn extract_snippet(text: &str, position: usize, length: usize) -> String {
    let mut start = position.saturating_sub(30);
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (position + length).min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }

    text[start..end]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use url::Url;

    use crate::crawler::CrawledPage;
    use crate::http::HttpResponseData;
    use crate::plugin::{PluginContext, SafetyLevel};
    use crate::scanner::ScanConfiguration;

    pub fn context(url: &str, headers: &[(&str, &str)], body: &str) -> Arc<PluginContext> {
        context_with_level(url, headers, body, SafetyLevel::Expert)
    }

    pub fn context_with_level(
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
        max_level: SafetyLevel,
    ) -> Arc<PluginContext> {
        let url = Url::parse(url).unwrap();

        let mut header_map: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            header_map
                .entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }

        let response = HttpResponseData::new(200, "OK", header_map, body, Duration::from_millis(25));
        let page = Arc::new(CrawledPage::new(url.clone(), response, 0, Vec::new()));
        let config = ScanConfiguration::builder(url)
            .max_safety_level(max_level)
            .build();

        Arc::new(PluginContext::new(page, &config))
    }

    #[test]
    fn snippet_is_whitespace_collapsed() {
        let text = "before   the\n\n  match   after the match";
        let snippet = super::extract_snippet(text, 13, 10);
        assert_eq!(snippet, "before the match");
    }
}
