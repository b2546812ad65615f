// Builtin resource table for the chat renderers (math, markdown, code, diagrams).

use serde_json::json;

use super::descriptor::ResourceDescriptor;
use super::Registry;
use crate::config::{LoaderConfig, DEFAULT_CDN_BASE};
use crate::error::RegistryError;

pub const KATEX: &str = "katex";
pub const KATEX_CSS: &str = "katex-css";
pub const KATEX_AUTO_RENDER: &str = "katex-auto-render";
pub const KATEX_MHCHEM: &str = "katex-mhchem";
pub const MARKED: &str = "marked";
pub const DOMPURIFY: &str = "dompurify";
pub const HIGHLIGHT: &str = "highlight";
pub const HIGHLIGHT_CSS: &str = "highlight-css";
pub const MERMAID: &str = "mermaid";

pub fn builtin_descriptors() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::stylesheet(KATEX_CSS).with_location("katex@0.16.9/dist/katex.min.css"),
        ResourceDescriptor::executable(KATEX, "katex")
            .with_location("katex@0.16.9/dist/katex.min.js")
            .with_dependency(KATEX_CSS),
        ResourceDescriptor::executable(KATEX_AUTO_RENDER, "renderMathInElement")
            .with_location("katex@0.16.9/dist/contrib/auto-render.min.js")
            .with_dependency(KATEX),
        // mhchem registers macros on the katex global and exports nothing itself.
        ResourceDescriptor::executable(KATEX_MHCHEM, "katex")
            .with_location("katex@0.16.9/dist/contrib/mhchem.min.js")
            .with_dependency(KATEX)
            .sharing_symbol_with(KATEX),
        ResourceDescriptor::executable(MARKED, "marked").with_location("marked@12.0.0/marked.min.js"),
        ResourceDescriptor::executable(DOMPURIFY, "DOMPurify")
            .with_location("dompurify@3.0.9/dist/purify.min.js"),
        ResourceDescriptor::stylesheet(HIGHLIGHT_CSS)
            .with_location("@highlightjs/cdn-assets@11.9.0/styles/github.min.css"),
        ResourceDescriptor::executable(HIGHLIGHT, "hljs")
            .with_location("@highlightjs/cdn-assets@11.9.0/highlight.min.js")
            .with_dependency(HIGHLIGHT_CSS),
        ResourceDescriptor::executable(MERMAID, "mermaid")
            .with_location("mermaid@10.9.0/dist/mermaid.min.js")
            .with_post_load(|host| {
                host.call_global(
                    "mermaid.initialize",
                    json!({ "startOnLoad": false, "securityLevel": "strict" }),
                )
            }),
    ]
}

/// The builtin table, resolved against `config` (CDN base defaults to jsDelivr).
pub fn builtin_registry(config: &LoaderConfig) -> Result<Registry, RegistryError> {
    let mut config = config.clone();
    if config.base_url.is_none() {
        config.base_url = Some(DEFAULT_CDN_BASE.to_string());
    }
    Ok(Registry::new(builtin_descriptors())?.with_config(&config))
}
