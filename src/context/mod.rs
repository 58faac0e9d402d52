/// Per-round context gathering: uploaded documents and live web search.
pub mod documents;
pub mod search;

pub use documents::{Document, ExtractWarning, Extraction, MediaType, extract, truncate_chars};
pub use search::{
    BraveSearchProvider, DuckDuckGoProvider, SearchError, SearchHit, SearchProvider, search_context,
    web_search_provider,
};

use crate::personas::ContextSource;

const DOCUMENT_HEADER: &str = "[DOCUMENT CONTEXT]:";
const SEARCH_HEADER: &str = "[REAL-TIME SEARCH CONTEXT]:";

/// Shown to document personas when nothing was uploaded or readable.
pub const NO_DOCUMENTS_SENTINEL: &str = "[DOCUMENT CONTEXT]: No documents loaded.";
/// Shown to search personas when the search came back empty.
pub const NO_SEARCH_SENTINEL: &str = "[REAL-TIME SEARCH CONTEXT]: No search results available.";

/// Context blobs for one round. Never stored in the log.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoundContext {
    pub documents: String,
    pub search: String,
    /// Character budget applied to each blob at injection time.
    pub budget: usize,
}

impl RoundContext {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }

    pub fn with_documents(mut self, text: impl Into<String>) -> Self {
        self.documents = text.into();
        self
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    /// System prompt for a persona: its own prompt plus its context section.
    pub fn system_prompt(&self, prompt: &str, source: ContextSource) -> String {
        let (blob, header, sentinel) = match source {
            ContextSource::None => return prompt.to_string(),
            ContextSource::Documents => (&self.documents, DOCUMENT_HEADER, NO_DOCUMENTS_SENTINEL),
            ContextSource::WebSearch => (&self.search, SEARCH_HEADER, NO_SEARCH_SENTINEL),
        };

        let blob = truncate_chars(blob.trim(), self.budget);
        if blob.is_empty() {
            format!("{prompt}\n\n{sentinel}")
        } else {
            format!("{prompt}\n\n{header}\n{blob}\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_documents_use_sentinel() {
        let ctx = RoundContext::new(100);
        let prompt = ctx.system_prompt("You audit.", ContextSource::Documents);
        assert!(prompt.starts_with("You audit."));
        assert!(prompt.contains(NO_DOCUMENTS_SENTINEL));
    }

    #[test]
    fn context_free_persona_gets_bare_prompt() {
        let ctx = RoundContext::new(100).with_search("- a: b");
        assert_eq!(ctx.system_prompt("plain", ContextSource::None), "plain");
    }

    #[test]
    fn injected_blob_respects_budget() {
        let ctx = RoundContext::new(10).with_documents("x".repeat(500));
        let prompt = ctx.system_prompt("P", ContextSource::Documents);
        assert_eq!(prompt.matches('x').count(), 10);
    }

    #[test]
    fn search_blob_respects_budget() {
        let blob = format!("- Launch: {}", "y".repeat(500));
        let ctx = RoundContext::new(20).with_search(blob);
        let prompt = ctx.system_prompt("You are STORM.", ContextSource::WebSearch);
        assert!(prompt.contains("[REAL-TIME SEARCH CONTEXT]:\n- Launch: yyyyyyyyyy\n"));
        assert_eq!(prompt.matches('y').count(), 10);
    }

    #[test]
    fn search_blob_lands_under_its_header() {
        let ctx = RoundContext::new(1000).with_search("- Rust: 1.80 released");
        let prompt = ctx.system_prompt("You are STORM.", ContextSource::WebSearch);
        assert!(prompt.contains("[REAL-TIME SEARCH CONTEXT]:\n- Rust: 1.80 released"));
    }
}
