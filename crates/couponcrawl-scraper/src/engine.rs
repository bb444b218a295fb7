//! Rendering-engine collaborator contract.
//!
//! Some offers only reveal their code after a real click in a real browser.
//! The crawl core does not bundle a browser; it specifies the few operations
//! the interactive reveal mode needs and lets the embedder supply them.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no rendering engine is configured")]
    Unavailable,

    #[error("timed out waiting for selector \"{css}\"")]
    WaitTimeout { css: String },

    #[error("rendering engine failure: {0}")]
    Backend(String),
}

/// Minimal browsing-context surface used by the interactive reveal mode.
///
/// One implementation drives one page at a time; the serial dispatcher never
/// issues overlapping calls.
pub trait BrowserEngine {
    /// Loads `url` and waits for the document to be ready.
    fn navigate(
        &self,
        url: &str,
    ) -> impl std::future::Future<Output = Result<(), EngineError>>;

    /// Blocks until `css` matches something in the live DOM, or times out.
    fn wait_for_selector(
        &self,
        css: &str,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<(), EngineError>>;

    /// Clicks the first element matching `css`.
    fn click(&self, css: &str) -> impl std::future::Future<Output = Result<(), EngineError>>;

    /// Reads the text content of the first element matching `css`.
    fn read_text(
        &self,
        css: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, EngineError>>;

    /// Reads attribute `attr` of the first element matching `css`.
    fn read_attr(
        &self,
        css: &str,
        attr: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, EngineError>>;
}

/// Null engine for runs without a browser; every call reports
/// [`EngineError::Unavailable`], which the reveal pipeline treats as the
/// interactive mode failing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBrowser;

impl BrowserEngine for NoBrowser {
    async fn navigate(&self, _url: &str) -> Result<(), EngineError> {
        Err(EngineError::Unavailable)
    }

    async fn wait_for_selector(&self, _css: &str, _timeout: Duration) -> Result<(), EngineError> {
        Err(EngineError::Unavailable)
    }

    async fn click(&self, _css: &str) -> Result<(), EngineError> {
        Err(EngineError::Unavailable)
    }

    async fn read_text(&self, _css: &str) -> Result<Option<String>, EngineError> {
        Err(EngineError::Unavailable)
    }

    async fn read_attr(&self, _css: &str, _attr: &str) -> Result<Option<String>, EngineError> {
        Err(EngineError::Unavailable)
    }
}
