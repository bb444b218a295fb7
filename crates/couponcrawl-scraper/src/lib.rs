pub mod crawler;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod reveal;
pub mod selectors;

pub use crawler::{Crawler, RunSummary};
pub use engine::{BrowserEngine, EngineError, NoBrowser};
pub use error::CrawlError;
pub use fetch::{Document, Fetcher};
pub use frontier::{CrawlRequest, Frontier, Label};
pub use reveal::RevealOutcome;
