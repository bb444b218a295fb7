pub mod config;
pub mod records;
pub mod sink;

pub use config::{load_crawl_config, ConfigError, CrawlConfig, SeedMode};
pub use records::{BrandRecord, OfferRecord};
pub use sink::{MemorySink, RecordSink, SinkError};
