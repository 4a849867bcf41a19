//! Data models for the crawler application.

pub mod config;
pub mod fixture;
pub mod instruction;
pub mod race;
pub mod start_list;

// Re-export for convenience
pub use config::{
    Config, CrawlerConfig, DeparturesConfig, InstructionsConfig, LinkLabels, NewsConfig,
    ScheduleConfig, SourceConfig, StorageConfig,
};
pub use fixture::FixtureRow;
pub use instruction::{NewsItem, RaceInstruction};
pub use race::{DistanceCategory, GeographicalScale, Race, Terrain};
pub use start_list::{RaceCategory, UNVERIFIED, User, UserDeparture};
