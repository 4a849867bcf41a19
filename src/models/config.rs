//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Federation source endpoints and labels
    #[serde(default)]
    pub source: SourceConfig,

    /// Start list crawling
    #[serde(default)]
    pub departures: DeparturesConfig,

    /// Instruction document discovery
    #[serde(default)]
    pub instructions: InstructionsConfig,

    /// News feed crawling
    #[serde(default)]
    pub news: NewsConfig,

    /// Item store location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Cron expressions per pipeline
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Override selected values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var("CRAWLER_STORE_DIR") {
            self.storage.root_dir = PathBuf::from(dir);
        }
        if let Some(secs) = var("CRAWLER_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.crawler.timeout_secs = secs;
        }
        if let Some(agent) = var("CRAWLER_USER_AGENT") {
            self.crawler.user_agent = agent;
        }
        if let Some(cron) = var("CRAWLER_SCHEDULE_RACES") {
            self.schedule.races = Some(cron);
        }
        if let Some(cron) = var("CRAWLER_SCHEDULE_DEPARTURES") {
            self.schedule.departures = Some(cron);
        }
        if let Some(cron) = var("CRAWLER_SCHEDULE_INSTRUCTIONS") {
            self.schedule.instructions = Some(cron);
        }
        if let Some(cron) = var("CRAWLER_SCHEDULE_NEWS") {
            self.schedule.news = Some(cron);
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.source.name.trim().is_empty() {
            return Err(AppError::validation("source.name is empty"));
        }
        url::Url::parse(&self.source.base_url)
            .map_err(|e| AppError::validation(format!("source.base_url: {e}")))?;
        url::Url::parse(&self.news.list_url)
            .map_err(|e| AppError::validation(format!("news.list_url: {e}")))?;
        if self.source.links.inscription.is_empty() {
            return Err(AppError::validation(
                "source.links.inscription must list at least one keyword",
            ));
        }
        if self.instructions.keywords.is_empty() {
            return Err(AppError::validation("instructions.keywords is empty"));
        }
        if self.instructions.max_depth == 0 {
            return Err(AppError::validation("instructions.max_depth must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// One federation data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Value written to `originalDataSource`
    #[serde(default = "defaults::source_name")]
    pub name: String,

    /// Base for every endpoint and for completing relative links
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Country assigned to every race of this source
    #[serde(default = "defaults::country")]
    pub country: String,

    /// Anchor text keywords for the detail page links
    #[serde(default)]
    pub links: LinkLabels,
}

impl SourceConfig {
    /// URL of the yearly CSV export.
    pub fn fixtures_csv_url(&self, year: i32) -> String {
        format!("{}fixtures?&year={}&kind=-1&csv=1", self.base_url, year)
    }

    /// URL of the detail page of one fixture.
    pub fn fixture_detail_url(&self, unique_id: &str) -> String {
        format!("{}fixtures?&mode=show&unique_id={}", self.base_url, unique_id)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: defaults::source_name(),
            base_url: defaults::base_url(),
            country: defaults::country(),
            links: LinkLabels::default(),
        }
    }
}

/// Keywords matched against anchor text on a fixture detail page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkLabels {
    #[serde(default = "defaults::publication_label")]
    pub publication: String,
    #[serde(default = "defaults::ranking_label")]
    pub ranking: String,
    #[serde(default = "defaults::live_result_label")]
    pub live_result: String,
    #[serde(default = "defaults::departure_label")]
    pub departure: String,
    /// Registration portals; any of them marks a registration link
    #[serde(default = "defaults::inscription_labels")]
    pub inscription: Vec<String>,
}

impl Default for LinkLabels {
    fn default() -> Self {
        Self {
            publication: defaults::publication_label(),
            ranking: defaults::ranking_label(),
            live_result: defaults::live_result_label(),
            departure: defaults::departure_label(),
            inscription: defaults::inscription_labels(),
        }
    }
}

/// Start list crawling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeparturesConfig {
    /// Start lists stay online only briefly after a race
    #[serde(default = "defaults::departures_window_days")]
    pub window_days: i64,

    /// Delete departures of a re-crawled race whose participant disappeared
    #[serde(default = "defaults::prune_orphans")]
    pub prune_orphans: bool,
}

impl Default for DeparturesConfig {
    fn default() -> Self {
        Self {
            window_days: defaults::departures_window_days(),
            prune_orphans: defaults::prune_orphans(),
        }
    }
}

/// Instruction document discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionsConfig {
    /// Only races within this many days from today are searched
    #[serde(default = "defaults::lookahead_days")]
    pub lookahead_days: i64,

    /// Maximum number of hops away from the event website
    #[serde(default = "defaults::max_depth")]
    pub max_depth: usize,

    /// Keywords matched on the event website
    #[serde(default = "defaults::instruction_keywords")]
    pub keywords: Vec<String>,

    /// Keywords added once the first hop has been followed
    #[serde(default = "defaults::instruction_extra_keywords")]
    pub extra_keywords: Vec<String>,
}

impl Default for InstructionsConfig {
    fn default() -> Self {
        Self {
            lookahead_days: defaults::lookahead_days(),
            max_depth: defaults::max_depth(),
            keywords: defaults::instruction_keywords(),
            extra_keywords: defaults::instruction_extra_keywords(),
        }
    }
}

/// News feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Prefix for relative article links
    #[serde(default = "defaults::news_base_url")]
    pub base_url: String,

    /// Listing page
    #[serde(default = "defaults::news_list_url")]
    pub list_url: String,

    /// Substring every article href contains
    #[serde(default = "defaults::news_link_pattern")]
    pub link_pattern: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::news_base_url(),
            list_url: defaults::news_list_url(),
            link_pattern: defaults::news_link_pattern(),
        }
    }
}

/// Item store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::store_dir")]
    pub root_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: defaults::store_dir(),
        }
    }
}

/// Cron expressions (seconds first) per pipeline.
///
/// There are no defaults: a pipeline without an expression cannot be served.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub races: Option<String>,
    pub departures: Option<String>,
    pub instructions: Option<String>,
    pub news: Option<String>,
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; race-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Source defaults
    pub fn source_name() -> String {
        "solv".into()
    }
    pub fn base_url() -> String {
        "https://www.o-l.ch/cgi-bin/".into()
    }
    pub fn country() -> String {
        "switzerland".into()
    }
    pub fn publication_label() -> String {
        "Ausschreibung".into()
    }
    pub fn ranking_label() -> String {
        "Rangliste".into()
    }
    pub fn live_result_label() -> String {
        "Live".into()
    }
    pub fn departure_label() -> String {
        "Startliste".into()
    }
    pub fn inscription_labels() -> Vec<String> {
        vec!["pico".into(), "GO2OL".into(), "OL-Events".into()]
    }

    // Departures defaults
    pub fn departures_window_days() -> i64 {
        5
    }
    pub fn prune_orphans() -> bool {
        true
    }

    // Instructions defaults
    pub fn lookahead_days() -> i64 {
        60
    }
    pub fn max_depth() -> usize {
        2
    }
    pub fn instruction_keywords() -> Vec<String> {
        vec![
            "weisung".into(),
            "bulletin".into(),
            "directive".into(),
            "istruzion".into(),
        ]
    }
    pub fn instruction_extra_keywords() -> Vec<String> {
        vec!["pdf".into()]
    }

    // News defaults
    pub fn news_base_url() -> String {
        "https://www.swiss-orienteering.ch".into()
    }
    pub fn news_list_url() -> String {
        "https://www.swiss-orienteering.ch/news/ol.html".into()
    }
    pub fn news_link_pattern() -> String {
        "/news/ol/".into()
    }

    pub fn store_dir() -> PathBuf {
        PathBuf::from("storage/items")
    }
}
