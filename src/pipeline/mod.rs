//! Pipeline entry points for crawler operations.
//!
//! - `run_races`: Fixture export → normalize → decorate → reconcile
//! - `run_departures`: Start lists of recent races
//! - `run_instructions`: Instruction documents of upcoming races
//! - `run_news`: Federation news feed
//!
//! Every pipeline returns a `Result`; [`run`] is the outer boundary that
//! turns it into a logged boolean.

pub mod departures;
pub mod instructions;
pub mod news;
pub mod races;
pub mod schedule;

pub use departures::run_departures;
pub use instructions::run_instructions;
pub use news::run_news;
pub use races::run_races;
pub use schedule::serve;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Datelike, Local};

use crate::error::{AppError, Result};
use crate::models::{Config, ScheduleConfig};
use crate::storage::StoreProvider;
use crate::utils::http::Transport;
use crate::utils::render::Renderer;

/// Collaborators shared by every pipeline.
#[derive(Clone)]
pub struct Context {
    pub config: Arc<Config>,
    pub transport: Arc<dyn Transport>,
    pub renderer: Arc<dyn Renderer>,
    pub store: Arc<dyn StoreProvider>,
}

/// The independently schedulable pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum PipelineKind {
    Races,
    Departures,
    Instructions,
    News,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 4] = [
        PipelineKind::Races,
        PipelineKind::Departures,
        PipelineKind::Instructions,
        PipelineKind::News,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PipelineKind::Races => "races",
            PipelineKind::Departures => "departures",
            PipelineKind::Instructions => "instructions",
            PipelineKind::News => "news",
        }
    }

    /// Cron expression configured for this pipeline.
    pub fn cron(self, schedule: &ScheduleConfig) -> Option<&str> {
        match self {
            PipelineKind::Races => schedule.races.as_deref(),
            PipelineKind::Departures => schedule.departures.as_deref(),
            PipelineKind::Instructions => schedule.instructions.as_deref(),
            PipelineKind::News => schedule.news.as_deref(),
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PipelineKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        PipelineKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s.trim().to_lowercase())
            .ok_or_else(|| AppError::config(format!("unknown pipeline '{s}'")))
    }
}

/// Await a pipeline, logging its summary or its error.
pub async fn run_guarded<S, F>(name: &str, pipeline: F) -> bool
where
    S: fmt::Display,
    F: Future<Output = Result<S>>,
{
    let started = Instant::now();
    log::info!("[{name}] starting");
    match pipeline.await {
        Ok(summary) => {
            log::info!("[{name}] done in {:.1?}: {summary}", started.elapsed());
            true
        }
        Err(e) => {
            log::error!("[{name}] failed after {:.1?}: {e}", started.elapsed());
            false
        }
    }
}

/// Run one pipeline once. Never fails; the outcome is logged.
pub async fn run(kind: PipelineKind, ctx: &Context) -> bool {
    let today = Local::now().date_naive();
    match kind {
        PipelineKind::Races => run_guarded(kind.name(), run_races(ctx, today.year())).await,
        PipelineKind::Departures => run_guarded(kind.name(), run_departures(ctx, today)).await,
        PipelineKind::Instructions => {
            run_guarded(kind.name(), run_instructions(ctx, today)).await
        }
        PipelineKind::News => run_guarded(kind.name(), run_news(ctx)).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_kind_from_str() {
        assert_eq!("races".parse::<PipelineKind>().unwrap(), PipelineKind::Races);
        assert_eq!(" News ".parse::<PipelineKind>().unwrap(), PipelineKind::News);
        assert!("archive".parse::<PipelineKind>().is_err());
    }

    #[test]
    fn test_cron_lookup() {
        let schedule = ScheduleConfig {
            races: Some("0 */15 * * * *".into()),
            ..ScheduleConfig::default()
        };
        assert_eq!(PipelineKind::Races.cron(&schedule), Some("0 */15 * * * *"));
        assert_eq!(PipelineKind::News.cron(&schedule), None);
    }

    #[tokio::test]
    async fn test_run_guarded_converts_errors() {
        assert!(run_guarded("ok", async { Ok::<_, AppError>("3 races") }).await);
        assert!(!run_guarded("bad", async { Err::<&str, _>(AppError::crawl("x", "boom")) }).await);
    }
}
