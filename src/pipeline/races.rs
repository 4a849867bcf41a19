// src/pipeline/races.rs

//! Race listing pipeline.

use std::fmt;

use crate::error::Result;
use crate::models::Race;
use crate::pipeline::Context;
use crate::services::{RaceDecorator, RaceNormalizer, YearPager, parse_fixture_csv};
use crate::storage::Reconciler;

#[derive(Debug, Default, PartialEq)]
pub struct RaceSummary {
    pub years: usize,
    pub races: usize,
    pub decorated: usize,
    /// Rows without a source id
    pub skipped: usize,
}

impl fmt::Display for RaceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} races saved over {} years ({} decorated, {} skipped)",
            self.races, self.years, self.decorated, self.skipped
        )
    }
}

/// Crawl every year from `start_year` until the export runs dry.
///
/// Each year is reconciled before the next one is requested.
pub async fn run_races(ctx: &Context, start_year: i32) -> Result<RaceSummary> {
    let source = &ctx.config.source;
    let reconciler = Reconciler::new(ctx.store.clone());
    let normalizer = RaceNormalizer::new(source);
    let decorator = RaceDecorator::new(ctx.transport.as_ref(), source)?;
    let mut pager = YearPager::new(ctx.transport.as_ref(), source, parse_fixture_csv, start_year);

    let mut summary = RaceSummary::default();
    while let Some((year, rows)) = pager.next_page().await? {
        log::info!("{}: parsed {} fixtures for {}", source.name, rows.len(), year);

        let mut races = normalizer.normalize_all(&rows);
        summary.decorated += decorator.decorate_all(&mut races).await?;

        let (races, unkeyed): (Vec<Race>, Vec<Race>) = races
            .into_iter()
            .partition(|race| !race.original_data_id.is_empty());
        if !unkeyed.is_empty() {
            log::warn!(
                "{}: {} fixtures of {} have no unique_id, not saved",
                source.name,
                unkeyed.len(),
                year
            );
            summary.skipped += unkeyed.len();
        }

        let ids = reconciler.reconcile(&races).await?;
        log::info!("{}: saved {} races of {}", source.name, ids.len(), year);

        summary.years += 1;
        summary.races += ids.len();
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use tempfile::TempDir;

    use crate::models::{SourceConfig, Terrain};
    use crate::storage::{Collection, ItemStore, Query, StoreProvider};
    use crate::utils::testing::{FakeRenderer, FakeTransport, test_context};

    const HEADER: &str = "unique_id;date;deadline;event_name;event_link;location;region;national";

    fn detail(terrain: &str) -> String {
        format!(
            r#"<table><tr><td>Terrain:</td><td>{terrain}</td></tr></table>
            <a href="results?type=start&rl_id=1">Startliste</a>"#
        )
    }

    fn scripted(source: &SourceConfig) -> FakeTransport {
        FakeTransport::new()
            .with_page(
                &source.fixtures_csv_url(2025),
                format!("{HEADER}\n7311;2025-04-06;;Nationaler OL;;Bern;BE;1\n;2025-05-01;;Ohne Id;;;;0"),
            )
            .with_page(
                &source.fixtures_csv_url(2026),
                format!("{HEADER}\n8100;2026-03-15;;Sprint OL;;Thun;BE;0"),
            )
            .with_page(&source.fixtures_csv_url(2027), HEADER)
            .with_page(&source.fixture_detail_url("7311"), detail("Wald"))
            .with_page(&source.fixture_detail_url("8100"), detail("Urban"))
    }

    #[tokio::test]
    async fn test_run_races_saves_every_year() {
        let tmp = TempDir::new().unwrap();
        let source = SourceConfig::default();
        let transport = Arc::new(scripted(&source));
        let ctx = test_context(tmp.path(), transport.clone(), FakeRenderer::new());

        let summary = run_races(&ctx, 2025).await.unwrap();
        assert_eq!(
            summary,
            RaceSummary {
                years: 2,
                races: 2,
                decorated: 2,
                skipped: 1
            }
        );
        // 3 export pages and 2 detail pages
        assert_eq!(transport.get_count(), 5);

        let races = Collection::<Race>::new(ctx.store.as_ref())
            .query(&Query::default())
            .await
            .unwrap();
        assert_eq!(races.len(), 2);
        assert_eq!(races[0].terrain, Some(Terrain::Forest));
        assert_eq!(
            races[0].departure_link.as_deref(),
            Some("https://www.o-l.ch/cgi-bin/results?type=start&rl_id=1")
        );
    }

    #[tokio::test]
    async fn test_rerun_keeps_fields_written_elsewhere() {
        let tmp = TempDir::new().unwrap();
        let source = SourceConfig::default();
        let ctx = test_context(tmp.path(), Arc::new(scripted(&source)), FakeRenderer::new());

        run_races(&ctx, 2025).await.unwrap();
        let store = ctx.store.items("Race");
        store
            .update_one(1, json!({"instructionLink": "https://x.ch/w.pdf"}).as_object().cloned().unwrap())
            .await
            .unwrap();

        run_races(&ctx, 2025).await.unwrap();
        let stored = store.read_by_query(&Query::default()).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0]["instructionLink"], "https://x.ch/w.pdf");
        assert_eq!(stored[0]["originalDataId"], "7311");
    }

    #[tokio::test]
    async fn test_recrawl_clears_withdrawn_scope_and_dates() {
        let tmp = TempDir::new().unwrap();
        let source = SourceConfig::default();
        let crawl = |row: &str| {
            FakeTransport::new()
                .with_page(&source.fixtures_csv_url(2025), format!("{HEADER}\n{row}"))
                .with_page(&source.fixtures_csv_url(2026), HEADER)
                .with_page(&source.fixture_detail_url("7311"), detail("Wald"))
        };

        let first = test_context(
            tmp.path(),
            Arc::new(crawl("7311;2025-04-06;2025-03-01;OL;;Bern;BE;1")),
            FakeRenderer::new(),
        );
        run_races(&first, 2025).await.unwrap();
        let stored = first.store.items("Race").read_by_query(&Query::default()).await.unwrap();
        assert_eq!(stored[0]["geographicalScale"], "national");
        assert_eq!(stored[0]["date"], "2025-04-06");

        let second = test_context(
            tmp.path(),
            Arc::new(crawl("7311;;;OL;;Bern;BE;0")),
            FakeRenderer::new(),
        );
        run_races(&second, 2025).await.unwrap();
        let stored = second.store.items("Race").read_by_query(&Query::default()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0]["geographicalScale"].is_null());
        assert!(stored[0]["date"].is_null());
        assert!(stored[0]["deadline"].is_null());
        // decorator fields survive
        assert_eq!(stored[0]["terrain"], "forest");
    }

    #[tokio::test]
    async fn test_detail_failure_aborts_run() {
        let tmp = TempDir::new().unwrap();
        let source = SourceConfig::default();
        let transport = FakeTransport::new().with_page(
            &source.fixtures_csv_url(2025),
            format!("{HEADER}\n7311;2025-04-06;;Nationaler OL;;Bern;BE;1"),
        );
        let ctx = test_context(tmp.path(), Arc::new(transport), FakeRenderer::new());

        assert!(run_races(&ctx, 2025).await.is_err());
        let stored = ctx.store.items("Race").read_by_query(&Query::default()).await.unwrap();
        assert!(stored.is_empty());
    }
}
