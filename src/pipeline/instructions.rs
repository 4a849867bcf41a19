// src/pipeline/instructions.rs

//! Instruction document pipeline.

use std::fmt;

use chrono::{Duration, NaiveDate};
use serde_json::Value;

use crate::error::Result;
use crate::models::{Race, RaceInstruction};
use crate::pipeline::Context;
use crate::services::{Discovery, InstructionFinder};
use crate::storage::{Collection, Entity, Filter, Item, ItemId, ItemStore, Query, Reconciler, StoreProvider};
use crate::utils::has_pdf_path;
use crate::utils::render::{RenderSession, Renderer};

#[derive(Debug, Default, PartialEq)]
pub struct InstructionSummary {
    pub races: usize,
    /// Event links that are documents themselves
    pub direct: usize,
    pub discovered: usize,
    pub not_found: usize,
}

impl fmt::Display for InstructionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} instruction links saved for {} races ({} direct, {} not found)",
            self.direct + self.discovered,
            self.races,
            self.direct,
            self.not_found
        )
    }
}

/// Races with a website taking place within the next `lookahead_days`.
pub fn upcoming_races_query(today: NaiveDate, lookahead_days: i64) -> Query {
    let until = today + Duration::days(lookahead_days);
    Query::filtered(Filter::And(vec![
        Filter::not_null("eventLink"),
        Filter::gte("date", today.to_string()),
        Filter::lt("date", until.to_string()),
    ]))
}

pub async fn run_instructions(ctx: &Context, today: NaiveDate) -> Result<InstructionSummary> {
    let query = upcoming_races_query(today, ctx.config.instructions.lookahead_days);
    let races = Collection::<Race>::new(ctx.store.as_ref()).query(&query).await?;
    let races: Vec<(ItemId, String)> = races
        .into_iter()
        .filter_map(|race| Some((race.id?, race.event_link?)))
        .collect();
    log::info!("{} upcoming races with a website", races.len());

    let mut summary = InstructionSummary {
        races: races.len(),
        ..InstructionSummary::default()
    };

    let (documents, websites): (Vec<_>, Vec<_>) =
        races.into_iter().partition(|(_, link)| has_pdf_path(link));

    let race_store = ctx.store.items(Race::COLLECTION);
    for (race_id, link) in &documents {
        let mut patch = Item::new();
        patch.insert("instructionLink".into(), Value::from(link.as_str()));
        race_store.update_one(*race_id, patch).await?;
        summary.direct += 1;
    }

    if websites.is_empty() {
        return Ok(summary);
    }

    let mut session = ctx.renderer.acquire().await?;
    let result = search_websites(ctx, session.as_mut(), &websites, &mut summary).await;
    if let Err(e) = session.release().await {
        log::warn!("Failed to release browser session: {}", e);
    }
    result?;

    Ok(summary)
}

async fn search_websites(
    ctx: &Context,
    session: &mut dyn RenderSession,
    websites: &[(ItemId, String)],
    summary: &mut InstructionSummary,
) -> Result<()> {
    let reconciler = Reconciler::new(ctx.store.clone());
    let finder = InstructionFinder::new(ctx.transport.as_ref(), &ctx.config.instructions)?;

    for (race_id, link) in websites {
        log::info!("Reading website of race #{} to find instruction link", race_id);
        match finder.find(session, link).await {
            Discovery::Document { link, depth } => {
                log::info!("Found instruction link {} ({} hops)", link, depth);
                reconciler
                    .reconcile(&[RaceInstruction::crawled(*race_id, link)])
                    .await?;
                summary.discovered += 1;
            }
            other => {
                log::debug!("No instruction link for race #{}: {:?}", race_id, other);
                summary.not_found += 1;
            }
        }
    }
    Ok(())
}
