// src/pipeline/departures.rs

//! Start list pipeline.
//!
//! Per eligible race: categories, then participants, then departures, each
//! reconciled by natural key and re-read to learn the store ids the next
//! step refers to.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde_json::Value;

use crate::error::Result;
use crate::models::{Race, RaceCategory, User, UserDeparture};
use crate::pipeline::Context;
use crate::services::{StartList, parse_start_list};
use crate::storage::{
    Collection, Entity, Filter, ItemId, ItemStore, Query, Reconciler, StoreProvider, item_id,
};
use crate::utils::decode_latin1;
use crate::utils::http::Transport;

#[derive(Debug, Default, PartialEq)]
pub struct DepartureSummary {
    pub races: usize,
    pub categories: usize,
    pub users: usize,
    pub departures: usize,
    /// Category blocks without readable course data
    pub rejected_blocks: usize,
    /// Lines whose category or participant could not be resolved
    pub unresolved: usize,
    pub pruned: usize,
    /// Races whose start list was empty
    pub empty: usize,
}

impl fmt::Display for DepartureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} departures in {} categories of {} races ({} users, {} rejected blocks, {} unresolved, {} pruned)",
            self.departures,
            self.categories,
            self.races,
            self.users,
            self.rejected_blocks,
            self.unresolved,
            self.pruned
        )
    }
}

/// Races with a start list link that took place at most `window_days` ago.
pub fn eligible_races_query(today: NaiveDate, window_days: i64) -> Query {
    let earliest = today - Duration::days(window_days);
    Query::filtered(Filter::And(vec![
        Filter::not_null("departureLink"),
        Filter::gte("date", earliest.to_string()),
    ]))
}

pub async fn run_departures(ctx: &Context, today: NaiveDate) -> Result<DepartureSummary> {
    let reconciler = Reconciler::new(ctx.store.clone());
    let query = eligible_races_query(today, ctx.config.departures.window_days);
    let races = Collection::<Race>::new(ctx.store.as_ref()).query(&query).await?;
    log::info!("{} races with start lists", races.len());

    let mut summary = DepartureSummary::default();
    for race in &races {
        let (Some(race_id), Some(link)) = (race.id, race.departure_link.as_deref()) else {
            continue;
        };

        log::info!("Crawling start list of {}", race.label());
        let Some(body) = ctx.transport.get(&format!("{link}&kind=all")).await? else {
            log::warn!("Could not load start list of {}", race.label());
            summary.empty += 1;
            continue;
        };

        let list = parse_start_list(&decode_latin1(&body), today.year(), &race.label())?;
        summary.rejected_blocks += list.rejected;
        save_start_list(ctx, &reconciler, race_id, &list, &mut summary).await?;
        summary.races += 1;
    }

    Ok(summary)
}

async fn save_start_list(
    ctx: &Context,
    reconciler: &Reconciler,
    race_id: ItemId,
    list: &StartList,
    summary: &mut DepartureSummary,
) -> Result<()> {
    // 1. categories
    let mut names = HashSet::new();
    let categories: Vec<RaceCategory> = list
        .categories
        .iter()
        .filter(|block| names.insert(block.name.clone()))
        .map(|block| block.to_category(race_id))
        .collect();
    let category_ids = reconciler.reconcile(&categories).await?;
    let category_by_name: HashMap<String, ItemId> =
        Collection::<RaceCategory>::new(ctx.store.as_ref())
            .read_many(&category_ids, &["id", "name"])
            .await?
            .into_iter()
            .filter_map(|category| category.id.map(|id| (category.name, id)))
            .collect();
    summary.categories += category_ids.len();

    // 2. participants
    let users = list.users();
    let user_ids = reconciler.reconcile(&users).await?;
    let user_by_identity: HashMap<String, ItemId> = Collection::<User>::new(ctx.store.as_ref())
        .read_many(&user_ids, &["id", "composedIdentifier"])
        .await?
        .into_iter()
        .filter_map(|user| user.id.map(|id| (user.composed_identifier, id)))
        .collect();
    summary.users += user_ids.len();

    // 3. departures
    let mut departures = Vec::new();
    let mut seen_users = HashSet::new();
    for block in &list.categories {
        let Some(&category_id) = category_by_name.get(&block.name) else {
            log::warn!("Could not find related race category {}, but should exist", block.name);
            summary.unresolved += block.lines.len();
            continue;
        };
        for line in &block.lines {
            let identity = line.composed_identifier();
            let Some(&user_id) = user_by_identity.get(&identity) else {
                log::warn!("Could not find related user {}, but should exist", identity);
                summary.unresolved += 1;
                continue;
            };
            if !seen_users.insert(user_id) {
                log::debug!("{} starts more than once, keeping the first start", identity);
                continue;
            }
            departures.push(UserDeparture {
                id: None,
                race: race_id,
                user: user_id,
                race_category: category_id,
                start_time_in_minutes: line.start_time_in_minutes,
            });
        }
    }
    let departure_ids = reconciler.reconcile(&departures).await?;
    summary.departures += departure_ids.len();

    // 4. orphans
    if ctx.config.departures.prune_orphans && !departure_ids.is_empty() {
        summary.pruned += prune_orphans(ctx, race_id, &seen_users).await?;
    }
    Ok(())
}

/// Delete departures of `race_id` whose participant is not in `fresh_users`.
async fn prune_orphans(
    ctx: &Context,
    race_id: ItemId,
    fresh_users: &HashSet<ItemId>,
) -> Result<usize> {
    let store = ctx.store.items(UserDeparture::COLLECTION);
    let query = Query::filtered(Filter::eq("race", race_id)).with_fields(&["id", "user"]);

    let orphans: Vec<ItemId> = store
        .read_by_query(&query)
        .await?
        .iter()
        .filter(|item| {
            item.get("user")
                .and_then(Value::as_u64)
                .is_none_or(|user| !fresh_users.contains(&user))
        })
        .filter_map(item_id)
        .collect();

    if !orphans.is_empty() {
        log::info!("Removing {} departures no longer on the start list", orphans.len());
        store.delete_many(&orphans).await?;
    }
    Ok(orphans.len())
}
