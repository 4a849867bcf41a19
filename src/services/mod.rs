//! Service layer for the crawler application.
//!
//! This module contains the scraping logic for:
//! - Yearly fixture export paging (`YearPager`)
//! - Row normalization (`RaceNormalizer`)
//! - Detail page decoration (`RaceDecorator`)
//! - Start list parsing (`parse_start_list`)
//! - Instruction document discovery (`InstructionFinder`)
//! - News feed reading (`NewsReader`)

pub mod decorator;
pub mod departures;
pub mod fixtures;
pub mod instructions;
pub mod news;
pub mod normalizer;

pub use decorator::RaceDecorator;
pub use departures::{StartList, parse_start_list};
pub use fixtures::{YearPager, parse_fixture_csv};
pub use instructions::{Discovery, InstructionFinder};
pub use news::NewsReader;
pub use normalizer::RaceNormalizer;

use scraper::Selector;

use crate::error::{AppError, Result};

pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
