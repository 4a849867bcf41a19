//! Start list parsing.
//!
//! A start list page is preformatted text grouped by category:
//!
//! ```text
//! <b>H21E</b>
//! <pre>  ( 10.4 km, 480 m, 24 Po.)
//!   1 Hans Muster            85 Bern             OLG Bern         10:02
//!   2 Anna Beispiel-Meier    99 Thun             OL Regio Thun     10:04
//! </pre>
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::error::{AppError, Result};
use crate::models::{RaceCategory, User};
use crate::services::parse_selector;
use crate::storage::ItemId;

static CATEGORY_HEADER: LazyLock<std::result::Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"\(\s*([\d.]+)\s*km,\s*([\d.]+)\s*m,\s*(\d+)\s*Po\.\s*\)")
});

static DEPARTURE_LINE: LazyLock<std::result::Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+\s+(.+?)\s+(\d{2})\s+(.+?)\s+(.+?)\s+(\d{1,2}:\d{2})$")
});

/// Fail if a start list pattern did not compile.
fn check_patterns() -> Result<()> {
    for (name, compiled) in [
        ("category header", &*CATEGORY_HEADER),
        ("departure line", &*DEPARTURE_LINE),
    ] {
        if let Err(e) = compiled {
            return Err(AppError::crawl(format!("{name} pattern"), e));
        }
    }
    Ok(())
}

/// Course data from the header line of a category block.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseData {
    pub distance_in_meter: f64,
    pub equidistance_in_meter: f64,
    pub amount_of_controls: u32,
}

/// One line of a category block.
#[derive(Debug, Clone, PartialEq)]
pub struct StartLine {
    pub full_name: String,
    pub birth_year: i32,
    pub location: String,
    pub club: String,
    pub start_time_in_minutes: u32,
}

impl StartLine {
    pub fn composed_identifier(&self) -> String {
        composed_identifier(&self.full_name, self.birth_year)
    }

    /// Participant record for this line.
    pub fn to_user(&self) -> User {
        let (first_name, last_name) = split_name(&self.full_name);
        User {
            composed_identifier: self.composed_identifier(),
            first_name: Some(first_name),
            last_name: Some(last_name),
            birth_year: Some(self.birth_year),
            ..User::default()
        }
    }
}

/// A category block with its start lines.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBlock {
    pub name: String,
    pub course: CourseData,
    pub lines: Vec<StartLine>,
}

impl CategoryBlock {
    pub fn to_category(&self, race: ItemId) -> RaceCategory {
        RaceCategory {
            id: None,
            race,
            name: self.name.clone(),
            distance_in_meter: Some(self.course.distance_in_meter),
            equidistance_in_meter: Some(self.course.equidistance_in_meter),
            amount_of_controls: Some(self.course.amount_of_controls),
        }
    }
}

/// Parsed content of one start list page.
#[derive(Debug, Default, PartialEq)]
pub struct StartList {
    pub categories: Vec<CategoryBlock>,
    /// Blocks whose header line could not be read
    pub rejected: usize,
}

impl StartList {
    pub fn line_count(&self) -> usize {
        self.categories.iter().map(|c| c.lines.len()).sum()
    }

    /// Participants of the whole list, first occurrence of each identity only.
    pub fn users(&self) -> Vec<User> {
        let mut seen = HashSet::new();
        self.categories
            .iter()
            .flat_map(|category| category.lines.iter())
            .filter(|line| seen.insert(line.composed_identifier()))
            .map(StartLine::to_user)
            .collect()
    }
}

/// Resolve a 2-digit birth year relative to `current_year`.
///
/// Values above the current 2-digit year belong to the previous century.
pub fn expand_birth_year(short: u32, current_year: i32) -> i32 {
    let short = short as i32;
    if short > current_year.rem_euclid(100) {
        1900 + short
    } else {
        2000 + short
    }
}

/// Minutes since midnight of an `h:mm` or `hh:mm` time.
pub fn start_minutes(time: &str) -> Option<u32> {
    let (hours, minutes) = time.trim().split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    Some(hours * 60 + minutes)
}

/// Identity of a participant: the name without whitespace, lower-cased,
/// followed by the 4-digit birth year.
pub fn composed_identifier(full_name: &str, birth_year: i32) -> String {
    let name: String = full_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    format!("{name}{birth_year}")
}

/// First whitespace token and the remaining tokens.
pub fn split_name(full_name: &str) -> (String, String) {
    let mut tokens = full_name.split_whitespace();
    let first = tokens.next().unwrap_or_default().to_string();
    let rest = tokens.collect::<Vec<_>>().join(" ");
    (first, rest)
}

pub fn parse_course(line: &str) -> Option<CourseData> {
    let re = CATEGORY_HEADER.as_ref().ok()?;
    let caps = re.captures(line)?;
    let km: f64 = caps.get(1)?.as_str().parse().ok()?;
    let climb: f64 = caps.get(2)?.as_str().parse().ok()?;
    let controls: u32 = caps.get(3)?.as_str().parse().ok()?;
    Some(CourseData {
        distance_in_meter: (km * 1000.0).round(),
        equidistance_in_meter: climb,
        amount_of_controls: controls,
    })
}

pub fn parse_start_line(line: &str, current_year: i32) -> Option<StartLine> {
    let re = DEPARTURE_LINE.as_ref().ok()?;
    let caps = re.captures(line.trim_end())?;
    let short_year: u32 = caps.get(2)?.as_str().parse().ok()?;
    Some(StartLine {
        full_name: caps.get(1)?.as_str().trim().to_string(),
        birth_year: expand_birth_year(short_year, current_year),
        location: caps.get(3)?.as_str().trim().to_string(),
        club: caps.get(4)?.as_str().trim().to_string(),
        start_time_in_minutes: start_minutes(caps.get(5)?.as_str())?,
    })
}

/// Next sibling element of `element`, if it is a `<pre>`.
fn following_pre<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .find_map(ElementRef::wrap)
        .filter(|sibling| sibling.value().name() == "pre")
}

/// Parse a start list page.
///
/// `context` only labels warnings.
pub fn parse_start_list(html: &str, current_year: i32, context: &str) -> Result<StartList> {
    check_patterns()?;
    let document = Html::parse_document(html);
    let bold_sel = parse_selector("b")?;
    let mut list = StartList::default();

    for bold in document.select(&bold_sel) {
        let Some(pre) = following_pre(bold) else {
            continue;
        };
        let name = bold.text().collect::<String>().trim().to_string();
        let text: String = pre.text().collect();
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());

        let Some(course) = lines.next().and_then(|first| parse_course(first.trim())) else {
            log::warn!("Could not read category data of {} in {}", name, context);
            list.rejected += 1;
            continue;
        };

        let lines = lines
            .filter_map(|line| parse_start_line(line, current_year))
            .collect();
        list.categories.push(CategoryBlock {
            name,
            course,
            lines,
        });
    }

    Ok(list)
}
