//! A3: count how many dates in `dates.txt` fall on a given weekday.

use crate::core::config::DateParsing;
use crate::core::context::ExecutionContext;
use crate::core::error::TaskError;
use crate::core::params::{ExtractionError, ParameterSet, ResolvedParams};
use crate::core::registry::{Capability, OperationDescriptor, Outcome};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use regex::Regex;
use std::sync::LazyLock;

const INPUT: &str = "dates.txt";

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

static WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)s?\b")
        .expect("static regex")
});

pub const DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "A3",
    summary: "Count dates in dates.txt falling on a weekday",
    matches,
    extract,
    handler,
    capabilities: &[Capability::Read, Capability::Write],
};

fn matches(text: &str) -> bool {
    text.contains(INPUT) && WEEKDAYS.iter().any(|d| text.contains(d))
}

fn extract(text: &str) -> Result<ParameterSet, ExtractionError> {
    let day = WEEKDAY
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
        .ok_or_else(|| ExtractionError::new("no weekday named in task"))?;
    Ok(ParameterSet::new().with_text("weekday", day))
}

const ISO_FORMATS: &[&str] = &["%Y-%m-%d"];
const ISO_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const LENIENT_FORMATS: &[&str] = &["%Y/%m/%d", "%d-%b-%Y", "%b %d, %Y", "%d %b %Y"];
const LENIENT_DATETIME_FORMATS: &[&str] = &["%Y/%m/%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse one line according to the configured policy.
pub fn parse_date(line: &str, policy: DateParsing) -> Option<NaiveDate> {
    let line = line.trim();
    let (dates, datetimes): (Vec<&str>, Vec<&str>) = match policy {
        DateParsing::Strict => (ISO_FORMATS.to_vec(), ISO_DATETIME_FORMATS.to_vec()),
        DateParsing::Lenient => (
            [ISO_FORMATS, LENIENT_FORMATS].concat(),
            [ISO_DATETIME_FORMATS, LENIENT_DATETIME_FORMATS].concat(),
        ),
    };
    dates
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(line, f).ok())
        .or_else(|| {
            datetimes
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(line, f).ok())
                .map(|dt| dt.date())
        })
}

/// Lines that fail to parse are skipped, not fatal.
pub fn count_weekday(content: &str, weekday: Weekday, policy: DateParsing) -> usize {
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| parse_date(l, policy))
        .filter(|d| d.weekday() == weekday)
        .count()
}

fn handler(ctx: &ExecutionContext<'_>, params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let day = params.text("weekday")?;
    let weekday: Weekday = day
        .parse()
        .map_err(|_| TaskError::ValidationError(format!("'{}' is not a weekday", day)))?;
    let input = ctx.path(INPUT)?;
    let output = ctx.path(&format!("dates-{}s.txt", day))?;

    let content = ctx.read_to_string(&input)?;
    let count = count_weekday(&content, weekday, ctx.config().date_parsing);
    let published = ctx.write_output(&output, count.to_string().as_bytes())?;
    Ok(Outcome::new(format!("Counted {} {}s in {}", count, capitalize(day), INPUT)).with_output(published))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
