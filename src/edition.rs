use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};

use crate::{Error, Result};

/// Number of past days offered for selection, not counting today.
pub const SELECTABLE_DAYS: u64 = 7;

/// One day's edition of a publication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditionSelector {
    publication: String,
    edition: String,
    date: NaiveDate,
}

impl EditionSelector {
    /// Builds a selector, rejecting empty or path-unsafe codes and dates after `today`.
    pub fn new(
        publication: impl Into<String>,
        edition: impl Into<String>,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Self> {
        let publication = publication.into().trim().to_owned();
        let edition = edition.into().trim().to_owned();
        validate_code("publication", &publication)?;
        validate_code("edition", &edition)?;
        if date > today {
            return Err(Error::InvalidSelector(format!(
                "date {date} is in the future (today is {today})"
            )));
        }
        Ok(Self {
            publication,
            edition,
            date,
        })
    }

    pub fn publication(&self) -> &str {
        &self.publication
    }

    pub fn edition(&self) -> &str {
        &self.edition
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Date as used in repository URLs (`YYYYMMDD`).
    pub fn date_str(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }

    /// `cache_root/publication/edition/YYYY-MM-DD`
    pub fn cache_dir(&self, cache_root: &Path) -> PathBuf {
        cache_root
            .join(&self.publication)
            .join(&self.edition)
            .join(self.date.format("%Y-%m-%d").to_string())
    }
}

impl std::fmt::Display for EditionSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.publication, self.edition, self.date)
    }
}

fn validate_code(kind: &str, code: &str) -> Result<()> {
    if code.is_empty() {
        return Err(Error::InvalidSelector(format!("{kind} code must not be empty")));
    }
    if code == "." || code == ".." || code.contains(['/', '\\']) {
        return Err(Error::InvalidSelector(format!(
            "{kind} code must be a single path segment: {code}"
        )));
    }
    Ok(())
}

/// Dates offered for download: the days before `today`, newest first.
pub fn available_dates(today: NaiveDate) -> Vec<NaiveDate> {
    (1..=SELECTABLE_DAYS)
        .filter_map(|days| today.checked_sub_days(Days::new(days)))
        .collect()
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| Error::InvalidSelector(format!("date must be YYYY-MM-DD: {raw}: {err}")))
}
