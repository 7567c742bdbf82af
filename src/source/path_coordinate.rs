use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use thiserror::Error;

use crate::dimension::CoordinateValue;

/// A file name that does not contain the expected coordinate.
///
/// This is distinct from a [`SourceError`](super::SourceError), so a series scan can skip the file and continue.
#[derive(Clone, Debug, Error)]
#[error("malformed path {path:?}: {reason}")]
pub struct MalformedPathError {
    path: PathBuf,
    reason: String,
}

impl MalformedPathError {
    /// Create a new malformed path error.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// The path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The reason the path is malformed.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[derive(Clone, Debug)]
enum CoordinateKind {
    DateTime(String),
    Date(String),
    Integer,
    Float,
}

/// Parses a series coordinate from a file name.
///
/// The coordinate is the first capture group of a regular expression, or the whole match if the expression has no groups.
/// Only the file name is searched, not the parent directories.
///
/// ```
/// # use rasterstack::source::PathCoordinateParser;
/// # use rasterstack::dimension::CoordinateValue;
/// let parser = PathCoordinateParser::date(r"_(\d{8})\.", "%Y%m%d")?;
/// let value = parser.parse("data/SMAP_L4_20160101.gsf".as_ref())?;
/// assert!(value.is_time());
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct PathCoordinateParser {
    pattern: Regex,
    kind: CoordinateKind,
}

impl PathCoordinateParser {
    /// Parse a [`NaiveDateTime`] with the [`chrono`] format `format`.
    ///
    /// # Errors
    /// Returns a [`regex::Error`] if `pattern` is not a valid regular expression.
    pub fn datetime(pattern: &str, format: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            kind: CoordinateKind::DateTime(format.into()),
        })
    }

    /// Parse a [`NaiveDate`] with the [`chrono`] format `format`, as midnight on that date.
    ///
    /// # Errors
    /// Returns a [`regex::Error`] if `pattern` is not a valid regular expression.
    pub fn date(pattern: &str, format: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            kind: CoordinateKind::Date(format.into()),
        })
    }

    /// Parse an integer.
    ///
    /// # Errors
    /// Returns a [`regex::Error`] if `pattern` is not a valid regular expression.
    pub fn integer(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            kind: CoordinateKind::Integer,
        })
    }

    /// Parse a finite floating point number.
    ///
    /// # Errors
    /// Returns a [`regex::Error`] if `pattern` is not a valid regular expression.
    pub fn float(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            kind: CoordinateKind::Float,
        })
    }

    /// Parse a [`NaiveDateTime`] from token `index` of the file stem split on `separator`.
    ///
    /// For example, token 4 of `SMAP_L4_SM_gph_20160101T223000_Vv4011_001` split on `_` is `20160101T223000`.
    ///
    /// # Errors
    /// Returns a [`regex::Error`] if the pattern cannot be built.
    pub fn token(
        separator: char,
        index: usize,
        format: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        let separator = regex::escape(&separator.to_string());
        let pattern = format!("^(?:[^{separator}]*{separator}){{{index}}}([^{separator}.]+)");
        Self::datetime(&pattern, format)
    }

    /// Parse the coordinate from the file name of `path`.
    ///
    /// # Errors
    /// Returns a [`MalformedPathError`] if the pattern does not match or the matched text cannot be parsed.
    pub fn parse(&self, path: &Path) -> Result<CoordinateValue, MalformedPathError> {
        let file_name = path
            .file_name()
            .and_then(std::ffi::OsStr::to_str)
            .ok_or_else(|| MalformedPathError::new(path, "no file name"))?;
        let captures = self.pattern.captures(file_name).ok_or_else(|| {
            MalformedPathError::new(path, format!("no match for {}", self.pattern.as_str()))
        })?;
        let text = captures
            .get(1)
            .or_else(|| captures.get(0))
            .map_or("", |capture| capture.as_str());
        let malformed = |error: &dyn std::fmt::Display| {
            MalformedPathError::new(path, format!("cannot parse {text:?}: {error}"))
        };
        match &self.kind {
            CoordinateKind::DateTime(format) => NaiveDateTime::parse_from_str(text, format)
                .map(CoordinateValue::Time)
                .map_err(|error| malformed(&error)),
            CoordinateKind::Date(format) => NaiveDate::parse_from_str(text, format)
                .map(|date| CoordinateValue::Time(date.and_time(chrono::NaiveTime::MIN)))
                .map_err(|error| malformed(&error)),
            CoordinateKind::Integer => text
                .parse::<i64>()
                .map(CoordinateValue::Int)
                .map_err(|error| malformed(&error)),
            CoordinateKind::Float => match text.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(CoordinateValue::Float(value)),
                Ok(_) => Err(malformed(&"not a finite number")),
                Err(error) => Err(malformed(&error)),
            },
        }
    }
}
