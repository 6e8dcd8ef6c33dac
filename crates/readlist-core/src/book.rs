//! Book records and validation of raw catalog JSON.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::CatalogError;
use crate::genre::title_case;

/// Stable identifier carried by some catalog records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Publication year. Catalog data mixes numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Year {
    Number(i64),
    Text(String),
}

impl Year {
    /// Numeric value, parsing text years when possible.
    pub fn numeric(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Year {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

/// A single catalog entry. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookRecord {
    pub title: String,
    pub author: String,
    pub year: Year,
    /// Genres exactly as the catalog spells them (not normalized).
    pub genre: Vec<String>,
    pub id: Option<BookId>,
}

impl BookRecord {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        year: impl Into<Year>,
        genre: &[&str],
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            year: year.into(),
            genre: genre.iter().map(|g| g.to_string()).collect(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(BookId::new(id));
        self
    }

    /// Key under which the favorite flag for this book is stored.
    ///
    /// Records with an identifier use it; the rest fall back to the
    /// `title-author-year` composite, which collides for two editions that
    /// share all three fields.
    pub fn favorite_key(&self) -> String {
        match &self.id {
            Some(id) => format!("id:{id}"),
            None => format!("{}-{}-{}", self.title, self.author, self.year),
        }
    }

    /// Case-insensitive membership test against this record's genres.
    pub fn has_genre(&self, genre: &str) -> bool {
        let wanted = genre.to_lowercase();
        self.genre.iter().any(|g| g.to_lowercase() == wanted)
    }

    /// Genres title-cased and comma-joined for display.
    pub fn genre_label(&self) -> String {
        self.genre
            .iter()
            .map(|g| title_case(g))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Record shape as it appears in catalog JSON, before validation.
///
/// Fields stay untyped so a wrong-typed value is reported against its record
/// instead of failing the whole document.
#[derive(Debug, Deserialize)]
struct RawBook {
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    author: Option<Value>,
    #[serde(default)]
    year: Option<Value>,
    #[serde(default)]
    genre: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
}

fn required_string(value: Option<Value>, field: &str) -> Result<String, String> {
    match value {
        Some(Value::String(s)) => Ok(s),
        None => Err(format!("missing {field}")),
        Some(other) => Err(format!("{field} must be a string, found {other}")),
    }
}

fn parse_year(value: Option<Value>) -> Result<Year, String> {
    match value {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Year::Number(i));
            }
            // Integral floats such as `1965.0` are still plain years
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => Ok(Year::Number(f as i64)),
                _ => Ok(Year::Text(n.to_string())),
            }
        }
        Some(Value::String(s)) => Ok(Year::Text(s)),
        None => Err("missing year".to_string()),
        Some(other) => Err(format!("year must be a number or string, found {other}")),
    }
}

impl RawBook {
    fn from_value(index: usize, value: Value) -> Result<Self, CatalogError> {
        serde_json::from_value(value).map_err(|e| CatalogError::InvalidRecord {
            index,
            reason: format!("not a record object: {e}"),
        })
    }

    fn validate(self, index: usize) -> Result<BookRecord, CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidRecord { index, reason };

        let title = required_string(self.title, "title").map_err(invalid)?;
        if title.trim().is_empty() {
            return Err(invalid("blank title".to_string()));
        }
        let author = required_string(self.author, "author").map_err(invalid)?;
        let year = parse_year(self.year).map_err(invalid)?;

        let genre = match self.genre {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                tracing::debug!(index, value = %other, "ignoring non-array genre field");
                Vec::new()
            }
        };

        let id = match self.id {
            Some(Value::String(s)) if !s.is_empty() => Some(BookId(s)),
            Some(Value::Number(n)) => Some(BookId(n.to_string())),
            _ => None,
        };

        Ok(BookRecord {
            title,
            author,
            year,
            genre,
            id,
        })
    }
}

/// Parse and validate a catalog JSON document.
///
/// Accepts `{"books": [...]}` or a bare array. The first invalid record fails
/// the whole catalog with its index.
pub fn parse_records(json: &str) -> Result<Vec<BookRecord>, CatalogError> {
    let items = match serde_json::from_str::<Value>(json)? {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("books") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(CatalogError::Layout(
                    "object without a \"books\" array".to_string(),
                ));
            }
        },
        other => {
            return Err(CatalogError::Layout(format!(
                "expected an array or object, found {other}"
            )));
        }
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| RawBook::from_value(index, item)?.validate(index))
        .collect()
}
