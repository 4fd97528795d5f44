//! Domain DTOs for the cities API.
//!
//! # Design
//! A city is opaque to the store beyond its `id`. Everything else the
//! provider sends (name, coordinates, dates, notes) lives in an ordered JSON
//! object and is passed through untouched. The mock-server crate defines its
//! own record type; integration tests catch any schema drift.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a city as the server hands it out: a JSON number or a
/// numeric string.
///
/// Equality coerces both sides to a number first, so `5` and `"5"` name the
/// same city. Integer ids compare exactly, at any magnitude. Ids that do not
/// parse as numbers compare by their text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CityId {
    Number(i64),
    Text(String),
}

impl CityId {
    /// Numeric value of the id, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CityId::Number(n) => Some(*n as f64),
            CityId::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            CityId::Number(n) => Some(*n),
            CityId::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl PartialEq for CityId {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.as_integer(), other.as_integer()) {
            return a == b;
        }
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CityId::Number(n) => write!(f, "{n}"),
            CityId::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for CityId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(n) => CityId::Number(n),
            Err(_) => CityId::Text(s.to_string()),
        })
    }
}

impl From<i64> for CityId {
    fn from(n: i64) -> Self {
        CityId::Number(n)
    }
}

impl From<&str> for CityId {
    fn from(s: &str) -> Self {
        CityId::Text(s.to_string())
    }
}

impl From<String> for CityId {
    fn from(s: String) -> Self {
        CityId::Text(s)
    }
}

/// A single city returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl City {
    pub fn new(id: impl Into<CityId>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Request payload for creating a city. Never carries an `id`; the server
/// assigns one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct NewCity {
    attributes: Map<String, Value>,
}

impl NewCity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute. An `id` key is ignored.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        if key != "id" {
            self.attributes.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }
}

impl From<Map<String, Value>> for NewCity {
    fn from(mut attributes: Map<String, Value>) -> Self {
        attributes.remove("id");
        Self { attributes }
    }
}

impl From<NewCity> for Map<String, Value> {
    fn from(city: NewCity) -> Self {
        city.attributes
    }
}
