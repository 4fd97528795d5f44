//! Actions accepted by the store reducer.
//!
//! On the wire an action is `{"type": <kind>, "payload": <payload>}`, the
//! shape UI hosts use when replaying or injecting actions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{City, CityId};

/// Every action kind the reducer understands.
pub const ACTION_KINDS: [&str; 6] = [
    "loading",
    "cities/loaded",
    "city/loaded",
    "city/created",
    "city/deleted",
    "rejected",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Action {
    /// A request is in flight.
    #[serde(rename = "loading")]
    Loading,

    /// The full collection arrived.
    #[serde(rename = "cities/loaded")]
    CitiesLoaded(Vec<City>),

    /// A single city arrived and becomes the current one.
    #[serde(rename = "city/loaded")]
    CityLoaded(City),

    /// The server accepted a new city and returned its representation.
    #[serde(rename = "city/created")]
    CityCreated(City),

    /// The city with this id was deleted on the server.
    #[serde(rename = "city/deleted")]
    CityDeleted(CityId),

    /// An operation failed; carries the message shown to the user.
    #[serde(rename = "rejected")]
    Rejected(String),
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Loading => "loading",
            Action::CitiesLoaded(_) => "cities/loaded",
            Action::CityLoaded(_) => "city/loaded",
            Action::CityCreated(_) => "city/created",
            Action::CityDeleted(_) => "city/deleted",
            Action::Rejected(_) => "rejected",
        }
    }

    /// Decode a tagged action.
    ///
    /// # Panics
    /// An unknown or missing `type` is a coding defect in the caller, not a
    /// runtime condition, and panics with `Unhandled action type: <kind>`.
    /// A known kind with a malformed payload is returned as an error.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();
        if !ACTION_KINDS.contains(&kind) {
            panic!("Unhandled action type: {kind}");
        }
        serde_json::from_value(value)
    }
}
