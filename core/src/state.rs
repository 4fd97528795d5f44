//! Store state: the single snapshot the UI renders from.

use serde::{Deserialize, Serialize};

use crate::types::{City, CityId};

/// Everything the UI needs to render the cities views.
///
/// Serializes as `{"cities", "isLoading", "currentCity", "error"}`; an
/// unselected current city is written as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreState {
    /// Cities in the order the server returned them.
    pub cities: Vec<City>,
    pub is_loading: bool,
    #[serde(with = "current_city")]
    pub current_city: Option<City>,
    /// Last failure message. Empty means no error.
    pub error: String,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_city_id(&self) -> Option<&CityId> {
        self.current_city.as_ref().map(|city| &city.id)
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }
}

mod current_city {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::{Map, Value};

    use crate::types::City;

    pub fn serialize<S: Serializer>(city: &Option<City>, serializer: S) -> Result<S::Ok, S::Error> {
        match city {
            Some(city) => city.serialize(serializer),
            None => Map::new().serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<City>, D::Error> {
        let object = Map::<String, Value>::deserialize(deserializer)?;
        if object.is_empty() {
            return Ok(None);
        }
        serde_json::from_value(Value::Object(object))
            .map(Some)
            .map_err(D::Error::custom)
    }
}
