//! Reducer: the only code that writes `StoreState`.

use crate::action::Action;
use crate::state::StoreState;

pub fn reduce(state: &mut StoreState, action: Action) {
    match action {
        Action::Loading => {
            state.is_loading = true;
        }

        Action::CitiesLoaded(cities) => {
            state.is_loading = false;
            state.cities = cities;
        }

        Action::CityLoaded(city) => {
            state.is_loading = false;
            state.current_city = Some(city);
        }

        Action::CityCreated(city) => {
            state.is_loading = false;
            state.cities.push(city.clone());
            state.current_city = Some(city);
        }

        Action::CityDeleted(id) => {
            state.is_loading = false;
            state.cities.retain(|city| city.id != id);
        }

        Action::Rejected(message) => {
            state.is_loading = false;
            state.error = message;
        }
    }
}
