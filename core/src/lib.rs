//! Client-side store for the cities resource.
//!
//! # Overview
//! `CitiesStore` keeps an in-memory snapshot of the city collection and the
//! currently selected city, synchronized with a remote `/cities` HTTP
//! resource. UI code reads snapshots or subscribes to them, and triggers
//! `get_city_by_id`, `create_city` and `delete_city`. Loading and error status
//! are tracked by a reducer over six actions.
//!
//! # Design
//! - `CitiesClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse` (host-does-IO).
//! - A `Transport` performs the round-trip; `UreqTransport` is the stock one.
//! - `reduce` is the only writer of `StoreState`.
//! - Cities are opaque beyond their `id`.

pub mod action;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod reducer;
pub mod state;
pub mod store;
pub mod transport;
pub mod types;

pub use action::Action;
pub use client::CitiesClient;
pub use config::StoreConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use reducer::reduce;
pub use state::StoreState;
pub use store::{
    CitiesStore, CityLookup, SubscriptionId, CREATE_CITY_ERROR, DELETE_CITY_ERROR, LOAD_CITIES_ERROR,
    LOAD_CITY_ERROR,
};
pub use transport::{Transport, UreqTransport};
pub use types::{City, CityId, NewCity};
