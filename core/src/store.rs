//! The cities resource store.
//!
//! # Design
//! `CitiesStore` owns one `StoreState` and a `Transport`. Every operation
//! dispatches `Loading`, performs one blocking round-trip, then dispatches the
//! outcome. State is written only by `reduce`, under the write lock, and
//! subscribers are notified with a snapshot after the state lock is released.
//!
//! Each dispatch holds the store's dispatch lock from reduce until its last
//! listener returns, so listeners see snapshots in the order they were
//! written. The lock is reentrant: a listener may dispatch on its own thread.
//!
//! `new` only builds the store; `load_cities` runs the initial load. Callers
//! that want to observe the initial `loading` subscribe in between. `open`
//! and `connect` do both steps at once.
//!
//! Handles are cheap to clone and may be used from several threads. Two
//! operations started concurrently are not coordinated: whichever resolves
//! last writes the final `is_loading` / `error` / data.
//!
//! Failures never escape an operation. Every `ApiError` is logged and folded
//! into the fixed message for that operation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde_json::Value;
use tracing::{debug, warn};

use crate::action::Action;
use crate::client::CitiesClient;
use crate::config::StoreConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::reducer::reduce;
use crate::state::StoreState;
use crate::transport::{Transport, UreqTransport};
use crate::types::{CityId, NewCity};

pub const LOAD_CITIES_ERROR: &str = "There was an error loading data...";
pub const LOAD_CITY_ERROR: &str = "There was an error loading the city";
pub const CREATE_CITY_ERROR: &str = "There was an error creating city";
pub const DELETE_CITY_ERROR: &str = "There was an error deleting city";

type Listener = Arc<dyn Fn(&StoreState) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl From<SubscriptionId> for u64 {
    fn from(id: SubscriptionId) -> Self {
        id.0
    }
}

impl From<u64> for SubscriptionId {
    fn from(raw: u64) -> Self {
        SubscriptionId(raw)
    }
}

struct Shared<T> {
    client: CitiesClient,
    transport: T,
    state: RwLock<StoreState>,
    dispatching: ReentrantMutex<()>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
}

pub struct CitiesStore<T = UreqTransport> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for CitiesStore<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for CitiesStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CitiesStore")
            .field("base_url", &self.shared.client.base_url())
            .field("state", &*self.shared.state.read())
            .finish()
    }
}

impl CitiesStore<UreqTransport> {
    /// A store against `config.base_url` over HTTP, not yet loaded.
    pub fn with_config(config: &StoreConfig) -> Self {
        Self::new(
            CitiesClient::new(&config.base_url),
            UreqTransport::from_config(config),
        )
    }

    /// Open a store against `config.base_url` over HTTP and run the initial
    /// load.
    pub fn connect(config: &StoreConfig) -> Self {
        let store = Self::with_config(config);
        store.load_cities();
        store
    }
}

impl<T: Transport> CitiesStore<T> {
    /// Create the store with empty state. Nothing is fetched until
    /// `load_cities`.
    pub fn new(client: CitiesClient, transport: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                client,
                transport,
                state: RwLock::new(StoreState::new()),
                dispatching: ReentrantMutex::new(()),
                listeners: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
            }),
        }
    }

    /// Create the store with empty state and fetch the collection once.
    pub fn open(client: CitiesClient, transport: T) -> Self {
        let store = Self::new(client, transport);
        store.load_cities();
        store
    }

    pub fn snapshot(&self) -> StoreState {
        self.shared.state.read().clone()
    }

    pub fn dispatch(&self, action: Action) {
        debug!(kind = action.kind(), "dispatch");
        let _ordered = self.shared.dispatching.lock();
        let snapshot = {
            let mut state = self.shared.state.write();
            reduce(&mut state, action);
            state.clone()
        };
        self.notify(&snapshot);
    }

    /// Dispatch a `{"type", "payload"}` action.
    ///
    /// # Panics
    /// Panics on an unknown action kind, leaving state untouched.
    pub fn dispatch_value(&self, value: Value) -> Result<(), serde_json::Error> {
        let action = Action::from_value(value)?;
        self.dispatch(action);
        Ok(())
    }

    /// Register a listener called with the new state after every dispatch.
    pub fn subscribe(&self, listener: impl Fn(&StoreState) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.shared.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.shared.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.shared.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// A handle onto `get_city_by_id` that compares equal to any other
    /// lookup taken while the current city id is the same.
    pub fn city_lookup(&self) -> CityLookup<T> {
        CityLookup {
            store: self.clone(),
            current_id: self.shared.state.read().current_city_id().cloned(),
        }
    }

    /// Load a city and make it current. Does nothing when `id` already names
    /// the current city.
    pub fn get_city_by_id(&self, id: impl Into<CityId>) {
        let id = id.into();
        if self.shared.state.read().current_city_id() == Some(&id) {
            debug!(%id, "city already current");
            return;
        }

        self.dispatch(Action::Loading);
        let client = &self.shared.client;
        match self
            .execute(client.build_get_city(&id))
            .and_then(|response| client.parse_get_city(response))
        {
            Ok(city) => self.dispatch(Action::CityLoaded(city)),
            Err(err) => self.reject("get_city_by_id", LOAD_CITY_ERROR, err),
        }
    }

    pub fn create_city(&self, new_city: &NewCity) {
        self.dispatch(Action::Loading);
        let client = &self.shared.client;
        match client
            .build_create_city(new_city)
            .and_then(|request| self.execute(request))
            .and_then(|response| client.parse_create_city(response))
        {
            Ok(city) => self.dispatch(Action::CityCreated(city)),
            Err(err) => self.reject("create_city", CREATE_CITY_ERROR, err),
        }
    }

    /// Delete a city on the server, then drop it locally by the id given
    /// here. The response body is ignored.
    pub fn delete_city(&self, id: impl Into<CityId>) {
        let id = id.into();
        self.dispatch(Action::Loading);
        let client = &self.shared.client;
        match self
            .execute(client.build_delete_city(&id))
            .and_then(|response| client.parse_delete_city(response))
        {
            Ok(()) => self.dispatch(Action::CityDeleted(id)),
            Err(err) => self.reject("delete_city", DELETE_CITY_ERROR, err),
        }
    }

    /// Fetch the whole collection: `Loading`, then `CitiesLoaded` or the
    /// load error. `open` and `connect` call this once.
    pub fn load_cities(&self) {
        self.dispatch(Action::Loading);
        let client = &self.shared.client;
        match self
            .execute(client.build_list_cities())
            .and_then(|response| client.parse_list_cities(response))
        {
            Ok(cities) => self.dispatch(Action::CitiesLoaded(cities)),
            Err(err) => self.reject("load_cities", LOAD_CITIES_ERROR, err),
        }
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.shared.transport.execute(request)
    }

    fn reject(&self, operation: &'static str, message: &str, err: ApiError) {
        warn!(operation, error = %err, "request failed");
        self.dispatch(Action::Rejected(message.to_string()));
    }

    fn notify(&self, snapshot: &StoreState) {
        let listeners: Vec<Listener> = self
            .shared
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }
}

/// Stable handle onto `CitiesStore::get_city_by_id`.
///
/// Two lookups are equal when they come from the same store and were taken
/// while the same city was current, so a UI effect keyed on the lookup only
/// re-runs after the current city changes.
pub struct CityLookup<T = UreqTransport> {
    store: CitiesStore<T>,
    current_id: Option<CityId>,
}

impl<T> CityLookup<T> {
    pub fn current_id(&self) -> Option<&CityId> {
        self.current_id.as_ref()
    }
}

impl<T: Transport> CityLookup<T> {
    pub fn get_city_by_id(&self, id: impl Into<CityId>) {
        self.store.get_city_by_id(id);
    }
}

impl<T> Clone for CityLookup<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            current_id: self.current_id.clone(),
        }
    }
}

impl<T> PartialEq for CityLookup<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.store.shared, &other.store.shared) && self.current_id == other.current_id
    }
}

impl<T> fmt::Debug for CityLookup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CityLookup")
            .field("current_id", &self.current_id)
            .finish()
    }
}
