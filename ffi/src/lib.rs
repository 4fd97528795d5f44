//! C-ABI wrapper around `cities-core`.
//!
//! # Overview
//! Exposes one `CitiesStore` per handle through `extern "C"` functions so a
//! UI written in any language with a C FFI can read snapshots, subscribe to
//! changes and trigger the city operations.
//!
//! # Design
//! - The store is created explicitly with `cities_store_new` (which runs the
//!   initial load) and torn down with `cities_store_free`. A host that wants
//!   to see the initial `loading` state calls `cities_store_init`, subscribes,
//!   then calls `cities_store_load_cities`.
//! - Calling any store function with a null handle is a usage error and
//!   aborts the process. So does a panic inside the store, which includes
//!   dispatching an unknown action kind.
//! - Bad caller input (null strings, invalid UTF-8, malformed JSON) is
//!   reported through `FfiStatus`. Network failures are not: they show up in
//!   the snapshot's `error` field.
//! - The C caller owns all returned pointers and must call the matching
//!   `cities_free_*` function to release them.

pub mod types;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use cities_core::{CitiesStore, CityId, NewCity, StoreConfig, StoreState, SubscriptionId};
use serde_json::{Map, Value};
use tracing::error;

use types::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Report and abort. The message also goes to stderr because a host rarely
/// installs a `tracing` subscriber in this library.
fn fatal(msg: &str) -> ! {
    eprintln!("cities-ffi: {msg}");
    error!("{msg}");
    std::process::abort()
}

fn store_ref<'a>(store: *const FfiCitiesStore, func: &str) -> &'a FfiCitiesStore {
    if store.is_null() {
        fatal(&format!("{func} called without an initialized store"));
    }
    unsafe { &*store }
}

fn read_str<'a>(ptr: *const c_char) -> Result<&'a str, FfiStatus> {
    if ptr.is_null() {
        return Err(FfiStatus::NullArg);
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| FfiStatus::InvalidUtf8)
}

fn read_id(ptr: *const c_char) -> Result<CityId, FfiStatus> {
    let raw = read_str(ptr)?;
    match raw.parse::<CityId>() {
        Ok(id) => Ok(id),
        Err(never) => match never {},
    }
}

/// Run `body`, turning a panic into a process abort.
fn guard(func: &str, body: impl FnOnce() -> Result<(), FfiStatus>) -> FfiStatus {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => FfiStatus::Ok,
        Ok(Err(status)) => status,
        Err(_) => fatal(&format!("panic in {func}")),
    }
}

fn state_json(state: &StoreState) -> String {
    serde_json::to_string(state).unwrap_or_else(|_| "{}".to_string())
}

impl ListenerContext {
    fn call(&self, snapshot_json: *const c_char) {
        (self.callback)(snapshot_json, self.user_data)
    }
}

// ---------------------------------------------------------------------------
// Store lifecycle
// ---------------------------------------------------------------------------

fn config_for(base_url: *const c_char) -> Result<StoreConfig, FfiStatus> {
    let mut config = StoreConfig::from_env();
    if !base_url.is_null() {
        config.base_url = read_str(base_url)?.to_string();
    }
    Ok(config)
}

/// Create a store and run the initial load of `/cities`.
///
/// `base_url` may be null, in which case `CITIES_API_URL` (or the default
/// origin) is used. `CITIES_API_TIMEOUT_MS` is honored either way.
/// Returns null if `base_url` is not valid UTF-8.
/// The caller must free the returned pointer with `cities_store_free`.
#[unsafe(no_mangle)]
pub extern "C" fn cities_store_new(base_url: *const c_char) -> *mut FfiCitiesStore {
    let store = cities_store_init(base_url);
    if !store.is_null() {
        cities_store_load_cities(store);
    }
    store
}

/// Like `cities_store_new` but without the initial load. Call
/// `cities_store_load_cities` once listeners are in place.
#[unsafe(no_mangle)]
pub extern "C" fn cities_store_init(base_url: *const c_char) -> *mut FfiCitiesStore {
    catch_unwind(|| match config_for(base_url) {
        Ok(config) => Box::into_raw(Box::new(FfiCitiesStore {
            inner: CitiesStore::with_config(&config),
        })),
        Err(_) => std::ptr::null_mut(),
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Fetch `/cities` into the store. Blocks until the request resolves.
#[unsafe(no_mangle)]
pub extern "C" fn cities_store_load_cities(store: *const FfiCitiesStore) {
    let store = store_ref(store, "cities_store_load_cities");
    guard("cities_store_load_cities", || {
        store.inner.load_cities();
        Ok(())
    });
}

/// Free a store created by `cities_store_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn cities_store_free(store: *mut FfiCitiesStore) {
    if !store.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(store) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Copy the current state. Free with `cities_free_snapshot`.
#[unsafe(no_mangle)]
pub extern "C" fn cities_store_snapshot(store: *const FfiCitiesStore) -> *mut FfiStoreSnapshot {
    let store = store_ref(store, "cities_store_snapshot");
    FfiStoreSnapshot::from_state(&store.inner.snapshot())
}

/// The current state as one JSON object. Free with `cities_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn cities_store_snapshot_json(store: *const FfiCitiesStore) -> *mut c_char {
    let store = store_ref(store, "cities_store_snapshot_json");
    to_c_string(state_json(&store.inner.snapshot()))
}

/// Register `callback` to run after every dispatch.
///
/// Returns a non-zero subscription id, or 0 if `callback` is null.
#[unsafe(no_mangle)]
pub extern "C" fn cities_store_subscribe(
    store: *const FfiCitiesStore,
    callback: Option<FfiListener>,
    user_data: *mut c_void,
) -> u64 {
    let store = store_ref(store, "cities_store_subscribe");
    let Some(callback) = callback else {
        return 0;
    };
    let context = ListenerContext { callback, user_data };
    let id = store.inner.subscribe(move |state| {
        let json = CString::new(state_json(state)).unwrap_or_default();
        context.call(json.as_ptr());
    });
    id.into()
}

/// Remove a subscription. Returns false if `id` was not registered.
#[unsafe(no_mangle)]
pub extern "C" fn cities_store_unsubscribe(store: *const FfiCitiesStore, id: u64) -> bool {
    let store = store_ref(store, "cities_store_unsubscribe");
    store.inner.unsubscribe(SubscriptionId::from(id))
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Load a city by id and make it current. `id` is the raw id text, e.g.
/// `"73930385"`. Does nothing if that city is already current.
#[unsafe(no_mangle)]
pub extern "C" fn cities_store_get_city_by_id(store: *const FfiCitiesStore, id: *const c_char) -> FfiStatus {
    let store = store_ref(store, "cities_store_get_city_by_id");
    guard("cities_store_get_city_by_id", || {
        store.inner.get_city_by_id(read_id(id)?);
        Ok(())
    })
}

/// Create a city from a JSON object of attributes. Any `id` is dropped.
#[unsafe(no_mangle)]
pub extern "C" fn cities_store_create_city(
    store: *const FfiCitiesStore,
    city_json: *const c_char,
) -> FfiStatus {
    let store = store_ref(store, "cities_store_create_city");
    guard("cities_store_create_city", || {
        let attributes: Map<String, Value> =
            serde_json::from_str(read_str(city_json)?).map_err(|_| FfiStatus::InvalidJson)?;
        store.inner.create_city(&NewCity::from(attributes));
        Ok(())
    })
}

/// Delete a city by id.
#[unsafe(no_mangle)]
pub extern "C" fn cities_store_delete_city(store: *const FfiCitiesStore, id: *const c_char) -> FfiStatus {
    let store = store_ref(store, "cities_store_delete_city");
    guard("cities_store_delete_city", || {
        store.inner.delete_city(read_id(id)?);
        Ok(())
    })
}

/// Apply a `{"type": ..., "payload": ...}` action directly.
///
/// Returns `InvalidJson` for unparsable text or a malformed payload. An
/// unknown action kind aborts the process.
#[unsafe(no_mangle)]
pub extern "C" fn cities_store_dispatch(store: *const FfiCitiesStore, action_json: *const c_char) -> FfiStatus {
    let store = store_ref(store, "cities_store_dispatch");
    guard("cities_store_dispatch", || {
        let value: Value = serde_json::from_str(read_str(action_json)?).map_err(|_| FfiStatus::InvalidJson)?;
        store.inner.dispatch_value(value).map_err(|_| FfiStatus::InvalidJson)
    })
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a snapshot returned by `cities_store_snapshot`. Safe to call with
/// null.
#[unsafe(no_mangle)]
pub extern "C" fn cities_free_snapshot(snapshot: *mut FfiStoreSnapshot) {
    if snapshot.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let snapshot = unsafe { Box::from_raw(snapshot) };
        for field in [snapshot.cities_json, snapshot.current_city_json, snapshot.error] {
            if !field.is_null() {
                drop(unsafe { CString::from_raw(field) });
            }
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn cities_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use cities_core::{CREATE_CITY_ERROR, DELETE_CITY_ERROR, LOAD_CITIES_ERROR, LOAD_CITY_ERROR};

    fn start_server() -> SocketAddr {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run(listener).await
            })
            .unwrap();
        });

        addr
    }

    fn dead_url() -> CString {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        CString::new(format!("http://{addr}")).unwrap()
    }

    fn c_str<'a>(ptr: *const c_char) -> &'a str {
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap()
    }

    fn snapshot_error(store: *const FfiCitiesStore) -> String {
        let snapshot = cities_store_snapshot(store);
        let error = c_str(unsafe { &*snapshot }.error).to_string();
        cities_free_snapshot(snapshot);
        error
    }

    extern "C" fn count_calls(_snapshot_json: *const c_char, user_data: *mut c_void) {
        let counter = unsafe { &*(user_data as *const AtomicUsize) };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn new_against_dead_server_records_load_error() {
        let url = dead_url();
        let store = cities_store_new(url.as_ptr());
        assert!(!store.is_null());

        let snapshot = cities_store_snapshot(store);
        let s = unsafe { &*snapshot };
        assert_eq!(c_str(s.cities_json), "[]");
        assert_eq!(s.cities_len, 0);
        assert!(!s.is_loading);
        assert_eq!(c_str(s.current_city_json), "{}");
        assert_eq!(c_str(s.error), LOAD_CITIES_ERROR);

        cities_free_snapshot(snapshot);
        cities_store_free(store);
    }

    #[test]
    fn every_operation_reports_its_own_message() {
        let url = dead_url();
        let store = cities_store_new(url.as_ptr());

        let id = CString::new("1").unwrap();
        assert_eq!(cities_store_get_city_by_id(store, id.as_ptr()), FfiStatus::Ok);
        assert_eq!(snapshot_error(store), LOAD_CITY_ERROR);

        let city = CString::new(r#"{"cityName":"Lisbon"}"#).unwrap();
        assert_eq!(cities_store_create_city(store, city.as_ptr()), FfiStatus::Ok);
        assert_eq!(snapshot_error(store), CREATE_CITY_ERROR);

        assert_eq!(cities_store_delete_city(store, id.as_ptr()), FfiStatus::Ok);
        assert_eq!(snapshot_error(store), DELETE_CITY_ERROR);

        cities_store_free(store);
    }

    #[test]
    fn bad_input_is_reported_not_dispatched() {
        let url = dead_url();
        let store = cities_store_new(url.as_ptr());
        let json_before = cities_store_snapshot_json(store);

        assert_eq!(cities_store_get_city_by_id(store, std::ptr::null()), FfiStatus::NullArg);
        assert_eq!(cities_store_delete_city(store, std::ptr::null()), FfiStatus::NullArg);
        assert_eq!(cities_store_create_city(store, std::ptr::null()), FfiStatus::NullArg);

        let not_json = CString::new("{cityName:").unwrap();
        assert_eq!(cities_store_create_city(store, not_json.as_ptr()), FfiStatus::InvalidJson);
        let not_object = CString::new("[1,2]").unwrap();
        assert_eq!(cities_store_create_city(store, not_object.as_ptr()), FfiStatus::InvalidJson);

        let bad_payload = CString::new(r#"{"type":"city/deleted","payload":[]}"#).unwrap();
        assert_eq!(cities_store_dispatch(store, bad_payload.as_ptr()), FfiStatus::InvalidJson);

        let bytes = [0xffu8, 0xfe, 0];
        assert_eq!(
            cities_store_get_city_by_id(store, bytes.as_ptr() as *const c_char),
            FfiStatus::InvalidUtf8
        );

        let json_after = cities_store_snapshot_json(store);
        assert_eq!(c_str(json_before), c_str(json_after));

        cities_free_string(json_before);
        cities_free_string(json_after);
        cities_store_free(store);
    }

    #[test]
    fn dispatch_applies_tagged_actions() {
        let url = dead_url();
        let store = cities_store_new(url.as_ptr());

        let action = CString::new(r#"{"type":"cities/loaded","payload":[{"id":1},{"id":5}]}"#).unwrap();
        assert_eq!(cities_store_dispatch(store, action.as_ptr()), FfiStatus::Ok);
        let action = CString::new(r#"{"type":"city/deleted","payload":5}"#).unwrap();
        assert_eq!(cities_store_dispatch(store, action.as_ptr()), FfiStatus::Ok);

        let json = cities_store_snapshot_json(store);
        let state: Value = serde_json::from_str(c_str(json)).unwrap();
        assert_eq!(state["cities"], serde_json::json!([{"id": 1}]));
        assert_eq!(state["isLoading"], false);
        assert_eq!(state["currentCity"], serde_json::json!({}));

        cities_free_string(json);
        cities_store_free(store);
    }

    #[test]
    fn lifecycle_against_mock_server() {
        let addr = start_server();
        let url = CString::new(format!("http://{addr}")).unwrap();
        let store = cities_store_new(url.as_ptr());
        assert_eq!(snapshot_error(store), "");

        let calls = AtomicUsize::new(0);
        let sub = cities_store_subscribe(
            store,
            Some(count_calls),
            &calls as *const AtomicUsize as *mut c_void,
        );
        assert_ne!(sub, 0);

        // create: loading + created
        let city = CString::new(r#"{"cityName":"Lisbon","notes":"pastéis"}"#).unwrap();
        assert_eq!(cities_store_create_city(store, city.as_ptr()), FfiStatus::Ok);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let snapshot = cities_store_snapshot(store);
        let s = unsafe { &*snapshot };
        assert_eq!(s.cities_len, 1);
        let current: Value = serde_json::from_str(c_str(s.current_city_json)).unwrap();
        assert_eq!(current["id"], 1);
        assert_eq!(current["notes"], "pastéis");
        cities_free_snapshot(snapshot);

        // already current: no dispatch
        let id = CString::new("1").unwrap();
        assert_eq!(cities_store_get_city_by_id(store, id.as_ptr()), FfiStatus::Ok);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // delete: loading + deleted
        assert_eq!(cities_store_delete_city(store, id.as_ptr()), FfiStatus::Ok);
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        assert!(cities_store_unsubscribe(store, sub));
        assert!(!cities_store_unsubscribe(store, sub));

        let snapshot = cities_store_snapshot(store);
        let s = unsafe { &*snapshot };
        assert_eq!(s.cities_len, 0);
        assert_eq!(c_str(s.error), "");
        cities_free_snapshot(snapshot);

        cities_store_free(store);
    }

    extern "C" fn record_loading(snapshot_json: *const c_char, user_data: *mut c_void) {
        let seen = unsafe { &*(user_data as *const std::sync::Mutex<Vec<bool>>) };
        let state: Value = serde_json::from_str(c_str(snapshot_json)).unwrap();
        seen.lock().unwrap().push(state["isLoading"].as_bool().unwrap());
    }

    #[test]
    fn init_defers_initial_load() {
        let url = dead_url();
        let store = cities_store_init(url.as_ptr());
        assert!(!store.is_null());
        assert_eq!(snapshot_error(store), "");

        let seen = std::sync::Mutex::new(Vec::new());
        let sub = cities_store_subscribe(
            store,
            Some(record_loading),
            &seen as *const std::sync::Mutex<Vec<bool>> as *mut c_void,
        );

        cities_store_load_cities(store);

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
        assert_eq!(snapshot_error(store), LOAD_CITIES_ERROR);
        assert!(cities_store_unsubscribe(store, sub));
        cities_store_free(store);
    }

    #[test]
    fn init_with_invalid_utf8_returns_null() {
        let bytes = [0xffu8, 0];
        assert!(cities_store_init(bytes.as_ptr() as *const c_char).is_null());
    }

    #[test]
    fn subscribe_without_callback_returns_zero() {
        let url = dead_url();
        let store = cities_store_new(url.as_ptr());
        assert_eq!(cities_store_subscribe(store, None, std::ptr::null_mut()), 0);
        cities_store_free(store);
    }

    #[test]
    fn new_with_invalid_utf8_returns_null() {
        let bytes = [0xffu8, 0];
        let store = cities_store_new(bytes.as_ptr() as *const c_char);
        assert!(store.is_null());
    }

    #[test]
    fn free_null_is_safe() {
        cities_store_free(std::ptr::null_mut());
        cities_free_snapshot(std::ptr::null_mut());
        cities_free_string(std::ptr::null_mut());
    }
}
