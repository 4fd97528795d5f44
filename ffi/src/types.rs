//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Cities are opaque beyond their id, so they cross the boundary as JSON
//! text rather than as C structs. The snapshot struct exposes the scalar
//! fields directly and the record-shaped ones as JSON strings.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use cities_core::{CitiesStore, StoreState};

/// Opaque handle to a `CitiesStore`. C callers receive a pointer to this
/// from `cities_store_new` and pass it back into every FFI function.
pub struct FfiCitiesStore {
    pub(crate) inner: CitiesStore,
}

/// Outcome of an FFI call that takes caller input.
///
/// Network failures are not reported here; they land in the snapshot's
/// `error` field.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiStatus {
    Ok = 0,
    NullArg = 1,
    InvalidUtf8 = 2,
    InvalidJson = 3,
}

/// Callback invoked after every dispatch with the store state as JSON
/// (`{"cities", "isLoading", "currentCity", "error"}`). The string is only
/// valid for the duration of the call.
pub type FfiListener = extern "C" fn(snapshot_json: *const c_char, user_data: *mut c_void);

/// A C listener plus the opaque pointer it wants back.
pub(crate) struct ListenerContext {
    pub(crate) callback: FfiListener,
    pub(crate) user_data: *mut c_void,
}

// The C caller owns `user_data` and promises it may be used from whichever
// thread runs the store operation.
unsafe impl Send for ListenerContext {}
unsafe impl Sync for ListenerContext {}

/// Point-in-time copy of the store state.
///
/// `cities_json` is a JSON array, `current_city_json` a JSON object (`{}`
/// when no city is selected), `error` is empty when there is no error. Free
/// with `cities_free_snapshot`.
#[repr(C)]
pub struct FfiStoreSnapshot {
    pub cities_json: *mut c_char,
    pub cities_len: u32,
    pub is_loading: bool,
    pub current_city_json: *mut c_char,
    pub error: *mut c_char,
}

impl FfiStoreSnapshot {
    pub(crate) fn from_state(state: &StoreState) -> *mut Self {
        let cities_json = serde_json::to_string(&state.cities).unwrap_or_else(|_| "[]".to_string());
        let current_city_json = match &state.current_city {
            Some(city) => serde_json::to_string(city).unwrap_or_else(|_| "{}".to_string()),
            None => "{}".to_string(),
        };
        Box::into_raw(Box::new(FfiStoreSnapshot {
            cities_json: to_c_string(cities_json),
            cities_len: saturating_len(state.cities.len()),
            is_loading: state.is_loading,
            current_city_json: to_c_string(current_city_json),
            error: to_c_string(state.error.clone()),
        }))
    }
}

/// Lengths beyond `u32::MAX` are reported as `u32::MAX`.
pub(crate) fn saturating_len(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Hand a Rust string to C. Interior NULs cannot occur in serde_json output;
/// anything else carrying one becomes an empty string.
pub(crate) fn to_c_string(s: String) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}
