//! Process-wide travel counters.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use crate::session::{MapType, Role};

static TRANSITIONS_STARTED: AtomicU64 = AtomicU64::new(0);
static TRANSITIONS_COMPLETED: AtomicU64 = AtomicU64::new(0);
static TRANSITIONS_FAILED: AtomicU64 = AtomicU64::new(0);
static FIELDS_CACHED: AtomicU64 = AtomicU64::new(0);
static FIELDS_RESTORED: AtomicU64 = AtomicU64::new(0);
static FIELDS_PRUNED: AtomicU64 = AtomicU64::new(0);

static ARRIVALS: OnceLock<Mutex<HashMap<MapType, ArrivalCounter>>> = OnceLock::new();

pub fn inc_transition_started() {
    TRANSITIONS_STARTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_transition_completed() {
    TRANSITIONS_COMPLETED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_transition_failed() {
    TRANSITIONS_FAILED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_fields_cached() {
    FIELDS_CACHED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_fields_restored() {
    FIELDS_RESTORED.fetch_add(1, Ordering::Relaxed);
}
pub fn add_fields_pruned(count: usize) {
    FIELDS_PRUNED.fetch_add(count as u64, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArrivalCounter {
    pub hosted: u64,
    pub joined: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TravelCounters {
    pub transitions_started: u64,
    pub transitions_completed: u64,
    pub transitions_failed: u64,
    pub fields_cached: u64,
    pub fields_restored: u64,
    pub fields_pruned: u64,
}

fn arrivals_lock() -> &'static Mutex<HashMap<MapType, ArrivalCounter>> {
    ARRIVALS.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn record_arrival(map_type: MapType, role: Role) -> ArrivalCounter {
    let mut guard = arrivals_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let counter = guard.entry(map_type).or_default();
    match role {
        Role::Host => counter.hosted = counter.hosted.saturating_add(1),
        Role::Client => counter.joined = counter.joined.saturating_add(1),
    }
    *counter
}

pub fn arrivals_snapshot() -> HashMap<MapType, ArrivalCounter> {
    arrivals_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

pub fn snapshot() -> TravelCounters {
    TravelCounters {
        transitions_started: TRANSITIONS_STARTED.load(Ordering::Relaxed),
        transitions_completed: TRANSITIONS_COMPLETED.load(Ordering::Relaxed),
        transitions_failed: TRANSITIONS_FAILED.load(Ordering::Relaxed),
        fields_cached: FIELDS_CACHED.load(Ordering::Relaxed),
        fields_restored: FIELDS_RESTORED.load(Ordering::Relaxed),
        fields_pruned: FIELDS_PRUNED.load(Ordering::Relaxed),
    }
}
