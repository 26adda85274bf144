#![allow(dead_code)]

use std::collections::HashSet;
use std::io::Write;
use std::sync::Mutex;

use gppd_map::api::FacilityRow;
use gppd_map::db::LocalRepository;
use gppd_map::models::{Facility, FacilityId, PrimaryFuel};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn facility(id: &str, lat: f64, lng: f64, capacity: f64, fuel: PrimaryFuel) -> Facility {
    Facility {
        id: FacilityId::new(id),
        name: format!("Plant {id}"),
        country_code: "USA".into(),
        country_name: "United States of America".into(),
        capacity_mw: capacity,
        latitude: lat,
        longitude: lng,
        primary_fuel: fuel,
        commissioning_year: None,
        owner: None,
    }
}

pub fn facility_in(id: &str, country: &str, lat: f64, lng: f64, capacity: f64) -> Facility {
    Facility {
        country_code: country.into(),
        country_name: country.into(),
        ..facility(id, lat, lng, capacity, PrimaryFuel::Gas)
    }
}

/// `count` facilities spread over a coarse global grid with distinct capacities.
pub fn global_grid(count: usize) -> Vec<Facility> {
    (0..count)
        .map(|i| {
            let lat = -60.0 + (i % 120) as f64;
            let lng = -179.0 + ((i / 120) % 358) as f64;
            let fuel = PrimaryFuel::ALL[i % PrimaryFuel::ALL.len()];
            facility(&format!("G{i:06}"), lat, lng, 1.0 + i as f64, fuel)
        })
        .collect()
}

pub fn seeded_repo(facilities: Vec<Facility>) -> LocalRepository {
    LocalRepository::with_facilities(facilities)
}

pub fn row(id: &str, lat: f64, lng: f64, capacity: i64, fuel: PrimaryFuel) -> FacilityRow {
    FacilityRow::from(&facility(id, lat, lng, capacity as f64, fuel))
}

/// Write `facilities` as a JSON seed file.
pub fn write_seed_file(facilities: &[Facility]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    serde_json::to_writer(&mut file, facilities).unwrap();
    file.flush().unwrap();
    file
}
