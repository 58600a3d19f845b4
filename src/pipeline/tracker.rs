//! Shared aggregate of matched cities, keyed by subdivision
//!
//! `Aggregate` is the plain single-owner structure; `SharedAggregate` wraps
//! it behind one mutex so that the existence check and the insert/append
//! happen inside a single critical section.

use indexmap::map::Entry;
use indexmap::IndexMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::types::Record;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityEntry {
    pub name: String,
    pub population: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubdivisionEntry {
    pub name: String,
    pub cities: Vec<CityEntry>,
}

/// Subdivisions in first-seen order, each with its cities in arrival order
#[derive(Debug, Default, Clone)]
pub struct Aggregate {
    subdivisions: IndexMap<String, Vec<CityEntry>>,
}

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one record; returns true if it created a new subdivision
    pub fn insert(&mut self, record: Record) -> bool {
        let city = CityEntry {
            name: record.city,
            population: record.population,
        };

        match self.subdivisions.entry(record.subdivision) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().push(city);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(vec![city]);
                true
            }
        }
    }

    /// Fold another aggregate into this one, keeping this one's order first
    pub fn absorb(&mut self, other: Aggregate) {
        for (name, cities) in other.subdivisions {
            self.subdivisions.entry(name).or_default().extend(cities);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subdivisions.is_empty()
    }

    pub fn entries(&self) -> Vec<SubdivisionEntry> {
        self.subdivisions
            .iter()
            .map(|(name, cities)| SubdivisionEntry {
                name: name.clone(),
                cities: cities.clone(),
            })
            .collect()
    }

    pub fn into_entries(self) -> Vec<SubdivisionEntry> {
        self.subdivisions
            .into_iter()
            .map(|(name, cities)| SubdivisionEntry { name, cities })
            .collect()
    }
}

/// Process-wide aggregate shared by the aggregation workers
#[derive(Debug, Default, Clone)]
pub struct SharedAggregate {
    inner: Arc<Mutex<Aggregate>>,
}

impl SharedAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the aggregate with poison recovery
    fn lock_aggregate(&self) -> MutexGuard<'_, Aggregate> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                eprintln!("⚠️  Aggregation worker panicked, recovering aggregate");
                poisoned.into_inner()
            }
        }
    }

    /// Check-then-insert under a single lock acquisition
    pub fn merge_record(&self, record: Record) -> bool {
        self.lock_aggregate().insert(record)
    }

    /// Merge a worker's private partition in one critical section
    pub fn absorb(&self, partition: Aggregate) {
        if partition.is_empty() {
            return;
        }
        self.lock_aggregate().absorb(partition);
    }

    pub fn snapshot(&self) -> Vec<SubdivisionEntry> {
        self.lock_aggregate().entries()
    }
}
