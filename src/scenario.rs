//! Keyed collections of independent filter runs.
//!
//! A sweep over test cases and their variations is a map from
//! [`ScenarioKey`] to [`Scenario`]. Runs share no state, so with the
//! `parallel` feature [`ScenarioSet::run_all_par`] spreads them across the
//! rayon thread pool.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::FilterConfig;
use crate::estimate::{FilterOutput, Lkffb, Retention, RunError};
use crate::traits::FloatScalar;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Identifies one run of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScenarioKey {
    pub test_case: u32,
    pub variation: u32,
}

impl ScenarioKey {
    pub fn new(test_case: u32, variation: u32) -> Self {
        Self {
            test_case,
            variation,
        }
    }
}

/// Configuration and measurements of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario<T> {
    pub config: FilterConfig<T>,
    pub signal: Vec<T>,
}

impl<T: FloatScalar> Scenario<T> {
    /// Build the filter and run it.
    pub fn run(&self, retention: Retention) -> Result<FilterOutput<T>, RunError<T>> {
        let filter = Lkffb::new(self.config.clone())?;
        filter.run(&self.signal, retention)
    }
}

/// Per-scenario outcomes, keyed like the set that produced them.
pub type ScenarioResults<T> = BTreeMap<ScenarioKey, Result<FilterOutput<T>, RunError<T>>>;

/// Scenarios ordered by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioSet<T> {
    scenarios: BTreeMap<ScenarioKey, Scenario<T>>,
}

impl<T: FloatScalar> ScenarioSet<T> {
    pub fn new() -> Self {
        Self {
            scenarios: BTreeMap::new(),
        }
    }

    /// Add a scenario, returning the one it replaces.
    pub fn insert(&mut self, key: ScenarioKey, scenario: Scenario<T>) -> Option<Scenario<T>> {
        self.scenarios.insert(key, scenario)
    }

    pub fn get(&self, key: &ScenarioKey) -> Option<&Scenario<T>> {
        self.scenarios.get(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ScenarioKey> {
        self.scenarios.keys()
    }

    /// Run every scenario in key order. A failing scenario does not stop
    /// the others.
    pub fn run_all(&self, retention: Retention) -> ScenarioResults<T> {
        self.scenarios
            .iter()
            .map(|(key, s)| (*key, s.run(retention)))
            .collect()
    }

    /// [`run_all`](Self::run_all) on the rayon thread pool.
    #[cfg(feature = "parallel")]
    pub fn run_all_par(&self, retention: Retention) -> ScenarioResults<T> {
        self.scenarios
            .par_iter()
            .map(|(key, s)| (*key, s.run(retention)))
            .collect()
    }
}

impl<T> FromIterator<(ScenarioKey, Scenario<T>)> for ScenarioSet<T> {
    fn from_iter<I: IntoIterator<Item = (ScenarioKey, Scenario<T>)>>(iter: I) -> Self {
        Self {
            scenarios: iter.into_iter().collect(),
        }
    }
}
