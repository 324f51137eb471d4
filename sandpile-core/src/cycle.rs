use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LimitCycle {
    /// The configuration after `relax_time` steps already occurred
    /// `period` steps earlier.
    Found { period: u64, relax_time: u64 },
    NotFound { steps: u64 },
}

impl LimitCycle {
    pub fn period(&self) -> Option<u64> {
        match *self {
            LimitCycle::Found { period, .. } => Some(period),
            LimitCycle::NotFound { .. } => None,
        }
    }

    pub fn relax_time(&self) -> Option<u64> {
        match *self {
            LimitCycle::Found { relax_time, .. } => Some(relax_time),
            LimitCycle::NotFound { .. } => None,
        }
    }
}

impl Lattice {
    /// Steps the lattice until it revisits an earlier configuration.
    ///
    /// A stable lattice is a cycle of period 1. The lattice is left at the
    /// configuration where the repetition was detected.
    pub fn find_limit_cycle(&mut self, max_steps: u64) -> LimitCycle {
        let mut seen: HashMap<Vec<i64>, u64> = HashMap::new();
        seen.insert(self.heights.clone(), 0);

        for j in 1..=max_steps {
            self.step();
            if let Some(&i) = seen.get(self.heights()) {
                debug!("limit cycle of period {} found at step {j}", j - i);
                return LimitCycle::Found {
                    period: j - i,
                    relax_time: j,
                };
            }
            seen.insert(self.heights.clone(), j);
        }

        LimitCycle::NotFound { steps: max_steps }
    }
}
