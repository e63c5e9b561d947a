//! Admissions desk: the student directory and the decision engine.
//!
//! Both are built once at startup and handed to handlers through
//! [`crate::AppState`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::StudentRecord;

/// Read-only lookup table of student names by ID.
#[derive(Debug, Clone, Default)]
pub struct StudentDirectory {
    students: BTreeMap<i64, String>,
}

impl StudentDirectory {
    /// Later records win when an ID repeats.
    pub fn new(records: impl IntoIterator<Item = StudentRecord>) -> Self {
        Self {
            students: records.into_iter().map(|r| (r.id, r.name)).collect(),
        }
    }

    pub fn lookup(&self, student_id: i64) -> Option<&str> {
        self.students.get(&student_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

/// An application submitted to the admissions desk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub degree: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest: Option<String>,
}

/// The outcome for an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub first_name: String,
    pub last_name: String,
    /// Uniform draw from `[0, 1)`.
    pub probability: f64,
    pub acceptance: bool,
}

/// Acceptance threshold; a draw strictly above it is accepted.
pub const ACCEPTANCE_THRESHOLD: f64 = 0.5;

/// Draws admission decisions from a shared RNG.
#[derive(Debug)]
pub struct DecisionEngine {
    rng: Mutex<StdRng>,
}

impl DecisionEngine {
    /// A fixed seed makes the sequence of decisions reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn decide(&self, application: &Application) -> Decision {
        let probability: f64 = {
            let mut rng = match self.rng.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    tracing::error!("decision rng lock poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            rng.gen()
        };

        Decision {
            first_name: application.first_name.clone(),
            last_name: application.last_name.clone(),
            probability,
            acceptance: probability > ACCEPTANCE_THRESHOLD,
        }
    }
}
