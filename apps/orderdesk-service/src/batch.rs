//! Per-item outcome of bulk operations.
//!
//! Items are processed independently: one failure never stops the rest.

use serde::Serialize;

use crate::error::{ErrorCode, ServiceError};

/// One item that failed.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure<K> {
    pub key: K,
    pub code: ErrorCode,
    pub message: String,
}

/// Which items went through and which did not, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<K> {
    pub succeeded: Vec<K>,
    pub failed: Vec<BatchFailure<K>>,
}

impl<K> Default for BatchReport<K> {
    fn default() -> Self {
        BatchReport {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<K> BatchReport<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record<T>(&mut self, key: K, outcome: Result<T, ServiceError>) {
        match outcome {
            Ok(_) => self.succeeded.push(key),
            Err(err) => self.failed.push(BatchFailure {
                key,
                code: err.code(),
                message: err.to_string(),
            }),
        }
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}
