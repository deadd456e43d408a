//! Fault supervisor.
//!
//! Every driver returns protocol violations and resource misuse as
//! [`Error`] values.  The supervisor sits between those results and the
//! run loop and applies the configured [`FaultPolicy`]:
//!
//! | Policy      | Effect                                             |
//! |-------------|----------------------------------------------------|
//! | `Halt`      | log, then panic (target links `panic-halt`)        |
//! | `Propagate` | record, then hand the error back to the caller     |
//!
//! Production firmware runs `Halt`: a violation means a hardware fault or a
//! driver bug, and the device must stop making progress until it is reset.
//! Host tests run `Propagate` so they can assert on the error.

use log::error;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultPolicy {
    Halt,
    Propagate,
}

pub struct FaultSupervisor {
    policy: FaultPolicy,
    /// First fault seen since construction.
    first: Option<Error>,
    count: u32,
}

impl FaultSupervisor {
    pub const fn new(policy: FaultPolicy) -> Self {
        Self {
            policy,
            first: None,
            count: 0,
        }
    }

    pub fn policy(&self) -> FaultPolicy {
        self.policy
    }

    /// Pass `Ok` through; apply the policy to `Err`.
    pub fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.fault(e))
    }

    /// Record `err` and apply the policy.  Only returns under
    /// [`FaultPolicy::Propagate`].
    pub fn fault(&mut self, err: Error) -> Error {
        self.count = self.count.saturating_add(1);
        if self.first.is_none() {
            self.first = Some(err);
        }
        error!("FATAL: {err}");
        match self.policy {
            FaultPolicy::Halt => panic!("fatal: {err}"),
            FaultPolicy::Propagate => err,
        }
    }

    pub fn first_fault(&self) -> Option<Error> {
        self.first
    }

    pub fn fault_count(&self) -> u32 {
        self.count
    }

    pub fn has_faulted(&self) -> bool {
        self.count != 0
    }
}
