//! Nested transaction bookkeeping over a single physical transaction.
//!
//! Logical `begin`/`commit` calls nest; only the outermost pair reaches the
//! database. `rollback` does not nest: from any depth it abandons the whole
//! physical transaction and resets the depth to zero. Callers that expect a
//! nested rollback to undo only the inner level get full abandonment.

use tracing::{trace, warn};

use crate::error::{DbError, Result};

/// Statement actually sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Physical {
    Begin,
    Commit,
    Rollback,
}

impl Physical {
    pub fn sql(&self) -> &'static str {
        match self {
            Physical::Begin => "BEGIN",
            Physical::Commit => "COMMIT",
            Physical::Rollback => "ROLLBACK",
        }
    }
}

/// Depth counter. Idle at depth 0, in a transaction otherwise.
///
/// Each transition takes an `issue` callback that performs the physical
/// statement when one is due.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransactionCounter {
    depth: u32,
}

impl TransactionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_active(&self) -> bool {
        self.depth > 0
    }

    /// Enter one level. The physical BEGIN is issued only from depth 0; if it
    /// fails the depth is left untouched.
    pub fn begin<F>(&mut self, issue: F) -> Result<()>
    where
        F: FnOnce(Physical) -> Result<()>,
    {
        if self.depth == 0 {
            issue(Physical::Begin)?;
        }
        self.depth += 1;
        trace!(depth = self.depth, "transaction level entered");
        Ok(())
    }

    /// Leave one level. The physical COMMIT is issued when the depth reaches 0.
    ///
    /// A failed COMMIT leaves the backend transaction open, so the depth goes
    /// back to 1 and the caller can still `rollback`.
    pub fn commit<F>(&mut self, issue: F) -> Result<()>
    where
        F: FnOnce(Physical) -> Result<()>,
    {
        if self.depth == 0 {
            return Err(DbError::logic("commit called with no open transaction"));
        }
        self.depth -= 1;
        trace!(depth = self.depth, "transaction level left");
        if self.depth == 0 {
            if let Err(err) = issue(Physical::Commit) {
                self.depth = 1;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Abandon the whole transaction from any depth.
    pub fn rollback<F>(&mut self, issue: F) -> Result<()>
    where
        F: FnOnce(Physical) -> Result<()>,
    {
        if self.depth == 0 {
            return Err(DbError::logic("rollback called with no open transaction"));
        }
        let abandoned = self.depth;
        self.depth = 0;
        if abandoned > 1 {
            warn!(depth = abandoned, "rollback from nested level abandons the outer transaction");
        }
        issue(Physical::Rollback)
    }
}
