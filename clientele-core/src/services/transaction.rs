//! Transaction scopes with REQUIRED propagation

use crate::domain::result::Result;
use crate::ports::TransactionManager;

/// Rolls back on drop unless committed, so early returns and panics
/// never leave a transaction open.
struct TransactionGuard<'a> {
    manager: &'a dyn TransactionManager,
    finished: bool,
}

impl<'a> TransactionGuard<'a> {
    fn begin(manager: &'a dyn TransactionManager) -> Result<Self> {
        manager.begin()?;
        Ok(Self {
            manager,
            finished: false,
        })
    }

    fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.manager.commit()
    }

    fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.manager.rollback()
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.manager.rollback();
        }
    }
}

/// Run `work` inside a transaction, joining the active one if there is one
///
/// Only the scope that began the transaction commits or rolls it back. An
/// error from `work` wins over a rollback failure.
pub fn required<T>(
    manager: &dyn TransactionManager,
    work: impl FnOnce() -> Result<T>,
) -> Result<T> {
    if manager.is_active() {
        return work();
    }

    let guard = TransactionGuard::begin(manager)?;
    match work() {
        Ok(value) => {
            guard.commit()?;
            Ok(value)
        }
        Err(e) => {
            let _ = guard.rollback();
            Err(e)
        }
    }
}
