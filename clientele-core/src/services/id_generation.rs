//! Id generation service - batched id allocation per entity type

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::result::{Error, Result};
use crate::ports::{IdBatchStore, IdGenerator};

/// Default number of ids reserved from the store at a time
pub const DEFAULT_BATCH_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy)]
struct IdBatch {
    next: i64,
    end: i64,
}

/// Hands out ids from batches reserved in an `IdBatchStore`
///
/// Ids are strictly increasing per type within a process. Ids left in a
/// batch when the process exits are never reused.
pub struct IdGenerationService {
    store: Arc<dyn IdBatchStore>,
    batch_size: u32,
    batches: Mutex<HashMap<String, IdBatch>>,
}

impl IdGenerationService {
    pub fn new(store: Arc<dyn IdBatchStore>, batch_size: u32) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            batches: Mutex::new(HashMap::new()),
        }
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }
}

impl IdGenerator for IdGenerationService {
    fn find_next_id(&self, id_type: &str) -> Result<i64> {
        let mut batches = self
            .batches
            .lock()
            .map_err(|e| Error::Other(format!("Lock poisoned: {}", e)))?;

        if let Some(batch) = batches.get_mut(id_type) {
            if batch.next < batch.end {
                let id = batch.next;
                batch.next += 1;
                return Ok(id);
            }
        }

        let start = self.store.reserve_id_batch(id_type, self.batch_size)?;
        batches.insert(
            id_type.to_string(),
            IdBatch {
                next: start + 1,
                end: start + i64::from(self.batch_size),
            },
        );
        Ok(start)
    }
}
