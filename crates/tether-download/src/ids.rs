//! Persistent notification id allocation

use tether_storage::Database;

use crate::Result;

const COUNTER_KEY: &str = "download.next_notification_id";

/// Stored value at which the counter wraps back to zero.
pub const WRAP_AT: i64 = i32::MAX as i64 - 1;

/// Hands out notification ids from a counter kept in the settings table, so
/// ids stay unique across process restarts until the counter wraps.
#[derive(Clone)]
pub struct NotificationIdAllocator {
    db: Database,
}

impl NotificationIdAllocator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn next_id(&self) -> Result<i32> {
        let value = self.db.next_counter_value(COUNTER_KEY, WRAP_AT)?;
        Ok(value as i32)
    }
}
