//! Per-user statistics.

use jobtrack_core::error::Result;
use jobtrack_core::traits::ApplicationStore;
use jobtrack_core::types::{MonthlyCount, Statistics};
use std::sync::Arc;

pub struct StatisticsAggregator {
    store: Arc<dyn ApplicationStore>,
}

impl StatisticsAggregator {
    pub fn new(store: Arc<dyn ApplicationStore>) -> Self {
        Self { store }
    }

    /// Recomputed from the store on every call.
    pub fn get_statistics(&self, user_id: &str) -> Result<Statistics> {
        let total = self.store.count_by_user(user_id)?;
        let by_status = self.store.group_count_by_status(user_id)?;
        let starred = self.store.find_starred_by_user(user_id)?;
        tracing::debug!(
            "📊 Statistics for {user_id}: {total} total, {} statuses, {} starred",
            by_status.len(),
            starred.len()
        );
        Ok(Statistics { total, by_status, starred })
    }

    pub fn monthly_counts(&self, user_id: &str) -> Result<Vec<MonthlyCount>> {
        self.store.count_by_month(user_id)
    }
}
