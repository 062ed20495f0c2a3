use std::fmt::Display;

use log::*;

use crate::traits::{OrderCache, OrderStore, OrderStoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmupSummary {
    /// The number of identifiers the store reported.
    pub total: usize,
    /// The number of orders written to the cache.
    pub cached: usize,
    /// The number of orders that could not be loaded or cached.
    pub skipped: usize,
}

impl Display for WarmupSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} of {} orders cached, {} skipped", self.cached, self.total, self.skipped)
    }
}

/// `CacheWarmer` copies every order in the store into the cache. It runs once at boot so that the cache is warm
/// before live traffic arrives. Reads that arrive while it is still running simply fall back to the store.
pub struct CacheWarmer<B, C> {
    store: B,
    cache: C,
}

impl<B, C> CacheWarmer<B, C>
where
    B: OrderStore,
    C: OrderCache,
{
    pub fn new(store: B, cache: C) -> Self {
        Self { store, cache }
    }

    /// Populates the cache from the store.
    ///
    /// A failure to load or cache an individual order is logged and skipped. Only a failure to enumerate the order
    /// identifiers aborts the restore.
    pub async fn restore(&self) -> Result<WarmupSummary, OrderStoreError> {
        let uids = self.store.fetch_all_order_uids().await?;
        info!("🔥️ Restoring {} orders into the cache", uids.len());
        let mut summary = WarmupSummary { total: uids.len(), ..Default::default() };
        for uid in uids {
            match self.store.fetch_order(&uid).await {
                Ok(Some(order)) => match self.cache.put(&order).await {
                    Ok(()) => summary.cached += 1,
                    Err(e) => {
                        warn!("🔥️ Could not cache order {uid}. {e}");
                        summary.skipped += 1;
                    },
                },
                Ok(None) => {
                    debug!("🔥️ Order {uid} disappeared before it could be cached");
                    summary.skipped += 1;
                },
                Err(e) => {
                    warn!("🔥️ Could not load order {uid}. {e}");
                    summary.skipped += 1;
                },
            }
        }
        info!("🔥️ Cache restore complete. {summary}");
        Ok(summary)
    }
}
