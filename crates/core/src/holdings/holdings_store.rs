//! In-memory holding store backed by the remote repository.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info, warn};

use super::holdings_model::{Holding, HoldingId, NewHolding};
use super::holdings_traits::HoldingRepositoryTrait;
use crate::errors::{Error, Result};

/// Shared, long-lived view of the current holding list.
///
/// Cloning is cheap and every clone sees the same list, so the refresh loop
/// always reads the live set rather than a copy taken when it started.
#[derive(Debug, Clone, Default)]
pub struct SharedHoldings {
    inner: Arc<RwLock<Vec<Holding>>>,
}

impl SharedHoldings {
    pub fn new(holdings: Vec<Holding>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(holdings)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Holding>> {
        self.inner.read().unwrap_or_else(|poisoned| {
            warn!("Holding list lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Holding>> {
        self.inner.write().unwrap_or_else(|poisoned| {
            warn!("Holding list lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Copy of the current list.
    pub fn snapshot(&self) -> Vec<Holding> {
        self.read().clone()
    }

    /// De-duplicated symbols currently held.
    pub fn symbols(&self) -> BTreeSet<String> {
        self.read().iter().map(|h| h.symbol.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn get(&self, id: HoldingId) -> Option<Holding> {
        self.read().iter().find(|h| h.id == id).cloned()
    }

    pub fn contains(&self, id: HoldingId) -> bool {
        self.read().iter().any(|h| h.id == id)
    }

    pub(crate) fn replace(&self, holdings: Vec<Holding>) {
        *self.write() = holdings;
    }

    /// Appends a holding, replacing any entry with the same id.
    pub(crate) fn upsert(&self, holding: Holding) {
        let mut list = self.write();
        match list.iter_mut().find(|h| h.id == holding.id) {
            Some(existing) => *existing = holding,
            None => list.push(holding),
        }
    }

    pub(crate) fn remove(&self, id: HoldingId) -> Option<Holding> {
        let mut list = self.write();
        let index = list.iter().position(|h| h.id == id)?;
        Some(list.remove(index))
    }
}

impl From<Vec<Holding>> for SharedHoldings {
    fn from(holdings: Vec<Holding>) -> Self {
        Self::new(holdings)
    }
}

/// Holding store: the local list plus the repository that persists it.
///
/// Local state changes only after the server acknowledged a mutation.
pub struct HoldingStore {
    repository: Arc<dyn HoldingRepositoryTrait>,
    holdings: SharedHoldings,
}

impl HoldingStore {
    pub fn new(repository: Arc<dyn HoldingRepositoryTrait>) -> Self {
        Self {
            repository,
            holdings: SharedHoldings::default(),
        }
    }

    /// Handle to the live list, for the refresh scheduler.
    pub fn shared(&self) -> SharedHoldings {
        self.holdings.clone()
    }

    /// Replaces the local list with the server's.
    pub async fn reload(&self) -> Result<usize> {
        let holdings = self.repository.list().await?;
        let count = holdings.len();
        self.holdings.replace(holdings);
        info!("Loaded {} holdings", count);
        Ok(count)
    }

    pub fn list(&self) -> Vec<Holding> {
        self.holdings.snapshot()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn symbols(&self) -> BTreeSet<String> {
        self.holdings.symbols()
    }

    pub fn get(&self, id: HoldingId) -> Option<Holding> {
        self.holdings.get(id)
    }

    /// Creates a holding on the server, then adds the acknowledged holding
    /// to the local list.
    pub async fn add(&self, new_holding: NewHolding) -> Result<Holding> {
        new_holding.validate()?;
        let new_holding = new_holding.normalized();
        debug!(
            "Creating holding {} (quantity {}, average price {})",
            new_holding.symbol, new_holding.quantity, new_holding.average_price
        );

        let created = self.repository.create(new_holding).await?;
        self.holdings.upsert(created.clone());
        info!("Added holding {} ({})", created.id, created.symbol);
        Ok(created)
    }

    /// Deletes a holding on the server, then drops it from the local list.
    ///
    /// Removing an id that is not in the local list fails with `NotFound`
    /// without contacting the server, so a second removal always fails.
    pub async fn remove(&self, id: HoldingId) -> Result<Holding> {
        if !self.holdings.contains(id) {
            return Err(Error::NotFound(format!("Holding {} not found", id)));
        }

        self.repository.delete(id).await?;

        self.holdings
            .remove(id)
            .inspect(|removed| info!("Removed holding {} ({})", removed.id, removed.symbol))
            .ok_or_else(|| Error::NotFound(format!("Holding {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    /// In-memory repository mimicking the backend's behaviour.
    struct MockHoldingRepository {
        holdings: Arc<Mutex<Vec<Holding>>>,
        next_id: Mutex<i64>,
        limit: Option<usize>,
        delete_calls: Mutex<usize>,
    }

    impl MockHoldingRepository {
        fn new() -> Self {
            Self {
                holdings: Arc::new(Mutex::new(Vec::new())),
                next_id: Mutex::new(1),
                limit: None,
                delete_calls: Mutex::new(0),
            }
        }

        fn with_limit(mut self, limit: usize) -> Self {
            self.limit = Some(limit);
            self
        }

        fn delete_calls(&self) -> usize {
            *self.delete_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl HoldingRepositoryTrait for MockHoldingRepository {
        async fn list(&self) -> Result<Vec<Holding>> {
            Ok(self.holdings.lock().unwrap().clone())
        }

        async fn create(&self, new_holding: NewHolding) -> Result<Holding> {
            let mut holdings = self.holdings.lock().unwrap();
            if let Some(limit) = self.limit {
                if holdings.len() >= limit {
                    return Err(Error::QuotaExceeded(format!(
                        "Free plan allows up to {} holdings.",
                        limit
                    )));
                }
            }
            let mut next_id = self.next_id.lock().unwrap();
            let holding = Holding {
                id: HoldingId(*next_id),
                symbol: new_holding.symbol,
                quantity: new_holding.quantity,
                average_price: new_holding.average_price,
                notes: new_holding.notes,
            };
            *next_id += 1;
            holdings.push(holding.clone());
            Ok(holding)
        }

        async fn delete(&self, id: HoldingId) -> Result<()> {
            *self.delete_calls.lock().unwrap() += 1;
            let mut holdings = self.holdings.lock().unwrap();
            let index = holdings
                .iter()
                .position(|h| h.id == id)
                .ok_or_else(|| Error::NotFound("Portfolio item not found".to_string()))?;
            holdings.remove(index);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_add_uses_server_assigned_id() {
        let store = HoldingStore::new(Arc::new(MockHoldingRepository::new()));

        let holding = store
            .add(NewHolding::new(" aapl ", dec!(10), dec!(150)))
            .await
            .unwrap();

        assert_eq!(holding.id, HoldingId(1));
        assert_eq!(holding.symbol, "AAPL");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(HoldingId(1)), Some(holding));
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_store() {
        let repository = Arc::new(MockHoldingRepository::new());
        let store = HoldingStore::new(repository.clone());

        for input in [
            NewHolding::new("", dec!(1), dec!(1)),
            NewHolding::new("AAPL", dec!(0), dec!(1)),
            NewHolding::new("AAPL", dec!(1), dec!(-5)),
        ] {
            let err = store.add(input).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }

        assert!(store.is_empty());
        assert!(repository.holdings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quota_exceeded_leaves_store_unchanged() {
        let store = HoldingStore::new(Arc::new(MockHoldingRepository::new().with_limit(1)));
        store
            .add(NewHolding::new("AAPL", dec!(1), dec!(100)))
            .await
            .unwrap();

        let err = store
            .add(NewHolding::new("MSFT", dec!(1), dec!(300)))
            .await
            .unwrap_err();

        assert!(err.suggests_upgrade());
        assert_eq!(err.to_string(), "Free plan allows up to 1 holdings.");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_not_idempotent() {
        let repository = Arc::new(MockHoldingRepository::new());
        let store = HoldingStore::new(repository.clone());
        let holding = store
            .add(NewHolding::new("AAPL", dec!(1), dec!(100)))
            .await
            .unwrap();

        let removed = store.remove(holding.id).await.unwrap();
        assert_eq!(removed.symbol, "AAPL");
        assert!(store.is_empty());

        let err = store.remove(holding.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        // The second removal is rejected locally.
        assert_eq!(repository.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_server_not_found_keeps_local_list() {
        let repository = Arc::new(MockHoldingRepository::new());
        let store = HoldingStore::new(repository.clone());
        let holding = store
            .add(NewHolding::new("AAPL", dec!(1), dec!(100)))
            .await
            .unwrap();

        // Deleted elsewhere, local copy is stale.
        repository.holdings.lock().unwrap().clear();

        let err = store.remove(holding.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_reload_replaces_local_list() {
        let repository = Arc::new(MockHoldingRepository::new());
        let store = HoldingStore::new(repository.clone());
        store
            .add(NewHolding::new("AAPL", dec!(1), dec!(100)))
            .await
            .unwrap();
        repository.holdings.lock().unwrap().push(Holding {
            id: HoldingId(42),
            symbol: "005930".to_string(),
            quantity: dec!(5),
            average_price: dec!(70000),
            notes: None,
        });

        let count = store.reload().await.unwrap();

        assert_eq!(count, 2);
        let symbols: Vec<String> = store.symbols().into_iter().collect();
        assert_eq!(symbols, vec!["005930".to_string(), "AAPL".to_string()]);
    }

    #[test]
    fn test_shared_holdings_clones_see_updates() {
        let shared = SharedHoldings::default();
        let view = shared.clone();

        shared.upsert(Holding {
            id: HoldingId(1),
            symbol: "AAPL".to_string(),
            quantity: dec!(1),
            average_price: dec!(1),
            notes: None,
        });

        assert_eq!(view.len(), 1);
        assert!(view.contains(HoldingId(1)));
        assert!(shared.remove(HoldingId(1)).is_some());
        assert!(view.is_empty());
    }
}
