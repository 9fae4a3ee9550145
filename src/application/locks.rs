use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, OwnedMutexGuard};

const PRUNE_AT: usize = 1024;

/// One async lock per order id.
///
/// Held by the engine for the whole of a mutating operation on an order,
/// payment call included. Entries are weak, so a lock nobody holds is dropped the
/// next time the table is pruned.
#[derive(Default)]
pub struct OrderLocks {
    slots: Mutex<HashMap<u64, Weak<Mutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, order_id: u64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut slots = self.slots.lock().await;
            if slots.len() >= PRUNE_AT {
                slots.retain(|_, slot| slot.strong_count() > 0);
            }
            match slots.get(&order_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(Mutex::new(()));
                    slots.insert(order_id, Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn live(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.values().filter(|slot| slot.strong_count() > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_order_is_serialized() {
        let locks = Arc::new(OrderLocks::new());
        let guard = locks.acquire(1).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_other_orders_are_not_blocked() {
        let locks = OrderLocks::new();
        let _first = locks.acquire(1).await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_released_locks_are_not_live() {
        let locks = OrderLocks::new();
        {
            let _guard = locks.acquire(5).await;
            assert_eq!(locks.live().await, 1);
        }
        assert_eq!(locks.live().await, 0);
    }
}
