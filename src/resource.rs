// src/resource.rs

//! Named execution slots with per-resource concurrency limits.
//!
//! Each configured resource owns a FIFO-fair [`Semaphore`] sized to its
//! multiplexity. Resource ids that were never configured share the slots of
//! the `default` pool, so every job not bound to a named resource competes
//! for the same permits.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::types::DEFAULT_RESOURCE;

/// The pool was closed (the run is being interrupted) while waiting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("resource pool '{0}' was closed while waiting for a slot")]
pub struct PoolClosed(pub String);

#[derive(Debug)]
struct Slots {
    multiplexity: usize,
    semaphore: Arc<Semaphore>,
}

#[derive(Debug)]
pub struct ResourcePool {
    pools: HashMap<String, Slots>,
}

/// A held slot. Dropping it (or passing it to [`ResourcePool::release`])
/// returns the slot and wakes the oldest waiter, if any.
#[derive(Debug)]
pub struct ResourcePermit {
    resource: String,
    _permit: OwnedSemaphorePermit,
}

impl ResourcePermit {
    /// Effective pool this permit was taken from.
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl Drop for ResourcePermit {
    fn drop(&mut self) {
        debug!(resource = %self.resource, "released resource slot");
    }
}

impl ResourcePool {
    /// Build one slot pool per configured resource.
    pub fn new(config: &SchedulerConfig) -> Self {
        let pools = config
            .resources()
            .map(|(name, multiplexity)| {
                (
                    name.to_string(),
                    Slots {
                        multiplexity,
                        semaphore: Arc::new(Semaphore::new(multiplexity)),
                    },
                )
            })
            .collect();
        Self { pools }
    }

    /// Name of the pool that actually serves `resource_id`.
    pub fn resolve<'a>(&'a self, resource_id: &'a str) -> &'a str {
        if self.pools.contains_key(resource_id) {
            resource_id
        } else {
            DEFAULT_RESOURCE
        }
    }

    /// Maximum number of concurrent holders for `resource_id`.
    pub fn multiplexity(&self, resource_id: &str) -> usize {
        self.slots(resource_id).map(|s| s.multiplexity).unwrap_or(0)
    }

    /// Currently free slots for `resource_id`.
    pub fn available(&self, resource_id: &str) -> usize {
        self.slots(resource_id)
            .map(|s| s.semaphore.available_permits())
            .unwrap_or(0)
    }

    /// Wait until a slot for `resource_id` is free and take it.
    ///
    /// Waiters are served in FIFO order. Fails only if the pool has been
    /// [closed](Self::close).
    pub async fn acquire(&self, resource_id: &str) -> Result<ResourcePermit, PoolClosed> {
        let resource = self.resolve(resource_id).to_string();
        let slots = self
            .pools
            .get(&resource)
            .ok_or_else(|| PoolClosed(resource.clone()))?;

        let permit = Arc::clone(&slots.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| PoolClosed(resource.clone()))?;

        debug!(
            resource = %resource,
            requested = %resource_id,
            available = slots.semaphore.available_permits(),
            "acquired resource slot"
        );

        Ok(ResourcePermit {
            resource,
            _permit: permit,
        })
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire(&self, resource_id: &str) -> Option<ResourcePermit> {
        let resource = self.resolve(resource_id).to_string();
        let slots = self.pools.get(&resource)?;
        let permit = Arc::clone(&slots.semaphore).try_acquire_owned().ok()?;
        Some(ResourcePermit {
            resource,
            _permit: permit,
        })
    }

    /// Return a slot to its pool.
    pub fn release(&self, permit: ResourcePermit) {
        drop(permit);
    }

    /// Close every pool. Current waiters and later `acquire` calls fail with
    /// [`PoolClosed`]; permits already held stay valid until dropped.
    pub fn close(&self) {
        for slots in self.pools.values() {
            slots.semaphore.close();
        }
    }

    fn slots(&self, resource_id: &str) -> Option<&Slots> {
        self.pools.get(self.resolve(resource_id))
    }
}
