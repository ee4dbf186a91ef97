//! Active-processing registry: at most one processor per task id.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

/// Task ids that currently have a processing routine.
#[derive(Debug, Default)]
pub struct ActiveRegistry {
    active: Mutex<HashSet<Uuid>>,
}

impl ActiveRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Uuid>> {
        self.active.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Claim `id` for processing. Returns `None` if it is already claimed.
    /// The claim is released when the returned guard drops.
    pub fn try_claim(self: &Arc<Self>, id: Uuid) -> Option<Claim> {
        if !self.lock().insert(id) {
            return None;
        }
        Some(Claim {
            registry: Arc::clone(self),
            id,
        })
    }

    pub fn is_active(&self, id: Uuid) -> bool {
        self.lock().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Exclusive processing right for one task id.
#[derive(Debug)]
pub struct Claim {
    registry: Arc<ActiveRegistry>,
    id: Uuid,
}

impl Claim {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
    }
}
