use futures::lock::Mutex;
use jatsl::TaskResourceHandle;
use redis::aio::MultiplexedConnection;
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex as SyncMutex, MutexGuard, PoisonError};

/// Multiplexed connection shared by all resources of one factory
#[derive(Default)]
pub(super) struct SharedConnection {
    pub connection: Mutex<Option<MultiplexedConnection>>,
    handles: SyncMutex<HashSet<TaskResourceHandle>>,
}

impl SharedConnection {
    pub fn handles(&self) -> MutexGuard<'_, HashSet<TaskResourceHandle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(super) struct HandleRegistration {
    tx: TaskResourceHandle,
    shared: Option<Arc<SharedConnection>>,
}

impl HandleRegistration {
    pub fn owned(tx: TaskResourceHandle) -> Self {
        Self { tx, shared: None }
    }

    pub fn shared(tx: TaskResourceHandle, shared: Arc<SharedConnection>) -> Self {
        shared.handles().insert(tx.clone());
        Self {
            tx,
            shared: Some(shared),
        }
    }

    pub fn shared_connection(&self) -> Option<&Arc<SharedConnection>> {
        self.shared.as_ref()
    }
}

impl DerefMut for HandleRegistration {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.tx
    }
}

impl Deref for HandleRegistration {
    type Target = TaskResourceHandle;

    fn deref(&self) -> &Self::Target {
        &self.tx
    }
}

impl Drop for HandleRegistration {
    fn drop(&mut self) {
        if let Some(shared) = &self.shared {
            shared.handles().remove(&self.tx);
        }
    }
}
