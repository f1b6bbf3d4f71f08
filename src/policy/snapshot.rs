use super::network::PolicyNetwork;
use std::sync::Arc;
use std::sync::RwLock;

/// Read-copy handle for the live policy weights. The request path reads
/// an immutable snapshot without ever observing a half-updated network;
/// the trainer clones the snapshot, steps it, and publishes the result
/// atomically. At most two copies exist: the live one and the one being
/// trained.
pub struct PolicyHandle {
    live: RwLock<Arc<PolicyNetwork>>,
}

impl PolicyHandle {
    pub fn new(net: PolicyNetwork) -> Self {
        Self {
            live: RwLock::new(Arc::new(net)),
        }
    }

    pub fn current(&self) -> Arc<PolicyNetwork> {
        self.live.read().expect("policy lock poisoned").clone()
    }

    pub fn publish(&self, net: PolicyNetwork) {
        *self.live.write().expect("policy lock poisoned") = Arc::new(net);
    }

    pub fn version(&self) -> u64 {
        self.current().version()
    }
}
