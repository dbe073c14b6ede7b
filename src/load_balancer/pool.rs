//! Donor pool management.
//!
//! # Responsibilities
//! - Hold the donor clients in configuration order
//! - Hand them out in rotation, safely from many tasks at once

use std::sync::Arc;

use crate::backend::BackendClient;
use crate::load_balancer::{round_robin::RoundRobin, LoadBalancer};

/// Ordered set of donor clients with a rotation cursor.
#[derive(Debug)]
pub struct ClientPool {
    clients: Vec<Arc<BackendClient>>,
    balancer: Box<dyn LoadBalancer>,
}

impl ClientPool {
    /// Create an empty round-robin pool.
    pub fn new() -> Self {
        Self {
            clients: Vec::new(),
            balancer: Box::new(RoundRobin::new()),
        }
    }

    /// Append a client. Only used while building the pool at startup.
    pub fn add(&mut self, client: Arc<BackendClient>) {
        tracing::info!(backend = %client.name(), url = %client.base_url(), "Adding donor");
        self.clients.push(client);
    }

    /// Next client in rotation, wrapping at the end.
    ///
    /// `None` only for an empty pool, which startup validation rules out.
    pub fn next(&self) -> Option<Arc<BackendClient>> {
        let index = self.balancer.next_index(self.clients.len())?;
        self.clients.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// All clients in configuration order.
    pub fn clients(&self) -> &[Arc<BackendClient>] {
        &self.clients
    }
}

impl Default for ClientPool {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Arc<BackendClient>> for ClientPool {
    fn from_iter<I: IntoIterator<Item = Arc<BackendClient>>>(iter: I) -> Self {
        let mut pool = Self::new();
        for client in iter {
            pool.add(client);
        }
        pool
    }
}
