// src/pipeline/fanout.rs
//! Fan-out of raw sentence lines to independent consumer queues

use crate::error::{GpsError, Result};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

/// One named outgoing queue
#[derive(Debug, Clone)]
struct Outlet {
    name: &'static str,
    sender: mpsc::Sender<String>,
}

/// Delivers every line to each registered queue.
///
/// Queues are bounded and drained at their own pace. A full queue only
/// delays the producer on that queue: every queue with room has already
/// received the line before the producer waits on the full ones. Nothing is
/// dropped while a consumer is alive.
#[derive(Debug, Clone, Default)]
pub struct Fanout {
    outlets: Vec<Outlet>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a queue under a name used in diagnostics
    pub fn add_outlet(&mut self, name: &'static str, sender: mpsc::Sender<String>) {
        self.outlets.push(Outlet { name, sender });
    }

    /// Number of queues still being fed
    pub fn outlet_count(&self) -> usize {
        self.outlets.len()
    }

    /// Deliver a copy of `line` to every queue.
    ///
    /// A queue whose consumer has gone away is removed with a warning.
    /// Fails only once no queue is left.
    pub async fn broadcast(&mut self, line: &str) -> Result<()> {
        let mut waiting = Vec::new();
        let mut closed = Vec::new();

        for (index, outlet) in self.outlets.iter().enumerate() {
            match outlet.sender.try_send(line.to_string()) {
                Ok(()) => {}
                Err(TrySendError::Full(pending)) => waiting.push((index, pending)),
                Err(TrySendError::Closed(_)) => closed.push(index),
            }
        }

        for (index, pending) in waiting {
            if self.outlets[index].sender.send(pending).await.is_err() {
                closed.push(index);
            }
        }

        if !closed.is_empty() {
            closed.sort_unstable();
            for index in closed.into_iter().rev() {
                let outlet = self.outlets.remove(index);
                warn!(queue = outlet.name, "consumer stopped, removing queue from fan-out");
            }
        }

        if self.outlets.is_empty() {
            return Err(GpsError::ChannelClosed("all sentence queues".to_string()));
        }
        Ok(())
    }
}
