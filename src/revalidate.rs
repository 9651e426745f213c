use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast::{self, Sender};
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revalidation {
    pub path: String,
    pub at: DateTime<Utc>,
}

/// Tells front-end caches which rendered pages went stale.
#[derive(Debug, Clone)]
pub struct Revalidator {
    sender: Sender<Revalidation>,
}

impl Default for Revalidator {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl Revalidator {
    pub fn revalidate_path(&self, path: &str) {
        let receivers = self
            .sender
            .send(Revalidation {
                path: path.into(),
                at: Utc::now(),
            })
            .unwrap_or(0);
        debug!(path, receivers, "Revalidating page");
    }

    /// Yields every revalidation published after subscribing, in order.
    /// A subscriber that falls more than the channel capacity behind sees
    /// a lag error in place of the skipped items.
    pub fn subscribe(&self) -> BroadcastStream<Revalidation> {
        BroadcastStream::new(self.sender.subscribe())
    }
}
