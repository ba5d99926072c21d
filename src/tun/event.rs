use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Lifecycle notification emitted by a TUN backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Up,
    Down,
    MtuUpdate,
}

/// Per-subscriber stream of [`Event`]s.
///
/// The stream ends once the owning device is closed or dropped.
#[derive(Debug)]
pub struct Events {
    rx: broadcast::Receiver<Event>,
    token: CancellationToken,
}

impl Events {
    pub fn new(rx: broadcast::Receiver<Event>, token: CancellationToken) -> Self {
        Self { rx, token }
    }

    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return None,
                ev = self.rx.recv() => match ev {
                    Ok(ev) => return Some(ev),
                    Err(RecvError::Lagged(n)) => {
                        warn!("TUN event subscriber lagged, {} events skipped", n);
                    }
                    Err(RecvError::Closed) => return None,
                },
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Event> + Send {
        futures::stream::unfold(self, |mut events| async move {
            events.recv().await.map(|ev| (ev, events))
        })
    }
}
