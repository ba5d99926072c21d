use std::collections::VecDeque;
#[cfg(unix)]
use std::os::fd::BorrowedFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{broadcast, oneshot, Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::tun::{Error, Event, Events, Tun};

const NAME: &str = "FakeTUN";
const MTU: u16 = 1500;
const EVENT_CAPACITY: usize = 16;

/// A packet offered to a reader, with the writer's acknowledgement channel.
type Offer = (Bytes, oneshot::Sender<()>);

/// A waiting reader's hand-off slot.
type Slot = oneshot::Sender<Offer>;

#[derive(Debug)]
struct Inner {
    closed: AtomicBool,
    token: CancellationToken,
    slots: StdMutex<VecDeque<Slot>>,
    slot_ready: Notify,
    writer: Mutex<()>,
    events: broadcast::Sender<Event>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// An in-memory TUN device that needs no OS support.
///
/// Packets are handed from a writer directly to a waiting reader; nothing
/// is buffered. [`Tun::close`] wakes every pending operation, after which
/// reads fail with [`Error::Eof`] and writes with [`Error::Closed`].
#[derive(Debug, Clone)]
pub struct MemoryTun {
    inner: Arc<Inner>,
}

impl MemoryTun {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                closed: AtomicBool::new(false),
                token: CancellationToken::new(),
                slots: StdMutex::new(VecDeque::new()),
                slot_ready: Notify::new(),
                writer: Mutex::new(()),
                events,
            }),
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Registers a slot for the calling reader, dropping slots whose readers went away.
    fn register(&self) -> oneshot::Receiver<Offer> {
        let (slot, rx) = oneshot::channel();
        {
            let mut slots = self.inner.slots.lock().unwrap();
            slots.retain(|s| !s.is_closed());
            slots.push_back(slot);
        }
        self.inner.slot_ready.notify_one();
        rx
    }

    fn next_slot(&self) -> Option<Slot> {
        let mut slots = self.inner.slots.lock().unwrap();
        while let Some(slot) = slots.pop_front() {
            if !slot.is_closed() {
                return Some(slot);
            }
        }
        None
    }
}

impl Default for MemoryTun {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tun for MemoryTun {
    fn name(&self) -> Result<&str, Error> {
        Ok(NAME)
    }

    fn mtu(&self) -> Result<u16, Error> {
        Ok(MTU)
    }

    fn events(&self) -> Events {
        Events::new(self.inner.events.subscribe(), self.inner.token.clone())
    }

    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }

    fn close(&self) -> Result<(), Error> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            debug!("MemoryTun already closed");
            return Ok(());
        }
        self.inner.token.cancel();
        debug!("MemoryTun closed");
        Ok(())
    }

    #[cfg(unix)]
    fn file(&self) -> BorrowedFd<'_> {
        panic!("MemoryTun::file() called, but an in-memory device has no file handle");
    }

    async fn read(&self, buf: &mut [u8], offset: usize) -> Result<usize, Error> {
        loop {
            if self.inner.token.is_cancelled() {
                return Err(Error::Eof);
            }

            let mut rx = self.register();
            let (packet, ack) = tokio::select! {
                biased;
                ret = &mut rx => match ret {
                    Ok(offer) => offer,
                    // The writer that took our slot went away; register again.
                    Err(_) => continue,
                },
                _ = self.inner.token.cancelled() => {
                    // A writer may have filled the slot just before close.
                    rx.close();
                    match rx.try_recv() {
                        Ok(offer) => offer,
                        Err(_) => return Err(Error::Eof),
                    }
                }
            };

            // The packet is ours only if its writer is still waiting for it.
            if ack.send(()).is_err() {
                continue;
            }

            let n = packet.len();
            buf[offset..offset + n].copy_from_slice(&packet);
            debug!("MemoryTun read {} bytes", n);
            return Ok(n);
        }
    }

    async fn write(&self, buf: &[u8], offset: usize) -> Result<usize, Error> {
        let packet = Bytes::copy_from_slice(&buf[offset..]);

        let _writer = tokio::select! {
            biased;
            _ = self.inner.token.cancelled() => return Err(Error::Closed),
            guard = self.inner.writer.lock() => guard,
        };

        loop {
            let Some(slot) = self.next_slot() else {
                tokio::select! {
                    biased;
                    _ = self.inner.token.cancelled() => return Err(Error::Closed),
                    _ = self.inner.slot_ready.notified() => {}
                }
                continue;
            };

            if self.inner.token.is_cancelled() {
                return Err(Error::Closed);
            }

            let (ack, mut acked) = oneshot::channel();
            if slot.send((packet.clone(), ack)).is_err() {
                // Reader gave up before we got to it.
                continue;
            }

            let delivered = tokio::select! {
                biased;
                ret = &mut acked => ret.is_ok(),
                _ = self.inner.token.cancelled() => {
                    acked.close();
                    acked.try_recv().is_ok()
                }
            };

            if delivered {
                debug!("MemoryTun wrote {} bytes", packet.len());
                return Ok(buf.len());
            }
            // The reader was dropped while holding the offer; try the next one.
        }
    }
}
