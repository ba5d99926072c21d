mod error;
mod event;
mod memory;

pub use error::Error;
pub use event::{Event, Events};
pub use memory::MemoryTun;

#[cfg(unix)]
use std::os::fd::BorrowedFd;

use async_trait::async_trait;

/// A packet-level tunnel device.
///
/// Handles are cheap to clone and share the same underlying device.
#[async_trait]
pub trait Tun: Send + Sync + Clone {
    fn name(&self) -> Result<&str, Error>;
    fn mtu(&self) -> Result<u16, Error>;
    fn events(&self) -> Events;
    fn flush(&self) -> Result<(), Error>;
    fn close(&self) -> Result<(), Error>;

    /// OS file handle backing the device.
    ///
    /// Backends without one panic.
    #[cfg(unix)]
    fn file(&self) -> BorrowedFd<'_>;

    /// Reads one packet into `buf[offset..]` and returns its length.
    ///
    /// # Panics
    ///
    /// Panics if `buf[offset..]` is shorter than the received packet.
    async fn read(&self, buf: &mut [u8], offset: usize) -> Result<usize, Error>;

    /// Writes `buf[offset..]` as one packet and returns `buf.len()`.
    ///
    /// # Panics
    ///
    /// Panics if `offset > buf.len()`.
    async fn write(&self, buf: &[u8], offset: usize) -> Result<usize, Error>;
}
