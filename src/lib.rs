mod tun;

pub use tun::{Error as TunError, Event, Events, MemoryTun, Tun};
