#![allow(unused)]

use std::sync::Once;
use std::time::Duration;

use tokio::task::JoinHandle;

use faketun::*;

/// Upper bound for operations that are expected to finish promptly.
pub const PROMPT: Duration = Duration::from_secs(2);

/// How long to wait before concluding that an operation is blocked.
pub const BLOCKED: Duration = Duration::from_millis(100);

pub struct TestKit {}

impl TestKit {
    pub fn init_tracing() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
            tracing_subscriber::registry()
                .with(tracing_subscriber::EnvFilter::new(
                    std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".into()),
                ))
                .with(tracing_subscriber::fmt::layer().with_test_writer())
                .init();
        });
    }

    pub fn spawn_write<T>(
        tun: &T,
        data: &[u8],
        offset: usize,
    ) -> JoinHandle<Result<usize, TunError>>
    where
        T: Tun + 'static,
    {
        let tun = tun.clone();
        let data = data.to_vec();
        tokio::spawn(async move { tun.write(&data, offset).await })
    }

    pub fn spawn_read<T>(tun: &T, size: usize) -> JoinHandle<Result<Vec<u8>, TunError>>
    where
        T: Tun + 'static,
    {
        let tun = tun.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; size];
            let n = tun.read(&mut buf, 0).await?;
            buf.truncate(n);
            Ok(buf)
        })
    }
}
