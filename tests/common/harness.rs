//! tests/common/harness.rs
use async_trait::async_trait;
use peer_lifecycle::{
    Config, ConnectionLifecycle, Error, PeerId, PeerRegistry, Result,
    transport::{Transport, TransportEvent, TransportOperation},
};
use std::sync::{
    Arc, Once,
    atomic::{AtomicU32, Ordering},
};
use std::time::Duration;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "peer_lifecycle=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// A transport with fixed latency whose next `connect` calls can be made
/// to fail.
#[derive(Debug, Default)]
pub struct FlakyTransport {
    latency: Duration,
    connect_failures: AtomicU32,
    connects: AtomicU32,
    disconnects: AtomicU32,
}

impl FlakyTransport {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Makes the next `count` connect calls fail.
    pub fn fail_next_connects(&self, count: u32) {
        self.connect_failures.store(count, Ordering::SeqCst);
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> u32 {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FlakyTransport {
    async fn connect(&self, _peer: &PeerId) -> Result<()> {
        tokio::time::sleep(self.latency).await;
        self.connects.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::TransportFailure {
                operation: TransportOperation::Connect,
                code: 133,
            });
        }
        Ok(())
    }

    async fn disconnect(&self, _peer: &PeerId) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn discover_services(&self, _peer: &PeerId) -> Result<()> {
        tokio::time::sleep(self.latency).await;
        Ok(())
    }

    async fn request_bond(&self, _peer: &PeerId) -> Result<()> {
        tokio::time::sleep(self.latency).await;
        Ok(())
    }
}

/// A test harness wiring a lifecycle to a [`FlakyTransport`].
pub struct TestHarness {
    pub transport: Arc<FlakyTransport>,
    pub lifecycle: ConnectionLifecycle<FlakyTransport>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        init_tracing();
        let transport = Arc::new(FlakyTransport::with_latency(Duration::from_millis(20)));
        let lifecycle =
            ConnectionLifecycle::new(transport.clone(), Arc::new(PeerRegistry::new()), config);
        Self {
            transport,
            lifecycle,
        }
    }

    pub async fn drop_link(&self, peer: &PeerId, code: i32) {
        self.lifecycle
            .handle_transport_event(TransportEvent::LinkDropped {
                peer: peer.clone(),
                code,
            })
            .await
            .unwrap();
    }
}
