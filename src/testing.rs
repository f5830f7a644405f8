//! 测试辅助工具模块
//! Test utilities module

#![cfg(test)]

use crate::{
    error::{Error, Result},
    registry::PeerId,
    state::DeviceState,
    tracker::StateEvent,
    transaction::{Transaction, TransactionHandle},
    transport::{Transport, TransportOperation},
};
use async_trait::async_trait;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, Once},
    time::Duration,
};
use tokio::sync::Notify;

pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "peer_lifecycle=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// Lets every spawned task run until it blocks. Tests run with paused time,
/// so this also fires any timer due within the next millisecond.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// How the mock transport answers one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Succeed,
    Fail(i32),
    /// Waits for [`MockTransport::release`], then succeeds.
    Hold,
}

/// A transport whose answers are scripted per operation. Unscripted calls
/// succeed immediately.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<TransportOperation, VecDeque<Reply>>>,
    calls: Mutex<HashMap<TransportOperation, u32>>,
    release: Notify,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, operation: TransportOperation, replies: impl IntoIterator<Item = Reply>) {
        self.replies
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .extend(replies);
    }

    pub fn calls(&self, operation: TransportOperation) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    /// Releases one held call.
    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn answer(&self, operation: TransportOperation) -> Result<()> {
        *self.calls.lock().unwrap().entry(operation).or_default() += 1;
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Reply::Succeed);

        match reply {
            Reply::Succeed => Ok(()),
            Reply::Fail(code) => Err(Error::TransportFailure { operation, code }),
            Reply::Hold => {
                self.release.notified().await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, _peer: &PeerId) -> Result<()> {
        self.answer(TransportOperation::Connect).await
    }

    async fn disconnect(&self, _peer: &PeerId) -> Result<()> {
        self.answer(TransportOperation::Disconnect).await
    }

    async fn discover_services(&self, _peer: &PeerId) -> Result<()> {
        self.answer(TransportOperation::DiscoverServices).await
    }

    async fn request_bond(&self, _peer: &PeerId) -> Result<()> {
        self.answer(TransportOperation::RequestBond).await
    }
}

/// How a scripted transaction reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Succeed,
    Fail,
    Retry,
    /// Keeps the handle in the transaction's parking slot.
    Park,
}

/// A transaction that replays `steps`, one per start, and succeeds once
/// they run out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransaction {
    steps: Arc<Mutex<VecDeque<Step>>>,
    starts: Arc<Mutex<Vec<u32>>>,
    parked: Arc<Mutex<Option<TransactionHandle>>>,
}

impl ScriptedTransaction {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into_iter().collect())),
            ..Self::default()
        }
    }

    /// The `attempt` of every start so far.
    pub fn starts(&self) -> Vec<u32> {
        self.starts.lock().unwrap().clone()
    }

    pub fn take_parked(&self) -> Option<TransactionHandle> {
        self.parked.lock().unwrap().take()
    }
}

impl Transaction for ScriptedTransaction {
    fn start(&mut self, handle: TransactionHandle) {
        self.starts.lock().unwrap().push(handle.attempt());
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Succeed);
        match step {
            Step::Succeed => handle.succeed(),
            Step::Fail => handle.fail(),
            Step::Retry => handle.retry(),
            Step::Park => *self.parked.lock().unwrap() = Some(handle),
        }
    }
}

/// Collects every notification an observer receives.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<StateEvent<DeviceState>>>>,
}

impl Recorder {
    pub fn observer(&self) -> impl FnMut(&StateEvent<DeviceState>) + Send + 'static {
        let events = self.events.clone();
        move |event: &StateEvent<DeviceState>| events.lock().unwrap().push(*event)
    }

    pub fn events(&self) -> Vec<StateEvent<DeviceState>> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// The notifications that entered `state`, in order.
    pub fn entering(&self, state: DeviceState) -> Vec<StateEvent<DeviceState>> {
        self.events()
            .into_iter()
            .filter(|event| event.did_enter(state))
            .collect()
    }
}
