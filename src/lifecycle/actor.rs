//! The per-peer actor that owns a peer's `StateTracker`.
//!
//! 拥有外设 `StateTracker` 的单外设 actor。
//!
//! 所有对某个外设状态的写入都发生在这里，因此同一外设的变更天然串行化。
//! 不同外设的 actor 相互独立，可以并行运行。
//!
//! Every write to one peer's state happens here, so mutations for the same
//! peer are serialized. Actors of different peers are independent and run
//! in parallel.

use super::{
    command::{Completion, ConnectOptions, PeerCommand},
    phase::{ConnectionPhase, PhaseStep, resolve_phase},
    transitions,
};
use crate::{
    config::Config,
    error::{Error, Result},
    reconnect::{ReconnectAttempt, ReconnectDecision, ReconnectPolicy},
    registry::PeerId,
    state::{DeviceState, StateSet},
    status::{Intent, Status},
    tracker::{StateDiff, StateTracker},
    transaction::{Transaction, TransactionHandle, TransactionOutcome, TransactionPhase},
    transport::{BondState, Transport, TransportEvent, TransportOperation},
};
use std::{future::Future, ops::ControlFlow, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, watch},
    task::AbortHandle,
    time::Instant,
};
use tracing::{debug, info, trace, warn};

/// Status code reported when a transport error carries no native code.
/// 传输错误不带原生状态码时报告的状态码。
const UNKNOWN_STATUS_CODE: i32 = -1;

/// One reconnect episode: from an unexpected disconnect until the peer is
/// initialized again, the policy cancels, or the caller intervenes.
///
/// 一个重连周期：从意外断开开始，直到外设重新初始化、策略取消或调用方介入。
#[derive(Debug)]
struct ReconnectEpisode {
    failure_count: u32,
    started_at: Instant,
}

impl ReconnectEpisode {
    fn new() -> Self {
        Self {
            failure_count: 0,
            started_at: Instant::now(),
        }
    }

    fn attempt(&self) -> ReconnectAttempt {
        ReconnectAttempt {
            failure_count: self.failure_count,
            time_since_disconnect: self.started_at.elapsed(),
        }
    }

    fn record_failure(&mut self) -> ReconnectAttempt {
        self.failure_count = self.failure_count.saturating_add(1);
        self.attempt()
    }
}

/// The channels a peer actor talks through.
///
/// 外设 actor 使用的通道。
pub(crate) struct ActorChannels {
    pub(crate) command_rx: mpsc::Receiver<PeerCommand>,
    pub(crate) loopback_tx: mpsc::WeakSender<PeerCommand>,
    pub(crate) state_tx: watch::Sender<StateSet<DeviceState>>,
}

/// Owns one peer's state and sequences its connection.
///
/// 拥有单个外设的状态并对其连接进行排序。
pub(crate) struct PeerActor<T: Transport> {
    peer: PeerId,
    transport: Arc<T>,
    config: Arc<Config>,
    reconnect_policy: Option<Arc<dyn ReconnectPolicy>>,
    tracker: StateTracker<DeviceState>,
    channels: ActorChannels,
    /// Bumped whenever in-flight work is abandoned.
    /// 每当放弃进行中的工作时递增。
    token: u64,
    bond_token: u64,
    in_flight: Vec<AbortHandle>,
    options: ConnectOptions,
    firmware: Option<Box<dyn Transaction>>,
    connect_intent: Intent,
    episode: Option<ReconnectEpisode>,
}

impl<T: Transport> PeerActor<T> {
    pub(crate) fn new(
        peer: PeerId,
        transport: Arc<T>,
        config: Arc<Config>,
        reconnect_policy: Option<Arc<dyn ReconnectPolicy>>,
        initial: StateSet<DeviceState>,
        channels: ActorChannels,
    ) -> Self {
        Self {
            peer,
            transport,
            config,
            reconnect_policy,
            tracker: StateTracker::new(initial),
            channels,
            token: 0,
            bond_token: 0,
            in_flight: Vec::new(),
            options: ConnectOptions::default(),
            firmware: None,
            connect_intent: Intent::Intentional,
            episode: None,
        }
    }

    /// Runs the actor's main event loop.
    ///
    /// 运行 actor 的主事件循环。
    pub(crate) async fn run(mut self) {
        debug!(peer = %self.peer, state = ?self.tracker.current(), "Peer actor started");

        while let Some(command) = self.channels.command_rx.recv().await {
            if self.handle_command(command).is_break() {
                break;
            }
        }

        self.cancel_in_flight();
        debug!(peer = %self.peer, "Peer actor stopped");
    }

    fn handle_command(&mut self, command: PeerCommand) -> ControlFlow<()> {
        match command {
            PeerCommand::Connect {
                options,
                response_tx,
            } => {
                let _ = response_tx.send(self.handle_connect(options));
            }
            PeerCommand::Disconnect { response_tx } => {
                let _ = response_tx.send(self.handle_disconnect());
            }
            PeerCommand::Bond { response_tx } => {
                let _ = response_tx.send(self.handle_bond());
            }
            PeerCommand::UpdateFirmware {
                transaction,
                response_tx,
            } => {
                let _ = response_tx.send(self.handle_update_firmware(transaction));
            }
            PeerCommand::SetObserver(observer) => self.tracker.set_observer(observer),
            PeerCommand::ClearObserver => self.tracker.clear_observer(),
            PeerCommand::Transport(event) => self.handle_transport_event(event),
            PeerCommand::Undiscover { response_tx } => {
                self.handle_undiscover();
                let _ = response_tx.send(());
                return ControlFlow::Break(());
            }
            PeerCommand::Completed { token, completion } => {
                if token == self.token {
                    self.handle_completion(completion);
                } else {
                    trace!(
                        peer = %self.peer,
                        token,
                        current = self.token,
                        ?completion,
                        "Discarding stale completion"
                    );
                }
            }
            PeerCommand::BondCompleted { token, result } => {
                self.handle_bond_completed(token, result)
            }
            PeerCommand::ReconnectDue { token } => self.handle_reconnect_due(token),
        }
        ControlFlow::Continue(())
    }

    // --- Caller requests ---

    fn handle_connect(&mut self, options: ConnectOptions) -> Result<()> {
        let current = self.tracker.current();
        if current.contains(DeviceState::ConnectingOverall)
            || current.contains(DeviceState::Connected)
        {
            debug!(peer = %self.peer, state = ?current, "Connect ignored, already connecting or connected");
            return Ok(());
        }

        // A caller connect takes over from any pending reconnect.
        self.cancel_in_flight();
        self.episode = None;
        self.options = options;
        self.start_connect(Intent::Intentional);
        Ok(())
    }

    fn handle_disconnect(&mut self) -> Result<()> {
        let current = self.tracker.current();
        if current.contains(DeviceState::Disconnected)
            && !current.contains(DeviceState::AttemptingReconnect)
        {
            return Ok(());
        }

        info!(peer = %self.peer, state = ?current, "Disconnecting on request");
        self.abandon_in_flight();
        self.episode = None;
        self.enter_disconnected(Intent::Intentional, Status::ExplicitDisconnect, None);
        if Self::link_active(current) {
            self.spawn_transport_disconnect();
        }
        Ok(())
    }

    fn handle_bond(&mut self) -> Result<()> {
        let current = self.tracker.current();
        if current.contains(DeviceState::Bonded) || current.contains(DeviceState::Bonding) {
            return Ok(());
        }
        let tx = self.loopback()?;

        self.bond_token += 1;
        let token = self.bond_token;
        self.apply(
            transitions::bond(current, BondState::Bonding),
            Intent::Intentional,
            Status::Success,
        );

        let transport = self.transport.clone();
        let peer = self.peer.clone();
        tokio::spawn(async move {
            let result = transport.request_bond(&peer).await;
            let _ = tx.send(PeerCommand::BondCompleted { token, result }).await;
        });
        Ok(())
    }

    fn handle_update_firmware(&mut self, transaction: Box<dyn Transaction>) -> Result<()> {
        let current = self.tracker.current();
        if !current.contains(DeviceState::Initialized) {
            return Err(Error::InvalidStateRequest {
                peer: self.peer.clone(),
                reason: "firmware updates need an initialized connection",
            });
        }
        if current.contains(DeviceState::UpdatingFirmware) {
            return Err(Error::InvalidStateRequest {
                peer: self.peer.clone(),
                reason: "a firmware update is already running",
            });
        }

        self.firmware = Some(transaction);
        self.apply(
            transitions::firmware_update(current, true),
            Intent::Intentional,
            Status::Success,
        );
        self.start_transaction(TransactionPhase::UpdateFirmware, 0);
        Ok(())
    }

    fn handle_undiscover(&mut self) {
        let current = self.tracker.current();
        self.abandon_in_flight();
        self.episode = None;
        self.apply(
            DeviceState::Undiscovered.into(),
            Intent::Intentional,
            Status::Success,
        );
        if Self::link_active(current) {
            self.spawn_transport_disconnect();
        }
        info!(peer = %self.peer, "Peer undiscovered");
    }

    // --- Transport and transaction results ---

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::LinkDropped { code, .. } => self.handle_link_dropped(code),
            TransportEvent::BondStateChanged { bond, .. } => {
                let target = transitions::bond(self.tracker.current(), bond);
                self.apply(target, Intent::Unintentional, Status::Success);
            }
        }
    }

    fn handle_link_dropped(&mut self, code: i32) {
        let current = self.tracker.current();
        if !Self::link_active(current) {
            debug!(peer = %self.peer, code, "Link drop ignored while disconnected");
            return;
        }

        let err = Error::UnexpectedDisconnect { code };
        warn!(peer = %self.peer, error = %err, state = ?current, "Link dropped");
        self.abandon_in_flight();
        let decision = self.consult_reconnect_policy(true);
        self.enter_disconnected(
            Intent::Unintentional,
            Self::failure_status(&err, TransportOperation::Connect),
            decision,
        );
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Connect(Ok(())) => {
                debug!(peer = %self.peer, "Link established");
                let target = transitions::link_established(self.tracker.current());
                self.apply(target, self.connect_intent, Status::Success);
                self.spawn_discover_services();
            }
            Completion::DiscoverServices(Ok(())) => {
                debug!(peer = %self.peer, "Services discovered");
                self.enter_phase(ConnectionPhase::Authenticate);
            }
            Completion::Connect(Err(err)) => {
                self.fail_sequence(Self::failure_status(&err, TransportOperation::Connect))
            }
            Completion::DiscoverServices(Err(err)) => self.fail_sequence(Self::failure_status(
                &err,
                TransportOperation::DiscoverServices,
            )),
            Completion::Transaction {
                phase,
                attempt,
                outcome,
            } => self.handle_transaction_outcome(phase, attempt, outcome),
        }
    }

    fn handle_transaction_outcome(
        &mut self,
        phase: TransactionPhase,
        attempt: u32,
        outcome: TransactionOutcome,
    ) {
        let connection_phase = ConnectionPhase::from_transaction_phase(phase);
        match outcome {
            TransactionOutcome::Succeeded => match connection_phase {
                Some(connection_phase) => {
                    debug!(peer = %self.peer, ?phase, "Transaction succeeded");
                    let target =
                        transitions::phase_succeeded(self.tracker.current(), connection_phase);
                    self.apply(target, self.connect_intent, Status::Success);
                }
                None => self.finish_firmware_update(Status::Success),
            },
            TransactionOutcome::Retry
                if attempt < self.config.lifecycle.transaction_retry_limit =>
            {
                debug!(peer = %self.peer, ?phase, attempt, "Transaction asked to be retried");
                self.start_transaction(phase, attempt + 1);
            }
            TransactionOutcome::Retry
            | TransactionOutcome::Failed
            | TransactionOutcome::Aborted => {
                warn!(peer = %self.peer, ?phase, ?outcome, attempt, "Transaction failed");
                let status = Status::TransactionFailure { phase };
                match connection_phase {
                    Some(_) => self.fail_sequence(status),
                    None => self.finish_firmware_update(status),
                }
            }
        }
    }

    fn handle_bond_completed(&mut self, token: u64, result: Result<()>) {
        if token != self.bond_token {
            trace!(peer = %self.peer, token, "Discarding stale bond result");
            return;
        }
        let (bond, status) = match result {
            Ok(()) => (BondState::Bonded, Status::Success),
            Err(err) => {
                warn!(peer = %self.peer, error = %err, "Bond request failed");
                (
                    BondState::Unbonded,
                    Self::failure_status(&err, TransportOperation::RequestBond),
                )
            }
        };
        let target = transitions::bond(self.tracker.current(), bond);
        self.apply(target, Intent::Intentional, status);
    }

    fn handle_reconnect_due(&mut self, token: u64) {
        if token != self.token || !self.tracker.is(DeviceState::AttemptingReconnect) {
            trace!(peer = %self.peer, token, "Discarding stale reconnect timer");
            return;
        }
        debug!(peer = %self.peer, "Reconnect delay elapsed");
        self.start_connect(Intent::Unintentional);
    }

    // --- Sequencing ---

    fn start_connect(&mut self, intent: Intent) {
        self.token += 1;
        self.connect_intent = intent;
        let target = transitions::begin_connect(self.tracker.current());
        self.apply(target, intent, Status::Success);

        let transport = self.transport.clone();
        let peer = self.peer.clone();
        let limit = self.config.lifecycle.connect_timeout;
        self.spawn_completion(async move {
            let result = bounded(limit, TransportOperation::Connect, transport.connect(&peer)).await;
            Completion::Connect(result)
        });
    }

    fn spawn_discover_services(&mut self) {
        let transport = self.transport.clone();
        let peer = self.peer.clone();
        let limit = self.config.lifecycle.discover_services_timeout;
        self.spawn_completion(async move {
            let result = bounded(
                limit,
                TransportOperation::DiscoverServices,
                transport.discover_services(&peer),
            )
            .await;
            Completion::DiscoverServices(result)
        });
    }

    /// Enters `phase`, running its transaction or passing straight through.
    ///
    /// 进入 `phase`：运行其事务或直接通过。
    fn enter_phase(&mut self, phase: ConnectionPhase) {
        let slot_filled = self.transaction_slot(phase.transaction_phase()).is_some();
        let step = resolve_phase(phase, slot_filled);
        let current = self.tracker.current();
        let target = match phase {
            ConnectionPhase::Authenticate => transitions::services_discovered(current, step),
            ConnectionPhase::Initialize => transitions::enter_phase(current, step),
        };

        self.apply(target, self.connect_intent, Status::Success);
        if let PhaseStep::Run { .. } = step {
            self.start_transaction(phase.transaction_phase(), 0);
        }
    }

    fn start_transaction(&mut self, phase: TransactionPhase, attempt: u32) {
        let (handle, outcome_rx) = TransactionHandle::new(self.peer.clone(), phase, attempt);
        debug!(peer = %self.peer, ?phase, attempt, "Starting transaction");
        match self.transaction_slot(phase) {
            Some(transaction) => transaction.start(handle),
            // The dropped handle resolves as aborted below.
            None => drop(handle),
        }

        self.spawn_completion(async move {
            let outcome = outcome_rx.await.unwrap_or(TransactionOutcome::Aborted);
            Completion::Transaction {
                phase,
                attempt,
                outcome,
            }
        });
    }

    fn finish_firmware_update(&mut self, status: Status) {
        self.firmware = None;
        let target = transitions::firmware_update(self.tracker.current(), false);
        self.apply(target, Intent::Intentional, status);
    }

    /// The single recovery action for every failure in the connect sequence.
    ///
    /// 连接序列中所有失败的唯一恢复动作。
    fn fail_sequence(&mut self, status: Status) {
        let current = self.tracker.current();
        warn!(peer = %self.peer, ?status, state = ?current, "Connection sequence failed");

        self.abandon_in_flight();
        // Only a failed reconnect attempt counts against the episode.
        let decision = self.consult_reconnect_policy(false);
        self.enter_disconnected(Intent::Unintentional, status, decision);
        if current.contains(DeviceState::Connected) {
            self.spawn_transport_disconnect();
        }
    }

    fn enter_disconnected(
        &mut self,
        intent: Intent,
        status: Status,
        decision: Option<ReconnectDecision>,
    ) {
        let retry_after = match decision {
            Some(ReconnectDecision::Delay(delay)) => Some(delay),
            Some(ReconnectDecision::Cancel) => {
                info!(peer = %self.peer, "Reconnect policy gave up");
                None
            }
            None => None,
        };
        if retry_after.is_none() {
            self.episode = None;
        }

        self.firmware = None;
        let target = transitions::disconnected(self.tracker.current(), retry_after.is_some());
        self.apply(target, intent, status);

        if let Some(delay) = retry_after {
            self.schedule_reconnect(delay);
        }
    }

    /// Asks the reconnect policy what to do. A new episode only starts on an
    /// unexpected disconnect; otherwise the failure counts against the
    /// running episode, if any.
    ///
    /// 询问重连策略。新的重连周期只在意外断开时开始；否则失败计入当前周期（如有）。
    fn consult_reconnect_policy(&mut self, start_episode: bool) -> Option<ReconnectDecision> {
        let policy = self.reconnect_policy.clone()?;
        let attempt = match self.episode.as_mut() {
            Some(episode) => episode.record_failure(),
            None if start_episode => self.episode.insert(ReconnectEpisode::new()).attempt(),
            None => return None,
        };
        let decision = policy.decide(&attempt);
        debug!(peer = %self.peer, ?attempt, ?decision, "Consulted reconnect policy");
        Some(decision)
    }

    fn schedule_reconnect(&mut self, delay: Duration) {
        let Ok(tx) = self.loopback() else {
            return;
        };
        let token = self.token;
        info!(peer = %self.peer, ?delay, "Scheduling reconnect");
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(PeerCommand::ReconnectDue { token }).await;
        });
        self.in_flight.push(timer.abort_handle());
    }

    // --- Self-observation ---

    fn apply(&mut self, target: StateSet<DeviceState>, intent: Intent, status: Status) {
        let diff = self.tracker.apply(target, intent, status);
        if diff.is_empty() {
            return;
        }
        debug!(
            peer = %self.peer,
            old = ?diff.old,
            new = ?diff.new,
            ?intent,
            ?status,
            "Peer state changed"
        );
        self.channels.state_tx.send_replace(diff.new);
        self.react(&diff);
    }

    /// Advances the sequence from the lifecycle's own transitions.
    ///
    /// 根据生命周期自身的状态转换推进序列。
    fn react(&mut self, diff: &StateDiff<DeviceState>) {
        for phase in [ConnectionPhase::Authenticate, ConnectionPhase::Initialize] {
            if diff.entered(phase.states().done) && diff.new.contains(DeviceState::Connected) {
                if let Some(next) = phase.next() {
                    self.enter_phase(next);
                }
            }
        }

        if diff.entered(DeviceState::Initialized) {
            if let Some(episode) = self.episode.take() {
                info!(peer = %self.peer, failures = episode.failure_count, "Reconnected");
            }
        }
    }

    // --- Helpers ---

    fn transaction_slot(&mut self, phase: TransactionPhase) -> Option<&mut Box<dyn Transaction>> {
        match phase {
            TransactionPhase::Authenticate => self.options.authentication.as_mut(),
            TransactionPhase::Initialize => self.options.initialization.as_mut(),
            TransactionPhase::UpdateFirmware => self.firmware.as_mut(),
        }
    }

    fn spawn_completion<F>(&mut self, work: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let Ok(tx) = self.loopback() else {
            return;
        };
        let token = self.token;
        let task = tokio::spawn(async move {
            let completion = work.await;
            let _ = tx.send(PeerCommand::Completed { token, completion }).await;
        });
        self.in_flight.retain(|handle| !handle.is_finished());
        self.in_flight.push(task.abort_handle());
    }

    fn spawn_transport_disconnect(&self) {
        let transport = self.transport.clone();
        let peer = self.peer.clone();
        tokio::spawn(async move {
            if let Err(err) = transport.disconnect(&peer).await {
                warn!(peer = %peer, error = %err, "Transport disconnect failed");
            }
        });
    }

    /// Abandons all in-flight work; late results will carry a stale token.
    ///
    /// 放弃所有进行中的工作；迟到的结果将携带过期的令牌。
    fn abandon_in_flight(&mut self) {
        self.cancel_in_flight();
        self.token += 1;
    }

    fn cancel_in_flight(&mut self) {
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
    }

    fn loopback(&self) -> Result<mpsc::Sender<PeerCommand>> {
        self.channels
            .loopback_tx
            .upgrade()
            .ok_or(Error::ChannelClosed)
    }

    fn link_active(state: StateSet<DeviceState>) -> bool {
        state.contains(DeviceState::Connected) || state.contains(DeviceState::ConnectingOverall)
    }

    fn failure_status(err: &Error, operation: TransportOperation) -> Status {
        err.status().unwrap_or(Status::TransportFailure {
            operation,
            code: UNKNOWN_STATUS_CODE,
        })
    }
}

/// Bounds a transport call by `limit`.
/// 以 `limit` 限制传输调用的时长。
async fn bounded<F>(limit: Duration, operation: TransportOperation, call: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(Error::Timeout { operation }))
}
