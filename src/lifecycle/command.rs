//! Commands sent to a peer actor.
//!
//! 发送到外设 actor 的命令。

use crate::{
    error::Result,
    state::DeviceState,
    tracker::StateObserver,
    transaction::{Transaction, TransactionOutcome, TransactionPhase},
    transport::TransportEvent,
};
use tokio::sync::oneshot;

/// The transactions gating the optional phases of one connect request.
///
/// 一次连接请求中把关可选阶段的事务。
#[derive(Default)]
pub struct ConnectOptions {
    pub(crate) authentication: Option<Box<dyn Transaction>>,
    pub(crate) initialization: Option<Box<dyn Transaction>>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `transaction` after services are discovered.
    /// 在服务发现之后运行 `transaction`。
    pub fn authenticate(mut self, transaction: impl Transaction) -> Self {
        self.authentication = Some(Box::new(transaction));
        self
    }

    /// Runs `transaction` once the peer is authenticated.
    /// 在外设认证之后运行 `transaction`。
    pub fn initialize(mut self, transaction: impl Transaction) -> Self {
        self.initialization = Some(Box::new(transaction));
        self
    }
}

impl std::fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("authentication", &self.authentication.is_some())
            .field("initialization", &self.initialization.is_some())
            .finish()
    }
}

/// The result of work that ran outside the actor.
///
/// 在 actor 之外运行的工作的结果。
#[derive(Debug)]
pub(crate) enum Completion {
    Connect(Result<()>),
    DiscoverServices(Result<()>),
    Transaction {
        phase: TransactionPhase,
        attempt: u32,
        outcome: TransactionOutcome,
    },
}

/// Commands sent to a peer's actor.
///
/// This enum carries both requests from [`super::PeerHandle`] and
/// completions from tasks the actor spawned.
///
/// 发送到外设 actor 的命令。
///
/// 此枚举既包含来自 [`super::PeerHandle`] 的请求，也包含 actor 派生任务的完成通知。
pub(crate) enum PeerCommand {
    Connect {
        options: ConnectOptions,
        response_tx: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        response_tx: oneshot::Sender<Result<()>>,
    },
    Bond {
        response_tx: oneshot::Sender<Result<()>>,
    },
    UpdateFirmware {
        transaction: Box<dyn Transaction>,
        response_tx: oneshot::Sender<Result<()>>,
    },
    SetObserver(Box<dyn StateObserver<DeviceState>>),
    ClearObserver,
    /// An out-of-band event raised by the transport.
    /// 传输层产生的带外事件。
    Transport(TransportEvent),
    /// Removes the peer for good. The actor stops after acknowledging.
    /// 永久移除外设。actor 在确认后停止。
    Undiscover { response_tx: oneshot::Sender<()> },
    /// Internal: work tagged with `token` finished.
    /// 内部命令：带有 `token` 标记的工作已完成。
    Completed { token: u64, completion: Completion },
    /// Internal: a bond request tagged with `token` finished.
    /// 内部命令：带有 `token` 标记的绑定请求已完成。
    BondCompleted { token: u64, result: Result<()> },
    /// Internal: the reconnect delay scheduled under `token` elapsed.
    /// 内部命令：在 `token` 下安排的重连延迟已到期。
    ReconnectDue { token: u64 },
}

impl std::fmt::Debug for PeerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerCommand::Connect { options, .. } => {
                f.debug_struct("Connect").field("options", options).finish()
            }
            PeerCommand::Disconnect { .. } => f.write_str("Disconnect"),
            PeerCommand::Bond { .. } => f.write_str("Bond"),
            PeerCommand::UpdateFirmware { .. } => f.write_str("UpdateFirmware"),
            PeerCommand::SetObserver(_) => f.write_str("SetObserver"),
            PeerCommand::ClearObserver => f.write_str("ClearObserver"),
            PeerCommand::Transport(event) => f.debug_tuple("Transport").field(event).finish(),
            PeerCommand::Undiscover { .. } => f.write_str("Undiscover"),
            PeerCommand::Completed { token, completion } => f
                .debug_struct("Completed")
                .field("token", token)
                .field("completion", completion)
                .finish(),
            PeerCommand::BondCompleted { token, result } => f
                .debug_struct("BondCompleted")
                .field("token", token)
                .field("result", result)
                .finish(),
            PeerCommand::ReconnectDue { token } => f
                .debug_struct("ReconnectDue")
                .field("token", token)
                .finish(),
        }
    }
}
