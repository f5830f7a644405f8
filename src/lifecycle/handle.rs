//! The user-facing handle to one tracked peer.

use super::command::{ConnectOptions, PeerCommand};
use crate::{
    error::{Error, Result},
    registry::PeerId,
    state::{DeviceState, StateSet},
    tracker::StateObserver,
    transaction::Transaction,
};
use tokio::sync::{mpsc, oneshot, watch};

/// A handle to a peer's actor.
///
/// Handles are cheap to clone. Requests return once the actor has accepted
/// them; progress is observed through [`PeerHandle::subscribe`],
/// [`PeerHandle::wait_for`] or a [`StateObserver`].
///
/// 外设 actor 的句柄。
///
/// 句柄的克隆开销很小。请求在 actor 接受后即返回；进度通过
/// [`PeerHandle::subscribe`]、[`PeerHandle::wait_for`] 或 [`StateObserver`] 观察。
#[derive(Debug, Clone)]
pub struct PeerHandle {
    peer: PeerId,
    command_tx: mpsc::Sender<PeerCommand>,
    state_rx: watch::Receiver<StateSet<DeviceState>>,
}

impl PeerHandle {
    pub(crate) fn new(
        peer: PeerId,
        command_tx: mpsc::Sender<PeerCommand>,
        state_rx: watch::Receiver<StateSet<DeviceState>>,
    ) -> Self {
        Self {
            peer,
            command_tx,
            state_rx,
        }
    }

    pub fn id(&self) -> &PeerId {
        &self.peer
    }

    /// The most recently published state set.
    /// 最近发布的状态集合。
    pub fn state(&self) -> StateSet<DeviceState> {
        *self.state_rx.borrow()
    }

    pub fn is(&self, state: DeviceState) -> bool {
        self.state().contains(state)
    }

    pub fn subscribe(&self) -> watch::Receiver<StateSet<DeviceState>> {
        self.state_rx.clone()
    }

    /// The single most relevant in-progress connection state, if any.
    /// 最相关的进行中连接状态（如有）。
    pub fn transitory_state(&self) -> Option<DeviceState> {
        DeviceState::transitory_connection_state(self.state())
    }

    /// Starts the connect sequence without transactions.
    ///
    /// 在没有事务的情况下开始连接序列。
    pub async fn connect(&self) -> Result<()> {
        self.connect_with(ConnectOptions::default()).await
    }

    /// Starts the connect sequence. A no-op while already connecting or
    /// connected.
    ///
    /// 开始连接序列。正在连接或已连接时不做任何事。
    pub async fn connect_with(&self, options: ConnectOptions) -> Result<()> {
        self.request(|response_tx| PeerCommand::Connect {
            options,
            response_tx,
        })
        .await
    }

    /// Disconnects and ends any reconnect episode.
    ///
    /// 断开连接并结束任何重连周期。
    pub async fn disconnect(&self) -> Result<()> {
        self.request(|response_tx| PeerCommand::Disconnect { response_tx })
            .await
    }

    pub async fn bond(&self) -> Result<()> {
        self.request(|response_tx| PeerCommand::Bond { response_tx })
            .await
    }

    /// Runs `transaction` as a firmware update. Only accepted while the
    /// peer is initialized and no other update is running.
    ///
    /// 将 `transaction` 作为固件更新运行。仅在外设已初始化且没有其他更新运行时接受。
    pub async fn update_firmware(&self, transaction: impl Transaction) -> Result<()> {
        self.request(|response_tx| PeerCommand::UpdateFirmware {
            transaction: Box::new(transaction),
            response_tx,
        })
        .await
    }

    /// Installs the peer's single observer, replacing any previous one.
    ///
    /// 安装外设唯一的观察者，替换之前的观察者。
    pub async fn set_observer(&self, observer: impl StateObserver<DeviceState> + 'static) -> Result<()> {
        self.send(PeerCommand::SetObserver(Box::new(observer))).await
    }

    pub async fn clear_observer(&self) -> Result<()> {
        self.send(PeerCommand::ClearObserver).await
    }

    /// Waits until the published state set contains `state`.
    ///
    /// 等待直到发布的状态集合包含 `state`。
    pub async fn wait_for(&self, state: DeviceState) -> Result<StateSet<DeviceState>> {
        self.wait_until(|set| set.contains(state)).await
    }

    /// Waits until `predicate` holds for the published state set.
    ///
    /// 等待直到发布的状态集合满足 `predicate`。
    pub async fn wait_until(
        &self,
        mut predicate: impl FnMut(StateSet<DeviceState>) -> bool,
    ) -> Result<StateSet<DeviceState>> {
        let mut state_rx = self.state_rx.clone();
        let set = state_rx
            .wait_for(|set| predicate(*set))
            .await
            .map_err(|_| self.undiscovered())?;
        Ok(*set)
    }

    async fn send(&self, command: PeerCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| self.undiscovered())
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<R>>) -> PeerCommand,
    ) -> Result<R> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(build(response_tx)).await?;
        response_rx.await.map_err(|_| self.undiscovered())?
    }

    fn undiscovered(&self) -> Error {
        Error::InvalidStateRequest {
            peer: self.peer.clone(),
            reason: "peer was undiscovered",
        }
    }
}
