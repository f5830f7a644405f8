//! 生命周期管理器：发现外设并为每个外设启动 actor。
//! The lifecycle manager: discovers peers and spawns one actor per peer.

use super::{
    actor::{ActorChannels, PeerActor},
    command::PeerCommand,
    handle::PeerHandle,
    transitions,
};
use crate::{
    config::Config,
    error::{Error, Result},
    reconnect::{ExponentialBackoff, ReconnectPolicy},
    registry::{PeerEntry, PeerId, PeerRegistry},
    state::{DeviceState, StateSet},
    transport::{BondState, Transport, TransportEvent},
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

/// Drives the connection lifecycle of every peer in a [`PeerRegistry`].
///
/// 驱动 [`PeerRegistry`] 中每个外设的连接生命周期。
pub struct ConnectionLifecycle<T: Transport> {
    transport: Arc<T>,
    registry: Arc<PeerRegistry>,
    config: Arc<Config>,
    reconnect_policy: Option<Arc<dyn ReconnectPolicy>>,
}

impl<T: Transport> std::fmt::Debug for ConnectionLifecycle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionLifecycle")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("reconnect", &self.reconnect_policy.is_some())
            .finish()
    }
}

impl<T: Transport> ConnectionLifecycle<T> {
    /// Creates a lifecycle that reconnects with [`ExponentialBackoff`] built
    /// from `config.reconnect`.
    ///
    /// 创建一个使用基于 `config.reconnect` 的 [`ExponentialBackoff`] 重连的生命周期。
    pub fn new(transport: Arc<T>, registry: Arc<PeerRegistry>, config: Config) -> Self {
        let backoff: Arc<dyn ReconnectPolicy> =
            Arc::new(ExponentialBackoff::new(config.reconnect.clone()));
        Self {
            transport,
            registry,
            config: Arc::new(config),
            reconnect_policy: Some(backoff),
        }
    }

    /// Replaces the reconnect policy for peers discovered from now on.
    ///
    /// 替换此后发现的外设所使用的重连策略。
    pub fn with_reconnect_policy(mut self, policy: impl ReconnectPolicy) -> Self {
        self.reconnect_policy = Some(Arc::new(policy));
        self
    }

    /// Peers discovered from now on never reconnect on their own.
    /// 此后发现的外设不会自行重连。
    pub fn without_reconnect(mut self) -> Self {
        self.reconnect_policy = None;
        self
    }

    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Starts tracking `peer` as a discovered, unbonded peer.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// 开始将 `peer` 作为已发现、未绑定的外设进行跟踪。必须在 Tokio 运行时中调用。
    pub fn discover(&self, peer: impl Into<PeerId>) -> Result<PeerHandle> {
        self.discover_with_bond(peer, BondState::Unbonded)
    }

    /// Starts tracking `peer` with the bond state the platform reports.
    ///
    /// 以平台报告的绑定状态开始跟踪 `peer`。
    pub fn discover_with_bond(&self, peer: impl Into<PeerId>, bond: BondState) -> Result<PeerHandle> {
        let peer = peer.into();
        let initial = transitions::bond(
            StateSet::from_states(&[
                DeviceState::Discovered,
                DeviceState::Advertising,
                DeviceState::Disconnected,
            ]),
            bond,
        );

        let (command_tx, command_rx) = mpsc::channel(self.config.lifecycle.command_channel_capacity);
        let (state_tx, state_rx) = watch::channel(initial);
        self.registry.insert(
            peer.clone(),
            PeerEntry {
                commands: command_tx.clone(),
                state: state_rx.clone(),
            },
        )?;

        let actor = PeerActor::new(
            peer.clone(),
            self.transport.clone(),
            self.config.clone(),
            self.reconnect_policy.clone(),
            initial,
            ActorChannels {
                command_rx,
                loopback_tx: command_tx.downgrade(),
                state_tx,
            },
        );
        tokio::spawn(actor.run());

        info!(peer = %peer, state = ?initial, "Peer discovered");
        Ok(PeerHandle::new(peer, command_tx, state_rx))
    }

    /// A new handle to an already tracked peer.
    /// 已跟踪外设的新句柄。
    pub fn peer(&self, peer: &PeerId) -> Result<PeerHandle> {
        let command_tx = self.registry.commands(peer)?;
        let state_rx = self.registry.subscribe(peer)?;
        Ok(PeerHandle::new(peer.clone(), command_tx, state_rx))
    }

    /// Stops tracking `peer`. Its state becomes exactly `{Undiscovered}` and
    /// every later request through an old handle is rejected.
    ///
    /// 停止跟踪 `peer`。其状态变为仅 `{Undiscovered}`，之后通过旧句柄的请求都会被拒绝。
    pub async fn undiscover(&self, peer: &PeerId) -> Result<()> {
        let entry = self
            .registry
            .remove(peer)
            .ok_or_else(|| Error::UnknownPeer(peer.clone()))?;

        let (response_tx, response_rx) = oneshot::channel();
        if entry
            .commands
            .send(PeerCommand::Undiscover { response_tx })
            .await
            .is_ok()
        {
            let _ = response_rx.await;
        }
        Ok(())
    }

    /// Undiscovers every peer the registry's purge policy allows, returning
    /// the purged ids.
    ///
    /// 移除注册表清理策略允许的所有外设，返回被清理的标识。
    pub async fn purge_idle(&self) -> Vec<PeerId> {
        let mut purged = Vec::new();
        for peer in self.registry.purgeable_peers() {
            // Re-check: the peer may have started connecting meanwhile.
            if !self.registry.is_purgeable(&peer).unwrap_or(false) {
                continue;
            }
            if self.undiscover(&peer).await.is_ok() {
                purged.push(peer);
            }
        }
        debug!(count = purged.len(), "Purged idle peers");
        purged
    }

    /// Routes an out-of-band transport event to its peer's actor.
    ///
    /// 将带外传输事件路由到对应外设的 actor。
    pub async fn handle_transport_event(&self, event: TransportEvent) -> Result<()> {
        let command_tx = self.registry.commands(event.peer())?;
        command_tx
            .send(PeerCommand::Transport(event))
            .await
            .map_err(|_| Error::ChannelClosed)
    }
}
