//! 被跟踪外设的注册表。
//! The registry of tracked peers.
//!
//! 注册表是一个显式值，由调用方创建并注入 [`crate::lifecycle::ConnectionLifecycle`]。
//! 它只提供对当前状态集合的只读视图；写入由每个外设自己的 actor 完成。
//!
//! The registry is an explicit value created by the caller and injected into
//! [`crate::lifecycle::ConnectionLifecycle`]. It only offers read-only views
//! over current state sets; writes happen inside each peer's own actor.

use crate::{
    error::{Error, Result},
    lifecycle::PeerCommand,
    purge::PurgePolicy,
    state::{DeviceState, StateSet},
};
use dashmap::{DashMap, mapref::entry::Entry};
use std::{fmt, sync::Arc};
use tokio::sync::{mpsc, watch};

/// Identifies a peer, typically by its hardware address.
///
/// 标识一个外设，通常是其硬件地址。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(Arc<str>);

impl PeerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(Arc::from(id))
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the registry keeps for each peer.
///
/// 注册表为每个外设保存的内容。
#[derive(Debug)]
pub(crate) struct PeerEntry {
    /// The channel sender to the peer's actor task.
    /// 到外设 actor 任务的通道发送端。
    pub(crate) commands: mpsc::Sender<PeerCommand>,
    /// The latest state set published by the actor.
    /// actor 发布的最新状态集合。
    pub(crate) state: watch::Receiver<StateSet<DeviceState>>,
}

/// Tracks every discovered peer.
///
/// 跟踪所有已发现的外设。
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: DashMap<PeerId, PeerEntry>,
    purge_policy: PurgePolicy<DeviceState>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_purge_policy(purge_policy: PurgePolicy<DeviceState>) -> Self {
        Self {
            peers: DashMap::new(),
            purge_policy,
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.peers.contains_key(peer)
    }

    /// All tracked peers, in no particular order.
    /// 所有被跟踪的外设，无特定顺序。
    pub fn peers(&self) -> Vec<PeerId> {
        self.peers.iter().map(|entry| entry.key().clone()).collect()
    }

    /// The current state set of `peer`.
    /// `peer` 的当前状态集合。
    pub fn state(&self, peer: &PeerId) -> Result<StateSet<DeviceState>> {
        self.peers
            .get(peer)
            .map(|entry| *entry.state.borrow())
            .ok_or_else(|| Error::UnknownPeer(peer.clone()))
    }

    /// A receiver that observes every published state set of `peer`.
    /// 观察 `peer` 每次发布的状态集合的接收端。
    pub fn subscribe(&self, peer: &PeerId) -> Result<watch::Receiver<StateSet<DeviceState>>> {
        self.peers
            .get(peer)
            .map(|entry| entry.state.clone())
            .ok_or_else(|| Error::UnknownPeer(peer.clone()))
    }

    pub fn is_purgeable(&self, peer: &PeerId) -> Result<bool> {
        self.state(peer)
            .map(|state| self.purge_policy.is_purgeable(state))
    }

    pub fn transitory_state(&self, peer: &PeerId) -> Result<Option<DeviceState>> {
        self.state(peer)
            .map(DeviceState::transitory_connection_state)
    }

    /// Peers with no connection activity in progress.
    /// 没有进行中连接活动的外设。
    pub fn purgeable_peers(&self) -> Vec<PeerId> {
        self.peers
            .iter()
            .filter(|entry| self.purge_policy.is_purgeable(*entry.state.borrow()))
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub(crate) fn insert(&self, peer: PeerId, entry: PeerEntry) -> Result<()> {
        match self.peers.entry(peer) {
            Entry::Occupied(occupied) => Err(Error::AlreadyDiscovered(occupied.key().clone())),
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                Ok(())
            }
        }
    }

    pub(crate) fn remove(&self, peer: &PeerId) -> Option<PeerEntry> {
        self.peers.remove(peer).map(|(_, entry)| entry)
    }

    pub(crate) fn commands(&self, peer: &PeerId) -> Result<mpsc::Sender<PeerCommand>> {
        self.peers
            .get(peer)
            .map(|entry| entry.commands.clone())
            .ok_or_else(|| Error::UnknownPeer(peer.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(state: StateSet<DeviceState>) -> (PeerEntry, watch::Sender<StateSet<DeviceState>>) {
        let (commands, _rx) = mpsc::channel(1);
        let (state_tx, state) = watch::channel(state);
        (PeerEntry { commands, state }, state_tx)
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let registry = PeerRegistry::new();
        let peer = PeerId::from("11:22:33:44:55:66");
        let (first, _tx1) = entry(StateSet::empty());
        let (second, _tx2) = entry(StateSet::empty());

        assert!(registry.insert(peer.clone(), first).is_ok());
        assert!(matches!(
            registry.insert(peer.clone(), second),
            Err(Error::AlreadyDiscovered(_))
        ));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&peer).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_read_only_views_follow_published_state() {
        let registry = PeerRegistry::new();
        let peer = PeerId::from("AA");
        let (peer_entry, state_tx) = entry(StateSet::from_states(&[
            DeviceState::Discovered,
            DeviceState::Unbonded,
        ]));
        registry.insert(peer.clone(), peer_entry).unwrap();

        assert!(registry.is_purgeable(&peer).unwrap());
        assert_eq!(registry.transitory_state(&peer).unwrap(), None);
        assert_eq!(registry.purgeable_peers(), vec![peer.clone()]);

        state_tx.send_replace(StateSet::from_states(&[
            DeviceState::Discovered,
            DeviceState::ConnectingOverall,
            DeviceState::Connecting,
        ]));

        assert!(!registry.is_purgeable(&peer).unwrap());
        assert_eq!(
            registry.transitory_state(&peer).unwrap(),
            Some(DeviceState::Connecting)
        );
        assert!(registry.purgeable_peers().is_empty());
    }

    #[test]
    fn test_unknown_peer() {
        let registry = PeerRegistry::new();
        let peer = PeerId::from("missing");
        assert!(matches!(registry.state(&peer), Err(Error::UnknownPeer(_))));
        assert!(matches!(registry.is_purgeable(&peer), Err(Error::UnknownPeer(_))));
        assert!(registry.commands(&peer).is_err());
    }
}
