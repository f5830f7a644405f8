//! 远端外设到本地主机的连接状态。
//! States of a remote peer's connection to a local host.

use super::{State, StateSet, ordinal_bit};

/// The states of one client connection as seen by a local host.
///
/// 本地主机看到的单个客户端连接的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServerState {
    Disconnected,
    /// The host lost the client and is trying to get it back.
    /// 主机失去了客户端，正在尝试恢复连接。
    RetryingConnection,
    Connecting,
    Connected,
}

impl ServerState {
    pub const ALL: [ServerState; 4] = [
        ServerState::Disconnected,
        ServerState::RetryingConnection,
        ServerState::Connecting,
        ServerState::Connected,
    ];

    pub const PURGEABLE_MASK: StateSet<ServerState> =
        StateSet::from_raw(ServerState::Disconnected.bit());

    pub const fn bit(self) -> u32 {
        ordinal_bit(self as u8)
    }
}

const _: () = {
    let mut i = 0;
    while i < ServerState::ALL.len() {
        assert!(ServerState::ALL[i] as usize == i);
        ordinal_bit(i as u8);
        i += 1;
    }
};

impl State for ServerState {
    const VALUES: &'static [Self] = &ServerState::ALL;
    const PURGEABLE: StateSet<Self> = ServerState::PURGEABLE_MASK;

    fn ordinal(self) -> u8 {
        self as u8
    }

    fn name(self) -> &'static str {
        match self {
            ServerState::Disconnected => "DISCONNECTED",
            ServerState::RetryingConnection => "RETRYING_CONNECTION",
            ServerState::Connecting => "CONNECTING",
            ServerState::Connected => "CONNECTED",
        }
    }
}
