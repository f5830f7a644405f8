#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the peer connection lifecycle library.
//! 外设连接生命周期库的根。
//!
//! A peer's condition is a [`state::StateSet`] of simultaneously active
//! states. A [`lifecycle::ConnectionLifecycle`] drives each discovered peer
//! through connect, service discovery, authentication and initialization,
//! and decides through a [`reconnect::ReconnectPolicy`] what happens after
//! an unexpected disconnect.
//!
//! 外设的状况是一个由同时活跃的状态组成的 [`state::StateSet`]。
//! [`lifecycle::ConnectionLifecycle`] 驱动每个已发现的外设依次完成连接、服务发现、
//! 认证和初始化，并通过 [`reconnect::ReconnectPolicy`] 决定意外断开后的行为。

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod purge;
pub mod reconnect;
pub mod registry;
pub mod state;
pub mod status;
pub mod tracker;
pub mod transaction;
pub mod transport;

mod testing;

pub use config::Config;
pub use error::{Error, Result};
pub use lifecycle::{ConnectOptions, ConnectionLifecycle, PeerHandle};
pub use registry::{PeerId, PeerRegistry};
pub use state::{DeviceState, ServerState, State, StateSet};
