//! 对链路层传输的抽象。
//! Abstraction over the link-level transport.
//!
//! 生命周期只通过此 trait 使用无线电。真实的驱动、GATT 表与广播都在此 crate 之外。
//!
//! The lifecycle only reaches the radio through this trait. Real drivers,
//! GATT tables and advertising live outside this crate.

use crate::{error::Result, registry::PeerId};
use async_trait::async_trait;

/// The transport calls the lifecycle makes.
///
/// 生命周期发起的传输调用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportOperation {
    Connect,
    Disconnect,
    DiscoverServices,
    RequestBond,
}

/// Native bond states reported by the transport.
///
/// 传输层报告的原生绑定状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BondState {
    Unbonded,
    Bonding,
    Bonded,
}

/// Events the transport raises on its own, outside any call the lifecycle
/// made.
///
/// 传输层自行产生的事件，不属于生命周期发起的任何调用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The link went down without being asked to.
    /// 链路在未被请求的情况下断开。
    LinkDropped { peer: PeerId, code: i32 },
    /// The native bond state changed.
    /// 原生绑定状态发生了变化。
    BondStateChanged { peer: PeerId, bond: BondState },
}

impl TransportEvent {
    pub fn peer(&self) -> &PeerId {
        match self {
            TransportEvent::LinkDropped { peer, .. }
            | TransportEvent::BondStateChanged { peer, .. } => peer,
        }
    }
}

/// An asynchronous link-level transport.
///
/// Each call resolves once the native stack reports a result. Failures are
/// returned as [`crate::error::Error::TransportFailure`] carrying the native
/// status code.
///
/// 异步链路层传输接口。
///
/// 每个调用在原生协议栈报告结果后完成。失败以携带原生状态码的
/// [`crate::error::Error::TransportFailure`] 返回。
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Establishes the link to `peer`.
    /// 建立到 `peer` 的链路。
    async fn connect(&self, peer: &PeerId) -> Result<()>;

    /// Tears the link down. The result is only an acknowledgement.
    /// 断开链路。结果只是一个确认。
    async fn disconnect(&self, peer: &PeerId) -> Result<()>;

    /// Discovers the peer's services over an established link.
    /// 在已建立的链路上发现外设的服务。
    async fn discover_services(&self, peer: &PeerId) -> Result<()>;

    /// Asks the native stack to bond with `peer`.
    /// 请求原生协议栈与 `peer` 绑定。
    async fn request_bond(&self, peer: &PeerId) -> Result<()>;
}
