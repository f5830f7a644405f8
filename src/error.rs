//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use crate::{
    registry::PeerId,
    status::Status,
    transaction::TransactionPhase,
    transport::TransportOperation,
};
use thiserror::Error;

/// The primary error type for the peer lifecycle library.
/// 外设生命周期库的主要错误类型。
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The transport rejected a connect, discover or bond call.
    /// 传输层拒绝了连接、发现或绑定调用。
    #[error("transport {operation:?} failed with status {code}")]
    TransportFailure {
        operation: TransportOperation,
        code: i32,
    },

    /// A transport call did not complete within its configured timeout.
    /// 传输调用未在配置的超时时间内完成。
    #[error("transport {operation:?} timed out")]
    Timeout { operation: TransportOperation },

    /// A caller-supplied transaction declined or was abandoned.
    /// 调用方提供的事务拒绝或被放弃。
    #[error("{phase:?} transaction failed")]
    TransactionFailure { phase: TransactionPhase },

    /// The link was dropped by the transport.
    /// 链路被传输层断开。
    #[error("link dropped unexpectedly with status {code}")]
    UnexpectedDisconnect { code: i32 },

    /// The request does not make sense in the peer's current state.
    /// 请求在外设的当前状态下没有意义。
    #[error("invalid request for peer {peer}: {reason}")]
    InvalidStateRequest { peer: PeerId, reason: &'static str },

    /// The peer is not tracked by the registry.
    /// 注册表未跟踪该外设。
    #[error("peer {0} is not tracked")]
    UnknownPeer(PeerId),

    /// The peer is already tracked by the registry.
    /// 注册表已经在跟踪该外设。
    #[error("peer {0} is already tracked")]
    AlreadyDiscovered(PeerId),

    /// An internal channel for communication between tasks was closed unexpectedly.
    /// 用于任务间通信的内部通道意外关闭。
    #[error("Internal channel is broken")]
    ChannelClosed,
}

impl Error {
    /// The status that accompanies the transition this error causes, if it
    /// causes one at all.
    ///
    /// 该错误引起的状态转换所附带的状态码（如果有的话）。
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::TransportFailure { operation, code } => Some(Status::TransportFailure {
                operation: *operation,
                code: *code,
            }),
            Error::Timeout { operation } => Some(Status::Timeout {
                operation: *operation,
            }),
            Error::TransactionFailure { phase } => {
                Some(Status::TransactionFailure { phase: *phase })
            }
            Error::UnexpectedDisconnect { code } => {
                Some(Status::UnexpectedDisconnect { code: *code })
            }
            Error::InvalidStateRequest { .. }
            | Error::UnknownPeer(_)
            | Error::AlreadyDiscovered(_)
            | Error::ChannelClosed => None,
        }
    }
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
