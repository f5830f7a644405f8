//! 伴随状态变更通知的意图与状态码。
//! Intent and status codes that accompany state change notifications.

use crate::{transaction::TransactionPhase, transport::TransportOperation};

/// Who caused a state change. Carried along with the notification but never
/// stored in the state set.
///
/// 谁引起了状态变更。随通知一起传递，但从不存储在状态集合中。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// The caller asked for it.
    /// 调用方请求的。
    Intentional,
    /// The transport or the lifecycle did it on its own.
    /// 由传输层或生命周期自行完成。
    Unintentional,
}

/// Why a state change happened.
///
/// 状态变更发生的原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    /// A transport call was rejected with a native status code.
    /// 传输调用被拒绝，并带有原生状态码。
    TransportFailure {
        operation: TransportOperation,
        code: i32,
    },
    /// A transport call did not complete in time.
    /// 传输调用未能及时完成。
    Timeout { operation: TransportOperation },
    /// A caller transaction declined or was abandoned.
    /// 调用方事务拒绝或被放弃。
    TransactionFailure { phase: TransactionPhase },
    /// The link dropped without being asked to.
    /// 链路在未被请求的情况下断开。
    UnexpectedDisconnect { code: i32 },
    /// The caller asked to disconnect.
    /// 调用方请求断开连接。
    ExplicitDisconnect,
}
