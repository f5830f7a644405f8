//! 可选事务阶段的表驱动解析。
//! Table-driven resolution of the optional transaction phases.
//!
//! 缺省的事务槽被视为自动通过：直接设置该阶段的完成状态，不进入活动状态。
//!
//! An empty transaction slot is an automatic pass-through: the phase's done
//! state is set directly and its active state is never entered.

use crate::{state::DeviceState, transaction::TransactionPhase};

/// The optional phases of the connect sequence, in order.
///
/// 连接序列中的可选阶段，按顺序排列。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionPhase {
    Authenticate,
    Initialize,
}

/// The states one phase moves through.
/// 一个阶段所经历的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PhaseStates {
    pub(crate) active: DeviceState,
    pub(crate) done: DeviceState,
}

/// What entering a phase does.
/// 进入一个阶段时执行的操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PhaseStep {
    /// Set `active` and start the transaction.
    /// 设置 `active` 并启动事务。
    Run { active: DeviceState },
    /// Set `done` directly.
    /// 直接设置 `done`。
    PassThrough { done: DeviceState },
}

impl ConnectionPhase {
    pub(crate) const fn states(self) -> PhaseStates {
        match self {
            ConnectionPhase::Authenticate => PhaseStates {
                active: DeviceState::Authenticating,
                done: DeviceState::Authenticated,
            },
            ConnectionPhase::Initialize => PhaseStates {
                active: DeviceState::Initializing,
                done: DeviceState::Initialized,
            },
        }
    }

    pub(crate) const fn transaction_phase(self) -> TransactionPhase {
        match self {
            ConnectionPhase::Authenticate => TransactionPhase::Authenticate,
            ConnectionPhase::Initialize => TransactionPhase::Initialize,
        }
    }

    pub(crate) fn from_transaction_phase(phase: TransactionPhase) -> Option<Self> {
        match phase {
            TransactionPhase::Authenticate => Some(ConnectionPhase::Authenticate),
            TransactionPhase::Initialize => Some(ConnectionPhase::Initialize),
            TransactionPhase::UpdateFirmware => None,
        }
    }

    /// The phase that follows this one once its done state is entered.
    /// 本阶段完成状态被进入后的下一个阶段。
    pub(crate) const fn next(self) -> Option<Self> {
        match self {
            ConnectionPhase::Authenticate => Some(ConnectionPhase::Initialize),
            ConnectionPhase::Initialize => None,
        }
    }
}

/// Resolves how to enter `phase` given whether its transaction slot is filled.
///
/// 根据事务槽是否已填充，决定如何进入 `phase`。
pub(crate) const fn resolve_phase(phase: ConnectionPhase, slot_filled: bool) -> PhaseStep {
    let states = phase.states();
    if slot_filled {
        PhaseStep::Run {
            active: states.active,
        }
    } else {
        PhaseStep::PassThrough { done: states.done }
    }
}
