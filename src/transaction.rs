//! 调用方提供的异步工作单元，用于把关生命周期阶段。
//! Caller-supplied asynchronous units of work that gate lifecycle phases.
//!
//! 事务通过 [`TransactionHandle`] 报告结果。句柄的方法会消耗句柄本身，
//! 因此每个事务最多只能报告一个结果；未报告结果就丢弃句柄视为失败。
//!
//! A transaction reports back through its [`TransactionHandle`]. The
//! handle's methods consume it, so a transaction can report at most one
//! outcome; dropping the handle without reporting counts as a failure.

use crate::{error::Result, registry::PeerId};
use std::future::Future;
use tokio::sync::oneshot;

/// The lifecycle phase a transaction gates.
///
/// 事务所把关的生命周期阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionPhase {
    Authenticate,
    Initialize,
    UpdateFirmware,
}

/// How a transaction ended.
///
/// 事务的结束方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Succeeded,
    Failed,
    /// The transaction wants to be started again from scratch.
    /// 事务希望从头重新开始。
    Retry,
    /// The handle was dropped without an outcome.
    /// 句柄在没有结果的情况下被丢弃。
    Aborted,
}

/// Passed to [`Transaction::start`]; report the outcome through it.
///
/// 传递给 [`Transaction::start`]；通过它报告结果。
#[derive(Debug)]
pub struct TransactionHandle {
    peer: PeerId,
    phase: TransactionPhase,
    attempt: u32,
    completion: oneshot::Sender<TransactionOutcome>,
}

impl TransactionHandle {
    pub(crate) fn new(
        peer: PeerId,
        phase: TransactionPhase,
        attempt: u32,
    ) -> (Self, oneshot::Receiver<TransactionOutcome>) {
        let (completion, rx) = oneshot::channel();
        let handle = Self {
            peer,
            phase,
            attempt,
            completion,
        };
        (handle, rx)
    }

    pub fn peer(&self) -> &PeerId {
        &self.peer
    }

    pub fn phase(&self) -> TransactionPhase {
        self.phase
    }

    /// Zero for the first run, incremented on every retry.
    /// 首次运行为零，每次重试加一。
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Whether the lifecycle has stopped waiting for this transaction, e.g.
    /// because the peer disconnected.
    ///
    /// 生命周期是否已停止等待此事务，例如外设已断开。
    pub fn is_abandoned(&self) -> bool {
        self.completion.is_closed()
    }

    pub fn succeed(self) {
        self.finish(TransactionOutcome::Succeeded);
    }

    pub fn fail(self) {
        self.finish(TransactionOutcome::Failed);
    }

    pub fn retry(self) {
        self.finish(TransactionOutcome::Retry);
    }

    fn finish(self, outcome: TransactionOutcome) {
        // The receiver is gone once the lifecycle has moved on; nothing to do.
        let _ = self.completion.send(outcome);
    }
}

/// A unit of work that gates one lifecycle phase.
///
/// 把关一个生命周期阶段的工作单元。
pub trait Transaction: Send + 'static {
    /// Starts the work. Must not block: spawn anything long-running and
    /// report through `handle` when done.
    ///
    /// 开始工作。不得阻塞：长时间运行的工作应另行派生，完成后通过 `handle` 报告。
    fn start(&mut self, handle: TransactionHandle);
}

impl<F> Transaction for F
where
    F: FnMut(TransactionHandle) + Send + 'static,
{
    fn start(&mut self, handle: TransactionHandle) {
        self(handle)
    }
}

/// Builds a transaction from an async function. The future runs on its own
/// task; `Ok` succeeds the transaction and `Err` fails it.
///
/// 从异步函数构建事务。future 在独立任务上运行；`Ok` 表示成功，`Err` 表示失败。
pub fn from_async<F, Fut>(mut f: F) -> impl Transaction
where
    F: FnMut(PeerId) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    move |handle: TransactionHandle| {
        let work = f(handle.peer().clone());
        tokio::spawn(async move {
            match work.await {
                Ok(()) => handle.succeed(),
                Err(_) => handle.fail(),
            }
        });
    }
}
