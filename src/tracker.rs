//! 单个实体的当前状态集合持有者。
//! Holder of one entity's current state set.
//!
//! 跟踪器替换当前集合，计算 `(old, new, changed)` 差异，并通知唯一的观察者。
//! 跟踪器本身不做任何同步，调用方必须串行化对同一实体的访问。
//!
//! The tracker replaces the current set, computes the `(old, new, changed)`
//! diff and notifies its single observer. It performs no synchronization of
//! its own; callers must serialize access for one entity.

use crate::{
    state::{State, StateSet},
    status::{Intent, Status},
};
use tracing::trace;

/// The result of applying a new state set.
///
/// 应用新状态集合的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateDiff<S: State> {
    pub old: StateSet<S>,
    pub new: StateSet<S>,
    /// Bits that differ between `old` and `new`.
    /// `old` 与 `new` 之间不同的位。
    pub changed: StateSet<S>,
}

impl<S: State> StateDiff<S> {
    pub fn between(old: StateSet<S>, new: StateSet<S>) -> Self {
        Self {
            old,
            new,
            changed: old.symmetric_difference(new),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn entered(&self, state: S) -> bool {
        state.was_entered(self.old, self.new)
    }

    pub fn exited(&self, state: S) -> bool {
        state.was_exited(self.old, self.new)
    }
}

/// What an observer receives for every applied change.
///
/// 观察者在每次应用变更时收到的内容。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateEvent<S: State> {
    pub old: StateSet<S>,
    pub new: StateSet<S>,
    pub intent: Intent,
    pub status: Status,
}

impl<S: State> StateEvent<S> {
    pub fn did_enter(&self, state: S) -> bool {
        state.was_entered(self.old, self.new)
    }

    pub fn did_exit(&self, state: S) -> bool {
        state.was_exited(self.old, self.new)
    }

    pub fn changed(&self) -> StateSet<S> {
        self.old.symmetric_difference(self.new)
    }
}

/// Receives state change notifications for one entity. Runs inline with the
/// mutation, so implementations should hand long work off elsewhere.
///
/// 接收单个实体的状态变更通知。与变更同步执行，耗时工作应转交给其他执行上下文。
pub trait StateObserver<S: State>: Send {
    fn on_state_change(&mut self, event: &StateEvent<S>);
}

impl<S, F> StateObserver<S> for F
where
    S: State,
    F: FnMut(&StateEvent<S>) + Send,
{
    fn on_state_change(&mut self, event: &StateEvent<S>) {
        self(event)
    }
}

/// Mutable holder of one entity's [`StateSet`].
///
/// 单个实体 [`StateSet`] 的可变持有者。
pub struct StateTracker<S: State> {
    current: StateSet<S>,
    observer: Option<Box<dyn StateObserver<S>>>,
}

impl<S: State> std::fmt::Debug for StateTracker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTracker")
            .field("current", &self.current)
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

impl<S: State> StateTracker<S> {
    pub fn new(initial: StateSet<S>) -> Self {
        Self {
            current: initial,
            observer: None,
        }
    }

    pub fn current(&self) -> StateSet<S> {
        self.current
    }

    pub fn is(&self, state: S) -> bool {
        self.current.contains(state)
    }

    /// Registers the observer, replacing any previous one.
    /// 注册观察者，替换之前的观察者。
    pub fn set_observer(&mut self, observer: Box<dyn StateObserver<S>>) {
        self.observer = Some(observer);
    }

    /// Removes the observer. Calling this without one registered is fine.
    /// 移除观察者。未注册时调用也没有问题。
    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Replaces the current set and notifies the observer if anything changed.
    ///
    /// 替换当前集合，如有变化则通知观察者。
    pub fn apply(&mut self, new: StateSet<S>, intent: Intent, status: Status) -> StateDiff<S> {
        self.apply_inner(new, intent, status, false)
    }

    /// Like [`StateTracker::apply`], but notifies even when nothing changed.
    ///
    /// 与 [`StateTracker::apply`] 相同，但即使没有变化也会通知。
    pub fn apply_forced(
        &mut self,
        new: StateSet<S>,
        intent: Intent,
        status: Status,
    ) -> StateDiff<S> {
        self.apply_inner(new, intent, status, true)
    }

    /// Adds `add`, then removes `remove`, from the current set and applies
    /// the result.
    ///
    /// 在当前集合上添加 `add`、移除 `remove`，然后应用结果。
    pub fn update(
        &mut self,
        add: StateSet<S>,
        remove: StateSet<S>,
        intent: Intent,
        status: Status,
    ) -> StateDiff<S> {
        let new = self.current.union(add).difference(remove);
        self.apply(new, intent, status)
    }

    fn apply_inner(
        &mut self,
        new: StateSet<S>,
        intent: Intent,
        status: Status,
        forced: bool,
    ) -> StateDiff<S> {
        let diff = StateDiff::between(self.current, new);
        self.current = new;

        if diff.is_empty() && !forced {
            return diff;
        }

        trace!(old = ?diff.old, new = ?diff.new, ?intent, ?status, "state applied");

        if let Some(observer) = self.observer.as_mut() {
            observer.on_state_change(&StateEvent {
                old: diff.old,
                new: diff.new,
                intent,
                status,
            });
        }

        diff
    }
}
