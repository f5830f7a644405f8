//! 状态集合：以位掩码表示的非互斥状态。
//! State sets: non-exclusive states represented as a bitmask.
//!
//! 每个实体同时处于多个状态。每个状态枚举是一个封闭的、编译期已知的集合，
//! 状态的序号决定其位位置 (`1 << (ordinal + 1)`，保留第0位)。
//!
//! Every entity is in several states at once. Each state enumeration is a
//! closed set known at compile time, and a state's ordinal fixes its bit
//! position (`1 << (ordinal + 1)`, bit 0 is reserved).

mod device;
mod server;


pub use device::DeviceState;
pub use server::ServerState;

use std::{
    fmt,
    hash::Hash,
    marker::PhantomData,
    ops::{BitOr, Sub},
};

/// Computes the bit for an ordinal. Ordinals past 30 do not fit a `u32` mask
/// and fail const evaluation.
///
/// 根据序号计算位。超过30的序号无法放入 `u32` 掩码，常量求值时会失败。
pub(crate) const fn ordinal_bit(ordinal: u8) -> u32 {
    assert!(ordinal < 31, "state ordinal does not fit in a u32 mask");
    1 << (ordinal + 1)
}

/// A closed enumeration of named states for one kind of entity.
///
/// 某一类实体的封闭命名状态枚举。
pub trait State: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every state of the enumeration, in ordinal order.
    /// 枚举的所有状态，按序号排列。
    const VALUES: &'static [Self];

    /// States an idle entity may hold and still be eligible for purging.
    /// 空闲实体可以持有且仍可被清除的状态。
    const PURGEABLE: StateSet<Self>;

    /// The stable ordinal of this state.
    /// 此状态的稳定序号。
    fn ordinal(self) -> u8;

    /// The human readable name of this state.
    /// 此状态的可读名称。
    fn name(self) -> &'static str;

    /// The bit this state occupies in a [`StateSet`].
    fn bit(self) -> u32 {
        ordinal_bit(self.ordinal())
    }

    /// Whether this state is active in `set`.
    /// 此状态是否在 `set` 中处于活动状态。
    fn overlaps(self, set: StateSet<Self>) -> bool {
        set.bits() & self.bit() != 0
    }

    /// Whether this state became active going from `old` to `new`.
    /// 从 `old` 到 `new`，此状态是否被进入。
    fn was_entered(self, old: StateSet<Self>, new: StateSet<Self>) -> bool {
        !self.overlaps(old) && self.overlaps(new)
    }

    /// Reverse of [`State::was_entered`].
    /// [`State::was_entered`] 的反向操作。
    fn was_exited(self, old: StateSet<Self>, new: StateSet<Self>) -> bool {
        self.overlaps(old) && !self.overlaps(new)
    }

    /// A set with every defined state active.
    fn all() -> StateSet<Self> {
        StateSet::from_raw(Self::VALUES.iter().fold(0, |acc, s| acc | s.bit()))
    }
}

/// An immutable subset of the states of `S`.
///
/// 状态 `S` 的一个不可变子集。每次变更都会产生新的集合。
/// Every mutation produces a new set.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateSet<S> {
    bits: u32,
    _marker: PhantomData<fn() -> S>,
}

impl<S> StateSet<S> {
    /// Builds a set from raw bits without masking. Only used for const tables
    /// whose bits come from [`ordinal_bit`].
    ///
    /// 从原始位构建集合而不进行掩码处理，仅用于常量表。
    pub(crate) const fn from_raw(bits: u32) -> Self {
        Self {
            bits,
            _marker: PhantomData,
        }
    }

    /// The empty set.
    /// 空集合。
    pub const fn empty() -> Self {
        Self::from_raw(0)
    }

    /// The raw bitmask.
    /// 原始位掩码。
    pub const fn bits(self) -> u32 {
        self.bits
    }

    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Whether any bit of `other` is also set here.
    /// `other` 的任意位是否也在此集合中。
    pub const fn overlaps(self, other: Self) -> bool {
        self.bits & other.bits != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self::from_raw(self.bits | other.bits)
    }

    pub const fn difference(self, other: Self) -> Self {
        Self::from_raw(self.bits & !other.bits)
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self::from_raw(self.bits & other.bits)
    }

    /// The bits that differ between the two sets.
    /// 两个集合之间不同的位。
    pub const fn symmetric_difference(self, other: Self) -> Self {
        Self::from_raw(self.bits ^ other.bits)
    }

    /// Whether every active bit of this set is also active in `other`.
    /// 此集合中每个活动位是否也在 `other` 中活动。
    pub const fn is_subset_of(self, other: Self) -> bool {
        self.bits & !other.bits == 0
    }
}

impl<S: State> StateSet<S> {
    /// Builds a set from raw bits, dropping any bit that is not a defined state.
    ///
    /// 从原始位构建集合，丢弃任何未定义状态的位。
    pub fn from_bits(bits: u32) -> Self {
        Self::from_raw(bits & S::all().bits)
    }

    pub fn from_states(states: &[S]) -> Self {
        states.iter().copied().collect()
    }

    pub fn contains(self, state: S) -> bool {
        state.overlaps(self)
    }

    /// A copy of this set with `state` active.
    /// 激活 `state` 后的集合副本。
    pub fn with(self, state: S) -> Self {
        Self::from_raw(self.bits | state.bit())
    }

    /// A copy of this set with `state` inactive.
    /// 去除 `state` 后的集合副本。
    pub fn without(self, state: S) -> Self {
        Self::from_raw(self.bits & !state.bit())
    }

    /// A copy of this set with `state` set to `active`.
    pub fn with_if(self, state: S, active: bool) -> Self {
        if active {
            self.with(state)
        } else {
            self.without(state)
        }
    }

    /// Iterates the active states in ordinal order.
    /// 按序号顺序遍历活动状态。
    pub fn iter(self) -> impl Iterator<Item = S> {
        S::VALUES.iter().copied().filter(move |s| s.overlaps(self))
    }

    pub fn len(self) -> usize {
        self.bits.count_ones() as usize
    }
}

impl<S> Default for StateSet<S> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: State> From<S> for StateSet<S> {
    fn from(state: S) -> Self {
        Self::from_raw(state.bit())
    }
}

impl<S: State> FromIterator<S> for StateSet<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |set, state| set.with(state))
    }
}

impl<S> BitOr for StateSet<S> {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl<S: State> BitOr<S> for StateSet<S> {
    type Output = Self;

    fn bitor(self, rhs: S) -> Self {
        self.with(rhs)
    }
}

impl<S> Sub for StateSet<S> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.difference(rhs)
    }
}

impl<S: State> fmt::Debug for StateSet<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().map(|s| DebugName(s.name())))
            .finish()
    }
}

struct DebugName(&'static str);

impl fmt::Debug for DebugName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
