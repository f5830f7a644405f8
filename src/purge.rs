//! 判断空闲实体记录是否可以从跟踪集合中移除。
//! Decides whether an idle entity record may be removed from the tracked set.

use crate::state::{State, StateSet};

/// An entity is purgeable when every active state lies inside the policy's
/// mask, i.e. no connection activity is in progress.
///
/// 当所有活动状态都在策略掩码之内（即没有进行中的连接活动）时，实体可被清除。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgePolicy<S: State> {
    mask: StateSet<S>,
}

impl<S: State> PurgePolicy<S> {
    pub fn with_mask(mask: StateSet<S>) -> Self {
        Self { mask }
    }

    pub fn mask(&self) -> StateSet<S> {
        self.mask
    }

    pub fn is_purgeable(&self, set: StateSet<S>) -> bool {
        set.is_subset_of(self.mask)
    }
}

impl<S: State> Default for PurgePolicy<S> {
    fn default() -> Self {
        Self::with_mask(S::PURGEABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DeviceState, ServerState};

    #[test]
    fn test_debug_shows_mask() {
        let policy = PurgePolicy::<ServerState>::default();
        assert_eq!(format!("{:?}", policy), "PurgePolicy { mask: {DISCONNECTED} }");
    }

    #[test]
    fn test_idle_device_is_purgeable() {
        let policy = PurgePolicy::<DeviceState>::default();
        assert!(policy.is_purgeable(StateSet::from_states(&[
            DeviceState::Discovered,
            DeviceState::Unbonded
        ])));
        assert!(policy.is_purgeable(StateSet::from_states(&[
            DeviceState::Discovered,
            DeviceState::Disconnected,
            DeviceState::Advertising,
            DeviceState::Bonded,
        ])));
        assert!(policy.is_purgeable(StateSet::empty()));
    }

    #[test]
    fn test_connection_activity_blocks_purge() {
        let policy = PurgePolicy::<DeviceState>::default();
        assert!(!policy.is_purgeable(StateSet::from_states(&[
            DeviceState::Discovered,
            DeviceState::Connecting
        ])));
        assert!(!policy.is_purgeable(StateSet::from_states(&[
            DeviceState::Discovered,
            DeviceState::Disconnected,
            DeviceState::AttemptingReconnect,
        ])));
        assert!(!policy.is_purgeable(StateSet::from_states(&[
            DeviceState::Connected,
            DeviceState::Initialized
        ])));
    }

    #[test]
    fn test_custom_mask() {
        let policy = PurgePolicy::with_mask(StateSet::from_states(&[
            ServerState::Disconnected,
            ServerState::RetryingConnection,
        ]));
        assert!(policy.is_purgeable(ServerState::RetryingConnection.into()));
        assert!(!PurgePolicy::<ServerState>::default()
            .is_purgeable(ServerState::RetryingConnection.into()));
    }
}
