//! 连接序列的纯状态转换函数。
//! Pure state transition functions for the connect sequence.
//!
//! 每个函数接收当前集合并返回目标集合，`ConnectingOverall` 总是在最后重新计算。
//!
//! Each function takes the current set and returns the target set;
//! `ConnectingOverall` is always recomputed last.

use super::phase::{ConnectionPhase, PhaseStep};
use crate::{
    state::{DeviceState, StateSet},
    transport::BondState,
};

type DeviceSet = StateSet<DeviceState>;

/// Recomputes the derived `ConnectingOverall` flag.
/// 重新计算派生的 `ConnectingOverall` 标志。
pub(crate) fn normalize(set: DeviceSet) -> DeviceSet {
    set.with_if(
        DeviceState::ConnectingOverall,
        set.overlaps(DeviceState::CONNECTING_PHASES),
    )
}

/// Step 1: a connect attempt starts.
pub(crate) fn begin_connect(set: DeviceSet) -> DeviceSet {
    normalize(
        set.without(DeviceState::Disconnected)
            .without(DeviceState::AttemptingReconnect)
            .with(DeviceState::Connecting),
    )
}

/// Step 2: the link is up and service discovery starts.
pub(crate) fn link_established(set: DeviceSet) -> DeviceSet {
    normalize(
        set.without(DeviceState::Connecting)
            .without(DeviceState::Advertising)
            .with(DeviceState::Connected)
            .with(DeviceState::GettingServices),
    )
}

/// Step 3: services are known; the authentication phase is entered in the
/// same transition.
pub(crate) fn services_discovered(set: DeviceSet, auth: PhaseStep) -> DeviceSet {
    enter_phase(set.without(DeviceState::GettingServices), auth)
}

/// Enters a phase, either running it or passing straight through.
/// 进入一个阶段：运行它或直接通过。
pub(crate) fn enter_phase(set: DeviceSet, step: PhaseStep) -> DeviceSet {
    match step {
        PhaseStep::Run { active } => normalize(set.with(active)),
        PhaseStep::PassThrough { done } => normalize(set.with(done)),
    }
}

/// A phase's transaction succeeded.
/// 阶段事务成功。
pub(crate) fn phase_succeeded(set: DeviceSet, phase: ConnectionPhase) -> DeviceSet {
    let states = phase.states();
    normalize(set.without(states.active).with(states.done))
}

/// Any failure or disconnect: every connection-sequence bit is cleared and
/// the peer goes back to `Disconnected`.
///
/// 任何失败或断开：清除所有连接序列位，外设回到 `Disconnected`。
pub(crate) fn disconnected(set: DeviceSet, attempting_reconnect: bool) -> DeviceSet {
    normalize(
        set.difference(DeviceState::CONNECTION_SEQUENCE)
            .with(DeviceState::Disconnected)
            .with(DeviceState::Advertising)
            .with_if(DeviceState::AttemptingReconnect, attempting_reconnect),
    )
}

pub(crate) fn firmware_update(set: DeviceSet, running: bool) -> DeviceSet {
    set.with_if(DeviceState::UpdatingFirmware, running)
}

/// Applies a native bond state; exactly one bond sub-state stays active.
/// 应用原生绑定状态；恰好保留一个绑定子状态。
pub(crate) fn bond(set: DeviceSet, bond: BondState) -> DeviceSet {
    let state = match bond {
        BondState::Unbonded => DeviceState::Unbonded,
        BondState::Bonding => DeviceState::Bonding,
        BondState::Bonded => DeviceState::Bonded,
    };
    set.difference(DeviceState::BOND_STATES).with(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lifecycle::phase::resolve_phase, state::State};

    fn idle() -> DeviceSet {
        StateSet::from_states(&[
            DeviceState::Discovered,
            DeviceState::Advertising,
            DeviceState::Disconnected,
            DeviceState::Unbonded,
        ])
    }

    fn assert_overall_consistent(set: DeviceSet) {
        assert_eq!(
            set.contains(DeviceState::ConnectingOverall),
            set.overlaps(DeviceState::CONNECTING_PHASES),
            "inconsistent ConnectingOverall in {:?}",
            set
        );
    }

    /// Every state reachable through the sequence, for each slot combination.
    fn reachable_states(auth: bool, init: bool) -> Vec<DeviceSet> {
        let mut states = vec![idle()];
        let connecting = begin_connect(idle());
        let linked = link_established(connecting);
        let discovered =
            services_discovered(linked, resolve_phase(ConnectionPhase::Authenticate, auth));
        states.extend([connecting, linked, discovered]);

        let authenticated = if auth {
            phase_succeeded(discovered, ConnectionPhase::Authenticate)
        } else {
            discovered
        };
        let initializing =
            enter_phase(authenticated, resolve_phase(ConnectionPhase::Initialize, init));
        let initialized = if init {
            phase_succeeded(initializing, ConnectionPhase::Initialize)
        } else {
            initializing
        };
        states.extend([authenticated, initializing, initialized]);
        states.push(firmware_update(initialized, true));

        let mut with_failures = states.clone();
        for &s in &states {
            with_failures.push(disconnected(s, false));
            with_failures.push(disconnected(s, true));
            with_failures.push(bond(s, BondState::Bonding));
        }
        with_failures
    }

    #[test]
    fn test_connecting_overall_is_derived_everywhere() {
        for auth in [false, true] {
            for init in [false, true] {
                for state in reachable_states(auth, init) {
                    assert_overall_consistent(state);
                }
            }
        }
    }

    #[test]
    fn test_happy_path_without_transactions() {
        let connecting = begin_connect(idle());
        assert!(connecting.contains(DeviceState::Connecting));
        assert!(connecting.contains(DeviceState::ConnectingOverall));
        assert!(!connecting.contains(DeviceState::Disconnected));

        let linked = link_established(connecting);
        assert!(linked.contains(DeviceState::Connected));
        assert!(linked.contains(DeviceState::GettingServices));
        assert!(!linked.contains(DeviceState::Connecting));
        assert!(!linked.contains(DeviceState::Advertising));

        let discovered =
            services_discovered(linked, resolve_phase(ConnectionPhase::Authenticate, false));
        assert!(DeviceState::GettingServices.was_exited(linked, discovered));
        assert!(DeviceState::Authenticated.was_entered(linked, discovered));
        assert!(!discovered.contains(DeviceState::Authenticating));
        assert!(!discovered.contains(DeviceState::ConnectingOverall));
    }

    #[test]
    fn test_auth_phase_runs_when_supplied() {
        let linked = link_established(begin_connect(idle()));
        let discovered =
            services_discovered(linked, resolve_phase(ConnectionPhase::Authenticate, true));
        assert!(discovered.contains(DeviceState::Authenticating));
        assert!(!discovered.contains(DeviceState::Authenticated));
        assert!(discovered.contains(DeviceState::ConnectingOverall));

        let authenticated = phase_succeeded(discovered, ConnectionPhase::Authenticate);
        assert!(authenticated.contains(DeviceState::Authenticated));
        assert!(!authenticated.contains(DeviceState::Authenticating));
        assert!(!authenticated.contains(DeviceState::ConnectingOverall));
    }

    #[test]
    fn test_disconnect_leaves_no_partial_phase() {
        for auth in [false, true] {
            for init in [false, true] {
                for state in reachable_states(auth, init) {
                    for attempting in [false, true] {
                        let after = disconnected(state, attempting);
                        let sequence_bits = after.intersection(DeviceState::CONNECTION_SEQUENCE);
                        let expected = StateSet::from(DeviceState::Disconnected)
                            .with_if(DeviceState::AttemptingReconnect, attempting);
                        assert_eq!(sequence_bits, expected);
                        assert!(after.contains(DeviceState::Discovered));
                    }
                }
            }
        }
    }

    #[test]
    fn test_bond_keeps_one_sub_state() {
        let set = bond(idle(), BondState::Bonding);
        assert_eq!(
            set.intersection(DeviceState::BOND_STATES),
            StateSet::from(DeviceState::Bonding)
        );
        let set = bond(set, BondState::Bonded);
        assert_eq!(
            set.intersection(DeviceState::BOND_STATES),
            StateSet::from(DeviceState::Bonded)
        );
    }
}
