//! 远端外设的状态。
//! States of a remote peer device.

use super::{State, StateSet, ordinal_bit};

/// The states a peer device can be in. A device is usually in several of
/// them at once.
///
/// 外设可能处于的状态。设备通常同时处于其中多个状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeviceState {
    /// The registry has dropped the device. Terminal.
    /// 注册表已丢弃该设备。终止状态。
    Undiscovered,
    /// An implicit disconnect happened and the reconnect policy asked for
    /// another attempt after a delay.
    ///
    /// 发生了隐式断开，重连策略要求在延迟后再次尝试。
    AttemptingReconnect,
    /// Active for as long as the device is tracked.
    /// 设备被跟踪期间始终处于活动状态。
    Discovered,
    /// Assumed to be advertising while not connected.
    /// 未连接时假定正在广播。
    Advertising,
    /// Active whenever [`DeviceState::Connected`] is not.
    Disconnected,
    Unbonded,
    Bonding,
    Bonded,
    /// Derived: active while any of `Connecting`, `GettingServices`,
    /// `Authenticating` or `Initializing` is active. Never set on its own.
    ///
    /// 派生状态：当 `Connecting`、`GettingServices`、`Authenticating` 或
    /// `Initializing` 任一处于活动状态时激活。从不单独设置。
    ConnectingOverall,
    /// The link-level connection is being established.
    /// 正在建立链路层连接。
    Connecting,
    /// The link is up. Services may still be pending, so `Initialized` is the
    /// state to wait for before using the device.
    ///
    /// 链路已建立。服务可能仍未就绪，因此使用设备前应等待 `Initialized`。
    Connected,
    GettingServices,
    /// Only entered when an authentication transaction was supplied.
    /// 仅在提供了认证事务时进入。
    Authenticating,
    /// Set by a successful authentication transaction, or directly when none
    /// was supplied.
    ///
    /// 由成功的认证事务设置，未提供认证事务时直接设置。
    Authenticated,
    /// Only entered when an initialization transaction was supplied.
    /// 仅在提供了初始化事务时进入。
    Initializing,
    /// The device is fully connected and ready.
    /// 设备已完全连接并就绪。
    Initialized,
    /// A firmware update transaction is running.
    /// 固件更新事务正在运行。
    UpdatingFirmware,
}

impl DeviceState {
    /// All states in ordinal order. The position of each variant in this
    /// table must match its discriminant, checked below at compile time.
    ///
    /// 按序号排列的所有状态。
    pub const ALL: [DeviceState; 17] = [
        DeviceState::Undiscovered,
        DeviceState::AttemptingReconnect,
        DeviceState::Discovered,
        DeviceState::Advertising,
        DeviceState::Disconnected,
        DeviceState::Unbonded,
        DeviceState::Bonding,
        DeviceState::Bonded,
        DeviceState::ConnectingOverall,
        DeviceState::Connecting,
        DeviceState::Connected,
        DeviceState::GettingServices,
        DeviceState::Authenticating,
        DeviceState::Authenticated,
        DeviceState::Initializing,
        DeviceState::Initialized,
        DeviceState::UpdatingFirmware,
    ];

    /// States an entity can hold while no connection activity is in progress.
    /// 没有连接活动时实体可以持有的状态。
    pub const PURGEABLE_MASK: StateSet<DeviceState> = StateSet::from_raw(
        DeviceState::Discovered.bit()
            | DeviceState::Disconnected.bit()
            | DeviceState::Unbonded.bit()
            | DeviceState::Bonding.bit()
            | DeviceState::Bonded.bit()
            | DeviceState::Advertising.bit(),
    );

    /// The sub-phases whose union defines `ConnectingOverall`.
    /// 其并集定义 `ConnectingOverall` 的子阶段。
    pub const CONNECTING_PHASES: StateSet<DeviceState> = StateSet::from_raw(
        DeviceState::Connecting.bit()
            | DeviceState::GettingServices.bit()
            | DeviceState::Authenticating.bit()
            | DeviceState::Initializing.bit(),
    );

    /// Every bit owned by the connection sequence. A disconnect clears all of
    /// them before setting `Disconnected`.
    ///
    /// 连接序列拥有的所有位。断开连接时先清除它们，再设置 `Disconnected`。
    pub const CONNECTION_SEQUENCE: StateSet<DeviceState> = StateSet::from_raw(
        DeviceState::AttemptingReconnect.bit()
            | DeviceState::Disconnected.bit()
            | DeviceState::ConnectingOverall.bit()
            | DeviceState::Connecting.bit()
            | DeviceState::Connected.bit()
            | DeviceState::GettingServices.bit()
            | DeviceState::Authenticating.bit()
            | DeviceState::Authenticated.bit()
            | DeviceState::Initializing.bit()
            | DeviceState::Initialized.bit()
            | DeviceState::UpdatingFirmware.bit(),
    );

    /// The bonding sub-states, exactly one of which is normally active.
    /// 绑定子状态，通常恰好其中一个处于活动状态。
    pub const BOND_STATES: StateSet<DeviceState> = StateSet::from_raw(
        DeviceState::Unbonded.bit() | DeviceState::Bonding.bit() | DeviceState::Bonded.bit(),
    );

    pub const fn bit(self) -> u32 {
        ordinal_bit(self as u8)
    }

    /// Returns the "highest" in-progress connection state, for progress
    /// summaries. While connected the order is `Initializing`, `Bonding`,
    /// `Authenticating`, `GettingServices`; otherwise `Connecting`.
    ///
    /// 返回“最高”的进行中连接状态，用于进度摘要。
    pub fn transitory_connection_state(set: StateSet<DeviceState>) -> Option<DeviceState> {
        use DeviceState::*;

        if Connected.overlaps(set) {
            [Initializing, Bonding, Authenticating, GettingServices]
                .into_iter()
                .find(|state| state.overlaps(set))
        } else if Connecting.overlaps(set) {
            Some(Connecting)
        } else {
            None
        }
    }
}

const _: () = {
    let mut i = 0;
    while i < DeviceState::ALL.len() {
        assert!(DeviceState::ALL[i] as usize == i);
        ordinal_bit(i as u8);
        i += 1;
    }
};

impl State for DeviceState {
    const VALUES: &'static [Self] = &DeviceState::ALL;
    const PURGEABLE: StateSet<Self> = DeviceState::PURGEABLE_MASK;

    fn ordinal(self) -> u8 {
        self as u8
    }

    fn name(self) -> &'static str {
        match self {
            DeviceState::Undiscovered => "UNDISCOVERED",
            DeviceState::AttemptingReconnect => "ATTEMPTING_RECONNECT",
            DeviceState::Discovered => "DISCOVERED",
            DeviceState::Advertising => "ADVERTISING",
            DeviceState::Disconnected => "DISCONNECTED",
            DeviceState::Unbonded => "UNBONDED",
            DeviceState::Bonding => "BONDING",
            DeviceState::Bonded => "BONDED",
            DeviceState::ConnectingOverall => "CONNECTING_OVERALL",
            DeviceState::Connecting => "CONNECTING",
            DeviceState::Connected => "CONNECTED",
            DeviceState::GettingServices => "GETTING_SERVICES",
            DeviceState::Authenticating => "AUTHENTICATING",
            DeviceState::Authenticated => "AUTHENTICATED",
            DeviceState::Initializing => "INITIALIZING",
            DeviceState::Initialized => "INITIALIZED",
            DeviceState::UpdatingFirmware => "UPDATING_FIRMWARE",
        }
    }
}
