//! 定义了生命周期和重连的可配置参数。
//! Defines configurable parameters for the lifecycle and reconnection.

use std::time::Duration;

/// A structure containing all configurable parameters.
///
/// 包含所有可配置参数的结构体。
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Connection lifecycle parameters.
    /// 连接生命周期参数。
    pub lifecycle: LifecycleConfig,

    /// Parameters for the default reconnect policy.
    /// 默认重连策略的参数。
    pub reconnect: ReconnectConfig,
}

/// Connection lifecycle parameters.
///
/// 连接生命周期参数。
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// How long a transport connect call may take before it counts as failed.
    /// 传输连接调用在被视为失败之前可以持续的时间。
    pub connect_timeout: Duration,
    /// How long service discovery may take before it counts as failed.
    /// 服务发现在被视为失败之前可以持续的时间。
    pub discover_services_timeout: Duration,
    /// How many times a transaction may ask to be retried before the attempt
    /// is treated as a failure.
    ///
    /// 事务在被视为失败之前可以请求重试的次数。
    pub transaction_retry_limit: u32,
    /// The capacity of each peer's command channel.
    /// 每个外设命令通道的容量。
    pub command_channel_capacity: usize,
}

/// Parameters for [`crate::reconnect::ExponentialBackoff`].
///
/// [`crate::reconnect::ExponentialBackoff`] 的参数。
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// The delay before the first reconnect attempt of an episode.
    /// 一个重连周期内首次重连尝试前的延迟。
    pub initial_delay: Duration,
    /// The upper bound for any single delay.
    /// 单次延迟的上限。
    pub max_delay: Duration,
    /// The factor applied to the delay after each failed attempt.
    /// 每次尝试失败后应用于延迟的因子。
    pub multiplier: f64,
    /// Give up after this many failed attempts. `None` retries forever.
    /// 在这么多次失败尝试后放弃。`None` 表示永远重试。
    pub max_attempts: Option<u32>,
    /// Give up once the peer has been disconnected this long.
    /// 外设断开连接超过此时长后放弃。
    pub give_up_after: Option<Duration>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            discover_services_timeout: Duration::from_secs(10),
            transaction_retry_limit: 2,
            command_channel_capacity: 64,
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: Some(8),
            give_up_after: Some(Duration::from_secs(5 * 60)),
        }
    }
}
