//! 意外断开后的重连策略。
//! Reconnect policies consulted after an unexpected disconnect.
//!
//! 策略是其输入的纯函数。失败计数由生命周期跟踪，而不是由策略跟踪。
//!
//! A policy is a pure function of its input. Failure counts are tracked by
//! the lifecycle, not the policy.

use crate::config::ReconnectConfig;
use std::time::Duration;

/// The input to a reconnect decision. Lives for one reconnect episode.
///
/// 重连决策的输入。只在一个重连周期内有效。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectAttempt {
    /// Failed reconnect attempts so far in this episode.
    /// 本周期内迄今为止失败的重连尝试次数。
    pub failure_count: u32,
    /// Time since the disconnect that started this episode.
    /// 自开始本周期的断开连接以来的时间。
    pub time_since_disconnect: Duration,
}

/// What the lifecycle should do next.
///
/// 生命周期接下来应该做什么。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Try to connect again after the delay.
    /// 延迟后再次尝试连接。
    Delay(Duration),
    /// Stop trying for this episode.
    /// 停止本周期的尝试。
    Cancel,
}

/// Decides whether and when to reconnect.
///
/// 决定是否以及何时重连。
pub trait ReconnectPolicy: Send + Sync + 'static {
    fn decide(&self, attempt: &ReconnectAttempt) -> ReconnectDecision;
}

impl<F> ReconnectPolicy for F
where
    F: Fn(&ReconnectAttempt) -> ReconnectDecision + Send + Sync + 'static,
{
    fn decide(&self, attempt: &ReconnectAttempt) -> ReconnectDecision {
        self(attempt)
    }
}

/// Never reconnects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverReconnect;

impl ReconnectPolicy for NeverReconnect {
    fn decide(&self, _attempt: &ReconnectAttempt) -> ReconnectDecision {
        ReconnectDecision::Cancel
    }
}

/// Retries with the same delay every time, optionally up to a limit.
///
/// 每次以相同的延迟重试，可选地设置上限。
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy for FixedDelay {
    fn decide(&self, attempt: &ReconnectAttempt) -> ReconnectDecision {
        match self.max_attempts {
            Some(max) if attempt.failure_count >= max => ReconnectDecision::Cancel,
            _ => ReconnectDecision::Delay(self.delay),
        }
    }
}

/// Exponential backoff: `initial * multiplier^failure_count`, capped at
/// `max_delay`.
///
/// 指数退避：`initial * multiplier^failure_count`，上限为 `max_delay`。
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: ReconnectConfig,
}

impl ExponentialBackoff {
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config }
    }

    fn delay_for(&self, failure_count: u32) -> Duration {
        let exponent = i32::try_from(failure_count).unwrap_or(i32::MAX);
        let secs = self.config.initial_delay.as_secs_f64() * self.config.multiplier.powi(exponent);
        if !secs.is_finite() {
            return self.config.max_delay;
        }
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.config.max_delay)
            .min(self.config.max_delay)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(ReconnectConfig::default())
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn decide(&self, attempt: &ReconnectAttempt) -> ReconnectDecision {
        if let Some(max) = self.config.max_attempts {
            if attempt.failure_count >= max {
                return ReconnectDecision::Cancel;
            }
        }
        if let Some(limit) = self.config.give_up_after {
            if attempt.time_since_disconnect >= limit {
                return ReconnectDecision::Cancel;
            }
        }
        ReconnectDecision::Delay(self.delay_for(attempt.failure_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(failure_count: u32, secs: u64) -> ReconnectAttempt {
        ReconnectAttempt {
            failure_count,
            time_since_disconnect: Duration::from_secs(secs),
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = ExponentialBackoff::new(ReconnectConfig {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
            multiplier: 2.0,
            max_attempts: None,
            give_up_after: None,
        });

        assert_eq!(
            policy.decide(&attempt(0, 0)),
            ReconnectDecision::Delay(Duration::from_millis(500))
        );
        assert_eq!(
            policy.decide(&attempt(1, 0)),
            ReconnectDecision::Delay(Duration::from_secs(1))
        );
        assert_eq!(
            policy.decide(&attempt(2, 0)),
            ReconnectDecision::Delay(Duration::from_secs(2))
        );
        assert_eq!(
            policy.decide(&attempt(3, 0)),
            ReconnectDecision::Delay(Duration::from_secs(3))
        );
        assert_eq!(
            policy.decide(&attempt(u32::MAX, 0)),
            ReconnectDecision::Delay(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_backoff_gives_up() {
        let policy = ExponentialBackoff::new(ReconnectConfig {
            max_attempts: Some(3),
            give_up_after: Some(Duration::from_secs(60)),
            ..ReconnectConfig::default()
        });

        assert!(matches!(
            policy.decide(&attempt(2, 10)),
            ReconnectDecision::Delay(_)
        ));
        assert_eq!(policy.decide(&attempt(3, 10)), ReconnectDecision::Cancel);
        assert_eq!(policy.decide(&attempt(0, 60)), ReconnectDecision::Cancel);
    }

    #[test]
    fn test_policy_is_pure() {
        let policy = ExponentialBackoff::default();
        let input = attempt(2, 5);
        assert_eq!(policy.decide(&input), policy.decide(&input));
    }

    #[test]
    fn test_fixed_delay_and_closures() {
        let fixed = FixedDelay {
            delay: Duration::from_secs(2),
            max_attempts: Some(1),
        };
        assert_eq!(
            fixed.decide(&attempt(0, 0)),
            ReconnectDecision::Delay(Duration::from_secs(2))
        );
        assert_eq!(fixed.decide(&attempt(1, 0)), ReconnectDecision::Cancel);

        let closure = |a: &ReconnectAttempt| {
            if a.failure_count == 0 {
                ReconnectDecision::Delay(Duration::from_millis(10))
            } else {
                ReconnectDecision::Cancel
            }
        };
        assert_eq!(closure.decide(&attempt(1, 0)), ReconnectDecision::Cancel);
        assert_eq!(
            NeverReconnect.decide(&attempt(0, 0)),
            ReconnectDecision::Cancel
        );
    }
}
