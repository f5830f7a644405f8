//! 连接生命周期管理模块
//! Connection Lifecycle Management Module
//!
//! 每个被跟踪的外设由一个专用的 actor 任务拥有，它持有该外设的 `StateTracker`，
//! 并按顺序执行 连接 → 服务发现 → 认证 → 初始化。传输调用与事务在独立任务中运行，
//! 完成后带着操作令牌回到 actor；令牌过期的完成会被丢弃。
//!
//! Each tracked peer is owned by a dedicated actor task that holds the peer's
//! `StateTracker` and sequences connect → service discovery → authentication
//! → initialization. Transport calls and transactions run on their own tasks
//! and report back to the actor tagged with an operation token; completions
//! with a stale token are discarded.

mod actor;
mod command;
mod handle;
mod manager;
mod phase;
mod transitions;


pub use command::ConnectOptions;
pub use handle::PeerHandle;
pub use manager::ConnectionLifecycle;

pub(crate) use command::PeerCommand;
