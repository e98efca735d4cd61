//! # Chrome DevTools Protocol (CDP) 层
//!
//! 通过浏览器的远程调试端口与单个页面目标通信。
//!
//! ## 主要功能
//! - **目标发现**: 通过 `/json` 与 `/json/version` 解析页面的 WebSocket 地址
//! - **连接管理**: 有界重试、指数退避，发送前进行 ping 探活
//! - **命令分发**: 按 id 关联请求与响应，传输失败时自动重连并重发同一命令
//! - **事件队列**: 未匹配的协议事件进入有界队列，而不是被丢弃
//! - **脚本桥接**: 在页面主环境中执行表达式与签入的脚本
//!
//! ## 模块结构
//! - `traits`: 传输层与连接器 trait
//! - `types`: CDP 协议相关的数据类型
//! - `command`: 受支持命令的封闭枚举
//! - `discovery`: 调试端点的目标发现
//! - `connection`: WebSocket 传输与连接管理
//! - `dispatcher`: 命令分发与重试
//! - `bridge`: 脚本执行
//! - `mock`: 用于测试的脚本化浏览器
//!
//! ## 使用示例
//! ```rust,no_run
//! use chaser_pilot::cdp::{Dispatcher, ScriptBridge};
//! use chaser_pilot::config::Config;
//!
//! # async fn example() -> chaser_pilot::Result<()> {
//! let config = Config::default();
//! let mut bridge = ScriptBridge::new(Dispatcher::from_config(&config)?);
//!
//! let title = bridge.evaluate("document.title").await?;
//! println!("Title: {}", title);
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod command;
pub mod connection;
pub mod discovery;
pub mod dispatcher;
pub mod mock;
pub mod traits;
pub mod types;

pub use traits::{CdpEvent, Connector, TargetInfo, Transport};

pub use bridge::ScriptBridge;
pub use command::Command;
pub use connection::{ConnectionManager, RetryPolicy, WebSocketConnector, WebSocketTransport};
pub use discovery::TargetDiscovery;
pub use dispatcher::{Dispatcher, EVENT_QUEUE_CAPACITY};

// Re-export mock for development/testing
pub use mock::{MockBrowser, MockReply};
