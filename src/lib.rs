#![deny(clippy::expect_used, clippy::unwrap_used)]

//! Bridges a push-based event producer to a pull-based asynchronous consumer.
//!
//! Items emitted by the producer are buffered by a flow-control buffer that
//! pauses the producer at a high water mark and resumes it at a low water
//! mark. The consumer pulls items one at a time through a [`Traversal`],
//! suspending while the buffer is empty.
//!
//! 将基于推送的事件生产者桥接到基于拉取的异步消费者。
//! 生产者发出的项由流量控制缓冲区缓存：达到高水位时暂停生产者，降至低水位时恢复。

pub mod adapter;
pub mod config;
pub mod emitter;
pub mod error;
pub mod flow;
pub mod source;
pub mod stream;

pub use adapter::Payload;
pub use config::{Config, ConfigBuilder, ControlBinding, EventNames};
pub use emitter::Emitter;
pub use error::{ConfigError, ControlError, Error, Result};
pub use flow::{BufferStats, ErrorState};
pub use source::{Control, EventSource, Listener, SubscriptionId, control};
pub use stream::{EventStream, Traversal};
