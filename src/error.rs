//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use std::time::Duration;
use thiserror::Error;

/// Errors raised synchronously while validating a configuration or binding it
/// to a producer. None of them are retryable; fix the options and rebuild.
///
/// 在验证配置或将其绑定到生产者时同步产生的错误。均不可重试。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A water mark was zero.
    /// 水位线为零。
    #[error("`{0}` must be a positive integer")]
    NonPositiveWaterMark(&'static str),

    /// An event name was empty.
    /// 事件名称为空。
    #[error("event name for `{0}` must not be empty")]
    EmptyEventName(&'static str),

    /// No resolution event was configured.
    /// 未配置完成事件。
    #[error("at least one resolution event is required")]
    NoResolutionEvent,

    /// Both a named method and a function were supplied for the same control.
    /// 同一控制操作同时提供了方法名和函数。
    #[error("both `{method}` and `{function}` were supplied; exactly one is allowed")]
    AmbiguousControl {
        method: &'static str,
        function: &'static str,
    },

    /// Neither a named method nor a function was supplied for a control.
    /// 控制操作既没有提供方法名也没有提供函数。
    #[error("one of `{method}` or `{function}` is required")]
    MissingControl {
        method: &'static str,
        function: &'static str,
    },

    /// The producer does not expose a callable with the configured name.
    /// 生产者没有暴露指定名称的可调用方法。
    #[error("producer has no callable method named `{0}`")]
    MissingMethod(String),
}

/// Failure reported by a producer's pause or resume operation.
///
/// 生产者的暂停或恢复操作报告的失败。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ControlError(String);

impl ControlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// The primary error type of the library.
///
/// The type is `Clone` because a terminal error is stored in the coordinator
/// and handed to the consumer when its traversal reaches it.
///
/// 本库的主要错误类型。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Invalid configuration or producer shape.
    /// 无效的配置或生产者形态。
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The producer emitted one of the configured rejection events.
    /// 生产者触发了一个拒绝事件。
    #[error("producer rejected via `{event}`: {reason}")]
    Rejected { event: String, reason: String },

    /// The consumer waited longer than the configured timeout for a wake signal.
    /// 消费者等待唤醒信号超过了配置的超时时间。
    #[error("timed out after {waited:?} waiting for data event `{event}`")]
    Timeout { event: String, waited: Duration },

    /// The producer's pause operation failed.
    /// 生产者的暂停操作失败。
    #[error("failed to pause producer: {0}")]
    Pause(ControlError),

    /// The producer's resume operation failed.
    /// 生产者的恢复操作失败。
    #[error("failed to resume producer: {0}")]
    Resume(ControlError),

    /// The producer refused a listener registration.
    /// 生产者拒绝了监听器注册。
    #[error("failed to subscribe to `{event}`: {reason}")]
    Subscribe { event: String, reason: String },
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
