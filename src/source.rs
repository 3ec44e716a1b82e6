//! The capability interface a producer must offer.
//!
//! A producer is anything that can attach and detach listeners by event name.
//! It may additionally expose named pause/resume operations; otherwise the
//! caller supplies them as [`Control`] functions in the configuration.
//!
//! 生产者必须提供的能力接口：按事件名称挂载和卸载监听器，
//! 并可选地暴露具名的暂停/恢复操作。

use crate::error::{ControlError, Result};
use std::sync::Arc;

/// A listener invoked with the raw argument list of one notification.
///
/// An `Err` returned from a listener is a fatal failure of the flow-control
/// side effects (pause/resume) and is propagated back to the emitting producer.
///
/// 以一次通知的原始参数列表调用的监听器。
pub type Listener<A> = Arc<dyn Fn(Vec<A>) -> Result<()> + Send + Sync>;

/// A pause or resume operation bound to a producer.
/// 绑定到生产者的暂停或恢复操作。
pub type Control = Arc<dyn Fn() -> std::result::Result<(), ControlError> + Send + Sync>;

/// Wraps a closure into a [`Control`].
pub fn control<F>(f: F) -> Control
where
    F: Fn() -> std::result::Result<(), ControlError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Opaque handle of one attached listener.
/// 已挂载监听器的不透明句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// A push-based producer of named events.
///
/// Implementations must tolerate [`unsubscribe`](EventSource::unsubscribe)
/// being called from inside a listener that is currently being dispatched,
/// and must not re-enter a listener synchronously from a pause/resume
/// operation.
///
/// 基于推送的具名事件生产者。实现必须允许在监听器执行期间调用 `unsubscribe`，
/// 并且不得在暂停/恢复操作中同步地重入监听器。
pub trait EventSource<A>: Send + Sync + 'static {
    /// Attaches `listener` to `event`.
    /// 将监听器挂载到事件上。
    fn subscribe(&self, event: &str, listener: Listener<A>) -> Result<SubscriptionId>;

    /// Detaches a previously attached listener. Unknown ids are ignored.
    /// 卸载先前挂载的监听器。未知的句柄将被忽略。
    fn unsubscribe(&self, id: SubscriptionId);

    /// Resolves a named operation such as `"pause"` or `"resume"`.
    ///
    /// Producers without named operations keep the default, which resolves
    /// nothing; such producers must be configured with control functions.
    ///
    /// 解析一个具名操作。默认不解析任何名称。
    fn control(&self, _name: &str) -> Option<Control> {
        None
    }
}
