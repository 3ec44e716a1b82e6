//! A minimal in-process event emitter.
//!
//! [`Emitter`] implements [`EventSource`] with a listener registry keyed by
//! event name and exposes `"pause"` and `"resume"` as named operations that
//! toggle a flag. It is handy as a bridge for callback-driven code and as a
//! producer in tests.
//!
//! 一个最小化的进程内事件发射器。它以事件名称为键维护监听器注册表，
//! 并将 `"pause"` 和 `"resume"` 暴露为具名操作。

use crate::error::{ControlError, Result};
use crate::source::{Control, EventSource, Listener, SubscriptionId};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tracing::trace;

/// Name of the pause operation exposed by [`Emitter`].
pub const PAUSE_METHOD: &str = "pause";
/// Name of the resume operation exposed by [`Emitter`].
pub const RESUME_METHOD: &str = "resume";

#[derive(Default)]
struct FlowFlags {
    paused: AtomicBool,
    pauses: AtomicUsize,
    resumes: AtomicUsize,
}

impl FlowFlags {
    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }
}

/// 进程内事件发射器
/// In-process event emitter
pub struct Emitter<A> {
    listeners: DashMap<String, Vec<(SubscriptionId, Listener<A>)>>,
    next_id: AtomicU64,
    flags: Arc<FlowFlags>,
}

impl<A> Default for Emitter<A> {
    fn default() -> Self {
        Self {
            listeners: DashMap::new(),
            next_id: AtomicU64::new(1),
            flags: Arc::new(FlowFlags::default()),
        }
    }
}

impl<A> Emitter<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of listeners attached to `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, |entry| entry.len())
    }

    /// Number of listeners attached across all events.
    pub fn total_listeners(&self) -> usize {
        self.listeners.iter().map(|entry| entry.len()).sum()
    }

    /// Whether the last flow-control request was a pause.
    /// 最近一次流量控制请求是否为暂停。
    pub fn is_paused(&self) -> bool {
        self.flags.paused.load(Ordering::SeqCst)
    }

    pub fn pause_count(&self) -> usize {
        self.flags.pauses.load(Ordering::SeqCst)
    }

    pub fn resume_count(&self) -> usize {
        self.flags.resumes.load(Ordering::SeqCst)
    }

    pub fn pause(&self) {
        self.flags.pause();
    }

    pub fn resume(&self) {
        self.flags.resume();
    }
}

impl<A: Clone> Emitter<A> {
    /// Delivers `args` to every listener of `event` in attachment order and
    /// returns how many were invoked.
    ///
    /// The listener list is snapshotted before dispatch, so listeners may
    /// detach themselves (or others) while running. The first listener error
    /// stops dispatch and is returned.
    ///
    /// 按挂载顺序将 `args` 分发给 `event` 的所有监听器，并返回调用的数量。
    pub fn emit(&self, event: &str, args: Vec<A>) -> Result<usize> {
        let snapshot: Vec<Listener<A>> = match self.listeners.get(event) {
            Some(entry) => entry.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return Ok(0),
        };

        trace!(event, listeners = snapshot.len(), "Dispatching event");
        for listener in &snapshot {
            listener(args.clone())?;
        }
        Ok(snapshot.len())
    }

    /// Shorthand for emitting a single argument.
    pub fn emit_one(&self, event: &str, arg: A) -> Result<usize> {
        self.emit(event, vec![arg])
    }
}

impl<A> EventSource<A> for Emitter<A>
where
    A: Send + Sync + 'static,
{
    fn subscribe(&self, event: &str, listener: Listener<A>) -> Result<SubscriptionId> {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .entry(event.to_owned())
            .or_default()
            .push((id, listener));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners
            .iter_mut()
            .for_each(|mut entry| entry.retain(|(existing, _)| *existing != id));
        self.listeners.retain(|_, listeners| !listeners.is_empty());
    }

    fn control(&self, name: &str) -> Option<Control> {
        let flags = Arc::clone(&self.flags);
        match name {
            PAUSE_METHOD => Some(Arc::new(move || {
                flags.pause();
                Ok::<(), ControlError>(())
            })),
            RESUME_METHOD => Some(Arc::new(move || {
                flags.resume();
                Ok::<(), ControlError>(())
            })),
            _ => None,
        }
    }
}
