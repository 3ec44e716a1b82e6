//! 共享协调器 - 连接生产者回调与消费者遍历
//! Shared coordinator - the meeting point of producer callbacks and the
//! consumer's traversal
//!
//! The buffer sits behind a mutex because producers may emit from any thread.
//! Every operation here runs to completion under that lock; the only
//! suspension point is [`Coordinator::wait`], which never holds it.
//!
//! The wake signal is a [`Notify`] used with `notify_one`, so a wake that
//! arrives before the consumer starts waiting is kept as a permit instead of
//! being lost.

use super::buffer::{BufferStats, ErrorState, FlowControlBuffer};
use crate::error::{Error, Result};
use std::fmt;
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

/// Detaches one listener from the producer.
pub(crate) type Detach = Box<dyn FnOnce() + Send>;

enum Teardown {
    /// Listeners are still being attached.
    Pending,
    Attached(Vec<Detach>),
    Released,
}

/// The result of one traversal step.
///
/// 一次遍历步骤的结果。
#[derive(Debug)]
pub enum Step<T> {
    /// The head item of the buffer.
    /// 缓冲区的队首项。
    Item(T),
    /// The traversal must surface this error and stop.
    /// 遍历必须抛出该错误并停止。
    Failed(Error),
    /// The producer completed and the buffer is drained.
    /// 生产者已完成且缓冲区已清空。
    Finished,
    /// Nothing is buffered yet; wait for a wake signal.
    /// 暂无缓冲项，需要等待唤醒信号。
    Empty,
}

/// 共享协调器
/// Shared coordinator
pub struct Coordinator<T> {
    buffer: Mutex<FlowControlBuffer<T>>,
    wake: Notify,
    teardown: Mutex<Teardown>,
    data_event: String,
    wait_timeout: Option<Duration>,
}

impl<T> Coordinator<T> {
    pub fn new(
        buffer: FlowControlBuffer<T>,
        data_event: impl Into<String>,
        wait_timeout: Option<Duration>,
    ) -> Self {
        Self {
            buffer: Mutex::new(buffer),
            wake: Notify::new(),
            teardown: Mutex::new(Teardown::Pending),
            data_event: data_event.into(),
            wait_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FlowControlBuffer<T>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_teardown(&self) -> MutexGuard<'_, Teardown> {
        self.teardown.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Buffers an accepted item and wakes the consumer.
    ///
    /// Items arriving after completion or after a fatal pause failure are
    /// dropped silently. A pause failure detaches the listeners and is
    /// returned to the producer.
    ///
    /// 缓冲一个已接受的项并唤醒消费者。完成或暂停失败后到达的项将被静默丢弃。
    pub fn ingest(&self, item: T) -> Result<()> {
        let result = {
            let mut buffer = self.lock();
            if buffer.is_done() || buffer.fatal().is_some() {
                trace!("Data notification after completion ignored");
                return Ok(());
            }
            buffer.push(item)
        };
        if result.is_err() {
            self.release();
        }
        self.wake();
        result
    }

    pub fn record_filtered(&self) {
        let mut buffer = self.lock();
        if !buffer.is_done() && buffer.fatal().is_none() {
            buffer.record_filtered();
        }
    }

    /// Handles a resolution notification.
    /// 处理完成通知。
    pub fn resolve(&self, event: &str) {
        let finished = self.lock().finish();
        if finished {
            info!(event, "Producer resolved");
        }
        self.release();
        self.wake();
    }

    /// Handles a rejection notification or any other terminal failure.
    /// 处理拒绝通知或其他终止性失败。
    pub fn reject(&self, error: Error) {
        let failed = self.lock().fail(error);
        if !failed {
            trace!("Rejection after completion ignored");
        }
        self.release();
        self.wake();
    }

    /// Stops ingestion on behalf of the consumer. Buffered items still drain.
    /// 代表消费者停止接收。已缓冲的项仍可被消费。
    pub fn close(&self) {
        let finished = self.lock().finish();
        if finished {
            debug!("Coordinator closed by consumer");
        }
        self.release();
        self.wake();
    }

    /// Takes one step of a traversal.
    ///
    /// An error always wins over buffered data. A failing resume detaches the
    /// listeners, and every later step reports the same failure.
    ///
    /// 执行一次遍历步骤。错误总是优先于缓冲数据。
    pub fn step(&self) -> Step<T> {
        let error = {
            let mut buffer = self.lock();
            if let Some(error) = buffer.terminal_error() {
                return Step::Failed(error.clone());
            }
            match buffer.pull() {
                Ok(Some(item)) => return Step::Item(item),
                Ok(None) if buffer.is_terminated() => return Step::Finished,
                Ok(None) => return Step::Empty,
                Err(error) => error,
            }
        };
        self.release();
        Step::Failed(error)
    }

    /// Suspends until the next wake signal.
    ///
    /// Each call gets a fresh timeout window. When it elapses while the buffer
    /// is still empty and not done, the coordinator fails with
    /// [`Error::Timeout`].
    ///
    /// 挂起直到下一次唤醒信号。每次调用都有独立的超时窗口。
    pub async fn wait(&self) {
        let Some(limit) = self.wait_timeout else {
            self.wake.notified().await;
            return;
        };

        if timeout(limit, self.wake.notified()).await.is_err() {
            self.time_out(limit);
        }
    }

    fn time_out(&self, waited: Duration) {
        let failed = {
            let mut buffer = self.lock();
            buffer.is_empty()
                && buffer.fail(Error::Timeout {
                    event: self.data_event.clone(),
                    waited,
                })
        };
        if failed {
            warn!(event = %self.data_event, ?waited, "Timed out waiting for data");
            self.release();
        }
    }

    /// Hands over the detach operations of freshly attached listeners.
    ///
    /// If a terminal notification already fired while attaching, the
    /// listeners are detached right away.
    ///
    /// 移交新挂载监听器的卸载操作。如果挂载期间已触发终止通知，则立即卸载。
    pub(crate) fn install_teardown(&self, detach: Vec<Detach>) {
        let late = {
            let mut slot = self.lock_teardown();
            match &mut *slot {
                Teardown::Pending => {
                    *slot = Teardown::Attached(detach);
                    Vec::new()
                }
                Teardown::Attached(existing) => {
                    existing.extend(detach);
                    Vec::new()
                }
                Teardown::Released => detach,
            }
        };
        for d in late {
            d();
        }
    }

    /// Detaches every listener exactly once.
    /// 仅卸载一次所有监听器。
    fn release(&self) {
        let taken = match mem::replace(&mut *self.lock_teardown(), Teardown::Released) {
            Teardown::Attached(detach) => detach,
            Teardown::Pending | Teardown::Released => Vec::new(),
        };
        if !taken.is_empty() {
            debug!(listeners = taken.len(), "Detaching producer listeners");
        }
        for d in taken {
            d();
        }
    }

    pub fn is_released(&self) -> bool {
        matches!(*self.lock_teardown(), Teardown::Released)
    }

    pub fn wake(&self) {
        self.wake.notify_one();
    }

    pub fn stats(&self) -> BufferStats {
        self.lock().stats()
    }

    pub fn error_state(&self) -> ErrorState {
        self.lock().error_state()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_paused(&self) -> bool {
        self.lock().is_paused()
    }

    pub fn is_done(&self) -> bool {
        self.lock().is_done()
    }

    pub fn data_event(&self) -> &str {
        &self.data_event
    }
}

impl<T> fmt::Debug for Coordinator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("buffer", &*self.lock())
            .field("data_event", &self.data_event)
            .field("wait_timeout", &self.wait_timeout)
            .finish_non_exhaustive()
    }
}
