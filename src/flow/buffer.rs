//! 流量控制缓冲区 - 持有待消费项、计数器以及对生产者的暂停/恢复调用
//! Flow-control buffer - owns pending items, counters and the pause/resume
//! calls into the producer
//!
//! 职责：
//! - 按 FIFO 顺序保存缓冲项
//! - 维护历史计数器
//! - 根据水位策略暂停/恢复生产者
//! - 记录终止状态与错误

use super::watermark::{WatermarkPolicy, WatermarkSignal};
use crate::error::{Error, Result};
use crate::source::Control;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, trace, warn};

/// Error descriptor of a coordinator.
///
/// 协调器的错误描述。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorState {
    pub error: bool,
    pub error_object: Option<Error>,
}

/// A point-in-time snapshot of the buffer.
///
/// 缓冲区的时间点快照。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferStats {
    pub done: bool,
    pub paused: bool,
    pub length: usize,
    pub total_length: u64,
    pub total_returned: u64,
    pub total_filtered: u64,
    pub error: ErrorState,
    /// The pause/resume failure that stopped flow control, if any.
    pub fatal: Option<Error>,
}

impl fmt::Display for BufferStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Buffer[len:{}, total:{}, returned:{}, filtered:{}, paused:{}, done:{}, error:{}]",
            self.length,
            self.total_length,
            self.total_returned,
            self.total_filtered,
            self.paused,
            self.done,
            self.error.error
        )
    }
}

/// 流量控制缓冲区
/// Flow-control buffer
pub struct FlowControlBuffer<T> {
    /// 待消费的缓冲项
    /// Items waiting for the consumer
    items: VecDeque<T>,

    policy: WatermarkPolicy,
    pause: Control,
    resume: Control,

    /// 生产者是否已被通知暂停
    /// Whether the producer has been told to pause
    paused: bool,

    /// 是否已观察到完成或拒绝
    /// Whether a resolution or rejection has been observed
    done: bool,

    error: Option<Error>,

    /// 暂停/恢复失败后锁定，此后不再调用任何控制操作
    /// Latched by a failing pause/resume; no control runs after that
    fatal: Option<Error>,

    total_length: u64,
    total_returned: u64,
    total_filtered: u64,
}

impl<T> FlowControlBuffer<T> {
    /// 创建新的流量控制缓冲区
    /// Create new flow-control buffer
    pub fn new(
        policy: WatermarkPolicy,
        pause: Control,
        resume: Control,
        initialize_buffer: bool,
    ) -> Self {
        let items = if initialize_buffer {
            VecDeque::with_capacity(policy.high_water_mark())
        } else {
            VecDeque::new()
        };

        Self {
            items,
            policy,
            pause,
            resume,
            paused: false,
            done: false,
            error: None,
            fatal: None,
            total_length: 0,
            total_returned: 0,
            total_filtered: 0,
        }
    }

    /// Appends an item and pauses the producer once the high water mark is reached.
    ///
    /// The item stays buffered even if the pause operation fails. The failure
    /// is latched as fatal and returned; pause and resume are never invoked
    /// again afterwards.
    ///
    /// 追加一项，并在达到高水位时暂停生产者。暂停失败会被锁定为致命状态，不再重试。
    pub fn push(&mut self, item: T) -> Result<()> {
        self.items.push_back(item);
        self.total_length += 1;

        let length = self.items.len();
        trace!(length, total_length = self.total_length, "Item buffered");

        if self.fatal.is_none()
            && self.policy.after_push(length, self.paused) == WatermarkSignal::Pause
        {
            if let Err(e) = (self.pause)() {
                warn!(length, error = %e, "Producer pause failed");
                return Err(self.latch(Error::Pause(e)));
            }
            self.paused = true;
            debug!(
                length,
                high_water_mark = self.policy.high_water_mark(),
                "Producer paused"
            );
        }

        Ok(())
    }

    /// Removes the head item, resuming the producer once the buffer has drained
    /// to the low water mark. Returns `Ok(None)` when the buffer is empty.
    ///
    /// The resume operation runs before the item is removed, so a failing
    /// resume leaves the items untouched. Like a pause failure, it is latched
    /// as fatal.
    ///
    /// 移除队首项，并在缓冲区降至低水位时恢复生产者。缓冲区为空时返回 `Ok(None)`。
    pub fn pull(&mut self) -> Result<Option<T>> {
        if self.items.is_empty() {
            return Ok(None);
        }

        let remaining = self.items.len() - 1;
        if self.fatal.is_none()
            && self.policy.after_pull(remaining, self.paused) == WatermarkSignal::Resume
        {
            if let Err(e) = (self.resume)() {
                warn!(length = remaining, error = %e, "Producer resume failed");
                return Err(self.latch(Error::Resume(e)));
            }
            self.paused = false;
            debug!(
                length = remaining,
                low_water_mark = self.policy.low_water_mark(),
                "Producer resumed"
            );
        }

        let item = self.items.pop_front();
        if item.is_some() {
            self.total_returned += 1;
            trace!(length = remaining, total_returned = self.total_returned, "Item returned");
        }
        Ok(item)
    }

    fn latch(&mut self, error: Error) -> Error {
        self.fatal = Some(error.clone());
        error
    }

    /// Drops every buffered item. Historical counters are left alone.
    ///
    /// 丢弃所有缓冲项，历史计数器保持不变。
    pub fn discard_all(&mut self) -> usize {
        let discarded = self.items.len();
        self.items.clear();
        discarded
    }

    pub fn record_filtered(&mut self) {
        self.total_filtered += 1;
    }

    /// Marks graceful completion. Returns `false` if already done.
    /// 标记正常完成。如果已完成则返回 `false`。
    pub fn finish(&mut self) -> bool {
        if self.done {
            return false;
        }
        self.done = true;
        true
    }

    /// Records a terminal error, discards buffered items and marks completion.
    /// Returns `false` (and changes nothing) if already done.
    ///
    /// 记录终止错误，丢弃缓冲项并标记完成。如果已完成则不做任何改变并返回 `false`。
    pub fn fail(&mut self, error: Error) -> bool {
        if self.done {
            return false;
        }
        let discarded = self.discard_all();
        warn!(discarded, error = %error, "Buffer failed; discarding buffered items");
        self.error = Some(error);
        self.done = true;
        true
    }

    /// Whether a traversal has nothing left to produce: an error or a fatal
    /// control failure was recorded, or the producer completed and the buffer
    /// is drained.
    ///
    /// 遍历是否已无可产出的内容。
    pub fn is_terminated(&self) -> bool {
        self.error.is_some() || self.fatal.is_some() || (self.done && self.items.is_empty())
    }

    /// The error a traversal must surface before anything else.
    /// 遍历必须优先抛出的错误。
    pub fn terminal_error(&self) -> Option<&Error> {
        self.error.as_ref().or(self.fatal.as_ref())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn fatal(&self) -> Option<&Error> {
        self.fatal.as_ref()
    }

    pub fn policy(&self) -> WatermarkPolicy {
        self.policy
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn error_state(&self) -> ErrorState {
        ErrorState {
            error: self.error.is_some(),
            error_object: self.error.clone(),
        }
    }

    /// 获取统计信息
    /// Get statistics
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            done: self.done,
            paused: self.paused,
            length: self.items.len(),
            total_length: self.total_length,
            total_returned: self.total_returned,
            total_filtered: self.total_filtered,
            error: self.error_state(),
            fatal: self.fatal.clone(),
        }
    }
}

impl<T> fmt::Debug for FlowControlBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowControlBuffer")
            .field("length", &self.items.len())
            .field("policy", &self.policy)
            .field("paused", &self.paused)
            .field("done", &self.done)
            .field("error", &self.error)
            .field("fatal", &self.fatal)
            .field("total_length", &self.total_length)
            .field("total_returned", &self.total_returned)
            .field("total_filtered", &self.total_filtered)
            .finish_non_exhaustive()
    }
}
