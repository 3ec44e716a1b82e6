//! The consumer-facing sequence API.
//!
//! [`EventStream`] binds a producer to a flow-control buffer and hands out
//! [`Traversal`]s that pull one item at a time, suspending while the buffer
//! is empty.
//!
//! Only one traversal should be live at a time. Two traversals polled
//! concurrently share the single wake permit and may starve each other; this
//! is not guarded against.
//!
//! 面向消费者的序列 API。
//!
//! `EventStream` 将生产者绑定到流量控制缓冲区，并提供逐项拉取的 `Traversal`，
//! 在缓冲区为空时挂起。同一时间只应存在一个活动的遍历。

use crate::adapter::{DataPipeline, ProducerAdapter};
use crate::config::Config;
use crate::error::Result;
use crate::flow::{BufferStats, Coordinator, ErrorState, FlowControlBuffer, Step, WatermarkPolicy};
use crate::source::EventSource;
use futures::Stream;
use std::sync::Arc;
use tracing::{debug, trace};

/// A pull-based view over a push-based producer.
///
/// Dropping the handle detaches the producer's listeners, as does
/// [`close`](EventStream::close). Traversals created earlier keep working and
/// drain whatever is still buffered.
///
/// 基于推送的生产者之上的拉取视图。丢弃该句柄会卸载生产者的监听器。
#[derive(Debug)]
pub struct EventStream<T> {
    coordinator: Arc<Coordinator<T>>,
}

impl<T> EventStream<T>
where
    T: Send + 'static,
{
    /// Binds `config` to `source` and attaches the listeners.
    ///
    /// Named pause/resume methods are resolved before any listener is
    /// attached, so a [`ConfigError::MissingMethod`](crate::error::ConfigError::MissingMethod)
    /// leaves the producer untouched.
    ///
    /// 将配置绑定到生产者并挂载监听器。具名方法在挂载任何监听器之前解析。
    pub fn new<P, A>(source: Arc<P>, config: Config<A, T>) -> Result<Self>
    where
        P: EventSource<A>,
        A: Send + 'static,
    {
        let pause = config.pause.resolve::<P, A>(&source)?;
        let resume = config.resume.resolve::<P, A>(&source)?;

        let policy = WatermarkPolicy::new(config.high_water_mark, config.low_water_mark);
        let buffer = FlowControlBuffer::new(policy, pause, resume, config.initialize_buffer);
        let coordinator = Arc::new(Coordinator::new(
            buffer,
            config.data_event,
            config.wait_timeout,
        ));

        ProducerAdapter::new(source).attach(
            &coordinator,
            DataPipeline::new(config.pre_filter, config.transform),
            &config.resolution_events,
            &config.rejection_events,
            config.rejection_reason,
        )?;

        debug!(
            high_water_mark = policy.high_water_mark(),
            low_water_mark = policy.low_water_mark(),
            "Event stream created"
        );
        Ok(Self { coordinator })
    }
}

impl<T> EventStream<T> {
    /// Starts a traversal reflecting the current state.
    /// 创建一个反映当前状态的遍历。
    pub fn traversal(&self) -> Traversal<T> {
        Traversal {
            coordinator: Arc::clone(&self.coordinator),
            finished: false,
        }
    }

    /// Drains the stream into a vector, or returns the terminal error.
    ///
    /// 将流全部收集到向量中，或返回终止错误。
    pub async fn collect_all(&self) -> Result<Vec<T>> {
        let mut traversal = self.traversal();
        let mut items = Vec::new();
        while let Some(item) = traversal.next().await {
            items.push(item?);
        }
        Ok(items)
    }

    /// Detaches the producer's listeners and stops ingestion. Buffered items
    /// still drain; the traversal then ends without error.
    ///
    /// 卸载生产者监听器并停止接收。已缓冲的项仍可被消费，之后遍历正常结束。
    pub fn close(&self) {
        self.coordinator.close();
    }

    /// 获取统计信息
    /// Get statistics
    pub fn stats(&self) -> BufferStats {
        self.coordinator.stats()
    }

    pub fn error_state(&self) -> ErrorState {
        self.coordinator.error_state()
    }

    pub fn is_done(&self) -> bool {
        self.coordinator.is_done()
    }

    pub fn is_paused(&self) -> bool {
        self.coordinator.is_paused()
    }

    pub fn len(&self) -> usize {
        self.coordinator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinator.is_empty()
    }

    /// Whether the producer's listeners have been detached.
    pub fn is_detached(&self) -> bool {
        self.coordinator.is_released()
    }
}

impl<T> Drop for EventStream<T> {
    fn drop(&mut self) {
        self.coordinator.close();
    }
}

/// A single pass over an [`EventStream`].
///
/// Yields items in FIFO order. A terminal error is yielded once, after which
/// the traversal is finished.
///
/// 对 `EventStream` 的单次遍历。按 FIFO 顺序产出项；终止错误只产出一次。
#[derive(Debug)]
pub struct Traversal<T> {
    coordinator: Arc<Coordinator<T>>,
    finished: bool,
}

impl<T> Traversal<T> {
    /// Pulls the next item, suspending while the buffer is empty.
    ///
    /// Returns `None` once the producer has completed and the buffer is
    /// drained, or after an error has been yielded.
    ///
    /// 拉取下一项，缓冲区为空时挂起。
    pub async fn next(&mut self) -> Option<Result<T>> {
        if self.finished {
            return None;
        }
        loop {
            match self.coordinator.step() {
                Step::Item(item) => return Some(Ok(item)),
                Step::Failed(error) => {
                    trace!(error = %error, "Traversal failed");
                    self.finished = true;
                    return Some(Err(error));
                }
                Step::Finished => {
                    trace!("Traversal finished");
                    self.finished = true;
                    return None;
                }
                Step::Empty => self.coordinator.wait().await,
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Adapts the traversal into a [`Stream`].
    /// 将遍历转换为 `Stream`。
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send
    where
        T: Send + 'static,
    {
        futures::stream::unfold(self, |mut traversal| async move {
            traversal.next().await.map(|item| (item, traversal))
        })
    }
}
