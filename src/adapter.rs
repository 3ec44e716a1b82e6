//! 生产者适配器 - 将协调器挂载到生产者的事件上
//! Producer adapter - attaches the coordinator to the producer's events
//!
//! 职责：
//! - 为数据、完成和拒绝事件挂载监听器
//! - 规范化数据通知的参数并应用过滤和转换
//! - 在首次终止通知时仅卸载一次所有监听器

use crate::config::{PreFilter, RejectionReason, Transform};
use crate::error::{Error, Result};
use crate::flow::coordinator::{Coordinator, Detach};
use crate::source::{EventSource, Listener, SubscriptionId};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// The stored item when no transform is configured.
///
/// 未配置转换时的缓冲项。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<A> {
    /// The notification carried exactly one argument.
    /// 通知恰好携带一个参数。
    Single(A),
    /// The notification carried zero or several arguments.
    /// 通知携带零个或多个参数。
    Multiple(Vec<A>),
}

impl<A> Payload<A> {
    pub fn from_args(mut args: Vec<A>) -> Self {
        if args.len() == 1 {
            if let Some(single) = args.pop() {
                return Payload::Single(single);
            }
        }
        Payload::Multiple(args)
    }

    pub fn into_vec(self) -> Vec<A> {
        match self {
            Payload::Single(a) => vec![a],
            Payload::Multiple(args) => args,
        }
    }

    pub fn as_single(&self) -> Option<&A> {
        match self {
            Payload::Single(a) => Some(a),
            Payload::Multiple(_) => None,
        }
    }
}

/// Ingestion pipeline of one data event.
///
/// 数据事件的接收流水线。
pub struct DataPipeline<A, T> {
    pre_filter: Option<PreFilter<A>>,
    transform: Transform<A, T>,
}

impl<A, T> DataPipeline<A, T> {
    pub fn new(pre_filter: Option<PreFilter<A>>, transform: Transform<A, T>) -> Self {
        Self {
            pre_filter,
            transform,
        }
    }

    /// Runs one data notification through filter and transform, then buffers it.
    ///
    /// Filter and transform run outside the buffer lock. A panic in either
    /// unwinds into the producer's dispatch.
    ///
    /// 让一次数据通知经过过滤和转换后写入缓冲区。
    pub fn handle(&self, coordinator: &Coordinator<T>, args: Vec<A>) -> Result<()> {
        if let Some(filter) = &self.pre_filter {
            if !filter(&args) {
                trace!("Data notification filtered out");
                coordinator.record_filtered();
                return Ok(());
            }
        }
        let item = (self.transform)(args);
        coordinator.ingest(item)
    }
}

/// Attaches listeners to a producer on behalf of a coordinator.
///
/// 代表协调器向生产者挂载监听器。
pub struct ProducerAdapter<P> {
    source: Arc<P>,
    attached: Vec<(String, SubscriptionId)>,
}

impl<P> ProducerAdapter<P> {
    pub fn new(source: Arc<P>) -> Self {
        Self {
            source,
            attached: Vec::new(),
        }
    }

    /// Attaches the data, resolution and rejection listeners, then hands the
    /// detach operations to the coordinator.
    ///
    /// If the producer refuses any subscription, the listeners attached so
    /// far are detached again and the error is returned.
    ///
    /// 挂载数据、完成和拒绝监听器，并将卸载操作交给协调器。
    /// 若任一订阅失败，则卸载已挂载的监听器并返回错误。
    pub fn attach<A, T>(
        mut self,
        coordinator: &Arc<Coordinator<T>>,
        pipeline: DataPipeline<A, T>,
        resolution_events: &[String],
        rejection_events: &[String],
        rejection_reason: RejectionReason<A>,
    ) -> Result<()>
    where
        P: EventSource<A>,
        A: Send + 'static,
        T: Send + 'static,
    {
        let data_event = coordinator.data_event().to_owned();
        let data_listener: Listener<A> = {
            let coordinator = Arc::clone(coordinator);
            Arc::new(move |args: Vec<A>| pipeline.handle(&coordinator, args))
        };
        self.subscribe(&data_event, data_listener)?;

        for event in resolution_events {
            let listener: Listener<A> = {
                let coordinator = Arc::clone(coordinator);
                let event = event.clone();
                Arc::new(move |_args: Vec<A>| -> Result<()> {
                    coordinator.resolve(&event);
                    Ok(())
                })
            };
            self.subscribe(event, listener)?;
        }

        for event in rejection_events {
            let listener: Listener<A> = {
                let coordinator = Arc::clone(coordinator);
                let event = event.clone();
                let reason = Arc::clone(&rejection_reason);
                Arc::new(move |args: Vec<A>| -> Result<()> {
                    let reason = reason(&args);
                    warn!(event = %event, reason = %reason, "Producer rejected");
                    coordinator.reject(Error::Rejected {
                        event: event.clone(),
                        reason,
                    });
                    Ok(())
                })
            };
            self.subscribe(event, listener)?;
        }

        debug!(
            listeners = self.attached.len(),
            data_event = %data_event,
            "Producer listeners attached"
        );
        coordinator.install_teardown(self.into_detach::<A>());
        Ok(())
    }

    fn subscribe<A>(&mut self, event: &str, listener: Listener<A>) -> Result<()>
    where
        P: EventSource<A>,
    {
        match self.source.subscribe(event, listener) {
            Ok(id) => {
                self.attached.push((event.to_owned(), id));
                Ok(())
            }
            Err(error) => {
                warn!(event, error = %error, "Subscription refused; rolling back");
                for (_, id) in self.attached.drain(..) {
                    self.source.unsubscribe(id);
                }
                Err(error)
            }
        }
    }

    fn into_detach<A>(self) -> Vec<Detach>
    where
        P: EventSource<A>,
    {
        let source = self.source;
        self.attached
            .into_iter()
            .map(|(event, id)| {
                let source = Arc::clone(&source);
                Box::new(move || {
                    trace!(event = %event, id = id.get(), "Listener detached");
                    source.unsubscribe(id);
                }) as Detach
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_normalization() {
        assert_eq!(Payload::from_args(vec![7]), Payload::Single(7));
        assert_eq!(Payload::from_args(vec![1, 2]), Payload::Multiple(vec![1, 2]));
        assert_eq!(
            Payload::<i32>::from_args(Vec::new()),
            Payload::Multiple(Vec::new())
        );
    }

    #[test]
    fn test_payload_accessors() {
        assert_eq!(Payload::Single("a").as_single(), Some(&"a"));
        assert_eq!(Payload::Multiple(vec!["a", "b"]).as_single(), None);
        assert_eq!(Payload::Single(3).into_vec(), vec![3]);
        assert_eq!(Payload::Multiple(vec![3, 4]).into_vec(), vec![3, 4]);
    }
}
