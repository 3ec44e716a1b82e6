//! 定义了流量控制缓冲区的可配置参数。
//! Defines configurable parameters for the flow-control buffer.
//!
//! A [`Config`] is produced by [`ConfigBuilder::build`], which performs every
//! check that does not need the producer. Named pause/resume methods are
//! resolved later, when the config is bound to a producer.

use crate::adapter::Payload;
use crate::error::ConfigError;
use crate::flow::WatermarkPolicy;
use crate::source::{Control, EventSource};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Default buffer size at or above which the producer is paused.
pub const DEFAULT_HIGH_WATER_MARK: usize = 1000;
/// Default buffer size at or below which a paused producer is resumed.
pub const DEFAULT_LOW_WATER_MARK: usize = 500;
/// Default time a traversal waits for a wake signal before failing.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(5000);
/// Default rejection event.
pub const DEFAULT_REJECTION_EVENT: &str = "error";

/// Maps the raw arguments of a data notification to a stored item.
pub type Transform<A, T> = Arc<dyn Fn(Vec<A>) -> T + Send + Sync>;
/// Decides whether a data notification is accepted. `false` drops it.
pub type PreFilter<A> = Arc<dyn Fn(&[A]) -> bool + Send + Sync>;
/// Renders the arguments of a rejection notification into an error message.
pub type RejectionReason<A> = Arc<dyn Fn(&[A]) -> String + Send + Sync>;

/// One or more event names.
///
/// 一个或多个事件名称。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNames(Vec<String>);

impl EventNames {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for EventNames {
    fn from(name: &str) -> Self {
        Self(vec![name.to_owned()])
    }
}

impl From<String> for EventNames {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for EventNames {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for EventNames {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_owned).collect())
    }
}

impl<const N: usize> From<[&str; N]> for EventNames {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|name| (*name).to_owned()).collect())
    }
}

/// How a pause or resume operation is reached.
///
/// 暂停或恢复操作的获取方式。
#[derive(Clone)]
pub enum ControlBinding {
    /// A named method resolved on the producer through [`EventSource::control`].
    /// 通过生产者解析的具名方法。
    Method(String),
    /// A callable supplied directly by the caller.
    /// 调用者直接提供的函数。
    Function(Control),
}

impl ControlBinding {
    /// Resolves the binding against a producer.
    /// 针对生产者解析该操作。
    pub fn resolve<P, A>(&self, source: &P) -> Result<Control, ConfigError>
    where
        P: EventSource<A> + ?Sized,
    {
        match self {
            ControlBinding::Method(name) => source
                .control(name)
                .ok_or_else(|| ConfigError::MissingMethod(name.clone())),
            ControlBinding::Function(f) => Ok(Arc::clone(f)),
        }
    }

    fn exclusive(
        method: Option<String>,
        function: Option<Control>,
        names: (&'static str, &'static str),
    ) -> Result<Self, ConfigError> {
        let (method_name, function_name) = names;
        match (method, function) {
            (Some(name), None) => Ok(ControlBinding::Method(name)),
            (None, Some(f)) => Ok(ControlBinding::Function(f)),
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousControl {
                method: method_name,
                function: function_name,
            }),
            (None, None) => Err(ConfigError::MissingControl {
                method: method_name,
                function: function_name,
            }),
        }
    }
}

impl fmt::Debug for ControlBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlBinding::Method(name) => f.debug_tuple("Method").field(name).finish(),
            ControlBinding::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// A validated configuration.
///
/// `A` is the type of a single event argument, `T` the type of a stored item.
///
/// 经过验证的配置。`A` 为单个事件参数的类型，`T` 为缓冲项的类型。
pub struct Config<A, T> {
    pub(crate) high_water_mark: usize,
    pub(crate) low_water_mark: usize,
    pub(crate) initialize_buffer: bool,
    pub(crate) data_event: String,
    pub(crate) resolution_events: Vec<String>,
    pub(crate) rejection_events: Vec<String>,
    pub(crate) pre_filter: Option<PreFilter<A>>,
    pub(crate) transform: Transform<A, T>,
    pub(crate) rejection_reason: RejectionReason<A>,
    pub(crate) pause: ControlBinding,
    pub(crate) resume: ControlBinding,
    pub(crate) wait_timeout: Option<Duration>,
}

impl<A> Config<A, Payload<A>>
where
    A: fmt::Debug + Send + 'static,
{
    /// Starts a builder for the given data and resolution event(s).
    ///
    /// 为给定的数据事件和完成事件创建构建器。
    pub fn builder(
        data_event: impl Into<String>,
        resolution_events: impl Into<EventNames>,
    ) -> ConfigBuilder<A, Payload<A>> {
        ConfigBuilder {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            low_water_mark: DEFAULT_LOW_WATER_MARK,
            initialize_buffer: true,
            data_event: data_event.into(),
            resolution_events: resolution_events.into(),
            rejection_events: EventNames::from(DEFAULT_REJECTION_EVENT),
            pre_filter: None,
            transform: Arc::new(Payload::<A>::from_args),
            rejection_reason: Arc::new(describe_rejection::<A>),
            pause_method: None,
            pause_function: None,
            resume_method: None,
            resume_function: None,
            wait_timeout: Some(DEFAULT_WAIT_TIMEOUT),
        }
    }
}

impl<A, T> Config<A, T> {
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    pub fn low_water_mark(&self) -> usize {
        self.low_water_mark
    }

    pub fn initialize_buffer(&self) -> bool {
        self.initialize_buffer
    }

    pub fn data_event(&self) -> &str {
        &self.data_event
    }

    pub fn resolution_events(&self) -> &[String] {
        &self.resolution_events
    }

    pub fn rejection_events(&self) -> &[String] {
        &self.rejection_events
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout
    }

    pub fn pause(&self) -> &ControlBinding {
        &self.pause
    }

    pub fn resume(&self) -> &ControlBinding {
        &self.resume
    }
}

impl<A, T> fmt::Debug for Config<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("high_water_mark", &self.high_water_mark)
            .field("low_water_mark", &self.low_water_mark)
            .field("initialize_buffer", &self.initialize_buffer)
            .field("data_event", &self.data_event)
            .field("resolution_events", &self.resolution_events)
            .field("rejection_events", &self.rejection_events)
            .field("pre_filter", &self.pre_filter.is_some())
            .field("pause", &self.pause)
            .field("resume", &self.resume)
            .field("wait_timeout", &self.wait_timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Config`].
///
/// 配置构建器。
pub struct ConfigBuilder<A, T> {
    high_water_mark: usize,
    low_water_mark: usize,
    initialize_buffer: bool,
    data_event: String,
    resolution_events: EventNames,
    rejection_events: EventNames,
    pre_filter: Option<PreFilter<A>>,
    transform: Transform<A, T>,
    rejection_reason: RejectionReason<A>,
    pause_method: Option<String>,
    pause_function: Option<Control>,
    resume_method: Option<String>,
    resume_function: Option<Control>,
    wait_timeout: Option<Duration>,
}

impl<A, T> ConfigBuilder<A, T> {
    /// Buffer size at or above which the producer is paused.
    /// 达到或超过该缓冲区大小时暂停生产者。
    pub fn high_water_mark(mut self, value: usize) -> Self {
        self.high_water_mark = value;
        self
    }

    /// Buffer size at or below which a paused producer is resumed.
    ///
    /// A value greater than or equal to the high water mark makes the producer
    /// pause and resume on nearly every item. This is accepted; avoiding it is
    /// the caller's responsibility.
    ///
    /// 缓冲区降至该大小或以下时恢复已暂停的生产者。
    pub fn low_water_mark(mut self, value: usize) -> Self {
        self.low_water_mark = value;
        self
    }

    /// Whether the buffer pre-allocates `high_water_mark` slots.
    pub fn initialize_buffer(mut self, value: bool) -> Self {
        self.initialize_buffer = value;
        self
    }

    /// Replaces the rejection event(s). Defaults to `"error"`.
    /// 替换拒绝事件，默认为 `"error"`。
    pub fn rejection_events(mut self, names: impl Into<EventNames>) -> Self {
        self.rejection_events = names.into();
        self
    }

    /// Drops data notifications for which `filter` returns `false`.
    /// 丢弃 `filter` 返回 `false` 的数据通知。
    pub fn pre_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&[A]) -> bool + Send + Sync + 'static,
    {
        self.pre_filter = Some(Arc::new(filter));
        self
    }

    pub fn rejection_reason<F>(mut self, reason: F) -> Self
    where
        F: Fn(&[A]) -> String + Send + Sync + 'static,
    {
        self.rejection_reason = Arc::new(reason);
        self
    }

    pub fn pause_method(mut self, name: impl Into<String>) -> Self {
        self.pause_method = Some(name.into());
        self
    }

    pub fn pause_function(mut self, f: Control) -> Self {
        self.pause_function = Some(f);
        self
    }

    pub fn resume_method(mut self, name: impl Into<String>) -> Self {
        self.resume_method = Some(name.into());
        self
    }

    pub fn resume_function(mut self, f: Control) -> Self {
        self.resume_function = Some(f);
        self
    }

    /// Bounds each suspension of a traversal. `None` waits indefinitely.
    /// 限制遍历每次挂起的时长。`None` 表示无限等待。
    pub fn wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Maps the raw arguments of a data notification to the stored item.
    ///
    /// 将数据通知的原始参数映射为缓冲项。
    pub fn transform<U, F>(self, transform: F) -> ConfigBuilder<A, U>
    where
        F: Fn(Vec<A>) -> U + Send + Sync + 'static,
    {
        ConfigBuilder {
            high_water_mark: self.high_water_mark,
            low_water_mark: self.low_water_mark,
            initialize_buffer: self.initialize_buffer,
            data_event: self.data_event,
            resolution_events: self.resolution_events,
            rejection_events: self.rejection_events,
            pre_filter: self.pre_filter,
            transform: Arc::new(transform),
            rejection_reason: self.rejection_reason,
            pause_method: self.pause_method,
            pause_function: self.pause_function,
            resume_method: self.resume_method,
            resume_function: self.resume_function,
            wait_timeout: self.wait_timeout,
        }
    }

    /// Validates the options and produces a [`Config`].
    ///
    /// 验证选项并生成配置。
    pub fn build(self) -> Result<Config<A, T>, ConfigError> {
        if self.high_water_mark == 0 {
            return Err(ConfigError::NonPositiveWaterMark("high_water_mark"));
        }
        if self.low_water_mark == 0 {
            return Err(ConfigError::NonPositiveWaterMark("low_water_mark"));
        }
        if self.data_event.is_empty() {
            return Err(ConfigError::EmptyEventName("data_event"));
        }

        let resolution_events = self.resolution_events.0;
        if resolution_events.is_empty() {
            return Err(ConfigError::NoResolutionEvent);
        }
        if resolution_events.iter().any(String::is_empty) {
            return Err(ConfigError::EmptyEventName("resolution_event"));
        }
        let rejection_events = self.rejection_events.0;
        if rejection_events.iter().any(String::is_empty) {
            return Err(ConfigError::EmptyEventName("rejection_event"));
        }

        let pause = ControlBinding::exclusive(
            self.pause_method,
            self.pause_function,
            ("pause_method", "pause_function"),
        )?;
        let resume = ControlBinding::exclusive(
            self.resume_method,
            self.resume_function,
            ("resume_method", "resume_function"),
        )?;

        if WatermarkPolicy::new(self.high_water_mark, self.low_water_mark).is_thrashing_prone() {
            warn!(
                high_water_mark = self.high_water_mark,
                low_water_mark = self.low_water_mark,
                "Low water mark is not below high water mark; producer may pause and resume on every item"
            );
        }

        Ok(Config {
            high_water_mark: self.high_water_mark,
            low_water_mark: self.low_water_mark,
            initialize_buffer: self.initialize_buffer,
            data_event: self.data_event,
            resolution_events,
            rejection_events,
            pre_filter: self.pre_filter,
            transform: self.transform,
            rejection_reason: self.rejection_reason,
            pause,
            resume,
            wait_timeout: self.wait_timeout,
        })
    }
}

fn describe_rejection<A: fmt::Debug>(args: &[A]) -> String {
    match args {
        [] => "no reason given".to_owned(),
        [single] => format!("{single:?}"),
        many => format!("{many:?}"),
    }
}
