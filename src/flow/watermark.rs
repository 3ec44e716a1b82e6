//! 水位策略 - 决定何时暂停或恢复生产者
//! Watermark policy - decides when to pause or resume the producer

/// The outcome of consulting the policy.
///
/// 水位策略的决策结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkSignal {
    /// Tell the producer to stop emitting.
    /// 通知生产者暂停。
    Pause,
    /// Tell a paused producer to continue.
    /// 通知已暂停的生产者恢复。
    Resume,
    /// Leave the producer as it is.
    /// 保持现状。
    Hold,
}

/// High/low watermark thresholds.
///
/// The policy has no side effects. If `low >= high` the producer can be paused
/// and resumed on every single item; the policy does not guard against it.
///
/// 高低水位阈值。该策略没有副作用。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkPolicy {
    high: usize,
    low: usize,
}

impl WatermarkPolicy {
    pub fn new(high: usize, low: usize) -> Self {
        Self { high, low }
    }

    pub fn high_water_mark(&self) -> usize {
        self.high
    }

    pub fn low_water_mark(&self) -> usize {
        self.low
    }

    /// Whether the thresholds can thrash between pause and resume.
    /// 阈值是否会导致暂停与恢复频繁切换。
    pub fn is_thrashing_prone(&self) -> bool {
        self.low >= self.high
    }

    /// Decision after an item was appended and the buffer now holds `length` items.
    /// 追加一项后（当前长度为 `length`）的决策。
    pub fn after_push(&self, length: usize, paused: bool) -> WatermarkSignal {
        if !paused && length >= self.high {
            WatermarkSignal::Pause
        } else {
            WatermarkSignal::Hold
        }
    }

    /// Decision after an item was removed and the buffer now holds `length` items.
    /// 移除一项后（当前长度为 `length`）的决策。
    pub fn after_pull(&self, length: usize, paused: bool) -> WatermarkSignal {
        if paused && length <= self.low {
            WatermarkSignal::Resume
        } else {
            WatermarkSignal::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_at_high_water_mark() {
        let policy = WatermarkPolicy::new(3, 1);
        assert_eq!(policy.after_push(2, false), WatermarkSignal::Hold);
        assert_eq!(policy.after_push(3, false), WatermarkSignal::Pause);
        assert_eq!(policy.after_push(4, false), WatermarkSignal::Pause);
        // Already paused.
        assert_eq!(policy.after_push(4, true), WatermarkSignal::Hold);
    }

    #[test]
    fn test_resume_at_low_water_mark() {
        let policy = WatermarkPolicy::new(3, 1);
        assert_eq!(policy.after_pull(2, true), WatermarkSignal::Hold);
        assert_eq!(policy.after_pull(1, true), WatermarkSignal::Resume);
        assert_eq!(policy.after_pull(0, true), WatermarkSignal::Resume);
        assert_eq!(policy.after_pull(0, false), WatermarkSignal::Hold);
    }

    #[test]
    fn test_thrashing_prone_thresholds() {
        assert!(!WatermarkPolicy::new(1000, 500).is_thrashing_prone());
        assert!(WatermarkPolicy::new(2, 2).is_thrashing_prone());

        let policy = WatermarkPolicy::new(2, 5);
        assert_eq!(policy.after_push(2, false), WatermarkSignal::Pause);
        assert_eq!(policy.after_pull(1, true), WatermarkSignal::Resume);
    }
}
