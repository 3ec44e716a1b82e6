//! 流量控制层 - 水位策略、缓冲区与共享协调器
//! Flow control layer - watermark policy, buffer and shared coordinator

pub mod buffer;
pub mod coordinator;
pub mod watermark;

pub use buffer::{BufferStats, ErrorState, FlowControlBuffer};
pub use coordinator::{Coordinator, Step};
pub use watermark::{WatermarkPolicy, WatermarkSignal};
