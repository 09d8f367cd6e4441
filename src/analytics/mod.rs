/// 分析系统 (Analytics)
///
/// - table:      餐桌生命周期状态机
/// - queue:      排队停留时间
/// - processors: 四类区域处理器
/// - engine:     单摄像头引擎 (持有全部跨帧状态)
/// - record:     上报记录
pub mod engine;
pub mod processors;
pub mod queue;
pub mod record;
pub mod table;

pub use engine::{CameraEngine, FrameContext};
pub use processors::{
    AreaProcessor, CashierProcessor, DiningProcessor, EntranceProcessor, KitchenProcessor,
};
pub use queue::{QueueStats, QueueTracker};
pub use record::{AnalyticsPayload, AnalyticsRecord, Empty, TableSnapshot};
pub use table::{TableBoard, TableStatus};
