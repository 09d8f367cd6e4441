// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! dinewatch: 餐厅摄像头分析 (客流、餐桌状态、排队时长、员工在岗)
pub mod analytics; // 区域分析与跨帧状态
pub mod api; // 后端 REST 客户端
pub mod config; // 远端配置与本地调参
pub mod detection; // 人体检测与跟踪
pub mod error; // 错误类型
pub mod input; // 视频输入
pub mod roles; // 员工/顾客区分
pub mod stream; // 主循环与上报
pub mod zones; // 区域几何

pub use crate::analytics::{AnalyticsRecord, CameraEngine, FrameContext, TableStatus};
pub use crate::config::{AreaType, WorkerConfig};
pub use crate::error::{Error, Result};
pub use crate::roles::{ColorSchedule, RoleClassifier};
