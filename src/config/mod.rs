/// 配置 (Configuration)
///
/// - types:    后端摄像头/分店配置与 ROI 解读
/// - provider: 启动时拉取一次的配置来源
/// - tracker:  本地 ByteTrack 调参文件
pub mod provider;
pub mod tracker;
pub mod types;

pub use provider::{ConfigProvider, HttpConfigProvider, StaticConfigProvider};
pub use tracker::TrackerConfig;
pub use types::{
    AreaType, BranchConfig, CameraConfig, RoiSettings, TableId, TableZoneConfig, WorkerConfig,
    DEFAULT_KITCHEN_STAFF, DEFAULT_SEATING_CAPACITY, DEFAULT_TABLE_CAPACITY,
};
