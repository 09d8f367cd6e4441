//! 远端配置类型 (摄像头 / 分店)
//! Camera and branch configuration pulled from the backend once at startup

use crate::roles::ColorSchedule;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// 默认餐桌座位数
pub const DEFAULT_TABLE_CAPACITY: u32 = 4;
/// 默认厨房排班人数
pub const DEFAULT_KITCHEN_STAFF: u32 = 6;
/// 默认分店座位总数
pub const DEFAULT_SEATING_CAPACITY: u32 = 100;

/// 摄像头区域类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaType {
    Entrance,
    Dining,
    Cashier,
    Kitchen,
    /// 未识别的类型, 保留原始字符串用于日志
    Unknown(String),
}

impl From<String> for AreaType {
    fn from(raw: String) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "ENTRANCE" => AreaType::Entrance,
            "DINING" => AreaType::Dining,
            "CASHIER" => AreaType::Cashier,
            "KITCHEN" => AreaType::Kitchen,
            _ => AreaType::Unknown(raw),
        }
    }
}

impl<'de> Deserialize<'de> for AreaType {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(d).map(AreaType::from)
    }
}

impl fmt::Display for AreaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AreaType::Entrance => write!(f, "ENTRANCE"),
            AreaType::Dining => write!(f, "DINING"),
            AreaType::Cashier => write!(f, "CASHIER"),
            AreaType::Kitchen => write!(f, "KITCHEN"),
            AreaType::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

/// `GET cameras/{id}` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    pub id: u64,
    pub branch_id: u64,
    #[serde(default)]
    pub name: String,
    pub area_type: AreaType,
    pub rtsp_url: String,
    #[serde(default)]
    pub roi_settings: RoiSettings,
}

/// `GET branches/{id}` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct BranchConfig {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uniform_schedule: ColorSchedule,
    #[serde(default = "default_seating_capacity")]
    pub total_seating_capacity: u32,
}

fn default_seating_capacity() -> u32 {
    DEFAULT_SEATING_CAPACITY
}

/// 合并后的单摄像头运行配置
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub camera: CameraConfig,
    pub uniform_schedule: ColorSchedule,
    pub total_seating_capacity: u32,
}

impl WorkerConfig {
    pub fn merge(camera: CameraConfig, branch: BranchConfig) -> Self {
        Self {
            camera,
            uniform_schedule: branch.uniform_schedule,
            total_seating_capacity: branch.total_seating_capacity,
        }
    }

    pub fn camera_id(&self) -> u64 {
        self.camera.id
    }
}

/// 餐桌标识: 后端允许整数或字符串
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableId {
    Number(i64),
    Name(String),
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableId::Number(n) => write!(f, "{}", n),
            TableId::Name(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for TableId {
    fn from(n: i64) -> Self {
        TableId::Number(n)
    }
}

impl From<&str> for TableId {
    fn from(s: &str) -> Self {
        TableId::Name(s.to_string())
    }
}

/// 单张餐桌区域
#[derive(Debug, Clone, PartialEq)]
pub struct TableZoneConfig {
    pub id: TableId,
    /// None ⇒ 顶点列表非法, 区域不匹配任何检测
    pub points: Option<Vec<[f32; 2]>>,
    pub capacity: u32,
}

/// 自由格式的 ROI 设置 (`roi_settings`), 按区域类型解读
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RoiSettings(pub Value);

impl RoiSettings {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// 入口越线: `{"type":"LINE","start":[x,y],"end":[x,y]}`
    pub fn line(&self) -> Option<([f32; 2], [f32; 2])> {
        let kind = self.0.get("type")?.as_str()?;
        if !kind.eq_ignore_ascii_case("LINE") {
            return None;
        }
        let start = parse_point(self.0.get("start")?)?;
        let end = parse_point(self.0.get("end")?)?;
        Some((start, end))
    }

    /// 餐区: `{"zones":[{"id","points","capacity"}]}`
    ///
    /// 缺少 id 的条目被跳过
    pub fn tables(&self) -> Vec<TableZoneConfig> {
        let Some(zones) = self.0.get("zones").and_then(Value::as_array) else {
            return Vec::new();
        };

        zones
            .iter()
            .filter_map(|zone| {
                let id = match zone.get("id").cloned().map(serde_json::from_value::<TableId>) {
                    Some(Ok(id)) => id,
                    _ => {
                        warn!(zone = %zone, "⚠️ dining zone without usable id skipped");
                        return None;
                    }
                };
                let points = zone.get("points").and_then(parse_points);
                let capacity = zone
                    .get("capacity")
                    .and_then(Value::as_u64)
                    .map(|c| c as u32)
                    .unwrap_or(DEFAULT_TABLE_CAPACITY);
                Some(TableZoneConfig { id, points, capacity })
            })
            .collect()
    }

    /// 收银台/厨房单多边形: `{"points":[[x,y],...]}`, 非法返回 None
    pub fn points(&self) -> Option<Vec<[f32; 2]>> {
        self.0.get("points").and_then(parse_points)
    }

    /// 厨房排班人数
    pub fn total_staff(&self) -> u32 {
        self.0
            .get("total_staff")
            .and_then(Value::as_u64)
            .map(|n| n as u32)
            .unwrap_or(DEFAULT_KITCHEN_STAFF)
    }
}

fn parse_point(value: &Value) -> Option<[f32; 2]> {
    match value.as_array()?.as_slice() {
        [x, y] => Some([x.as_f64()? as f32, y.as_f64()? as f32]),
        _ => None,
    }
}

/// 数值对列表; 任一顶点非法则整体非法
fn parse_points(value: &Value) -> Option<Vec<[f32; 2]>> {
    value.as_array()?.iter().map(parse_point).collect()
}
