//! 配置来源: 启动时拉取一次
//! Pull-once configuration source

use super::types::{BranchConfig, CameraConfig, WorkerConfig};
use crate::api::ApiClient;
use crate::error::{Error, Result};
use serde::Deserialize;
use tracing::info;

pub trait ConfigProvider {
    /// 获取并合并摄像头与分店配置; 失败对该摄像头进程是致命的
    fn fetch(&self, camera_id: u64, branch_id: u64) -> Result<WorkerConfig>;
}

/// 通过后端 REST 接口获取配置
#[derive(Debug, Clone)]
pub struct HttpConfigProvider {
    api: ApiClient,
}

impl HttpConfigProvider {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// 列出分店下所有摄像头ID
    pub fn camera_ids(&self, branch_id: u64) -> Result<Vec<u64>> {
        #[derive(Deserialize)]
        struct CameraRef {
            id: u64,
        }

        let cameras: Vec<CameraRef> = self.api.get_json(&format!("branches/{}/cameras", branch_id))?;
        Ok(cameras.into_iter().map(|c| c.id).collect())
    }
}

impl ConfigProvider for HttpConfigProvider {
    fn fetch(&self, camera_id: u64, branch_id: u64) -> Result<WorkerConfig> {
        let camera: CameraConfig = self
            .api
            .get_json(&format!("cameras/{}", camera_id))
            .map_err(Error::config_fetch(format!("camera {}", camera_id)))?;
        let branch: BranchConfig = self
            .api
            .get_json(&format!("branches/{}", branch_id))
            .map_err(Error::config_fetch(format!("branch {}", branch_id)))?;

        info!(
            camera_id,
            branch_id,
            area = %camera.area_type,
            name = %camera.name,
            "✅ camera config loaded"
        );
        Ok(WorkerConfig::merge(camera, branch))
    }
}

/// 固定配置 (测试与离线运行)
#[derive(Debug, Clone)]
pub struct StaticConfigProvider {
    config: WorkerConfig,
}

impl StaticConfigProvider {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn fetch(&self, camera_id: u64, _branch_id: u64) -> Result<WorkerConfig> {
        if self.config.camera.id != camera_id {
            return Err(Error::Config(format!("unknown camera {}", camera_id)));
        }
        Ok(self.config.clone())
    }
}
