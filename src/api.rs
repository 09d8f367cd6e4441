//! 后端 REST 客户端
//! Thin bearer-token client over ureq

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// 默认后端地址
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1/";
/// 请求超时
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct ApiClient {
    agent: ureq::Agent,
    root: String,
    token: String,
}

impl ApiClient {
    pub fn new(root: &str, token: &str) -> Self {
        Self::with_timeout(root, token, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(root: &str, token: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        // 路径按相对路径拼接, 根地址必须以 '/' 结尾
        let root = if root.ends_with('/') {
            root.to_string()
        } else {
            format!("{}/", root)
        };
        Self {
            agent,
            root,
            token: token.to_string(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.root, path.trim_start_matches('/'))
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let resp = self
            .agent
            .get(&url)
            .set("Authorization", &self.bearer())
            .call()?;
        resp.into_json::<T>()
            .map_err(|e| Error::Http(format!("{}: unreadable body: {}", url, e)))
    }

    pub fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        self.agent
            .post(&url)
            .set("Authorization", &self.bearer())
            .send_json(body)?;
        Ok(())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("root", &self.root).finish()
    }
}
