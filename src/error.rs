//! 错误类型
//! Library error type

use thiserror::Error;

/// dinewatch 错误
#[derive(Error, Debug)]
pub enum Error {
    /// 配置获取/解析失败 (致命, 在主循环启动前退出)
    #[error("config error: {0}")]
    Config(String),

    /// 拉取某项配置失败, 保留底层错误 (含 HTTP 状态码)
    #[error("failed to load {what}")]
    ConfigFetch {
        what: String,
        #[source]
        source: Box<Error>,
    },

    /// HTTP 传输失败
    #[error("http error: {0}")]
    Http(String),

    /// 后端返回非 2xx 状态码
    #[error("{url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    /// 视频源读取失败 (可恢复, 触发重连)
    #[error("frame source error: {0}")]
    Source(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ureq::Error> for Error {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(status, resp) => Error::HttpStatus {
                url: resp.get_url().to_string(),
                status,
            },
            ureq::Error::Transport(t) => Error::Http(t.to_string()),
        }
    }
}

impl Error {
    /// 后端返回的 HTTP 状态码, 穿透配置上下文
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            Error::ConfigFetch { source, .. } => source.http_status(),
            _ => None,
        }
    }

    pub(crate) fn config_fetch(what: impl Into<String>) -> impl FnOnce(Error) -> Error {
        let what = what.into();
        move |e| Error::ConfigFetch {
            what,
            source: Box::new(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
