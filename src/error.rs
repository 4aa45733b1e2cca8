//! 统一错误类型
//!
//! 对外暴露的错误分类：密钥派生、元数据读取、持久化、未初始化、交易所网关。
//! 内部管道（传输层、配置加载）使用 anyhow，在组件边界转换为这里的类型。

use thiserror::Error;

/// 交易同步层错误
#[derive(Debug, Error)]
pub enum TradeSyncError {
    /// 主密钥材料无效，不可重试
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// 读取远端元数据失败（网络 / 解密 / 格式），可重试
    #[error("Metadata access failed: {0}")]
    MetadataAccess(String),

    /// 保存远端元数据失败，内存中的修改已回滚，可重试
    #[error("Failed to persist trade metadata: {0}")]
    Persist(String),

    /// 在 initialize 成功之前访问交易列表
    #[error("Trade metadata not initialized")]
    Uninitialized,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// 后台任务异常退出（panic 或 runtime 关闭）
    #[error("Internal error: {0}")]
    Internal(String),
}

/// 交易所网关传输层错误
///
/// 业务拒绝（如金额超限）不属于此类，见 [`crate::domain::QuoteOutcome::Rejected`]。
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Exchange request failed: {0}")]
    Transport(String),

    #[error("Exchange API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// 行情 / 状态接口返回了 error 字段
    #[error("Exchange rejected request: {0}")]
    Rejected(String),

    #[error("Malformed exchange response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// 稳定的错误码，供上层展示或埋点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    KeyDerivationFailed,
    MetadataAccessFailed,
    PersistFailed,
    Uninitialized,
    GatewayTransport,
    GatewayStatus,
    GatewayRejected,
    GatewayMalformed,
    ConfigInvalid,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyDerivationFailed => "key_derivation_failed",
            Self::MetadataAccessFailed => "metadata_access_failed",
            Self::PersistFailed => "persist_failed",
            Self::Uninitialized => "uninitialized",
            Self::GatewayTransport => "gateway_transport",
            Self::GatewayStatus => "gateway_status",
            Self::GatewayRejected => "gateway_rejected",
            Self::GatewayMalformed => "gateway_malformed",
            Self::ConfigInvalid => "config_invalid",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TradeSyncError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::KeyDerivation(_) => ErrorCode::KeyDerivationFailed,
            Self::MetadataAccess(_) => ErrorCode::MetadataAccessFailed,
            Self::Persist(_) => ErrorCode::PersistFailed,
            Self::Uninitialized => ErrorCode::Uninitialized,
            Self::Gateway(GatewayError::Transport(_)) => ErrorCode::GatewayTransport,
            Self::Gateway(GatewayError::Status { .. }) => ErrorCode::GatewayStatus,
            Self::Gateway(GatewayError::Rejected(_)) => ErrorCode::GatewayRejected,
            Self::Gateway(GatewayError::Malformed(_)) => ErrorCode::GatewayMalformed,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// 调用方是否可以原样重试
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::MetadataAccess(_) | Self::Persist(_) => true,
            Self::Gateway(GatewayError::Transport(_)) => true,
            Self::Gateway(GatewayError::Status { status, .. }) => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub(crate) fn key_derivation(err: impl std::fmt::Display) -> Self {
        Self::KeyDerivation(err.to_string())
    }

    /// 保留 anyhow 的完整上下文链
    pub(crate) fn metadata_access(err: anyhow::Error) -> Self {
        Self::MetadataAccess(format!("{:#}", err))
    }

    pub(crate) fn persist(err: anyhow::Error) -> Self {
        Self::Persist(format!("{:#}", err))
    }
}

pub type Result<T, E = TradeSyncError> = std::result::Result<T, E>;
