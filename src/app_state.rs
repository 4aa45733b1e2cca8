use std::sync::Arc;

use crate::{
    config::Config,
    error::{Result, TradeSyncError},
    infrastructure::metadata_client::{
        HttpMetadataTransport, InMemoryMetadataTransport, MetadataTransport,
    },
    service::{ExchangeGateway, TradeManager},
};

/// 共享的元数据传输层
pub type SharedTransport = Arc<dyn MetadataTransport>;

/// 应用状态
/// 钱包层持有一份，克隆共享同一个交易管理器与网关
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub trades: TradeManager<SharedTransport>,
    pub exchange: Arc<ExchangeGateway>,
}

impl AppState {
    /// 按配置连接远端元数据服务与交易所
    pub fn new(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| TradeSyncError::Config(format!("{:#}", e)))?;

        let transport = HttpMetadataTransport::new(&config.metadata)
            .map_err(|e| TradeSyncError::Config(format!("{:#}", e)))?;

        Self::with_transport(config, Arc::new(transport))
    }

    /// 使用自定义元数据传输层
    pub fn with_transport(config: Config, transport: SharedTransport) -> Result<Self> {
        let exchange = ExchangeGateway::new(&config.exchange)?;

        tracing::info!(
            metadata_url = %config.metadata.base_url,
            exchange_url = %config.exchange.base_url,
            "Application state initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            trades: TradeManager::new(transport),
            exchange: Arc::new(exchange),
        })
    }

    /// 离线模式：交易记录只保存在进程内
    pub fn offline(config: Config) -> Result<Self> {
        Self::with_transport(config, Arc::new(InMemoryMetadataTransport::new()))
    }
}
