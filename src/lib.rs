//! IronShift - 钱包交易所交易记录同步层
//!
//! 交易记录以加密元数据文档的形式保存在远端，文档密钥由 HD 钱包主密钥派生；
//! 主密钥只在调用期间借用，不存储、不上传。

pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::{ErrorCode, GatewayError, Result, TradeSyncError};

pub mod prelude {
    pub use crate::{
        app_state::AppState,
        config::Config,
        domain::{
            CoinPair, MarketInfo, MasterKey, Quote, QuoteAmount, QuoteOutcome, QuoteRequest, Trade,
            TradeState, TradeStatusResponse,
        },
        error::{GatewayError, TradeSyncError},
        infrastructure::metadata_client::{
            HttpMetadataTransport, InMemoryMetadataTransport, MetadataTransport,
        },
        service::{ExchangeGateway, ManagerStatus, TradeDocument, TradeManager, TradeStore},
    };
}
