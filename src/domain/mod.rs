//! Domain 模块
//!
//! 密钥派生与交易记录的领域模型

pub mod coin_pair;
pub mod exchange;
pub mod master_key;
pub mod metadata_node;
pub mod trade;

// 重新导出常用类型
pub use coin_pair::CoinPair;
pub use exchange::{MarketInfo, QuoteAmount, QuoteOutcome, QuoteRequest, TradeStatusResponse};
pub use master_key::MasterKey;
pub use metadata_node::{
    recover_signer_address, MetadataKey, MetadataNodeDeriver, METADATA_PURPOSE,
    TRADES_METADATA_TYPE,
};
pub use trade::{Quote, Trade, TradeState};
