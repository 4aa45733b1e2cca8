//! 测试辅助模块
//! 提供测试工具和辅助函数

#![allow(dead_code)]

use std::str::FromStr;

use ironshift::prelude::*;
use rust_decimal::Decimal;

/// BIP39 标准测试向量
pub const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

pub fn test_master_key() -> MasterKey {
    MasterKey::from_mnemonic(TEST_MNEMONIC, "").expect("test mnemonic is valid")
}

pub fn master_from_byte(byte: u8) -> MasterKey {
    MasterKey::from_seed(&[byte; 32]).expect("32-byte seed is valid")
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid decimal literal")
}

/// 构造一笔 BTC → ETH 交易
pub fn sample_trade(order_id: &str, timestamp: i64) -> Trade {
    Trade::new(Quote {
        order_id: order_id.to_string(),
        pair: CoinPair::BtcToEth.pair_code().to_string(),
        deposit: "1BoatSLRHtKNngkdXEeobR76b53LETtpyT".to_string(),
        deposit_amount: dec("0.1"),
        withdrawal: Some("0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb6".to_string()),
        withdrawal_amount: dec("2.4"),
        quoted_rate: dec("24"),
        miner_fee: dec("0.001"),
        expiration: Some(timestamp + 600_000),
        max_limit: None,
        return_address: None,
    })
    .with_timestamp(timestamp)
}

pub fn test_config(metadata_url: &str, exchange_url: &str) -> Config {
    let mut config = Config::default();
    config.metadata.base_url = metadata_url.to_string();
    config.metadata.timeout_secs = 5;
    config.exchange.base_url = exchange_url.to_string();
    config.exchange.api_key = None;
    config.exchange.timeout_secs = 5;
    config.logging.level = "info".to_string();
    config.logging.format = "text".to_string();
    config
}
