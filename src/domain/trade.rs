//! 交易记录领域模型
//!
//! `Trade` 由调用方构造后不再修改；在文档中的顺序即历史顺序。

use std::fmt;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::coin_pair::CoinPair;

/// 交易生命周期状态（交易所 txStat 的取值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeState {
    /// 尚未收到存入
    NoDeposits,
    /// 已收到存入，兑换处理中
    Received,
    /// 兑换完成
    Complete,
    /// 兑换失败
    Failed,
    /// 失败后已人工处理（退款等）
    Resolved,
    /// 交易所无法识别该交易（如未知存入地址）
    Error,
    /// 交易所新增的未知状态
    #[serde(other)]
    Unknown,
}

impl TradeState {
    /// 是否为最终状态
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::Failed | Self::Resolved | Self::Error
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoDeposits => "no_deposits",
            Self::Received => "received",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Resolved => "resolved",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 交易所报价
///
/// 字段名沿用交易所 API 的 camelCase。`pair` 保持原始字符串，
/// 以免其他客户端写入的未知交易对导致整份文档无法解析。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// 预估报价没有订单号与存入地址，两者为空串
    #[serde(default)]
    pub order_id: String,
    pub pair: String,
    /// 存入地址
    #[serde(default)]
    pub deposit: String,
    pub deposit_amount: Decimal,
    /// 取出地址
    #[serde(default)]
    pub withdrawal: Option<String>,
    pub withdrawal_amount: Decimal,
    pub quoted_rate: Decimal,
    pub miner_fee: Decimal,
    /// 报价过期时间（毫秒时间戳）
    #[serde(default)]
    pub expiration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_address: Option<String>,
}

impl Quote {
    pub fn coin_pair(&self) -> Option<CoinPair> {
        CoinPair::from_code(&self.pair)
    }

    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        self.expiration.is_some_and(|exp| exp <= now_millis)
    }
}

/// 一笔交易所交易
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub status: TradeState,
    /// 存入交易哈希
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_in: Option<String>,
    /// 取出交易哈希
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_out: Option<String>,
    pub quote: Quote,
    /// 创建时间（毫秒时间戳）
    pub timestamp: i64,
}

impl Trade {
    /// 基于报价开启一笔新交易
    pub fn new(quote: Quote) -> Self {
        Self {
            status: TradeState::NoDeposits,
            hash_in: None,
            hash_out: None,
            quote,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn with_status(mut self, status: TradeState) -> Self {
        self.status = status;
        self
    }

    pub fn with_hash_in(mut self, hash: impl Into<String>) -> Self {
        self.hash_in = Some(hash.into());
        self
    }

    pub fn with_hash_out(mut self, hash: impl Into<String>) -> Self {
        self.hash_out = Some(hash.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp_millis: i64) -> Self {
        self.timestamp = timestamp_millis;
        self
    }

    /// 存入地址，交易状态查询的主键
    pub fn deposit_address(&self) -> &str {
        &self.quote.deposit
    }

    pub fn order_id(&self) -> &str {
        &self.quote.order_id
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn sample_quote() -> Quote {
        Quote {
            order_id: "order-1".into(),
            pair: "btc_eth".into(),
            deposit: "1BoatSLRHtKNngkdXEeobR76b53LETtpyT".into(),
            deposit_amount: Decimal::from_str("0.05").unwrap(),
            withdrawal: Some("0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb6".into()),
            withdrawal_amount: Decimal::from_str("1.2").unwrap(),
            quoted_rate: Decimal::from_str("24").unwrap(),
            miner_fee: Decimal::from_str("0.001").unwrap(),
            expiration: Some(1_500_000_000_000),
            max_limit: None,
            return_address: None,
        }
    }

    #[test]
    fn test_final_states() {
        assert!(!TradeState::NoDeposits.is_final());
        assert!(!TradeState::Received.is_final());
        assert!(TradeState::Complete.is_final());
        assert!(TradeState::Failed.is_final());
        assert!(TradeState::Resolved.is_final());
        assert!(TradeState::Error.is_final());
        assert!(!TradeState::Unknown.is_final());
    }

    #[test]
    fn test_unrecognized_state_parses() {
        let state: TradeState = serde_json::from_str(r#""error""#).unwrap();
        assert_eq!(state, TradeState::Error);

        let state: TradeState = serde_json::from_str(r#""refund_pending""#).unwrap();
        assert_eq!(state, TradeState::Unknown);
        assert_eq!(state.as_str(), "unknown");
    }

    #[test]
    fn test_trade_builder() {
        let trade = Trade::new(sample_quote())
            .with_status(TradeState::Received)
            .with_hash_in("abc")
            .with_timestamp(42);

        assert_eq!(trade.status, TradeState::Received);
        assert_eq!(trade.hash_in.as_deref(), Some("abc"));
        assert_eq!(trade.hash_out, None);
        assert_eq!(trade.timestamp, 42);
        assert_eq!(trade.deposit_address(), "1BoatSLRHtKNngkdXEeobR76b53LETtpyT");
        assert_eq!(trade.order_id(), "order-1");
        assert_eq!(trade.quote.coin_pair(), Some(CoinPair::BtcToEth));
    }

    #[test]
    fn test_wire_field_names() {
        let trade = Trade::new(sample_quote()).with_hash_out("def");
        let value = serde_json::to_value(&trade).unwrap();

        assert_eq!(value["status"], "no_deposits");
        assert_eq!(value["hashOut"], "def");
        assert!(value.get("hashIn").is_none());
        assert_eq!(value["quote"]["orderId"], "order-1");
        assert_eq!(value["quote"]["depositAmount"], "0.05");
    }

    #[test]
    fn test_quote_accepts_numeric_amounts() {
        // 交易所有时返回数字，有时返回字符串
        let json = r#"{
            "orderId": "o-2",
            "pair": "eth_btc",
            "deposit": "0xabc",
            "depositAmount": "2.5",
            "withdrawalAmount": 0.1,
            "quotedRate": "0.04",
            "minerFee": 0.0005,
            "expiration": 1500000000000
        }"#;

        let quote: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.withdrawal_amount, Decimal::from_str("0.1").unwrap());
        assert_eq!(quote.withdrawal, None);
        assert_eq!(quote.coin_pair(), Some(CoinPair::EthToBtc));
        assert!(quote.is_expired_at(1_500_000_000_001));
        assert!(!quote.is_expired_at(1_400_000_000_000));
    }

    #[test]
    fn test_unknown_pair_still_parses() {
        let mut quote = sample_quote();
        quote.pair = "eth_bch".into();
        let json = serde_json::to_string(&quote).unwrap();

        let parsed: Quote = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.coin_pair(), None);
    }
}
