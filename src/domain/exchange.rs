//! 交易所网关的请求 / 响应类型（不落盘）

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::coin_pair::CoinPair;
use crate::domain::trade::{Quote, TradeState};

/// 交易对行情与限额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInfo {
    pub pair: String,
    pub rate: Decimal,
    /// 单笔存入上限
    pub limit: Decimal,
    /// 单笔存入下限
    #[serde(alias = "min")]
    pub minimum: Decimal,
    pub miner_fee: Decimal,
    #[serde(default)]
    pub max_limit: Option<Decimal>,
}

/// 报价金额：按存入量或按取出量，二选一
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteAmount {
    Deposit(Decimal),
    Withdrawal(Decimal),
}

/// 报价请求
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub pair: CoinPair,
    pub amount: QuoteAmount,
    /// 取出地址，正式报价必填，预估报价可省略
    pub withdrawal: Option<String>,
    /// 失败退款地址
    pub return_address: Option<String>,
}

impl QuoteRequest {
    pub fn new(pair: CoinPair, amount: QuoteAmount) -> Self {
        Self {
            pair,
            amount,
            withdrawal: None,
            return_address: None,
        }
    }

    pub fn with_withdrawal(mut self, address: impl Into<String>) -> Self {
        self.withdrawal = Some(address.into());
        self
    }

    pub fn with_return_address(mut self, address: impl Into<String>) -> Self {
        self.return_address = Some(address.into());
        self
    }
}

/// 报价结果：要么报价，要么交易所给出的业务拒绝原因
///
/// 业务拒绝（金额超限、地址无效等）是正常结果，不是传输错误，调用方可直接展示。
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    Quoted(Quote),
    Rejected { message: String },
}

impl QuoteOutcome {
    pub fn is_quoted(&self) -> bool {
        matches!(self, Self::Quoted(_))
    }

    pub fn quote(&self) -> Option<&Quote> {
        match self {
            Self::Quoted(quote) => Some(quote),
            Self::Rejected { .. } => None,
        }
    }

    pub fn rejection(&self) -> Option<&str> {
        match self {
            Self::Quoted(_) => None,
            Self::Rejected { message } => Some(message),
        }
    }

    pub fn into_result(self) -> Result<Quote, String> {
        match self {
            Self::Quoted(quote) => Ok(quote),
            Self::Rejected { message } => Err(message),
        }
    }
}

/// 交易状态查询结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeStatusResponse {
    pub status: TradeState,
    /// 存入地址，error 状态下交易所可能省略
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub withdraw: Option<String>,
    #[serde(default)]
    pub incoming_coin: Option<Decimal>,
    #[serde(default)]
    pub incoming_type: Option<String>,
    #[serde(default)]
    pub outgoing_coin: Option<Decimal>,
    #[serde(default)]
    pub outgoing_type: Option<String>,
    /// 取出交易哈希
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
