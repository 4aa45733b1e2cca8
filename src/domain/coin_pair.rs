//! 支持的交易对
//!
//! 封闭集合，扩展时新增枚举成员并补上 wire code。

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoinPair {
    #[serde(rename = "btc_eth")]
    BtcToEth,
    #[serde(rename = "eth_btc")]
    EthToBtc,
}

impl CoinPair {
    pub const ALL: [CoinPair; 2] = [CoinPair::BtcToEth, CoinPair::EthToBtc];

    /// 交易所 API 使用的交易对代码
    pub fn pair_code(&self) -> &'static str {
        match self {
            Self::BtcToEth => "btc_eth",
            Self::EthToBtc => "eth_btc",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|pair| pair.pair_code().eq_ignore_ascii_case(code))
    }

    /// 反向交易对
    pub fn inverse(&self) -> Self {
        match self {
            Self::BtcToEth => Self::EthToBtc,
            Self::EthToBtc => Self::BtcToEth,
        }
    }

    /// 存入币种
    pub fn deposit_coin(&self) -> &'static str {
        match self {
            Self::BtcToEth => "btc",
            Self::EthToBtc => "eth",
        }
    }

    /// 取出币种
    pub fn withdrawal_coin(&self) -> &'static str {
        self.inverse().deposit_coin()
    }
}

impl fmt::Display for CoinPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pair_code())
    }
}
