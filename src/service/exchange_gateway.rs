//! 交易所 REST API 网关
//!
//! 无状态：每个方法对应一次 HTTP 请求，不缓存、不重试。

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::config::ExchangeApiConfig;
use crate::domain::{
    CoinPair, MarketInfo, Quote, QuoteAmount, QuoteOutcome, QuoteRequest, TradeStatusResponse,
};
use crate::error::{GatewayError, Result, TradeSyncError};

/// 报价请求体
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteBody<'a> {
    pair: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    deposit_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    withdrawal_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    withdrawal: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

impl<'a> QuoteBody<'a> {
    fn new(request: &'a QuoteRequest, api_key: Option<&'a str>) -> Self {
        let (deposit_amount, withdrawal_amount) = match request.amount {
            QuoteAmount::Deposit(amount) => (Some(amount), None),
            QuoteAmount::Withdrawal(amount) => (None, Some(amount)),
        };

        Self {
            pair: request.pair.pair_code(),
            deposit_amount,
            withdrawal_amount,
            withdrawal: request.withdrawal.as_deref(),
            return_address: request.return_address.as_deref(),
            api_key,
        }
    }
}

/// 交易所网关
pub struct ExchangeGateway {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ExchangeGateway {
    pub fn new(config: &ExchangeApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TradeSyncError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// 获取交易对汇率与限额
    pub async fn get_rate(&self, pair: CoinPair) -> Result<MarketInfo> {
        let url = format!("{}/marketinfo/{}", self.base_url, pair.pair_code());
        let body = send(self.client.get(&url)).await?;
        let info: MarketInfo = decode_or_reject(body, "rate")?;

        tracing::debug!(pair = %pair, rate = %info.rate, "Fetched market info");
        Ok(info)
    }

    /// 获取正式报价（锁定汇率，返回存入地址与订单号）
    pub async fn get_quote(&self, request: &QuoteRequest) -> Result<QuoteOutcome> {
        self.post_quote("sendamount", request).await
    }

    /// 获取预估报价（不锁定汇率）
    pub async fn get_approximate_quote(&self, request: &QuoteRequest) -> Result<QuoteOutcome> {
        self.post_quote("quote", request).await
    }

    /// 按存入地址查询交易状态
    pub async fn get_trade_status(&self, deposit_address: &str) -> Result<TradeStatusResponse> {
        let url = format!("{}/txStat/{}", self.base_url, deposit_address);
        let body = send(self.client.get(&url)).await?;
        let status: TradeStatusResponse = decode_or_reject(body, "status")?;

        tracing::debug!(
            address = %deposit_address,
            status = status.status.as_str(),
            "Fetched trade status"
        );
        Ok(status)
    }

    async fn post_quote(&self, endpoint: &str, request: &QuoteRequest) -> Result<QuoteOutcome> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let body = QuoteBody::new(request, self.api_key.as_deref());
        let response = send(self.client.post(&url).json(&body)).await?;

        let outcome = quote_outcome(response)?;
        match &outcome {
            QuoteOutcome::Quoted(quote) => {
                tracing::debug!(pair = %request.pair, endpoint, order_id = %quote.order_id, "Quote received");
            }
            QuoteOutcome::Rejected { message } => {
                tracing::info!(pair = %request.pair, endpoint, reason = %message, "Quote rejected by exchange");
            }
        }

        Ok(outcome)
    }
}

async fn send(request: RequestBuilder) -> Result<Value, GatewayError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("无法读取错误响应: {}", e));
        tracing::warn!(status = status.as_u16(), "Exchange API returned error status");
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| GatewayError::Malformed(e.to_string()))
}

/// 缺少必需字段且带 `error` 时视为交易所拒绝，否则按目标类型解析
fn decode_or_reject<R: DeserializeOwned>(body: Value, required: &str) -> Result<R, GatewayError> {
    if body.get(required).is_none() {
        if let Some(error) = body.get("error") {
            return Err(GatewayError::Rejected(error_message(error)));
        }
    }

    serde_json::from_value(body).map_err(|e| GatewayError::Malformed(e.to_string()))
}

/// `error` 字段优先；两者都没有视为格式错误
fn quote_outcome(mut body: Value) -> Result<QuoteOutcome, GatewayError> {
    if let Some(error) = body.get("error") {
        return Ok(QuoteOutcome::Rejected {
            message: error_message(error),
        });
    }

    match body.get_mut("success").map(Value::take) {
        Some(success) => serde_json::from_value::<Quote>(success)
            .map(QuoteOutcome::Quoted)
            .map_err(|e| GatewayError::Malformed(e.to_string())),
        None => Err(GatewayError::Malformed(
            "Quote response has neither success nor error".into(),
        )),
    }
}

fn error_message(error: &Value) -> String {
    match error.as_str() {
        Some(message) => message.to_string(),
        None => error.to_string(),
    }
}
