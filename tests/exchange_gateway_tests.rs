//! 交易所网关集成测试

mod common;

use common::*;
use ironshift::prelude::*;
use ironshift::ErrorCode;
use mockito::Matcher;
use serde_json::json;

#[tokio::test]
async fn test_quote_then_record_trade() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/sendamount")
        .match_body(Matcher::PartialJson(json!({
            "pair": "eth_btc",
            "depositAmount": "1.5"
        })))
        .with_status(200)
        .with_body(
            json!({
                "success": {
                    "orderId": "order-1",
                    "pair": "eth_btc",
                    "withdrawal": "1BoatSLRHtKNngkdXEeobR76b53LETtpyT",
                    "withdrawalAmount": "0.06",
                    "deposit": "0x1f9090aaE28b8a3dCeaDf281B0F12828e676c326",
                    "depositAmount": "1.5",
                    "expiration": 1_500_000_600_000i64,
                    "quotedRate": "0.04",
                    "minerFee": "0.0005"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let state = AppState::offline(test_config("https://metadata.example.com", &server.url())).unwrap();
    state.trades.initialize(&test_master_key()).await.unwrap();

    let request = QuoteRequest::new(CoinPair::EthToBtc, QuoteAmount::Deposit(dec("1.5")))
        .with_withdrawal("1BoatSLRHtKNngkdXEeobR76b53LETtpyT");
    let quote = state
        .exchange
        .get_quote(&request)
        .await
        .unwrap()
        .into_result()
        .unwrap();

    state
        .trades
        .append_trade(Trade::new(quote).with_timestamp(1_500_000_000_000))
        .await
        .unwrap();

    let trades = state.trades.list_trades().unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].status, TradeState::NoDeposits);
    assert_eq!(
        trades[0].deposit_address(),
        "0x1f9090aaE28b8a3dCeaDf281B0F12828e676c326"
    );
}

#[tokio::test]
async fn test_quote_outcome_is_exclusive() {
    let mut server = mockito::Server::new_async().await;
    let bodies = [
        json!({ "error": "Invalid withdrawal address" }),
        json!({ "error": "Rate expired", "success": { "pair": "btc_eth" } }),
    ];

    for body in bodies {
        let mock = server
            .mock("POST", "/quote")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let state = AppState::offline(test_config("https://metadata.example.com", &server.url()))
            .unwrap();
        let request = QuoteRequest::new(CoinPair::BtcToEth, QuoteAmount::Deposit(dec("0.1")));
        let outcome = state.exchange.get_approximate_quote(&request).await.unwrap();

        assert!(!outcome.is_quoted());
        assert!(outcome.quote().is_none());
        assert!(outcome.rejection().is_some());

        mock.remove_async().await;
    }
}

#[tokio::test]
async fn test_rate_for_every_pair() {
    let mut server = mockito::Server::new_async().await;
    for pair in CoinPair::ALL {
        server
            .mock("GET", format!("/marketinfo/{}", pair.pair_code()).as_str())
            .with_status(200)
            .with_body(
                json!({
                    "pair": pair.pair_code(),
                    "rate": "1.0",
                    "limit": "10",
                    "min": "0.01",
                    "minerFee": "0.001"
                })
                .to_string(),
            )
            .create_async()
            .await;
    }

    let state = AppState::offline(test_config("https://metadata.example.com", &server.url())).unwrap();
    for pair in CoinPair::ALL {
        let info = state.exchange.get_rate(pair).await.unwrap();
        assert_eq!(info.pair, pair.pair_code());
        assert_eq!(info.minimum, dec("0.01"));
    }
}

#[tokio::test]
async fn test_trade_status_unknown_address() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/txStat/1unknown")
        .with_status(200)
        .with_body(r#"{"error":"Unknown address"}"#)
        .create_async()
        .await;

    let state = AppState::offline(test_config("https://metadata.example.com", &server.url())).unwrap();
    let err = state
        .exchange
        .get_trade_status("1unknown")
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::GatewayRejected);
    assert!(!err.is_retryable());
}
