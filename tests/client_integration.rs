//! End-to-end scenarios (spec.md §8) exercised against `OkxClient` with a
//! `mockito`-stubbed OKX REST surface. Wire-level retry/envelope behavior
//! (single HTTP call on envelope failure, back-off timing) already has
//! dedicated coverage in `transport.rs`'s own test module; these tests
//! cover the orchestration `OkxClient` layers on top.

use std::time::Duration;

use mockito::Server;
use okx_perp_client::{ClientConfig, OkxClient, PositionSide};
use rust_decimal_macros::dec;

fn client(base_url: String, ttl: Duration) -> OkxClient {
    let config = ClientConfig::new("key", "secret", "pass", false)
        .unwrap()
        .with_account_ttl(ttl);
    OkxClient::with_base_url(base_url, config)
}

#[tokio::test(start_paused = true)]
async fn open_long_btc_wire_sequence() {
    let mut server = Server::new_async().await;

    let _orders_pending = server
        .mock("GET", "/api/v5/trade/orders-pending?instId=BTC-USDT-SWAP")
        .with_status(200)
        .with_body(r#"{"code":"0","msg":"","data":[]}"#)
        .create_async()
        .await;
    let _algo_pending = server
        .mock(
            "GET",
            "/api/v5/trade/orders-algo-pending?instId=BTC-USDT-SWAP&ordType=conditional",
        )
        .with_status(200)
        .with_body(r#"{"code":"0","msg":"","data":[]}"#)
        .create_async()
        .await;
    let _positions = server
        .mock("GET", "/api/v5/account/positions")
        .with_status(200)
        .with_body(r#"{"code":"0","msg":"","data":[]}"#)
        .create_async()
        .await;
    let _set_leverage = server
        .mock("POST", "/api/v5/account/set-leverage")
        .with_status(200)
        .with_body(r#"{"code":"0","msg":"","data":[{"instId":"BTC-USDT-SWAP","lever":"10"}]}"#)
        .create_async()
        .await;
    let _instrument = server
        .mock("GET", "/api/v5/public/instruments?instType=SWAP&instId=BTC-USDT-SWAP")
        .with_status(200)
        .with_body(
            r#"{"code":"0","msg":"","data":[{"instId":"BTC-USDT-SWAP","lotSz":"1","tickSz":"0.1","minSz":"1","ctVal":"0.01","baseCcy":"BTC","quoteCcy":"USDT","instType":"SWAP","state":"live"}]}"#,
        )
        .create_async()
        .await;
    let order_mock = server
        .mock("POST", "/api/v5/trade/order")
        .with_status(200)
        .with_body(r#"{"code":"0","msg":"","data":[{"ordId":"stub-order-1","sCode":"0","sMsg":""}]}"#)
        .create_async()
        .await;

    let c = client(server.url(), Duration::from_secs(15));
    let result = c.open_long("BTCUSDT", dec!(0.873), 10).await.unwrap();

    assert_eq!(result.order_id, "stub-order-1");
    assert_eq!(result.symbol, "BTCUSDT");
    assert_eq!(result.status, "FILLED");
    order_mock.assert_async().await;
}

#[tokio::test]
async fn close_full_short_eth_reads_cached_position_amount() {
    let mut server = Server::new_async().await;

    let _positions = server
        .mock("GET", "/api/v5/account/positions")
        .with_status(200)
        .with_body(
            r#"{"code":"0","msg":"","data":[{"instId":"ETH-USDT-SWAP","pos":"-4","avgPx":"2000","markPx":"2010","upl":"40","lever":"10","margin":"800","notionalUsd":"8040","liqPx":"2500","mgnMode":"cross"}]}"#,
        )
        .create_async()
        .await;
    let _instrument = server
        .mock("GET", "/api/v5/public/instruments?instType=SWAP&instId=ETH-USDT-SWAP")
        .with_status(200)
        .with_body(
            r#"{"code":"0","msg":"","data":[{"instId":"ETH-USDT-SWAP","lotSz":"1","tickSz":"0.1","minSz":"1","ctVal":"0.01","baseCcy":"ETH","quoteCcy":"USDT","instType":"SWAP","state":"live"}]}"#,
        )
        .create_async()
        .await;
    let order_mock = server
        .mock("POST", "/api/v5/trade/order")
        .with_status(200)
        .with_body(r#"{"code":"0","msg":"","data":[{"ordId":"stub-order-2","sCode":"0","sMsg":""}]}"#)
        .create_async()
        .await;

    let c = client(server.url(), Duration::from_secs(15));

    let positions = c.positions().await.unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].side, PositionSide::Short);
    assert_eq!(positions[0].position_amt, dec!(4));

    let result = c.close_short("ETHUSDT", dec!(0)).await.unwrap();
    assert_eq!(result.order_id, "stub-order-2");
    order_mock.assert_async().await;
}

#[tokio::test(start_paused = true)]
async fn balance_cache_hit_then_expiry() {
    let mut server = Server::new_async().await;

    let balance_mock = server
        .mock("GET", "/api/v5/account/balance?ccy=USDT")
        .with_status(200)
        .with_body(
            r#"{"code":"0","msg":"","data":[{"details":[{"eq":"1000","upl":"50","availEq":"900"}]}]}"#,
        )
        .expect(2)
        .create_async()
        .await;

    let c = client(server.url(), Duration::from_secs(15));

    c.balance().await.unwrap();
    tokio::time::advance(Duration::from_secs(5)).await;
    c.balance().await.unwrap();
    tokio::time::advance(Duration::from_secs(11)).await;
    c.balance().await.unwrap();

    balance_mock.assert_async().await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_positions_miss_yields_consistent_cache() {
    let mut server = Server::new_async().await;

    let _positions = server
        .mock("GET", "/api/v5/account/positions")
        .with_status(200)
        .with_body(r#"{"code":"0","msg":"","data":[]}"#)
        .create_async()
        .await;

    let c = client(server.url(), Duration::from_secs(15));
    c.positions().await.unwrap();
    tokio::time::advance(Duration::from_secs(16)).await;

    let (a, b) = tokio::join!(c.positions(), c.positions());
    assert_eq!(a.unwrap(), b.unwrap());
    assert!(c.positions().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn set_leverage_already_set_message_is_treated_as_success() {
    let mut server = Server::new_async().await;

    let _positions = server
        .mock("GET", "/api/v5/account/positions")
        .with_status(200)
        .with_body(r#"{"code":"0","msg":"","data":[]}"#)
        .create_async()
        .await;
    let leverage_mock = server
        .mock("POST", "/api/v5/account/set-leverage")
        .with_status(200)
        .with_body(r#"{"code":"59000","msg":"leverage already set to target value","data":[]}"#)
        .expect(1)
        .create_async()
        .await;

    let c = client(server.url(), Duration::from_secs(15));
    c.set_leverage("BTCUSDT", 10).await.unwrap();
    leverage_mock.assert_async().await;
}

#[tokio::test]
async fn envelope_failure_surfaces_without_retry_at_client_level() {
    let mut server = Server::new_async().await;

    let balance_mock = server
        .mock("GET", "/api/v5/account/balance?ccy=USDT")
        .with_status(200)
        .with_body(r#"{"code":"51000","msg":"param error","data":[]}"#)
        .expect(1)
        .create_async()
        .await;

    let c = client(server.url(), Duration::from_secs(15));
    let err = c.balance().await.unwrap_err();
    assert_eq!(err.to_string(), "OKX API error [51000]: param error");
    balance_mock.assert_async().await;
}
