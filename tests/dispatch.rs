//! End-to-end dispatch tests: selection order, forwarding, connection accounting.

use std::time::Duration;

use http_load_balancer::Strategy;
use reqwest::StatusCode;

mod common;

async fn three_backends() -> Vec<std::net::SocketAddr> {
    vec![
        common::start_mock_backend("b0").await,
        common::start_mock_backend("b1").await,
        common::start_mock_backend("b2").await,
    ]
}

async fn get_body(client: &reqwest::Client, url: &str) -> String {
    let res = client.get(url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.text().await.unwrap()
}

#[tokio::test]
async fn test_round_robin_cycles_in_order() {
    let lb = common::start_balancer(common::config_for(&three_backends().await)).await;
    let client = common::client();

    let mut order = Vec::new();
    for _ in 0..9 {
        order.push(get_body(&client, &lb.url("/")).await);
    }
    assert_eq!(order, ["b0", "b1", "b2", "b0", "b1", "b2", "b0", "b1", "b2"]);

    lb.stop().await;
}

#[tokio::test]
async fn test_round_robin_skips_backend_marked_dead() {
    let lb = common::start_balancer(common::config_for(&three_backends().await)).await;
    let client = common::client();

    assert_eq!(get_body(&client, &lb.url("/")).await, "b0");
    assert_eq!(get_body(&client, &lb.url("/")).await, "b1");

    lb.pool.backends()[1].set_alive(false);

    let mut order = Vec::new();
    for _ in 0..6 {
        order.push(get_body(&client, &lb.url("/")).await);
    }
    assert!(order.iter().all(|b| b != "b1"));
    assert_eq!(order, ["b2", "b0", "b2", "b2", "b0", "b2"]);

    lb.stop().await;
}

#[tokio::test]
async fn test_forwards_method_path_query_and_headers() {
    let echo = common::start_echo_backend().await;
    let lb = common::start_balancer(common::config_for(&[echo])).await;

    let res = common::client()
        .delete(lb.url("/some/path?x=1&y=two"))
        .header("x-trace", "abc")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let head = res.text().await.unwrap().to_lowercase();
    assert!(head.starts_with("delete /some/path?x=1&y=two http/1.1\r\n"), "got: {head}");
    assert!(head.contains("x-trace: abc\r\n"));
    assert!(head.contains("x-proxy: round-robin-load-balancer\r\n"));
    assert!(head.contains("x-forwarded-for: 127.0.0.1\r\n"));
    assert!(head.contains("x-request-id: "));
    assert!(head.contains(&format!("host: {}\r\n", lb.addr)));

    lb.stop().await;
}

#[tokio::test]
async fn test_passes_backend_status_through() {
    let failing = common::start_programmable_backend(|_head| async { (500, "boom".to_string()) }).await;
    let lb = common::start_balancer(common::config_for(&[failing])).await;

    let res = common::client().get(lb.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), "boom");

    // an HTTP error is not a transport failure
    assert!(lb.pool.backends()[0].is_alive());

    lb.stop().await;
}

#[tokio::test]
async fn test_least_connections_avoids_busy_backend() {
    let slow = common::start_programmable_backend(|_head| async {
        tokio::time::sleep(Duration::from_millis(600)).await;
        (200, "slow".to_string())
    })
    .await;
    let fast = common::start_mock_backend("fast").await;

    let mut config = common::config_for(&[slow, fast]);
    config.strategy = Strategy::LeastConnections;
    let lb = common::start_balancer(config).await;
    let client = common::client();

    // tie at zero: lowest index wins
    let url = lb.url("/");
    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.get(&url).send().await.unwrap().text().await.unwrap() }
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(lb.pool.backends()[0].connection_count(), 1);

    assert_eq!(get_body(&client, &lb.url("/")).await, "fast");
    assert_eq!(get_body(&client, &lb.url("/")).await, "fast");

    assert_eq!(pending.await.unwrap(), "slow");
    assert!(lb.pool.backends().iter().all(|b| b.connection_count() == 0));

    lb.stop().await;
}

#[tokio::test]
async fn test_connection_counts_return_to_zero_under_load() {
    let mut backends = three_backends().await;
    backends.push(common::unused_addr().await);

    let mut config = common::config_for(&backends);
    config.health_check.enabled = false;
    let lb = common::start_balancer(config).await;
    let client = common::client();

    let tasks: Vec<_> = (0..60)
        .map(|_| {
            let client = client.clone();
            let url = lb.url("/");
            tokio::spawn(async move { client.get(&url).send().await.map(|r| r.status()) })
        })
        .collect();

    for task in tasks {
        let status = task.await.unwrap().unwrap();
        assert!(status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE);
    }

    // the rotation reaches the unreachable backend at least once
    assert!(!lb.pool.backends()[3].is_alive());
    assert!(lb.pool.backends().iter().all(|b| b.connection_count() == 0));

    lb.stop().await;
}
