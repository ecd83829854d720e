//! A port that starts listening after `k` seconds is detected within `k + 1`.

use std::time::{Duration, Instant};

use ags_infra::{wait_for_port, ProbeTarget};
use tokio::net::TcpListener;

#[tokio::test]
async fn late_listener_detected_within_one_extra_second() {
    let reserve = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = reserve.local_addr().unwrap().port();
    drop(reserve);

    let k = Duration::from_secs(2);
    let server = tokio::spawn(async move {
        tokio::time::sleep(k).await;
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        // Keep accepting until the probe is done.
        loop {
            let _ = listener.accept().await;
        }
    });

    let start = Instant::now();
    let report = wait_for_port(&ProbeTarget::new("late", "127.0.0.1", port, true), 10)
        .await
        .unwrap();
    let elapsed = start.elapsed();
    server.abort();

    assert!(report.ready);
    assert!(elapsed + Duration::from_millis(100) >= k, "ready before the listener existed: {elapsed:?}");
    assert!(elapsed <= k + Duration::from_millis(1500), "too slow: {elapsed:?}");
    assert!(report.attempts >= 3);
}
