//! TCP readiness probing.
//!
//! One connection attempt per second until the port accepts or the budget
//! runs out. Each attempt carries its own connect timeout so a port that
//! silently drops SYNs cannot stretch the loop past its budget.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::Instant;

use ags_domain::error::{Error, Result};
use ags_domain::trace::TraceEvent;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A named endpoint to wait for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Failure to become ready aborts the run.
    pub critical: bool,
}

impl ProbeTarget {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16, critical: bool) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub ready: bool,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Single connection attempt.
pub async fn is_port_open(host: &str, port: u16, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

/// Poll `target` once per second until it accepts a TCP connection.
///
/// Fails with [`Error::NotReady`] when no attempt succeeds within
/// `timeout_secs`. Whether that is fatal is the caller's decision.
pub async fn wait_for_port(target: &ProbeTarget, timeout_secs: u64) -> Result<ProbeReport> {
    let start = Instant::now();
    let deadline = start + Duration::from_secs(timeout_secs);
    let mut attempts = 0u32;

    tracing::info!(
        name = %target.name,
        host = %target.host,
        port = target.port,
        timeout_secs,
        "waiting for port"
    );

    loop {
        attempts += 1;
        let tick = Instant::now();
        let attempt_timeout = POLL_INTERVAL
            .min(deadline.saturating_duration_since(tick))
            .max(Duration::from_millis(100));

        if is_port_open(&target.host, target.port, attempt_timeout).await {
            let elapsed = start.elapsed();
            TraceEvent::PortReady {
                name: target.name.clone(),
                host: target.host.clone(),
                port: target.port,
                attempts,
                elapsed_ms: elapsed.as_millis() as u64,
            }
            .emit();
            return Ok(ProbeReport {
                name: target.name.clone(),
                host: target.host.clone(),
                port: target.port,
                ready: true,
                attempts,
                elapsed,
            });
        }

        let next = tick + POLL_INTERVAL;
        if next > deadline {
            tracing::warn!(
                name = %target.name,
                port = target.port,
                attempts,
                "port never became ready"
            );
            return Err(Error::NotReady {
                name: target.name.clone(),
                host: target.host.clone(),
                port: target.port,
                timeout_secs,
            });
        }
        tokio::time::sleep_until(next).await;
    }
}

/// Probe every target in order. The first critical failure is returned as
/// an error; non-critical failures are logged and reported with
/// `ready == false`.
pub async fn probe_all(targets: &[ProbeTarget], timeout_secs: u64) -> Result<Vec<ProbeReport>> {
    let mut reports = Vec::with_capacity(targets.len());
    for target in targets {
        let started = Instant::now();
        match wait_for_port(target, timeout_secs).await {
            Ok(report) => reports.push(report),
            Err(e) if !target.critical => {
                tracing::warn!(name = %target.name, error = %e, "optional service not ready, continuing");
                reports.push(ProbeReport {
                    name: target.name.clone(),
                    host: target.host.clone(),
                    port: target.port,
                    ready: false,
                    attempts: 0,
                    elapsed: started.elapsed(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn free_port() -> u16 {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn open_port_is_ready_on_first_attempt() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let report = wait_for_port(&ProbeTarget::new("svc", "127.0.0.1", port, true), 5)
            .await
            .unwrap();
        assert!(report.ready);
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test]
    async fn closed_port_fails_at_budget() {
        let port = free_port().await;
        let start = std::time::Instant::now();

        let err = wait_for_port(&ProbeTarget::new("ghost", "127.0.0.1", port, true), 2)
            .await
            .unwrap_err();

        let elapsed = start.elapsed();
        assert!(matches!(err, Error::NotReady { ref name, timeout_secs: 2, .. } if name == "ghost"));
        assert!(elapsed >= Duration::from_secs(1), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(4), "{elapsed:?}");
    }

    #[tokio::test]
    async fn zero_budget_makes_a_single_attempt() {
        let port = free_port().await;
        let err = wait_for_port(&ProbeTarget::new("none", "127.0.0.1", port, true), 0).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn probe_all_tolerates_optional_failures() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let up = listener.local_addr().unwrap().port();
        let down = free_port().await;

        let reports = probe_all(
            &[
                ProbeTarget::new("db", "127.0.0.1", up, true),
                ProbeTarget::new("objects", "127.0.0.1", down, false),
            ],
            1,
        )
        .await
        .unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports[0].ready);
        assert!(!reports[1].ready);
    }

    #[tokio::test]
    async fn probe_all_stops_at_critical_failure() {
        let down = free_port().await;
        let err = probe_all(&[ProbeTarget::new("cache", "127.0.0.1", down, true)], 1)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("cache not reachable"));
    }
}
