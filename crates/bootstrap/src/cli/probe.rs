use ags_infra::{wait_for_port, ProbeTarget};

/// Wait for `host:port`; returns whether it became reachable.
pub async fn run(host: &str, port: u16, timeout_secs: u64) -> bool {
    let target = ProbeTarget::new(format!("{host}:{port}"), host, port, true);
    match wait_for_port(&target, timeout_secs).await {
        Ok(report) => {
            println!(
                "{host}:{port} ready after {} attempt(s), {:.1}s",
                report.attempts,
                report.elapsed.as_secs_f64()
            );
            true
        }
        Err(e) => {
            println!("{e}");
            false
        }
    }
}
