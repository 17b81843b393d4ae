use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Caption rendered under the reading.
pub const CPU_LABEL: &str = "CPU %";

/// Delay between sampler ticks.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(2500);

/// Where the sampler pushes rendered readings. Implemented by
/// `DeviceSession`; tests substitute a simulated panel.
pub trait MetricTarget {
    fn is_open(&self) -> bool;

    fn push_metric(
        &self,
        key: u8,
        value: f32,
        label: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Periodic metric loop: sample, render, push, sleep. Runs until the target
/// closes or the token fires. The open/cancel check sits at the top of every
/// iteration, so it also runs right after each wake-up; a failed push only
/// costs that tick.
pub async fn run_sampler<T: MetricTarget + Send + Sync>(
    target: T,
    key: u8,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut cpu = CpuSampler::default();

    loop {
        if cancel.is_cancelled() || !target.is_open() {
            break;
        }

        let value = cpu.sample();
        if let Err(e) = target.push_metric(key, value, CPU_LABEL).await {
            warn!("metric push failed, skipping tick: {e}");
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }

    debug!("metric sampler stopped");
}

/// CPU busy-percentage sampler over `/proc/stat`.
///
/// The first call and any read failure yield 0.0 so a tick never aborts the
/// loop (off-Linux hosts simply show zero).
#[derive(Default)]
pub struct CpuSampler {
    prev: Option<CpuCounters>,
}

#[derive(Clone, Copy)]
struct CpuCounters {
    idle: u64,
    total: u64,
}

impl CpuSampler {
    /// Busy percentage since the previous call.
    pub fn sample(&mut self) -> f32 {
        match read_proc_stat() {
            Some(now) => self.update(now),
            None => 0.0,
        }
    }

    fn update(&mut self, now: CpuCounters) -> f32 {
        let value = match self.prev {
            Some(prev) if now.total > prev.total => {
                let total = (now.total - prev.total) as f32;
                let idle = now.idle.saturating_sub(prev.idle) as f32;
                100.0 * (1.0 - idle / total)
            }
            _ => 0.0,
        };
        self.prev = Some(now);
        value
    }
}

fn read_proc_stat() -> Option<CpuCounters> {
    let content = std::fs::read_to_string("/proc/stat").ok()?;
    parse_cpu_line(content.lines().next()?)
}

/// Parse the aggregate "cpu" line. Idle time counts the idle and iowait
/// columns; total counts every column present.
fn parse_cpu_line(line: &str) -> Option<CpuCounters> {
    let mut fields = line.split_whitespace();
    if fields.next()? != "cpu" {
        return None;
    }

    let values: Vec<u64> = fields.filter_map(|f| f.parse().ok()).collect();
    if values.len() < 4 {
        return None;
    }

    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    let total = values.iter().sum();
    Some(CpuCounters { idle, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn parse_aggregate_cpu_line() {
        let c = parse_cpu_line("cpu  100 0 50 800 40 0 10 0 0 0").unwrap();
        assert_eq!(c.idle, 840);
        assert_eq!(c.total, 1000);
    }

    #[test]
    fn reject_per_core_and_garbage_lines() {
        assert!(parse_cpu_line("cpu0 100 0 50 800").is_none());
        assert!(parse_cpu_line("intr 12345").is_none());
        assert!(parse_cpu_line("cpu 1 2").is_none());
    }

    #[test]
    fn first_sample_is_zero_then_delta() {
        let mut sampler = CpuSampler::default();
        assert_eq!(
            sampler.update(CpuCounters {
                idle: 800,
                total: 1000
            }),
            0.0
        );
        // 600 of the next 1000 jiffies idle -> 40% busy.
        let busy = sampler.update(CpuCounters {
            idle: 1400,
            total: 2000,
        });
        assert!((busy - 40.0).abs() < 0.01);
    }

    #[test]
    fn stalled_counters_read_as_zero() {
        let mut sampler = CpuSampler::default();
        sampler.update(CpuCounters {
            idle: 800,
            total: 1000,
        });
        assert_eq!(
            sampler.update(CpuCounters {
                idle: 800,
                total: 1000
            }),
            0.0
        );
    }

    /// Simulated panel: reports open for a fixed number of checks, counts pushes.
    struct SimPanel {
        open_checks: AtomicUsize,
        pushes: AtomicUsize,
    }

    impl SimPanel {
        fn new(open_for: usize) -> Arc<Self> {
            Arc::new(Self {
                open_checks: AtomicUsize::new(open_for),
                pushes: AtomicUsize::new(0),
            })
        }
    }

    impl MetricTarget for Arc<SimPanel> {
        fn is_open(&self) -> bool {
            self.open_checks
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1))
                .is_ok()
        }

        async fn push_metric(&self, _key: u8, _value: f32, _label: &str) -> Result<()> {
            self.pushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn sampler_pushes_once_per_open_interval_then_stops() {
        let panel = SimPanel::new(3);
        run_sampler(
            panel.clone(),
            7,
            Duration::from_millis(5),
            CancellationToken::new(),
        )
        .await;
        assert_eq!(panel.pushes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn closed_panel_is_never_pushed_to() {
        let panel = SimPanel::new(0);
        run_sampler(
            panel.clone(),
            7,
            Duration::from_millis(5),
            CancellationToken::new(),
        )
        .await;
        assert_eq!(panel.pushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop_without_further_pushes() {
        let panel = SimPanel::new(usize::MAX);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_sampler(
            panel.clone(),
            7,
            Duration::from_secs(60),
            cancel.clone(),
        ));

        while panel.pushes.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(panel.pushes.load(Ordering::SeqCst), 1);
    }
}
