//! `lantern watch`: redraw the status panel on a timer until Ctrl+C.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::snapshot::VmSnapshot;
use crate::domain::snapshot_collector::SnapshotCollector;
use crate::multipass::{Multipass, VmTool};

use super::status::{print_table, StatusView};

pub fn run(cfg: Config, interval_secs: Option<u64>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(cfg, interval_secs))
}

async fn run_async(cfg: Config, interval_secs: Option<u64>) -> Result<()> {
    let secs = interval_secs.unwrap_or(cfg.refresh_interval_secs).max(1);
    let collector = SnapshotCollector::from_config(Multipass::from_config(&cfg), &cfg);

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => debug!("received Ctrl+C, leaving watch"),
            Err(e) => {
                warn!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    watch_loop(&collector, Duration::from_secs(secs), shutdown, |snapshot| {
        // Clear screen and home the cursor.
        print!("\x1b[2J\x1b[H");
        print_table(&StatusView::new(snapshot));
        println!();
        println!(
            "{} Refreshing every {}s. Ctrl+C to exit.",
            "::".blue().bold(),
            secs
        );
    })
    .await;

    Ok(())
}

/// Collect and render on every tick until `shutdown` resolves, including
/// while a collection is in flight. Returns the number of frames drawn.
async fn watch_loop<T, S, R>(
    collector: &SnapshotCollector<T>,
    period: Duration,
    shutdown: S,
    mut render: R,
) -> usize
where
    T: VmTool,
    S: Future<Output = ()>,
    R: FnMut(&VmSnapshot),
{
    // Delay: a slow collection pushes the next tick back instead of bunching ticks up.
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut frames = 0;
    loop {
        let snapshot = tokio::select! {
            _ = &mut shutdown => break,
            snapshot = async {
                interval.tick().await;
                collector.collect().await
            } => snapshot,
        };
        render(&snapshot);
        frames += 1;
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentSettings, TimeoutConfig};
    use crate::multipass::ToolError;

    /// `info` takes `delay` and then fails, so the VM reads as not found.
    struct SlowVm {
        delay: Duration,
    }

    impl VmTool for SlowVm {
        async fn info(&self) -> Result<String, ToolError> {
            tokio::time::sleep(self.delay).await;
            Err(ToolError::Failed {
                program: "multipass".into(),
                status: "status 1".into(),
                stderr: String::new(),
            })
        }

        async fn exec(&self, _argv: &[&str], _timeout: Duration) -> Result<String, ToolError> {
            Ok(String::new())
        }
    }

    fn collector(delay: Duration) -> SnapshotCollector<SlowVm> {
        SnapshotCollector::new(
            SlowVm { delay },
            "agent",
            AgentSettings::default(),
            TimeoutConfig::default(),
        )
    }

    #[tokio::test]
    async fn shutdown_interrupts_a_slow_collection() {
        let c = collector(Duration::from_secs(60));
        let shutdown = tokio::time::sleep(Duration::from_millis(50));

        let frames = tokio::time::timeout(
            Duration::from_secs(5),
            watch_loop(&c, Duration::from_secs(1), shutdown, |_| {}),
        )
        .await
        .expect("watch loop should stop while collecting");
        assert_eq!(frames, 0);
    }

    #[tokio::test]
    async fn renders_each_tick_until_shutdown() {
        let c = collector(Duration::ZERO);
        let shutdown = tokio::time::sleep(Duration::from_millis(120));

        let mut seen = Vec::new();
        let frames = watch_loop(&c, Duration::from_millis(10), shutdown, |s| {
            seen.push(s.name.clone())
        })
        .await;

        assert!(frames >= 2, "only {frames} frames drawn");
        assert_eq!(seen.len(), frames);
        assert!(seen.iter().all(|name| name == "agent"));
    }
}
