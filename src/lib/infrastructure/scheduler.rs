//! Periodic dispatch trigger

use std::{sync::Arc, time::Duration};

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn, Instrument};

use crate::domain::dispatch::DispatchService;

/// Scheduler configuration
#[derive(Clone, Debug, PartialEq, Eq, Parser)]
pub struct SchedulerConfig {
    /// Seconds between two dispatch cycles
    #[arg(long, env = "DISPATCH_INTERVAL_SECS", default_value = "10")]
    pub interval_secs: u64,
}

impl SchedulerConfig {
    /// The interval between two dispatch cycles
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Runs a dispatch cycle on every tick until shutdown is signalled
#[derive(Debug)]
pub struct DispatchWorker<D: DispatchService> {
    service: Arc<D>,
    interval: Duration,
}

impl<D: DispatchService> DispatchWorker<D> {
    /// Create a worker ticking every `interval`
    pub fn new(service: Arc<D>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Run until `shutdown` becomes `true` or its sender is dropped.
    ///
    /// A failed cycle is logged and the next tick runs as usual. A cycle still
    /// in flight when shutdown is signalled is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    info!("starting scheduled dispatch");

                    let cycle = self
                        .service
                        .run_cycle()
                        .instrument(tracing::info_span!("dispatch_cycle"));

                    tokio::select! {
                        result = cycle => match result {
                            Ok(report) => info!(
                                fetched = report.fetched,
                                committed = report.committed,
                                "dispatch cycle completed"
                            ),
                            Err(err) => error!(error = %err, "dispatch cycle failed"),
                        },
                        _ = shutdown.changed() => {
                            warn!("dispatch cycle cancelled by shutdown");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("dispatch worker shutting down");
    }
}
