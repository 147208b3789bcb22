use std::fmt;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument};

use fluvio_future::task::spawn;
use fluvio_future::timer::sleep;

use kns_store::ResourceRepository;

use crate::core::SharedContext;

use super::Ticker;

/// outcome of one reconciliation cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    /// resource => remote error or refused change
    pub failed: Vec<(String, String)>,
    /// present on the cluster, absent from desired state
    pub unsynchronized: Vec<String>,
    /// cluster is read only, nothing was written
    pub planned_only: bool,
}

impl CycleReport {
    pub fn failures(&self) -> usize {
        self.failed.len()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created: {}, updated: {}, failed: {}, unsynchronized: {}{}",
            self.created.len(),
            self.updated.len(),
            self.failed.len(),
            self.unsynchronized.len(),
            if self.planned_only { " (planned only)" } else { "" }
        )
    }
}

/// One reconciliation scope: a kind on a managed cluster
#[async_trait]
pub trait Executor: fmt::Debug + Send + Sync + 'static {
    fn name(&self) -> String;

    /// a failure on a single resource is reported, not returned
    async fn run_cycle(&self) -> anyhow::Result<CycleReport>;
}

/// Runs an executor on the configured interval
#[derive(Debug)]
pub struct ExecutorController<E, R> {
    ctx: SharedContext<R>,
    executor: E,
}

impl<E, R> ExecutorController<E, R>
where
    E: Executor,
    R: ResourceRepository,
{
    pub fn start(ctx: SharedContext<R>, executor: E) {
        let controller = Self { ctx, executor };
        spawn(controller.dispatch_loop());
    }

    #[instrument(skip(self), fields(executor = %self.executor.name()))]
    async fn dispatch_loop(self) {
        let name = self.executor.name();
        self.ctx.executors().register(&name).await;
        info!("started");
        loop {
            match self.inner_loop().await {
                Ok(()) => {
                    info!("terminated");
                    break;
                }
                Err(err) => {
                    error!("error with inner loop: {:#?}", err);
                    let wait = self.ctx.config().executor.interval;
                    debug!("sleeping {:?} try again", wait);
                    sleep(wait).await;
                }
            }
        }
    }

    async fn inner_loop(&self) -> anyhow::Result<()> {
        use tokio::select;

        let name = self.executor.name();
        let shutdown = self.ctx.shutdown_event();
        let mut ticker = Ticker::new(self.ctx.config().executor.interval);

        loop {
            if shutdown.is_set() {
                return Ok(());
            }

            select! {
                skipped = ticker.tick() => {
                    if skipped > 0 {
                        debug!(skipped, "previous cycle outlived its interval");
                    }
                },
                _ = shutdown.listen() => {
                    debug!("shutdown requested");
                    return Ok(());
                }
            }

            self.ctx.executors().cycle_started(&name).await;
            match self.executor.run_cycle().await {
                Ok(report) => {
                    debug!(%report, "cycle done");
                    self.ctx
                        .executors()
                        .cycle_ended(&name, report.failures())
                        .await;
                }
                Err(err) => {
                    self.ctx
                        .executors()
                        .cycle_failed(&name, err.to_string())
                        .await;
                    return Err(err);
                }
            }
        }
    }
}
