//!
//! # Initialization routines for the control plane
//!
//! One executor is started per managed cluster and kind it manages.
//! The apply pipeline shares the returned context.
//!
use tracing::info;

use kns_store::ResourceRepository;

use crate::controllers::ExecutorController;
use crate::controllers::acls::AclReconciler;
use crate::controllers::connectors::ConnectorReconciler;
use crate::controllers::topics::TopicReconciler;
use crate::core::SharedContext;

/// start the executors, white listed by `{cluster}-{kind}`
pub fn start_main_loop<R>(ctx: SharedContext<R>) -> SharedContext<R>
where
    R: ResourceRepository,
{
    let config = ctx.config();
    for cluster in &config.managed_clusters {
        let name = &cluster.name;
        info!(cluster = %name, read_only = cluster.read_only, "starting executors");

        if cluster.manage_topics {
            whitelist!(
                config,
                &format!("{name}-topic"),
                ExecutorController::start(ctx.clone(), TopicReconciler::new(ctx.clone(), name))
            );
        }
        if cluster.manage_connectors {
            whitelist!(
                config,
                &format!("{name}-connector"),
                ExecutorController::start(ctx.clone(), ConnectorReconciler::new(ctx.clone(), name))
            );
        }
        if cluster.manage_acls {
            whitelist!(
                config,
                &format!("{name}-acl"),
                ExecutorController::start(ctx.clone(), AclReconciler::new(ctx.clone(), name))
            );
        }
    }

    ctx
}
