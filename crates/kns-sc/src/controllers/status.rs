use tracing::{debug, trace};

use kns_metadata::core::Resource;
use kns_metadata::extended::SpecExt;
use kns_store::{Precondition, ResourceRepository};

use crate::Result;

/// Write an observed status unless it has the same outcome as the stored one.
/// The write is skipped when the resource changed since it was listed, the
/// next cycle sees the new revision.
pub async fn update_status<S, R, F>(
    repo: &R,
    resource: &Resource<S>,
    status: S::Status,
    same_outcome: F,
) -> Result<bool>
where
    S: SpecExt,
    R: ResourceRepository,
    F: Fn(&S::Status, &S::Status) -> bool,
{
    if let Some(current) = &resource.status {
        if same_outcome(current, &status) {
            trace!(name = %resource.name(), "status unchanged");
            return Ok(false);
        }
    }

    let updated = resource.clone().with_status(status);
    match repo
        .put(updated, Precondition::Revision(resource.revision()))
        .await
    {
        Ok(_) => Ok(true),
        Err(err) if err.is_conflict() => {
            debug!(kind = S::LABEL, name = %resource.name(), "changed during cycle, status deferred");
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}
