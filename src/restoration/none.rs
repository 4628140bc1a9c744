use super::{RestorationPolicy, RestoreOps, RestoreOutcome};
use crate::service::Service;

/// Do-Not-Restore: every disrupted service is sealed, never re-provisioned.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoNotRestore;

impl RestorationPolicy for DoNotRestore {
    fn name(&self) -> &'static str {
        "DNR"
    }

    fn restore(&self, _service: &Service, _ops: RestoreOps<'_>) -> RestoreOutcome {
        RestoreOutcome::NotRestored
    }
}
