use super::{same_dc_alternatives, RestorationPolicy, RestoreOps, RestoreOutcome};
use crate::service::Service;

/// Path-Restoration: try to find a viable path back to the service's
/// existing destination; seal it if none exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathRestoration;

impl RestorationPolicy for PathRestoration {
    fn name(&self) -> &'static str {
        "PR"
    }

    fn restore(&self, service: &Service, ops: RestoreOps<'_>) -> RestoreOutcome {
        let alternatives = same_dc_alternatives(service, &ops);
        match alternatives.into_iter().min_by_key(|p| p.hop_count()) {
            Some(path) => RestoreOutcome::Restored {
                path: path.clone(),
                relocated: false,
            },
            None => RestoreOutcome::NotRestored,
        }
    }
}
