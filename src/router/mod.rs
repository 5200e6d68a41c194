//! Broadcast/multicast recipient selection
//!
//! Pure routing logic shared by the control channel and the media relays.
//! Operates on a registry snapshot; performing the sends (and the per-send
//! failure handling) belongs to the dispatcher.

use std::sync::Arc;

use crate::registry::ParticipantSession;

/// Select delivery targets for a message.
///
/// An empty `to_names` is a broadcast: every session in the snapshot except
/// the sender. A non-empty `to_names` is a multicast: only sessions named in
/// it, with unknown names silently skipped — client-side participant lists
/// may be stale by the time delivery happens. The sender is never a
/// recipient of its own message.
pub fn select_recipients(
    snapshot: &[Arc<ParticipantSession>],
    from_name: &str,
    to_names: &[String],
) -> Vec<Arc<ParticipantSession>> {
    snapshot
        .iter()
        .filter(|session| session.name() != from_name)
        .filter(|session| {
            to_names.is_empty() || to_names.iter().any(|name| name == session.name())
        })
        .cloned()
        .collect()
}
