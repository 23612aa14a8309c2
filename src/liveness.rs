//! Node liveness derivation.
//!
//! A node counts as active while its most recent signing happened within a
//! fixed window. The tail loop re-evaluates this on every iteration, so the
//! gauge decays to zero within one polling interval of the window elapsing.

use std::time::{Duration, Instant};

/// Window within which a signing keeps a node marked active.
pub const ACTIVE_WINDOW: Duration = Duration::from_secs(600);

/// Returns true if the node signed within `window` of `now`.
pub fn is_active(last_signing: Option<Instant>, now: Instant, window: Duration) -> bool {
    match last_signing {
        Some(last) => now.duration_since(last) < window,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_signed_is_inactive() {
        assert!(!is_active(None, Instant::now(), ACTIVE_WINDOW));
    }

    #[test]
    fn recent_signing_is_active() {
        let now = Instant::now();
        assert!(is_active(Some(now), now, ACTIVE_WINDOW));
        assert!(is_active(
            Some(now - Duration::from_secs(599)),
            now,
            ACTIVE_WINDOW
        ));
    }

    #[test]
    fn stale_signing_is_inactive() {
        let now = Instant::now();
        assert!(!is_active(
            Some(now - Duration::from_secs(600)),
            now,
            ACTIVE_WINDOW
        ));
        assert!(!is_active(
            Some(now - Duration::from_secs(4000)),
            now,
            ACTIVE_WINDOW
        ));
    }
}
