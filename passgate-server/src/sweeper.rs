//! Periodic expiry sweep
//!
//! Expired challenges and codes are already rejected lazily when touched.
//! The sweeper only bounds memory held by entries nobody comes back for.

use std::sync::Arc;
use std::time::Duration;

use passgate_core::Authority;
use tokio::task::JoinHandle;

/// Spawn a task that sweeps `authority` every `interval`
pub fn spawn_sweeper(authority: Arc<Authority>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            run_sweep(&authority);
        }
    })
}

/// One sweep pass, logging what was dropped
pub fn run_sweep(authority: &Authority) {
    let report = authority.sweep_expired();
    if report.challenges > 0 || report.codes > 0 {
        tracing::info!(
            challenges = report.challenges,
            codes = report.codes,
            "Swept expired entries"
        );
    }
    let stats = authority.stats();
    tracing::debug!(
        users = stats.users,
        pending_challenges = stats.pending_challenges,
        outstanding_codes = stats.outstanding_codes,
        "Authority stats"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use passgate_core::{AuthorityConfig, ManualClock, MockVerifier};

    #[test]
    fn test_run_sweep_drops_stale_challenge() {
        let clock = Arc::new(ManualClock::starting_now());
        let authority = Authority::with_clock(
            AuthorityConfig::default(),
            Arc::new(MockVerifier::new()),
            clock.clone(),
        );
        authority.begin_registration("gina", None).unwrap();
        assert_eq!(authority.stats().pending_challenges, 1);

        clock.advance(chrono::Duration::seconds(301));
        run_sweep(&authority);
        assert_eq!(authority.stats().pending_challenges, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_sweeper_runs() {
        let clock = Arc::new(ManualClock::starting_now());
        let authority = Arc::new(Authority::with_clock(
            AuthorityConfig::default(),
            Arc::new(MockVerifier::new()),
            clock.clone(),
        ));
        authority.begin_authentication("gina").unwrap();
        clock.advance(chrono::Duration::seconds(301));

        let handle = spawn_sweeper(authority.clone(), Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;
        assert_eq!(authority.stats().pending_challenges, 0);
        handle.abort();
    }
}
