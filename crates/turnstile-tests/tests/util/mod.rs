use std::time::Duration;

use eyre::Result;
use turnstile_core::QueueStatus;
use turnstile_tests::UserSession;

/// Polls the session's queue token until it reports ACTIVE.
#[allow(unused)]
pub async fn wait_until_active(session: &mut UserSession<'_>, max_wait: Duration) -> Result<()> {
    let deadline = tokio::time::Instant::now() + max_wait;
    loop {
        let entry = session.queue_status().await?.expect("queue token must stay known");
        if entry.status == QueueStatus::Active {
            return Ok(());
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "queue entry was not promoted within {max_wait:?}"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
