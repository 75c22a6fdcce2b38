use eyre::Result;
use turnstile_core::{QueueStatus, Rejection};
use turnstile_tests::TestCtxBuilder;

mod util;

/// Promotion is strict FIFO: with capacity C, the first C entries are
/// ACTIVE and everyone behind them waits in arrival order.
#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_fifo_admission() -> Result<()> {
    let ctx = TestCtxBuilder::new()
        .with_active_capacity(2)
        // Keep the sweeper out of the picture; promotion on enter/leave is
        // what is under test here.
        .with_sweep_interval_ms(60_000)
        .build()
        .await?;

    let mut sessions: Vec<_> = (0..5).map(|_| ctx.api.create_user_session()).collect();

    let mut statuses = Vec::new();
    for session in sessions.iter_mut() {
        let entry = session.enter_queue().await?;
        statuses.push((entry.status, entry.position));
    }

    assert_eq!(
        statuses,
        vec![
            (QueueStatus::Active, 0),
            (QueueStatus::Active, 0),
            (QueueStatus::Waiting, 1),
            (QueueStatus::Waiting, 2),
            (QueueStatus::Waiting, 3),
        ],
        "the first two arrivals take the two slots, the rest line up",
    );

    // Re-entry is idempotent: same token, same place in line.
    let third_token = sessions[2].queue_token.unwrap();
    let re_entered = sessions[2].enter_queue().await?;
    assert_eq!(re_entered.token, third_token);
    assert_eq!(re_entered.status, QueueStatus::Waiting);
    assert_eq!(re_entered.position, 1);

    // Re-entry of an ACTIVE user hands the ACTIVE entry back, never a
    // fresh WAITING one.
    let first_token = sessions[0].queue_token.unwrap();
    let re_entered = sessions[0].enter_queue().await?;
    assert_eq!(re_entered.token, first_token);
    assert_eq!(re_entered.status, QueueStatus::Active);

    ctx.finish().await;
    Ok(())
}

/// Leaving frees a slot and admits the next waiter immediately, in
/// arrival order.
#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_leave_admits_next_in_line() -> Result<()> {
    let ctx = TestCtxBuilder::new()
        .with_active_capacity(1)
        .with_sweep_interval_ms(60_000)
        .build()
        .await?;

    let mut first = ctx.api.create_user_session();
    let mut second = ctx.api.create_user_session();
    let mut third = ctx.api.create_user_session();

    assert_eq!(first.enter_queue().await?.status, QueueStatus::Active);
    assert_eq!(second.enter_queue().await?.status, QueueStatus::Waiting);
    assert_eq!(third.enter_queue().await?.status, QueueStatus::Waiting);

    // A waiter giving up shortens the line but admits nobody.
    let second_token = second.queue_token.unwrap();
    ctx.api
        .leave_queue(second.user, second_token)
        .await?
        .expect("a live entry can be given up");
    let entry = third.queue_status().await?.expect("third is still waiting");
    assert_eq!((entry.status, entry.position), (QueueStatus::Waiting, 1));

    // The slot holder giving up admits the head of the line at once.
    let first_token = first.queue_token.unwrap();
    ctx.api
        .leave_queue(first.user, first_token)
        .await?
        .expect("a live entry can be given up");
    let entry = third.queue_status().await?.expect("third was promoted");
    assert_eq!(entry.status, QueueStatus::Active);

    // Departed tokens are gone.
    assert_eq!(
        ctx.api.queue_status(first.user, first_token).await?,
        Err(Rejection::NotFound),
    );
    assert_eq!(
        ctx.api.leave_queue(first.user, first_token).await?,
        Err(Rejection::NotFound),
    );

    ctx.finish().await;
    Ok(())
}
