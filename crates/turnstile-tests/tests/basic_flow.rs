use eyre::Result;
use turnstile_core::{QueueStatus, Rejection, ReservationState};
use turnstile_tests::TestCtxBuilder;
use uuid::Uuid;

mod util;

/// The whole purchase path for one user, with a rival contending for the
/// same seat and a stale retry after a successful transition.
#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_purchase_flow() -> Result<()> {
    let ctx = TestCtxBuilder::new().build().await?;

    // Capacity is far above two users, so both are admitted immediately.
    let mut alice = ctx.api.create_user_session();
    let mut bob = ctx.api.create_user_session();

    let entry = alice.enter_queue().await?;
    assert_eq!(entry.status, QueueStatus::Active);
    assert_eq!(entry.position, 0);
    bob.enter_queue().await?;

    let reservation = alice
        .create_reservation()
        .await?
        .expect("an admitted user must be able to create a reservation");
    assert_eq!(reservation.state, ReservationState::Created);
    assert_eq!(reservation.version, 0);

    // Alice takes seat 7; Bob must observe a conflict, not an error.
    let hold = alice.hold_seat(7).await?.expect("seat 7 is free");
    assert!(hold.expires_in_ms > 0);

    bob.create_reservation()
        .await?
        .expect("an admitted user must be able to create a reservation");
    assert_eq!(
        bob.hold_seat(7).await?,
        Err(Rejection::SeatConflict),
        "a held seat must report a conflict regardless of holder",
    );

    assert!(ctx.api.held_seats(alice.user).await?.contains(&7));

    // version 0 -> 1
    let paying = alice
        .transition(ReservationState::Paying)
        .await?
        .expect("CREATED -> PAYING with the observed version must succeed");
    assert_eq!(paying.state, ReservationState::Paying);
    assert_eq!(paying.version, 1);

    // Replaying the transition with the stale version must conflict and
    // must not mutate.
    let stale = ctx
        .api
        .transition_reservation(alice.user, paying.id, ReservationState::Confirmed, 0)
        .await?;
    assert_eq!(stale, Err(Rejection::VersionConflict));

    let confirmed = alice
        .transition(ReservationState::Confirmed)
        .await?
        .expect("PAYING -> CONFIRMED with the observed version must succeed");
    assert_eq!(confirmed.state, ReservationState::Confirmed);
    assert_eq!(confirmed.version, 2);

    // Bob can still pick a free seat, release it and not touch Alice's.
    bob.hold_seat(8).await?.expect("seat 8 is free");
    bob.release_seat(8).await?.expect("the holder may release");
    assert_eq!(bob.release_seat(7).await?, Err(Rejection::NotHolder));

    ctx.finish().await;
    Ok(())
}

/// Reservation creation is fenced by the admission gate.
#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_admission_required() -> Result<()> {
    let ctx = TestCtxBuilder::new().build().await?;

    let mut carol = ctx.api.create_user_session();

    // No queue token at all.
    assert_eq!(
        ctx.api.create_reservation(carol.user, None).await?,
        Err(Rejection::NotAdmitted),
    );

    // A made-up token is not admission either.
    assert_eq!(
        ctx.api
            .create_reservation(carol.user, Some(Uuid::new_v4()))
            .await?,
        Err(Rejection::NotAdmitted),
    );

    // A token of another user must not admit this caller.
    let mut dave = ctx.api.create_user_session();
    dave.enter_queue().await?;
    assert_eq!(
        ctx.api
            .create_reservation(carol.user, dave.queue_token)
            .await?,
        Err(Rejection::NotAdmitted),
    );

    // After entering, everything works.
    carol.enter_queue().await?;
    carol
        .create_reservation()
        .await?
        .expect("an admitted user must be able to create a reservation");

    // Unknown queue tokens read as NotFound on status polls.
    assert_eq!(
        ctx.api.queue_status(carol.user, Uuid::new_v4()).await?,
        Err(Rejection::NotFound),
    );

    ctx.finish().await;
    Ok(())
}
