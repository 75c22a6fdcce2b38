use eyre::Result;
use turnstile_core::{Rejection, ReservationState};
use turnstile_tests::TestCtxBuilder;
use uuid::Uuid;

mod util;

/// A stale `expectedVersion` is always a conflict and never mutates.
#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_stale_version_never_mutates() -> Result<()> {
    let ctx = TestCtxBuilder::new().build().await?;

    let mut session = ctx.api.create_user_session();
    session.enter_queue().await?;
    let reservation = session.create_reservation().await?.expect("admitted");

    // Nothing has happened yet, so any version but 0 is stale.
    for stale in [1, 2, 42] {
        assert_eq!(
            ctx.api
                .transition_reservation(
                    session.user,
                    reservation.id,
                    ReservationState::Paying,
                    stale,
                )
                .await?,
            Err(Rejection::VersionConflict),
        );
    }

    // The conflicting attempts must not have consumed version 0.
    let paying = session
        .transition(ReservationState::Paying)
        .await?
        .expect("version 0 is still current");
    assert_eq!(paying.version, 1);

    // Repeating the same stale call keeps yielding the same conflict.
    for _ in 0..3 {
        assert_eq!(
            ctx.api
                .transition_reservation(session.user, reservation.id, ReservationState::Confirmed, 0)
                .await?,
            Err(Rejection::VersionConflict),
        );
    }

    ctx.finish().await;
    Ok(())
}

/// Illegal successors are rejected separately from version conflicts, and
/// terminal states accept nothing at all.
#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_transition_legality() -> Result<()> {
    let ctx = TestCtxBuilder::new().build().await?;

    let mut session = ctx.api.create_user_session();
    session.enter_queue().await?;
    let reservation = session.create_reservation().await?.expect("admitted");

    // CREATED cannot jump straight to CONFIRMED, even with the right
    // version, and the failed attempt does not bump it.
    assert_eq!(
        session.transition(ReservationState::Confirmed).await?,
        Err(Rejection::InvalidTransition),
    );

    // EXPIRED is system-driven and never accepted from callers.
    assert_eq!(
        session.transition(ReservationState::Expired).await?,
        Err(Rejection::InvalidTransition),
    );

    // Version 0 still works after those rejections.
    let cancelled = session
        .transition(ReservationState::Cancelled)
        .await?
        .expect("CREATED -> CANCELLED is legal");
    assert_eq!(cancelled.version, 1);

    // CANCELLED is terminal.
    assert_eq!(
        session.transition(ReservationState::Paying).await?,
        Err(Rejection::InvalidTransition),
    );

    // Unknown ids and foreign reservations read as NotFound.
    assert_eq!(
        ctx.api
            .transition_reservation(session.user, Uuid::new_v4(), ReservationState::Paying, 0)
            .await?,
        Err(Rejection::NotFound),
    );
    let stranger = ctx.api.create_user_session();
    assert_eq!(
        ctx.api
            .transition_reservation(stranger.user, reservation.id, ReservationState::Paying, 1)
            .await?,
        Err(Rejection::NotFound),
    );

    ctx.finish().await;
    Ok(())
}

/// Cancelling releases the reservation's seat holds.
#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_cancellation_releases_holds() -> Result<()> {
    let ctx = TestCtxBuilder::new().build().await?;

    let mut session = ctx.api.create_user_session();
    session.enter_queue().await?;
    session.create_reservation().await?.expect("admitted");
    session.hold_seat(3).await?.expect("seat 3 is free");
    session.hold_seat(4).await?.expect("seat 4 is free");
    assert_eq!(ctx.api.held_seats(session.user).await?, vec![3, 4]);

    session
        .transition(ReservationState::Cancelled)
        .await?
        .expect("CREATED -> CANCELLED is legal");
    assert_eq!(ctx.api.held_seats(session.user).await?, Vec::<u32>::new());

    // A cancelled reservation cannot pick seats up again.
    assert_eq!(
        session.hold_seat(3).await?,
        Err(Rejection::InvalidReservationState),
    );

    // Another reservation can take the freed seats right away.
    let mut other = ctx.api.create_user_session();
    other.enter_queue().await?;
    other.create_reservation().await?.expect("admitted");
    other.hold_seat(3).await?.expect("seat 3 was freed");

    ctx.finish().await;
    Ok(())
}

/// Seat ids outside the configured pool read as NotFound.
#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_unknown_seat() -> Result<()> {
    let ctx = TestCtxBuilder::new().with_seats(10).build().await?;

    let mut session = ctx.api.create_user_session();
    session.enter_queue().await?;
    session.create_reservation().await?.expect("admitted");

    assert_eq!(session.hold_seat(0).await?, Err(Rejection::NotFound));
    assert_eq!(session.hold_seat(11).await?, Err(Rejection::NotFound));
    session.hold_seat(10).await?.expect("seat 10 is the last valid id");

    ctx.finish().await;
    Ok(())
}
