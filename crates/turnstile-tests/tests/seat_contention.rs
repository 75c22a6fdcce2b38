use eyre::Result;
use futures::future::join_all;
use turnstile_core::Rejection;
use turnstile_tests::TestCtxBuilder;

mod util;

/// The linearizability probe: many concurrent holds on one seat, exactly
/// one winner, everyone else observes a conflict.
#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_single_seat_single_winner() -> Result<()> {
    const CONTENDERS: usize = 50;

    let ctx = TestCtxBuilder::new()
        .with_active_capacity(CONTENDERS as u32)
        .with_handler_threads(16)
        .build()
        .await?;

    // Set up one admitted reservation per contender up front, so the
    // race below is purely about the seat.
    let mut reservations = Vec::with_capacity(CONTENDERS);
    for _ in 0..CONTENDERS {
        let mut session = ctx.api.create_user_session();
        session.enter_queue().await?;
        let reservation = session.create_reservation().await?.expect("admitted");
        reservations.push((session.user, reservation.id));
    }

    let attempts = reservations.into_iter().map(|(user, reservation)| {
        let api = ctx.api.clone();
        tokio::spawn(async move { api.hold_seat(user, reservation, 7).await })
    });
    let outcomes: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("hold task must not panic"))
        .collect::<std::result::Result<_, _>>()?;

    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|outcome| **outcome == Err(Rejection::SeatConflict))
        .count();

    assert_eq!(winners, 1, "exactly one concurrent hold may win");
    assert_eq!(conflicts, CONTENDERS - 1, "all losers see SeatConflict");
    assert_eq!(ctx.api.held_seats(uuid::Uuid::new_v4()).await?, vec![7]);

    ctx.finish().await;
    Ok(())
}

/// A burst of users racing for a small pool: the pool is handed out
/// exactly once, with no seat double-booked and none lost.
#[tokio::test]
#[ntest::timeout(60_000)]
async fn test_pool_exhaustion() -> Result<()> {
    const USERS: usize = 100;
    const SEATS: u32 = 10;

    let ctx = TestCtxBuilder::new()
        .with_seats(SEATS)
        .with_active_capacity(USERS as u32)
        .with_handler_threads(16)
        .build()
        .await?;

    let mut reservations = Vec::with_capacity(USERS);
    for _ in 0..USERS {
        let mut session = ctx.api.create_user_session();
        session.enter_queue().await?;
        let reservation = session.create_reservation().await?.expect("admitted");
        reservations.push((session.user, reservation.id));
    }

    // Every user walks the pool until they win a seat or run out.
    let hunts = reservations.into_iter().map(|(user, reservation)| {
        let api = ctx.api.clone();
        tokio::spawn(async move {
            for seat in 1..=SEATS {
                match api.hold_seat(user, reservation, seat).await? {
                    Ok(hold) => return Ok::<_, eyre::Report>(Some(hold.seat_id)),
                    Err(Rejection::SeatConflict | Rejection::InvalidReservationState) => continue,
                    Err(rejection) => panic!("unexpected rejection {rejection:?}"),
                }
            }
            Ok(None)
        })
    });
    let outcomes: Vec<Option<u32>> = join_all(hunts)
        .await
        .into_iter()
        .map(|joined| joined.expect("hunt task must not panic"))
        .collect::<Result<_>>()?;

    let mut won: Vec<u32> = outcomes.into_iter().flatten().collect();
    won.sort_unstable();
    assert_eq!(
        won,
        (1..=SEATS).collect::<Vec<u32>>(),
        "each of the {SEATS} seats must be won exactly once",
    );
    assert_eq!(
        ctx.api.held_seats(uuid::Uuid::new_v4()).await?,
        (1..=SEATS).collect::<Vec<u32>>(),
    );

    ctx.finish().await;
    Ok(())
}
