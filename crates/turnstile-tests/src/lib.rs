use eyre::Result;

mod api;

pub use api::{Api, ApiResult, UserSession};

/// Builder for a test context around an in-process engine
pub struct TestCtxBuilder {
    /// Number of sellable seats
    pub seats: u32,
    /// Maximum number of concurrently ACTIVE queue entries
    pub active_capacity: u32,
    /// Idle TTL of ACTIVE queue entries in milliseconds
    pub active_ttl_ms: u64,
    /// Sojourn TTL of WAITING queue entries in milliseconds
    pub waiting_ttl_ms: u64,
    /// Inactivity TTL of reservations in milliseconds
    pub reservation_ttl_ms: u64,
    /// TTL of seat holds in milliseconds
    pub hold_ttl_ms: u64,
    /// Sweep cadence in milliseconds
    pub sweep_interval_ms: u64,
    /// Count of handler threads feeding the engine
    pub handler_threads: u16,
}

impl TestCtxBuilder {
    /// Create a builder with defaults suited for most tests
    pub fn new() -> Self {
        TestCtxBuilder {
            seats: 100,
            active_capacity: 50,
            active_ttl_ms: 60_000,
            waiting_ttl_ms: 600_000,
            reservation_ttl_ms: 60_000,
            hold_ttl_ms: 20_000,
            sweep_interval_ms: 100,
            handler_threads: 8,
        }
    }

    /// Set the number of sellable seats
    pub fn with_seats(mut self, seats: u32) -> Self {
        self.seats = seats;
        self
    }

    /// Set the concurrent-active capacity of the admission gate
    pub fn with_active_capacity(mut self, capacity: u32) -> Self {
        self.active_capacity = capacity;
        self
    }

    /// Set the idle TTL of ACTIVE queue entries (in milliseconds)
    pub fn with_active_ttl_ms(mut self, ttl: u64) -> Self {
        self.active_ttl_ms = ttl;
        self
    }

    /// Set the inactivity TTL of reservations (in milliseconds)
    pub fn with_reservation_ttl_ms(mut self, ttl: u64) -> Self {
        self.reservation_ttl_ms = ttl;
        self
    }

    /// Set the TTL of seat holds (in milliseconds)
    pub fn with_hold_ttl_ms(mut self, ttl: u64) -> Self {
        self.hold_ttl_ms = ttl;
        self
    }

    /// Set the sweep cadence (in milliseconds)
    pub fn with_sweep_interval_ms(mut self, interval: u64) -> Self {
        self.sweep_interval_ms = interval;
        self
    }

    /// Set the number of handler threads to use
    pub fn with_handler_threads(mut self, threads: u16) -> Self {
        assert_ne!(threads, 0);
        self.handler_threads = threads;
        self
    }

    /// Get the [`turnstile_core::Config`] for launching the engine
    fn config(&self) -> turnstile_core::Config {
        turnstile_core::Config {
            seats: self.seats,
            active_capacity: self.active_capacity,
            active_ttl_ms: self.active_ttl_ms,
            waiting_ttl_ms: self.waiting_ttl_ms,
            reservation_ttl_ms: self.reservation_ttl_ms,
            hold_ttl_ms: self.hold_ttl_ms,
            sweep_interval_ms: self.sweep_interval_ms,
        }
    }

    /// Build the test context
    pub async fn build(self) -> Result<TestCtx> {
        let (frontdesk, api) = api::mock::start(self.handler_threads, self.config()).await;

        Ok(TestCtx {
            api,
            frontdesk,
            drop_bomb: DropBomb,
        })
    }
}

impl Default for TestCtxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Test context
pub struct TestCtx {
    /// API allowing to interact with the engine
    pub api: Api,
    frontdesk: api::mock::MockFrontdesk,

    drop_bomb: DropBomb,
}

impl TestCtx {
    /// Shut the engine down and finish the test
    pub async fn finish(self) {
        std::mem::forget(self.drop_bomb);
        drop(self.api);
        self.frontdesk.shutdown().await;
    }
}

struct DropBomb;

impl Drop for DropBomb {
    fn drop(&mut self) {
        eprintln!("@TestAuthor: You should call `ctx.finish().await` to shut the engine down");
    }
}
