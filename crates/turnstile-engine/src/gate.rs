//! Queue admission gate: an arrival-ordered waiting room in front of the
//! ticketing path, admitting a bounded number of users at a time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use turnstile_core::{Config, QueueEntryView, QueueStatus, Rejection};
use uuid::Uuid;

/// A single entry in the waiting room
#[derive(Clone, Copy, Debug)]
struct QueueEntry {
    /// Owning user
    user: Uuid,
    /// Arrival sequence number; the promotion order
    seq: u64,
    status: QueueStatus,
    entered_at: Instant,
    /// Last instant the entry was seen on an admitted ticketing call
    last_seen: Instant,
}

/// Admission bookkeeping that must change atomically: the arrival order of
/// WAITING entries and the number of ACTIVE slots in use.
struct AdmissionOrder {
    /// `(seq, token)` of live WAITING entries, ascending by `seq`
    waiting: VecDeque<(u64, Uuid)>,
    active: u32,
}

/// The admission gate
///
/// Promotion decisions are serialized by the `order` mutex; the entry maps
/// stay lock-free for status polling. Any method that takes both always
/// takes `order` first.
pub struct AdmissionGate {
    /// Queue token -> entry
    entries: DashMap<Uuid, QueueEntry>,
    /// User -> queue token; at most one live entry per user
    by_user: DashMap<Uuid, Uuid>,
    order: Mutex<AdmissionOrder>,
    next_seq: AtomicU64,
    active_capacity: u32,
    active_ttl: Duration,
    waiting_ttl: Duration,
}

impl AdmissionGate {
    /// Create a gate with empty queue state
    pub fn new(config: &Config) -> Self {
        Self {
            entries: DashMap::new(),
            by_user: DashMap::new(),
            order: Mutex::new(AdmissionOrder {
                waiting: VecDeque::new(),
                active: 0,
            }),
            next_seq: AtomicU64::new(0),
            active_capacity: config.active_capacity,
            active_ttl: Duration::from_millis(config.active_ttl_ms),
            waiting_ttl: Duration::from_millis(config.waiting_ttl_ms),
        }
    }

    /// Enter the waiting room
    ///
    /// Idempotent: a user with a live entry gets that entry back, WAITING
    /// or ACTIVE alike. Otherwise a WAITING entry is appended in arrival
    /// order and a promotion pass runs, so free capacity admits the
    /// newcomer immediately.
    pub fn enter(&self, user: Uuid) -> QueueEntryView {
        let mut order = self.order.lock();
        let now = Instant::now();

        if let Some(token) = self.by_user.get(&user).map(|t| *t) {
            if let Some(entry) = self.entries.get(&token).map(|e| *e.value()) {
                if !self.is_lapsed(&entry, now) {
                    return QueueEntryView {
                        token,
                        status: entry.status,
                        position: position_locked(&order, &entry),
                    };
                }
            }
            // The previous entry lapsed but has not been swept yet.
            self.drop_entry_locked(&mut order, token);
        }

        let token = Uuid::new_v4();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            token,
            QueueEntry {
                user,
                seq,
                status: QueueStatus::Waiting,
                entered_at: now,
                last_seen: now,
            },
        );
        self.by_user.insert(user, token);
        order.waiting.push_back((seq, token));
        tracing::debug!(token = %token, seq, "queue entry created");

        self.promote_locked(&mut order);

        // Still present: nothing can remove the entry while `order` is held.
        let entry = *self.entries.get(&token).unwrap().value();
        QueueEntryView {
            token,
            status: entry.status,
            position: position_locked(&order, &entry),
        }
    }

    /// Report status and position for a token
    ///
    /// Lapsed entries read as `NotFound` even before the sweep collects
    /// them; liveness is judged against the clock, not the swept state.
    pub fn status(&self, token: Uuid) -> Result<QueueEntryView, Rejection> {
        let order = self.order.lock();
        let entry = *self
            .entries
            .get(&token)
            .ok_or(Rejection::NotFound)?
            .value();
        if self.is_lapsed(&entry, Instant::now()) {
            return Err(Rejection::NotFound);
        }
        Ok(QueueEntryView {
            token,
            status: entry.status,
            position: position_locked(&order, &entry),
        })
    }

    /// Give up a queue entry, freeing its slot and admitting the next
    /// waiter right away
    pub fn leave(&self, token: Uuid) -> Result<(), Rejection> {
        let mut order = self.order.lock();
        if !self.entries.contains_key(&token) {
            return Err(Rejection::NotFound);
        }
        self.drop_entry_locked(&mut order, token);
        self.promote_locked(&mut order);
        Ok(())
    }

    /// Validate that `token` is the caller's ACTIVE entry and refresh its
    /// activity deadline
    pub fn touch_active(&self, token: Uuid, user: Uuid) -> Result<(), Rejection> {
        let now = Instant::now();
        let mut entry = self.entries.get_mut(&token).ok_or(Rejection::NotAdmitted)?;
        if entry.user != user
            || entry.status != QueueStatus::Active
            || self.is_lapsed(entry.value(), now)
        {
            return Err(Rejection::NotAdmitted);
        }
        entry.last_seen = now;
        Ok(())
    }

    /// Collect lapsed entries and run a promotion pass
    pub fn sweep(&self, now: Instant) {
        let mut order = self.order.lock();
        let lapsed: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|entry| self.is_lapsed(entry.value(), now))
            .map(|entry| *entry.key())
            .collect();
        for token in lapsed {
            tracing::debug!(token = %token, "queue entry expired");
            self.drop_entry_locked(&mut order, token);
        }
        self.promote_locked(&mut order);
    }

    fn is_lapsed(&self, entry: &QueueEntry, now: Instant) -> bool {
        match entry.status {
            QueueStatus::Waiting => now.duration_since(entry.entered_at) > self.waiting_ttl,
            QueueStatus::Active => now.duration_since(entry.last_seen) > self.active_ttl,
            QueueStatus::Expired => true,
        }
    }

    /// Remove an entry from all maps and the order bookkeeping
    fn drop_entry_locked(&self, order: &mut AdmissionOrder, token: Uuid) {
        let Some((_, entry)) = self.entries.remove(&token) else {
            return;
        };
        match entry.status {
            QueueStatus::Active => order.active = order.active.saturating_sub(1),
            QueueStatus::Waiting => order.waiting.retain(|&(_, t)| t != token),
            QueueStatus::Expired => {}
        }
        self.by_user.remove_if(&entry.user, |_, t| *t == token);
    }

    /// Promote the oldest WAITING entries while capacity is free
    ///
    /// The only WAITING -> ACTIVE path; strict FIFO by arrival sequence.
    fn promote_locked(&self, order: &mut AdmissionOrder) {
        let now = Instant::now();
        while order.active < self.active_capacity {
            let Some((_, token)) = order.waiting.pop_front() else {
                break;
            };
            let lapsed_user = match self.entries.get_mut(&token) {
                Some(mut entry) => {
                    if now.duration_since(entry.entered_at) <= self.waiting_ttl {
                        entry.status = QueueStatus::Active;
                        entry.last_seen = now;
                        order.active += 1;
                        tracing::debug!(token = %token, active = order.active, "queue entry promoted");
                        continue;
                    }
                    entry.user
                }
                None => continue,
            };
            // Lapsed while waiting: drop instead of admitting.
            self.entries.remove(&token);
            self.by_user.remove_if(&lapsed_user, |_, t| *t == token);
            tracing::debug!(token = %token, "queue entry lapsed before promotion");
        }
    }
}

/// 1-based place in line for WAITING entries, 0 once ACTIVE
fn position_locked(order: &AdmissionOrder, entry: &QueueEntry) -> u64 {
    if entry.status != QueueStatus::Waiting {
        return 0;
    }
    order
        .waiting
        .iter()
        .take_while(|&&(seq, _)| seq < entry.seq)
        .count() as u64
        + 1
}
