//! A dense-slot timer pool shared by every Q.921/Q.931 timer on a D channel.
//!
//! This is the host-side analogue of `multitimer`: instead of multiplexing a
//! single hardware timer across a fixed `Enum`-keyed set of timers, a
//! [`Pool`] owns a grow-only array of independently-scheduled one-shot
//! callbacks and hands back a stable, opaque [`SchedId`] for each one. Unlike
//! `multitimer` the number of concurrent timers is not known at compile time
//! (every link has its own T200/T203/T202/T201/restart/MDL timers, and links
//! come and go as TEIs are assigned), so slots are grown on demand up to a
//! hard cap.
//!
//! IDs are drawn from a per-pool range (`first_id..first_id + MAX_SLOTS`) so
//! that two pools never hand out the same id even when timers from one pool
//! are cancelled by walking a chain of pools (NFAS master/slave D channels
//! sharing a cancellation path).

#![cfg_attr(not(test), allow(dead_code))]

use std::fmt;

/// Hard cap on the number of timer slots a single pool may grow to.
///
/// Chosen to be a power of two (see `multitimer`'s `EnumMap` sizing and the
/// general embedded habit of keeping allocation steps power-of-two for
/// predictable fragmentation behavior).
pub const MAX_SLOTS: u32 = 8192;

/// Initial number of slots allocated the first time a pool schedules a timer.
const INITIAL_SLOTS: u32 = 128;

/// A stable, opaque handle to a scheduled timer.
///
/// `SchedId(0)` is reserved to mean "not scheduled" and is never returned by
/// [`Pool::schedule`]; [`Pool::cancel`] and [`Pool::check`] treat it as a
/// silent no-op, matching `pri_schedule_del`/`pri_schedule_check`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchedId(u32);

impl SchedId {
    pub const NONE: SchedId = SchedId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SchedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchedId({:#x})", self.0)
    }
}

impl Default for SchedId {
    fn default() -> Self {
        SchedId::NONE
    }
}

/// Draws disjoint `first_id` ranges for every [`Pool`] created in this
/// process, the same role `prisched.c`'s file-scope `pool_id` plays for every
/// `struct pri`.
fn next_pool_base() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};
    static NEXT: AtomicU32 = AtomicU32::new(MAX_SLOTS);
    // Wrapping add mirrors the original's behavior on overflow: it is not
    // realistically reachable (2^32 / 8192 pools created in one process)
    // but we don't want to panic if it ever is.
    NEXT.fetch_add(MAX_SLOTS, Ordering::Relaxed)
}

struct Slot<T> {
    deadline_ms: u64,
    callback: Option<T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot {
            deadline_ms: 0,
            callback: None,
        }
    }
}

/// A single controller's timer pool.
///
/// `T` is the payload invoked when a timer fires. It is generally a small
/// `FnOnce` closure or enum capturing just enough context (which link, which
/// timer) to re-enter the owning state machine; the pool itself knows
/// nothing about what a timer *means*.
pub struct Pool<T> {
    first_id: u32,
    slots: Vec<Slot<T>>,
    /// One past the highest-index slot that might be in use; maintained the
    /// way `pri_schedule_next`/`pri_schedule_run` maintain `max_used` so a
    /// pool with few live timers doesn't pay for a full scan of its capacity.
    max_used: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Pool::new()
    }
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Pool {
            first_id: next_pool_base(),
            slots: Vec::new(),
            max_used: 0,
        }
    }

    /// The base id of this pool's id range, exposed so a caller (the
    /// controller) can recognize "is this id mine" without reaching into the
    /// pool for every check.
    pub fn first_id(&self) -> u32 {
        self.first_id
    }

    pub fn owns(&self, id: SchedId) -> bool {
        !id.is_none()
            && self.first_id <= id.0
            && id.0 <= self.first_id + (MAX_SLOTS - 1)
    }

    fn grow(&mut self) -> bool {
        let new_len = if self.slots.is_empty() {
            INITIAL_SLOTS as usize
        } else {
            let doubled = self.slots.len() * 2;
            if doubled as u32 > MAX_SLOTS {
                return false;
            }
            doubled
        };
        if new_len as u32 > MAX_SLOTS {
            return false;
        }
        self.slots.resize_with(new_len, Slot::default);
        true
    }

    /// Reserve the lowest free slot and arm it for `deadline_ms`, returning
    /// the id the caller should hang onto to cancel or re-verify it later.
    ///
    /// Returns `SchedId::NONE` if the pool is already at `MAX_SLOTS` and
    /// every slot is occupied, mirroring `pri_schedule_event`'s `return 0`.
    pub fn schedule(&mut self, deadline_ms: u64, callback: T) -> SchedId {
        let mut free = None;
        for (i, slot) in self.slots[..self.max_used].iter().enumerate() {
            if slot.callback.is_none() {
                free = Some(i);
                break;
            }
        }
        let idx = match free {
            Some(i) => i,
            None => {
                if self.max_used == self.slots.len() && !self.grow() {
                    return SchedId::NONE;
                }
                self.max_used
            }
        };
        if self.max_used <= idx {
            self.max_used = idx + 1;
        }
        self.slots[idx] = Slot {
            deadline_ms,
            callback: Some(callback),
        };
        SchedId(self.first_id + idx as u32)
    }

    /// Earliest deadline among all currently-armed timers, collapsing
    /// trailing empty slots into a smaller `max_used` the way
    /// `pri_schedule_next` does during its backward scan.
    pub fn next_deadline(&mut self) -> Option<u64> {
        let mut closest = None;
        let mut x = self.max_used;
        while x > 0 {
            x -= 1;
            if self.slots[x].callback.is_some() {
                if closest.is_none() {
                    self.max_used = x + 1;
                }
                let dl = self.slots[x].deadline_ms;
                closest = Some(match closest {
                    Some(c) if c <= dl => c,
                    _ => dl,
                });
            }
        }
        if closest.is_none() {
            self.max_used = 0;
        }
        closest
    }

    /// Run every timer whose deadline has elapsed, in increasing slot order.
    /// `on_fire` is invoked once per expired timer with its payload; the
    /// pool then asks `is_event` (looking at the caller's own state) whether
    /// that firing produced an event. If so, `run_ready` stops immediately —
    /// matching the single-static-event-slot turn semantics in the overview
    /// — and the caller should invoke `run_ready` again (after draining the
    /// event) to continue the pass.
    pub fn run_ready<F, E>(&mut self, now_ms: u64, mut on_fire: F) -> Option<E>
    where
        F: FnMut(T) -> Option<E>,
    {
        let max_used = self.max_used;
        for x in 0..max_used {
            let fire = match &self.slots[x].callback {
                Some(_) if self.slots[x].deadline_ms <= now_ms => true,
                _ => false,
            };
            if fire {
                let cb = self.slots[x].callback.take().unwrap();
                if let Some(ev) = on_fire(cb) {
                    return Some(ev);
                }
            }
        }
        None
    }

    /// Clear the slot for `id` if it belongs to this pool. Returns `true` if
    /// this pool owned (and cleared) the id.
    pub fn cancel(&mut self, id: SchedId) -> bool {
        if !self.owns(id) {
            return false;
        }
        let idx = (id.0 - self.first_id) as usize;
        if let Some(slot) = self.slots.get_mut(idx) {
            slot.callback = None;
        }
        true
    }

    /// True iff `id` is currently armed (used by callers that only need to
    /// know liveness, not identity — e.g. asserting an invariant in tests).
    pub fn is_armed(&self, id: SchedId) -> bool {
        if !self.owns(id) {
            return false;
        }
        let idx = (id.0 - self.first_id) as usize;
        self.slots
            .get(idx)
            .map(|s| s.callback.is_some())
            .unwrap_or(false)
    }
}

impl<T: PartialEq> Pool<T> {
    /// Re-verify that `id` still holds exactly `expected`, the way
    /// `pri_schedule_check` lets a deferred cleanup confirm it is still
    /// looking at the timer it scheduled before other actions ran.
    pub fn check(&self, id: SchedId, expected: &T) -> bool {
        if !self.owns(id) {
            return false;
        }
        let idx = (id.0 - self.first_id) as usize;
        match self.slots.get(idx) {
            Some(Slot {
                callback: Some(cb), ..
            }) => cb == expected,
            _ => false,
        }
    }
}

/// Walks a chain of pools (an NFAS master/slave group) trying to cancel `id`
/// on whichever pool actually owns it. Returns `true` if some pool in the
/// chain owned and cleared it.
pub fn cancel_in_chain<'a, T: 'a>(
    pools: impl IntoIterator<Item = &'a mut Pool<T>>,
    id: SchedId,
) -> bool {
    for pool in pools {
        if pool.cancel(id) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_returns_nonzero_id() {
        let mut pool: Pool<u32> = Pool::new();
        let id = pool.schedule(100, 1);
        assert!(!id.is_none());
    }

    #[test]
    fn next_deadline_picks_earliest() {
        let mut pool: Pool<u32> = Pool::new();
        pool.schedule(500, 1);
        pool.schedule(100, 2);
        pool.schedule(9000, 3);
        assert_eq!(pool.next_deadline(), Some(100));
    }

    #[test]
    fn cancel_then_run_ready_never_invokes() {
        let mut pool: Pool<u32> = Pool::new();
        let id = pool.schedule(0, 1);
        assert!(pool.cancel(id));
        let mut invoked = false;
        pool.run_ready::<_, ()>(1000, |_| {
            invoked = true;
            None
        });
        assert!(!invoked);
    }

    #[test]
    fn each_fired_timer_invoked_exactly_once() {
        let mut pool: Pool<u32> = Pool::new();
        pool.schedule(0, 10);
        pool.schedule(0, 20);
        let mut seen = Vec::new();
        pool.run_ready::<_, ()>(1000, |payload| {
            seen.push(payload);
            None
        });
        assert_eq!(seen, vec![10, 20]);
        // A second pass at the same time fires nothing further.
        let mut seen2 = Vec::new();
        pool.run_ready::<_, ()>(1000, |payload| {
            seen2.push(payload);
            None
        });
        assert!(seen2.is_empty());
    }

    #[test]
    fn run_ready_stops_at_first_event_leaving_rest_for_next_call() {
        let mut pool: Pool<u32> = Pool::new();
        pool.schedule(0, 1);
        pool.schedule(0, 2);
        pool.schedule(0, 3);
        let mut seen = Vec::new();
        let ev = pool.run_ready(1000, |payload| {
            seen.push(payload);
            if payload == 1 {
                Some("event")
            } else {
                None
            }
        });
        assert_eq!(ev, Some("event"));
        assert_eq!(seen, vec![1]);

        // Second call continues the same pass; slot 1 already fired.
        let mut seen2 = Vec::new();
        let ev2 = pool.run_ready::<_, ()>(1000, |payload| {
            seen2.push(payload);
            None
        });
        assert_eq!(ev2, None);
        assert_eq!(seen2, vec![2, 3]);
    }

    #[test]
    fn pools_have_disjoint_id_ranges() {
        let pool_a: Pool<u32> = Pool::new();
        let pool_b: Pool<u32> = Pool::new();
        assert_ne!(pool_a.first_id(), pool_b.first_id());
    }

    #[test]
    fn cancel_in_chain_finds_owning_pool() {
        let mut master: Pool<u32> = Pool::new();
        let mut slave: Pool<u32> = Pool::new();
        let id = slave.schedule(0, 42);
        assert!(!master.owns(id));
        assert!(slave.owns(id));
        assert!(cancel_in_chain([&mut master, &mut slave], id));
        assert!(!slave.is_armed(id));
    }

    #[test]
    fn check_matches_only_exact_payload() {
        let mut pool: Pool<u32> = Pool::new();
        let id = pool.schedule(0, 7);
        assert!(pool.check(id, &7));
        assert!(!pool.check(id, &8));
    }

    #[test]
    fn growth_past_initial_capacity_still_yields_unique_ids() {
        let mut pool: Pool<u32> = Pool::new();
        let mut ids = std::collections::HashSet::new();
        for i in 0..300u32 {
            let id = pool.schedule(i as u64, i);
            assert!(!id.is_none(), "pool exhausted too early at {i}");
            assert!(ids.insert(id), "duplicate id at {i}");
        }
    }

    proptest::proptest! {
        #[test]
        fn valid_id_invoked_exactly_once_or_not_at_all(
            deadlines in proptest::collection::vec(0u64..2000, 1..64),
            cancel_mask in proptest::collection::vec(proptest::bool::ANY, 1..64),
        ) {
            let mut pool: Pool<u32> = Pool::new();
            let mut ids = Vec::new();
            for (i, &dl) in deadlines.iter().enumerate() {
                ids.push(pool.schedule(dl, i as u32));
            }
            for (i, &cancel) in cancel_mask.iter().enumerate() {
                if cancel && i < ids.len() {
                    pool.cancel(ids[i]);
                }
            }
            let mut fired = std::collections::HashSet::new();
            loop {
                let mut progressed = false;
                let ev = pool.run_ready::<_, ()>(u64::MAX, |payload| {
                    progressed = true;
                    assert!(fired.insert(payload), "fired twice: {payload}");
                    None
                });
                assert!(ev.is_none());
                if !progressed {
                    break;
                }
            }
            for (i, &cancel) in cancel_mask.iter().enumerate() {
                if cancel && i < ids.len() {
                    assert!(!fired.contains(&(i as u32)));
                }
            }
        }
    }
}
