//! # Scheduling Strategies
//!
//! The five selection algorithms the preemption core can dispatch through,
//! plus the private state some of them own. A strategy is a pure function
//! `(table, current, state) -> next`: deterministic given its inputs and
//! its private state (Random excepted, whose nondeterminism is its
//! contract). Strategies never call back into the scheduler, never
//! allocate and never block.
//!
//! ## Selectability
//!
//! A slot is *selectable* when it is `Ready`, excluding the idle slot
//! (PID 0) whenever any non-idle slot is selectable. If no non-idle slot
//! is selectable, idle is chosen. Ascending traversal is cyclic: after the
//! last slot, wrap to 0, skipping idle as above.

use crate::config::MAX_PROCESSES;
use crate::process::{Pid, ProcessSlot, IDLE_PID};

// ---------------------------------------------------------------------------
// Strategy tags
// ---------------------------------------------------------------------------

/// The available scheduling strategies. All five are known at build time;
/// dispatch is a plain `match`, no function-pointer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Cyclic scan from `current + 1`; uniform round visitation.
    Even,
    /// Uniform pick among selectable slots from a seeded PRNG.
    Random,
    /// Keep the current process while it stays selectable.
    RunToCompletion,
    /// Priority-sized time slices, rotated by the Even rule.
    RoundRobin,
    /// Priority-weighted aging; most-starved slot wins.
    InactiveAging,
}

impl StrategyKind {
    /// Decode a raw strategy tag (e.g. from the task-manager overlay).
    /// Unknown tags fall back to `Even`.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Random,
            2 => Self::RunToCompletion,
            3 => Self::RoundRobin,
            4 => Self::InactiveAging,
            _ => Self::Even,
        }
    }
}

// ---------------------------------------------------------------------------
// Private strategy state
// ---------------------------------------------------------------------------

/// Xorshift PRNG backing the Random strategy. Small, branch-free and
/// plenty uniform for picking one of at most `MAX_PROCESSES` slots.
#[derive(Debug, Clone, Copy)]
pub struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    /// Seed must be non-zero: all-zero is a fixed point of xorshift.
    pub const fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    pub fn next(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

/// The mutable state owned by the strategies. Even, Random and
/// Run-To-Completion keep none beyond the PRNG; Round Robin keeps the
/// running slice, Inactive Aging a per-slot age.
pub struct SchedulingState {
    /// Ticks left in the current process's slice (Round Robin).
    pub time_slice: u8,
    /// Per-slot starvation age (Inactive Aging).
    pub ages: [u32; MAX_PROCESSES],
    /// PRNG for the Random strategy, seeded at boot.
    pub rng: Xorshift32,
}

impl SchedulingState {
    pub const fn new(seed: u32) -> Self {
        Self {
            time_slice: 0,
            ages: [0; MAX_PROCESSES],
            rng: Xorshift32::new(seed),
        }
    }
}

/// Clear the private state of a freshly installed strategy. Invoked by
/// `set_strategy` for the incoming kind only; the PRNG keeps its sequence
/// across switches (its position carries no scheduling meaning).
pub fn reset(
    kind: StrategyKind,
    state: &mut SchedulingState,
    slots: &[ProcessSlot; MAX_PROCESSES],
    current: Pid,
) {
    match kind {
        StrategyKind::RoundRobin => {
            state.time_slice = slots[current].priority.max(1);
        }
        StrategyKind::InactiveAging => {
            state.ages = [0; MAX_PROCESSES];
        }
        StrategyKind::Even | StrategyKind::Random | StrategyKind::RunToCompletion => {}
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Select the next process to run under `kind`.
pub fn select(
    kind: StrategyKind,
    slots: &[ProcessSlot; MAX_PROCESSES],
    current: Pid,
    state: &mut SchedulingState,
) -> Pid {
    match kind {
        StrategyKind::Even => even(slots, current),
        StrategyKind::Random => random(slots, &mut state.rng),
        StrategyKind::RunToCompletion => run_to_completion(slots, current),
        StrategyKind::RoundRobin => round_robin(slots, current, state),
        StrategyKind::InactiveAging => inactive_aging(slots, state),
    }
}

/// Whether any slot other than idle is ready.
fn any_user_ready(slots: &[ProcessSlot; MAX_PROCESSES]) -> bool {
    slots
        .iter()
        .enumerate()
        .any(|(pid, slot)| pid != IDLE_PID && slot.is_ready())
}

/// Whether `pid` is selectable: ready, and idle only when nothing else is.
fn selectable(slots: &[ProcessSlot; MAX_PROCESSES], pid: Pid) -> bool {
    if pid == IDLE_PID {
        slots[IDLE_PID].is_ready() && !any_user_ready(slots)
    } else {
        slots[pid].is_ready()
    }
}

// ---------------------------------------------------------------------------
// The five algorithms
// ---------------------------------------------------------------------------

/// Even: starting at `current + 1` (cyclic), the first selectable slot.
/// Over K selectable processes this visits each exactly once per K ticks.
fn even(slots: &[ProcessSlot; MAX_PROCESSES], current: Pid) -> Pid {
    for offset in 1..=MAX_PROCESSES {
        let pid = (current + offset) % MAX_PROCESSES;
        if pid != IDLE_PID && slots[pid].is_ready() {
            return pid;
        }
    }
    IDLE_PID
}

/// Random: uniform pick from a compacted list of the selectable slots.
/// Rejection-free; one PRNG draw per tick.
fn random(slots: &[ProcessSlot; MAX_PROCESSES], rng: &mut Xorshift32) -> Pid {
    let mut candidates = [0 as Pid; MAX_PROCESSES];
    let mut count = 0;
    for (pid, slot) in slots.iter().enumerate() {
        if pid != IDLE_PID && slot.is_ready() {
            candidates[count] = pid;
            count += 1;
        }
    }
    if count == 0 {
        return IDLE_PID;
    }
    candidates[rng.next() as usize % count]
}

/// Run-To-Completion: keep `current` while it is selectable; otherwise
/// advance by the Even rule. With no termination primitive in this
/// revision, the same PID runs until it becomes non-selectable by
/// external means.
fn run_to_completion(slots: &[ProcessSlot; MAX_PROCESSES], current: Pid) -> Pid {
    if selectable(slots, current) {
        current
    } else {
        even(slots, current)
    }
}

/// Round Robin: the current process keeps the CPU until its slice runs
/// dry, then the Even rule rotates to the next slot, whose slice is sized
/// by its priority. The selection tick is the first tick of the new
/// slice, so a slot of priority P runs exactly `max(P, 1)` consecutive
/// ticks per turn — a priority of 0 still gets one tick.
fn round_robin(
    slots: &[ProcessSlot; MAX_PROCESSES],
    current: Pid,
    state: &mut SchedulingState,
) -> Pid {
    if selectable(slots, current) && state.time_slice > 0 {
        state.time_slice -= 1;
        return current;
    }
    let next = even(slots, current);
    state.time_slice = slots[next].priority.max(1) - 1;
    next
}

/// Inactive Aging: every selectable slot ages by its priority, then the
/// slot with the greatest age wins; ties go to the higher priority, then
/// to the smaller PID. The winner's age is cleared, everyone else keeps
/// their (now larger) age, bounding how long a slot can starve.
fn inactive_aging(slots: &[ProcessSlot; MAX_PROCESSES], state: &mut SchedulingState) -> Pid {
    if !any_user_ready(slots) {
        return IDLE_PID;
    }

    let mut best: Option<Pid> = None;
    for (pid, slot) in slots.iter().enumerate() {
        if pid == IDLE_PID || !slot.is_ready() {
            continue;
        }
        state.ages[pid] += slot.priority as u32;

        let better = match best {
            None => true,
            Some(b) => {
                state.ages[pid] > state.ages[b]
                    || (state.ages[pid] == state.ages[b] && slot.priority > slots[b].priority)
            }
        };
        if better {
            best = Some(pid);
        }
    }

    // any_user_ready guarantees a winner
    let winner = best.unwrap_or(IDLE_PID);
    state.ages[winner] = 0;
    winner
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
