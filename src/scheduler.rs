//! # Scheduler Core
//!
//! The process table and the portable half of the preemption machinery.
//!
//! ## Tick Sequence
//!
//! At each timer tick the port layer saves the running process's context
//! onto its own stack, records the stack pointer, and calls
//! [`Scheduler::preempt`] on the ISR stack. `preempt`:
//! 1. Stores the switch-out checksum of the suspended image
//! 2. Marks the current slot `Ready`
//! 3. Dispatches the active strategy to pick the next slot
//! 4. Polls the input collaborator for the task-manager chord
//! 5. Verifies the chosen slot's stored checksum against a recomputation
//!    (a mismatch means a suspended stack was corrupted — fatal)
//! 6. Marks the chosen slot `Running`
//!
//! The port layer then restores the chosen context. Everything here is
//! free of hardware access, so the whole tick path is exercised by
//! host-run tests.

use crate::board::BoardHooks;
use crate::config::{DEFAULT_PRIORITY, MAX_PROCESSES, RANDOM_SEED, TASK_MANAGER_CHORD};
use crate::process::{Pid, ProcessSlot, ProcessState, Program, IDLE_PID};
use crate::stack;
use crate::strategy::{self, SchedulingState, StrategyKind, Xorshift32};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Process-creation failures. Table exhaustion is recoverable and
/// reported to the caller; a misplaced idle slot is a construction
/// violation that the kernel escalates to a halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    /// Every process slot is in use.
    TableFull,
    /// The idle process did not land in slot 0 during init.
    IdleSlotTaken,
}

/// A suspended process's stack image no longer matches its stored
/// checksum. Detected at switch-in; always fatal at the kernel level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackCorruption(pub Pid);

// ---------------------------------------------------------------------------
// Autostart list
// ---------------------------------------------------------------------------

/// One node of the link-time autostart list. Entries are spawned in
/// declaration order, all at `DEFAULT_PRIORITY`.
pub struct AutostartEntry {
    pub program: Program,
    pub next: Option<&'static AutostartEntry>,
}

// ---------------------------------------------------------------------------
// Idle process
// ---------------------------------------------------------------------------

/// The idle program. Owns all the processor time no other process wants;
/// permanently occupies slot 0.
pub extern "C" fn idle() -> ! {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    loop {
        cortex_m::asm::wfi();
    }
    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    loop {
        core::hint::spin_loop();
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// The central scheduler state: the fixed process table, the running
/// process, the active strategy and its private state, and the board
/// hooks. Stored as a global `static mut` in `kernel.rs`.
pub struct Scheduler {
    /// Fixed process table. Index doubles as `Pid`; slot 0 is idle.
    pub slots: [ProcessSlot; MAX_PROCESSES],

    /// Index of the slot in state `Running`.
    pub current: Pid,

    /// Board-support collaborators polled from the tick path.
    pub hooks: BoardHooks,

    /// Active strategy. Private so installs always reset strategy state.
    strategy: StrategyKind,

    /// The strategies' private state.
    scheduling: SchedulingState,
}

impl Scheduler {
    /// A fresh scheduler: empty table, Even strategy, boot-seeded PRNG.
    pub const fn new() -> Self {
        Self {
            slots: [ProcessSlot::EMPTY; MAX_PROCESSES],
            current: IDLE_PID,
            hooks: BoardHooks::SILENT,
            strategy: StrategyKind::Even,
            scheduling: SchedulingState::new(RANDOM_SEED),
        }
    }

    /// Register a program in the first unused slot, ascending.
    ///
    /// Seeds the slot's stack so the first restore lands at the program
    /// entry, and stores the initial checksum. The kernel wrapper guards
    /// this with a critical section; calling it from process context
    /// without one races the tick handler.
    pub fn exec(&mut self, program: Program, priority: u8) -> Result<Pid, ExecError> {
        let pid = self
            .slots
            .iter()
            .position(ProcessSlot::is_unused)
            .ok_or(ExecError::TableFull)?;

        let slot = &mut self.slots[pid];
        slot.program = Some(program);
        slot.priority = priority;
        slot.state = ProcessState::Ready;
        stack::seed(slot, program);

        Ok(pid)
    }

    /// Create the idle process in slot 0, then spawn the autostart chain
    /// in declaration order at `DEFAULT_PRIORITY`.
    pub fn init(
        &mut self,
        autostart: Option<&'static AutostartEntry>,
    ) -> Result<(), ExecError> {
        let pid = self.exec(idle, DEFAULT_PRIORITY)?;
        if pid != IDLE_PID {
            return Err(ExecError::IdleSlotTaken);
        }

        let mut node = autostart;
        while let Some(entry) = node {
            self.exec(entry.program, DEFAULT_PRIORITY)?;
            node = entry.next;
        }
        Ok(())
    }

    /// Hand the CPU to idle: `current = 0`, slot 0 `Running`. The port
    /// layer then points the process stack pointer at slot 0's seeded
    /// frame and performs the first restore.
    pub fn begin(&mut self) {
        self.current = IDLE_PID;
        self.slots[IDLE_PID].state = ProcessState::Running;
    }

    /// The housekeeping slice of the preemption tick. The caller has
    /// already saved the running context and recorded its stack pointer.
    ///
    /// Returns the chosen process, or the corruption it detected — which
    /// the kernel treats as fatal.
    pub fn preempt(&mut self) -> Result<Pid, StackCorruption> {
        let outgoing = &mut self.slots[self.current];
        outgoing.checksum = stack::checksum(outgoing);
        outgoing.state = ProcessState::Ready;

        let next = strategy::select(self.strategy, &self.slots, self.current, &mut self.scheduling);

        if (self.hooks.read_input)() == TASK_MANAGER_CHORD {
            (self.hooks.wait_for_release)();
            (self.hooks.open_task_manager)();
        }

        let incoming = &mut self.slots[next];
        if stack::checksum(incoming) != incoming.checksum {
            return Err(StackCorruption(next));
        }

        incoming.state = ProcessState::Running;
        self.current = next;
        Ok(next)
    }

    /// Record a suspended process's stack pointer, as a byte offset into
    /// its own stack.
    pub fn record_stack_pointer(&mut self, pid: Pid, sp: usize) {
        self.slots[pid].sp = sp;
    }

    /// Install a strategy and reset its private state.
    pub fn set_strategy(&mut self, kind: StrategyKind) {
        self.strategy = kind;
        strategy::reset(kind, &mut self.scheduling, &self.slots, self.current);
    }

    /// The active strategy.
    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// Reseed the Random strategy's generator, e.g. from a hardware
    /// entropy source during boot.
    pub fn seed_random(&mut self, seed: u32) {
        self.scheduling.rng = Xorshift32::new(seed);
    }

    /// The slot of a specific process.
    pub fn slot(&self, pid: Pid) -> &ProcessSlot {
        &self.slots[pid]
    }

    /// Mutable access to the slot of a specific process. Callers outside
    /// the tick path must hold a critical section.
    pub fn slot_mut(&mut self, pid: Pid) -> &mut ProcessSlot {
        &mut self.slots[pid]
    }

    /// The currently running process.
    pub fn current(&self) -> Pid {
        self.current
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STACK_SIZE;
    use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

    extern "C" fn program_a() -> ! {
        loop {}
    }

    extern "C" fn program_b() -> ! {
        loop {}
    }

    fn running_count(sched: &Scheduler) -> usize {
        sched
            .slots
            .iter()
            .filter(|s| s.state == ProcessState::Running)
            .count()
    }

    #[test]
    fn exec_fills_slots_ascending() {
        let mut sched = Scheduler::new();
        assert_eq!(sched.exec(program_a, 10), Ok(0));
        assert_eq!(sched.exec(program_b, 20), Ok(1));

        let slot = sched.slot(1);
        assert_eq!(slot.program, Some(program_b as Program));
        assert_eq!(slot.priority, 20);
        assert_eq!(slot.state, ProcessState::Ready);
        // The seeded frame is in place and accounted for.
        assert!(slot.sp < STACK_SIZE);
        assert_eq!(slot.checksum, stack::checksum(slot));
    }

    #[test]
    fn exec_on_full_table_fails_and_leaves_table_unmodified() {
        // A failed exec must not disturb any populated slot.
        let mut sched = Scheduler::new();
        for _ in 0..MAX_PROCESSES {
            sched.exec(program_a, 5).unwrap();
        }

        let before: [(Option<Program>, u8, ProcessState); MAX_PROCESSES] =
            core::array::from_fn(|pid| {
                let s = sched.slot(pid);
                (s.program, s.priority, s.state)
            });

        assert_eq!(sched.exec(program_b, 9), Err(ExecError::TableFull));

        for (pid, &(program, priority, state)) in before.iter().enumerate() {
            let s = sched.slot(pid);
            assert_eq!(s.program, program);
            assert_eq!(s.priority, priority);
            assert_eq!(s.state, state);
        }
    }

    #[test]
    fn init_places_idle_in_slot_zero_then_autostart_in_order() {
        static SECOND: AutostartEntry = AutostartEntry {
            program: program_b,
            next: None,
        };
        static FIRST: AutostartEntry = AutostartEntry {
            program: program_a,
            next: Some(&SECOND),
        };

        let mut sched = Scheduler::new();
        sched.init(Some(&FIRST)).unwrap();

        assert_eq!(sched.slot(0).program, Some(idle as Program));
        assert_eq!(sched.slot(0).priority, DEFAULT_PRIORITY);
        assert_eq!(sched.slot(1).program, Some(program_a as Program));
        assert_eq!(sched.slot(2).program, Some(program_b as Program));
    }

    #[test]
    fn init_on_dirty_table_reports_misplaced_idle() {
        let mut sched = Scheduler::new();
        sched.exec(program_a, 1).unwrap();
        assert_eq!(sched.init(None), Err(ExecError::IdleSlotTaken));
    }

    #[test]
    fn exactly_one_slot_runs_between_ticks() {
        // One Running slot at all times, and it is always `current`.
        let mut sched = Scheduler::new();
        sched.init(None).unwrap();
        sched.exec(program_a, 3).unwrap();
        sched.exec(program_b, 5).unwrap();
        sched.begin();
        assert_eq!(running_count(&sched), 1);

        for kind in [
            StrategyKind::Even,
            StrategyKind::RoundRobin,
            StrategyKind::InactiveAging,
        ] {
            sched.set_strategy(kind);
            for _ in 0..8 {
                let pid = sched.preempt().unwrap();
                assert_eq!(pid, sched.current());
                assert_eq!(running_count(&sched), 1);
                assert_eq!(sched.slot(pid).state, ProcessState::Running);
            }
        }
    }

    #[test]
    fn untouched_stacks_survive_switch_round_trips() {
        // No stack writes between switch-out and switch-in means the
        // stored checksum always matches the recomputation.
        let mut sched = Scheduler::new();
        sched.init(None).unwrap();
        sched.exec(program_a, 3).unwrap();
        sched.exec(program_b, 5).unwrap();
        sched.begin();

        for _ in 0..16 {
            sched.preempt().unwrap();
        }
    }

    #[test]
    fn corrupted_suspended_stack_is_detected() {
        // Flip one byte of a suspended process's stack image between
        // ticks; the next switch-in of that process must report overflow.
        let mut sched = Scheduler::new();
        sched.init(None).unwrap();
        sched.exec(program_a, 3).unwrap();
        sched.exec(program_b, 5).unwrap();
        sched.begin();

        // Even from idle: slot 1 runs, slot 2 is suspended.
        assert_eq!(sched.preempt(), Ok(1));
        sched.slot_mut(2).stack.0[STACK_SIZE - 7] ^= 0xff;

        assert_eq!(sched.preempt(), Err(StackCorruption(2)));
    }

    #[test]
    fn chord_opens_task_manager_after_release() {
        static INPUT: AtomicU8 = AtomicU8::new(0);
        static RELEASES: AtomicUsize = AtomicUsize::new(0);
        static OPENS: AtomicUsize = AtomicUsize::new(0);

        fn read_input() -> u8 {
            INPUT.load(Ordering::Relaxed)
        }
        fn wait_for_release() {
            RELEASES.fetch_add(1, Ordering::Relaxed);
            INPUT.store(0, Ordering::Relaxed);
        }
        fn open_task_manager() {
            OPENS.fetch_add(1, Ordering::Relaxed);
        }

        let mut sched = Scheduler::new();
        sched.hooks.read_input = read_input;
        sched.hooks.wait_for_release = wait_for_release;
        sched.hooks.open_task_manager = open_task_manager;
        sched.init(None).unwrap();
        sched.exec(program_a, 3).unwrap();
        sched.begin();

        sched.preempt().unwrap();
        assert_eq!(OPENS.load(Ordering::Relaxed), 0, "no chord, no overlay");

        INPUT.store(TASK_MANAGER_CHORD, Ordering::Relaxed);
        sched.preempt().unwrap();
        assert_eq!(RELEASES.load(Ordering::Relaxed), 1);
        assert_eq!(OPENS.load(Ordering::Relaxed), 1);

        sched.preempt().unwrap();
        assert_eq!(OPENS.load(Ordering::Relaxed), 1, "chord released");
    }

    #[test]
    fn reseeded_random_replays_the_same_schedule() {
        let run = |seed: u32| -> [Pid; 16] {
            let mut sched = Scheduler::new();
            sched.init(None).unwrap();
            sched.exec(program_a, 3).unwrap();
            sched.exec(program_b, 5).unwrap();
            sched.begin();
            sched.seed_random(seed);
            sched.set_strategy(StrategyKind::Random);
            core::array::from_fn(|_| sched.preempt().unwrap())
        };

        assert_eq!(run(0xdead_beef), run(0xdead_beef));
    }

    #[test]
    fn strategy_install_resets_private_state() {
        let mut sched = Scheduler::new();
        sched.init(None).unwrap();
        sched.exec(program_a, 4).unwrap();
        sched.exec(program_b, 9).unwrap();
        sched.begin();
        assert_eq!(sched.strategy(), StrategyKind::Even);

        sched.set_strategy(StrategyKind::InactiveAging);
        // Accumulate aging history, then reinstall: the history must
        // vanish so every later pick is explainable by the fresh state.
        for _ in 0..5 {
            sched.preempt().unwrap();
        }
        assert!(sched.scheduling.ages.iter().any(|&age| age != 0));
        sched.set_strategy(StrategyKind::InactiveAging);
        assert_eq!(sched.scheduling.ages, [0; MAX_PROCESSES]);
        assert_eq!(sched.strategy(), StrategyKind::InactiveAging);
    }
}
