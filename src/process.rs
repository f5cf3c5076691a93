//! # Process Table Entries
//!
//! Defines the process model for StratOS. Each process occupies one slot
//! of a fixed-size table; the slot index doubles as the process ID. A slot
//! carries everything the preemption core needs to suspend and resume the
//! process: its program entry, priority, execution state, saved stack
//! pointer, and the checksum of its suspended stack image.

use crate::config::STACK_SIZE;

// ---------------------------------------------------------------------------
// Process identity
// ---------------------------------------------------------------------------

/// Process identifier: the index of the process's slot in the table.
pub type Pid = usize;

/// Slot index permanently reserved for the idle process.
pub const IDLE_PID: Pid = 0;

/// A program is a zero-argument entry function that never returns.
/// It owns no heap; its mutable state lives on its own stack.
pub type Program = extern "C" fn() -> !;

// ---------------------------------------------------------------------------
// Process state machine
// ---------------------------------------------------------------------------

/// Execution state of a process slot.
///
/// ```text
///   ┌──────────┐      exec()       ┌─────────┐
///   │  Unused  │ ────────────────► │  Ready  │
///   └──────────┘                   └─────────┘
///                                    ▲     │ selected by strategy
///                          preempted │     ▼
///                                  ┌───────────┐
///                                  │  Running  │
///                                  └───────────┘
/// ```
///
/// No slot returns to `Unused` in this revision; `Blocked` is reserved
/// for a later revision and never produced by the preemption core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Slot is free. Its other fields are unspecified and must not be read.
    Unused,
    /// Process is ready to run and waiting to be selected.
    Ready,
    /// Process is currently executing on the CPU.
    Running,
    /// Reserved: process is waiting for an event. Not produced here.
    Blocked,
}

// ---------------------------------------------------------------------------
// Process slot
// ---------------------------------------------------------------------------

/// One entry of the fixed-size process table.
///
/// Slots are stored inline in a static array — no heap allocation. Each
/// slot embeds its own stack; the saved stack pointer is kept as a byte
/// offset into that stack so the bookkeeping stays address-independent
/// (the port layer translates to and from real pointers).
///
/// Outside the `Unused` state, `program` is always `Some` and `priority`
/// is immutable.
pub struct ProcessSlot {
    /// Program entry. `None` only while the slot is `Unused`.
    pub program: Option<Program>,

    /// Static priority, 0 (least favoured) to 255 (most favoured).
    pub priority: u8,

    /// Current execution state.
    pub state: ProcessState,

    /// Byte offset of the saved-context top within `stack`. The stack
    /// grows downward from `STACK_SIZE`; the occupied region is
    /// `stack[sp..STACK_SIZE]`.
    pub sp: usize,

    /// XOR fold over the occupied stack region, taken when the process
    /// was last switched out. Compared before every switch-in.
    pub checksum: u8,

    /// Per-process stack memory. Aligned to 8 bytes as required by the
    /// ARM AAPCS.
    pub stack: Stack,
}

/// Inline process stack with the alignment the exception frame requires.
#[repr(align(8))]
pub struct Stack(pub [u8; STACK_SIZE]);

impl ProcessSlot {
    /// An unused slot. Used to initialize the static table.
    pub const EMPTY: Self = Self {
        program: None,
        priority: 0,
        state: ProcessState::Unused,
        sp: STACK_SIZE,
        checksum: 0,
        stack: Stack([0; STACK_SIZE]),
    };

    /// Whether this slot may be handed the CPU: it is `Ready`. Idle
    /// exclusion is the strategies' business, not the slot's.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == ProcessState::Ready
    }

    /// Whether this slot is free for `exec` to claim.
    #[inline]
    pub fn is_unused(&self) -> bool {
        self.state == ProcessState::Unused
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn looping() -> ! {
        loop {}
    }

    #[test]
    fn empty_slot_has_no_program() {
        let slot = ProcessSlot::EMPTY;
        assert!(slot.is_unused());
        assert!(slot.program.is_none());
        assert_eq!(slot.sp, STACK_SIZE);
    }

    #[test]
    fn ready_predicate_tracks_state() {
        let mut slot = ProcessSlot::EMPTY;
        assert!(!slot.is_ready());

        slot.program = Some(looping);
        slot.state = ProcessState::Ready;
        assert!(slot.is_ready());
        assert!(!slot.is_unused());

        slot.state = ProcessState::Running;
        assert!(!slot.is_ready());
    }
}
