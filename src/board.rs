//! # Board Collaborators
//!
//! The scheduler core treats the button driver, the task-manager overlay
//! and the display as external collaborators behind plain function
//! pointers, installed once at boot. The defaults are inert so the core
//! runs (and tests) without any board support.

/// Hooks into the board-support layer consumed by the preemption core
/// and the fatal-error path.
#[derive(Clone, Copy)]
pub struct BoardHooks {
    /// Current button state, one button per low bit; 0 = none pressed.
    pub read_input: fn() -> u8,

    /// Spin until every button is released.
    pub wait_for_release: fn(),

    /// Open the task-manager overlay. Invoked from the preemption
    /// handler; atomic from the scheduler's viewpoint.
    pub open_task_manager: fn(),

    /// Show a diagnostic message. Used by the fatal-error path right
    /// before the CPU halts.
    pub show_error: fn(&str),
}

fn no_input() -> u8 {
    0
}

fn no_op() {}

fn swallow_error(_msg: &str) {}

impl BoardHooks {
    /// Inert hooks: no buttons, no overlay, no display.
    pub const SILENT: Self = Self {
        read_input: no_input,
        wait_for_release: no_op,
        open_task_manager: no_op,
        show_error: swallow_error,
    };
}
