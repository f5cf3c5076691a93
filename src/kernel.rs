//! # Kernel
//!
//! Top-level kernel initialization and the public API programs call.
//!
//! The kernel owns the global scheduler instance, wraps every mutation of
//! it in a critical section, and escalates integrity violations to a
//! halt. The preemption handler reaches the scheduler through a raw
//! pointer set during `init()`.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()   ← idle in slot 0, autostart chain, hooks
//!         └─► kernel::start()  ← launch scheduler (no return)
//!               ├─► Configure SysTick
//!               ├─► Set interrupt priorities
//!               └─► Restore slot 0's seeded context
//! ```

use crate::arch::cortex_m4;
use crate::board::BoardHooks;
use crate::process::{Pid, Program};
use crate::scheduler::{AutostartEntry, ExecError, Scheduler};
use crate::strategy::StrategyKind;
use crate::sync::{CriticalCount, MaskTransition};

// ---------------------------------------------------------------------------
// Global kernel state
// ---------------------------------------------------------------------------

/// Global scheduler instance.
///
/// # Safety
/// Accessed via `SCHEDULER_PTR`, which is set during `init()`. All access
/// is wrapped in a critical section or happens inside the preemption
/// handler, which is non-reentrant by hardware.
static mut SCHEDULER: Scheduler = Scheduler::new();

/// Raw pointer to the global scheduler, for the handler path.
///
/// # Safety
/// Set once during `init()`, read from ISR context.
#[no_mangle]
pub static mut SCHEDULER_PTR: *mut Scheduler = core::ptr::null_mut();

/// Critical-section nesting counter. Mutated only with interrupts
/// disabled.
static mut CRITICAL: CriticalCount = CriticalCount::new();

fn scheduler() -> &'static mut Scheduler {
    unsafe { &mut *core::ptr::addr_of_mut!(SCHEDULER) }
}

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Initialize the kernel: install the board hooks, create the idle
/// process in slot 0 and spawn the autostart chain.
///
/// Must be called exactly once, from the main thread, before `start()`.
/// Halts if the process table cannot hold the autostart chain or idle
/// does not land in slot 0.
pub fn init(autostart: Option<&'static AutostartEntry>, hooks: BoardHooks) {
    let sched = scheduler();
    unsafe {
        SCHEDULER_PTR = core::ptr::addr_of_mut!(SCHEDULER);
    }
    sched.hooks = hooks;
    if let Err(err) = sched.init(autostart) {
        match err {
            ExecError::TableFull => fatal("autostart list exceeds process table"),
            ExecError::IdleSlotTaken => fatal("idle process must occupy slot 0"),
        }
    }
}

/// Register a program and return its PID, or `TableFull` when every slot
/// is taken. Multitasking-safe: the table scan and slot population happen
/// inside a critical section, so programs can spawn further programs.
pub fn exec(program: Program, priority: u8) -> Result<Pid, ExecError> {
    enter_critical();
    let result = scheduler().exec(program, priority);
    leave_critical();
    result
}

/// PID of the currently running process.
pub fn current_pid() -> Pid {
    scheduler().current()
}

/// Install a scheduling strategy. The incoming strategy's private state
/// is reset, so every subsequent selection is explainable by the new
/// algorithm alone.
pub fn set_strategy(kind: StrategyKind) {
    enter_critical();
    scheduler().set_strategy(kind);
    leave_critical();
}

/// The active scheduling strategy.
pub fn get_strategy() -> StrategyKind {
    scheduler().strategy()
}

// ---------------------------------------------------------------------------
// Critical sections
// ---------------------------------------------------------------------------

/// Enter a critical section: masks the preemption timer and bumps the
/// nesting counter. The global interrupt-enable state is snapshotted
/// before and restored after, so other interrupt sources keep firing.
/// Supports up to 255 nested sections.
pub fn enter_critical() {
    let was_enabled = cortex_m::register::primask::read().is_active();
    cortex_m::interrupt::disable();

    let transition = unsafe { (*core::ptr::addr_of_mut!(CRITICAL)).enter() };
    apply_transition(transition);

    if was_enabled {
        unsafe { cortex_m::interrupt::enable() };
    }
}

/// Leave a critical section. Only the outermost leave re-arms the
/// preemption timer; leaving with a zero counter is tolerated and does
/// nothing.
pub fn leave_critical() {
    let was_enabled = cortex_m::register::primask::read().is_active();
    cortex_m::interrupt::disable();

    let transition = unsafe { (*core::ptr::addr_of_mut!(CRITICAL)).leave() };
    apply_transition(transition);

    if was_enabled {
        unsafe { cortex_m::interrupt::enable() };
    }
}

fn apply_transition(transition: MaskTransition) {
    match transition {
        MaskTransition::Mask => cortex_m4::mask_tick(),
        MaskTransition::Unmask => cortex_m4::unmask_tick(),
        MaskTransition::None => {}
    }
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// Start the scheduler. **Does not return.**
///
/// Configures the SysTick timer, marks idle as running and restores slot
/// 0's seeded context. From that moment the system is multitasking.
///
/// # Safety contract
/// `init()` must have been called. Must be called from the main thread.
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub fn start(mut core_peripherals: cortex_m::Peripherals) -> ! {
    cortex_m4::configure_systick(&mut core_peripherals.SYST);
    cortex_m4::set_interrupt_priorities();

    let sched = scheduler();
    sched.begin();

    let slot = sched.slot(crate::process::IDLE_PID);
    let psp = unsafe { slot.stack.0.as_ptr().add(slot.sp) } as *const u32;

    unsafe { cortex_m4::start_first_process(psp) }
}

// ---------------------------------------------------------------------------
// Preemption entry
// ---------------------------------------------------------------------------

/// Housekeeping half of the preemption tick, called from the SysTick
/// handler with the just-saved context pointer. Runs on the ISR stack.
/// Returns the frame pointer of the process to restore.
///
/// # Safety
/// Called from the handler only, after `init()`.
#[no_mangle]
pub extern "C" fn preemption_housekeeping(psp: *mut u32) -> *mut u32 {
    let sched = unsafe { &mut *SCHEDULER_PTR };

    let current = sched.current();
    let base = sched.slots[current].stack.0.as_ptr() as usize;
    sched.record_stack_pointer(current, psp as usize - base);

    match sched.preempt() {
        Ok(next) => {
            let slot = sched.slot(next);
            unsafe { slot.stack.0.as_ptr().add(slot.sp) as *mut u32 }
        }
        Err(_) => fatal("Stack overflow detected"),
    }
}

// ---------------------------------------------------------------------------
// Error surface
// ---------------------------------------------------------------------------

/// Report a fatal condition through the display hook and halt the CPU.
/// Nothing recovers from this; corruption and construction-invariant
/// violations end here.
pub fn fatal(msg: &str) -> ! {
    cortex_m::interrupt::disable();
    unsafe {
        if !SCHEDULER_PTR.is_null() {
            ((*SCHEDULER_PTR).hooks.show_error)(msg);
        }
    }
    loop {
        cortex_m::asm::wfi();
    }
}
