//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2) processor:
//! the context frame layout, SysTick timer configuration, timer-source
//! masking for critical sections, and the preemption handler itself.
//!
//! ## Context Switch Mechanism
//!
//! The Cortex-M4 uses a split-stack model:
//! - **MSP** (Main Stack Pointer): used by interrupt handlers. This is the
//!   dedicated ISR stack — the scheduler's housekeeping never runs on a
//!   (possibly overflowing) process stack.
//! - **PSP** (Process Stack Pointer): used by processes in Thread mode.
//!
//! On exception entry, the hardware automatically stacks R0–R3, R12, LR,
//! PC and xPSR onto the process stack and switches to MSP. The SysTick
//! handler manually saves and restores R4–R11, which completes the full
//! context save/restore. The entire switch — save, strategy dispatch,
//! restore — happens inside this one handler; it is non-reentrant because
//! SysTick cannot preempt itself.
//!
//! ## Interrupt Priorities
//!
//! SysTick runs at priority 0xFF (lowest) so the preemption handler never
//! preempts application-level ISRs.

use crate::config::{STACK_SIZE, SYSTEM_CLOCK_HZ, TICK_HZ};

// ---------------------------------------------------------------------------
// Context frame layout
// ---------------------------------------------------------------------------

/// Registers the hardware stacks on exception entry: R0–R3, R12, LR, PC, xPSR.
pub const HARDWARE_FRAME_WORDS: usize = 8;

/// Registers the handler saves by hand: R4–R11.
pub const SOFTWARE_FRAME_WORDS: usize = 8;

/// Total words in a saved context.
pub const CONTEXT_FRAME_WORDS: usize = HARDWARE_FRAME_WORDS + SOFTWARE_FRAME_WORDS;

/// Total bytes one full context save writes — and one full restore pops.
/// The frame seeded at process creation must be exactly this long.
pub const CONTEXT_FRAME_BYTES: usize = CONTEXT_FRAME_WORDS * 4;

/// xPSR value for a fresh process: Thumb bit set, everything else clear.
const INITIAL_XPSR: u32 = 0x0100_0000;

/// Seed a process stack with the frame the first context restore will pop.
///
/// The restore lands the CPU at `entry` with a clean register file: every
/// register placeholder is zeroed except LR (a trap for the impossible
/// return) and the entry address, stored little-endian where the hardware
/// frame keeps PC.
///
/// ## Stack Layout (top = high offset, growing down)
///
/// ```text
/// [Hardware frame]           STACK_SIZE
///   xPSR  (Thumb bit set)
///   PC    (process entry point)
///   LR    (process_return trap)
///   R12   (0)
///   R3..R0 (0)
/// [Software frame]
///   R11..R4 (0)            <- returned stack-pointer offset
/// ```
///
/// Returns the new stack-pointer offset, `STACK_SIZE - CONTEXT_FRAME_BYTES`.
pub fn seed_frame(stack: &mut [u8; STACK_SIZE], entry: usize) -> usize {
    let sp = STACK_SIZE - CONTEXT_FRAME_BYTES;

    let mut write_word = |index: usize, value: u32| {
        let at = sp + index * 4;
        stack[at..at + 4].copy_from_slice(&value.to_le_bytes());
    };

    // Software frame: R4–R11, zeroed.
    for word in 0..SOFTWARE_FRAME_WORDS {
        write_word(word, 0);
    }

    // Hardware frame: R0–R3, R12, LR, PC, xPSR.
    for word in 8..13 {
        write_word(word, 0);
    }
    write_word(13, process_return as usize as u32);
    write_word(14, entry as u32);
    write_word(15, INITIAL_XPSR);

    sp
}

/// Trap for processes that return. Programs are `fn() -> !`, so this is
/// unreachable unless a process corrupts its own LR slot.
extern "C" fn process_return() -> ! {
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
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure the SysTick timer as the preemption tick source.
///
/// Sets up SysTick to fire at `TICK_HZ` using the processor clock. Each
/// tick enters the `SysTick` handler below.
pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(cortex_m::peripheral::syst::SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// Set SysTick to the lowest interrupt priority so the preemption
/// handler never preempts application-level ISRs.
pub fn set_interrupt_priorities() {
    unsafe {
        // System Handler Priority Register 3 (SHPR3): 0xE000_ED20
        // Bits [31:24] = SysTick priority
        let shpr3: *mut u32 = 0xE000_ED20 as *mut u32;
        let val = core::ptr::read_volatile(shpr3);
        core::ptr::write_volatile(shpr3, val | (0xFF << 24));
    }
}

// ---------------------------------------------------------------------------
// Tick-source masking (critical sections)
// ---------------------------------------------------------------------------

/// SysTick Control and Status Register.
const SYST_CSR: *mut u32 = 0xE000_E010 as *mut u32;

/// SYST_CSR bit enabling the SysTick exception.
const SYST_CSR_TICKINT: u32 = 1 << 1;

/// Mask the preemption interrupt source. The counter keeps running; only
/// the exception is suppressed.
#[inline]
pub fn mask_tick() {
    unsafe {
        let csr = core::ptr::read_volatile(SYST_CSR);
        core::ptr::write_volatile(SYST_CSR, csr & !SYST_CSR_TICKINT);
    }
}

/// Re-arm the preemption interrupt source.
#[inline]
pub fn unmask_tick() {
    unsafe {
        let csr = core::ptr::read_volatile(SYST_CSR);
        core::ptr::write_volatile(SYST_CSR, csr | SYST_CSR_TICKINT);
    }
}

// ---------------------------------------------------------------------------
// First process launch
// ---------------------------------------------------------------------------

/// Hand control to the first process by consuming its seeded frame.
///
/// Called once from `kernel::start()` and never returns. Switches Thread
/// mode to PSP and pops the seeded context by hand, since there is no
/// exception to return from yet.
///
/// # Safety
/// Must only be called once, with `psp` pointing at a frame produced by
/// `seed_frame`.
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub unsafe fn start_first_process(psp: *const u32) -> ! {
    core::arch::asm!(
        // Skip the software frame (8 registers x 4 bytes); a fresh process
        // has nothing worth loading into R4-R11.
        "adds r0, #32",
        "msr psp, r0",

        // Switch Thread mode to PSP (CONTROL.SPSEL = 1).
        "movs r0, #2",
        "msr control, r0",
        "isb",

        // Pop the hardware frame manually.
        "pop {{r0-r3, r12}}",
        "pop {{r4}}",          // LR slot (process_return trap, discarded)
        "pop {{r5}}",          // PC: process entry point
        "pop {{r6}}",          // xPSR (discarded)

        "cpsie i",
        "bx r5",

        in("r0") psp,
        options(noreturn)
    );
}

// ---------------------------------------------------------------------------
// SysTick handler (preemption)
// ---------------------------------------------------------------------------

/// SysTick exception handler — the preemption interrupt.
///
/// ## Sequence
/// 1. Save R4–R11 onto the current process's stack (PSP); the hardware
///    already stacked R0–R3, R12, LR, PC, xPSR on entry.
/// 2. Call the housekeeping entry with the saved-context pointer; it runs
///    on MSP, records the stack pointer, verifies checksums, dispatches
///    the active strategy and returns the chosen process's frame pointer.
/// 3. Restore R4–R11 from the chosen frame and set PSP above it.
/// 4. Exception return (0xFFFFFFFD): the hardware pops the rest and
///    resumes the chosen process, re-enabling interrupts.
///
/// # Safety
/// This is a naked function called directly by the NVIC. It must follow
/// the exact Cortex-M4 exception entry/exit convention.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[unsafe(naked)]
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    core::arch::naked_asm!(
        // --- Save current context ---
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",

        // --- Housekeeping: returns the chosen frame pointer in r0 ---
        "bl {housekeeping}",

        // --- Restore chosen context ---
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",

        // Return to Thread mode on PSP.
        "ldr r0, =0xFFFFFFFD",
        "bx r0",

        housekeeping = sym crate::kernel::preemption_housekeeping,
    );
}
