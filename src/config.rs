//! # StratOS Configuration
//!
//! Compile-time constants governing the scheduler and system behavior.
//! All limits are fixed at compile time — no dynamic allocation.

/// Maximum number of process slots the system can manage simultaneously.
/// This bounds the static process table. Increase with care — each slot
/// carries `STACK_SIZE` bytes of RAM. Slot 0 is reserved for idle.
pub const MAX_PROCESSES: usize = 8;

/// SysTick frequency in Hz. Determines the preemption tick granularity.
/// Higher values give finer scheduling precision at the cost of
/// increased interrupt overhead.
pub const TICK_HZ: u32 = 1000;

/// Priority assigned to the idle process and to every autostart program.
/// 0 is least favoured, 255 most favoured. Priorities are immutable
/// after process creation.
pub const DEFAULT_PRIORITY: u8 = 1;

/// Per-process stack size in bytes. Must be large enough for the
/// deepest call chain plus the hardware exception frame (32 bytes)
/// and the software-saved context (32 bytes for R4–R11).
pub const STACK_SIZE: usize = 1024;

/// Button chord that opens the task-manager overlay when observed by the
/// preemption handler: buttons 1 and 4 held together. Hardware-specific;
/// compared against the mask reported by the input collaborator.
pub const TASK_MANAGER_CHORD: u8 = 0b0000_1000 | 0b0000_0001;

/// Boot seed for the Random strategy's pseudo-random generator.
/// Must be non-zero (xorshift has an all-zero fixed point). A fixed seed
/// makes Random reproducible; a port may reseed from a hardware entropy
/// source via `Scheduler::seed_random`.
pub const RANDOM_SEED: u32 = 0x7b83_9d2c;

/// System clock frequency in Hz (default for STM32F4 at 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;
