//! # StratOS — Strategy-Pluggable Preemptive Kernel
//!
//! A small preemptive multitasking kernel for single-core ARM Cortex-M4
//! microcontrollers, built around a fixed table of process slots and an
//! exchangeable scheduling strategy.
//!
//! ## Overview
//!
//! A hardware timer tick unilaterally suspends the running process, and
//! one of five strategies decides who runs next:
//!
//! - **Even** — cyclic scan, uniform round visitation
//! - **Random** — uniform pick from a seeded PRNG
//! - **Run-To-Completion** — keep the current process while it can run
//! - **Round Robin** — priority-sized time slices
//! - **Inactive Aging** — priority-weighted starvation ages
//!
//! There is no cooperative yield: a process runs until preempted, and
//! suspension happens only at the timer boundary while preemption is
//! unmasked. Programs gate their own table mutations with nested
//! critical sections that mask the preemption timer.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                 Application Programs                   │
//! ├────────────────────────────────────────────────────────┤
//! │                Kernel API (kernel.rs)                  │
//! │  init() · exec() · enter/leave_critical() · start()    │
//! │          set_strategy() · get_strategy()               │
//! ├──────────────┬───────────────────┬────────────────────┤
//! │  Scheduler   │   Strategies      │  Critical Nesting  │
//! │ scheduler.rs │   strategy.rs     │  sync.rs           │
//! │  ─ exec()    │   ─ select()      │  ─ enter()/leave() │
//! │  ─ preempt() │   ─ reset()       │                    │
//! ├──────────────┴───────────────────┴────────────────────┤
//! │   Process Model (process.rs) · Stack Manager (stack.rs)│
//! │   ProcessSlot · ProcessState · seeding · checksums     │
//! ├────────────────────────────────────────────────────────┤
//! │            Port Layer (arch/cortex_m4.rs)              │
//! │   SysTick · context frames · save/restore · launch     │
//! ├────────────────────────────────────────────────────────┤
//! │          ARM Cortex-M4 Hardware (Thumb-2)              │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Integrity
//!
//! Every switch-out stores an XOR checksum of the suspended stack image;
//! every switch-in verifies it before the restore. A mismatch means a
//! suspended stack was overwritten — the kernel halts with a diagnostic
//! rather than resuming a corrupted process.
//!
//! ## Memory Model
//!
//! - **No heap**: all state is statically allocated
//! - **No `alloc`**: pure `core` only
//! - **Fixed-size table**: `[ProcessSlot; MAX_PROCESSES]`
//! - **Per-process stack**: `[u8; STACK_SIZE]` inline in the slot
//! - **ISR stack**: the preemption handler runs on MSP, never on a
//!   process stack

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod board;
pub mod config;
pub mod kernel;
pub mod process;
pub mod scheduler;
pub mod stack;
pub mod strategy;
pub mod sync;
