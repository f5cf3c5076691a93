//! # Stack Manager
//!
//! Seeds fresh process stacks and computes the integrity checksum the
//! preemption core uses to detect corruption of suspended stacks.
//!
//! Each slot's stack is carved at build time as an inline array inside the
//! slot, so the bottom of every process stack is fixed by the table
//! layout. A freshly created process gets a context frame seeded at the
//! top of its stack such that the very first restore lands the CPU at the
//! program's entry point with a clean register file; the frame layout is
//! owned by the port layer.

use crate::arch::cortex_m4;
use crate::config::STACK_SIZE;
use crate::process::{Program, ProcessSlot};

/// Seed `slot`'s stack for its first activation.
///
/// Writes the initial context frame, records the resulting stack-pointer
/// offset and stores the initial checksum of the seeded image.
pub fn seed(slot: &mut ProcessSlot, program: Program) {
    slot.sp = cortex_m4::seed_frame(&mut slot.stack.0, program as usize);
    slot.checksum = checksum(slot);
}

/// XOR fold over every byte between the stack base (initial top) and the
/// current stack pointer, i.e. the occupied region of the stack.
///
/// Not cryptographic — it only needs to catch stray writes into a
/// suspended stack, and a single flipped byte always changes the fold.
pub fn checksum(slot: &ProcessSlot) -> u8 {
    slot.stack.0[slot.sp..STACK_SIZE]
        .iter()
        .fold(0, |acc, byte| acc ^ byte)
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::cortex_m4::CONTEXT_FRAME_BYTES;

    extern "C" fn looping() -> ! {
        loop {}
    }

    #[test]
    fn seeded_frame_matches_context_save_size() {
        // The placeholder block written at creation must be exactly as
        // long as one full context save, or the first restore would pop
        // garbage.
        let mut slot = ProcessSlot::EMPTY;
        seed(&mut slot, looping);
        assert_eq!(STACK_SIZE - slot.sp, CONTEXT_FRAME_BYTES);
    }

    #[test]
    fn seeded_frame_places_entry_in_pc_slot() {
        let mut slot = ProcessSlot::EMPTY;
        seed(&mut slot, looping);

        // PC is word 14 of the frame, stored little-endian.
        let at = slot.sp + 14 * 4;
        let pc = u32::from_le_bytes(slot.stack.0[at..at + 4].try_into().unwrap());
        assert_eq!(pc, looping as usize as u32);
    }

    #[test]
    fn seeded_registers_are_zeroed() {
        let mut slot = ProcessSlot::EMPTY;
        seed(&mut slot, looping);

        // R4-R11 and R0-R3, R12 placeholders are all zero.
        for word in 0..13 {
            let at = slot.sp + word * 4;
            let value = u32::from_le_bytes(slot.stack.0[at..at + 4].try_into().unwrap());
            assert_eq!(value, 0, "register placeholder {} not zeroed", word);
        }
    }

    #[test]
    fn checksum_detects_single_byte_change() {
        let mut slot = ProcessSlot::EMPTY;
        seed(&mut slot, looping);
        let clean = checksum(&slot);

        slot.stack.0[STACK_SIZE - 3] ^= 0x5a;
        assert_ne!(checksum(&slot), clean);
    }

    #[test]
    fn checksum_is_stable_without_writes() {
        let mut slot = ProcessSlot::EMPTY;
        seed(&mut slot, looping);
        assert_eq!(checksum(&slot), slot.checksum);
        assert_eq!(checksum(&slot), checksum(&slot));
    }
}
