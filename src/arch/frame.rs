//! Stack frame layout for Cortex-M context switching.
//!
//! A suspended thread's stack pointer points at a 16-word image:
//!
//! ```text
//!   sp + 15  xPSR   ┐
//!   sp + 14  PC     │
//!   sp + 13  LR     │  hardware frame, pushed on exception entry
//!   sp + 12  R12    │  and popped by exception return
//!   sp + 11  R3     │
//!   sp + 10  R2     │
//!   sp +  9  R1     │
//!   sp +  8  R0     ┘
//!   sp +  7  R11    ┐
//!   ...             │  software frame, pushed/popped by the
//!   sp +  0  R4     ┘  PendSV trampoline (`push {r4-r11}`)
//! ```
//!
//! `build_initial_frame` fabricates the same image for a thread that has
//! never run, so its first switch-in looks exactly like a resume.

use crate::errors::StartError;
use crate::thread::ThreadEntry;

/// Words pushed by the hardware on exception entry (no FPU state).
pub const HW_FRAME_WORDS: usize = 8;

/// Words pushed by the trampoline (R4-R11).
pub const SW_FRAME_WORDS: usize = 8;

/// Size of a fabricated initial frame.
pub const INITIAL_FRAME_WORDS: usize = HW_FRAME_WORDS + SW_FRAME_WORDS;

/// Required alignment of a thread's initial stack top, in bytes.
pub const STACK_ALIGN_BYTES: usize = 8;

/// Bytes per stack word.
pub const WORD_BYTES: usize = core::mem::size_of::<u32>();

/// Thumb execution-state bit in xPSR. Must be set or the core faults on
/// exception return.
pub const XPSR_THUMB: u32 = 1 << 24;

/// Pattern written over the unused part of a fresh stack.
pub const STACK_FILL: u32 = 0xBAAD_F00D;

/// Word offsets from a saved stack pointer.
pub mod offset {
    pub const R4: usize = 0;
    pub const R5: usize = 1;
    pub const R6: usize = 2;
    pub const R7: usize = 3;
    pub const R8: usize = 4;
    pub const R9: usize = 5;
    pub const R10: usize = 6;
    pub const R11: usize = 7;
    pub const R0: usize = 8;
    pub const R1: usize = 9;
    pub const R2: usize = 10;
    pub const R3: usize = 11;
    pub const R12: usize = 12;
    pub const LR: usize = 13;
    pub const PC: usize = 14;
    pub const XPSR: usize = 15;
}

/// Placeholder register values for a thread that has never run.
///
/// Purely a debugging aid: each register gets a value that says which
/// register it came from.
pub mod poison {
    pub const R0: u32 = 0xAAAA_AAA0;
    pub const R1: u32 = 0xAAAA_AAA1;
    pub const R2: u32 = 0xAAAA_AAA2;
    pub const R3: u32 = 0xAAAA_AAA3;
    pub const R4: u32 = 0xAAAA_AAA4;
    pub const R5: u32 = 0xAAAA_AAA5;
    pub const R6: u32 = 0xAAAA_AAA6;
    pub const R7: u32 = 0xAAAA_AAA7;
    pub const R8: u32 = 0xAAAA_AAA8;
    pub const R9: u32 = 0xAAAA_AAA9;
    pub const R10: u32 = 0xAAAA_AAAA;
    pub const R11: u32 = 0xAAAA_AAAB;
    pub const R12: u32 = 0xAAAA_AAAC;
    pub const LR: u32 = 0xAAAA_AAAE;

    /// R4-R11 in push order.
    pub const SOFTWARE: [u32; 8] = [R4, R5, R6, R7, R8, R9, R10, R11];
}

/// Address the stacked PC should hold for `entry`.
///
/// Function pointers on Thumb carry bit 0 set; the stacked return address
/// must not.
pub fn entry_word(entry: ThreadEntry) -> u32 {
    (entry as usize as u32) & !1
}

/// Number of words usable below the 8-byte aligned top of `stack`.
pub fn usable_words(stack: &[u32]) -> usize {
    let base = stack.as_ptr() as usize;
    let end = base + stack.len() * WORD_BYTES;
    let aligned_end = end & !(STACK_ALIGN_BYTES - 1);
    aligned_end.saturating_sub(base) / WORD_BYTES
}

/// Write the initial context frame for `entry` at the top of `stack` and
/// fill the rest with [`STACK_FILL`].
///
/// Returns the address the thread's saved stack pointer must hold. Words
/// above the aligned top are left untouched.
pub fn build_initial_frame(stack: &mut [u32], entry: ThreadEntry) -> Result<usize, StartError> {
    let top = usable_words(stack);
    if top < INITIAL_FRAME_WORDS {
        return Err(StartError::StackTooSmall {
            provided_words: top,
            required_words: INITIAL_FRAME_WORDS,
        });
    }

    let sp = top - INITIAL_FRAME_WORDS;
    let frame = &mut stack[sp..top];

    frame[offset::XPSR] = XPSR_THUMB;
    frame[offset::PC] = entry_word(entry);
    frame[offset::LR] = poison::LR;
    frame[offset::R12] = poison::R12;
    frame[offset::R3] = poison::R3;
    frame[offset::R2] = poison::R2;
    frame[offset::R1] = poison::R1;
    frame[offset::R0] = poison::R0;
    frame[offset::R4..=offset::R11].copy_from_slice(&poison::SOFTWARE);

    stack[..sp].fill(STACK_FILL);

    Ok(stack.as_ptr() as usize + sp * WORD_BYTES)
}

/// Count fill words still intact from the bottom of `stack`.
///
/// A rough high-water mark for inspecting stack usage; it does not detect
/// an overflow that skipped over the fill.
pub fn unused_stack_words(stack: &[u32]) -> usize {
    stack.iter().take_while(|&&word| word == STACK_FILL).count()
}
