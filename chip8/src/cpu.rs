//! CPU and memory state.
use std::ops::Range;

use crate::{
    constants::*,
    error::{Chip8Error, Chip8Result},
};

/// Core state for a chip8 interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the next instruction to fetch.
    pub(crate) pc: Address,
    /// Stack pointer, the number of return addresses on the stack.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// (I) Pointer register used for memory indexed instructions.
    ///
    /// Not masked to 12 bits, so `ADD I, Vx` can push it past the end of memory.
    /// Accesses through it are bounds checked.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, the buzzer is on.
    pub(crate) sound_timer: u8,
    /// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
    pub(crate) key_state: u16,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],
    /// Screen buffer that is drawn too.
    pub(crate) display: Box<DisplayBuffer>,
    /// Set when a pixel in the display buffer changed, cleared by the consumer.
    pub(crate) display_dirty: bool,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        Self {
            pc: MEM_START as Address,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            key_state: 0,

            ram: Box::new([0; MEM_SIZE]),
            stack: [0; STACK_SIZE],
            display: Box::new([0; DISPLAY_BUFFER_SIZE]),
            display_dirty: false,
        }
    }
}

impl Chip8Cpu {
    pub(crate) fn new() -> Self {
        let mut cpu = Self::default();
        cpu.reset();
        cpu
    }

    /// Zero all state, install the font and point the program counter at `MEM_START`.
    pub(crate) fn reset(&mut self) {
        self.pc = MEM_START as Address;
        self.sp = 0;
        self.registers.fill(0);
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.key_state = 0;

        self.clear_memory();
        self.ram[FONTSET_START..FONTSET_START + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);

        // The blank screen still needs to be presented.
        self.display_dirty = true;
    }

    /// Erase the contents of the memory buffers `ram`, `stack` and `display`.
    pub(crate) fn clear_memory(&mut self) {
        self.ram.fill(0);
        self.stack.fill(0);
        self.display.fill(0);
    }

    pub(crate) fn clear_display(&mut self) {
        self.display.fill(0);
        self.display_dirty = true;
    }

    pub(crate) fn set_key_state(&mut self, key_id: u8, state: bool) {
        if key_id < KEY_COUNT {
            if state {
                self.key_state |= 1 << key_id;
            } else {
                self.key_state &= !(1 << key_id);
            }
        }
    }

    pub(crate) fn key_state(&self, key_id: u8) -> bool {
        if key_id < KEY_COUNT {
            self.key_state & (1 << key_id) > 0
        } else {
            false
        }
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub(crate) fn any_key(&self) -> bool {
        self.key_state > 0
    }

    /// Retrieve the value of the highest key that is pressed down.
    #[inline]
    pub(crate) fn last_key(&self) -> Option<u8> {
        if self.any_key() {
            Some((u16::BITS - 1 - self.key_state.leading_zeros()) as u8)
        } else {
            None
        }
    }

    /// Clear the keyboard input state, setting all keys to up.
    #[inline(always)]
    pub(crate) fn clear_keys(&mut self) {
        self.key_state = 0;
    }

    /// Count down the delay timer.
    #[inline]
    pub(crate) fn tick_delay(&mut self) {
        // The checked_sub implementation uses `unlikely!()` which degrades performance.
        let (val, underflow) = self.delay_timer.overflowing_sub(1);
        if !underflow {
            self.delay_timer = val;
        }
    }

    /// Count down the sound timer.
    ///
    /// Returns `true` when the timer ran out on this tick.
    #[inline]
    pub(crate) fn tick_sound(&mut self) -> bool {
        let (val, underflow) = self.sound_timer.overflowing_sub(1);
        if !underflow {
            self.sound_timer = val;
        }
        !underflow && val == 0
    }

    /// Extract the instruction at the current program counter.
    #[inline]
    pub(crate) fn instr(&self) -> Chip8Result<u16> {
        let pc = self.pc as usize;
        if pc + 1 >= MEM_SIZE {
            return Err(Chip8Error::ProgramCounter { address: self.pc });
        }
        Ok(u16::from_be_bytes([self.ram[pc], self.ram[pc + 1]]))
    }

    /// Range of `len` bytes in RAM starting at the address register.
    ///
    /// Fails without touching memory when the range runs past the end of RAM.
    #[inline]
    pub(crate) fn address_range(&self, len: usize) -> Chip8Result<Range<usize>> {
        let start = self.address as usize;
        let end = start + len;
        if end > MEM_SIZE {
            Err(Chip8Error::MemoryAccess {
                address: start,
                len,
            })
        } else {
            Ok(start..end)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_key_state() {
        let mut cpu = Chip8Cpu::default();

        cpu.set_key_state(0, true);
        assert_eq!(cpu.key_state, 0b00000000_00000001);
        assert!(cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(!cpu.key_state(7));

        cpu.set_key_state(7, true);
        assert_eq!(cpu.key_state, 0b00000000_10000001);
        assert!(cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(cpu.key_state(7));

        cpu.set_key_state(0, false);
        assert_eq!(cpu.key_state, 0b00000000_10000000);
        assert!(!cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(cpu.key_state(7));

        cpu.set_key_state(15, true);
        assert_eq!(cpu.key_state, 0b10000000_10000000);
        assert!(!cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(cpu.key_state(7));
        assert!(cpu.key_state(15));

        // Out of range keys are ignored
        cpu.set_key_state(16, true);
        assert_eq!(cpu.key_state, 0b10000000_10000000);
        assert!(!cpu.key_state(16));
    }

    #[test]
    fn test_last_key() {
        let mut cpu = Chip8Cpu::default();
        assert_eq!(cpu.last_key(), None);

        cpu.set_key_state(0x3, true);
        assert_eq!(cpu.last_key(), Some(0x3));

        cpu.set_key_state(0xC, true);
        assert_eq!(cpu.last_key(), Some(0xC));

        cpu.set_key_state(0xF, true);
        assert_eq!(cpu.last_key(), Some(0xF));

        cpu.set_key_state(0xF, false);
        cpu.set_key_state(0x0, true);
        assert_eq!(cpu.last_key(), Some(0xC));

        cpu.clear_keys();
        assert!(!cpu.any_key());
    }

    #[test]
    fn test_sound_runs_out_once() {
        let mut cpu = Chip8Cpu::default();
        cpu.sound_timer = 2;

        assert!(!cpu.tick_sound());
        assert!(cpu.tick_sound());
        assert!(!cpu.tick_sound());
        assert_eq!(cpu.sound_timer, 0);
    }

    #[test]
    fn test_address_range() {
        let mut cpu = Chip8Cpu::default();
        cpu.address = 0xFFD;
        assert_eq!(cpu.address_range(3).unwrap(), 0xFFD..0x1000);
        assert!(matches!(
            cpu.address_range(4),
            Err(Chip8Error::MemoryAccess {
                address: 0xFFD,
                len: 4
            })
        ));
    }

    #[test]
    fn test_fetch_past_end_of_memory() {
        let mut cpu = Chip8Cpu::new();
        cpu.pc = 0xFFF;
        assert!(matches!(
            cpu.instr(),
            Err(Chip8Error::ProgramCounter { address: 0xFFF })
        ));
    }
}
