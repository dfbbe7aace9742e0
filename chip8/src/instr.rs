//! Instruction decoding.
//!
//! Each two byte instruction is decoded into an [`Op`] variant carrying its
//! operands, before the VM executes it. Bit patterns that are not part
//! of the instruction set all land in [`Op::Unknown`].
use std::fmt::{self, Formatter};

use crate::constants::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Op {
    /// 00E0 (CLS)
    ///
    /// Clear the screen.
    ClearScreen,
    /// 00EE (RET)
    ///
    /// Return from the sub-routine.
    Return,
    /// 1nnn (JP addr)
    ///
    /// Jump to the address in `nnn`.
    JumpAddress { address: Address },
    /// 2nnn (CALL addr)
    ///
    /// Call the sub-routine at address `nnn`.
    Call { address: Address },
    /// 3xnn (SE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` equals value `nn`
    Skip_Eq_Byte { vx: u8, nn: u8 },
    /// 4xnn (SNE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` does not equal value `nn`.
    Skip_NotEq_Byte { vx: u8, nn: u8 },
    /// 5xy0 (SE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` equals register `Vy`.
    Skip_Eq { vx: u8, vy: u8 },
    /// 6xnn (LD Vx, byte)
    Load_Byte { vx: u8, nn: u8 },
    /// 7xnn (ADD Vx, byte)
    ///
    /// Add byte to the value in register `Vx`, store the result in `Vx`.
    /// Carry flag is not set.
    Add_Byte { vx: u8, nn: u8 },

    // ------------------------------------------------------------------------
    // Math
    /// 8xy0 (LD Vx, Vy)
    ///
    /// Store the value of register VY in register VX.
    Load_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy1 (OR Vx, Vy)
    Or_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy2 (AND Vx, Vy)
    And_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy3 (XOR Vx, Vy)
    Xor_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy4 (ADD Vx, Vy)
    ///
    /// ADDs VX to VY, and stores the result in VX.
    /// Overflow is wrapped. If overflowed, set VF to 1, else 0.
    Add_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy5 (SUB Vx, Vy)
    ///
    /// Subtracts VY from VX, and stores the result in VX.
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    Sub_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy6 (SHR Vx)
    ///
    /// VF is set to the least-significant bit of Vx, then Vx is shifted right by 1.
    /// VY is unused.
    ShiftRight { vx: u8 },
    /// 8xy7 (SUBN Vx, Vy)
    ///
    /// Subtracts VX from VY, and stores the result in VX.
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    SubReverse_Vx_Vy { vx: u8, vy: u8 },
    /// 8xyE (SHL Vx)
    ///
    /// VF is set to the most-significant bit of Vx, then Vx is shifted left by 1.
    /// VY is unused.
    ShiftLeft { vx: u8 },

    /// 9xy0 (SNE Vx, Vy)
    Skip_NotEq { vx: u8, vy: u8 },
    /// Annn (LD I, addr)
    ///
    /// Load address into register `I`.
    Load_Address { address: Address },
    /// Bnnn (JP V0, addr)
    ///
    /// Jump to location nnn + V0.
    Jump_V0 { address: Address },
    /// Cxnn (RND Vx, byte)
    ///
    /// Generate random number.
    Random { vx: u8, nn: u8 },
    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw sprite to the display buffer.
    Draw { vx: u8, vy: u8, n: u8 },

    // ------------------------------------------------------------------------
    // Keyboard
    /// Ex9E (SKP Vx)
    Skip_Key { vx: u8 },
    /// ExA1 (SKNP Vx)
    Skip_NotKey { vx: u8 },

    // ------------------------------------------------------------------------
    // Timers and memory
    /// Fx07 (LD Vx, DT)
    Load_Vx_Delay { vx: u8 },
    /// Fx0A (LD Vx, K)
    ///
    /// Wait for a key press, store the value of the key in Vx.
    Load_Vx_Key { vx: u8 },
    /// Fx15 (LD DT, Vx)
    Load_Delay_Vx { vx: u8 },
    /// Fx18 (LD ST, Vx)
    Load_Sound_Vx { vx: u8 },
    /// Fx1E (ADD I, Vx)
    Add_Address_Vx { vx: u8 },
    /// Fx29 (LD F, Vx)
    ///
    /// Set I to the font glyph for the digit in Vx.
    Load_Font { vx: u8 },
    /// Fx33 (LD B, Vx)
    ///
    /// Store the binary-coded decimal representation of Vx at I, I+1 and I+2.
    Store_Bcd { vx: u8 },
    /// Fx55 (LD [I], Vx)
    Store_Registers { vx: u8 },
    /// Fx65 (LD Vx, [I])
    Load_Registers { vx: u8 },

    /// Anything else, including `0nnn` machine code routines.
    Unknown(u16),
}

impl Op {
    /// Decode a big-endian instruction word.
    pub fn decode(instr: u16) -> Self {
        let [a, b] = instr.to_be_bytes();
        let op = a >> 4; // 0xF000
        let vx = a & 0xF; // 0x0F00
        let vy = b >> 4; // 0x00F0
        let n = b & 0xF; // 0x000F
        let nn = b; // 0x00FF
        let address = instr & 0x0FFF; // 0x0FFF

        match (op, n) {
            (0x0, _) => match instr {
                0x00E0 => Op::ClearScreen,
                0x00EE => Op::Return,
                _ => Op::Unknown(instr),
            },
            (0x1, _) => Op::JumpAddress { address },
            (0x2, _) => Op::Call { address },
            (0x3, _) => Op::Skip_Eq_Byte { vx, nn },
            (0x4, _) => Op::Skip_NotEq_Byte { vx, nn },
            (0x5, 0x0) => Op::Skip_Eq { vx, vy },
            (0x6, _) => Op::Load_Byte { vx, nn },
            (0x7, _) => Op::Add_Byte { vx, nn },
            (0x8, 0x0) => Op::Load_Vx_Vy { vx, vy },
            (0x8, 0x1) => Op::Or_Vx_Vy { vx, vy },
            (0x8, 0x2) => Op::And_Vx_Vy { vx, vy },
            (0x8, 0x3) => Op::Xor_Vx_Vy { vx, vy },
            (0x8, 0x4) => Op::Add_Vx_Vy { vx, vy },
            (0x8, 0x5) => Op::Sub_Vx_Vy { vx, vy },
            (0x8, 0x6) => Op::ShiftRight { vx },
            (0x8, 0x7) => Op::SubReverse_Vx_Vy { vx, vy },
            (0x8, 0xE) => Op::ShiftLeft { vx },
            (0x9, 0x0) => Op::Skip_NotEq { vx, vy },
            (0xA, _) => Op::Load_Address { address },
            (0xB, _) => Op::Jump_V0 { address },
            (0xC, _) => Op::Random { vx, nn },
            (0xD, _) => Op::Draw { vx, vy, n },
            (0xE, _) => match nn {
                0x9E => Op::Skip_Key { vx },
                0xA1 => Op::Skip_NotKey { vx },
                _ => Op::Unknown(instr),
            },
            (0xF, _) => match nn {
                0x07 => Op::Load_Vx_Delay { vx },
                0x0A => Op::Load_Vx_Key { vx },
                0x15 => Op::Load_Delay_Vx { vx },
                0x18 => Op::Load_Sound_Vx { vx },
                0x1E => Op::Add_Address_Vx { vx },
                0x29 => Op::Load_Font { vx },
                0x33 => Op::Store_Bcd { vx },
                0x55 => Op::Store_Registers { vx },
                0x65 => Op::Load_Registers { vx },
                _ => Op::Unknown(instr),
            },
            _ => Op::Unknown(instr),
        }
    }
}

/// Assembly mnemonics, used for instruction tracing.
impl fmt::Display for Op {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Op::ClearScreen => write!(f, "CLS"),
            Op::Return => write!(f, "RET"),
            Op::JumpAddress { address } => write!(f, "JP 0x{address:03X}"),
            Op::Call { address } => write!(f, "CALL 0x{address:03X}"),
            Op::Skip_Eq_Byte { vx, nn } => write!(f, "SE v{vx:X}, {nn}"),
            Op::Skip_NotEq_Byte { vx, nn } => write!(f, "SNE v{vx:X}, {nn}"),
            Op::Skip_Eq { vx, vy } => write!(f, "SE v{vx:X}, v{vy:X}"),
            Op::Load_Byte { vx, nn } => write!(f, "LD v{vx:X}, {nn}"),
            Op::Add_Byte { vx, nn } => write!(f, "ADD v{vx:X}, {nn}"),
            // ------
            Op::Load_Vx_Vy { vx, vy } => write!(f, "LD v{vx:X}, v{vy:X}"),
            Op::Or_Vx_Vy { vx, vy } => write!(f, "OR v{vx:X}, v{vy:X}"),
            Op::And_Vx_Vy { vx, vy } => write!(f, "AND v{vx:X}, v{vy:X}"),
            Op::Xor_Vx_Vy { vx, vy } => write!(f, "XOR v{vx:X}, v{vy:X}"),
            Op::Add_Vx_Vy { vx, vy } => write!(f, "ADD v{vx:X}, v{vy:X}"),
            Op::Sub_Vx_Vy { vx, vy } => write!(f, "SUB v{vx:X}, v{vy:X}"),
            Op::ShiftRight { vx } => write!(f, "SHR v{vx:X}"),
            Op::SubReverse_Vx_Vy { vx, vy } => write!(f, "SUBN v{vx:X}, v{vy:X}"),
            Op::ShiftLeft { vx } => write!(f, "SHL v{vx:X}"),
            // ------
            Op::Skip_NotEq { vx, vy } => write!(f, "SNE v{vx:X}, v{vy:X}"),
            Op::Load_Address { address } => write!(f, "LD I, 0x{address:03X}"),
            Op::Jump_V0 { address } => write!(f, "JP v0, 0x{address:03X}"),
            Op::Random { vx, nn } => write!(f, "RND v{vx:X}, {nn}"),
            Op::Draw { vx, vy, n } => write!(f, "DRW v{vx:X}, v{vy:X}, {n}"),
            // ------
            Op::Skip_Key { vx } => write!(f, "SKP v{vx:X}"),
            Op::Skip_NotKey { vx } => write!(f, "SKNP v{vx:X}"),
            Op::Load_Vx_Delay { vx } => write!(f, "LD v{vx:X}, DT"),
            Op::Load_Vx_Key { vx } => write!(f, "LD v{vx:X}, K"),
            Op::Load_Delay_Vx { vx } => write!(f, "LD DT, v{vx:X}"),
            Op::Load_Sound_Vx { vx } => write!(f, "LD ST, v{vx:X}"),
            Op::Add_Address_Vx { vx } => write!(f, "ADD I, v{vx:X}"),
            Op::Load_Font { vx } => write!(f, "LD F, v{vx:X}"),
            Op::Store_Bcd { vx } => write!(f, "LD B, v{vx:X}"),
            Op::Store_Registers { vx } => write!(f, "LD [I], v{vx:X}"),
            Op::Load_Registers { vx } => write!(f, "LD v{vx:X}, [I]"),
            // ------
            Op::Unknown(instr) => write!(f, "0x{instr:04X}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_operands() {
        assert_eq!(Op::decode(0x00E0), Op::ClearScreen);
        assert_eq!(Op::decode(0x00EE), Op::Return);
        assert_eq!(Op::decode(0x1ABC), Op::JumpAddress { address: 0xABC });
        assert_eq!(Op::decode(0x2ABC), Op::Call { address: 0xABC });
        assert_eq!(Op::decode(0x3A42), Op::Skip_Eq_Byte { vx: 0xA, nn: 0x42 });
        assert_eq!(Op::decode(0x4A42), Op::Skip_NotEq_Byte { vx: 0xA, nn: 0x42 });
        assert_eq!(Op::decode(0x5AB0), Op::Skip_Eq { vx: 0xA, vy: 0xB });
        assert_eq!(Op::decode(0x6342), Op::Load_Byte { vx: 3, nn: 0x42 });
        assert_eq!(Op::decode(0x7301), Op::Add_Byte { vx: 3, nn: 1 });
        assert_eq!(Op::decode(0x8120), Op::Load_Vx_Vy { vx: 1, vy: 2 });
        assert_eq!(Op::decode(0x8121), Op::Or_Vx_Vy { vx: 1, vy: 2 });
        assert_eq!(Op::decode(0x8122), Op::And_Vx_Vy { vx: 1, vy: 2 });
        assert_eq!(Op::decode(0x8123), Op::Xor_Vx_Vy { vx: 1, vy: 2 });
        assert_eq!(Op::decode(0x8124), Op::Add_Vx_Vy { vx: 1, vy: 2 });
        assert_eq!(Op::decode(0x8125), Op::Sub_Vx_Vy { vx: 1, vy: 2 });
        assert_eq!(Op::decode(0x8126), Op::ShiftRight { vx: 1 });
        assert_eq!(Op::decode(0x8127), Op::SubReverse_Vx_Vy { vx: 1, vy: 2 });
        assert_eq!(Op::decode(0x812E), Op::ShiftLeft { vx: 1 });
        assert_eq!(Op::decode(0x9AB0), Op::Skip_NotEq { vx: 0xA, vy: 0xB });
        assert_eq!(Op::decode(0xA123), Op::Load_Address { address: 0x123 });
        assert_eq!(Op::decode(0xB123), Op::Jump_V0 { address: 0x123 });
        assert_eq!(Op::decode(0xC50F), Op::Random { vx: 5, nn: 0x0F });
        assert_eq!(Op::decode(0xD125), Op::Draw { vx: 1, vy: 2, n: 5 });
        assert_eq!(Op::decode(0xE49E), Op::Skip_Key { vx: 4 });
        assert_eq!(Op::decode(0xE4A1), Op::Skip_NotKey { vx: 4 });
        assert_eq!(Op::decode(0xF607), Op::Load_Vx_Delay { vx: 6 });
        assert_eq!(Op::decode(0xF60A), Op::Load_Vx_Key { vx: 6 });
        assert_eq!(Op::decode(0xF615), Op::Load_Delay_Vx { vx: 6 });
        assert_eq!(Op::decode(0xF618), Op::Load_Sound_Vx { vx: 6 });
        assert_eq!(Op::decode(0xF61E), Op::Add_Address_Vx { vx: 6 });
        assert_eq!(Op::decode(0xF629), Op::Load_Font { vx: 6 });
        assert_eq!(Op::decode(0xF633), Op::Store_Bcd { vx: 6 });
        assert_eq!(Op::decode(0xF655), Op::Store_Registers { vx: 6 });
        assert_eq!(Op::decode(0xF665), Op::Load_Registers { vx: 6 });
    }

    #[test]
    fn test_decode_reserved_patterns() {
        for instr in [
            0x0000, 0x0123, 0x00E1, 0x5AB1, 0x8AB8, 0x8ABF, 0x9AB1, 0xE400, 0xE49F, 0xF600,
            0xF6FF,
        ] {
            assert_eq!(Op::decode(instr), Op::Unknown(instr), "0x{instr:04X}");
        }
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Op::decode(0xD125).to_string(), "DRW v1, v2, 5");
        assert_eq!(Op::decode(0xA2F0).to_string(), "LD I, 0x2F0");
        assert_eq!(Op::decode(0x0123).to_string(), "0x0123");
    }
}
