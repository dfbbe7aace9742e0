//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::Address;

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

/// Errors raised while loading or running a program.
///
/// Every runtime variant is recoverable. The faulting instruction
/// was skipped, and the VM can keep stepping.
#[derive(Debug)]
pub enum Chip8Error {
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram { size: usize },
    /// Program file could not be read.
    Io(std::io::Error),
    /// Subroutine call with all 16 stack slots in use.
    StackOverflow { address: Address },
    /// Return executed without an active call.
    StackUnderflow { address: Address },
    /// Index register pointed a memory transfer past the end of RAM.
    MemoryAccess { address: usize, len: usize },
    /// Jump target outside of program memory.
    InvalidJump { address: Address, target: usize },
    /// Program counter ran off the end of memory.
    ProgramCounter { address: Address },
    Fmt(fmt::Error),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LargeProgram { size } => write!(
                f,
                "program too large for VM memory: {size} bytes, maximum is {}",
                crate::constants::MAX_PROGRAM_SIZE
            ),
            Self::Io(err) => write!(f, "failed to read program: {err}"),
            Self::StackOverflow { address } => {
                write!(f, "call stack overflow at 0x{address:03X}")
            }
            Self::StackUnderflow { address } => {
                write!(f, "call stack underflow at 0x{address:03X}")
            }
            Self::MemoryAccess { address, len } => write!(
                f,
                "memory access out of bounds: {len} bytes at 0x{address:04X}"
            ),
            Self::InvalidJump { address, target } => write!(
                f,
                "invalid jump at 0x{address:03X} to 0x{target:04X}"
            ),
            Self::ProgramCounter { address } => {
                write!(f, "program counter out of bounds: 0x{address:04X}")
            }
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl Chip8Error {
    /// Whether the machine can no longer make progress.
    ///
    /// The program counter is left in place on a fetch fault, so stepping
    /// again fails the same way.
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::ProgramCounter { .. })
    }
}

impl std::error::Error for Chip8Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Fmt(err) => Some(err),
            _ => None,
        }
    }
}

impl From<fmt::Error> for Chip8Error {
    fn from(err: fmt::Error) -> Self {
        Chip8Error::Fmt(err)
    }
}

impl From<std::io::Error> for Chip8Error {
    fn from(err: std::io::Error) -> Self {
        Chip8Error::Io(err)
    }
}
