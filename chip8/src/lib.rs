pub mod clock;
pub mod constants;
mod cpu;
mod devices;
mod error;
mod instr;
pub mod runner;
mod vm;

pub use self::{
    devices::{Devices, InvalidKeyCode, KeyCode},
    error::{Chip8Error, Chip8Result},
    instr::Op,
    vm::{check_program_size, Hz},
};

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        devices::{Devices, KeyCode},
        error::{Chip8Error, Chip8Result},
        runner::{RunStats, Runner},
        vm::{Chip8Conf, Chip8Vm, Flow},
    };
}
