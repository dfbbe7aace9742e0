//! Virtual machine.
use std::{
    fmt::{self, Write},
    fs,
    path::Path,
    time::Duration,
};

use log::{debug, warn};
use rand::prelude::*;

use crate::{
    constants::*,
    cpu::Chip8Cpu,
    devices::KeyCode,
    error::{Chip8Error, Chip8Result},
    instr::Op,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    rng: StdRng,
    conf: Chip8Conf,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        Chip8Vm {
            cpu: Chip8Cpu::new(),
            rng: Self::create_rng(&conf),
            conf,
        }
    }

    fn create_rng(conf: &Chip8Conf) -> StdRng {
        match conf.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Clear all machine state in preparation for a fresh startup.
    ///
    /// Registers, timers, stack, keys, memory and display are zeroed,
    /// the built-in font is installed and the program counter points
    /// at the start of program memory.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.rng = Self::create_rng(&self.conf);
    }

    /// Reset the machine and copy the program into memory at `MEM_START`.
    ///
    /// A program that is too large is rejected before any state is touched.
    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if !check_program_size(bytecode) {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
            });
        }

        // Start with clean memory to avoid leaking previous program.
        self.reset();

        // Load program into virtual RAM
        self.cpu.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);

        debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }

    /// Read a ROM file and load it.
    pub fn load_file(&mut self, filepath: impl AsRef<Path>) -> Chip8Result<()> {
        let filepath = filepath.as_ref();
        debug!("load rom: {}", filepath.display());

        let bytecode = fs::read(filepath)?;
        self.load_bytecode(&bytecode)
    }

    pub fn display_buffer(&self) -> &DisplayBuffer {
        &self.cpu.display
    }

    /// Whether the display changed since the last frame was consumed.
    pub fn is_display_dirty(&self) -> bool {
        self.cpu.display_dirty
    }

    pub fn clear_display_dirty(&mut self) {
        self.cpu.display_dirty = false;
    }

    /// Consume the current frame, if the display changed since the last one.
    pub fn take_frame(&mut self) -> Option<&DisplayBuffer> {
        if self.cpu.display_dirty {
            self.cpu.display_dirty = false;
            Some(&*self.cpu.display)
        } else {
            None
        }
    }
}

/// Check that the program fits in memory after the reserved interpreter area.
#[inline]
pub fn check_program_size(bytecode: &[u8]) -> bool {
    bytecode.len() <= MAX_PROGRAM_SIZE
}

/// Outcome of a single step, for the driver to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display was cleared or drawn to.
    Draw,
    /// The sound timer was set.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
    /// The instruction is not part of the instruction set and was skipped.
    Unknown(u16),
}

/// VM Configuration Parameters.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Chip8Conf {
    /// Instruction rate. Defaults to `DEFAULT_CLOCK_FREQUENCY`.
    pub clock_frequency: Option<Hz>,
    /// Seed for the random number generator used by `RND`.
    ///
    /// Seeded from system entropy when not set.
    pub seed: Option<u64>,
}

impl Chip8Conf {
    pub fn clock_frequency(&self) -> Hz {
        self.clock_frequency.unwrap_or(Hz(DEFAULT_CLOCK_FREQUENCY))
    }
}

/// CPU clock frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Interpreter
impl Chip8Vm {
    /// Sets the keyboard key input state.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.set_key_state(key.as_u8(), pressed);
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.cpu.key_state(key.as_u8())
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.clear_keys()
    }

    /// Count down the delay and sound timers once.
    ///
    /// Must be called at 60Hz by the driver. Returns `true` when the
    /// sound timer ran out on this tick, which is when a tone is emitted.
    pub fn tick_timers(&mut self) -> bool {
        self.cpu.tick_delay();
        self.cpu.tick_sound()
    }

    /// Buzzer should be on while sound timer counts down.
    pub fn buzzer(&self) -> bool {
        self.cpu.sound_timer > 0
    }

    /// Execute up to `step_count` instructions, stopping at the first error.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<()> {
        for _ in 0..step_count {
            self.step()?;
        }

        Ok(())
    }

    /// Fetch, decode and execute exactly one instruction.
    ///
    /// Errors are recoverable. The faulting instruction is skipped
    /// without side effects, and stepping can continue.
    pub fn step(&mut self) -> Chip8Result<Flow> {
        let pc = self.cpu.pc;
        let op = Op::decode(self.cpu.instr()?);

        op_trace(pc, &op);

        // Instructions that transfer control overwrite this.
        self.cpu.pc = pc + 2;

        self.exec(pc, op)
    }

    fn exec(&mut self, pc: Address, op: Op) -> Chip8Result<Flow> {
        let cpu = &mut self.cpu;
        let mut control_flow = Flow::Ok;

        match op {
            // 00E0 (CLS)
            //
            // Clear display
            Op::ClearScreen => {
                cpu.clear_display();
                control_flow = Flow::Draw;
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Pop the address of the calling instruction and continue after it.
            Op::Return => {
                if cpu.sp == 0 {
                    return Err(Chip8Error::StackUnderflow { address: pc });
                }
                cpu.sp -= 1;
                cpu.pc = cpu.stack[cpu.sp] + 2;
                control_flow = Flow::Jump;
            }
            // 1nnn (JP addr)
            //
            // Jump to address.
            Op::JumpAddress { address } => {
                self.jump(pc, address as usize)?;
                control_flow = Flow::Jump;
            }
            // 2nnn (CALL addr)
            //
            // Call subroutine at nnn.
            Op::Call { address } => {
                if cpu.sp >= STACK_SIZE {
                    return Err(Chip8Error::StackOverflow { address: pc });
                }
                check_jump(pc, address as usize)?;
                cpu.stack[cpu.sp] = pc;
                cpu.sp += 1;
                cpu.pc = address;
                control_flow = Flow::Jump;
            }
            // 3xnn (SE Vx, byte)
            //
            // Skip the next instruction if register VX equals value NN.
            Op::Skip_Eq_Byte { vx, nn } => {
                if cpu.registers[vx as usize] == nn {
                    cpu.pc += 2;
                }
            }
            // 4xnn (SNE Vx, byte)
            //
            // Skip the next instruction if register VX does not equal value NN.
            Op::Skip_NotEq_Byte { vx, nn } => {
                if cpu.registers[vx as usize] != nn {
                    cpu.pc += 2;
                }
            }
            // 5xy0 (SE Vx, Vy)
            Op::Skip_Eq { vx, vy } => {
                if cpu.registers[vx as usize] == cpu.registers[vy as usize] {
                    cpu.pc += 2;
                }
            }
            // 6xnn (LD Vx, byte)
            Op::Load_Byte { vx, nn } => {
                cpu.registers[vx as usize] = nn;
            }
            // 7xnn (ADD Vx, byte)
            //
            // Add value NN to register VX. Carry flag is not set.
            Op::Add_Byte { vx, nn } => {
                let x = cpu.registers[vx as usize];
                cpu.registers[vx as usize] = x.wrapping_add(nn);
            }
            // ----------------------------------------------------------------
            // 8xy0 (LD Vx, Vy)
            Op::Load_Vx_Vy { vx, vy } => {
                cpu.registers[vx as usize] = cpu.registers[vy as usize];
            }
            // 8xy1 (OR Vx, Vy)
            Op::Or_Vx_Vy { vx, vy } => {
                cpu.registers[vx as usize] |= cpu.registers[vy as usize];
            }
            // 8xy2 (AND Vx, Vy)
            Op::And_Vx_Vy { vx, vy } => {
                cpu.registers[vx as usize] &= cpu.registers[vy as usize];
            }
            // 8xy3 (XOR Vx, Vy)
            Op::Xor_Vx_Vy { vx, vy } => {
                cpu.registers[vx as usize] ^= cpu.registers[vy as usize];
            }
            // 8xy4 (ADD Vx, Vy)
            //
            // Overflow is wrapped. If overflow, set VF to 1, else 0.
            // The flag is written last, so it wins when VX is VF.
            Op::Add_Vx_Vy { vx, vy } => {
                let (x, y) = (cpu.registers[vx as usize], cpu.registers[vy as usize]);
                let (result, carry) = x.overflowing_add(y);
                cpu.registers[vx as usize] = result;
                cpu.registers[FLAG_REGISTER] = carry as u8;
            }
            // 8xy5 (SUB Vx, Vy)
            //
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::Sub_Vx_Vy { vx, vy } => {
                let (x, y) = (cpu.registers[vx as usize], cpu.registers[vy as usize]);
                cpu.registers[vx as usize] = x.wrapping_sub(y);
                cpu.registers[FLAG_REGISTER] = (x >= y) as u8;
            }
            // 8xy6 (SHR Vx)
            //
            // VF is the bit shifted out, taken before the shift.
            Op::ShiftRight { vx } => {
                let x = cpu.registers[vx as usize];
                cpu.registers[vx as usize] = x >> 1;
                cpu.registers[FLAG_REGISTER] = x & 1;
            }
            // 8xy7 (SUBN Vx, Vy)
            //
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::SubReverse_Vx_Vy { vx, vy } => {
                let (x, y) = (cpu.registers[vx as usize], cpu.registers[vy as usize]);
                cpu.registers[vx as usize] = y.wrapping_sub(x);
                cpu.registers[FLAG_REGISTER] = (y >= x) as u8;
            }
            // 8xyE (SHL Vx)
            Op::ShiftLeft { vx } => {
                let x = cpu.registers[vx as usize];
                cpu.registers[vx as usize] = x << 1;
                cpu.registers[FLAG_REGISTER] = (x >> 7) & 1;
            }
            // ----------------------------------------------------------------
            // 9xy0 (SNE Vx, Vy)
            Op::Skip_NotEq { vx, vy } => {
                if cpu.registers[vx as usize] != cpu.registers[vy as usize] {
                    cpu.pc += 2;
                }
            }
            // Annn (LD I, addr)
            Op::Load_Address { address } => {
                cpu.address = address;
            }
            // Bnnn (JP V0, addr)
            Op::Jump_V0 { address } => {
                let target = cpu.registers[0] as usize + address as usize;
                self.jump(pc, target)?;
                control_flow = Flow::Jump;
            }
            // Cxnn (RND Vx, byte)
            //
            // Set register VX to the result of bitwise AND between a random number and NN.
            Op::Random { vx, nn } => {
                cpu.registers[vx as usize] = self.rng.gen::<u8>() & nn;
            }
            // Dxyn (DRW Vx, Vy, nibble)
            Op::Draw { vx, vy, n } => {
                self.draw(vx, vy, n);
                control_flow = Flow::Draw;
            }
            // ----------------------------------------------------------------
            // Ex9E (SKP Vx)
            Op::Skip_Key { vx } => {
                if cpu.key_state(cpu.registers[vx as usize]) {
                    cpu.pc += 2;
                }
            }
            // ExA1 (SKNP Vx)
            Op::Skip_NotKey { vx } => {
                if !cpu.key_state(cpu.registers[vx as usize]) {
                    cpu.pc += 2;
                }
            }
            // ----------------------------------------------------------------
            // Fx07 (LD Vx, DT)
            Op::Load_Vx_Delay { vx } => {
                cpu.registers[vx as usize] = cpu.delay_timer;
            }
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            Op::Load_Vx_Key { vx } => {
                if let Some(k) = cpu.last_key() {
                    cpu.registers[vx as usize] = k;
                } else {
                    // rewind the program counter to stall the machine
                    cpu.pc = pc;
                    control_flow = Flow::KeyWait;
                }
            }
            // Fx15 (LD DT, Vx)
            Op::Load_Delay_Vx { vx } => {
                cpu.delay_timer = cpu.registers[vx as usize];
            }
            // Fx18 (LD ST, Vx)
            Op::Load_Sound_Vx { vx } => {
                cpu.sound_timer = cpu.registers[vx as usize];
                control_flow = Flow::Sound;
            }
            // Fx1E (ADD I, Vx)
            //
            // VF is set when I overflows the 12-bit address space.
            Op::Add_Address_Vx { vx } => {
                let sum = cpu.address as usize + cpu.registers[vx as usize] as usize;
                cpu.address = sum as Address;
                cpu.registers[FLAG_REGISTER] = (sum > MAX_ADDRESS) as u8;
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of sprite for digit Vx.
            Op::Load_Font { vx } => {
                let x = (cpu.registers[vx as usize] & 0xF) as usize;
                cpu.address = (FONTSET_START + x * FONTSET_HEIGHT) as Address;
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            Op::Store_Bcd { vx } => {
                let range = cpu.address_range(3)?;
                let x = cpu.registers[vx as usize];
                cpu.ram[range].copy_from_slice(&[
                    x / 100,
                    x / 10  % 10,
                    x       % 10,
                ]);
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            // I is left pointing after the last byte written.
            Op::Store_Registers { vx } => {
                let count = vx as usize + 1;
                let range = cpu.address_range(count)?;
                cpu.ram[range].copy_from_slice(&cpu.registers[..count]);
                cpu.address += count as Address;
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            Op::Load_Registers { vx } => {
                let count = vx as usize + 1;
                let range = cpu.address_range(count)?;
                cpu.registers[..count].copy_from_slice(&cpu.ram[range]);
                cpu.address += count as Address;
            }
            // ----------------------------------------------------------------
            // Unsupported operation.
            Op::Unknown(instr) => {
                warn!("unknown opcode 0x{instr:04X} at 0x{pc:03X}, skipping");
                control_flow = Flow::Unknown(instr);
            }
        }

        Ok(control_flow)
    }

    /// Transfer control, rejecting targets outside of program memory.
    #[inline]
    fn jump(&mut self, pc: Address, target: usize) -> Chip8Result<()> {
        check_jump(pc, target)?;
        self.cpu.pc = target as Address;
        Ok(())
    }

    /// Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
    ///
    /// Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
    /// memory pointed to by address register I.
    ///
    /// Pixels falling outside of the display area are dropped, not wrapped.
    ///
    /// If the drawing operation erases existing pixels in the display buffer, register VF is set to
    /// 1, and set to 0 if no display bits are unset. This is used for collision detection.
    fn draw(&mut self, vx: u8, vy: u8, n: u8) {
        let cpu = &mut self.cpu;
        let (x, y) = (
            cpu.registers[vx as usize] as usize,
            cpu.registers[vy as usize] as usize,
        );
        let mut is_erased = false;
        let mut is_changed = false;

        // Iteration from pointer in address register I to number of rows specified by opcode value N.
        // Rows past the end of memory are not read.
        let rows = cpu
            .ram
            .iter()
            .copied()
            .skip(cpu.address as usize)
            .take(n as usize);

        for (r, row) in rows.enumerate() {
            let py = y + r;
            if py >= DISPLAY_HEIGHT {
                break;
            }

            // Each row is 8 bits representing the 8 pixels of the sprite.
            for c in 0..SPRITE_WIDTH {
                let px = x + c;
                if px >= DISPLAY_WIDTH {
                    break;
                }
                if (row >> (7 - c)) & 1 == 0 {
                    continue;
                }

                let d = px + py * DISPLAY_WIDTH;

                // XOR erases a pixel when both the old and new values are both 1.
                is_erased |= cpu.display[d] == 1;
                cpu.display[d] ^= 1;
                is_changed = true;
            }
        }

        // If a pixel was erased, then a collision occurred.
        cpu.registers[FLAG_REGISTER] = is_erased as u8;
        if is_changed {
            cpu.display_dirty = true;
        }
    }
}

#[inline]
fn check_jump(pc: Address, target: usize) -> Chip8Result<()> {
    if (MEM_START..=MAX_ADDRESS).contains(&target) {
        Ok(())
    } else {
        Err(Chip8Error::InvalidJump {
            address: pc,
            target,
        })
    }
}

/// Registers
impl Chip8Vm {
    pub fn pc(&self) -> Address {
        self.cpu.pc
    }

    /// Number of return addresses on the call stack.
    pub fn sp(&self) -> usize {
        self.cpu.sp
    }

    /// Active part of the call stack, oldest call first.
    pub fn stack(&self) -> &[Address] {
        &self.cpu.stack[..self.cpu.sp]
    }

    /// Address register `I`.
    pub fn index(&self) -> Address {
        self.cpu.address
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.cpu.registers
    }

    pub fn delay_timer(&self) -> u8 {
        self.cpu.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.cpu.sound_timer
    }

    pub fn memory(&self) -> &[u8] {
        &self.cpu.ram[..]
    }
}

/// Troubleshooting
impl Chip8Vm {
    /// Returns the contents of the program memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let iter = self
            .cpu
            .ram
            .iter()
            .enumerate()
            .skip(MEM_START)
            .take(count)
            .step_by(2);
        let mut buf = String::new();

        for (i, op) in iter {
            let next = self.cpu.ram.get(i + 1).copied().unwrap_or(0);
            writeln!(buf, "{:04X}: {:02X}{:02X}", i, op, next)?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for row in self.cpu.display.chunks(DISPLAY_WIDTH) {
            for px in row {
                if *px != 0 {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.cpu.any_key() {
            write!(buf, "keys:")?;
            for key in KeyCode::ALL {
                if self.is_key_pressed(key) {
                    write!(buf, " {key}")?;
                }
            }
        }

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(pc: Address, op: &Op) {
    log::trace!("{pc:04X}: {op}");
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: Address, _: &Op) {}
