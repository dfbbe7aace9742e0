//! Driver loop.
//!
//! Steps the VM at its instruction rate, counts down the timers at 60Hz,
//! and shuttles input, frames and tones between the VM and the [`Devices`].
use std::time::Duration;

use log::{trace, warn};

use crate::{
    clock::Clock,
    constants::*,
    devices::{Devices, KeyCode},
    error::Chip8Result,
    vm::{Chip8Vm, Flow},
};

pub struct Runner<D> {
    vm: Chip8Vm,
    devices: D,
    clock: Clock,
    /// Block on the clock before every step to run at the configured rate.
    throttle: bool,
    /// Number of instructions executed per 60Hz timer tick.
    steps_per_tick: u64,
    stats: RunStats,
}

/// Counters collected while running.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub steps: u64,
    pub frames: u64,
    pub tones: u64,
    /// Instructions skipped because they are not part of the instruction set.
    pub unknown: u64,
    /// Instructions skipped because they faulted.
    pub faults: u64,
}

impl<D: Devices> Runner<D> {
    pub fn new(vm: Chip8Vm, devices: D) -> Self {
        let freq = vm.config().clock_frequency();
        let steps_per_tick = (freq.0 / DELAY_FREQUENCY).max(1);

        Self {
            vm,
            devices,
            clock: Clock::new(Duration::from(freq)),
            throttle: true,
            steps_per_tick,
            stats: RunStats::default(),
        }
    }

    /// Run as fast as possible instead of at the configured clock frequency.
    ///
    /// Timers are still counted in instructions, so programs observe
    /// the same timing, only faster.
    pub fn with_throttle(mut self, throttle: bool) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn vm(&self) -> &Chip8Vm {
        &self.vm
    }

    pub fn devices(&self) -> &D {
        &self.devices
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn into_inner(self) -> (Chip8Vm, D) {
        (self.vm, self.devices)
    }

    /// Run a single instruction cycle.
    ///
    /// Recoverable faults are logged and counted. Only a fault that
    /// stops the machine from fetching further instructions is returned.
    pub fn tick(&mut self) -> Chip8Result<Flow> {
        if self.throttle {
            self.clock.wait();
        }

        self.poll_input();

        let flow = match self.vm.step() {
            Ok(flow) => flow,
            Err(err) if err.is_halt() => return Err(err),
            Err(err) => {
                warn!("{err}");
                self.stats.faults += 1;
                Flow::Ok
            }
        };

        if let Flow::Unknown(_) = flow {
            self.stats.unknown += 1;
        }

        if let Some(frame) = self.vm.take_frame() {
            self.devices.draw(frame);
            self.stats.frames += 1;
        }

        self.stats.steps += 1;

        // Count down timers
        if self.stats.steps % self.steps_per_tick == 0 && self.vm.tick_timers() {
            trace!("tone");
            self.devices.buzz();
            self.stats.tones += 1;
        }

        Ok(flow)
    }

    /// Run `step_count` instruction cycles.
    pub fn run_steps(&mut self, step_count: u64) -> Chip8Result<RunStats> {
        self.clock.reset();

        for _ in 0..step_count {
            self.tick()?;
        }

        Ok(self.stats)
    }

    /// Merge the device key state into the VM.
    fn poll_input(&mut self) {
        for key in KeyCode::ALL {
            let pressed = self.devices.is_pressed(key);
            self.vm.set_key(key, pressed);
        }
    }
}
