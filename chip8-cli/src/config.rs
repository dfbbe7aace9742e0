//! Run configuration
use std::{fs::File, path::Path};

use chip8::{prelude::*, Hz};
use serde::Deserialize;

use crate::error::CliError;

/// Settings for the `run` command, read from a YAML file.
///
/// ```yaml
/// vm:
///   clock_frequency: 700
///   seed: 42
/// steps: 5000
/// throttle: false
/// print_frames: true
/// held_keys: [5]
/// ```
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CliConf {
    pub vm: Chip8Conf,
    /// Number of instructions to run. Runs until the machine halts when not set.
    pub steps: Option<u64>,
    /// Run at the configured clock frequency instead of as fast as possible.
    pub throttle: bool,
    /// Print every presented frame to stdout.
    pub print_frames: bool,
    /// Keys held down for the whole run.
    pub held_keys: Vec<KeyCode>,
}

impl Default for CliConf {
    fn default() -> Self {
        Self {
            vm: Chip8Conf::default(),
            steps: None,
            throttle: true,
            print_frames: false,
            held_keys: Vec::new(),
        }
    }
}

impl CliConf {
    pub fn from_file(filepath: impl AsRef<Path>) -> Result<Self, CliError> {
        let filepath = filepath.as_ref();
        let mut file = File::open(filepath)?;

        let conf: CliConf = serde_yaml::from_reader(&mut file)?;
        log::debug!("loaded config from {}: {:#?}", filepath.display(), conf);

        Ok(conf)
    }

    pub fn from_yaml(source: &str) -> Result<Self, CliError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn clock_frequency(&self) -> Hz {
        self.vm.clock_frequency()
    }
}
