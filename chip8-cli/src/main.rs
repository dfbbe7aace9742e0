//! Entrypoint for CLI
use std::{env, error::Error, io, time::Instant};

use chip8::{constants::*, prelude::*, IMPL_VERSION};
use log::{error, info, warn};

use crate::{config::CliConf, error::CliError, terminal::Terminal};

mod config;
mod error;
mod terminal;

static USAGE: &str = r#"
usage: chip8 CMD FILE [CONFIG]

commands:
    run     Run the target ROM file, optionally with a YAML config
    dump    Print the program memory listing of the target ROM file

examples:
    chip8 run maze.rom
    chip8 run breakout.rom breakout.yaml
    chip8 dump maze.rom

Log verbosity is controlled with RUST_LOG.
"#;

fn run_bytecode(filepath: &str, config: Option<&str>) -> Result<(), CliError> {
    let conf = match config {
        Some(path) => CliConf::from_file(path)?,
        None => CliConf::default(),
    };

    let mut vm = Chip8Vm::new(conf.vm.clone());
    vm.load_file(filepath)?;

    let devices = Terminal::new(io::stdout(), &conf.held_keys, conf.print_frames);
    let mut runner = Runner::new(vm, devices).with_throttle(conf.throttle);

    info!("running {filepath} at {}Hz", conf.clock_frequency().0);

    let start = Instant::now();
    let stats = match conf.steps {
        Some(step_count) => runner.run_steps(step_count)?,
        None => loop {
            if let Err(err) = runner.tick() {
                warn!("machine halted: {err}");
                break runner.stats();
            }
        },
    };
    let elapsed = start.elapsed();

    println!("time taken: {}ms", elapsed.as_nanos() as f64 / 1000000.0); // to millis
    println!("{}", runner.vm().dump_display()?);
    println!(
        "steps: {}, frames: {}, tones: {}, unknown: {}, faults: {}",
        stats.steps, stats.frames, stats.tones, stats.unknown, stats.faults
    );

    Ok(())
}

fn dump_bytecode(filepath: &str) -> Result<(), CliError> {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_file(filepath)?;

    let len = std::fs::metadata(filepath)?.len() as usize;
    print!("{}", vm.dump_ram(len.min(MAX_PROGRAM_SIZE))?);

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init()?;

    let result = match parse_args() {
        Some(Cmd::Run { filepath, config }) => run_bytecode(&filepath, config.as_deref()),
        Some(Cmd::Dump { filepath }) => dump_bytecode(&filepath),
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    };

    if let Err(err) = result {
        error!("{err}");
        std::process::exit(1);
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(cmd) => {
            // don't format me T.T
            match cmd.as_str() {
                "run" => Some(Cmd::Run {
                    filepath: consume_arg(&mut args)?,
                    config: args.next(),
                }),
                "dump" => Some(Cmd::Dump {
                    filepath: consume_arg(&mut args)?,
                }),
                _ => None,
            }
        }
        None => None,
    }
}

/// Consumes the next argument, if there is one.
fn consume_arg(args: &mut impl Iterator<Item = String>) -> Option<String> {
    args.next()
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run {
        filepath: String,
        config: Option<String>,
    },
    /// Print memory listing
    Dump { filepath: String },
}
