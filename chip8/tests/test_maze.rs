use chip8::{constants::*, prelude::*};

const MAZE: &[u8] = include_bytes!("../programs/maze");

/// Address of the `JP 0x218` the maze spins on once the screen is full.
const MAZE_END: u16 = 0x218;

fn maze_vm() -> Chip8Vm {
    let mut vm = Chip8Vm::new(Chip8Conf {
        clock_frequency: None,
        seed: Some(42),
    });
    vm.load_bytecode(MAZE).unwrap();
    vm
}

#[test]
fn test_maze_fills_screen() {
    let mut vm = maze_vm();
    vm.run_steps(2000).unwrap();

    assert_eq!(vm.pc(), MAZE_END);
    assert_eq!(vm.registers()[0], 0);
    assert_eq!(vm.registers()[1], 0x20);
    assert_eq!(vm.registers()[0xF], 0, "maze cells never overlap");

    // 16 x 8 cells with a 4 pixel diagonal each
    let lit = vm.display_buffer().iter().filter(|px| **px == 1).count();
    assert_eq!(lit, 16 * 8 * 4);
    assert!(vm.display_buffer().iter().all(|px| *px <= 1));
}

#[test]
fn test_maze_from_file() {
    let mut vm = maze_vm();
    vm.load_file(concat!(env!("CARGO_MANIFEST_DIR"), "/programs/maze"))
        .unwrap();

    assert_eq!(&vm.memory()[MEM_START..MEM_START + MAZE.len()], MAZE);
    assert!(vm.memory()[MEM_START + MAZE.len()..].iter().all(|b| *b == 0));
}

#[derive(Default)]
struct FrameCounter {
    frames: usize,
    last: Option<String>,
}

impl Devices for FrameCounter {
    fn is_pressed(&self, _key: KeyCode) -> bool {
        false
    }

    fn draw(&mut self, display: &chip8::constants::DisplayBuffer) {
        self.frames += 1;
        self.last = Some(
            display
                .chunks(DISPLAY_WIDTH)
                .map(|row| row.iter().map(|px| if *px == 1 { '#' } else { '.' }).collect())
                .collect::<Vec<String>>()
                .join("\n"),
        );
    }

    fn buzz(&mut self) {}
}

#[test]
fn test_maze_runner_frames() {
    let mut runner = Runner::new(maze_vm(), FrameCounter::default()).with_throttle(false);
    let stats = runner.run_steps(2000).unwrap();

    // blank screen after reset, then one frame per cell
    assert_eq!(stats.frames, 1 + 16 * 8);
    assert_eq!(stats.faults, 0);
    assert_eq!(stats.unknown, 0);

    let (vm, devices) = runner.into_inner();
    assert_eq!(devices.frames as u64, stats.frames);
    assert_eq!(
        devices.last.unwrap().trim_end(),
        vm.dump_display().unwrap().trim_end()
    );
}
