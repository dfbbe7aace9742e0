use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chip8::prelude::*;

const MAZE: &[u8] = include_bytes!("../programs/maze");

fn maze_vm() -> Chip8Vm {
    let mut vm = Chip8Vm::new(Chip8Conf {
        clock_frequency: None,
        seed: Some(1),
    });
    vm.load_bytecode(MAZE).unwrap();
    vm
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("maze draw", |b| {
        b.iter(|| {
            // Reload so every iteration draws the full maze instead of spinning on the final jump.
            let mut vm = maze_vm();
            black_box(vm.run_steps(black_box(1200_usize))).unwrap();
            black_box(vm.display_buffer()[0])
        })
    });

    {
        let mut vm = maze_vm();

        c.bench_function("maze steps", |b| {
            b.iter(|| {
                let step_count = black_box(1000_usize);
                black_box(vm.run_steps(step_count))
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
