use chip8::{constants::*, prelude::*, Op};

fn new_vm() -> Chip8Vm {
    Chip8Vm::new(Chip8Conf {
        clock_frequency: None,
        seed: Some(7),
    })
}

#[test]
fn test_load_roundtrip_lengths() {
    let mut vm = new_vm();

    for len in [0, 1, 2, 255, 1024, MAX_PROGRAM_SIZE - 1, MAX_PROGRAM_SIZE] {
        let program: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        vm.load_bytecode(&program).unwrap();
        assert_eq!(&vm.memory()[MEM_START..MEM_START + len], &program[..]);
    }

    assert!(matches!(
        vm.load_bytecode(&vec![0; MAX_PROGRAM_SIZE + 1]),
        Err(Chip8Error::LargeProgram { .. })
    ));
}

#[test]
fn test_fresh_machine() {
    let mut vm = new_vm();
    vm.reset();

    assert_eq!(vm.pc() as usize, MEM_START);
    assert_eq!(vm.sp(), 0);
    assert!(vm.stack().is_empty());
    assert_eq!(vm.delay_timer(), 0);
    assert_eq!(vm.sound_timer(), 0);
    assert!(vm.registers().iter().all(|v| *v == 0));
    assert!(vm.display_buffer().iter().all(|px| *px == 0));
    assert_eq!(
        &vm.memory()[FONTSET_START..FONTSET_START + FONTSET_DATA_LENGTH],
        &FONTSET[..]
    );
    assert!(!vm.buzzer());
}

#[test]
fn test_delay_timer_saturates() {
    for n in [0u8, 1, 17, 255] {
        let mut vm = new_vm();
        vm.load_bytecode(&[0x61, n, 0xF1, 0x15]).unwrap(); // LD v1, n; LD DT, v1
        vm.run_steps(2).unwrap();
        assert_eq!(vm.delay_timer(), n);

        for _ in 0..n {
            vm.tick_timers();
        }
        assert_eq!(vm.delay_timer(), 0);

        for _ in 0..300 {
            vm.tick_timers();
        }
        assert_eq!(vm.delay_timer(), 0);
    }
}

#[test]
fn test_unknown_opcodes_continue() {
    let mut vm = new_vm();
    #[rustfmt::skip]
    vm.load_bytecode(&[
        0x00, 0x00, // 0000
        0x5A, 0xB1, // 5AB1
        0xE0, 0x00, // E000
        0xF0, 0xFF, // F0FF
        0x6A, 0x42, // LD vA, 0x42
    ]).unwrap();

    for instr in [0x0000, 0x5AB1, 0xE000, 0xF0FF] {
        assert_eq!(Op::decode(instr), Op::Unknown(instr));
        assert_eq!(vm.step().unwrap(), Flow::Unknown(instr));
    }

    assert_eq!(vm.step().unwrap(), Flow::Ok);
    assert_eq!(vm.registers()[0xA], 0x42);
    assert_eq!(vm.pc() as usize, MEM_START + 10);
}

#[test]
fn test_independent_machines() {
    let mut a = new_vm();
    let mut b = new_vm();
    a.load_bytecode(&[0x61, 0x01]).unwrap();
    b.load_bytecode(&[0x61, 0x02]).unwrap();

    a.step().unwrap();
    b.step().unwrap();

    assert_eq!(a.registers()[1], 1);
    assert_eq!(b.registers()[1], 2);
}
