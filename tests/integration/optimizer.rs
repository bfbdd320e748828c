//! Optimizer integration tests: idiom fusion against the raw
//! interpreter, and the seed scenarios for substitution behaviour.
//!
//! The equivalence harness only covers idioms whose raw encodings do
//! not patch their own operand slots; the self-modifying ones (the
//! indirect family) are covered by classification checks plus direct
//! handler semantics, because prefetched raw records cannot see runtime
//! patches in either mode.

use crate::common::*;
use subleq16::*;

#[test]
fn zero_idiom_executes_identically() {
    let mut b = StreamBuilder::new();
    b.zero(600).put(600).halt();
    b.pad_to(700);
    b.set_cell(600, 123);
    let image = b.build();

    let outcome = assert_modes_agree(&image, b"");
    assert_eq!(outcome.vm.mem().read(600), 0);
    assert_eq!(outcome.output, vec![0]);
    // Seed scenario: the fused form is a single ZERO with advance 3.
    let opt = optimize(&Memory::from_image(&image), image.len());
    assert_eq!(opt.insns[3].opcode, Opcode::Zero);
}

#[test]
fn mov_add_neg_double_chain_is_equivalent() {
    let mut b = StreamBuilder::new();
    b.mov(600, 610) // copy
        .add(600, 610) // 2a
        .add(610, 610) // doubled: 4a
        .neg(610, 611)
        .put(610)
        .put(611)
        .halt();
    b.pad_to(700);
    b.set_cell(600, 11);
    let image = b.build();

    let outcome = assert_modes_agree(&image, b"");
    assert_eq!(outcome.vm.mem().read(610), 44);
    assert_eq!(outcome.vm.mem().read(611), 0u16.wrapping_sub(44));
}

#[test]
fn double_runs_fuse_into_lshift() {
    let mut b = StreamBuilder::new();
    for _ in 0..4 {
        b.add(600, 600); // same source and destination: a doubling
    }
    b.put(600).halt();
    b.pad_to(700);
    b.set_cell(600, 3);
    let image = b.build();

    let opt = optimize(&Memory::from_image(&image), image.len());
    assert_eq!(opt.insns[3].opcode, Opcode::Lshift);
    assert_eq!(opt.insns[3].src, 4);

    let outcome = assert_modes_agree(&image, b"");
    assert_eq!(outcome.vm.mem().read(600), 48);
    assert_eq!(outcome.output, vec![48]);
}

#[test]
fn inc_dec_depend_on_initial_constants() {
    // The one/minus-one cells sit inside the image; a third source cell
    // is ordinary data, so the same shape becomes INC, DEC and SUB.
    let mut b = StreamBuilder::new();
    b.step(610, 600) // INC: m[610] holds 0xFFFF
        .step(611, 600) // DEC: m[611] holds 1
        .step(612, 600) // SUB: m[612] holds plain data
        .put(600)
        .halt();
    b.pad_to(700);
    b.set_cell(610, 0xFFFF);
    b.set_cell(611, 1);
    b.set_cell(612, 5);
    b.set_cell(600, 50);
    let image = b.build();

    let opt = optimize(&Memory::from_image(&image), image.len());
    assert_eq!(opt.insns[3].opcode, Opcode::Inc);
    assert_eq!(opt.insns[6].opcode, Opcode::Dec);
    assert_eq!(opt.insns[9].opcode, Opcode::Sub);

    // 50 + 1 - 1 - 5 = 45 either way.
    let outcome = assert_modes_agree(&image, b"");
    assert_eq!(outcome.vm.mem().read(600), 45);
    assert_eq!(outcome.output, vec![45]);
}

#[test]
fn io_idioms_are_equivalent() {
    let mut b = StreamBuilder::new();
    b.get(600).get(601).put(601).put(600).halt();
    let image = b.build();

    let opt = optimize(&Memory::from_image(&image), image.len());
    assert_eq!(opt.insns[3].opcode, Opcode::Get);
    assert_eq!(opt.insns[9].opcode, Opcode::Put);

    let outcome = assert_modes_agree(&image, b"xy");
    assert_eq!(outcome.output, b"yx");
}

#[test]
fn self_jump_downgrades_to_halt() {
    // JMP whose target is its own address can never make progress.
    let image = image_from(&[7, 7, 0]);
    let opt = optimize(&Memory::from_image(&image), image.len());
    assert_eq!(opt.insns[0].opcode, Opcode::Halt);

    let outcome = run_optimized(&image, b"");
    assert_eq!(outcome.status, RunStatus::Halted);
}

#[test]
fn forward_jump_is_fused_and_equivalent() {
    // An unconditional jump over a PUT: the skipped output must not
    // appear in either mode.
    let mut image: Vec<u16> = vec![
        0, 0, 3, // leading no-op
        500, 500, 9, // jump: clear m[500], branch to 9
        600, IO_PORT, 9, // a PUT that must be skipped
        601, IO_PORT, 12, // the jump target: put the marker
        0, 0, IO_PORT, // halt
    ];
    image.resize(700, 0);
    image[500] = 1;
    image[600] = b'S' as u16;
    image[601] = b'T' as u16;

    let opt = optimize(&Memory::from_image(&image), image.len());
    assert_eq!(opt.insns[3].opcode, Opcode::Jmp);
    assert_eq!(opt.insns[3].dst, 9);

    let outcome = assert_modes_agree(&image, b"");
    assert_eq!(outcome.output, b"T");
    // The jump idiom zeroes its scratch cell on the way through.
    assert_eq!(outcome.vm.mem().read(500), 0);
}

#[test]
fn halt_idiom_stops_both_modes() {
    let image = image_from(&[0, 0, -1]);
    let opt = optimize(&Memory::from_image(&image), image.len());
    assert_eq!(opt.insns[0].opcode, Opcode::Halt);

    let outcome = assert_modes_agree(&image, b"");
    assert_eq!(outcome.status, RunStatus::Halted);
}

#[test]
fn disabled_optimizer_runs_everything_raw() {
    let mut b = StreamBuilder::new();
    b.get(600).put(600).halt();
    let image = b.build();

    let outcome = run_raw(&image, b"Z");
    assert_eq!(outcome.output, b"Z");
    // Raw mode only ever dispatches SUBLEQ.
    let subleq = outcome.vm.exec_counts()[Opcode::Subleq.index()];
    let total: u64 = outcome.vm.exec_counts().iter().sum();
    assert_eq!(subleq, total);
}

#[test]
fn fused_stream_dispatches_fewer_instructions() {
    let mut b = StreamBuilder::new();
    for _ in 0..8 {
        b.mov(600, 601);
    }
    b.halt();
    b.pad_to(700);
    b.set_cell(600, 9);
    let image = b.build();

    let raw = run_raw(&image, b"");
    let opt = run_optimized(&image, b"");
    let raw_total: u64 = raw.vm.exec_counts().iter().sum();
    let opt_total: u64 = opt.vm.exec_counts().iter().sum();
    assert!(opt_total < raw_total);
    assert_eq!(opt.vm.exec_counts()[Opcode::Mov.index()], 8);
}

#[test]
fn substitution_counts_feed_the_stats_table() {
    let mut b = StreamBuilder::new();
    b.zero(600).get(601).put(601).halt();
    let image = b.build();

    let opt = optimize(&Memory::from_image(&image), image.len());
    assert_eq!(opt.matches[Opcode::Get.index()], 1);
    assert_eq!(opt.matches[Opcode::Put.index()], 1);
    assert!(opt.matches[Opcode::Zero.index()] >= 1);
    let total: u64 = opt.matches.iter().sum();
    assert_eq!(total, image.len() as u64);
}

#[test]
fn indirect_load_classification_and_semantics() {
    // The full eight-instruction indirect-load idiom, as the compiler
    // emits it: the internal jump lands at pc + 15.
    let base: Vec<i32> = vec![
        15, 15, 3, // clear the operand slot
        50, 0, 6, // z -= m[50]
        0, 15, 9, // slot = m[50]
        0, 0, 12, // clear z
        33, 33, 15, // clear the destination
        0, 0, 18, // the patched load step
        0, 33, 21, // destination = loaded value
        0, 0, 24, // clear z
    ];
    let mut image = image_from(&base);
    image.resize(100, 0);
    image[50] = 60; // pointer to cell 60
    image[60] = 4242;

    let opt = optimize(&Memory::from_image(&image), image.len());
    assert_eq!(opt.insns[0].opcode, Opcode::Iload);
    assert_eq!(opt.insns[0].src, 50);
    assert_eq!(opt.insns[0].dst, 33);

    // Execute just the fused instruction: the destination receives the
    // pointee and control lands past the idiom.
    let mut vm = Vm::new(Memory::from_image(&image), opt.insns, Profiler::disabled());
    let mut con = Buffered::new(b"");
    vm.run_bounded(&mut con, 1);
    assert_eq!(vm.mem().read(33), 4242);
    assert_eq!(vm.pc(), 24);
}

#[test]
fn indirect_store_classification() {
    // Twelve instructions of slot patching; the pattern pins down the
    // destination pointer (var 0) and the source cell (var 5).
    let v = |n: u16| 400 + n; // distinct operand values
    let pc = |n: u16| 3 * n;
    #[rustfmt::skip]
    let words: Vec<u16> = vec![
        v(0), 0,    pc(1), // "0Z>"
        v(1), v(1), pc(2), // "11>"
        v(2), v(2), pc(3), // "22>"
        0,    v(3), pc(4), // "Z3>"
        0,    v(4), pc(5), // "Z4>"
        0,    0,    pc(6), // "ZZ>"
        v(5), v(6), pc(7), // "56>"
        v(7), v(7), pc(8), // "77>"
        0,    v(7), pc(9), // "Z7>"
        v(6), 0,    pc(10), // "6Z>"
        0,    0,    pc(11), // "ZZ>"
        v(6), v(6), pc(12), // "66>"
    ];
    let opt = optimize(&Memory::from_image(&words), words.len());
    assert_eq!(opt.insns[0].opcode, Opcode::Istore);
    assert_eq!(opt.insns[0].dst, v(0));
    assert_eq!(opt.insns[0].src, v(5));
}

#[test]
fn indirect_arithmetic_classification() {
    let pc = |n: u16| 3 * n;
    // IADD: "01> 23> 44> 14> 3Z> 11> 33>"
    #[rustfmt::skip]
    let iadd: Vec<u16> = vec![
        401, 402, pc(1),
        403, 404, pc(2),
        405, 405, pc(3),
        402, 405, pc(4),
        404, 0,   pc(5),
        402, 402, pc(6),
        404, 404, pc(7),
    ];
    let opt = optimize(&Memory::from_image(&iadd), iadd.len());
    assert_eq!(opt.insns[0].opcode, Opcode::Iadd);
    assert_eq!(opt.insns[0].dst, 401);
    assert_eq!(opt.insns[0].src, 403);

    // ISUB: "01> 33> 14> 5Z> 11>"
    #[rustfmt::skip]
    let isub: Vec<u16> = vec![
        401, 402, pc(1),
        403, 403, pc(2),
        402, 404, pc(3),
        405, 0,   pc(4),
        402, 402, pc(5),
    ];
    let opt = optimize(&Memory::from_image(&isub), isub.len());
    assert_eq!(opt.insns[0].opcode, Opcode::Isub);
    assert_eq!(opt.insns[0].dst, 401);
    assert_eq!(opt.insns[0].src, 405);
}

#[test]
fn bitwise_not_requires_a_one_cell() {
    let pc = |n: u16| 3 * n;
    // INV: "00> 10> 11> 2Z> Z1> ZZ> !1>" with the final source drawn
    // from a cell holding 1.
    #[rustfmt::skip]
    let mut words: Vec<u16> = vec![
        401, 401, pc(1),
        402, 401, pc(2),
        402, 402, pc(3),
        403, 0,   pc(4),
        0,   402, pc(5),
        0,   0,   pc(6),
        30,  402, pc(7),
    ];
    words.resize(40, 0);
    words[30] = 1;
    let opt = optimize(&Memory::from_image(&words), words.len());
    assert_eq!(opt.insns[0].opcode, Opcode::Inv);
    assert_eq!(opt.insns[0].dst, 402);

    // Without the constant, the same shape is not an INV.
    let mut other = words.clone();
    other[30] = 2;
    let opt = optimize(&Memory::from_image(&other), other.len());
    assert_ne!(opt.insns[0].opcode, Opcode::Inv);
}

#[test]
fn indirect_jump_classification_and_step() {
    let image: Vec<u16> = vec![
        14, 14, 3, // clear the jump slot
        40, 0, 6, // z -= m[40]
        0, 14, 9, // slot = m[40]
        0, 0, 12, // clear z
        0, 0, 15, // branch through the patched slot
    ];
    let mut image = image;
    image.resize(50, 0);
    image[40] = 33000; // jump target in the terminal range

    let opt = optimize(&Memory::from_image(&image), image.len());
    assert_eq!(opt.insns[0].opcode, Opcode::Ijmp);
    assert_eq!(opt.insns[0].dst, 40);

    let outcome = run_optimized(&image, b"");
    assert_eq!(outcome.status, RunStatus::Halted);
    assert_eq!(outcome.vm.pc(), 33000);
}
