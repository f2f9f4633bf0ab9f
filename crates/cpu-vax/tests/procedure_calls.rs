//! CALLS / CALLG / RET tests, including property tests of the call frame.

use cpu_vax::flags::{IV, N, Z};
use cpu_vax::{Exception, StepOutcome, Vax, VaxConfig};
use emu_core::FlatMemory;
use proptest::prelude::*;

const CODE: u32 = 0x1000;
const PROC: u32 = 0x1100;
const ARGLIST: u32 = 0x2000;
const STACK: u32 = 0x8000;

fn setup(code: &[u8], procedure: &[u8]) -> (Vax, FlatMemory) {
    let mut mem = FlatMemory::new(0x10000);
    mem.load(CODE, code);
    mem.load(PROC, procedure);
    let cpu = Vax::with_config(VaxConfig {
        reset_pc: CODE,
        reset_sp: STACK,
        scbb: 0,
        memory_size: 0x10000,
    });
    (cpu, mem)
}

fn step(cpu: &mut Vax, mem: &mut FlatMemory) -> StepOutcome {
    cpu.step(mem).expect("no host error")
}

/// `CALLS #numarg, @#PROC`
fn calls(numarg: u8) -> Vec<u8> {
    let mut code = vec![0xFB, numarg, 0x9F];
    code.extend_from_slice(&PROC.to_le_bytes());
    code
}

/// `CALLG @#ARGLIST, @#PROC`
fn callg() -> Vec<u8> {
    let mut code = vec![0xFA, 0x9F];
    code.extend_from_slice(&ARGLIST.to_le_bytes());
    code.push(0x9F);
    code.extend_from_slice(&PROC.to_le_bytes());
    code
}

/// Entry mask, `CLRL R0`..`CLRL R11`, `RET`.
fn clobbering_procedure(mask: u16) -> Vec<u8> {
    let mut body = mask.to_le_bytes().to_vec();
    for n in 0..12u8 {
        body.extend_from_slice(&[0xD4, 0x50 | n]);
    }
    body.push(0x04);
    body
}

#[test]
fn test_calls_ret_scenario() {
    let mut code = calls(0);
    code.push(0x00); // HALT
    let procedure = [
        0x00, 0x00, // .entry mask 0
        0xD0, 0x8F, 0x63, 0x00, 0x00, 0x00, 0x50, // MOVL #99, R0
        0x04, // RET
    ];
    let (mut cpu, mut mem) = setup(&code, &procedure);

    assert_eq!(step(&mut cpu, &mut mem), StepOutcome::Retired);
    assert_eq!(cpu.regs.pc(), PROC + 2);
    step(&mut cpu, &mut mem);
    step(&mut cpu, &mut mem);

    assert_eq!(cpu.regs.r[0], 99);
    assert_eq!(cpu.regs.pc(), CODE + 7, "returns to the instruction after CALLS");
    assert_eq!(cpu.regs.sp(), STACK, "stack restored");

    assert_eq!(step(&mut cpu, &mut mem), StepOutcome::Halted);
}

#[test]
fn test_entry_mask_saves_selected_registers() {
    let mut code = calls(0);
    code.push(0x00);
    let (mut cpu, mut mem) = setup(&code, &clobbering_procedure(0x0F3C));
    for n in 0..12 {
        cpu.regs.r[n] = 0x100 + n as u32;
    }
    cpu.run(&mut mem, 100).expect("run");

    for n in 0..12 {
        let saved = 0x0F3C & (1 << n) != 0;
        let expected = if saved { 0x100 + n as u32 } else { 0 };
        assert_eq!(cpu.regs.r[n], expected, "r{n}");
    }
    assert_eq!(cpu.regs.sp(), STACK);
}

#[test]
fn test_calls_argument_pointer() {
    let mut code = vec![
        0xDD, 0x05, // PUSHL #5
        0xDD, 0x07, // PUSHL #7
    ];
    code.extend(calls(2));
    code.push(0x00);
    let procedure = [
        0x00, 0x00, // .entry mask 0
        0xD0, 0x6C, 0x50, // MOVL (AP), R0
        0xD0, 0xAC, 0x04, 0x51, // MOVL 4(AP), R1
        0xD0, 0xAC, 0x08, 0x52, // MOVL 8(AP), R2
        0x04, // RET
    ];
    let (mut cpu, mut mem) = setup(&code, &procedure);
    cpu.run(&mut mem, 100).expect("run");

    assert_eq!(cpu.regs.r[0], 2, "numarg");
    assert_eq!(cpu.regs.r[1], 7, "first argument is the last pushed");
    assert_eq!(cpu.regs.r[2], 5);
    assert_eq!(cpu.regs.sp(), STACK, "RET pops the arguments");
}

#[test]
fn test_callg_uses_arglist() {
    let mut code = callg();
    code.push(0x00);
    let procedure = [
        0x00, 0x00, // .entry mask 0
        0xD0, 0xAC, 0x04, 0x50, // MOVL 4(AP), R0
        0x04, // RET
    ];
    let (mut cpu, mut mem) = setup(&code, &procedure);
    mem.poke_long(ARGLIST, 1);
    mem.poke_long(ARGLIST + 4, 0xBEEF);
    cpu.run(&mut mem, 100).expect("run");

    assert_eq!(cpu.regs.r[0], 0xBEEF);
    assert_eq!(cpu.regs.sp(), STACK);
}

#[test]
fn test_call_clears_condition_codes_and_sets_iv() {
    let code = calls(0);
    let (mut cpu, mut mem) = setup(&code, &[0x00, 0x40]);
    cpu.regs.psl |= N | Z;
    step(&mut cpu, &mut mem);
    assert_eq!(cpu.regs.psl & (N | Z), 0);
    assert_ne!(cpu.regs.psl & IV, 0, "entry mask bit 14");
}

#[test]
fn test_reserved_mask_bits_fault() {
    let code = calls(0);
    let (mut cpu, mut mem) = setup(&code, &[0x00, 0x10]);
    mem.poke_long(u32::from(cpu_vax::scb::RESERVED_OPERAND) * 4, 0x3000);
    let outcome = step(&mut cpu, &mut mem);
    assert_eq!(outcome, StepOutcome::Exception(Exception::ReservedOperand));
    assert_eq!(mem.peek_long(cpu.regs.sp()), CODE, "fault saves the CALLS PC");
    assert_eq!(cpu.regs.sp(), STACK - 8, "nothing of the call frame remains");
}

#[test]
fn test_nested_calls() {
    let mut code = calls(0);
    code.push(0x00);
    let mut procedure = vec![0x04, 0x00]; // .entry mask R2
    procedure.extend_from_slice(&[0xD0, 0x01, 0x52]); // MOVL #1, R2
    procedure.extend_from_slice(&[0xFB, 0x00, 0x9F]); // CALLS #0, @#1200
    procedure.extend_from_slice(&0x1200u32.to_le_bytes());
    procedure.push(0x04); // RET
    let (mut cpu, mut mem) = setup(&code, &procedure);
    mem.load(0x1200, &[0x04, 0x00, 0xD0, 0x02, 0x52, 0x04]); // mask R2; MOVL #2, R2; RET
    cpu.regs.r[2] = 0x77;
    cpu.run(&mut mem, 100).expect("run");
    assert_eq!(cpu.regs.r[2], 0x77);
    assert_eq!(cpu.regs.sp(), STACK);
    assert!(cpu.halted());
}

proptest! {
    #[test]
    fn calls_ret_restores_saved_registers(
        mask in 0u16..0x1000,
        regs in prop::array::uniform12(any::<u32>()),
        ap in any::<u32>(),
        fp in any::<u32>(),
        numarg in 0u8..4,
    ) {
        let mut code = Vec::new();
        for k in 0..numarg {
            code.extend_from_slice(&[0xDD, k]); // PUSHL #k
        }
        code.extend(calls(numarg));
        code.push(0x00);
        let (mut cpu, mut mem) = setup(&code, &clobbering_procedure(mask));
        cpu.regs.r[..12].copy_from_slice(&regs);
        cpu.regs.r[12] = ap;
        cpu.regs.r[13] = fp;

        cpu.run(&mut mem, 100).expect("run");

        prop_assert!(cpu.halted());
        for (n, &value) in regs.iter().enumerate() {
            if mask & (1 << n) != 0 {
                prop_assert_eq!(cpu.regs.r[n], value, "r{} saved by mask {:#05x}", n, mask);
            }
        }
        prop_assert_eq!(cpu.regs.ap(), ap);
        prop_assert_eq!(cpu.regs.fp(), fp);
        prop_assert_eq!(cpu.regs.sp(), STACK);
    }

    #[test]
    fn repeated_callg_is_idempotent(
        mask in 0u16..0x1000,
        regs in prop::array::uniform12(any::<u32>()),
        sp_offset in 0u32..4,
    ) {
        let mut code = callg();
        code.extend(callg());
        code.push(0x00);
        let (mut cpu, mut mem) = setup(&code, &clobbering_procedure(mask));
        cpu.regs.r[..12].copy_from_slice(&regs);
        cpu.regs.set_sp(STACK - sp_offset);

        cpu.run(&mut mem, 100).expect("run");

        prop_assert!(cpu.halted());
        for (n, &value) in regs.iter().enumerate() {
            if mask & (1 << n) != 0 {
                prop_assert_eq!(cpu.regs.r[n], value);
            }
        }
        prop_assert_eq!(cpu.regs.sp(), STACK - sp_offset);
    }
}
