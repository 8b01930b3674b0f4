use std::path::PathBuf;

use proptest::prelude::*;

use ls8::bytecode::{assemble, Opcode};
use ls8::loader::{load_file, read_program};
use ls8::{
  Cpu, CpuConfig, EventKind, Fault, FaultKind, LogObserver, NullObserver, Observer,
  RecordingObserver, State
};

fn demo(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn machine(bytes: &[u8]) -> Cpu<RecordingObserver> {
  let mut cpu = Cpu::with_observer(RecordingObserver::new());
  cpu.load_bytes(0, bytes).unwrap();
  cpu
}

fn small_machine(memory_size: usize, bytes: &[u8]) -> Cpu<RecordingObserver> {
  let config  = CpuConfig { memory_size, register_count: 8 };
  let mut cpu = Cpu::with_config(config, RecordingObserver::new()).unwrap();
  cpu.load_bytes(0, bytes).unwrap();
  cpu
}

fn assembled(text: &str) -> Cpu<RecordingObserver> {
  machine(&assemble(text).unwrap().code)
}

// region Complete programs

#[test]
fn print8() {
  let mut cpu = machine(&[
    0b1000_0010, 0b0000_0000, 0b0000_1000,
    0b0100_0111, 0b0000_0000,
    0b0000_0001,
  ]);
  cpu.run(0).unwrap();

  let observer = cpu.observer();
  assert_eq!(observer.printed(), vec![8]);
  assert!(observer.faults().is_empty());
  assert_eq!(observer.events()[0].kind, EventKind::Print { register: 0, value: 8 });
  assert_eq!(observer.events()[0].ip, 3);
  assert_eq!(observer.events()[0].registers[0], 8);
  assert_eq!(cpu.state(), State::Halted);
  assert_eq!(cpu.ip(), 5);
}

#[test]
fn swap_subroutine() {
  let mut cpu = Cpu::with_observer(RecordingObserver::new());
  load_file(&mut cpu, &demo("call.ls8"), 0).unwrap();
  cpu.run(0).unwrap();

  assert_eq!(cpu.register(0), Ok(2));
  assert_eq!(cpu.register(1), Ok(1));
  assert_eq!(cpu.observer().printed(), vec![2, 1]);
  assert_eq!(cpu.stack_depth(), 0);
}

#[test]
fn multiply() {
  let mut cpu = Cpu::with_observer(RecordingObserver::new());
  load_file(&mut cpu, &demo("mult.ls8"), 0).unwrap();
  cpu.run(0).unwrap();
  assert_eq!(cpu.observer().printed(), vec![72]);
}

#[test]
fn countdown_uses_flags() {
  let mut cpu = Cpu::with_observer(RecordingObserver::new());
  load_file(&mut cpu, &demo("countdown.asm"), 0).unwrap();
  cpu.run(0).unwrap();
  assert_eq!(cpu.observer().printed(), vec![5, 4, 3, 2, 1]);
  assert!(cpu.flags().equal());
}

#[test]
fn recursive_factorial() {
  let mut cpu = Cpu::with_observer(RecordingObserver::new());
  load_file(&mut cpu, &demo("factorial.asm"), 0).unwrap();
  cpu.run(0).unwrap();
  assert_eq!(cpu.observer().printed(), vec![120]);
  assert_eq!(cpu.stack_depth(), 0);
}

#[test]
fn hello_prints_characters() {
  let mut cpu = Cpu::with_observer(RecordingObserver::new());
  load_file(&mut cpu, &demo("hello.asm"), 0).unwrap();
  cpu.run(0).unwrap();
  assert_eq!(cpu.observer().text(), "Hi!\n");
  assert!(cpu.observer().printed().is_empty());
}

#[test]
fn assembler_matches_hand_written_bytes() {
  let text = "\
    LDI R0, 8
    PRN R0
    HLT
  ";
  let from_assembly = assemble(text).unwrap().code;
  let from_ls8      = read_program(&demo("print8.ls8")).unwrap().code;
  assert_eq!(from_assembly, from_ls8);
}

#[test]
fn load_at_offset() {
  let mut cpu = Cpu::with_observer(RecordingObserver::new());
  let end = load_file(&mut cpu, &demo("print8.ls8"), 100).unwrap();
  assert_eq!(end, 106);
  cpu.run(100).unwrap();
  assert_eq!(cpu.observer().printed(), vec![8]);
}

#[test]
fn stepping_matches_running() {
  let bytes = read_program(&demo("countdown.asm")).unwrap().code;

  let mut ran = machine(&bytes);
  ran.run(0).unwrap();

  let mut stepped = machine(&bytes);
  stepped.start(0);
  while stepped.step().unwrap() == State::Running {}

  assert_eq!(ran.registers(), stepped.registers());
  assert_eq!(ran.cycles(), stepped.cycles());
  assert_eq!(ran.observer().events(), stepped.observer().events());
}

// endregion

// region Faults

#[test]
fn illegal_instruction() {
  let mut cpu = machine(&[Opcode::Nop.code(), 0xFF]);
  let fault   = cpu.run(0).unwrap_err();

  assert_eq!(
    fault,
    Fault { kind: FaultKind::IllegalInstruction { opcode: 0xFF }, ip: 1, opcode: Some(0xFF) }
  );
  assert_eq!(cpu.observer().faults(), vec![&fault]);
  assert_eq!(cpu.observer().events().len(), 1);
  assert_eq!(cpu.state(), State::Halted);
}

#[test]
fn pop_from_empty_stack() {
  let mut cpu = machine(&[Opcode::Pop.code(), 0, Opcode::Hlt.code()]);
  let fault   = cpu.run(0).unwrap_err();
  assert_eq!(fault.kind, FaultKind::StackUnderflow);
  assert_eq!(fault.ip, 0);
  assert_eq!(fault.opcode, Some(Opcode::Pop.code()));
}

#[test]
fn ret_without_call() {
  let mut cpu = machine(&[Opcode::Ret.code()]);
  assert_eq!(cpu.run(0).unwrap_err().kind, FaultKind::StackUnderflow);
}

#[test]
fn pushing_forever_overflows() {
  // 0: LDI R1, 3    3: PUSH R0    5: JMP R1
  let mut cpu = small_machine(16, &[
    Opcode::Ldi.code(), 1, 3,
    Opcode::Push.code(), 0,
    Opcode::Jmp.code(), 1,
  ]);
  let fault = cpu.run(0).unwrap_err();

  assert_eq!(fault.kind, FaultKind::StackOverflow { address: 8 });
  assert_eq!(fault.ip, 3);
  assert_eq!(cpu.stack_depth(), 7);
  assert_eq!(cpu.program_end(), 7);
}

#[test]
fn call_without_room_for_return_address() {
  // Three pushes leave one free slot above the gap; CALL needs two.
  let mut cpu = small_machine(16, &[
    Opcode::Push.code(), 0,
    Opcode::Push.code(), 0,
    Opcode::Push.code(), 0,
    Opcode::Nop.code(),
    Opcode::Nop.code(),
    Opcode::Call.code(), 0,
  ]);
  let fault = cpu.run(0).unwrap_err();

  assert_eq!(fault.kind, FaultKind::StackOverflow { address: 11 });
  assert_eq!(fault.ip, 8);
  assert_eq!(cpu.stack_depth(), 3);
  assert_eq!(cpu.memory().read(12), Ok(0));
}

#[test]
fn ret_with_one_byte_on_stack() {
  let mut cpu = machine(&[Opcode::Ldi.code(), 0, 7, Opcode::Push.code(), 0, Opcode::Ret.code()]);
  let fault   = cpu.run(0).unwrap_err();

  assert_eq!(fault.kind, FaultKind::StackUnderflow);
  assert_eq!(fault.ip, 5);
  assert_eq!(cpu.stack_depth(), 1);
  assert_eq!(cpu.stack().entries(cpu.memory()), vec![(9999, 7)]);
}

#[test]
fn divide_by_zero() {
  let mut cpu = assembled("
    LDI R0, 9
    LDI R1, 0
    DIV R0, R1
    HLT
  ");
  let fault = cpu.run(0).unwrap_err();
  assert_eq!(fault.kind, FaultKind::DivisionByZero);
  assert_eq!(fault.ip, 6);
  assert_eq!(cpu.register(0), Ok(9));
}

#[test]
fn register_out_of_range() {
  let mut cpu = machine(&[Opcode::Ldi.code(), 8, 1, Opcode::Hlt.code()]);
  assert_eq!(cpu.run(0).unwrap_err().kind, FaultKind::InvalidRegister { index: 8 });
}

#[test]
fn jump_past_end_of_memory() {
  let mut cpu = small_machine(100, &[Opcode::Ldi.code(), 0, 200, Opcode::Jmp.code(), 0]);
  let fault   = cpu.run(0).unwrap_err();
  assert_eq!(fault, Fault { kind: FaultKind::OutOfBounds { address: 200 }, ip: 200, opcode: None });
}

#[test]
fn store_past_end_of_memory() {
  let mut cpu = small_machine(100, &[
    Opcode::Ldi.code(), 0, 150,
    Opcode::St.code(), 0, 1,
    Opcode::Hlt.code(),
  ]);
  let fault = cpu.run(0).unwrap_err();
  assert_eq!(fault.kind, FaultKind::OutOfBounds { address: 150 });
  assert_eq!(fault.ip, 3);
}

#[test]
fn run_stops_at_first_fault() {
  let mut cpu = machine(&[Opcode::Pop.code(), 0, Opcode::Pop.code(), 0]);
  assert!(cpu.run(0).is_err());
  assert_eq!(cpu.observer().faults().len(), 1);
  assert_eq!(cpu.step(), Ok(State::Halted));
  assert_eq!(cpu.observer().faults().len(), 1);
}

fn run_with<O: Observer>(observer: O, bytes: &[u8]) -> Result<(), Fault> {
  let mut cpu = Cpu::with_observer(observer);
  cpu.load_bytes(0, bytes).unwrap();
  cpu.run(0)
}

#[test]
fn other_observers_see_output_and_faults() {
  let print8 = [Opcode::Ldi.code(), 0, 8, Opcode::Prn.code(), 0, Opcode::Hlt.code()];
  let hi     = [Opcode::Ldi.code(), 0, b'i', Opcode::Pra.code(), 0, Opcode::Hlt.code()];
  let faulty = [Opcode::Pop.code(), 0];

  assert_eq!(run_with(LogObserver, &print8), Ok(()));
  assert_eq!(run_with(LogObserver, &hi), Ok(()));
  assert_eq!(run_with(LogObserver, &faulty).unwrap_err().kind, FaultKind::StackUnderflow);

  assert_eq!(run_with(NullObserver, &print8), Ok(()));
  assert_eq!(run_with(NullObserver, &faulty).unwrap_err().kind, FaultKind::StackUnderflow);

  let boxed: Box<dyn Observer> = Box::new(NullObserver);
  assert_eq!(run_with(boxed, &faulty).unwrap_err().ip, 0);
}

// endregion

// region Properties

/// A chain of `depth` subroutines 16 bytes apart, each calling the next before printing its own
/// number, so the prints come out in reverse call order.
fn nested_calls(depth: u8) -> Vec<u8> {
  let mut code = vec![0u8; 16 * (depth as usize + 1)];
  code[..6].copy_from_slice(&[Opcode::Ldi.code(), 0, 16, Opcode::Call.code(), 0, Opcode::Hlt.code()]);

  for level in 1..=depth {
    let base = 16 * level as usize;
    let mut body = Vec::new();
    if level < depth {
      body.extend_from_slice(&[Opcode::Ldi.code(), 0, 16 * (level + 1), Opcode::Call.code(), 0]);
    }
    body.extend_from_slice(&[
      Opcode::Ldi.code(), 1, level,
      Opcode::Prn.code(), 1,
      Opcode::Ret.code(),
    ]);
    code[base..base + body.len()].copy_from_slice(&body);
  }
  code
}

proptest! {
  #[test]
  fn ldi_loads_any_value(register in 0u8..8, value in any::<u8>()) {
    let mut cpu = machine(&[Opcode::Ldi.code(), register, value, Opcode::Hlt.code()]);
    cpu.run(0).unwrap();
    prop_assert_eq!(cpu.register(register as usize), Ok(value));
  }

  #[test]
  fn push_then_pop_moves_value(from in 0u8..8, to in 0u8..8, value in any::<u8>()) {
    let mut cpu = machine(&[
      Opcode::Ldi.code(), from, value,
      Opcode::Push.code(), from,
      Opcode::Pop.code(), to,
      Opcode::Hlt.code(),
    ]);
    cpu.start(0);
    cpu.step().unwrap();
    cpu.step().unwrap();
    prop_assert_eq!(cpu.stack_depth(), 1);
    cpu.step().unwrap();
    prop_assert_eq!(cpu.stack_depth(), 0);
    prop_assert_eq!(cpu.register(to as usize), Ok(value));
  }

  #[test]
  fn ret_resumes_after_call(target in 6u8..=255) {
    let mut code = vec![0u8; target as usize + 1];
    code[..6].copy_from_slice(&[Opcode::Ldi.code(), 0, target, Opcode::Call.code(), 0, Opcode::Hlt.code()]);
    code[target as usize] = Opcode::Ret.code();

    let mut cpu = machine(&code);
    cpu.run(0).unwrap();
    prop_assert_eq!(cpu.ip(), 5);
    prop_assert_eq!(cpu.cycles(), 4);
    prop_assert_eq!(cpu.stack_depth(), 0);
  }

  #[test]
  fn nested_calls_return_in_reverse(depth in 1u8..=12) {
    let mut cpu = machine(&nested_calls(depth));
    cpu.run(0).unwrap();
    let expected: Vec<u8> = (1..=depth).rev().collect();
    prop_assert_eq!(cpu.observer().printed(), expected);
    prop_assert_eq!(cpu.stack_depth(), 0);
  }
}

// endregion
