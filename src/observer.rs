/*!
  The machine's only outputs. `PRN` and `PRA` produce an event, as does every fault; how events
  are rendered is up to the `Observer` the `Cpu` was built with.
*/

use std::io::Write;

use log::{error, info};

use crate::error::Fault;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EventKind {
  /// `PRN`: the register's value as a number.
  Print { register: usize, value: u8 },
  /// `PRA`: the register's value as an ASCII character.
  PrintChar { register: usize, value: u8 },
  Fault(Fault),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Event {
  pub kind      : EventKind,
  pub ip        : usize,
  /// `None` only for a fault raised while fetching the opcode.
  pub opcode    : Option<u8>,
  /// The register file at the moment of the event.
  pub registers : Vec<u8>,
}

pub trait Observer {
  fn observe(&mut self, event: &Event);
}

/// Prints to standard output, as a terminal attached to the machine would. Faults go to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleObserver;

impl Observer for ConsoleObserver {
  fn observe(&mut self, event: &Event) {
    match &event.kind {

      EventKind::Print { value, .. } => {
        println!("{}", value);
      }

      EventKind::PrintChar { value, .. } => {
        print!("{}", *value as char);
        // Nothing useful to do if stdout is gone.
        let _ = std::io::stdout().flush();
      }

      EventKind::Fault(fault) => {
        error!("{} registers={:?}", fault, event.registers);
      }

    }
  }
}

/// Sends every event through the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
  fn observe(&mut self, event: &Event) {
    match &event.kind {
      EventKind::Print { register, value } => {
        info!("ip {:#06x}: R{} = {}", event.ip, register, value);
      }
      EventKind::PrintChar { register, value } => {
        info!("ip {:#06x}: R{} = {:?}", event.ip, register, *value as char);
      }
      EventKind::Fault(fault) => {
        error!("{} registers={:?}", fault, event.registers);
      }
    }
  }
}

/// Keeps every event, for tests and for front ends that render after the run.
#[derive(Clone, Debug, Default)]
pub struct RecordingObserver {
  events: Vec<Event>
}

impl RecordingObserver {
  pub fn new() -> RecordingObserver {
    RecordingObserver::default()
  }

  pub fn events(&self) -> &[Event] {
    &self.events
  }

  /// Values printed by `PRN`, in order.
  pub fn printed(&self) -> Vec<u8> {
    self.events
        .iter()
        .filter_map(|event| match event.kind {
          EventKind::Print { value, .. } => Some(value),
          _                              => None
        })
        .collect()
  }

  /// Text printed by `PRA`.
  pub fn text(&self) -> String {
    self.events
        .iter()
        .filter_map(|event| match event.kind {
          EventKind::PrintChar { value, .. } => Some(value as char),
          _                                  => None
        })
        .collect()
  }

  pub fn faults(&self) -> Vec<&Fault> {
    self.events
        .iter()
        .filter_map(|event| match &event.kind {
          EventKind::Fault(fault) => Some(fault),
          _                       => None
        })
        .collect()
  }
}

impl Observer for RecordingObserver {
  fn observe(&mut self, event: &Event) {
    self.events.push(event.clone());
  }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl Observer for NullObserver {
  fn observe(&mut self, _event: &Event) {}
}

impl<O: Observer + ?Sized> Observer for Box<O> {
  fn observe(&mut self, event: &Event) {
    (**self).observe(event)
  }
}
