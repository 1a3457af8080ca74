//! R3000A processor: integer core, system control coprocessor and GTE

pub mod cop0;
mod cpu;
pub mod gte;
pub mod instruction;
pub mod irq;
mod opcodes;

#[cfg(test)]
mod test;

pub use self::cpu::{Cpu, IrqCallback, RESET_PC};
pub(crate) use self::cpu::DELAY_BRANCH;

use crate::bus::Bus;

/// Index of a general purpose register
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct RegisterIndex(pub u8);

/// Instruction count. Signed so that the slice budget can go negative when a request shortens
/// the current slice.
pub type ClockCycle = i32;

/// Everything an instruction handler is allowed to touch
pub struct Psx<'a> {
    pub cpu: &'a mut Cpu,
    pub bus: &'a mut dyn Bus,
}
