//! Integer core state and the pipeline hazard model
//!
//! Only two pipeline effects are visible to software: the branch delay slot and the load delay
//! slot. They're both modeled with a single pending write (`delay_reg`, `delay_value`). A pending
//! branch uses the `DELAY_BRANCH` sentinel and holds the target, a pending load holds the
//! destination register and the loaded value. There's never more than one write in flight: any
//! older one is flushed before a new one is recorded.

use std::fmt;

use super::cop0::{self, Cop0, Exception};
use super::gte::Gte;
use super::instruction::Instruction;
use super::irq::{IrqLine, IrqState};
use super::{opcodes, ClockCycle, Psx, RegisterIndex};
use crate::bus::Bus;
use crate::settings::CpuSettings;
use crate::signal::FrameSignal;

/// Reset value for the PC: beginning of the boot ROM
pub const RESET_PC: u32 = 0xbfc0_0000;

/// Value of `delay_reg` while a branch is pending
pub(crate) const DELAY_BRANCH: u8 = 32;

/// Called with the line number every time an interrupt line is asserted
pub type IrqCallback = Box<dyn FnMut(IrqLine)>;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Cpu {
    /// Address of the instruction about to be executed
    pub(super) pc: u32,
    /// General Purpose Registers. The first entry (R0) must always contain 0
    pub(super) regs: [u32; 32],
    /// HI register for division remainder and multiplication MSBs
    pub(super) hi: u32,
    /// LO register for division quotient and multiplication LSBs
    pub(super) lo: u32,
    /// Target of the pending delayed write: 0 if nothing is pending, 1-31 for a load,
    /// `DELAY_BRANCH` for a branch
    delay_reg: u8,
    /// Value of the pending delayed write. Holds the target address for branches.
    delay_value: u32,
    /// Address of the last instruction executed, except for NOPs in delay slots
    pub(super) prev_pc: u32,
    /// Instruction currently being executed
    pub(super) instruction: Instruction,
    pub(super) cop0: Cop0,
    pub(super) gte: Gte,
    /// Instructions left to execute in the current slice
    icount: ClockCycle,
    /// Set if the last slice was stopped early by an unsupported operation or a BREAK in halt
    /// mode
    stopped: bool,
    #[serde(skip)]
    pub(super) settings: CpuSettings,
    #[serde(skip)]
    signal: FrameSignal,
    #[serde(skip)]
    irq_callback: Option<IrqCallback>,
}

impl Cpu {
    pub fn new(settings: CpuSettings) -> Cpu {
        Cpu {
            pc: RESET_PC,
            regs: [0; 32],
            hi: 0,
            lo: 0,
            delay_reg: 0,
            delay_value: 0,
            prev_pc: 0xffff_ffff,
            instruction: Instruction(0),
            cop0: Cop0::new(),
            gte: Gte::new(),
            icount: 0,
            stopped: false,
            settings,
            signal: FrameSignal::new(),
            irq_callback: None,
        }
    }

    /// Put the CPU back in its power-on state. The general purpose registers and the GTE are
    /// left untouched.
    pub fn reset(&mut self) {
        self.cop0.reset();
        self.set_pc(RESET_PC);
        self.prev_pc = 0xffff_ffff;
        self.stopped = false;
    }

    /// Execute up to `budget` instructions and return the number actually executed. The slice
    /// ends early if an unsupported instruction is hit (see `CpuSettings::stop_on_unsupported`)
    /// or if the `FrameSignal` asks for it.
    pub fn run(&mut self, bus: &mut dyn Bus, budget: ClockCycle) -> ClockCycle {
        self.icount = budget;
        self.stopped = false;

        let mut executed = 0;

        while self.icount > 0 {
            {
                let mut psx = Psx {
                    cpu: self,
                    bus: &mut *bus,
                };

                opcodes::run_next_instruction(&mut psx);
            }

            executed += 1;
            self.icount -= 1;

            if self.signal.is_pending() {
                self.handle_signal();
            }
        }

        executed
    }

    /// Process the requests made through the `FrameSignal` during the last instruction
    fn handle_signal(&mut self) {
        let pending = self.signal.take();

        for (line, asserted) in pending.irq_changes() {
            if self.set_irq_line(line, asserted).is_active() {
                debug!("{:?} interrupt taken, PC: 0x{:08x}", line, self.pc);
            }
        }

        if pending.shorten {
            self.icount = 0;
        }
    }

    /// Change the state of one of the external interrupt lines
    pub fn set_irq_line(&mut self, line: IrqLine, asserted: bool) -> IrqState {
        let mask = line.cause_mask();
        let cause = self.cop0.cause();

        let cause = if asserted { cause | mask } else { cause & !mask };

        let state = self.set_cop0_reg(cop0::CAUSE, cause);

        if asserted {
            if let Some(cb) = self.irq_callback.as_mut() {
                cb(line);
            }
        }

        state
    }

    /// Returns the address of the next instruction to be executed
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Address of the last instruction executed, ignoring NOPs in delay slots. Useful to figure
    /// out where the CPU came from when it ends up somewhere it shouldn't.
    pub fn prev_pc(&self) -> u32 {
        self.prev_pc
    }

    /// Get the value of all general purpose registers
    pub fn regs(&self) -> &[u32; 32] {
        &self.regs
    }

    pub fn hi(&self) -> u32 {
        self.hi
    }

    pub fn lo(&self) -> u32 {
        self.lo
    }

    pub fn cop0(&self) -> &Cop0 {
        &self.cop0
    }

    pub fn gte(&self) -> &Gte {
        &self.gte
    }

    /// Returns true if the last slice was stopped early
    pub fn stopped(&self) -> bool {
        self.stopped
    }

    pub fn settings(&self) -> &CpuSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: CpuSettings) {
        self.settings = settings;
    }

    /// Returns a handle that bus implementations can use to signal the CPU while it's running
    pub fn frame_signal(&self) -> FrameSignal {
        self.signal.clone()
    }

    pub fn set_irq_callback(&mut self, cb: Option<IrqCallback>) {
        self.irq_callback = cb;
    }

    /// Replace the emulated state with `saved`, keeping the host-side configuration
    pub(crate) fn restore(&mut self, mut saved: Cpu) {
        saved.settings = self.settings;
        saved.signal = std::mem::take(&mut self.signal);
        saved.irq_callback = self.irq_callback.take();

        *self = saved;
    }

    pub(crate) fn delay_reg(&self) -> u8 {
        self.delay_reg
    }

    pub(crate) fn delay_value(&self) -> u32 {
        self.delay_value
    }

    pub(crate) fn set_delay_reg(&mut self, r: u8) {
        debug_assert!(r <= DELAY_BRANCH);

        self.delay_reg = r;
    }

    pub(crate) fn set_delay_value(&mut self, v: u32) {
        self.delay_value = v;
    }

    pub(crate) fn set_hi(&mut self, v: u32) {
        self.hi = v;
    }

    pub(crate) fn set_lo(&mut self, v: u32) {
        self.lo = v;
    }

    pub(crate) fn gte_mut(&mut self) -> &mut Gte {
        &mut self.gte
    }

    /// Return the current value of register `index`
    pub(crate) fn reg(&self, index: RegisterIndex) -> u32 {
        self.regs[index.0 as usize]
    }

    /// Put `val` into register `index`. If `index` is 0 nothing happens as R0 always contains 0.
    pub(crate) fn set_reg(&mut self, index: RegisterIndex, val: u32) {
        self.regs[index.0 as usize] = val;

        // R0 always contains 0
        self.regs[0] = 0;
    }

    /// Returns true if the current instruction sits in a branch delay slot
    pub(super) fn branch_pending(&self) -> bool {
        self.delay_reg == DELAY_BRANCH
    }

    /// Write the pending load (if any) to its register
    fn commit_delayed_load(&mut self) {
        if (1..DELAY_BRANCH).contains(&self.delay_reg) {
            self.regs[self.delay_reg as usize] = self.delay_value;
            self.delay_reg = 0;
            self.delay_value = 0;
        }
    }

    /// Jump to `pc` immediately, discarding any pending write
    pub(crate) fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
        self.delay_reg = 0;
        self.delay_value = 0;
    }

    /// Move on to the next instruction, taking the pending branch if there's one
    pub(super) fn advance_pc(&mut self) {
        if self.branch_pending() {
            let target = self.delay_value;

            self.set_pc(target);
        } else {
            self.commit_delayed_load();
            self.pc = self.pc.wrapping_add(4);
        }
    }

    /// Move on to the next instruction and write `val` into `reg`
    pub(super) fn load(&mut self, reg: RegisterIndex, val: u32) {
        self.advance_pc();
        self.set_reg(reg, val);
    }

    /// Move on to the next instruction and schedule the write of `val` into `reg`. If we're in a
    /// branch delay slot the write lands after the instruction at the branch target, otherwise
    /// the previous load is flushed and the write is immediate so that back-to-back loads never
    /// lose a value.
    pub(super) fn delayed_load(&mut self, reg: RegisterIndex, val: u32) {
        if self.branch_pending() {
            let target = self.delay_value;

            self.set_pc(target);
            self.delay_reg = reg.0;
            self.delay_value = val;
        } else {
            self.commit_delayed_load();
            self.pc = self.pc.wrapping_add(4);
            self.set_reg(reg, val);
        }
    }

    /// Value `reg` will hold once the pending load (if any) completes
    pub(super) fn reg_with_pending_load(&self, reg: RegisterIndex) -> u32 {
        if reg.0 != 0 && self.delay_reg == reg.0 {
            self.delay_value
        } else {
            self.reg(reg)
        }
    }

    /// Schedule a jump to `target` after the delay slot
    pub(super) fn delayed_branch(&mut self, target: u32) {
        if target & (self.cop0.privilege_mask() | 3) != 0 {
            self.exception(Exception::LoadAddressError);
            self.cop0.set_reg(cop0::BADVADDR, target);
        } else {
            self.commit_delayed_load();
            self.delay_reg = DELAY_BRANCH;
            self.delay_value = target;
            self.pc = self.pc.wrapping_add(4);
        }
    }

    /// Trigger an exception
    pub(super) fn exception(&mut self, cause: Exception) {
        let in_delay_slot = self.branch_pending();

        let epc = if in_delay_slot {
            // EPC points at the branch, the handler will re-execute it
            self.pc.wrapping_sub(4)
        } else {
            self.commit_delayed_load();
            self.pc
        };

        let handler = self.cop0.enter_exception(cause, epc, in_delay_slot);

        debug!(
            "{:?} exception at 0x{:08x} [{}], jumping to 0x{:08x}",
            cause, epc, self.instruction, handler
        );

        // Exceptions don't have a branch delay, we jump directly into the handler
        self.set_pc(handler);
    }

    /// Write a COP0 register. Writes to SR and CAUSE can trigger an interrupt or, if the PC is
    /// no longer valid for the new mode, an address error.
    pub(crate) fn set_cop0_reg(&mut self, index: usize, v: u32) -> IrqState {
        let index = index & 0x1f;

        self.cop0.set_reg(index, v);

        if index != cop0::SR && index != cop0::CAUSE {
            return IrqState::Idle;
        }

        if self.cop0.irq_pending() {
            self.exception(Exception::Interrupt);
            return IrqState::Active;
        }

        if !self.branch_pending() && self.pc & (self.cop0.privilege_mask() | 3) != 0 {
            let pc = self.pc;

            self.exception(Exception::LoadAddressError);
            self.cop0.set_reg(cop0::BADVADDR, pc);
        }

        IrqState::Idle
    }

    /// Log an unsupported operation and end the slice if we're configured to do so
    pub(super) fn unsupported(&mut self, what: &str) {
        warn!(
            "Unsupported {} at 0x{:08x} [{}]",
            what, self.pc, self.instruction
        );

        if self.settings.stop_on_unsupported {
            self.stop();
        }
    }

    /// End the current slice after this instruction
    pub(super) fn stop(&mut self) {
        self.stopped = true;
        self.icount = 0;
    }
}

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "PC: 0x{:08x}    prev: 0x{:08x}", self.pc, self.prev_pc)?;

        for i in 0..16 {
            writeln!(
                f,
                "{}: 0x{:08x}    {}: 0x{:08x}",
                REGISTER_NAMES[i],
                self.regs[i],
                REGISTER_NAMES[i + 16],
                self.regs[i + 16]
            )?;
        }

        writeln!(f, "hi: 0x{:08x}    lo: 0x{:08x}", self.hi, self.lo)?;
        writeln!(
            f,
            "sr: 0x{:08x}    cause: 0x{:08x}    epc: 0x{:08x}",
            self.cop0.sr(),
            self.cop0.cause(),
            self.cop0.reg(cop0::EPC)
        )
    }
}

/// Conventional names given to the MIPS registers
const REGISTER_NAMES: [&str; 32] = [
    "r0", // Hardwired to be always 0
    "at", // Assembler Temporary (reserved for the assembler)
    "v0", "v1", // First and second return values
    "a0", "a1", "a2", "a3", // First four function arguments
    "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7", // Temporary registers
    "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", // Saved registers
    "t8", "t9", // Temporary registers
    "k0", "k1", // Reserved for kernel use
    "gp", // Global pointer
    "sp", // Stack Pointer
    "fp", // Frame Pointer
    "ra", // Return address
];
