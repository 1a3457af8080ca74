//! MIPS R3000A interpreter with the PlayStation geometry transformation engine

#![allow(clippy::needless_range_loop)]
// This one is not too terrible but I find it not very useful when writing an emulator because
// the vast majority of the time our types are actually constrained by the original
// hardware, so using "as" casts is not a problem the vast majority of the time.
#![allow(clippy::cast_lossless)]
// I seem to get weird false positive in the GTE code for this one
#![allow(clippy::redundant_closure_call)]
// Wants to rewrite some numeric comparison chains as match when it doesn't make a lot of sense
// IMO.
#![allow(clippy::comparison_chain)]
// Doesn't let me use r, g, b and x, y, z in the same function!
#![allow(clippy::many_single_char_names)]

#[macro_use]
extern crate arrayref;
#[macro_use]
extern crate log;

mod addressable;
mod bitwise;
pub mod bus;
mod error;
pub mod processor;
mod registers;
mod savestate;
mod settings;
mod signal;

use num_traits::FromPrimitive;

pub use bus::{Bus, Ram};
pub use error::{MipsError, MipsResult};
pub use processor::gte::{Flag as GteFlag, Gte};
pub use processor::irq::{IrqLine, IrqState};
pub use processor::{ClockCycle, Cpu, IrqCallback, RESET_PC};
pub use registers::RegisterId;
pub use settings::{BreakMode, CpuSettings};
pub use signal::FrameSignal;

/// Interpreter instance: the processor state and the bus it's connected to
pub struct Mips<B: Bus> {
    cpu: Cpu,
    bus: Option<B>,
    /// False until the first reset (or savestate load), the PC and COP0 aren't meaningful
    /// before that
    ready: bool,
}

impl<B: Bus> Mips<B> {
    pub fn new(settings: CpuSettings) -> Mips<B> {
        Mips {
            cpu: Cpu::new(settings),
            bus: None,
            ready: false,
        }
    }

    /// Connect the CPU to `bus`, returning the previously attached one if any
    pub fn attach_bus(&mut self, bus: B) -> Option<B> {
        self.bus.replace(bus)
    }

    pub fn detach_bus(&mut self) -> Option<B> {
        self.bus.take()
    }

    pub fn bus(&self) -> Option<&B> {
        self.bus.as_ref()
    }

    pub fn bus_mut(&mut self) -> Option<&mut B> {
        self.bus.as_mut()
    }

    pub fn reset(&mut self) {
        info!("CPU reset");

        self.cpu.reset();
        self.ready = true;
    }

    /// Run up to `budget` instructions and return the number actually executed
    pub fn execute(&mut self, budget: ClockCycle) -> MipsResult<ClockCycle> {
        if !self.ready {
            return Err(MipsError::NotReset);
        }

        let bus = self.bus.as_mut().ok_or(MipsError::NoBus)?;

        Ok(self.cpu.run(bus, budget))
    }

    /// True if the last `execute` ended early because of an unsupported operation or a BREAK
    /// in halt mode
    pub fn stopped(&self) -> bool {
        self.cpu.stopped()
    }

    /// Change the state of interrupt line `line` (0 to 5)
    pub fn set_irq_line(&mut self, line: u8, asserted: bool) -> MipsResult<IrqState> {
        let line = IrqLine::from_u8(line).ok_or(MipsError::BadIrqLine(line))?;

        Ok(self.cpu.set_irq_line(line, asserted))
    }

    pub fn set_irq_callback(&mut self, cb: Option<IrqCallback>) {
        self.cpu.set_irq_callback(cb);
    }

    /// Handle that bus implementations can keep to interact with a running `execute`
    pub fn frame_signal(&self) -> FrameSignal {
        self.cpu.frame_signal()
    }

    pub fn get_register(&self, id: RegisterId) -> MipsResult<u32> {
        self.cpu.get_register(id)
    }

    pub fn set_register(&mut self, id: RegisterId, v: u32) -> MipsResult<()> {
        self.cpu.set_register(id, v)
    }

    pub fn save_state(&self) -> MipsResult<Vec<u8>> {
        savestate::save(&self.cpu)
    }

    pub fn load_state(&mut self, buf: &[u8]) -> MipsResult<()> {
        savestate::load(&mut self.cpu, buf)?;
        self.ready = true;

        Ok(())
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn settings(&self) -> &CpuSettings {
        self.cpu.settings()
    }

    pub fn set_settings(&mut self, settings: CpuSettings) {
        self.cpu.set_settings(settings);
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn mips_with(program: &[u32]) -> Mips<Ram> {
        let mut ram = Ram::new();

        for (i, &w) in program.iter().enumerate() {
            ram.write_word(RESET_PC + i as u32 * 4, w);
        }

        let mut mips = Mips::new(CpuSettings::default());

        mips.attach_bus(ram);
        mips.reset();

        mips
    }

    #[test]
    fn execute_needs_reset_and_bus() {
        let mut mips: Mips<Ram> = Mips::new(CpuSettings::default());

        assert!(matches!(mips.execute(10), Err(MipsError::NotReset)));

        mips.reset();

        assert!(matches!(mips.execute(10), Err(MipsError::NoBus)));

        mips.attach_bus(Ram::new());

        assert_eq!(mips.execute(10).unwrap(), 10);
    }

    #[test]
    fn add_and_store() {
        let mut mips = mips_with(&[
            // ADDIU r1, r0, 5
            0x2401_0005,
            // ADDIU r2, r0, 7
            0x2402_0007,
            // ADD r3, r1, r2
            0x0022_1820,
            // SW r3, 0(r0)
            0xac03_0000,
        ]);

        assert_eq!(mips.execute(4).unwrap(), 4);

        let ram = mips.bus_mut().unwrap();

        assert_eq!(ram.read_word(0), 12);
        assert_eq!(mips.get_register(RegisterId::Pc).unwrap(), RESET_PC + 16);
        assert_eq!(mips.get_register(RegisterId::Gpr(3)).unwrap(), 12);
    }

    #[test]
    fn bad_irq_line() {
        let mut mips = mips_with(&[]);

        assert!(matches!(
            mips.set_irq_line(6, true),
            Err(MipsError::BadIrqLine(6))
        ));
        assert!(!mips.set_irq_line(2, true).unwrap().is_active());
    }

    #[test]
    fn irq_callback_sees_line() {
        let mut mips = mips_with(&[]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();

        mips.set_irq_callback(Some(Box::new(move |line| log.borrow_mut().push(line))));

        mips.set_irq_line(3, true).unwrap();
        mips.set_irq_line(3, false).unwrap();
        mips.set_irq_line(0, true).unwrap();

        assert_eq!(*seen.borrow(), vec![IrqLine::Irq3, IrqLine::Irq0]);
    }

    #[test]
    fn snapshot_restores_execution() {
        let program = [
            // ADDIU r1, r1, 1
            0x2421_0001,
            // J RESET_PC
            0x0bf0_0000,
            // NOP
            0,
        ];

        let mut mips = mips_with(&program);

        mips.execute(5).unwrap();

        let state = mips.save_state().unwrap();
        let r1 = mips.get_register(RegisterId::Gpr(1)).unwrap();

        mips.execute(30).unwrap();

        let mut other = Mips::new(CpuSettings::default());

        other.attach_bus(mips_with(&program).detach_bus().unwrap());
        other.load_state(&state).unwrap();

        assert_eq!(other.get_register(RegisterId::Gpr(1)).unwrap(), r1);

        other.execute(30).unwrap();

        assert_eq!(
            other.get_register(RegisterId::Gpr(1)).unwrap(),
            mips.get_register(RegisterId::Gpr(1)).unwrap()
        );
        assert_eq!(
            other.get_register(RegisterId::Pc).unwrap(),
            mips.get_register(RegisterId::Pc).unwrap()
        );
    }

    #[test]
    fn shortened_slice() {
        let mut mips = mips_with(&[]);
        let signal = mips.frame_signal();

        signal.shorten_frame();

        // The request is only seen after the first instruction
        assert_eq!(mips.execute(100).unwrap(), 1);
        assert!(!mips.stopped());
    }
}
