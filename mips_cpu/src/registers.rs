//! Host access to the complete register file
//!
//! Every register visible to a debugger or to the embedding application has a stable numeric
//! identifier so that it can be named from config files or over an FFI boundary.

use num_traits::{FromPrimitive, ToPrimitive};

use crate::error::{MipsError, MipsResult};
use crate::processor::{Cpu, RegisterIndex, DELAY_BRANCH};

/// Register identifier. The numeric values are stable:
///
/// | id      | register                  |
/// |---------|---------------------------|
/// | 1       | PC                        |
/// | 2       | pending delayed value     |
/// | 3       | pending delayed register  |
/// | 4, 5    | HI, LO                    |
/// | 6..38   | R0..R31                   |
/// | 38..70  | COP0 r0..r31              |
/// | 70..102 | GTE data r0..r31          |
/// | 102..134| GTE control r0..r31       |
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RegisterId {
    Pc,
    DelayV,
    DelayR,
    Hi,
    Lo,
    Gpr(u8),
    Cp0(u8),
    Cp2Data(u8),
    Cp2Control(u8),
}

const GPR_BASE: u64 = 6;
const CP0_BASE: u64 = GPR_BASE + 32;
const CP2_DATA_BASE: u64 = CP0_BASE + 32;
const CP2_CONTROL_BASE: u64 = CP2_DATA_BASE + 32;
const END: u64 = CP2_CONTROL_BASE + 32;

impl RegisterId {
    /// Parse a numeric identifier, returning `MipsError::BadRegister` if it's out of range
    pub fn from_id(id: u32) -> MipsResult<RegisterId> {
        RegisterId::from_u32(id).ok_or(MipsError::BadRegister(id))
    }

    /// Numeric identifier of this register
    pub fn id(self) -> u32 {
        self.to_u32().unwrap_or(0)
    }

    /// Check that the bank index is in range
    fn validate(self) -> MipsResult<RegisterId> {
        match self {
            RegisterId::Gpr(n)
            | RegisterId::Cp0(n)
            | RegisterId::Cp2Data(n)
            | RegisterId::Cp2Control(n)
                if n >= 32 =>
            {
                Err(MipsError::BadRegister(self.raw_id() as u32))
            }
            _ => Ok(self),
        }
    }

    /// Identifier without any range check on the bank index
    fn raw_id(self) -> u64 {
        match self {
            RegisterId::Pc => 1,
            RegisterId::DelayV => 2,
            RegisterId::DelayR => 3,
            RegisterId::Hi => 4,
            RegisterId::Lo => 5,
            RegisterId::Gpr(n) => GPR_BASE + n as u64,
            RegisterId::Cp0(n) => CP0_BASE + n as u64,
            RegisterId::Cp2Data(n) => CP2_DATA_BASE + n as u64,
            RegisterId::Cp2Control(n) => CP2_CONTROL_BASE + n as u64,
        }
    }
}

impl FromPrimitive for RegisterId {
    fn from_i64(n: i64) -> Option<RegisterId> {
        if n < 0 {
            None
        } else {
            RegisterId::from_u64(n as u64)
        }
    }

    fn from_u64(n: u64) -> Option<RegisterId> {
        let id = match n {
            1 => RegisterId::Pc,
            2 => RegisterId::DelayV,
            3 => RegisterId::DelayR,
            4 => RegisterId::Hi,
            5 => RegisterId::Lo,
            n if n < GPR_BASE => return None,
            n if n < CP0_BASE => RegisterId::Gpr((n - GPR_BASE) as u8),
            n if n < CP2_DATA_BASE => RegisterId::Cp0((n - CP0_BASE) as u8),
            n if n < CP2_CONTROL_BASE => RegisterId::Cp2Data((n - CP2_DATA_BASE) as u8),
            n if n < END => RegisterId::Cp2Control((n - CP2_CONTROL_BASE) as u8),
            _ => return None,
        };

        Some(id)
    }
}

impl ToPrimitive for RegisterId {
    fn to_i64(&self) -> Option<i64> {
        self.to_u64().map(|v| v as i64)
    }

    fn to_u64(&self) -> Option<u64> {
        self.validate().ok().map(RegisterId::raw_id)
    }
}

impl Cpu {
    /// Read any register. GTE registers are read the way MFC2/CFC2 would see them.
    pub fn get_register(&self, id: RegisterId) -> MipsResult<u32> {
        let v = match id.validate()? {
            RegisterId::Pc => self.pc(),
            RegisterId::DelayV => self.delay_value(),
            RegisterId::DelayR => self.delay_reg() as u32,
            RegisterId::Hi => self.hi(),
            RegisterId::Lo => self.lo(),
            RegisterId::Gpr(n) => self.regs()[n as usize],
            RegisterId::Cp0(n) => self.cop0().reg(n as usize),
            RegisterId::Cp2Data(n) => self.gte().data(n),
            RegisterId::Cp2Control(n) => self.gte().control(n),
        };

        Ok(v)
    }

    /// Write any register. Writing the PC discards the pending delayed write, COP0 writes are
    /// unmasked but writes to SR and CAUSE can still trigger an interrupt.
    pub fn set_register(&mut self, id: RegisterId, v: u32) -> MipsResult<()> {
        match id.validate()? {
            RegisterId::Pc => self.set_pc(v),
            RegisterId::DelayV => self.set_delay_value(v),
            RegisterId::DelayR => {
                if v > DELAY_BRANCH as u32 {
                    return Err(MipsError::BadDelayRegister(v));
                }

                self.set_delay_reg(v as u8);
            }
            RegisterId::Hi => self.set_hi(v),
            RegisterId::Lo => self.set_lo(v),
            RegisterId::Gpr(n) => self.set_reg(RegisterIndex(n), v),
            RegisterId::Cp0(n) => {
                if self.set_cop0_reg(n as usize, v).is_active() {
                    debug!("Interrupt taken after COP0 r{} write", n);
                }
            }
            RegisterId::Cp2Data(n) => self.gte_mut().set_data(n, v),
            RegisterId::Cp2Control(n) => self.gte_mut().set_control(n, v),
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::processor::cop0;
    use crate::settings::CpuSettings;

    #[test]
    fn identifiers_are_stable() {
        assert_eq!(RegisterId::Pc.id(), 1);
        assert_eq!(RegisterId::Lo.id(), 5);
        assert_eq!(RegisterId::Gpr(0).id(), 6);
        assert_eq!(RegisterId::Gpr(31).id(), 37);
        assert_eq!(RegisterId::Cp0(12).id(), 50);
        assert_eq!(RegisterId::Cp2Data(0).id(), 70);
        assert_eq!(RegisterId::Cp2Control(31).id(), 133);

        for id in 1..=133 {
            assert_eq!(RegisterId::from_id(id).map(RegisterId::id).ok(), Some(id));
        }
    }

    #[test]
    fn bad_identifiers() {
        assert!(matches!(
            RegisterId::from_id(0),
            Err(MipsError::BadRegister(0))
        ));
        assert!(matches!(
            RegisterId::from_id(134),
            Err(MipsError::BadRegister(134))
        ));

        let cpu = Cpu::new(CpuSettings::default());

        assert!(cpu.get_register(RegisterId::Gpr(32)).is_err());
        assert!(RegisterId::Cp0(40).to_u32().is_none());
    }

    #[test]
    fn r0_stays_zero() {
        let mut cpu = Cpu::new(CpuSettings::default());

        cpu.set_register(RegisterId::Gpr(0), 0xdead_beef).unwrap();
        cpu.set_register(RegisterId::Gpr(5), 0xdead_beef).unwrap();

        assert_eq!(cpu.get_register(RegisterId::Gpr(0)).unwrap(), 0);
        assert_eq!(cpu.get_register(RegisterId::Gpr(5)).unwrap(), 0xdead_beef);
    }

    #[test]
    fn pc_write_clears_pending_write() {
        let mut cpu = Cpu::new(CpuSettings::default());

        cpu.set_register(RegisterId::DelayR, 32).unwrap();
        cpu.set_register(RegisterId::DelayV, 0x8000_0000).unwrap();
        cpu.set_register(RegisterId::Pc, 0x8001_0000).unwrap();

        assert_eq!(cpu.get_register(RegisterId::Pc).unwrap(), 0x8001_0000);
        assert_eq!(cpu.get_register(RegisterId::DelayR).unwrap(), 0);
        assert_eq!(cpu.get_register(RegisterId::DelayV).unwrap(), 0);
    }

    #[test]
    fn delay_register_range() {
        let mut cpu = Cpu::new(CpuSettings::default());

        assert!(matches!(
            cpu.set_register(RegisterId::DelayR, 33),
            Err(MipsError::BadDelayRegister(33))
        ));
        assert!(cpu.set_register(RegisterId::DelayR, 7).is_ok());
        assert_eq!(cpu.get_register(RegisterId::DelayR).unwrap(), 7);
    }

    #[test]
    fn cop0_write_is_unmasked_and_can_interrupt() {
        let mut cpu = Cpu::new(CpuSettings::default());

        cpu.set_register(RegisterId::Pc, 0x8000_1000).unwrap();

        // PRID isn't writable through MTC0
        cpu.set_register(RegisterId::Cp0(cop0::PRID as u8), 0x1234)
            .unwrap();
        assert_eq!(cpu.get_register(RegisterId::Cp0(15)).unwrap(), 0x1234);

        // Software interrupt 0 pending, then enable it in SR
        cpu.set_register(RegisterId::Cp0(cop0::CAUSE as u8), 1 << 8)
            .unwrap();
        cpu.set_register(RegisterId::Cp0(cop0::SR as u8), 0x101)
            .unwrap();

        assert_eq!(cpu.pc(), 0x8000_0080);
        assert_eq!(cpu.cop0().reg(cop0::EPC), 0x8000_1000);
        assert_eq!((cpu.cop0().cause() >> 2) & 0x1f, 0);
    }

    #[test]
    fn gte_writes_have_side_effects() {
        let mut cpu = Cpu::new(CpuSettings::default());

        cpu.set_register(RegisterId::Cp2Data(30), 0x0000_ffff)
            .unwrap();
        assert_eq!(cpu.get_register(RegisterId::Cp2Data(31)).unwrap(), 16);

        cpu.set_register(RegisterId::Cp2Data(15), 0x0002_0001)
            .unwrap();
        assert_eq!(cpu.get_register(RegisterId::Cp2Data(14)).unwrap(), 0x0002_0001);

        cpu.set_register(RegisterId::Cp2Control(26), 0x8000)
            .unwrap();
        assert_eq!(cpu.get_register(RegisterId::Cp2Control(26)).unwrap(), 0x8000);
    }
}
