//! Coprocessor 0: system control
//!
//! The R3000A has no MMU or TLB so on the PlayStation COP0 is pretty much only used for exception
//! handling and a few debug registers.

use crate::bitwise::Bitwise;

/// Random
pub const RANDOM: usize = 1;
/// Bad virtual address
pub const BADVADDR: usize = 8;
/// Status register
pub const SR: usize = 12;
/// Cause register
pub const CAUSE: usize = 13;
/// Exception PC
pub const EPC: usize = 14;
/// Processor ID
pub const PRID: usize = 15;

/// Current interrupt enable
pub const SR_IEC: u32 = 1 << 0;
/// Current kernel/user mode (1 = user)
pub const SR_KUC: u32 = 1 << 1;
/// Previous interrupt enable
pub const SR_IEP: u32 = 1 << 2;
/// Previous kernel/user mode
pub const SR_KUP: u32 = 1 << 3;
/// Isolate cache
pub const SR_ISC: u32 = 1 << 16;
/// Swap caches
pub const SR_SWC: u32 = 1 << 17;
/// TLB shutdown
pub const SR_TS: u32 = 1 << 21;
/// Boot exception vectors
pub const SR_BEV: u32 = 1 << 22;
/// Reverse endianness in user mode
pub const SR_RE: u32 = 1 << 25;

/// Exception code
pub const CAUSE_EXC: u32 = 0x1f << 2;
/// Pending interrupts (two software + six hardware)
pub const CAUSE_IP: u32 = 0xff << 8;
/// Coprocessor number for CpU exceptions
pub const CAUSE_CE: u32 = 3 << 28;
/// Exception occurred in a branch delay slot
pub const CAUSE_BD: u32 = 1 << 31;

/// Bits of each register writeable through MTC0. Registers not listed here are read-only.
#[rustfmt::skip]
const WRITE_MASKS: [u32; 32] = [
    0xffff_ffff, 0,           0xffff_ff00, 0,
    0xffe0_0000, 0,           0,           0,
    0,           0,           0xffff_ffc0, 0,
    0xf27f_ff3f, 0x0000_0300, 0,           0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
];

/// Exception types (as stored in the `CAUSE` register)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exception {
    /// Interrupt Request
    Interrupt = 0x0,
    /// Address error on load
    LoadAddressError = 0x4,
    /// Address error on store
    StoreAddressError = 0x5,
    /// System call (caused by the SYSCALL opcode)
    SysCall = 0x8,
    /// Breakpoint (caused by the BREAK opcode)
    Break = 0x9,
    /// CPU encountered an unknown instruction
    IllegalInstruction = 0xa,
    /// Unsupported coprocessor operation
    CoprocessorError = 0xb,
    /// Arithmetic overflow
    Overflow = 0xc,
}

#[derive(serde::Serialize, serde::Deserialize, Clone)]
pub struct Cop0 {
    regs: [u32; 32],
}

impl Cop0 {
    pub fn new() -> Cop0 {
        Cop0 { regs: [0; 32] }
    }

    /// Put the registers in their architectural reset state. Registers without a documented reset
    /// value keep their current contents.
    pub fn reset(&mut self) {
        let sr = self.regs[SR];

        self.regs[SR] = (sr & !(SR_TS | SR_SWC | SR_KUC | SR_IEC)) | SR_BEV;
        self.regs[RANDOM] = 63;
        self.regs[PRID] = 0x200;
    }

    pub fn reg(&self, index: usize) -> u32 {
        self.regs[index & 0x1f]
    }

    /// Raw register write, no mask applied
    pub fn set_reg(&mut self, index: usize, v: u32) {
        self.regs[index & 0x1f] = v;
    }

    /// Value that results from a MTC0 of `v` into register `index`
    pub fn masked_write(&self, index: usize, v: u32) -> u32 {
        let mask = WRITE_MASKS[index & 0x1f];

        (self.reg(index) & !mask) | (v & mask)
    }

    pub fn sr(&self) -> u32 {
        self.regs[SR]
    }

    pub fn cause(&self) -> u32 {
        self.regs[CAUSE]
    }

    /// Returns true if the CPU currently runs in user mode
    pub fn user_mode(&self) -> bool {
        self.sr().bit(1)
    }

    /// Address bits that must be clear for an access to be legal in the current mode: in user
    /// mode the upper half of the address space is off-limits
    pub fn privilege_mask(&self) -> u32 {
        (self.sr() & SR_KUC) << 30
    }

    /// Returns true if the cache is isolated, in which case memory writes don't reach the bus
    pub fn cache_isolated(&self) -> bool {
        self.sr().bit(16)
    }

    /// Returns true if byte and halfword accesses must be byte-swapped. Only effective in user
    /// mode.
    pub fn reverse_endian(&self) -> bool {
        let sr = self.sr();

        sr & (SR_RE | SR_KUC) == (SR_RE | SR_KUC)
    }

    /// Returns true if the coprocessor `n` is usable. COP0 is always usable in kernel mode.
    pub fn cop_usable(&self, n: u8) -> bool {
        let enabled = self.sr().bit(28 + n);

        if n == 0 {
            enabled || !self.user_mode()
        } else {
            enabled
        }
    }

    /// Returns true if an unmasked interrupt is pending and interrupts are enabled
    pub fn irq_pending(&self) -> bool {
        let sr = self.sr();

        sr & SR_IEC != 0 && (sr & self.cause() & CAUSE_IP) != 0
    }

    /// Update SR, CAUSE and EPC for an exception and return the address of the handler.
    /// `in_delay_slot` must be true if the faulting instruction sits in a branch delay slot, in
    /// which case `epc` must point at the branch.
    pub fn enter_exception(&mut self, cause: Exception, epc: u32, in_delay_slot: bool) -> u32 {
        // Shift bits [3:0] of `SR` two places to the left. Those bits are three pairs of
        // Interrupt Enable/User Mode bits behaving like a stack 3 entries deep. Entering an
        // exception pushes a pair of zeroes by left shifting the stack which disables interrupts
        // and puts the CPU in kernel mode. The original third entry is discarded (it's up to the
        // kernel to handle more than two recursive exception levels).
        let sr = self.regs[SR];
        self.regs[SR] = (sr & !0x3f) | ((sr << 2) & 0x3f);

        let mut c = self.regs[CAUSE] & !CAUSE_EXC;

        c |= (cause as u32) << 2;

        if in_delay_slot {
            c |= CAUSE_BD;
        } else {
            c &= !CAUSE_BD;
        }

        self.regs[CAUSE] = c;
        self.regs[EPC] = epc;

        // The address of the exception handler address depends on the value of the BEV bit in SR
        if sr & SR_BEV != 0 {
            0xbfc0_0180
        } else {
            0x8000_0080
        }
    }

    /// Set the coprocessor number reported by a CpU exception
    pub fn set_coprocessor_error(&mut self, n: u8) {
        let c = self.regs[CAUSE] & !CAUSE_CE;

        self.regs[CAUSE] = c | (((n & 3) as u32) << 28);
    }

    /// The counterpart to `enter_exception`: pop the interrupt enable/user mode stack
    pub fn return_from_exception(&mut self) {
        let sr = self.regs[SR];

        self.regs[SR] = (sr & !0xf) | ((sr >> 2) & 0xf);
    }
}

impl Default for Cop0 {
    fn default() -> Cop0 {
        Cop0::new()
    }
}

#[test]
fn cop0_write_masks() {
    let mut cop0 = Cop0::new();

    // CAUSE: only the software interrupt bits can be written
    assert_eq!(cop0.masked_write(CAUSE, 0xffff_ffff), 0x300);

    // SR: bits 6, 7, 23, 24, 26 and 27 are read-only
    assert_eq!(cop0.masked_write(SR, 0xffff_ffff), 0xf27f_ff3f);

    // PRID is read-only
    cop0.set_reg(PRID, 0x200);
    assert_eq!(cop0.masked_write(PRID, 0x1234), 0x200);

    // BPC is fully writeable
    assert_eq!(cop0.masked_write(0, 0xdead_beef), 0xdead_beef);

    // Low byte of register 2 is preserved
    cop0.set_reg(2, 0x55);
    assert_eq!(cop0.masked_write(2, 0xaaaa_aaaa), 0xaaaa_aa55);
}

#[test]
fn cop0_mode_stack() {
    let mut cop0 = Cop0::new();

    // User mode, interrupts enabled
    cop0.set_reg(SR, SR_KUC | SR_IEC);

    let vector = cop0.enter_exception(Exception::SysCall, 0x1234, false);

    assert_eq!(vector, 0x8000_0080);
    assert_eq!(cop0.sr() & 0x3f, 0b00_1100);
    assert_eq!(cop0.cause() & CAUSE_EXC, 8 << 2);
    assert_eq!(cop0.reg(EPC), 0x1234);

    cop0.return_from_exception();

    assert_eq!(cop0.sr() & 0x3f, 0b00_0011);
}

#[test]
fn cop0_reset() {
    let mut cop0 = Cop0::new();

    cop0.set_reg(SR, SR_TS | SR_SWC | SR_KUC | SR_IEC | SR_ISC);
    cop0.reset();

    assert_eq!(cop0.sr(), SR_BEV | SR_ISC);
    assert_eq!(cop0.reg(RANDOM), 63);
    assert_eq!(cop0.reg(PRID), 0x200);
}

#[test]
fn cop0_usable() {
    let mut cop0 = Cop0::new();

    // Kernel mode: COP0 usable regardless of CU0
    assert!(cop0.cop_usable(0));
    assert!(!cop0.cop_usable(2));

    cop0.set_reg(SR, SR_KUC);

    assert!(!cop0.cop_usable(0));

    cop0.set_reg(SR, SR_KUC | (1 << 28) | (1 << 30));

    assert!(cop0.cop_usable(0));
    assert!(cop0.cop_usable(2));
    assert!(!cop0.cop_usable(1));
}
