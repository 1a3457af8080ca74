use std::fmt;

use crate::processor::RegisterIndex;

/// A single MIPS instruction wrapper to make decoding easier
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Instruction(pub(crate) u32);

impl Instruction {
    pub fn new(machine_code: u32) -> Instruction {
        Instruction(machine_code)
    }

    /// Return bits [31:26] of the instruction
    pub(crate) fn opcode(self) -> usize {
        let Instruction(op) = self;

        (op >> 26) as usize
    }

    /// Return bits [5:0] of the instruction
    pub(crate) fn function(self) -> usize {
        let Instruction(op) = self;

        (op & 0x3f) as usize
    }

    /// Return coprocessor opcode in bits [25:21]
    pub(crate) fn cop_opcode(self) -> u32 {
        let Instruction(op) = self;

        (op >> 21) & 0x1f
    }

    /// Coprocessor operation bit (bit 25). When set the remaining bits are a command for the
    /// coprocessor itself.
    pub(crate) fn is_cop_command(self) -> bool {
        let Instruction(op) = self;

        op & (1 << 25) != 0
    }

    /// Command sent to the GTE, bits [24:0]
    pub(crate) fn gte_command(self) -> u32 {
        let Instruction(op) = self;

        op & 0x1ff_ffff
    }

    /// Return immediate value in bits [15:0]
    pub(crate) fn imm(self) -> u32 {
        let Instruction(op) = self;

        op & 0xffff
    }

    /// Jump target stored in bits [25:0].
    pub(crate) fn imm_jump(self) -> u32 {
        let Instruction(op) = self;

        // The two LSBs aren't stored since (due to alignment constraints) they're assumed to be 0.
        (op & 0x3ff_ffff) << 2
    }

    /// Return immediate value in bits [15:0] as a sign-extended 32bit
    /// value
    pub(crate) fn imm_se(self) -> u32 {
        let Instruction(op) = self;

        let v = (op & 0xffff) as i16;

        v as u32
    }

    /// Shift Immediate values are stored in bits [10:6]
    pub(crate) fn shift(self) -> u32 {
        let Instruction(op) = self;

        (op >> 6) & 0x1f
    }

    /// Return register index in bits [25:21]
    pub(crate) fn s(self) -> RegisterIndex {
        let Instruction(op) = self;

        RegisterIndex(((op >> 21) & 0x1f) as u8)
    }

    /// Return register index in bits [20:16]
    pub(crate) fn t(self) -> RegisterIndex {
        let Instruction(op) = self;

        RegisterIndex(((op >> 16) & 0x1f) as u8)
    }

    /// Return register index in bits [15:11]
    pub(crate) fn d(self) -> RegisterIndex {
        let Instruction(op) = self;

        RegisterIndex(((op >> 11) & 0x1f) as u8)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[test]
fn decode_fields() {
    // addiu $sp, $sp, -24
    let i = Instruction::new(0x27bd_ffe8);

    assert_eq!(i.opcode(), 0x09);
    assert_eq!(i.s().0, 29);
    assert_eq!(i.t().0, 29);
    assert_eq!(i.imm(), 0xffe8);
    assert_eq!(i.imm_se(), 0xffff_ffe8);

    // sll $t0, $t1, 4
    let i = Instruction::new(0x0009_4100);

    assert_eq!(i.opcode(), 0);
    assert_eq!(i.function(), 0);
    assert_eq!(i.d().0, 8);
    assert_eq!(i.t().0, 9);
    assert_eq!(i.shift(), 4);

    // jal 0x80010000
    let i = Instruction::new(0x0c00_4000);

    assert_eq!(i.imm_jump(), 0x0001_0000);
}

#[test]
fn decode_cop_fields() {
    // rtps
    let i = Instruction::new(0x4a18_0001);

    assert!(i.is_cop_command());
    assert_eq!(i.gte_command(), 0x018_0001);

    // mtc0 $t0, $12
    let i = Instruction::new(0x4088_6000);

    assert!(!i.is_cop_command());
    assert_eq!(i.cop_opcode(), 4);
    assert_eq!(i.d().0, 12);

    assert_eq!(format!("{}", i), "0x40886000");
}
