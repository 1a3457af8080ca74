//! External interrupt lines

use num_derive::FromPrimitive;

/// The six hardware interrupt lines wired to the CAUSE register IP field (bits [15:10])
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum IrqLine {
    Irq0 = 0,
    Irq1 = 1,
    Irq2 = 2,
    Irq3 = 3,
    Irq4 = 4,
    Irq5 = 5,
}

impl IrqLine {
    pub const ALL: [IrqLine; 6] = [
        IrqLine::Irq0,
        IrqLine::Irq1,
        IrqLine::Irq2,
        IrqLine::Irq3,
        IrqLine::Irq4,
        IrqLine::Irq5,
    ];

    /// Bit of the CAUSE register driven by this line
    pub fn cause_mask(self) -> u32 {
        1 << (10 + self as u32)
    }
}

/// Basic helper enum that can be used for return values of functions and method that can trigger
/// an interrupt. Generates a compiler warning if it's not checked, which should help avoid
/// "losing" interrupts
#[must_use]
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum IrqState {
    Idle,
    Active,
}

impl IrqState {
    pub fn is_active(self) -> bool {
        self == IrqState::Active
    }
}

#[test]
fn irq_cause_bits() {
    assert_eq!(IrqLine::Irq0.cause_mask(), 0x400);
    assert_eq!(IrqLine::Irq5.cause_mask(), 0x8000);

    let all = IrqLine::ALL.iter().fold(0, |m, l| m | l.cause_mask());

    // Software interrupts (bits 8 and 9) are never driven by the lines
    assert_eq!(all, 0xfc00);
}
