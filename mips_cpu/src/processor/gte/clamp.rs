//! Saturation helpers. Each one records what it clamped in the FLAG register.

use bitflags::bitflags;

use super::{control, Gte};

bitflags! {
    /// Contents of the FLAG control register
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Flag: u32 {
        /// Set if any of the `ERRORS` bits is set
        const ERROR = 1 << 31;
        const MAC1_OVERFLOW = 1 << 30;
        const MAC2_OVERFLOW = 1 << 29;
        const MAC3_OVERFLOW = 1 << 28;
        const MAC1_UNDERFLOW = 1 << 27;
        const MAC2_UNDERFLOW = 1 << 26;
        const MAC3_UNDERFLOW = 1 << 25;
        const IR1_SATURATED = 1 << 24;
        const IR2_SATURATED = 1 << 23;
        const IR3_SATURATED = 1 << 22;
        const R_SATURATED = 1 << 21;
        const G_SATURATED = 1 << 20;
        const B_SATURATED = 1 << 19;
        /// SZ3 or OTZ out of [0, 0xffff]
        const Z_SATURATED = 1 << 18;
        const DIVIDE_OVERFLOW = 1 << 17;
        const MAC0_OVERFLOW = 1 << 16;
        const MAC0_UNDERFLOW = 1 << 15;
        const SX2_SATURATED = 1 << 14;
        const SY2_SATURATED = 1 << 13;
        const IR0_SATURATED = 1 << 12;
    }
}

impl Flag {
    /// Bits that are summarized in `ERROR`
    pub const ERRORS: Flag = Flag::from_bits_retain(0x7f87_e000);

    fn mac_overflow(lane: usize) -> Flag {
        Flag::from_bits_retain(Flag::MAC1_OVERFLOW.bits() >> lane)
    }

    fn mac_underflow(lane: usize) -> Flag {
        Flag::from_bits_retain(Flag::MAC1_UNDERFLOW.bits() >> lane)
    }

    fn ir_saturated(lane: usize) -> Flag {
        Flag::from_bits_retain(Flag::IR1_SATURATED.bits() >> lane)
    }

    fn color_saturated(lane: usize) -> Flag {
        Flag::from_bits_retain(Flag::R_SATURATED.bits() >> lane)
    }
}

/// Largest value that fits a signed 32bit MAC register
const MAC_MAX: i64 = 0x7fff_ffff;
/// Smallest value that fits a signed 32bit MAC register
const MAC_MIN: i64 = -0x8000_0000;

impl Gte {
    fn raise(&mut self, f: Flag) {
        self.control[control::FLAG] |= f.bits();
    }

    /// Set the ERROR bit if any of the error bits got set by the last operation
    pub(super) fn update_error_flag(&mut self) {
        if self.flag().intersects(Flag::ERRORS) {
            self.raise(Flag::ERROR);
        }
    }

    /// MAC1-3 overflow check (lane 0 is MAC1). The value is not clamped.
    pub(super) fn check_mac(&mut self, lane: usize, v: i64) -> i64 {
        if v > MAC_MAX {
            self.raise(Flag::mac_overflow(lane));
        } else if v < MAC_MIN {
            self.raise(Flag::mac_underflow(lane));
        }

        v
    }

    /// IR1-3 saturation (lane 0 is IR1). With `lm` set negative values clamp to 0.
    pub(super) fn saturate_ir(&mut self, lane: usize, v: i64, lm: bool) -> i32 {
        let min = if lm { 0 } else { -0x8000 };

        if v < min {
            self.raise(Flag::ir_saturated(lane));
            min as i32
        } else if v > 0x7fff {
            self.raise(Flag::ir_saturated(lane));
            0x7fff
        } else {
            v as i32
        }
    }

    /// Color component saturation (lane 0 is R)
    pub(super) fn saturate_color(&mut self, lane: usize, v: i32) -> u8 {
        if v < 0 {
            self.raise(Flag::color_saturated(lane));
            0
        } else if v > 0xff {
            self.raise(Flag::color_saturated(lane));
            0xff
        } else {
            v as u8
        }
    }

    /// SZ3 and OTZ saturation
    pub(super) fn saturate_z(&mut self, v: i64) -> u16 {
        if v < 0 {
            self.raise(Flag::Z_SATURATED);
            0
        } else if v > 0xffff {
            self.raise(Flag::Z_SATURATED);
            0xffff
        } else {
            v as u16
        }
    }

    /// Projection divisor guard: depths too close to the projection plane are pushed back to
    /// H/2.
    pub(super) fn guard_divisor(&mut self, z: u32) -> u32 {
        let half_h = (self.h() / 2) as u32;

        if z <= half_h {
            self.raise(Flag::DIVIDE_OVERFLOW);

            if half_h == 0 { 1 } else { half_h }
        } else {
            z
        }
    }

    /// MAC0 overflow check. The value is not clamped.
    pub(super) fn check_mac0(&mut self, v: i64) -> i64 {
        if v > MAC_MAX {
            self.raise(Flag::MAC0_OVERFLOW);
        } else if v < MAC_MIN {
            self.raise(Flag::MAC0_UNDERFLOW);
        }

        v
    }

    /// SX2 (lane 0) and SY2 (lane 1) saturation
    pub(super) fn saturate_sxy(&mut self, lane: usize, v: i64) -> i16 {
        let f = if lane == 0 {
            Flag::SX2_SATURATED
        } else {
            Flag::SY2_SATURATED
        };

        if v < -0x400 {
            self.raise(f);
            -0x400
        } else if v > 0x3ff {
            self.raise(f);
            0x3ff
        } else {
            v as i16
        }
    }

    /// IR0 saturation
    pub(super) fn saturate_ir0(&mut self, v: i64) -> i16 {
        if v < 0 {
            self.raise(Flag::IR0_SATURATED);
            0
        } else if v > 0x1000 {
            self.raise(Flag::IR0_SATURATED);
            0x1000
        } else {
            v as i16
        }
    }
}
