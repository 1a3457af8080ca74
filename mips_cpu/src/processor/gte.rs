//! Geometry Transformation Engine (coprocessor 2)
//!
//! Fixed-point 3D math coprocessor. Registers are kept as raw 32bit words, the operations
//! extract the 16bit and 8bit lanes they need through the helpers below.

use bitfield::bitfield;

mod clamp;
mod ops;

pub use self::clamp::Flag;

/// Data register indices
pub mod data {
    pub const VXY0: usize = 0;
    pub const VZ0: usize = 1;
    pub const RGBC: usize = 6;
    pub const OTZ: usize = 7;
    pub const IR0: usize = 8;
    pub const SXY0: usize = 12;
    pub const SXY1: usize = 13;
    pub const SXY2: usize = 14;
    pub const SXYP: usize = 15;
    pub const SZ0: usize = 16;
    pub const RGB0: usize = 20;
    pub const RGB1: usize = 21;
    pub const RGB2: usize = 22;
    pub const MAC0: usize = 24;
    pub const IRGB: usize = 28;
    pub const ORGB: usize = 29;
    pub const LZCS: usize = 30;
    pub const LZCR: usize = 31;
}

/// Control register indices
pub mod control {
    pub const ROTATION: usize = 0;
    pub const TRANSLATION: usize = 5;
    pub const LIGHT: usize = 8;
    pub const BACKGROUND: usize = 13;
    pub const COLOR: usize = 16;
    pub const FAR_COLOR: usize = 21;
    pub const OFX: usize = 24;
    pub const OFY: usize = 25;
    pub const H: usize = 26;
    pub const DQA: usize = 27;
    pub const DQB: usize = 28;
    pub const ZSF3: usize = 29;
    pub const ZSF4: usize = 30;
    pub const FLAG: usize = 31;
}

bitfield! {
    /// Command word sent to the GTE (bits [24:0] of the COP2 instruction)
    #[derive(Clone, Copy)]
    pub struct Command(u32);
    impl Debug;

    /// Operation code (bits 5 - 0)
    pub u8, funct, _: 5, 0;

    /// Saturate IR1-3 to [0, 0x7fff] instead of [-0x8000, 0x7fff] (bit 10)
    pub bool, lm, _: 10;

    /// MVMVA translation vector (bits 14 - 13)
    pub u8, cv, _: 14, 13;

    /// MVMVA multiplied vector (bits 16 - 15)
    pub u8, v, _: 16, 15;

    /// MVMVA matrix (bits 18 - 17)
    pub u8, mx, _: 18, 17;

    /// Shift the results 12 bits right (bit 19)
    pub bool, sf, _: 19;

    /// Upper bits of the command, mostly "fake" opcode bits (bits 24 - 20)
    pub u8, op, _: 24, 20;

    /// Whole command word
    pub u32, raw, _: 24, 0;
}

impl Command {
    /// Fractional shift selected by the sf bit
    pub fn shift(self) -> u32 {
        if self.sf() { 12 } else { 0 }
    }
}

/// 3x3 matrices stored in the control registers
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Matrix {
    Rotation,
    Light,
    Color,
    /// Not a real register, used when MVMVA selects matrix 3
    Zero,
}

impl Matrix {
    fn from_mx(mx: u8) -> Matrix {
        match mx & 3 {
            0 => Matrix::Rotation,
            1 => Matrix::Light,
            2 => Matrix::Color,
            _ => Matrix::Zero,
        }
    }
}

/// 32bit vectors stored in the control registers
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ControlVector {
    Translation,
    Background,
    FarColor,
    /// Not a real register, used when MVMVA selects vector 3
    Zero,
}

impl ControlVector {
    fn from_cv(cv: u8) -> ControlVector {
        match cv & 3 {
            0 => ControlVector::Translation,
            1 => ControlVector::Background,
            2 => ControlVector::FarColor,
            _ => ControlVector::Zero,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct Gte {
    /// Data registers
    data: [u32; 32],
    /// Control registers
    control: [u32; 32],
}

impl Gte {
    pub fn new() -> Gte {
        Gte {
            data: [0; 32],
            control: [0; 32],
        }
    }

    /// Read a data register (MFC2/SWC2)
    pub fn data(&self, reg: u8) -> u32 {
        let reg = (reg & 0x1f) as usize;

        let v = match reg {
            // VZ0-2 and IR0-3 are sign-extended 16bit values
            1 | 3 | 5 | 8..=11 => lo(self.data[reg]) as u32,
            // OTZ and SZ0-3 are unsigned 16bit values
            7 | 16..=19 => self.data[reg] & 0xffff,
            // SXYP mirrors the top of the screen XY FIFO
            data::SXYP => self.data[data::SXY2],
            data::ORGB => self.orgb(),
            _ => self.data[reg],
        };

        #[cfg(feature = "gte_verbose")]
        debug!("GTE data read {}: 0x{:08x}", reg, v);

        v
    }

    /// Write a data register (MTC2/LWC2)
    pub fn set_data(&mut self, reg: u8, v: u32) {
        let reg = (reg & 0x1f) as usize;

        #[cfg(feature = "gte_verbose")]
        debug!("GTE data write {}: 0x{:08x}", reg, v);

        self.data[reg] = v;

        match reg {
            data::SXYP => {
                self.data[data::SXY0] = self.data[data::SXY1];
                self.data[data::SXY1] = self.data[data::SXY2];
                self.data[data::SXY2] = v;
            }
            data::IRGB => {
                // Expand the 5bit color components to IR1-3
                self.set_ir(1, ((v & 0x1f) << 4) as i32);
                self.set_ir(2, ((v & 0x3e0) >> 1) as i32);
                self.set_ir(3, ((v & 0x7c00) >> 6) as i32);
            }
            data::LZCS => {
                let lzcr = if (v as i32) < 0 {
                    v.leading_ones()
                } else {
                    v.leading_zeros()
                };

                self.data[data::LZCR] = lzcr;
            }
            _ => (),
        }
    }

    /// Read a control register (CFC2)
    pub fn control(&self, reg: u8) -> u32 {
        let v = self.control[(reg & 0x1f) as usize];

        #[cfg(feature = "gte_verbose")]
        debug!("GTE control read {}: 0x{:08x}", reg, v);

        v
    }

    /// Write a control register (CTC2)
    pub fn set_control(&mut self, reg: u8, v: u32) {
        #[cfg(feature = "gte_verbose")]
        debug!("GTE control write {}: 0x{:08x}", reg, v);

        self.control[(reg & 0x1f) as usize] = v;
    }

    /// Current value of the FLAG register
    pub fn flag(&self) -> Flag {
        Flag::from_bits_retain(self.control[control::FLAG])
    }

    /// Execute a GTE command. Unknown commands are ignored.
    pub fn command(&mut self, command: u32) {
        let command = Command(command & 0x1ff_ffff);

        let (name, op) = match ops::decode(command) {
            Some(o) => o,
            None => {
                warn!("Unhandled GTE command 0x{:07x}", command.raw());
                return;
            }
        };

        #[cfg(feature = "gte_verbose")]
        debug!("GTE {} (0x{:07x})", name, command.raw());
        #[cfg(not(feature = "gte_verbose"))]
        let _ = name;

        self.control[control::FLAG] = 0;

        op(self, command);

        self.update_error_flag();
    }

    /// Packed 15bit color built from IR1-3
    fn orgb(&self) -> u32 {
        let ir1 = self.data[9];
        let ir2 = self.data[10];
        let ir3 = self.data[11];

        ((ir1 >> 7) & 0x1f) | ((ir2 >> 2) & 0x3e0) | ((ir3 << 3) & 0x7c00)
    }

    /// Input vertex `n` (0, 1 or 2)
    fn vertex(&self, n: usize) -> [i16; 3] {
        let xy = self.data[data::VXY0 + n * 2];
        let z = self.data[data::VZ0 + n * 2];

        [lo(xy), hi(xy), lo(z)]
    }

    /// IR0-3
    fn ir(&self, n: usize) -> i16 {
        lo(self.data[data::IR0 + n])
    }

    fn set_ir(&mut self, n: usize, v: i32) {
        self.data[data::IR0 + n] = v as u32;
    }

    /// IR1-3 as a vector
    fn ir_vector(&self) -> [i16; 3] {
        [self.ir(1), self.ir(2), self.ir(3)]
    }

    /// MAC0-3
    fn mac(&self, n: usize) -> i32 {
        self.data[data::MAC0 + n] as i32
    }

    fn set_mac(&mut self, n: usize, v: i32) {
        self.data[data::MAC0 + n] = v as u32;
    }

    /// R, G and B components of the RGBC register
    fn rgb(&self) -> [u8; 3] {
        let [r, g, b, _] = self.data[data::RGBC].to_le_bytes();

        [r, g, b]
    }

    /// Code byte of the RGBC register
    fn code(&self) -> u8 {
        self.data[data::RGBC].to_le_bytes()[3]
    }

    /// Bottom entry of the color FIFO
    fn rgb0(&self) -> [u8; 3] {
        let [r, g, b, _] = self.data[data::RGB0].to_le_bytes();

        [r, g, b]
    }

    /// SZ0-3
    fn sz(&self, n: usize) -> u16 {
        self.data[data::SZ0 + n] as u16
    }

    /// SXY0-2
    fn sxy(&self, n: usize) -> (i16, i16) {
        let v = self.data[data::SXY0 + n];

        (lo(v), hi(v))
    }

    fn matrix(&self, m: Matrix) -> [[i16; 3]; 3] {
        let base = match m {
            Matrix::Rotation => control::ROTATION,
            Matrix::Light => control::LIGHT,
            Matrix::Color => control::COLOR,
            Matrix::Zero => return [[0; 3]; 3],
        };

        let mut mat = [[0; 3]; 3];

        // Entries are packed two per register, row major
        for k in 0..9 {
            let w = self.control[base + k / 2];

            mat[k / 3][k % 3] = if k % 2 == 0 { lo(w) } else { hi(w) };
        }

        mat
    }

    fn control_vector(&self, cv: ControlVector) -> [i32; 3] {
        let base = match cv {
            ControlVector::Translation => control::TRANSLATION,
            ControlVector::Background => control::BACKGROUND,
            ControlVector::FarColor => control::FAR_COLOR,
            ControlVector::Zero => return [0; 3],
        };

        [
            self.control[base] as i32,
            self.control[base + 1] as i32,
            self.control[base + 2] as i32,
        ]
    }

    /// Projection plane distance
    fn h(&self) -> u16 {
        self.control[control::H] as u16
    }

    fn dqa(&self) -> i16 {
        lo(self.control[control::DQA])
    }

    fn dqb(&self) -> i32 {
        self.control[control::DQB] as i32
    }

    fn zsf3(&self) -> i16 {
        lo(self.control[control::ZSF3])
    }

    fn zsf4(&self) -> i16 {
        lo(self.control[control::ZSF4])
    }

    fn ofx(&self) -> i32 {
        self.control[control::OFX] as i32
    }

    fn ofy(&self) -> i32 {
        self.control[control::OFY] as i32
    }

    /// Shift the SZ FIFO and put `z` on top
    fn push_sz(&mut self, z: u16) {
        for i in 0..3 {
            let next = self.data[data::SZ0 + i + 1];

            self.data[data::SZ0 + i] = with_lo(self.data[data::SZ0 + i], next as u16);
        }

        self.data[data::SZ0 + 3] = with_lo(self.data[data::SZ0 + 3], z);
    }

    /// Shift the SXY FIFO and put (x, y) on top
    fn push_sxy(&mut self, x: i16, y: i16) {
        self.data[data::SXY0] = self.data[data::SXY1];
        self.data[data::SXY1] = self.data[data::SXY2];
        self.data[data::SXY2] = (x as u16 as u32) | ((y as u16 as u32) << 16);
    }

    /// Shift the color FIFO and push the saturated `MAC >> shift` values alongside the current
    /// CODE byte
    fn push_color(&mut self, shift: u32) {
        let mut c = [0u8; 4];

        for i in 0..3 {
            c[i] = self.saturate_color(i, self.mac(i + 1) >> shift);
        }

        c[3] = self.code();

        self.data[data::RGB0] = self.data[data::RGB1];
        self.data[data::RGB1] = self.data[data::RGB2];
        self.data[data::RGB2] = u32::from_le_bytes(c);
    }
}

impl Default for Gte {
    fn default() -> Gte {
        Gte::new()
    }
}

/// Signed low 16bit lane of a register
fn lo(w: u32) -> i16 {
    w as i16
}

/// Signed high 16bit lane of a register
fn hi(w: u32) -> i16 {
    (w >> 16) as i16
}

/// Replace the low lane of `w` with `v`
fn with_lo(w: u32, v: u16) -> u32 {
    (w & 0xffff_0000) | (v as u32)
}
