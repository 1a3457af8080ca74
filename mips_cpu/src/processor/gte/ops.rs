//! GTE command implementations

use super::{data, Command, ControlVector, Gte, Matrix};

type Op = fn(&mut Gte, Command);

/// Look up the handler for `command`. Only the encodings used by real software are accepted,
/// anything else returns `None`.
pub(super) fn decode(command: Command) -> Option<(&'static str, Op)> {
    let raw = command.raw();
    let op = command.op();

    let handler: (&'static str, Op) = match command.funct() {
        0x01 if raw == 0x018_0001 => ("RTPS", Gte::rtps),
        0x06 if matches!(raw, 0x040_0006 | 0x140_0006 | 0x015_5cc6) => ("NCLIP", Gte::nclip),
        0x0c if op == 0x17 => ("OP", Gte::op),
        0x10 if raw == 0x078_0010 => ("DPCS", Gte::dpcs),
        0x11 if raw == 0x098_0011 => ("INTPL", Gte::intpl),
        0x12 if op == 0x04 => ("MVMVA", Gte::mvmva),
        0x13 if raw == 0x0e8_0413 => ("NCDS", Gte::ncds),
        0x14 if raw == 0x128_0414 => ("CDP", Gte::cdp),
        0x16 if raw == 0x0f8_0416 => ("NCDT", Gte::ncdt),
        0x1b if raw == 0x108_041b => ("NCCS", Gte::nccs),
        0x1c if raw == 0x138_041c => ("CC", Gte::cc),
        0x1e if raw == 0x0c8_041e => ("NCS", Gte::ncs),
        0x20 if raw == 0x0d8_0420 => ("NCT", Gte::nct),
        0x28 if op == 0x0a && command.lm() => ("SQR", Gte::sqr),
        0x2a if raw == 0x0f8_002a => ("DPCT", Gte::dpct),
        0x2d if raw == 0x158_002d => ("AVSZ3", Gte::avsz3),
        0x2e if raw == 0x168_002e => ("AVSZ4", Gte::avsz4),
        0x30 if raw == 0x028_0030 => ("RTPT", Gte::rtpt),
        0x3d if op == 0x09 || op == 0x19 => ("GPF", Gte::gpf),
        0x3e if op == 0x1a => ("GPL", Gte::gpl),
        0x3f if matches!(raw, 0x108_043f | 0x118_043f) => ("NCCT", Gte::ncct),
        _ => return None,
    };

    Some(handler)
}

/// Computes `((cv << 12) + m * v) >> shift` for each row of the matrix
fn multiply(m: [[i16; 3]; 3], v: [i16; 3], cv: [i32; 3], shift: u32) -> [i64; 3] {
    let mut res = [0; 3];

    for (row, r) in res.iter_mut().enumerate() {
        let dot: i64 = m[row]
            .iter()
            .zip(v.iter())
            .map(|(&a, &b)| a as i64 * b as i64)
            .sum();

        *r = (((cv[row] as i64) << 12) + dot) >> shift;
    }

    res
}

impl Gte {
    /// Store MAC1-3 and their saturated copies in IR1-3
    fn set_mac_ir(&mut self, mac: [i64; 3], lm: bool) {
        for (lane, &m) in mac.iter().enumerate() {
            let m = self.check_mac(lane, m) as i32;

            self.set_mac(lane + 1, m);

            let ir = self.saturate_ir(lane, m as i64, lm);

            self.set_ir(lane + 1, ir);
        }
    }

    /// Perspective transformation of a single vertex
    fn project(&mut self, vertex: usize) {
        let rotation = self.matrix(Matrix::Rotation);
        let translation = self.control_vector(ControlVector::Translation);

        let mac = multiply(rotation, self.vertex(vertex), translation, 12);

        self.set_mac_ir(mac, false);

        let z = self.saturate_z(self.mac(3) as i64);

        self.push_sz(z);

        let divisor = self.guard_divisor(z as u32);
        let div = (((self.h() as u32) << 16) / divisor) as i64;

        let sx = self.check_mac0(self.ofx() as i64 + self.ir(1) as i64 * div) >> 16;
        let sx = self.saturate_sxy(0, sx);
        let sy = self.check_mac0(self.ofy() as i64 + self.ir(2) as i64 * div) >> 16;
        let sy = self.saturate_sxy(1, sy);

        self.push_sxy(sx, sy);

        let mac0 = self.check_mac0(self.dqb() as i64 + self.dqa() as i64 * div);

        self.set_mac(0, mac0 as i32);

        let ir0 = self.saturate_ir0((mac0 as i32 as i64) >> 12);

        self.set_ir(0, ir0 as i32);
    }

    /// Perspective Transformation, Single
    fn rtps(&mut self, _: Command) {
        self.project(0);
    }

    /// Perspective Transformation, Triple
    fn rtpt(&mut self, _: Command) {
        for v in 0..3 {
            self.project(v);
        }
    }

    /// Normal clipping: winding of the three screen coordinates
    fn nclip(&mut self, _: Command) {
        let (x0, y0) = self.sxy(0);
        let (x1, y1) = self.sxy(1);
        let (x2, y2) = self.sxy(2);

        let (x0, y0) = (x0 as i64, y0 as i64);
        let (x1, y1) = (x1 as i64, y1 as i64);
        let (x2, y2) = (x2 as i64, y2 as i64);

        let sum = x0 * y1 + x1 * y2 + x2 * y0 - x0 * y2 - x1 * y0 - x2 * y1;

        let mac0 = self.check_mac0(sum);

        self.set_mac(0, mac0 as i32);
    }

    /// Outer product of the rotation matrix diagonal and IR
    fn op(&mut self, command: Command) {
        let r = self.matrix(Matrix::Rotation);
        let d = [r[0][0] as i64, r[1][1] as i64, r[2][2] as i64];
        let ir = self.ir_vector().map(|v| v as i64);
        let shift = command.shift();

        let mac = [
            (d[1] * ir[2] - d[2] * ir[1]) >> shift,
            (d[2] * ir[0] - d[0] * ir[2]) >> shift,
            (d[0] * ir[1] - d[1] * ir[0]) >> shift,
        ];

        self.set_mac_ir(mac, false);
    }

    /// Depth cue a color towards the far color
    fn depth_cue(&mut self, rgb: [u8; 3]) {
        let fc = self.control_vector(ControlVector::FarColor);
        let ir0 = self.ir(0) as i64;

        let mut mac = [0; 3];

        for lane in 0..3 {
            let c = rgb[lane] as i64;
            let diff = self.saturate_ir(lane, fc[lane] as i64 - (c << 4), false) as i64;

            mac[lane] = ((c << 16) + ir0 * diff) >> 12;
        }

        self.set_mac_ir(mac, false);
        self.push_color(4);
    }

    /// Depth Cueing, Single
    fn dpcs(&mut self, _: Command) {
        self.depth_cue(self.rgb());
    }

    /// Depth Cueing, Triple. Works on the color FIFO.
    fn dpct(&mut self, _: Command) {
        for _ in 0..3 {
            self.depth_cue(self.rgb0());
        }
    }

    /// Interpolate between IR and the far color
    fn intpl(&mut self, _: Command) {
        let fc = self.control_vector(ControlVector::FarColor);
        let ir0 = self.ir(0) as i64;

        let mut mac = [0; 3];

        for lane in 0..3 {
            let ir = self.ir(lane + 1) as i64;
            let diff = self.saturate_ir(lane, fc[lane] as i64 - ir, false) as i64;

            mac[lane] = ((ir << 12) + ir0 * diff) >> 12;
        }

        self.set_mac_ir(mac, false);
        self.push_color(0);
    }

    /// Multiply vector by matrix and add vector
    fn mvmva(&mut self, command: Command) {
        let m = self.matrix(Matrix::from_mx(command.mx()));

        let v = match command.v() {
            3 => self.ir_vector(),
            n => self.vertex(n as usize),
        };

        let cv = self.control_vector(ControlVector::from_cv(command.cv()));

        let mac = multiply(m, v, cv, command.shift());

        self.set_mac_ir(mac, command.lm());
    }

    /// Light matrix times normal vector
    fn light(&mut self, vertex: usize, lm: bool) {
        let l = self.matrix(Matrix::Light);

        let mac = multiply(l, self.vertex(vertex), [0; 3], 12);

        self.set_mac_ir(mac, lm);
    }

    /// Background color plus color matrix times IR
    fn light_color(&mut self, lm: bool) {
        let c = self.matrix(Matrix::Color);
        let bk = self.control_vector(ControlVector::Background);

        let mac = multiply(c, self.ir_vector(), bk, 12);

        self.set_mac_ir(mac, lm);
    }

    /// Modulate IR by the RGBC color
    fn modulate(&mut self, lm: bool) {
        let rgb = self.rgb();
        let ir = self.ir_vector();

        let mut mac = [0; 3];

        for lane in 0..3 {
            mac[lane] = (rgb[lane] as i64 * ir[lane] as i64) >> 8;
        }

        self.set_mac_ir(mac, lm);
    }

    /// Modulate IR by the RGBC color, then depth cue the result towards the far color
    fn modulate_depth_cue(&mut self, lm: bool) {
        let rgb = self.rgb();
        let ir = self.ir_vector();
        let fc = self.control_vector(ControlVector::FarColor);
        let ir0 = self.ir(0) as i64;

        let mut mac = [0; 3];

        for lane in 0..3 {
            let c = rgb[lane] as i64;
            let i = ir[lane] as i64;
            let diff = self.saturate_ir(lane, fc[lane] as i64 - ((c * i) >> 8), false) as i64;

            mac[lane] = ((c << 4) * i + ir0 * diff) >> 12;
        }

        self.set_mac_ir(mac, lm);
    }

    /// Normal Color, Single
    fn ncs(&mut self, command: Command) {
        self.normal_color(0, command.lm());
    }

    /// Normal Color, Triple
    fn nct(&mut self, command: Command) {
        for v in 0..3 {
            self.normal_color(v, command.lm());
        }
    }

    fn normal_color(&mut self, vertex: usize, lm: bool) {
        self.light(vertex, lm);
        self.light_color(lm);
        self.push_color(4);
    }

    /// Normal Color Color, Single
    fn nccs(&mut self, command: Command) {
        self.normal_color_color(0, command.lm());
    }

    /// Normal Color Color, Triple
    fn ncct(&mut self, command: Command) {
        for v in 0..3 {
            self.normal_color_color(v, command.lm());
        }
    }

    fn normal_color_color(&mut self, vertex: usize, lm: bool) {
        self.light(vertex, lm);
        self.light_color(lm);
        self.modulate(lm);
        self.push_color(4);
    }

    /// Normal Color Depth cue, Single
    fn ncds(&mut self, command: Command) {
        self.normal_color_depth(0, command.lm());
    }

    /// Normal Color Depth cue, Triple
    fn ncdt(&mut self, command: Command) {
        for v in 0..3 {
            self.normal_color_depth(v, command.lm());
        }
    }

    fn normal_color_depth(&mut self, vertex: usize, lm: bool) {
        self.light(vertex, lm);
        self.light_color(lm);
        self.modulate_depth_cue(lm);
        self.push_color(4);
    }

    /// Color Color
    fn cc(&mut self, command: Command) {
        let lm = command.lm();

        self.light_color(lm);
        self.modulate(lm);
        self.push_color(4);
    }

    /// Color Depth cue
    fn cdp(&mut self, command: Command) {
        let lm = command.lm();

        self.light_color(lm);
        self.modulate_depth_cue(lm);
        self.push_color(4);
    }

    /// Square of IR
    fn sqr(&mut self, command: Command) {
        let shift = command.shift();
        let ir = self.ir_vector();

        let mut mac = [0; 3];

        for lane in 0..3 {
            let v = ir[lane] as i64;

            mac[lane] = (v * v) >> shift;
        }

        self.set_mac_ir(mac, true);
    }

    /// Store the scaled Z average in OTZ
    fn average_z(&mut self, scale: i16, sum: i64) {
        let mac0 = self.check_mac0(scale as i64 * sum);

        self.set_mac(0, mac0 as i32);

        let otz = self.saturate_z((mac0 as i32 as i64) >> 12);

        self.data[data::OTZ] = otz as u32;
    }

    /// Average of three Z values
    fn avsz3(&mut self, _: Command) {
        let sum: i64 = (1..4).map(|i| self.sz(i) as i64).sum();

        self.average_z(self.zsf3(), sum);
    }

    /// Average of four Z values
    fn avsz4(&mut self, _: Command) {
        let sum: i64 = (0..4).map(|i| self.sz(i) as i64).sum();

        self.average_z(self.zsf4(), sum);
    }

    /// General purpose interpolation
    fn gpf(&mut self, command: Command) {
        let shift = command.shift();
        let ir0 = self.ir(0) as i64;
        let ir = self.ir_vector();

        let mut mac = [0; 3];

        for lane in 0..3 {
            mac[lane] = (ir0 * ir[lane] as i64) >> shift;
        }

        self.set_mac_ir(mac, false);
        self.push_color(4);
    }

    /// General purpose interpolation with base
    fn gpl(&mut self, command: Command) {
        let shift = command.shift();
        let ir0 = self.ir(0) as i64;
        let ir = self.ir_vector();

        let mut mac = [0; 3];

        for lane in 0..3 {
            let base = (self.mac(lane + 1) as i64) << shift;

            mac[lane] = (base + ir0 * ir[lane] as i64) >> shift;
        }

        self.set_mac_ir(mac, false);
        self.push_color(4);
    }
}
