//! Interface between the CPU and the rest of the system

use fnv::FnvHashMap;

use crate::addressable::{AccessWidth, Addressable};

/// Memory bus seen by the CPU. Addresses are passed untranslated (KUSEG, KSEG0 and KSEG1 are
/// all forwarded as-is), it's up to the implementation to mirror them if it wants to.
pub trait Bus {
    fn read_byte(&mut self, addr: u32) -> u8;
    fn read_half(&mut self, addr: u32) -> u16;
    fn read_word(&mut self, addr: u32) -> u32;

    fn write_byte(&mut self, addr: u32, v: u8);
    fn write_half(&mut self, addr: u32, v: u16);
    fn write_word(&mut self, addr: u32, v: u32);

    /// Called when the CPU executes the high-level emulation opcode (SPECIAL function 0x0b).
    /// `regs` can be modified freely (writes to R0 are discarded). Returning `Some(target)` makes
    /// the CPU jump to `target`, returning `None` simply moves on to the next instruction.
    fn hle_call(&mut self, pc: u32, regs: &mut [u32; 32]) -> Option<u32> {
        let _ = (pc, regs);

        None
    }

    /// Called when the CPU executes `ADDIU $zero, $rs, code`, used by IOP programs to call into
    /// emulated library code
    fn iop_call(&mut self, pc: u32, code: u16, regs: &mut [u32; 32]) {
        let _ = (pc, code, regs);
    }
}

/// Load a value of the given width from the bus
pub(crate) fn load<T: Addressable>(bus: &mut dyn Bus, addr: u32) -> T {
    let v = match T::width() {
        AccessWidth::Byte => bus.read_byte(addr) as u32,
        AccessWidth::HalfWord => bus.read_half(addr) as u32,
        AccessWidth::Word => bus.read_word(addr),
    };

    T::from_u32(v)
}

/// Store a value of the given width to the bus
pub(crate) fn store<T: Addressable>(bus: &mut dyn Bus, addr: u32, v: T) {
    let v = v.as_u32();

    match T::width() {
        AccessWidth::Byte => bus.write_byte(addr, v as u8),
        AccessWidth::HalfWord => bus.write_half(addr, v as u16),
        AccessWidth::Word => bus.write_word(addr, v),
    }
}

/// Size of a single RAM page
const PAGE_SIZE: usize = 4 * 1024;

type Page = Box<[u8; PAGE_SIZE]>;

/// Little-endian RAM covering the whole 512MiB physical address space. Pages are only allocated
/// when they're first written to, untouched memory reads as 0.
///
/// The three memory segments (KUSEG, KSEG0 and KSEG1) alias the same physical addresses.
#[derive(Default)]
pub struct Ram {
    pages: FnvHashMap<u32, Page>,
}

impl Ram {
    pub fn new() -> Ram {
        Ram {
            pages: FnvHashMap::default(),
        }
    }

    /// Copy `data` to memory starting at `addr`
    pub fn load_image(&mut self, addr: u32, data: &[u8]) {
        for (i, &b) in data.iter().enumerate() {
            self.set_byte(addr.wrapping_add(i as u32), b);
        }
    }

    /// Number of pages currently allocated
    pub fn allocated_pages(&self) -> usize {
        self.pages.len()
    }

    fn byte(&self, addr: u32) -> u8 {
        let (page, offset) = split(addr);

        match self.pages.get(&page) {
            Some(p) => p[offset],
            None => 0,
        }
    }

    fn set_byte(&mut self, addr: u32, v: u8) {
        let (page, offset) = split(addr);

        let p = self
            .pages
            .entry(page)
            .or_insert_with(|| Box::new([0; PAGE_SIZE]));

        p[offset] = v;
    }

    fn read(&self, addr: u32, width: usize) -> u32 {
        (0..width).fold(0, |v, i| {
            let b = self.byte(addr.wrapping_add(i as u32)) as u32;

            v | (b << (i * 8))
        })
    }

    fn write(&mut self, addr: u32, v: u32, width: usize) {
        for i in 0..width {
            self.set_byte(addr.wrapping_add(i as u32), (v >> (i * 8)) as u8);
        }
    }
}

/// Convert a CPU address into a (page, offset) pair
fn split(addr: u32) -> (u32, usize) {
    let phys = addr & 0x1fff_ffff;

    (phys / PAGE_SIZE as u32, (phys as usize) % PAGE_SIZE)
}

impl Bus for Ram {
    fn read_byte(&mut self, addr: u32) -> u8 {
        self.byte(addr)
    }

    fn read_half(&mut self, addr: u32) -> u16 {
        self.read(addr, 2) as u16
    }

    fn read_word(&mut self, addr: u32) -> u32 {
        self.read(addr, 4)
    }

    fn write_byte(&mut self, addr: u32, v: u8) {
        self.set_byte(addr, v)
    }

    fn write_half(&mut self, addr: u32, v: u16) {
        self.write(addr, v as u32, 2)
    }

    fn write_word(&mut self, addr: u32, v: u32) {
        self.write(addr, v, 4)
    }
}

#[test]
fn ram_is_little_endian() {
    let mut ram = Ram::new();

    ram.write_word(0x100, 0x1234_5678);

    assert_eq!(ram.read_byte(0x100), 0x78);
    assert_eq!(ram.read_byte(0x103), 0x12);
    assert_eq!(ram.read_half(0x102), 0x1234);
}

#[test]
fn ram_segments_alias() {
    let mut ram = Ram::new();

    ram.write_word(0xa000_0010, 0xcafe_f00d);

    assert_eq!(ram.read_word(0x0000_0010), 0xcafe_f00d);
    assert_eq!(ram.read_word(0x8000_0010), 0xcafe_f00d);
    assert_eq!(ram.allocated_pages(), 1);
}

#[test]
fn ram_untouched_reads_zero() {
    let mut ram = Ram::new();

    assert_eq!(ram.read_word(0x1fc0_0000), 0);
    assert_eq!(ram.allocated_pages(), 0);
}

#[test]
fn ram_access_across_pages() {
    let mut ram = Ram::new();

    ram.write_word(PAGE_SIZE as u32 - 2, 0xdead_beef);

    assert_eq!(ram.read_word(PAGE_SIZE as u32 - 2), 0xdead_beef);
    assert_eq!(ram.allocated_pages(), 2);
}
