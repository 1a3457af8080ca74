/// The CPU accesses the bus with these widths
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum AccessWidth {
    Byte = 1,
    HalfWord = 2,
    Word = 4,
}

impl AccessWidth {
    /// Address bits flipped when the CPU runs in reverse endian mode
    pub fn reverse_endian_mask(self) -> u32 {
        match self {
            AccessWidth::Byte => 3,
            AccessWidth::HalfWord => 2,
            AccessWidth::Word => 0,
        }
    }
}

/// Trait used to make load and store generic over the access width
pub trait Addressable: Copy {
    fn width() -> AccessWidth;

    /// Build a value from the low bits of `v`
    fn from_u32(v: u32) -> Self;

    fn as_u32(self) -> u32;
}

impl Addressable for u8 {
    fn width() -> AccessWidth {
        AccessWidth::Byte
    }

    fn from_u32(v: u32) -> u8 {
        v as u8
    }

    fn as_u32(self) -> u32 {
        self as u32
    }
}

impl Addressable for u16 {
    fn width() -> AccessWidth {
        AccessWidth::HalfWord
    }

    fn from_u32(v: u32) -> u16 {
        v as u16
    }

    fn as_u32(self) -> u32 {
        self as u32
    }
}

impl Addressable for u32 {
    fn width() -> AccessWidth {
        AccessWidth::Word
    }

    fn from_u32(v: u32) -> u32 {
        v
    }

    fn as_u32(self) -> u32 {
        self
    }
}
