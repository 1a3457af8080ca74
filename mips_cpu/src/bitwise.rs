/// Simple trait to simplify bit manipulation
pub trait Bitwise {
    /// Returns true if the given bit is set in `self`
    fn bit(self, bitpos: u8) -> bool;

    /// Sets the given bit in self to 1 if `v` is true, 0 if `v` is false
    #[cfg(test)]
    fn set_bit(&mut self, bitpos: u8, v: bool);
}

impl Bitwise for u32 {
    fn bit(self, bitpos: u8) -> bool {
        self & (1u32 << bitpos) != 0
    }

    #[cfg(test)]
    fn set_bit(&mut self, bitpos: u8, v: bool) {
        *self &= !(1u32 << bitpos);
        *self |= (v as u32) << bitpos;
    }
}

#[test]
fn bitwise() {
    // BEV and IEc set
    let mut sr = 0x0040_0001u32;

    assert!(sr.bit(22));
    assert!(sr.bit(0));
    assert!(!sr.bit(1));

    sr.set_bit(1, true);

    assert!(sr.bit(1));
    assert_eq!(sr, 0x0040_0003);

    sr.set_bit(22, false);

    assert!(!sr.bit(22));
    assert_eq!(sr, 0x0000_0003);
}
