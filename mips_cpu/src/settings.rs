use num_derive::FromPrimitive;

/// Knobs that change how the CPU reacts to things the guest program shouldn't normally do
#[derive(serde::Serialize, serde::Deserialize, Copy, Clone, PartialEq, Eq, Debug)]
pub struct CpuSettings {
    /// If true the execution slice ends as soon as an unsupported instruction or access is
    /// encountered so that the host can take a look
    pub stop_on_unsupported: bool,
    /// What to do with BREAK instructions
    pub break_mode: BreakMode,
}

impl Default for CpuSettings {
    fn default() -> CpuSettings {
        CpuSettings {
            stop_on_unsupported: true,
            break_mode: Default::default(),
        }
    }
}

#[derive(
    serde::Serialize, serde::Deserialize, Copy, Clone, PartialEq, Eq, Debug, Default, FromPrimitive,
)]
#[repr(u8)]
pub enum BreakMode {
    /// Raise a breakpoint exception like the real hardware
    #[default]
    Exception,
    /// Stop the execution slice with the PC pointing at the BREAK instruction
    Halt,
}

impl BreakMode {
    /// Parse a mode name, case insensitive
    pub fn from_name(name: &str) -> Option<BreakMode> {
        if name.eq_ignore_ascii_case("exception") {
            Some(BreakMode::Exception)
        } else if name.eq_ignore_ascii_case("halt") {
            Some(BreakMode::Halt)
        } else {
            None
        }
    }
}

#[test]
fn break_mode_names() {
    assert_eq!(BreakMode::from_name("Halt"), Some(BreakMode::Halt));
    assert_eq!(BreakMode::from_name("EXCEPTION"), Some(BreakMode::Exception));
    assert_eq!(BreakMode::from_name("debugger"), None);
}

#[test]
fn break_mode_from_primitive() {
    use num_traits::FromPrimitive;

    assert_eq!(BreakMode::from_u8(1), Some(BreakMode::Halt));
    assert_eq!(BreakMode::from_u8(2), None);
}
