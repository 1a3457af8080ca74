use thiserror::Error;

pub type MipsResult<T> = ::std::result::Result<T, MipsError>;

/// Errors reported to the embedding application. Guest-level faults (address errors, bad
/// opcodes, overflows...) are never reported here, they're handled by the emulated exception
/// logic.
#[derive(Error, Debug)]
pub enum MipsError {
    #[error("No memory bus is attached to the CPU")]
    NoBus,
    #[error("The CPU must be reset before it can run")]
    NotReset,
    #[error("Invalid register identifier: {0}")]
    BadRegister(u32),
    /// The pending load target must be 0 to 31, or 32 for a pending branch
    #[error("Invalid pending delay register: {0}")]
    BadDelayRegister(u32),
    #[error("Invalid IRQ line: {0}")]
    BadIrqLine(u8),
    #[error("Invalid savestate: {0}")]
    BadSaveState(String),
    #[error("Couldn't serialize savestate: {0}")]
    SaveStateSerialization(String),
}
