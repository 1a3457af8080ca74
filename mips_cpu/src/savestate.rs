//! Processor snapshots
//!
//! Layout: the 4-byte magic `MIPS`, a format version byte, the payload length as a little endian
//! u32 and finally the flexbuffers-serialized `Cpu`.

use serde::{Deserialize, Serialize};

use crate::error::{MipsError, MipsResult};
use crate::processor::Cpu;

const MAGIC: &[u8; 4] = b"MIPS";

/// Bumped every time the serialized layout of `Cpu` changes
const VERSION: u8 = 1;

const HEADER_LEN: usize = 9;

/// Serialize the complete processor state
pub fn save(cpu: &Cpu) -> MipsResult<Vec<u8>> {
    let mut fb = flexbuffers::FlexbufferSerializer::new();

    cpu.serialize(&mut fb)
        .map_err(|e| MipsError::SaveStateSerialization(e.to_string()))?;

    let fbuf = fb.view();

    let mut buf = Vec::with_capacity(HEADER_LEN + fbuf.len());

    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.extend_from_slice(&(fbuf.len() as u32).to_le_bytes());
    buf.extend_from_slice(fbuf);

    Ok(buf)
}

/// Replace the state of `cpu` with the one stored in `buf`. `cpu` is left untouched if the
/// snapshot can't be decoded.
pub fn load(cpu: &mut Cpu, buf: &[u8]) -> MipsResult<()> {
    if buf.len() < HEADER_LEN {
        return Err(bad("truncated header"));
    }

    if buf[0..4] != *MAGIC {
        return Err(bad("bad magic"));
    }

    if buf[4] != VERSION {
        return Err(MipsError::BadSaveState(format!(
            "unsupported version {}",
            buf[4]
        )));
    }

    let len = u32::from_le_bytes(*array_ref![buf, 5, 4]) as usize;

    let payload = buf
        .get(HEADER_LEN..)
        .and_then(|p| p.get(..len))
        .ok_or_else(|| bad("truncated payload"))?;

    let fbr = flexbuffers::Reader::get_root(payload)
        .map_err(|e| MipsError::BadSaveState(e.to_string()))?;

    let saved = Cpu::deserialize(fbr).map_err(|e| MipsError::BadSaveState(e.to_string()))?;

    cpu.restore(saved);

    info!("Savestate loaded, PC: 0x{:08x}", cpu.pc());

    Ok(())
}

fn bad(what: &str) -> MipsError {
    MipsError::BadSaveState(what.to_string())
}
