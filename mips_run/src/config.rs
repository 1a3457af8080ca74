use std::path::{Path, PathBuf};

use ini::{Ini, Properties};
use mips_cpu::{BreakMode, ClockCycle, CpuSettings};
use num_traits::FromPrimitive;
use tracing::warn;

use crate::error::{Result, RunError};

/// Where the image ends up if the config doesn't say: right after the kernel area
const DEFAULT_LOAD_ADDRESS: u32 = 0x8001_0000;
/// Top of the first 2MiB of RAM
const DEFAULT_STACK_POINTER: u32 = 0x801f_fff0;
const DEFAULT_SLICE_CYCLES: ClockCycle = 100_000;
const DEFAULT_SLICES: u32 = 1_000;

/// Runner configuration, read from an INI file:
///
/// ```ini
/// [Cpu]
/// StopOnUnsupported = true
/// BreakMode = Halt
///
/// [Run]
/// Image = program.bin
/// LoadAddress = 0x80010000
/// EntryPoint = 0x80010000
/// StackPointer = 0x801ffff0
/// GlobalPointer = 0
/// SliceCycles = 100000
/// Slices = 1000
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub cpu: CpuSettings,
    /// Raw memory image, relative paths are resolved against the config file's directory
    pub image: PathBuf,
    pub load_address: u32,
    pub entry_point: u32,
    pub stack_pointer: u32,
    /// Left untouched if not set
    pub global_pointer: Option<u32>,
    pub slice_cycles: ClockCycle,
    pub slices: u32,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let ini = Ini::load_from_file(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        Config::from_ini(&ini, path, base)
    }

    /// Build the config from an already parsed INI. `source` is only used for diagnostics.
    pub fn from_ini(ini: &Ini, source: &Path, base: &Path) -> Result<Config> {
        let cpu = cpu_settings(ini.section(Some("Cpu")));

        let empty = Properties::new();
        let run = ini.section(Some("Run")).unwrap_or(&empty);

        let image = match run.get("Image") {
            Some(i) if !i.trim().is_empty() => base.join(i.trim()),
            _ => return Err(RunError::MissingImage(source.to_path_buf())),
        };

        let load_address = value(run, "LoadAddress", parse_u32, DEFAULT_LOAD_ADDRESS);
        let entry_point = value(run, "EntryPoint", parse_u32, load_address);
        let stack_pointer = value(run, "StackPointer", parse_u32, DEFAULT_STACK_POINTER);
        let global_pointer = run.get("GlobalPointer").and_then(|gp| {
            let gp = parse_u32(gp);

            if gp.is_none() {
                warn!("Invalid GlobalPointer in config, ignoring");
            }

            gp
        });

        let slice_cycles = value(
            run,
            "SliceCycles",
            |s| s.trim().parse().ok().filter(|&c: &ClockCycle| c > 0),
            DEFAULT_SLICE_CYCLES,
        );
        let slices = value(run, "Slices", |s| s.trim().parse().ok(), DEFAULT_SLICES);

        Ok(Config {
            cpu,
            image,
            load_address,
            entry_point,
            stack_pointer,
            global_pointer,
            slice_cycles,
            slices,
        })
    }
}

fn cpu_settings(section: Option<&Properties>) -> CpuSettings {
    let mut settings = CpuSettings::default();

    let section = match section {
        Some(s) => s,
        None => return settings,
    };

    settings.stop_on_unsupported = value(
        section,
        "StopOnUnsupported",
        parse_bool,
        settings.stop_on_unsupported,
    );

    settings.break_mode = value(
        section,
        "BreakMode",
        |s| {
            BreakMode::from_name(s.trim())
                .or_else(|| s.trim().parse().ok().and_then(BreakMode::from_u32))
        },
        settings.break_mode,
    );

    settings
}

/// Look up `key` and parse it, falling back to `default` if it's missing or malformed
fn value<T, F>(section: &Properties, key: &str, parse: F, default: T) -> T
where
    T: std::fmt::Debug,
    F: Fn(&str) -> Option<T>,
{
    match section.get(key) {
        None => default,
        Some(raw) => match parse(raw) {
            Some(v) => v,
            None => {
                warn!("Invalid {} in config: {:?}, using {:?}", key, raw, default);
                default
            }
        },
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal address
fn parse_u32(s: &str) -> Option<u32> {
    let s = s.trim();

    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16).ok(),
        None => s.parse().ok(),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
