use std::fs;

use mips_cpu::{ClockCycle, Mips, Ram, RegisterId};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, RunError};

/// Outcome of a complete run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub executed: u64,
    pub slices: u32,
    /// True if the run ended because the CPU stopped (unsupported operation or BREAK in halt
    /// mode) rather than because it used all its slices
    pub stopped: bool,
    pub pc: u32,
}

pub struct App {
    mips: Mips<Ram>,
    config: Config,
}

impl App {
    /// Load the image referenced by `config` and get the CPU ready to run it
    pub fn start(config: Config) -> Result<App> {
        let image = fs::read(&config.image)?;

        if image.is_empty() {
            return Err(RunError::EmptyImage(config.image.clone()));
        }

        info!(
            "Loaded {} ({} bytes) at 0x{:08x}",
            config.image.display(),
            image.len(),
            config.load_address
        );

        App::with_image(config, &image)
    }

    pub fn with_image(config: Config, image: &[u8]) -> Result<App> {
        let mut ram = Ram::new();

        ram.load_image(config.load_address, image);

        let mut mips = Mips::new(config.cpu);

        mips.attach_bus(ram);
        mips.reset();

        mips.set_register(RegisterId::Pc, config.entry_point)?;
        mips.set_register(RegisterId::Gpr(29), config.stack_pointer)?;

        if let Some(gp) = config.global_pointer {
            mips.set_register(RegisterId::Gpr(28), gp)?;
        }

        Ok(App { mips, config })
    }

    pub fn run(&mut self) -> Result<Report> {
        let mut executed = 0u64;
        let mut slices = 0;
        let mut stopped = false;

        while slices < self.config.slices {
            let ran: ClockCycle = self.mips.execute(self.config.slice_cycles)?;

            executed += ran as u64;
            slices += 1;

            debug!(
                "Slice {}: {} instructions, PC 0x{:08x}",
                slices,
                ran,
                self.mips.get_register(RegisterId::Pc)?
            );

            if self.mips.stopped() {
                warn!("CPU stopped after {} instructions", executed);
                stopped = true;
                break;
            }
        }

        let pc = self.mips.get_register(RegisterId::Pc)?;

        info!("Final state: {:?}", self.mips.cpu());

        Ok(Report {
            executed,
            slices,
            stopped,
            pc,
        })
    }

    pub fn mips(&self) -> &Mips<Ram> {
        &self.mips
    }
}
