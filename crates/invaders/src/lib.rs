use std::path::PathBuf;

use anyhow::{bail, Result};
use invaders_common::app::App;
use invaders_core::disasm::LogTracer;
use invaders_core::rom;
use invaders_core::InvadersApp;
use invaders_sdl2::{SdlContext, SdlInitInfo};

/// Options resolved from the command line.
pub struct RunOptions {
    /// Directory containing invaders.h/g/f/e.
    pub rom_dir: PathBuf,
    /// Install the instruction tracer (visible at trace log level).
    pub trace: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            rom_dir: PathBuf::from("."),
            trace: false,
        }
    }
}

/// Load the ROM set, bring up the window and run until quit.
///
/// Returns an error for any of the fatal conditions: a bad ROM set,
/// host video init failure, or the CPU stopping on an opcode it cannot
/// decode.
pub fn run(options: &RunOptions) -> Result<()> {
    let rom = rom::load_rom_set(&options.rom_dir)?;

    let mut app = InvadersApp::default();
    app.machine.load_rom(&rom);
    if options.trace {
        app.machine.set_tracer(Some(Box::new(LogTracer)));
    }

    let window = app.window();
    let init_info = SdlInitInfo::builder()
        .width(window.width)
        .height(window.height)
        .scale(window.scale)
        .title(window.title)
        .build();
    SdlContext::run(init_info, &mut app)?;

    if let Some(fault) = app.machine.fault() {
        bail!(
            "emulation stopped on opcode {:#04x} at {:#06x}",
            fault.opcode,
            fault.pc
        );
    }
    Ok(())
}
