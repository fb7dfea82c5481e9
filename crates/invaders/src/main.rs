use std::path::PathBuf;

use invaders::RunOptions;

fn main() {
    env_logger::init();

    let mut options = RunOptions::default();
    for arg in std::env::args().skip(1) {
        if arg == "--trace" {
            options.trace = true;
        } else {
            options.rom_dir = PathBuf::from(arg);
        }
    }
    log::info!("loading ROM set from {}", options.rom_dir.display());

    if let Err(err) = invaders::run(&options) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
