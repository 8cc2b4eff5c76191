//! Gamma probe entry point.
//!
//! Joins the command line back into one free-form string (the shape
//! the flag parser expects), builds the configuration, assembles the
//! app and runs the frame loop. Exit code 0 on clean shutdown; any
//! fatal setup failure reports and exits with -1.

use gamma_probe::{init_logging, Config};

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = Config::from_args(&args.join(" "));

    run(&config);
}

#[cfg(windows)]
fn run(config: &Config) {
    use gamma_probe::{fatal, FrameDriver, GammaTestApp};

    let mut app = match GammaTestApp::new(config) {
        Ok(app) => app,
        Err(e) => fatal(&e),
    };

    let mut driver = FrameDriver::new();
    if let Err(e) = driver.run(&mut app) {
        fatal(&e);
    }

    log::info!("Clean shutdown");
}

#[cfg(not(windows))]
fn run(_config: &Config) {
    eprintln!("gamma-probe drives a D3D11/OpenXR pipeline and only runs on Windows");
    std::process::exit(-1);
}
