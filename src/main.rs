use std::io;

use clap::Parser;

use capstat::capture::{self, CaptureSource, PcapFileCapture};
use capstat::cli::{Cli, SourceConfig};
use capstat::error::CapstatError;
use capstat::session::Session;
use capstat::shutdown::{self, ShutdownToken};
use capstat::stats::CaptureStatistics;

/// Exit codes: 1 usage, 2 capture open failure, 3 runtime failure.
fn exit_code(err: &CapstatError) -> i32 {
    match err {
        CapstatError::InvalidConfig(_) => 1,
        e if e.is_open_failure() => 2,
        _ => 3,
    }
}

fn main() {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version go to stdout and are not failures.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    match run(cli) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(exit_code(&e));
        }
    }
}

fn run(cli: Cli) -> Result<(), CapstatError> {
    let resolved = cli.resolve()?;

    // 0. Install signal handlers before the capture handle exists.
    let token = ShutdownToken::new();
    shutdown::install_signal_handlers(&token);

    // 1. Acquire the capture source.
    let source: Box<dyn CaptureSource> = match &resolved.source {
        SourceConfig::Live(live) => {
            eprintln!("Opening device {} for capture...", live.interface);
            capture::open_live(live)?
        }
        SourceConfig::File(path) => Box::new(PcapFileCapture::open(path)?),
    };
    eprintln!("Capture started on {}. Press Ctrl+C to stop.", source.name());

    // 2. Run the session; it releases the source on every exit path.
    let session = Session::new(
        source,
        CaptureStatistics::new(resolved.stats),
        token,
        resolved.session,
    );
    let summary = session.run(&mut io::stdout().lock())?;

    log::info!(
        "stopped ({:?}) after {} packets",
        summary.reason,
        summary.report.packets
    );
    eprintln!("Capture finished.");
    Ok(())
}
