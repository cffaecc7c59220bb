//! Command-line acquisition frontend.

use std::process::ExitCode;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chordlink::{
    AcquisitionError, AcquisitionSession, ChordLink, CsvRecorder, SessionConfig, SessionSummary,
    SinkSet,
};

#[derive(Parser, Debug)]
#[command(name = "chordlink", version, about = "Stream EXG samples from a BioAmp board")]
struct Cli {
    /// Serial port of the board; scans all ports when omitted.
    #[arg(short, long)]
    port: Option<String>,

    /// Force a baud rate instead of probing the candidates.
    #[arg(short, long)]
    baudrate: Option<u32>,

    /// Record samples to a timestamped CSV file.
    #[arg(long)]
    csv: bool,

    /// Publish samples on a Lab Streaming Layer outlet.
    #[cfg(feature = "lsl")]
    #[arg(long)]
    lsl: bool,

    /// Stop after this many seconds; runs until Ctrl-C when omitted.
    #[arg(short = 't', long = "time")]
    time: Option<u64>,

    /// Reflect channel values around the board's ADC midpoint.
    #[arg(long)]
    inverted: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn wants_lsl(&self) -> bool {
        #[cfg(feature = "lsl")]
        {
            self.lsl
        }
        #[cfg(not(feature = "lsl"))]
        {
            false
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "chordlink=debug" } else { "chordlink=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if !cli.csv && !cli.wants_lsl() {
        // Nothing asked for the data; show usage instead of streaming
        // into the void.
        let _ = Cli::command().print_help();
        println!();
        return ExitCode::SUCCESS;
    }

    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(summary) => {
            println!("Total packets decoded: {}", summary.packets_decoded);
            println!("Total missing samples: {}", summary.missing_samples);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "acquisition failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<SessionSummary, AcquisitionError> {
    let wants_lsl = cli.wants_lsl();

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            ctrl_c_cancel.cancel();
        }
    });

    // Serial I/O and the acquisition loop are synchronous; keep them
    // off the async runtime's worker threads.
    tokio::task::spawn_blocking(move || {
        let device = match &cli.port {
            Some(port) => ChordLink::connect(port, cli.baudrate)?,
            None => ChordLink::detect()?,
        };

        let mut sinks = SinkSet::new();
        if cli.csv {
            let recorder = CsvRecorder::create(device.profile)?;
            println!("Recording to {}", recorder.path().display());
            sinks.push(Box::new(recorder));
        }
        #[cfg(feature = "lsl")]
        if wants_lsl {
            sinks.push(Box::new(chordlink::LslSink::create(device.profile)?));
        }
        #[cfg(not(feature = "lsl"))]
        let _ = wants_lsl;

        let config = SessionConfig {
            run_duration: cli.time.map(Duration::from_secs),
            inverted: cli.inverted,
            ..Default::default()
        };
        let mut session =
            AcquisitionSession::new(device.transport, device.profile, config, sinks, cancel);
        session.run()
    })
    .await
    .expect("acquisition task panicked")
}
