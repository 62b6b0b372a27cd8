//! CLI entry point: parses arguments, builds the decoder registry, and
//! drives every root input, computing a process exit code from the worst
//! severity observed across all of them (§7).

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use rayon::prelude::*;

use vnarc::cli::{self, Commands};
use vnarc::driver::{CancellationToken, DriverOptions, UnpackDriver};
use vnarc::error::Severity;
use vnarc::file::File;
use vnarc::registry::Registry;
use vnarc::sink::{DecodeLogger, DedupingSink, EventKind, FsSink, TracingLogger};
use vnarc::stream::ByteStream;

fn main() -> ExitCode {
    let args = cli::parse();

    match args.command {
        Commands::Unpack { inputs, output, format, naming, max_depth, jobs, verbose } => {
            init_logging(verbose);
            run_unpack(inputs, output, format, naming, max_depth, jobs)
        }
        Commands::List { json } => {
            let mut registry = Registry::new();
            if let Err(e) = vnarc::formats::register_all(&mut registry) {
                eprintln!("internal error: {e}");
                return ExitCode::from(3);
            }
            print_formats(&registry, json);
            ExitCode::SUCCESS
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn print_formats(registry: &Registry, json: bool) {
    let ids: Vec<&str> = registry.all_ids().iter().map(|id| id.0.as_str()).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&ids).expect("string vec always serializes"));
    } else {
        for id in ids {
            println!("{id}");
        }
    }
}

fn run_unpack(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    format: Option<String>,
    naming: Option<vnarc::naming::NamingStrategy>,
    max_depth: usize,
    jobs: usize,
) -> ExitCode {
    let mut registry = Registry::new();
    if let Err(e) = vnarc::formats::register_all(&mut registry) {
        eprintln!("internal error: {e}");
        return ExitCode::from(3);
    }

    if let Err(e) = fs::create_dir_all(&output) {
        eprintln!("cannot create output directory {}: {e}", output.display());
        return ExitCode::from(1);
    }

    let thread_count = if jobs == 0 { num_cpus::get() } else { jobs };
    let pool = match rayon::ThreadPoolBuilder::new().num_threads(thread_count).build() {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("failed to build thread pool: {e}");
            return ExitCode::from(3);
        }
    };

    let options = DriverOptions {
        forced_decoder: format.as_deref().map(vnarc::decoder::DecoderId::from),
        naming_override: naming,
        max_depth: Some(max_depth),
    };
    let logger = TracingLogger;
    let cancellation = CancellationToken::new();
    let worst = Mutex::new(Severity::Success);

    pool.install(|| {
        inputs.par_iter().for_each(|input| {
            let severity = unpack_one(input, &output, &registry, &options, &logger, &cancellation);
            let mut worst = worst.lock().unwrap();
            if severity > *worst {
                *worst = severity;
            }
        });
    });

    ExitCode::from(worst.into_inner().unwrap() as u8)
}

fn unpack_one(
    input: &std::path::Path,
    output: &std::path::Path,
    registry: &Registry,
    options: &DriverOptions,
    logger: &dyn DecodeLogger,
    cancellation: &CancellationToken,
) -> Severity {
    let stream = match fs::File::open(input).and_then(ByteStream::from_file) {
        Ok(stream) => stream,
        Err(e) => {
            logger.log(EventKind::CorruptData, &input.to_string_lossy(), None, &format!("cannot open: {e}"));
            return Severity::InputError;
        }
    };
    let root = File::new(input.to_string_lossy().into_owned(), stream);

    let sink = DedupingSink::new(FsSink::new(output));
    let driver = UnpackDriver::new(registry, &sink, logger, options.clone(), cancellation.clone());
    match driver.run(root) {
        Ok(()) => Severity::Success,
        Err(e) => {
            logger.log(EventKind::CorruptData, &input.to_string_lossy(), None, &e.to_string());
            e.severity()
        }
    }
}
