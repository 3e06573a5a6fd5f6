//! pagesim - Main Entry Point
//!
//! Replays a memory access trace against the demand-paging simulator and
//! prints the resulting statistics.
//!
//! Usage: pagesim [OPTIONS] <TRACE> [OUTPUT]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use pagesim::io::write_results;
use pagesim::{AccessCosts, ReplacementPolicy, SimConfig, Trace, TraceError, VmError, VmManager};

#[derive(Parser)]
#[command(name = "pagesim")]
#[command(about = "Demand-paging virtual memory simulator")]
#[command(version)]
struct Cli {
    /// Trace file: `<pid> r <vaddr>`, `<pid> w <vaddr> <byte>` or `<pid> exit` per line
    trace: PathBuf,

    /// Write the byte produced by every access here
    output: Option<PathBuf>,

    /// Replacement policy
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = ReplacementPolicy::default())]
    policy: ReplacementPolicy,

    /// Physical address width in bits
    #[arg(long, default_value_t = pagesim::constants::DEFAULT_PADDR_BITS)]
    paddr_bits: u32,

    /// Virtual address width in bits
    #[arg(long, default_value_t = pagesim::constants::DEFAULT_VADDR_BITS)]
    vaddr_bits: u32,

    /// Page offset width in bits
    #[arg(long, default_value_t = pagesim::constants::DEFAULT_OFFSET_BITS)]
    offset_bits: u32,

    /// Random seed for the random policy
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Cost of one memory access
    #[arg(long, default_value_t = pagesim::constants::MEMORY_ACCESS_TIME)]
    memory_time: u64,

    /// Cost of reading a page from disk
    #[arg(long, default_value_t = pagesim::constants::DISK_PAGE_READ_TIME)]
    disk_read_time: u64,

    /// Cost of writing a page to disk
    #[arg(long, default_value_t = pagesim::constants::DISK_PAGE_WRITE_TIME)]
    disk_write_time: u64,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Log to stderr at the level picked by `-v`; `RUST_LOG` still overrides it
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main logic separated from main() for cleaner error handling
fn run(cli: &Cli) -> Result<(), TraceError> {
    let config = SimConfig {
        paddr_bits: cli.paddr_bits,
        vaddr_bits: cli.vaddr_bits,
        offset_bits: cli.offset_bits,
        policy: cli.policy,
        seed: cli.seed,
        costs: AccessCosts {
            memory_access: cli.memory_time,
            disk_write: cli.disk_write_time,
            disk_read: cli.disk_read_time,
        },
    };

    let trace = Trace::from_file(&cli.trace)?;
    let mut vm = VmManager::new(config)?;
    let g = *vm.geometry();
    log::info!(
        "{} frames x {} bytes, {} pages per process, {} replacement, {} events",
        g.num_frames,
        g.page_size,
        g.num_pages,
        cli.policy,
        trace.events.len()
    );

    let results = trace.replay(&mut vm)?;

    if let Some(output) = &cli.output {
        write_results(output, &results)?;
        log::info!("Results written to: {}", output.display());
    }

    println!("{}", vm.stats());
    match vm.average_access_time() {
        Ok(aat) => println!("Average access time: {:.2}", aat),
        Err(VmError::NoAccesses) => println!("Average access time: n/a (no accesses)"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
