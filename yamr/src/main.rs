//! `yamr` main executable

use std::path::PathBuf;
use std::process;

use log::{error, warn, LevelFilter};
use structopt::clap::{AppSettings, ErrorKind};
use structopt::StructOpt;

use yamr::{JobConfig, YamrError};

/// Runs a MapReduce job over the lines of a text file.
///
/// Every line is expanded into all of its proper prefixes by one of
/// `mnum` mapper threads. The prefixes are sorted, sharded by hash over
/// `rnum` reducer threads, and each reducer writes the shortest prefix
/// length not duplicated within its shard to `reducer_<n>.out`.
#[derive(Debug, StructOpt)]
#[structopt(
    name = "yamr",
    about = "Yet another MapReduce over line prefixes.",
    setting = AppSettings::AllowNegativeNumbers
)]
struct Opt {
    /// Input text file, one record per line.
    #[structopt(parse(from_os_str))]
    src: PathBuf,

    /// Number of mapper threads; the file is split into at most this
    /// many line-aligned parts.
    mnum: i64,

    /// Number of reducer threads and output files.
    rnum: i64,

    /// Directory receiving the `reducer_<n>.out` files.
    #[structopt(long, parse(from_os_str), default_value = ".")]
    output_dir: PathBuf,

    /// Print debug information to stderr and per-reducer record counts
    /// to stdout.
    #[structopt(long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn fail(err: YamrError) -> ! {
    error!("{}", err);
    process::exit(err.exit_code())
}

fn main() {
    let opt = match Opt::from_iter_safe(std::env::args_os()) {
        Ok(opt) => opt,
        Err(err) => match err.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => err.exit(),
            _ => {
                eprintln!("{}", err.message);
                process::exit(YamrError::MissingArguments.exit_code());
            }
        },
    };
    init_logging(opt.verbose);

    let config = match JobConfig::new(&opt.src, opt.mnum, opt.rnum) {
        Ok(config) => config.output_dir(&opt.output_dir),
        Err(err) => fail(err),
    };

    let report = match yamr::run(&config) {
        Ok(report) => report,
        Err(err) => fail(err),
    };
    for err in &report.errors {
        warn!("recovered: {}", err);
    }
    if opt.verbose {
        println!(
            "input {}\nmappers {}\nreducers {}",
            config.input().display(),
            config.mappers(),
            config.reducers()
        );
        println!(
            "splits {}\nrecords {}\nbuckets {:?}",
            report.splits, report.records, report.bucket_sizes
        );
    }
}
