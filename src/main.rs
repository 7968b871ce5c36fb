// Tue Jan 20 2026 - Alex

use anyhow::Context;
use clap::{ArgAction, Parser};
use colored::Colorize;
use holescan::{
    output::Aggregate, ClassMode, Config, Flow, GraphLoader, ReportFormat, Reporter, Session, Strings,
};
use std::io;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "holescan")]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Finds holes in struct layouts and computes tighter member orders", long_about = None)]
struct Args {
    /// Type graph dump (JSON)
    input: PathBuf,

    /// Load settings from a JSON file; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show just this struct
    #[arg(short = 'C', long)]
    class_name: Option<String>,

    /// Reorganize the struct named with --class-name
    #[arg(short = 'R', long)]
    reorganize: bool,

    /// Show every reorganization step
    #[arg(short = 'S', long)]
    show_reorg_steps: bool,

    /// List structs containing this one
    #[arg(long)]
    contains: Option<String>,

    /// List structs holding pointers to this one
    #[arg(long)]
    find_pointers_to: Option<String>,

    /// Descend into containers of containers
    #[arg(long)]
    recursive: bool,

    /// List the units defining --class-name
    #[arg(long)]
    defined_in: bool,

    /// Show only structs that can be packed tighter
    #[arg(short = 'P', long)]
    packable: bool,

    /// Include anonymous structs
    #[arg(long)]
    anon_include: bool,

    /// Include anonymous structs that only appear nested
    #[arg(long)]
    nested_anon_include: bool,

    /// Show only structs whose name starts with this prefix
    #[arg(long)]
    prefix_filter: Option<String>,

    /// Skip structs whose name starts with this prefix
    #[arg(long)]
    exclude: Option<String>,

    /// Skip structs declared in files starting with this prefix
    #[arg(long)]
    decl_exclude: Option<String>,

    /// Skip compilation units starting with this prefix
    #[arg(long)]
    cu_exclude: Option<String>,

    /// Show only structs with at least this many holes
    #[arg(long)]
    holes: Option<usize>,

    /// Show only structs with at least this many bit holes
    #[arg(long)]
    bit_holes: Option<usize>,

    /// Show only structs with a hole of at least this size
    #[arg(long)]
    hole_size_ge: Option<u64>,

    /// Show the type with this id (decimal or 0x hex)
    #[arg(long, value_parser = parse_type_id)]
    type_id: Option<u32>,

    /// Simulate this word size in bytes
    #[arg(short = 'w', long)]
    word_size: Option<u8>,

    /// Cacheline size in bytes, 0 to disable
    #[arg(short = 'c', long)]
    cacheline_size: Option<u64>,

    /// Field separator for one-line formats
    #[arg(short = 't', long)]
    separator: Option<char>,

    #[arg(long, value_enum)]
    format: Option<ReportFormat>,

    /// Print registry counters instead of structs
    #[arg(long, value_enum)]
    aggregate: Option<Aggregate>,

    /// More detail in reports (member counts, reorg output)
    #[arg(long)]
    detailed: bool,

    /// Repeat for more log output
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[arg(long)]
    log_level: Option<String>,

    #[arg(short, long)]
    quiet: bool,
}

fn parse_type_id(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid type id {}: {}", s, e))
}

fn setup_logging(args: &Args) {
    let level = match args.log_level.as_deref().map(str::to_lowercase) {
        Some(level) => match level.as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            "off" => log::LevelFilter::Off,
            _ => log::LevelFilter::Info,
        },
        None => match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        },
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn build_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path).map_err(|e| anyhow::anyhow!(e))?,
        None => Config::default(),
    };

    if let Some(name) = &args.class_name {
        config.class_name = Some(name.clone());
    }
    if args.reorganize {
        config.class_mode = ClassMode::Reorganize;
    }
    if let Some(name) = &args.contains {
        config.class_name = Some(name.clone());
        config.class_mode = ClassMode::Containers;
    }
    if let Some(name) = &args.find_pointers_to {
        config.class_name = Some(name.clone());
        config.class_mode = ClassMode::PointersTo;
    }
    config.show_reorg_steps |= args.show_reorg_steps;
    config.recursive |= args.recursive;
    config.defined_in |= args.defined_in;
    config.packable |= args.packable;
    config.include_anonymous |= args.anon_include;
    config.include_nested_anonymous |= args.nested_anon_include;
    config.verbose |= args.detailed;

    if args.prefix_filter.is_some() {
        config.include_prefix = args.prefix_filter.clone();
    }
    if args.exclude.is_some() {
        config.exclude_prefix = args.exclude.clone();
    }
    if args.decl_exclude.is_some() {
        config.decl_exclude_prefix = args.decl_exclude.clone();
    }
    if args.cu_exclude.is_some() {
        config.cu_exclude_prefix = args.cu_exclude.clone();
    }
    if let Some(holes) = args.holes {
        config.min_holes = holes;
    }
    if let Some(bit_holes) = args.bit_holes {
        config.min_bit_holes = bit_holes;
    }
    if args.hole_size_ge.is_some() {
        config.hole_size_ge = args.hole_size_ge;
    }
    if args.type_id.is_some() {
        config.type_id = args.type_id;
    }
    if args.word_size.is_some() {
        config.word_size = args.word_size;
    }
    if let Some(cacheline_size) = args.cacheline_size {
        config.cacheline_size = cacheline_size;
    }
    if let Some(separator) = args.separator {
        config.separator = separator;
    }
    if args.aggregate.is_some() {
        config.aggregate = args.aggregate;
    }

    config.format = match args.format {
        Some(format) => format,
        None if config.packable && !config.verbose => ReportFormat::Packable,
        None if args.hole_size_ge.is_some() && !config.verbose => ReportFormat::Names,
        None => config.format,
    };

    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(config)
}

fn run(args: Args) -> anyhow::Result<()> {
    setup_logging(&args);
    let config = build_config(&args)?;
    let start_time = Instant::now();

    if !args.quiet {
        eprintln!("{} Loading type graph: {}", "[*]".blue(), args.input.display());
    }
    let mut strings = Strings::new();
    let units = GraphLoader::load_file(&args.input, &mut strings)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    if units.is_empty() {
        anyhow::bail!("No debugging information found in {}", args.input.display());
    }
    if !args.quiet {
        eprintln!(
            "{} Loaded {} compilation units, {} names",
            "[+]".green(),
            units.len(),
            strings.len()
        );
    }

    let mut session = Session::new(config.clone(), strings).context("cannot start scan")?;
    let stdout = io::stdout();
    let mut reporter = Reporter::from_config(stdout.lock(), &config);

    for mut unit in units {
        let outcome = session
            .process_unit(&mut unit)
            .with_context(|| format!("while processing {}", unit.name()))?;
        reporter.report_all(&outcome.findings)?;
        if outcome.flow == Flow::Stop {
            break;
        }
    }
    reporter.report_all(&session.finish())?;

    if !args.quiet {
        let stats = session.stats();
        eprintln!(
            "{} {} units scanned, {} skipped, {} structs reported in {:.2}s",
            "[+]".green(),
            stats.units_seen,
            stats.units_skipped,
            stats.structs_reported,
            start_time.elapsed().as_secs_f64()
        );
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("{} {:#}", "[!]".red(), e);
        std::process::exit(1);
    }
}
