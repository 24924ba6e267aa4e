//! Transplanter command line

use anyhow::{Context, bail};
use clap::{ArgGroup, Parser};
use serde::Serialize;
use std::{env, fs, panic, path::Path, path::PathBuf, process};
use transplanter::api::{FileReport, Transplanter};
use transplanter::config::TransplantConfig;
use transplanter::exceptions::TransplantError;
use transplanter::exit_codes::*;
use transplanter::pcc::CommitOutcome;
use transplanter::pcc::dump::{DumpOptions, dump_file, dump_folder};

const VERSION: &str = transplanter::version::VERSION;

#[derive(Parser, Debug)]
#[command(
    version = VERSION,
    about = "Extract, replace and transplant GFx movies in ME3 packages",
    group(ArgGroup::new("input").args(["inputfile", "inputfolder"])),
    group(ArgGroup::new("operation").args(["transplantfile", "gui_extract", "extract", "replace"]))
)]
struct Args {
    /// Input package to be processed
    #[arg(short = 'i', long)]
    inputfile: Option<PathBuf>,

    /// Input folder to be processed (recursively)
    #[arg(short = 'f', long)]
    inputfolder: Option<PathBuf>,

    /// Output folder used by extraction, dumping and folder replacement
    #[arg(short = 'o', long)]
    outputfolder: Option<PathBuf>,

    /// Package to inject the input file's movies into (requires --inputfile)
    #[arg(short = 't', long)]
    transplantfile: Option<PathBuf>,

    /// Extract all movies from the input
    #[arg(short = 'g', long = "gui-extract")]
    gui_extract: bool,

    /// Dump package contents as text (select sections with -n/-m/-d/-r/-p)
    #[arg(short = 'x', long)]
    extract: bool,

    /// Replace movies from a payload file or folder
    #[arg(long, value_name = "PATH")]
    replace: Option<PathBuf>,

    /// Qualified export name to replace when --replace is a single file
    #[arg(long, requires = "replace")]
    target: Option<String>,

    /// Dump the name table
    #[arg(short = 'n', long)]
    names: bool,

    /// Dump the import table
    #[arg(short = 'm', long)]
    imports: bool,

    /// Dump export data as hex (implies --exports)
    #[arg(short = 'd', long)]
    data: bool,

    /// Dump export metadata
    #[arg(short = 'r', long)]
    exports: bool,

    /// Dump decoded export properties
    #[arg(short = 'p', long)]
    properties: bool,

    /// Packages processed at once in folder operations
    #[arg(long)]
    workers: Option<usize>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a JSON report of the operation to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error; prefix json: for JSON lines)
    #[arg(long)]
    log_level: Option<String>,

    /// Shortcut for --log-level debug
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() {
    // Set up panic handler to return specific exit code
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        process::exit(EXIT_PANIC);
    }));

    let result = panic::catch_unwind(run);

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(_) => {
            eprintln!("Fatal: Unhandled panic in transplanter");
            process::exit(EXIT_PANIC);
        }
    }
}

fn run() -> i32 {
    if env::args().nth(1).as_deref() == Some("--version") {
        println!("transplanter {}", transplanter::version::full_version());
        return EXIT_SUCCESS;
    }

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                EXIT_INVALID_ARGS
            } else {
                EXIT_SUCCESS
            };
        }
    };

    match (&args.log_level, args.verbose) {
        (Some(level), _) => transplanter::logger::JsonLogger::init_with_level(level),
        (None, true) => transplanter::logger::JsonLogger::init_with_level("debug"),
        (None, false) => transplanter::logger::JsonLogger::init(),
    }

    if args.inputfile.is_none() && args.inputfolder.is_none() {
        eprintln!("--inputfile or --inputfolder argument is required for all operations.");
        return EXIT_NO_INPUT;
    }
    if let Some(file) = &args.inputfile {
        if !file.is_file() {
            eprintln!("Input file does not exist: {}", file.display());
            return EXIT_INPUT_FILE_NOT_FOUND;
        }
    }
    if let Some(folder) = &args.inputfolder {
        if !folder.is_dir() {
            eprintln!("Input folder does not exist: {}", folder.display());
            return EXIT_INPUT_FOLDER_NOT_FOUND;
        }
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return EXIT_CONFIG_ERROR;
        }
    };
    let tool = Transplanter::new(config);

    if args.gui_extract {
        gui_extract(&tool, &args)
    } else if args.extract {
        dump(&tool, &args)
    } else if let Some(target) = &args.transplantfile {
        transplant(&tool, &args, target)
    } else if let Some(payloads) = &args.replace {
        replace(&tool, &args, payloads)
    } else {
        eprintln!("No operation was specified");
        EXIT_NO_OPERATION
    }
}

fn load_config(args: &Args) -> anyhow::Result<TransplantConfig> {
    let mut config = match &args.config {
        Some(path) => TransplantConfig::from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => TransplantConfig::default(),
    }
    .with_env();

    if let Some(workers) = args.workers {
        if workers == 0 {
            bail!("--workers must be at least 1");
        }
        config.workers = workers;
    }
    Ok(config)
}

fn exit_code_for(err: &TransplantError) -> i32 {
    match err {
        TransplantError::UnsupportedFormat(_)
        | TransplantError::CorruptPackage(_)
        | TransplantError::MalformedExport(_) => EXIT_FORMAT_ERROR,
        TransplantError::VerificationFailed { .. } => EXIT_VERIFY_ERROR,
        TransplantError::SameSourceAndDestination(_) => EXIT_SAME_IN_OUT_FILE,
        TransplantError::JsonError(_) => EXIT_CONFIG_ERROR,
        e if e.is_io() => EXIT_IO_ERROR,
        _ => EXIT_ERROR,
    }
}

fn write_report<T: Serialize>(path: Option<&Path>, value: &T) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(value).context("serializing report")?;
    fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
    Ok(())
}

fn finish_batch(args: &Args, reports: &[FileReport]) -> i32 {
    for report in reports {
        println!("{}: {:?}", report.path.display(), report.status);
    }
    if let Err(e) = write_report(args.report.as_deref(), &reports) {
        eprintln!("Report error: {e:#}");
        return EXIT_IO_ERROR;
    }
    if reports.iter().any(FileReport::is_failure) {
        EXIT_BATCH_ERROR
    } else {
        EXIT_SUCCESS
    }
}

fn finish_commit(args: &Args, outcome: &CommitOutcome) -> i32 {
    match outcome {
        CommitOutcome::NoMatches => println!("No movies replaced"),
        CommitOutcome::Committed {
            replaced, strategy, ..
        } => println!("Replaced {replaced} movies ({strategy} save), package verified"),
    }
    if let Err(e) = write_report(args.report.as_deref(), outcome) {
        eprintln!("Report error: {e:#}");
        return EXIT_IO_ERROR;
    }
    EXIT_SUCCESS
}

fn gui_extract(tool: &Transplanter, args: &Args) -> i32 {
    if let Some(file) = &args.inputfile {
        match tool.extract_movies(file, args.outputfolder.as_deref()) {
            Ok(written) => {
                for path in &written {
                    println!("{}", path.display());
                }
                EXIT_SUCCESS
            }
            Err(e) => {
                eprintln!("Extraction error: {e}");
                exit_code_for(&e)
            }
        }
    } else if let Some(folder) = &args.inputfolder {
        match tool.extract_movies_from_folder(folder, args.outputfolder.as_deref()) {
            Ok(reports) => finish_batch(args, &reports),
            Err(e) => {
                eprintln!("Extraction error: {e}");
                exit_code_for(&e)
            }
        }
    } else {
        EXIT_NO_INPUT
    }
}

fn dump(tool: &Transplanter, args: &Args) -> i32 {
    let options = DumpOptions {
        imports: args.imports,
        exports: args.exports || args.data,
        data: args.data,
        names: args.names,
        properties: args.properties,
        separate_exports: false,
    };
    if !options.any() {
        eprintln!(
            "Nothing was selected to dump. Use --names, --imports, --exports, --data or --properties."
        );
        return EXIT_NO_DATA_TO_DUMP;
    }

    let result = match (&args.inputfile, &args.inputfolder) {
        (Some(file), _) => dump_file(file, &options, args.outputfolder.as_deref()).map(|p| vec![p]),
        (None, Some(folder)) => dump_folder(
            folder,
            &tool.config().package_extension,
            &options,
            args.outputfolder.as_deref(),
        ),
        (None, None) => return EXIT_NO_INPUT,
    };

    match result {
        Ok(written) => {
            for path in written {
                println!("Wrote {}", path.display());
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Dump error: {e}");
            exit_code_for(&e)
        }
    }
}

fn transplant(tool: &Transplanter, args: &Args, target: &Path) -> i32 {
    let Some(source) = &args.inputfile else {
        eprintln!("--transplantfile only works with --inputfile.");
        return EXIT_INPUT_FILE_NOT_FOUND;
    };
    if !target.is_file() {
        eprintln!(
            "File to inject movies into does not exist: {}",
            target.display()
        );
        return EXIT_NO_TRANSPLANT_FILE;
    }

    println!(
        "Transplanting movies from {} to {}",
        source.display(),
        target.display()
    );
    match tool.transplant(source, target) {
        Ok(outcome) => finish_commit(args, &outcome),
        Err(e) => {
            eprintln!("Transplant error: {e}");
            exit_code_for(&e)
        }
    }
}

fn replace(tool: &Transplanter, args: &Args, payloads: &Path) -> i32 {
    if let Some(folder) = &args.inputfolder {
        if !payloads.is_dir() {
            eprintln!("--replace must be a folder with --inputfolder");
            return EXIT_INVALID_ARGS;
        }
        return match tool.replace_folder(folder, payloads, args.outputfolder.as_deref()) {
            Ok(reports) => finish_batch(args, &reports),
            Err(e) => {
                eprintln!("Replace error: {e}");
                exit_code_for(&e)
            }
        };
    }

    let Some(dest) = &args.inputfile else {
        return EXIT_NO_INPUT;
    };
    let result = if payloads.is_dir() {
        tool.replace_from_directory(payloads, dest)
    } else if payloads.is_file() {
        tool.replace_single(payloads, dest, args.target.as_deref())
    } else {
        eprintln!("Payload path does not exist: {}", payloads.display());
        return EXIT_IO_ERROR;
    };

    match result {
        Ok(outcome) => finish_commit(args, &outcome),
        Err(e) => {
            eprintln!("Replace error: {e}");
            exit_code_for(&e)
        }
    }
}
