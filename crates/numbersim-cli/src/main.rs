use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use numbersim_core::{RunRequest, WeightInit};
use numbersim_error::{NumbersimError, Result};
use numbersim_lang::{LanguageCatalog, ParseLimits};

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    weight_init: WeightInit,
    dump_path: Option<String>,
    show_help: bool,
    run_tokens: Vec<String>,
}

fn main() {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    let exit_code = run(std::env::args_os(), &mut input, &mut stdout, &mut stderr);
    drop(input);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run<I, R, W, E>(args: I, input: &mut R, out: &mut W, err: &mut E) -> i32
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let options = match parse_args(args) {
        Ok(options) => options,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            let _ = write_usage(err);
            return 2;
        }
    };

    if options.show_help {
        return i32::from(write_usage(out).is_err());
    }

    let limits = ParseLimits::default();

    if let Some(path) = options.dump_path.as_deref() {
        return match dump_catalog(Path::new(path), &limits, out) {
            Ok(()) => 0,
            Err(error) => {
                let _ = writeln!(err, "error: {error}");
                error.exit_code()
            }
        };
    }

    if options.run_tokens.is_empty() {
        return run_batch(input, options.weight_init, &limits, out, err);
    }

    let mut catalogs = BTreeMap::new();
    match execute_run(
        &options.run_tokens,
        &mut catalogs,
        options.weight_init,
        &limits,
        out,
    ) {
        Ok(()) => 0,
        Err(error) => {
            let _ = writeln!(err, "error: {error}");
            error.exit_code()
        }
    }
}

fn parse_args<I>(args: I) -> std::result::Result<CliOptions, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let _argv0 = iter.next();

    let mut weight_init = WeightInit::Zero;
    let mut dump_path: Option<String> = None;
    let mut show_help = false;
    let mut run_tokens: Vec<String> = Vec::new();

    while let Some(argument) = iter.next() {
        let arg = argument.to_string_lossy();
        let arg_str = arg.as_ref();

        match arg_str {
            "-h" | "--help" => {
                show_help = true;
            }
            "--init" => {
                let next = iter
                    .next()
                    .ok_or_else(|| String::from("missing value for `--init`"))?;
                weight_init = parse_init(next.to_string_lossy().as_ref())?;
            }
            "--dump" => {
                if dump_path.is_some() {
                    return Err(String::from("`--dump` may only be provided once"));
                }
                let next = iter
                    .next()
                    .ok_or_else(|| String::from("missing file path for `--dump`"))?;
                dump_path = Some(next.to_string_lossy().into_owned());
            }
            _ => {
                if let Some(value) = arg_str.strip_prefix("--init=") {
                    weight_init = parse_init(value)?;
                    continue;
                }
                if let Some(value) = arg_str.strip_prefix("--dump=") {
                    if dump_path.is_some() {
                        return Err(String::from("`--dump` may only be provided once"));
                    }
                    dump_path = Some(value.to_owned());
                    continue;
                }
                if arg_str.starts_with("--") {
                    return Err(format!("unknown option `{arg_str}`"));
                }
                run_tokens.push(arg_str.to_owned());
            }
        }
    }

    if dump_path.is_some() && !run_tokens.is_empty() {
        return Err(String::from("`--dump` cannot be combined with run tokens"));
    }

    Ok(CliOptions {
        weight_init,
        dump_path,
        show_help,
        run_tokens,
    })
}

fn parse_init(value: &str) -> std::result::Result<WeightInit, String> {
    WeightInit::from_token(value)
        .ok_or_else(|| format!("invalid value for `--init`: `{value}` (expected zero|random)"))
}

/// Batch mode: one run per stdin line.
///
/// A bad configuration only skips its line; a bad definition source (or a
/// broken stream) aborts, since every later line would hit the same fault.
fn run_batch<R, W, E>(
    input: &mut R,
    weight_init: WeightInit,
    limits: &ParseLimits,
    out: &mut W,
    err: &mut E,
) -> i32
where
    R: BufRead,
    W: Write,
    E: Write,
{
    let mut catalogs = BTreeMap::new();
    let mut line = String::new();
    let mut line_number: u64 = 0;

    loop {
        line.clear();
        let bytes_read = match input.read_line(&mut line) {
            Ok(bytes_read) => bytes_read,
            Err(error) => {
                let _ = writeln!(err, "error: {error}");
                return 1;
            }
        };
        if bytes_read == 0 {
            return 0;
        }
        line_number += 1;

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        if let Err(error) = execute_run(&tokens, &mut catalogs, weight_init, limits, out) {
            let _ = writeln!(err, "error: line {line_number}: {error}");
            if error.is_source_error() {
                return error.exit_code();
            }
        }
    }
}

/// Parse one token list, resolve its language, execute, and emit the report.
fn execute_run<S, W>(
    tokens: &[S],
    catalogs: &mut BTreeMap<PathBuf, LanguageCatalog>,
    weight_init: WeightInit,
    limits: &ParseLimits,
    out: &mut W,
) -> Result<()>
where
    S: AsRef<str>,
    W: Write,
{
    let request = RunRequest::parse(tokens)?;

    let catalog = match catalogs.entry(request.source.clone()) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => {
            entry.insert(LanguageCatalog::from_file(&request.source, limits)?)
        }
    };

    let language = catalog
        .get(&request.language)
        .ok_or_else(|| NumbersimError::UnknownLanguage {
            name: request.language.clone(),
        })?
        .clone();

    let report = numbersim_core::run(&request.into_config(language, weight_init))?;
    report.write(out)?;
    Ok(())
}

fn dump_catalog<W: Write>(path: &Path, limits: &ParseLimits, out: &mut W) -> Result<()> {
    let catalog = LanguageCatalog::from_file(path, limits)?;
    for language in catalog.iter() {
        writeln!(out, "{language}")?;
    }
    Ok(())
}

fn write_usage<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "Usage: numbersim [OPTIONS] [RUN TOKENS...]\n\
         \n\
         With run tokens, executes one simulation run; without, reads one run\n\
         per line from stdin.\n\
         \n\
         Run tokens:\n\
         <source> <seed1> <seed2> <language>\n\
         ( ztnbd <beta> <r> | <p1> ... <pK> )\n\
         <learning-rate> <max-cardinality> <trials>\n\
         ( full | summary <threshold> | range_summary <threshold> )\n\
         \n\
         Options:\n\
         --init zero|random   Starting weights for every run (default: zero)\n\
         --dump FILE          Print the parsed language catalog and exit\n\
         -h, --help           Show this help\n\
         \n\
         Examples:\n\
         \n\
         numbersim languages.txt 1 1 english ztnbd 0.6 3 0.01 7 500 summary 200\n\
         numbersim languages.txt 1 1 english 0.34 0.33 0.33 0.1 3 1000 full\n\
         numbersim --dump languages.txt\n",
    )
}
