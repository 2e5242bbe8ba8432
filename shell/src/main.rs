use clap::Parser;
use sapling_runtime::{prelude::*, syntax::source::SourceFile};
use std::{io, path::PathBuf, process};

mod config;
mod logger;
mod paths;
mod repl;

use config::Config;

/// Run Sapling programs, or start an interactive session when no program is
/// given.
#[derive(Debug, Parser)]
#[command(name = "sapling", version)]
struct Options {
    /// Program files to source, in order.
    files: Vec<PathBuf>,

    /// Evaluate an expression and print its value.
    #[arg(short = 'e', long = "eval", value_name = "EXPR")]
    eval: Option<String>,

    /// Enable verbose logging. Repeat for more detail.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable all logging.
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,

    /// Log the whole scope stack whenever a symbol cannot be found.
    #[arg(long = "debug-symbols")]
    debug_symbols: bool,

    /// Include global bindings in scope dumps.
    #[arg(long = "show-global-scope")]
    show_global_scope: bool,

    /// Read configuration from this file instead of the default location.
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() {
    let options = Options::parse();

    logger::init();

    if options.quiet {
        logger::quiet();
    } else {
        logger::verbose(options.verbose);
    }

    log_panics::init();

    process::exit(run(options));
}

fn run(options: Options) -> i32 {
    let config = match load_config(&options) {
        Ok(config) => config,
        Err(e) => {
            log::error!("failed to load configuration: {}", e);
            return exitcode::CONFIG;
        }
    };

    let mut interpreter = Interpreter::builder()
        .with_builtins()
        .debug_symbol_not_found(options.debug_symbols || config.debug_symbol_not_found)
        .show_global_scope(options.show_global_scope || config.show_global_scope)
        .build();

    for path in config.prelude.iter() {
        if let Err(e) = interpreter.source_file(path) {
            return report(&e);
        }
    }

    for path in options.files.iter() {
        if let Err(e) = interpreter.source_file(path) {
            return report(&e);
        }
    }

    if let Some(expr) = options.eval {
        match interpreter.eval(SourceFile::named("<eval>", expr)) {
            Ok(Value::Nil) => {}
            Ok(value) => println!("{}", value),
            Err(e) => return report(&e),
        }
    } else if options.files.is_empty() {
        let stdin = io::stdin();
        let prompt = atty::is(atty::Stream::Stdin);

        if let Err(e) = repl::run(&mut interpreter, stdin.lock(), io::stdout(), prompt) {
            log::error!("{}", e);
            return exitcode::IOERR;
        }
    }

    exitcode::OK
}

/// Settings from an explicitly named config file, or from the default location
/// if a file exists there.
fn load_config(options: &Options) -> io::Result<Config> {
    if let Some(path) = options.config.as_ref() {
        return Config::load(path);
    }

    match paths::config_file() {
        Some(path) if path.exists() => Config::load(&path),
        _ => Ok(Config::default()),
    }
}

fn report(exception: &Exception) -> i32 {
    log::error!("{}", exception);
    exit_code(exception)
}

fn exit_code(exception: &Exception) -> exitcode::ExitCode {
    match exception.kind() {
        ErrorKind::Parse | ErrorKind::Compile => exitcode::DATAERR,
        ErrorKind::FileNotFound => exitcode::NOINPUT,
        ErrorKind::Io => exitcode::IOERR,
        _ => exitcode::SOFTWARE,
    }
}
