use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

struct Logger {
    out: StandardStream,
    pretty: bool,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let (name, color) = match record.level() {
            Level::Error => ("error", Color::Red),
            Level::Warn => ("warn", Color::Magenta),
            Level::Info => ("info", Color::Yellow),
            Level::Debug => ("debug", Color::Cyan),
            Level::Trace => ("trace", Color::Blue),
        };

        let mut out = self.out.lock();

        if self.pretty {
            let mut color_spec = ColorSpec::new();
            color_spec.set_bold(true);
            color_spec.set_fg(Some(color));
            out.set_color(&color_spec).ok();
        }

        write!(out, "{}", name).ok();

        if self.pretty {
            out.reset().ok();
        }

        // Runtime internals are noisy; name the module they came from.
        if record.level() >= Level::Debug {
            if let Some(module) = record.module_path() {
                write!(out, " [{}]", module).ok();
            }
        }

        writeln!(out, ": {}", record.args()).ok();
    }

    fn flush(&self) {}
}

/// Install the stderr logger. Only warnings and errors are shown until the
/// level is raised with [`verbose`].
pub fn init() {
    let pretty = atty::is(atty::Stream::Stderr);
    let logger = Logger {
        out: StandardStream::stderr(if pretty {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        }),
        pretty,
    };

    if log::set_boxed_logger(Box::new(logger)).is_err() {
        return;
    }

    log::set_max_level(LevelFilter::Warn);
}

pub fn verbose(verbosity: u8) {
    log::set_max_level(match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    });

    log::debug!("log level set to {}", log::max_level());
}

pub fn quiet() {
    log::set_max_level(LevelFilter::Off);
}
