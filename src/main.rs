use std::io;
use std::process::ExitCode;

use log::{error, LevelFilter};

use gluon::shell::Shell;
use gluon::{logger, FileSystem, LocalClock, DEFAULT_IMAGE_PATH};

struct Config {
    image: String,
    level: LevelFilter,
}

impl Config {
    /// `gluon [IMAGE] [-v|-q]`, with `GLUON_IMAGE` and `GLUON_LOG` as defaults.
    fn from_env() -> Result<Self, String> {
        let mut image = std::env::var("GLUON_IMAGE").unwrap_or_else(|_| DEFAULT_IMAGE_PATH.to_string());
        let mut level = match std::env::var("GLUON_LOG") {
            Ok(name) => logger::parse_level(&name).ok_or(format!("bad GLUON_LOG value {name:?}"))?,
            Err(_) => LevelFilter::Warn,
        };
        for arg in std::env::args().skip(1) {
            match arg.as_str() {
                "-v" => level = LevelFilter::Debug,
                "-q" => level = LevelFilter::Error,
                flag if flag.starts_with('-') => return Err(format!("unknown option {flag}")),
                path => image = path.to_string(),
            }
        }
        Ok(Self { image, level })
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("gluon: {msg}");
            eprintln!("usage: gluon [IMAGE] [-v|-q]");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logger::init(config.level) {
        eprintln!("gluon: cannot install logger: {e}");
    }

    let fs = match FileSystem::start(&config.image, Box::new(LocalClock)) {
        Ok(fs) => fs,
        Err(e) => {
            error!("cannot start file system on {}: {}", config.image, e);
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let mut shell = Shell::new(fs, stdin.lock(), io::stdout(), io::stderr());
    match shell.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("cannot save disk image {}: {}", config.image, e);
            ExitCode::FAILURE
        }
    }
}
