use std::path::PathBuf;

use log::LevelFilter;
use memsim::FitPolicy;
use thiserror::Error;

pub const USAGE: &str = "\
usage: runner [FILE] [--random] [--mi N] [--mf N] [--steps N] [--seed N]
              [--alloc-ratio P] [--policy last-fit|first-fit] [--quiet] [--log LEVEL]

  FILE        instruction file: mode, mi and mf lines, then `S <size>` / `L <id>`
  --random    generate random instructions instead of running the listed ones
  --mi, --mf  memory bounds, override the file (required with --random and no FILE)
  --steps     number of random instructions (default 20)
  --seed      seed for random instructions (default: from entropy)
  --alloc-ratio
              chance of an allocation per random step, 0.0 to 1.0 (default 0.6)
  --policy    free region selection (default last-fit)
  --quiet     only print the final memory state
  --log       off, error, warn, info, debug or trace (default info)";

const DEFAULT_STEPS: usize = 20;
const DEFAULT_ALLOC_RATIO: f64 = 0.6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing value for {0}")]
    MissingValue(String),

    #[error("invalid number for {flag}: {value}")]
    InvalidNumber { flag: String, value: String },

    #[error("unknown policy: {0}")]
    UnknownPolicy(String),

    #[error("unknown log level: {0}")]
    UnknownLogLevel(String),

    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("more than one instruction file given")]
    ExtraFile,

    #[error("an instruction file, or --random with --mi and --mf, is required")]
    MissingSource,

    #[error("help requested")]
    HelpRequested,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub file: Option<PathBuf>,
    pub random: bool,
    pub mi: Option<usize>,
    pub mf: Option<usize>,
    pub steps: usize,
    pub seed: Option<u64>,
    pub alloc_ratio: f64,
    pub policy: FitPolicy,
    pub quiet: bool,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file: None,
            random: false,
            mi: None,
            mf: None,
            steps: DEFAULT_STEPS,
            seed: None,
            alloc_ratio: DEFAULT_ALLOC_RATIO,
            policy: FitPolicy::default(),
            quiet: false,
            log_level: LevelFilter::Info,
        }
    }
}

impl Config {
    /// Parses arguments, program name excluded.
    pub fn from_args<I>(args: I) -> Result<Config, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Err(ConfigError::HelpRequested),
                "--random" => config.random = true,
                "--quiet" | "-q" => config.quiet = true,
                "--mi" => config.mi = Some(number(&arg, args.next())?),
                "--mf" => config.mf = Some(number(&arg, args.next())?),
                "--steps" => config.steps = number(&arg, args.next())?,
                "--seed" => config.seed = Some(number(&arg, args.next())?),
                "--alloc-ratio" => config.alloc_ratio = ratio(&arg, args.next())?,
                "--policy" => {
                    let value = value(&arg, args.next())?;
                    config.policy = parse_policy(&value)?;
                }
                "--log" => {
                    let value = value(&arg, args.next())?;
                    config.log_level = value
                        .parse()
                        .map_err(|_| ConfigError::UnknownLogLevel(value))?;
                }
                option if option.starts_with('-') => {
                    return Err(ConfigError::UnknownOption(arg));
                }
                _ => {
                    if config.file.is_some() {
                        return Err(ConfigError::ExtraFile);
                    }
                    config.file = Some(PathBuf::from(arg));
                }
            }
        }

        let has_bounds = config.mi.is_some() && config.mf.is_some();
        if config.file.is_none() && !(config.random && has_bounds) {
            return Err(ConfigError::MissingSource);
        }

        Ok(config)
    }
}

fn value(flag: &str, next: Option<String>) -> Result<String, ConfigError> {
    next.ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

fn number<N: std::str::FromStr>(flag: &str, next: Option<String>) -> Result<N, ConfigError> {
    let value = value(flag, next)?;
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        flag: flag.to_string(),
        value,
    })
}

/// A probability: finite and within `[0, 1]`.
fn ratio(flag: &str, next: Option<String>) -> Result<f64, ConfigError> {
    let value = value(flag, next)?;
    match value.parse::<f64>() {
        Ok(ratio) if (0.0..=1.0).contains(&ratio) => Ok(ratio),
        _ => Err(ConfigError::InvalidNumber {
            flag: flag.to_string(),
            value,
        }),
    }
}

fn parse_policy(value: &str) -> Result<FitPolicy, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "last-fit" | "last" => Ok(FitPolicy::LastFit),
        "first-fit" | "first" => Ok(FitPolicy::FirstFit),
        _ => Err(ConfigError::UnknownPolicy(value.to_string())),
    }
}
