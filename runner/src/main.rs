mod config;
mod program;
mod random;
mod report;
mod simulation;

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use log::{debug, error};
use memsim::{Instruction, MemoryManager};
use simple_logger::SimpleLogger;

use config::{Config, ConfigError, USAGE};
use program::{Mode, Program, ProgramError};
use random::RandomInstructions;
use simulation::Simulation;

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error(transparent)]
    Memory(#[from] memsim::MemoryError),

    #[error("bounds are missing, give an instruction file or --mi and --mf")]
    MissingBounds,

    #[error("cannot write report: {0}")]
    Output(#[from] io::Error),
}

fn main() -> ExitCode {
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(ConfigError::HelpRequested) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("{err}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    if let Err(err) = SimpleLogger::new().with_level(config.log_level).init() {
        eprintln!("logger already initialized: {err}");
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), RunError> {
    let program = match &config.file {
        Some(path) => Some(Program::load(path)?),
        None => None,
    };

    let mi = config.mi.or(program.as_ref().map(|p| p.mi));
    let mf = config.mf.or(program.as_ref().map(|p| p.mf));
    let (Some(mi), Some(mf)) = (mi, mf) else {
        return Err(RunError::MissingBounds);
    };

    let manager = MemoryManager::with_policy(mi, mf, config.policy)?;
    let instructions = instructions(config, program, manager.capacity());
    debug!("running {} instructions over [{mi}, {mf})", instructions.len());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut simulation = Simulation::new(manager, config.quiet);
    simulation.run(instructions, &mut out)?;

    let snapshot = simulation.manager().snapshot();
    report::write_state(&mut out, &snapshot)?;
    writeln!(out)?;
    report::write_summary(&mut out, simulation.summary(), &snapshot)?;
    out.flush()?;
    Ok(())
}

fn instructions(config: &Config, program: Option<Program>, capacity: usize) -> Vec<Instruction> {
    let listed = program.filter(|p| p.mode == Mode::Listed && !config.random);
    if let Some(program) = listed {
        return program.instructions;
    }

    let generator = match config.seed {
        Some(seed) => RandomInstructions::new(capacity, seed),
        None => RandomInstructions::from_entropy(capacity),
    };
    generator
        .with_alloc_ratio(config.alloc_ratio)
        .take(config.steps)
        .collect()
}
