use std::io::{self, Write};

use log::{info, warn};
use memsim::{Instruction, MemoryError, MemoryManager, Outcome};

use crate::report;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub executed: usize,
    pub allocated: usize,
    pub released: usize,
    pub granted: usize,
    pub failed_allocations: usize,
    pub fragmentation: usize,
    pub not_found: usize,
}

impl Summary {
    fn record(&mut self, outcome: &Result<Outcome, MemoryError>) {
        self.executed += 1;
        match outcome {
            Ok(Outcome::Allocated(_)) => self.allocated += 1,
            Ok(Outcome::Released(released)) => {
                self.released += 1;
                self.granted += released.granted.len();
            }
            Err(MemoryError::Fragmentation { .. }) => {
                self.failed_allocations += 1;
                self.fragmentation += 1;
            }
            Err(MemoryError::NoFreeBlock { .. }) | Err(MemoryError::InvalidSize) => {
                self.failed_allocations += 1
            }
            Err(MemoryError::BlockNotFound { .. }) => self.not_found += 1,
            Err(MemoryError::InvalidInterval { .. }) => {}
        }
    }
}

/// Feeds instructions to one memory manager and reports every step.
pub struct Simulation {
    manager: MemoryManager,
    quiet: bool,
    summary: Summary,
}

impl Simulation {
    pub fn new(manager: MemoryManager, quiet: bool) -> Self {
        Simulation {
            manager,
            quiet,
            summary: Summary::default(),
        }
    }

    pub fn step<W: Write>(&mut self, instruction: Instruction, out: &mut W) -> io::Result<()> {
        let outcome = self.manager.execute(instruction);
        self.summary.record(&outcome);

        match &outcome {
            Err(error @ MemoryError::Fragmentation { .. }) => warn!("{instruction}: {error}"),
            Err(error) => info!("{instruction}: {error}"),
            Ok(_) => {}
        }

        if self.quiet {
            return Ok(());
        }

        report::write_command(out, instruction)?;
        report::write_outcome(out, &outcome)?;
        if matches!(outcome, Err(MemoryError::Fragmentation { .. })) {
            report::write_state(out, &self.manager.snapshot())?;
        }
        writeln!(out)
    }

    pub fn run<W, I>(&mut self, instructions: I, out: &mut W) -> io::Result<&Summary>
    where
        W: Write,
        I: IntoIterator<Item = Instruction>,
    {
        for instruction in instructions {
            self.step(instruction, out)?;
        }
        Ok(&self.summary)
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn manager(&self) -> &MemoryManager {
        &self.manager
    }
}
