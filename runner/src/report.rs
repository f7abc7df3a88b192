use std::io::{self, Write};

use memsim::{Instruction, MemoryError, Outcome, Snapshot};

use crate::simulation::Summary;

pub fn write_command<W: Write>(out: &mut W, instruction: Instruction) -> io::Result<()> {
    writeln!(out, "Command: {instruction}")
}

pub fn write_outcome<W: Write>(
    out: &mut W,
    outcome: &Result<Outcome, MemoryError>,
) -> io::Result<()> {
    match outcome {
        Ok(Outcome::Allocated(block)) => writeln!(
            out,
            "Allocated block {} at {}-{}",
            block.id, block.start, block.end
        ),
        Ok(Outcome::Released(released)) => {
            let block = released.block;
            writeln!(
                out,
                "Released block {} at {}-{}",
                block.id, block.start, block.end
            )?;
            for granted in &released.granted {
                writeln!(
                    out,
                    "Pending request {} granted at {}-{}",
                    granted.id, granted.start, granted.end
                )?;
            }
            Ok(())
        }
        Err(error) if error.is_queued() => writeln!(out, "{error}, request pending"),
        Err(error) => writeln!(out, "{error}"),
    }
}

/// Memory map, pending requests and free byte count.
pub fn write_state<W: Write>(out: &mut W, snapshot: &Snapshot) -> io::Result<()> {
    writeln!(out, "Memory state:")?;
    for region in snapshot.regions.iter() {
        writeln!(out, "{region}")?;
    }

    if snapshot.pending.is_empty() {
        writeln!(out, "Pending: none")?;
    } else {
        let pending: Vec<_> = snapshot
            .pending
            .iter()
            .map(|request| format!("({}, {})", request.id, request.size))
            .collect();
        writeln!(out, "Pending: {}", pending.join(", "))?;
    }

    writeln!(out, "Free bytes: {}", snapshot.free_bytes)
}

pub fn write_summary<W: Write>(
    out: &mut W,
    summary: &Summary,
    snapshot: &Snapshot,
) -> io::Result<()> {
    writeln!(out, "Instructions: {}", summary.executed)?;
    writeln!(
        out,
        "Allocated: {}, released: {}, granted from pending: {}",
        summary.allocated, summary.released, summary.granted
    )?;
    writeln!(
        out,
        "Failed allocations: {} ({} fragmentation), unknown releases: {}",
        summary.failed_allocations, summary.fragmentation, summary.not_found
    )?;
    writeln!(
        out,
        "Allocated bytes: {}, free regions: {}, largest free: {}",
        snapshot.allocated_bytes(),
        snapshot.free_region_count(),
        snapshot.largest_free()
    )?;
    writeln!(
        out,
        "Fragmentation: {:.1}%",
        snapshot.fragmentation() * 100.0
    )
}
