//! Streaming JSON output for resolved targets.

use std::io::{self, Write};

use crate::group::Target;

/// Write targets as a prettified JSON array.
pub fn write_json_pretty<'a>(
    targets: impl IntoIterator<Item = &'a Target>,
    mut w: impl Write,
) -> io::Result<()> {
    let targets: Vec<&Target> = targets.into_iter().collect();
    serde_json::to_writer_pretty(&mut w, &targets)?;
    w.write_all(b"\n")
}

/// Write targets as newline-delimited JSON (NDJSON).
pub fn write_ndjson<'a>(
    targets: impl IntoIterator<Item = &'a Target>,
    mut w: impl Write,
) -> io::Result<()> {
    for target in targets {
        serde_json::to_writer(&mut w, target)?;
        w.write_all(b"\n")?;
    }
    Ok(())
}
