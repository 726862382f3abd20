//! Formats command implementation.

use anyhow::Result;
use quilla_lib::prelude::*;

pub(crate) fn formats() -> Result<()> {
    println!("{:<10} EXTENSION", "FORMAT");
    println!("{}", "-".repeat(22));
    for format in OutputFormat::all() {
        println!("{format:<10} .{}", format.extension());
    }
    Ok(())
}
