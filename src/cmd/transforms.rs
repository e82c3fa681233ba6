//! `fabrica transforms`: list the transformation catalogue.

use anyhow::Result;

use fabrica::transform::TransformationRegistry;
use fabrica::ui::{colors, format};

pub fn cmd_transforms() -> Result<()> {
    let registry = TransformationRegistry::with_builtins();
    let entries = registry.entries();
    let name_width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
    let type_width = entries.iter().map(|e| e.type_name.len()).max().unwrap_or(0);

    for entry in entries {
        println!(
            "{}  {}  {}",
            colors::identifier(&format::pad(&entry.name, name_width)),
            colors::secondary(&format::pad(&entry.type_name, type_width)),
            entry.summary
        );
    }
    Ok(())
}
