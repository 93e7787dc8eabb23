//! Config command for showing the effective configuration.

use std::io::Write;

use anyhow::{Context, Result};

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(config).context("failed to render configuration")?;
    writeln!(writer, "{rendered}")?;

    if let Err(err) = config.engagement.validate() {
        writeln!(writer, "warning: {err}")?;
    }
    Ok(())
}
