use crate::args::LsArgs;
use crate::shared::writer::{open_database, read_keys};
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;

// Public ls command entrypoint: print every stored key, one per line.
pub fn run_ls(args: LsArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for database in &args.databases {
        list_keys(database, &mut out)?;
    }
    out.flush().context("flushing stdout failed")
}

pub(crate) fn list_keys(database: &Path, out: &mut impl Write) -> Result<()> {
    let conn = open_database(database)?;
    for key in read_keys(&conn).with_context(|| format!("listing {}", database.display()))? {
        writeln!(out, "{key}").context("writing key failed")?;
    }
    Ok(())
}
