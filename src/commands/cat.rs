use crate::args::CatArgs;
use crate::shared::writer::{open_database, read_entries, read_value};
use anyhow::{Context, Result, anyhow};
use std::io::{self, Write};

// Public cat command entrypoint: print stored values, optionally headed by their keys.
pub fn run_cat(args: CatArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    print_values(&args, &mut out)?;
    out.flush().context("flushing stdout failed")
}

pub(crate) fn print_values(args: &CatArgs, out: &mut impl Write) -> Result<()> {
    let conn = open_database(&args.database)?;

    let entries = if args.keys.is_empty() {
        read_entries(&conn)?
    } else {
        args.keys
            .iter()
            .map(|key| -> Result<(String, String)> {
                let value = read_value(&conn, key)?.ok_or_else(|| {
                    anyhow!("key not found in {}: {key}", args.database.display())
                })?;
                Ok((key.clone(), value))
            })
            .collect::<Result<Vec<_>>>()?
    };

    for (key, value) in entries {
        if args.show_keys {
            writeln!(out, "==> {key} <==")?;
        }
        writeln!(out, "{value}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::writer::{OutputWriter, SqliteWriter};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn database(dir: &Path) -> PathBuf {
        let path = dir.join("out.sqlite");
        let mut writer: Box<dyn OutputWriter> = Box::new(SqliteWriter::create(&path).unwrap());
        writer.write(Path::new("1.txt"), "first").unwrap();
        writer.write(Path::new("1.ann"), "T1\tche 0 7\tAspirin").unwrap();
        writer.finish().unwrap();
        path
    }

    fn cat(database: PathBuf, show_keys: bool, keys: &[&str]) -> Result<String> {
        let args = CatArgs {
            show_keys,
            database,
            keys: keys.iter().map(|k| k.to_string()).collect(),
        };
        let mut out = Vec::new();
        print_values(&args, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn prints_all_values_without_keys() {
        let dir = TempDir::new().unwrap();
        let out = cat(database(dir.path()), false, &[]).unwrap();
        assert_eq!(out, "first\nT1\tche 0 7\tAspirin\n");
    }

    #[test]
    fn selected_keys_with_headers() {
        let dir = TempDir::new().unwrap();
        let out = cat(database(dir.path()), true, &["1.ann", "1.txt"]).unwrap();
        assert_eq!(
            out,
            "==> 1.ann <==\nT1\tche 0 7\tAspirin\n==> 1.txt <==\nfirst\n"
        );
    }

    #[test]
    fn unknown_key_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = cat(database(dir.path()), false, &["2.txt"]).unwrap_err();
        assert!(err.to_string().contains("key not found"));
    }
}
