use crate::args::{ExampleArgs, OutputMode};
use crate::shared::writer::database_path;
use anyhow::{Context, Result, bail};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

// Sample input and output locations, relative to the repository root.
const SAMPLE_INPUT: &str = "demos/medline15n0572-s10.xml";
const SAMPLE_OUTPUT: &str = "example-output";

// Public example command entrypoint.
// Runs the converter once over the bundled sample and reports where the output went.
pub fn run_example(args: ExampleArgs) -> Result<()> {
    let layout = ExampleLayout::resolve(args.root.as_deref())?;
    debug!("Repository root {}", layout.root.display());
    let reported = run_sample_conversion(&layout, args.mode, args.converter.as_deref())?;
    eprintln!("Done. Converted {}", layout.input.display());
    eprintln!("Output in {}", reported.display());
    Ok(())
}

// Fixed input/output paths, anchored at the repository root rather than the caller's cwd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExampleLayout {
    pub root: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ExampleLayout {
    pub(crate) fn resolve(root: Option<&Path>) -> Result<Self> {
        let root = root.unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")));
        let root = root
            .canonicalize()
            .with_context(|| format!("resolving repository root failed: {}", root.display()))?;
        Ok(Self {
            input: root.join(SAMPLE_INPUT),
            output: root.join(SAMPLE_OUTPUT),
            root,
        })
    }
}

// Invoke the converter for one mode and return the location it wrote to.
pub(crate) fn run_sample_conversion(
    layout: &ExampleLayout,
    mode: OutputMode,
    converter: Option<&Path>,
) -> Result<PathBuf> {
    let mut cmd = converter_command(converter)?;
    cmd.arg(&layout.input).arg("-o").arg(&layout.output);

    let reported = match mode {
        OutputMode::Db => {
            cmd.arg("-D");
            database_path(&layout.output)
        }
        OutputMode::Fs => {
            // Never hand the converter a missing input in directory mode.
            fs::metadata(&layout.input).with_context(|| {
                format!("sample input not found: {}", layout.input.display())
            })?;
            fs::create_dir_all(&layout.output).with_context(|| {
                format!(
                    "creating output directory failed: {}",
                    layout.output.display()
                )
            })?;
            layout.output.clone()
        }
    };

    info!("Converting {} ({mode:?} mode)", layout.input.display());
    run_inherited_command(&mut cmd, "converter")?;
    Ok(reported)
}

// Without an explicit converter, re-enter this executable's `convert` subcommand.
fn converter_command(converter: Option<&Path>) -> Result<Command> {
    if let Some(path) = converter {
        return Ok(Command::new(path));
    }
    let exe = env::current_exe().context("locating current executable failed")?;
    let mut cmd = Command::new(exe);
    cmd.arg("convert");
    Ok(cmd)
}

// Run an external command with inherited stdio; any non-zero exit is fatal.
fn run_inherited_command(cmd: &mut Command, label: &str) -> Result<()> {
    let rendered = format!("{cmd:?}");
    debug!("Running {rendered}");
    let status = cmd
        .status()
        .with_context(|| format!("spawning command failed for {label}: {rendered}"))?;

    if !status.success() {
        bail!("{label} failed with status {status}: {rendered}");
    }
    Ok(())
}
