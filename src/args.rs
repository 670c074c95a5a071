use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

// CLI root definition. This is the single entrypoint for all supported modes.
#[derive(Parser, Debug)]
#[command(name = "tees-convert", version)]
#[command(about = "Convert TEES XML into brat standoff files or a SQLite store")]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: AppCommand,
}

// Subcommands map directly to one module each under src/commands/.
#[derive(Subcommand, Debug)]
pub enum AppCommand {
    /// Convert TEES XML files to standoff .txt/.ann output
    Convert(ConvertArgs),
    /// Run the converter on the bundled sample document
    Example(ExampleArgs),
    /// List keys in converter database files
    Ls(LsArgs),
    /// Print values stored in a converter database file
    Cat(CatArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Input TEES XML files (.gz is decompressed)
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,
    /// Only output documents with the given origIds
    #[arg(short, long, value_name = "ID[,ID ...]", value_delimiter = ',')]
    pub ids: Option<Vec<String>>,
    /// Maximum number of documents to process
    #[arg(short, long, default_value_t = 100)]
    pub limit: usize,
    /// Output directory, or database path with --database
    #[arg(short, long = "output-dir", default_value = "converted")]
    pub output: PathBuf,
    /// Add a subdirectory named by this many leading characters of the document id
    #[arg(short = 'P', long, value_name = "LEN")]
    pub dir_prefix: Option<usize>,
    /// Output one sentence per file
    #[arg(short, long, default_value_t = false)]
    pub sentences: bool,
    /// Do not output dependencies
    #[arg(short = 'd', long, default_value_t = false)]
    pub no_deps: bool,
    /// Do not output tokens (implies --no-deps)
    #[arg(short = 't', long, default_value_t = false)]
    pub no_tokens: bool,
    /// Rename entity types (e.g. "dis" -> "Disease")
    #[arg(short = 'T', long, default_value_t = false)]
    pub retype: bool,
    /// Write a single SQLite database instead of a directory tree
    #[arg(short = 'D', long, default_value_t = false)]
    pub database: bool,
    /// Hold an exclusive lock on this file while converting
    #[arg(long)]
    pub lock_file: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Single SQLite file (`-D`)
    Db,
    /// Directory of .txt/.ann files
    Fs,
}

#[derive(Args, Debug, Clone)]
pub struct ExampleArgs {
    #[arg(long, value_enum, default_value_t = OutputMode::Fs)]
    pub mode: OutputMode,
    /// Repository root holding the sample input; defaults to the build directory
    #[arg(long, env = "TEES_CONVERT_ROOT")]
    pub root: Option<PathBuf>,
    /// External converter taking `<input> -o <output> [-D]`; defaults to this binary
    #[arg(long)]
    pub converter: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct LsArgs {
    #[arg(value_name = "DB", required = true)]
    pub databases: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CatArgs {
    /// Include keys in output
    #[arg(short = 'k', long = "showkeys", default_value_t = false)]
    pub show_keys: bool,
    #[arg(value_name = "DB")]
    pub database: PathBuf,
    /// Keys to look up; all values are printed when omitted
    #[arg(value_name = "KEY")]
    pub keys: Vec<String>,
}
