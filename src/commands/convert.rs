use crate::args::ConvertArgs;
use crate::shared::lock::LockGuard;
use crate::shared::signal::StopFlag;
use crate::shared::tees::{AnnOptions, Document};
use crate::shared::writer::{FilesystemWriter, OutputWriter, SqliteWriter, database_path};
use crate::shared::xml::DocumentReader;
use anyhow::{Context, Result, bail};
use flate2::read::MultiGzDecoder;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// Public convert command entrypoint.
pub fn run_convert(args: ConvertArgs) -> Result<()> {
    let stop = StopFlag::install_ctrlc()?;
    let written = convert_with_signal(&args, &stop)?;
    info!("Converted {written} document(s)");
    Ok(())
}

// Shared conversion body. The stop flag lets Ctrl-C stop between documents
// while the writer still flushes what was already converted.
pub(crate) fn convert_with_signal(args: &ConvertArgs, stop: &StopFlag) -> Result<usize> {
    let _lock = match &args.lock_file {
        Some(path) => Some(LockGuard::acquire(path)?),
        None => None,
    };

    let mut writer = open_writer(args)?;
    let mut written = 0_usize;
    for file in &args.files {
        if stop.is_stopped() {
            break;
        }
        info!("Processing {}", file.display());
        written += process_file(writer.as_mut(), file, args, stop)
            .with_context(|| format!("converting {} failed", file.display()))?;
    }
    writer.finish()?;

    if stop.is_stopped() {
        bail!("interrupted after {written} document(s)");
    }
    Ok(written)
}

fn open_writer(args: &ConvertArgs) -> Result<Box<dyn OutputWriter>> {
    if args.database {
        let path = database_path(&args.output);
        debug!("Writing database {}", path.display());
        Ok(Box::new(SqliteWriter::create(&path)?))
    } else {
        debug!("Writing files under {}", args.output.display());
        Ok(Box::new(FilesystemWriter::new(&args.output)))
    }
}

// Open an input, transparently decompressing `.gz` files.
fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file =
        File::open(path).with_context(|| format!("opening input failed: {}", path.display()))?;
    if path.extension() == Some(OsStr::new("gz")) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

// Convert up to `args.limit` documents from one input; the limit applies per file.
fn process_file(
    writer: &mut dyn OutputWriter,
    path: &Path,
    args: &ConvertArgs,
    stop: &StopFlag,
) -> Result<usize> {
    let options = AnnOptions {
        retype: args.retype,
        no_tokens: args.no_tokens,
        no_deps: args.no_deps,
    };

    let mut count = 0_usize;
    for element in DocumentReader::new(open_input(path)?) {
        if count >= args.limit || stop.is_stopped() {
            break;
        }
        let element = element?;
        if let Some(ids) = &args.ids {
            let orig_id = element.attr("origId").unwrap_or_default();
            if !ids.iter().any(|id| id == orig_id) {
                continue;
            }
        }

        let document = Document::from_xml(&element)?;
        write_document(writer, &document, args, options)?;
        debug!("Wrote document {}", document.orig_id);
        count += 1;
    }
    Ok(count)
}

fn write_document(
    writer: &mut dyn OutputWriter,
    document: &Document,
    args: &ConvertArgs,
    options: AnnOptions,
) -> Result<()> {
    let doc_dir = document_dir(&document.orig_id, args.dir_prefix);

    if args.sentences {
        for sentence in &document.sentences {
            let stem = format!("{}-{}", document.orig_id, sentence.id);
            let mut ann = String::new();
            sentence
                .write_annotations(&mut ann, 0, options)
                .with_context(|| format!("in sentence {}", sentence.id))?;
            writer.write(&doc_dir.join(format!("{stem}.txt")), &format!("{}\n", sentence.text))?;
            writer.write(&doc_dir.join(format!("{stem}.ann")), &ann)?;
        }
        return Ok(());
    }

    let mut ann = String::new();
    for sentence in &document.sentences {
        sentence
            .write_annotations(&mut ann, sentence.span.start, options)
            .with_context(|| format!("in sentence {}", sentence.id))?;
    }
    let stem = &document.orig_id;
    writer.write(&doc_dir.join(format!("{stem}.txt")), &format!("{}\n", document.text))?;
    writer.write(&doc_dir.join(format!("{stem}.ann")), &ann)?;
    Ok(())
}

// Relative directory for a document: empty, or the first `prefix` characters of its id.
fn document_dir(doc_id: &str, prefix: Option<usize>) -> PathBuf {
    match prefix {
        Some(len) => PathBuf::from(doc_id.chars().take(len).collect::<String>()),
        None => PathBuf::new(),
    }
}
