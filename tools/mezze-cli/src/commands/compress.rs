//! Write precompressed siblings for static assets.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use mezze_cache::{precompress, ContentEncoding};
use serde::Serialize;

use super::CompressArgs;
use crate::context::Context;
use crate::output::{format_bytes, savings_percent};

/// Text formats worth precompressing. Images and fonts are already compressed.
const COMPRESSIBLE_EXTENSIONS: [&str; 9] =
    ["html", "css", "js", "mjs", "json", "xml", "svg", "txt", "map"];

const ENCODINGS: [ContentEncoding; 2] = [ContentEncoding::Brotli, ContentEncoding::Gzip];

#[derive(Debug, Default, Serialize)]
struct CompressSummary {
    scanned: usize,
    written: usize,
    original_bytes: u64,
    brotli_bytes: u64,
}

/// Run the compress command.
pub async fn run(args: CompressArgs, ctx: &Context) -> Result<()> {
    let dir = ctx.resolve_path(args.dir.as_deref().unwrap_or(&ctx.config.build.public_dir));
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }

    ctx.output.header("Precompressing assets");
    let mut files = Vec::new();
    collect_files(&dir, &mut files)?;
    files.retain(|path| is_compressible(path));
    files.sort();
    ctx.output.debug(&format!("{} candidate files", files.len()));

    let pb = ctx.output.progress(files.len() as u64, "compressing");
    let mut summary = CompressSummary::default();

    for path in &files {
        pb.set_message(
            path.strip_prefix(&dir)
                .unwrap_or(path)
                .display()
                .to_string(),
        );
        let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        summary.scanned += 1;

        for encoding in ENCODINGS {
            let Some(compressed) = precompress(&data, encoding)? else {
                continue;
            };
            if encoding == ContentEncoding::Brotli {
                summary.original_bytes += data.len() as u64;
                summary.brotli_bytes += compressed.len() as u64;
            }
            if !args.dry_run {
                let sibling = sibling_path(path, encoding);
                fs::write(&sibling, &compressed)
                    .with_context(|| format!("Failed to write {}", sibling.display()))?;
            }
            summary.written += 1;
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if ctx.output.is_json() {
        ctx.output.json(&summary);
        return Ok(());
    }

    let verb = if args.dry_run { "Would write" } else { "Wrote" };
    ctx.output.success(&format!(
        "{} {} variants for {} files",
        verb, summary.written, summary.scanned
    ));
    if summary.original_bytes > 0 {
        ctx.output.kv(
            "brotli",
            &format!(
                "{} -> {} ({:.1}% smaller)",
                format_bytes(summary.original_bytes),
                format_bytes(summary.brotli_bytes),
                savings_percent(summary.original_bytes, summary.brotli_bytes)
            ),
        );
    }

    Ok(())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn is_compressible(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| COMPRESSIBLE_EXTENSIONS.contains(&ext.as_str()))
}

fn sibling_path(path: &Path, encoding: ContentEncoding) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    if let Some(ext) = encoding.file_extension() {
        name.push(".");
        name.push(ext);
    }
    PathBuf::from(name)
}
