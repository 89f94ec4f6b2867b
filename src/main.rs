//! Command-line front end.
//!
//! Lists or extracts entries from a local or remote ZIP archive. Remote
//! archives are never downloaded whole: listing reads the trailer and
//! directory, extraction fetches the selected entries in one multi-range
//! request.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tokio::io::AsyncWriteExt;

use rangezip::{
    Cli, EntryCache, FileSource, HttpSource, MemoryCache, RangeSource, ZipReader,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.is_http_url() {
        let source = HttpSource::new(cli.file.clone()).await?;
        let reader = ZipReader::open(source, MemoryCache::new()).await?;

        process_zip(&reader, &cli).await?;

        if !cli.is_quiet() {
            let source = reader.source();
            eprintln!(
                "\n{} range requests, {} transferred",
                source.request_count(),
                human_bytes(source.transferred_bytes())
            );
        }
        reader.close().await?;
    } else {
        let source = FileSource::open(Path::new(&cli.file))?;
        let reader = ZipReader::open(source, MemoryCache::new()).await?;
        process_zip(&reader, &cli).await?;
        reader.close().await?;
    }

    Ok(())
}

/// List or extract according to the CLI flags.
async fn process_zip<S: RangeSource, C: EntryCache>(
    reader: &ZipReader<S, C>,
    cli: &Cli,
) -> Result<()> {
    if cli.list || cli.verbose {
        return list_files(reader, cli.verbose);
    }

    // Pick the entries to extract: directories never, explicit names or
    // globs when given, exclusions last.
    let mut names: Vec<String> = reader.files();
    names.sort();
    let selected: Vec<String> = names
        .into_iter()
        .filter(|name| {
            if name.ends_with('/') {
                return false;
            }
            if !cli.files.is_empty() && !cli.files.iter().any(|p| pattern_matches(p, name)) {
                return false;
            }
            !cli.exclude.iter().any(|p| pattern_matches(p, name))
        })
        .collect();

    if selected.is_empty() {
        if !cli.is_quiet() {
            eprintln!("nothing to extract");
        }
        return Ok(());
    }

    // One bulk fetch for everything selected, then drain the streams.
    let selected_refs: Vec<&str> = selected.iter().map(String::as_str).collect();
    let streams = reader.file_streams(&selected_refs).await?;
    let multiple = cli.pipe && streams.len() > 1;

    for (name, mut stream) in streams {
        let mut contents = Vec::new();
        stream.read_to_end(&mut contents)?;

        if cli.pipe {
            let mut stdout = tokio::io::stdout();
            if multiple {
                stdout
                    .write_all(format!("--- {name} ---\n").as_bytes())
                    .await?;
            }
            stdout.write_all(&contents).await?;
            continue;
        }

        let output_path = match &cli.extract_dir {
            Some(dir) => PathBuf::from(dir).join(&name),
            None => PathBuf::from(&name),
        };
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        if !cli.is_quiet() {
            println!("  extracting: {name}");
        }
        tokio::fs::write(&output_path, &contents).await?;
    }

    Ok(())
}

/// Print the archive listing, short or as a table.
fn list_files<S: RangeSource, C: EntryCache>(reader: &ZipReader<S, C>, verbose: bool) -> Result<()> {
    let mut names = reader.files();
    names.sort();

    if !verbose {
        for name in names {
            println!("{name}");
        }
        return Ok(());
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:>16}  Name",
        "Length", "Size", "Cmpr", "Modified"
    );
    println!("{}", "-".repeat(70));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for name in &names {
        let meta = reader.file_metadata(name)?;
        println!(
            "{:>10}  {:>10}  {}  {}  {}",
            meta.uncompressed_size,
            meta.compressed_size,
            ratio(meta.compressed_size, meta.uncompressed_size),
            meta.last_modified.format("%Y-%m-%d %H:%M"),
            meta.name
        );
        if !name.ends_with('/') {
            total_uncompressed += meta.uncompressed_size;
            total_compressed += meta.compressed_size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {}  {:>16}  {} files",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        file_count
    );
    Ok(())
}

/// Percentage saved by compression, right-aligned.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 {
        return "   0%".to_string();
    }
    format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
}

/// Match `name` against `pattern`: exact path, exact basename, or a glob
/// with `*` (any run) and `?` (any one byte).
fn pattern_matches(pattern: &str, name: &str) -> bool {
    if pattern.contains(['*', '?']) {
        return glob_match(pattern, name);
    }
    let basename = name.rsplit('/').next().unwrap_or(name);
    pattern == name || pattern == basename
}

/// Iterative wildcard match. A `*` records a backtrack point; on a
/// mismatch the match resumes there with the star absorbing one more
/// byte, so no recursion is needed.
fn glob_match(pattern: &str, text: &str) -> bool {
    let (pat, txt) = (pattern.as_bytes(), text.as_bytes());
    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while t < txt.len() {
        if p < pat.len() && (pat[p] == b'?' || pat[p] == txt[t]) {
            p += 1;
            t += 1;
        } else if p < pat.len() && pat[p] == b'*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }
    // Only trailing stars may remain unconsumed.
    pat[p..].iter().all(|&b| b == b'*')
}

/// Render a transfer byte count for the stats line.
fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_wildcards() {
        assert!(pattern_matches("*.txt", "readme.txt"));
        assert!(pattern_matches("folder/*.txt", "folder/lipsum.txt"));
        assert!(pattern_matches("file?.dat", "file1.dat"));
        assert!(!pattern_matches("*.txt", "readme.md"));
    }

    #[test]
    fn glob_backtracks_across_multiple_stars() {
        assert!(glob_match("*lip*.txt", "folder/lipsum.txt"));
        assert!(glob_match("a*b*c", "axxbxxc"));
        assert!(!glob_match("a*b*c", "axxbxx"));
        assert!(glob_match("**", "anything"));
        assert!(glob_match("*", ""));
        assert!(!glob_match("?", ""));
    }

    #[test]
    fn exact_patterns_match_path_or_basename() {
        assert!(pattern_matches("folder/lipsum.txt", "folder/lipsum.txt"));
        assert!(pattern_matches("lipsum.txt", "folder/lipsum.txt"));
        assert!(!pattern_matches("lorem.txt", "folder/lipsum.txt"));
    }

    #[test]
    fn byte_counts_format_with_binary_units() {
        assert_eq!(human_bytes(0), "0 B");
        assert_eq!(human_bytes(500), "500 B");
        assert_eq!(human_bytes(1536), "1.5 KiB");
        assert_eq!(human_bytes(1048576), "1.0 MiB");
        assert_eq!(human_bytes(5 * 1024 * 1024 * 1024), "5.0 GiB");
    }
}
