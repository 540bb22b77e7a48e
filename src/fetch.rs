//! Test corpus download
//!
//! The corpus is published as a GitHub zipball. Every entry in it sits
//! under a single `<owner>-<repo>-<sha>/` directory; that directory is
//! stripped so the suites land directly in the tests root.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};

use crate::common::{Error, Result};

/// Zipball of the shared test corpus
pub const CORPUS_URL: &str =
    "https://api.github.com/repos/elastic/serverless-clients-tests/zipball/main";

/// Delete everything inside `dir`, keeping the directory itself
fn clear_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Path of a zipball entry below the wrapper directory
///
/// `None` for the wrapper itself.
fn corpus_relative(entry: &Path) -> Option<PathBuf> {
    let mut components = entry.components();
    components.next()?;
    let rest = components.as_path();
    (!rest.as_os_str().is_empty()).then(|| rest.to_path_buf())
}

fn progress(total: Option<u64>) -> Result<ProgressBar> {
    let Some(total) = total.filter(|t| *t > 0) else {
        // GitHub streams zipballs without a length
        let spinner = ProgressBar::new_spinner();
        spinner.set_message("Downloading corpus");
        return Ok(spinner);
    };
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("  [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .map_err(|e| Error::Internal(e.to_string()))?
            .progress_chars("=> "),
    );
    Ok(bar)
}

/// Write every entry of the zipball below `dest`, returning the number of
/// YAML test files
fn unpack(archive: File, dest: &Path) -> Result<usize> {
    let mut zip = zip::ZipArchive::new(archive)
        .map_err(|e| Error::Internal(format!("Corpus archive is not a zip: {}", e)))?;

    let mut suites = 0;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| Error::Internal(format!("Corrupt corpus entry {}: {}", i, e)))?;
        let Some(relative) = entry.enclosed_name().as_deref().and_then(corpus_relative) else {
            continue;
        };
        let target = dest.join(&relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::io::copy(&mut entry, &mut File::create(&target)?)?;

        if relative
            .extension()
            .is_some_and(|ext| ext == "yml" || ext == "yaml")
        {
            suites += 1;
        }
    }
    Ok(suites)
}

/// Replace the contents of `dest` with the corpus at `url`
///
/// Returns the number of YAML test files unpacked.
pub async fn run(dest: &Path, url: &str) -> Result<usize> {
    let response = reqwest::Client::new()
        .get(url)
        .header("User-Agent", "api-conformance")
        .header("Accept", "application/vnd.github+json")
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| Error::Internal(format!("Couldn't download test corpus: {}", e)))?;

    let bar = progress(response.content_length())?;
    let mut archive = tempfile::tempfile()?;
    let mut bytes: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::Internal(format!("Download interrupted: {}", e)))?;
        archive.write_all(&chunk)?;
        bytes += chunk.len() as u64;
        bar.set_position(bytes);
    }
    bar.finish_and_clear();
    tracing::info!(bytes, url, "downloaded test corpus");

    // Only clear once the download succeeded
    clear_dir(dest)?;
    archive.rewind()?;
    let suites = unpack(archive, dest)?;
    tracing::info!(files = suites, dest = %dest.display(), "unpacked test corpus");
    Ok(suites)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zipball() -> File {
        let mut file = tempfile::tempfile().unwrap();
        {
            let mut zip = zip::ZipWriter::new(&mut file);
            let options = zip::write::SimpleFileOptions::default();
            zip.add_directory("elastic-tests-abc123/", options).unwrap();
            zip.add_directory("elastic-tests-abc123/tests/", options).unwrap();
            zip.start_file("elastic-tests-abc123/tests/indices/10_basic.yml", options)
                .unwrap();
            zip.write_all(b"requires: {stack: true}\n").unwrap();
            zip.start_file("elastic-tests-abc123/README.md", options).unwrap();
            zip.write_all(b"# corpus\n").unwrap();
            zip.finish().unwrap();
        }
        file.rewind().unwrap();
        file
    }

    #[test]
    fn test_unpack_strips_wrapper_directory() {
        let dest = tempfile::tempdir().unwrap();
        let count = unpack(zipball(), dest.path()).unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            std::fs::read_to_string(dest.path().join("tests/indices/10_basic.yml")).unwrap(),
            "requires: {stack: true}\n"
        );
        assert!(dest.path().join("README.md").is_file());
        assert!(!dest.path().join("elastic-tests-abc123").exists());
    }

    #[test]
    fn test_corpus_relative() {
        assert_eq!(corpus_relative(Path::new("repo-sha/")), None);
        assert_eq!(
            corpus_relative(Path::new("repo-sha/tests/a.yml")),
            Some(PathBuf::from("tests/a.yml"))
        );
    }

    #[test]
    fn test_clear_dir_keeps_directory() {
        let dest = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dest.path().join("old/tests")).unwrap();
        std::fs::write(dest.path().join("stale.yml"), "").unwrap();
        clear_dir(dest.path()).unwrap();
        assert!(dest.path().is_dir());
        assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_clear_dir_creates_missing() {
        let dest = tempfile::tempdir().unwrap();
        let target = dest.path().join("fresh");
        clear_dir(&target).unwrap();
        assert!(target.is_dir());
    }
}
