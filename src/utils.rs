// ABOUTME: Utility functions for locating plan files and deriving output paths
// ABOUTME: Provides newest-file discovery, dated file names, and path validation

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const WITH_UPDATES: &str = "_with_updates";

/// Find the most recently modified file in `folder` whose name starts with
/// `prefix` and ends with `suffix`.
///
/// Files directly in `folder` are searched first. Only when none match are
/// subdirectories searched recursively.
///
/// # Arguments
///
/// * `folder` - Directory to search
/// * `prefix` - Required file name prefix, e.g. `am_program_plan_`
/// * `suffix` - Required file name suffix, e.g. `.xlsx`
///
/// # Returns
///
/// Path of the newest matching file.
///
/// # Errors
///
/// Returns an error if the folder cannot be read or no file matches.
pub fn find_most_recent_file(folder: &Path, prefix: &str, suffix: &str) -> Result<PathBuf> {
    find_most_recent_by(folder, &format!("{}*{}", prefix, suffix), |name| {
        name.starts_with(prefix) && name.ends_with(suffix)
    })
}

/// Like `find_most_recent_file`, but ignores derived `_with_updates` copies.
pub fn find_most_recent_source(folder: &Path, prefix: &str, suffix: &str) -> Result<PathBuf> {
    find_most_recent_by(folder, &format!("{}*{}", prefix, suffix), |name| {
        name.starts_with(prefix) && name.ends_with(suffix) && !name.contains(WITH_UPDATES)
    })
}

fn find_most_recent_by(
    folder: &Path,
    pattern: &str,
    matches: impl Fn(&str) -> bool + Copy,
) -> Result<PathBuf> {
    if !folder.is_dir() {
        bail!("Folder not found: {}", folder.display());
    }

    let mut candidates = Vec::new();
    collect_matching(folder, matches, false, &mut candidates)?;
    if candidates.is_empty() {
        tracing::debug!(
            "No '{}' file directly in {}, searching subfolders",
            pattern,
            folder.display()
        );
        collect_matching(folder, matches, true, &mut candidates)?;
    }

    let newest = candidates
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
        .map(|(path, _)| path);

    match newest {
        Some(path) => {
            tracing::info!("Using most recent file: {}", path.display());
            Ok(path)
        }
        None => bail!(
            "No file matching '{}' found in {}",
            pattern,
            folder.display()
        ),
    }
}

fn collect_matching(
    dir: &Path,
    matches: impl Fn(&str) -> bool + Copy,
    recursive: bool,
    out: &mut Vec<(PathBuf, SystemTime)>,
) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read folder {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to read metadata for {}", path.display()))?;

        if metadata.is_dir() {
            if recursive {
                collect_matching(&path, matches, true, out)?;
            }
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        // Office lock files look like "~$name.xlsx"
        if name.starts_with("~$") {
            continue;
        }
        if matches(&name) {
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            out.push((path, modified));
        }
    }
    Ok(())
}

/// File name of the form `<prefix>YYYY_MM_DD<extension>`.
pub fn dated_file_name(prefix: &str, date: NaiveDate, extension: &str) -> String {
    format!("{}{}{}", prefix, date.format("%Y_%m_%d"), extension)
}

/// Sibling path with `_with_updates` appended to the file stem.
///
/// `plan_2025_01_02.xlsx` becomes `plan_2025_01_02_with_updates.xlsx`.
pub fn with_updates_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, WITH_UPDATES, ext.to_string_lossy()),
        None => format!("{}{}", stem, WITH_UPDATES),
    };
    path.with_file_name(name)
}

/// Ensure an output path does not overwrite its input.
pub fn validate_distinct_paths(input: &Path, output: &Path) -> Result<()> {
    let same = match (input.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    };
    if same {
        bail!(
            "Input and output point to the same file: {}\n\
             Choose a different output path so the input plan is preserved.",
            input.display()
        );
    }
    Ok(())
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
