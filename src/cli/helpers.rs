//! Shared helper functions for CLI commands.

use std::path::Path;

use chrono::NaiveDate;
use console::Term;
use indicatif::{ProgressBar, ProgressStyle};

/// Highest episode number accepted on the command line.
pub const MAX_EPISODE: u32 = 9999;

const PROBE_FILENAME: &str = "tmp_dest.txt";

/// Create `dir` (with parents) and check it is writable.
pub fn validate_dir(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| anyhow::anyhow!("cannot create folder {}: {}", dir.display(), e))?;
    let probe = dir.join(PROBE_FILENAME);
    std::fs::write(&probe, "Directory is writable").map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => {
            anyhow::anyhow!("folder {} has no 'write' permission", dir.display())
        }
        _ => anyhow::anyhow!("cannot write into {}: {}", dir.display(), e),
    })?;
    std::fs::remove_file(&probe)?;
    Ok(())
}

/// Parse `N`, `N-M`, `N-` or `-M` into an inclusive range.
///
/// Bounds are clamped to `0..=9999`. A reversed range is returned as given.
pub fn parse_episode_range(value: &str) -> Result<(u32, u32), String> {
    let value = value.trim();
    let (start, end) = match value.split_once('-') {
        None => {
            let n = clamp_episode(value)?;
            (n, n)
        }
        Some((start, end)) => {
            let start = if start.trim().is_empty() {
                0
            } else {
                clamp_episode(start)?
            };
            let end = if end.trim().is_empty() {
                MAX_EPISODE
            } else {
                clamp_episode(end)?
            };
            (start, end)
        }
    };
    Ok((start, end))
}

fn clamp_episode(value: &str) -> Result<u32, String> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{value}' is not a valid episode number"));
    }
    // Arbitrarily long digit strings still clamp to the maximum.
    Ok(value.parse::<u32>().map_or(MAX_EPISODE, |n| n.min(MAX_EPISODE)))
}

/// Parse a `YYYY-MM-DD` date option.
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| "date format must be 'YYYY-MM-DD'".to_string())
}

/// Ask a yes/no question on the terminal. Defaults to "no".
pub fn confirm(question: &str) -> bool {
    let term = Term::stdout();
    if term.write_str(&format!("{question} [y/N]: ")).is_err() {
        return false;
    }
    match term.read_line() {
        Ok(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

/// Progress bar over `total` items; hidden in quiet mode.
pub fn progress_bar(total: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Keep the console window open until the operator presses Enter.
pub fn pause_before_exit() {
    let term = Term::stdout();
    if term.write_str("Press 'Enter' key to close 'LEP-downloader'").is_ok() {
        let _ = term.read_line();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_range_forms() {
        assert_eq!(parse_episode_range("42"), Ok((42, 42)));
        assert_eq!(parse_episode_range("700-"), Ok((700, 9999)));
        assert_eq!(parse_episode_range("-10"), Ok((0, 10)));
        assert_eq!(parse_episode_range("5-3"), Ok((5, 3)));
        assert_eq!(parse_episode_range("1-123456789012"), Ok((1, 9999)));
    }

    #[test]
    fn test_episode_range_rejects_garbage() {
        assert!(parse_episode_range("abc").is_err());
        assert!(parse_episode_range("1-x").is_err());
        assert!(parse_episode_range("").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2021-08-03"), Ok(NaiveDate::from_ymd_opt(2021, 8, 3).unwrap()));
        assert!(parse_date("03.08.2021").is_err());
    }

    #[test]
    fn test_validate_dir_creates_parents_and_leaves_no_probe() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        validate_dir(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join(PROBE_FILENAME).exists());
    }
}
