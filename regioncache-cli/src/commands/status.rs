//! `regioncache status`: cache root, lock state, and region files.

use regioncache::config::format_size;
use regioncache::manager::{is_locked, DiskFormat, RegionFiles};
use std::fmt::Write as _;

use super::common::CacheLocation;
use crate::error::CliError;

/// Region files grouped by format, plus lock state.
#[derive(Debug)]
pub struct StatusReport {
    pub location: CacheLocation,
    pub locked: bool,
    pub files: Vec<RegionFiles>,
}

impl StatusReport {
    pub fn collect(location: CacheLocation) -> Result<Self, CliError> {
        let locked = is_locked(&location.root);
        let files = location.scan()?;
        Ok(Self {
            location,
            locked,
            files,
        })
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(RegionFiles::total_bytes).sum()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Cache root: {}", self.location.root.display());
        let _ = writeln!(
            out,
            "Lock:       {}",
            if self.locked { "held by another process" } else { "free" }
        );
        let _ = writeln!(out, "Regions in: {}", self.location.region_dir.display());

        for format in DiskFormat::all() {
            let regions: Vec<_> = self.files.iter().filter(|f| f.format == format).collect();
            if regions.is_empty() {
                continue;
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "{} format ({}):", format, format.suffix());
            for files in regions {
                let _ = write!(
                    out,
                    "  {:<24} {:>10}  {}",
                    files.region,
                    format_size(files.total_bytes()),
                    files.directory.display()
                );
                if files.is_incomplete() {
                    let _ = write!(out, "  (incomplete)");
                }
                let _ = writeln!(out);
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Total: {} region files, {}",
            self.files.len(),
            format_size(self.total_bytes())
        );
        out
    }
}

pub fn run(location: CacheLocation) -> Result<(), CliError> {
    let report = StatusReport::collect(location)?;
    print!("{}", report.render());
    Ok(())
}
