//! Keyed storage of generated CFF designs.
//!
//! Designs are keyed by (d, t, n). The persisted format is the historical
//! one: t lines of whitespace-separated block indices, one test per line,
//! in a file named `{d}-CFF({t}, {n}).txt`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::design::CffDesign;
use crate::error::{CffError, Result};

/// Injected capability for looking up and persisting designs.
///
/// Opened read-mostly: `get` at sign and verify time, `put` only when a
/// design had to be constructed.
pub trait DesignRepository {
    /// Look up the group table of a stored design, if present.
    fn get(&self, d: u32, t: u32, n: u32) -> Result<Option<Vec<Vec<u32>>>>;

    /// Persist a design for future lookups.
    fn put(&self, design: &CffDesign) -> Result<()>;
}

/// Filesystem-backed design repository.
#[derive(Debug, Clone)]
pub struct FsDesignRepository {
    dir: PathBuf,
}

impl FsDesignRepository {
    /// Create a repository rooted at `dir`. The directory is created lazily
    /// on the first `put`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, d: u32, t: u32, n: u32) -> PathBuf {
        self.dir.join(format!("{d}-CFF({t}, {n}).txt"))
    }
}

impl DesignRepository for FsDesignRepository {
    fn get(&self, d: u32, t: u32, n: u32) -> Result<Option<Vec<Vec<u32>>>> {
        let path = self.entry_path(d, t, n);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let groups = parse_groups(&content, &path)?;
        if groups.len() != t as usize {
            return Err(CffError::MalformedDesign(format!(
                "{} holds {} tests, expected {t}",
                path.display(),
                groups.len()
            )));
        }
        debug!(path = %path.display(), "CFF design file read");
        Ok(Some(groups))
    }

    fn put(&self, design: &CffDesign) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(design.d, design.t, design.n);
        let mut content = String::new();
        for group in design.groups() {
            let line: Vec<String> = group.iter().map(u32::to_string).collect();
            content.push_str(&line.join(" "));
            content.push('\n');
        }
        fs::write(&path, content)?;
        debug!(path = %path.display(), "CFF design file written");
        Ok(())
    }
}

fn parse_groups(content: &str, path: &Path) -> Result<Vec<Vec<u32>>> {
    let mut groups = Vec::new();
    for (line_number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut group = Vec::new();
        for token in line.split_whitespace() {
            let index: u32 = token.parse().map_err(|_| {
                CffError::MalformedDesign(format!(
                    "{}:{}: '{token}' is not a block index",
                    path.display(),
                    line_number + 1
                ))
            })?;
            group.push(index);
        }
        groups.push(group);
    }
    Ok(groups)
}

/// In-memory design repository, for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryDesignRepository {
    entries: Mutex<HashMap<(u32, u32, u32), Vec<Vec<u32>>>>,
}

impl MemoryDesignRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DesignRepository for MemoryDesignRepository {
    fn get(&self, d: u32, t: u32, n: u32) -> Result<Option<Vec<Vec<u32>>>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(&(d, t, n)).cloned())
    }

    fn put(&self, design: &CffDesign) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert((design.d, design.t, design.n), design.groups().to_vec());
        Ok(())
    }
}
