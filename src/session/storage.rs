use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;

use super::types::{GradeSheet, SHEET_VERSION};
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind};

/// Turn a scope key such as `thesis-2026/Alice` into a file stem.
///
/// Lowercase ASCII letters, digits, `-` and `_` are kept; every other byte is
/// percent-encoded (`thesis-2026%2F%41lice`). Distinct keys never share a
/// stem, also on case-insensitive filesystems.
pub fn sheet_file_stem(scope_key: &str) -> String {
    let mut stem = String::with_capacity(scope_key.len());
    for byte in scope_key.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' || byte == b'_' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{:02X}", byte));
        }
    }
    stem
}

/// File-backed grade sheets, one JSON file per scope.
///
/// Every successful save is published on the store's [`ChangeFeed`].
#[derive(Debug)]
pub struct GradeStore {
    root: PathBuf,
    feed: ChangeFeed,
}

impl GradeStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            feed: ChangeFeed::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn feed_mut(&mut self) -> &mut ChangeFeed {
        &mut self.feed
    }

    pub fn sheet_path(&self, scope_key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sheet_file_stem(scope_key)))
    }

    /// Load the sheet for a scope. A missing file means nothing was saved yet.
    ///
    /// A file holding a different scope's sheet is an error.
    pub fn load(&self, scope_key: &str) -> Result<Option<GradeSheet>> {
        check_scope_key(scope_key)?;
        let path = self.sheet_path(scope_key);
        if !path.exists() {
            return Ok(None);
        }

        let sheet = read_sheet(&path)?;
        if sheet.scope_key != scope_key {
            anyhow::bail!(
                "Grade sheet at {} belongs to scope '{}', not '{}'",
                path.display(),
                sheet.scope_key,
                scope_key
            );
        }
        Ok(Some(sheet))
    }

    /// Save a sheet atomically and notify subscribers
    pub fn save(&mut self, sheet: &GradeSheet) -> Result<()> {
        check_scope_key(&sheet.scope_key)?;
        fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create grades directory at {}", self.root.display())
        })?;

        let path = self.sheet_path(&sheet.scope_key);
        let mut file = AtomicWriteFile::open(&path)
            .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
        serde_json::to_writer_pretty(&mut file, sheet).context("Failed to serialize grade sheet")?;
        file.commit().context("Failed to save grade sheet")?;

        tracing::info!(
            scope = %sheet.scope_key,
            records = sheet.records.len(),
            path = %path.display(),
            "grade sheet saved"
        );

        let kind = if sheet.is_locked() {
            ChangeKind::Finalized
        } else {
            ChangeKind::Saved {
                records: sheet.records.len(),
            }
        };
        self.feed.publish(&ChangeEvent::new(sheet.scope_key.clone(), kind));
        Ok(())
    }

    /// All saved sheets, sorted by scope key. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<GradeSheet>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let dir = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read grades directory {}", self.root.display()))?;

        let mut sheets = Vec::new();
        for entry in dir {
            let path = entry.context("Failed to read directory entry")?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_sheet(&path) {
                Ok(sheet) => sheets.push(sheet),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable grade sheet");
                }
            }
        }
        sheets.sort_by(|a, b| a.scope_key.cmp(&b.scope_key));
        Ok(sheets)
    }
}

fn check_scope_key(scope_key: &str) -> Result<()> {
    if scope_key.trim().is_empty() {
        anyhow::bail!("Scope key must not be empty");
    }
    Ok(())
}

fn read_sheet(path: &Path) -> Result<GradeSheet> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open grade sheet at {}", path.display()))?;
    let sheet: GradeSheet = serde_json::from_reader(file)
        .with_context(|| format!("Failed to parse grade sheet at {}", path.display()))?;

    if sheet.version != SHEET_VERSION {
        anyhow::bail!(
            "Unsupported grade sheet version {} in {}",
            sheet.version,
            path.display()
        );
    }

    Ok(sheet)
}
