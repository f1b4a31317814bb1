use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Read a line-delimited JSON file. Blank lines are skipped; a malformed line
/// is an error naming its line number, since silently dropping a question
/// would skew every pass rate computed from the file.
pub fn read_jsonl(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<Value>(line).with_context(|| {
                format!("Malformed JSON on line {} of '{}'", idx + 1, path.display())
            })
        })
        .collect()
}

/// Write rows as JSONL, replacing the file atomically.
pub fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory '{}'", parent.display())
            })?;
        }
    }

    let mut content = Vec::new();
    for row in rows {
        serde_json::to_writer(&mut content, row)?;
        content.write_all(b"\n")?;
    }

    write_atomic(path, &content)
        .with_context(|| format!("Failed to write '{}'", path.display()))
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("jsonl.tmp");
    fs::write(&tmp_path, content)?;

    #[cfg(windows)]
    {
        if path.exists() {
            fs::remove_file(path)?;
        }
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}
