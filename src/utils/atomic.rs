//! Atomic file operations
//!
//! Match documents are rewritten on every commit, so they go through a
//! temp-file-then-rename write:
//!
//! 1. Write to a temporary file (.tmp)
//! 2. Call sync_all() to flush to disk
//! 3. Rename temp file to final path (atomic on most filesystems)
//!
//! A reader therefore sees either the previous document or the new one.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Atomically replace `path` with `content`
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    let temp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(&temp_path)?;
    file.write_all(content)?;
    file.sync_all()?;

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Cut an append-only file back to `len` bytes
///
/// Used to roll back appended lines when the rest of a commit fails.
pub fn truncate_to<P: AsRef<Path>>(path: P, len: u64) -> io::Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(());
    }

    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(len)?;
    file.sync_all()
}

/// Drop a trailing partial line left behind by an interrupted append
///
/// Everything after the last `\n` is removed. Returns the number of bytes cut.
pub fn truncate_partial_line<P: AsRef<Path>>(path: P) -> io::Result<u64> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(0);
    }

    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(0);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(0);
    }

    let mut keep = 0;
    let mut end = len;
    let mut buf = [0u8; 4096];
    while end > 0 {
        let start = end.saturating_sub(buf.len() as u64);
        let chunk = &mut buf[..(end - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(chunk)?;
        if let Some(i) = chunk.iter().rposition(|&b| b == b'\n') {
            keep = start + i as u64 + 1;
            break;
        }
        end = start;
    }

    file.set_len(keep)?;
    file.sync_all()?;
    Ok(len - keep)
}

/// Clean up any leftover temp files from interrupted operations
///
/// Call this on startup to clean up .tmp files that may have been
/// left behind from crashes.
pub fn cleanup_temp_files<P: AsRef<Path>>(dir: P) -> io::Result<usize> {
    let dir = dir.as_ref();
    let mut cleaned = 0;

    if !dir.exists() {
        return Ok(0);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().map(|e| e == "tmp").unwrap_or(false) {
            fs::remove_file(&path)?;
            cleaned += 1;
        }
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("match.json");

        atomic_write(&path, b"{\"id\":\"m1\"}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"id\":\"m1\"}");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("matches").join("m1").join("match.json");

        atomic_write(&path, b"{}").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_truncate_to_drops_tail() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");
        fs::write(&path, "line1\nline2\n").unwrap();

        truncate_to(&path, 6).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "line1\n");
    }

    #[test]
    fn test_partial_line_is_cut_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");
        fs::write(&path, b"{\"seq\":1}\n{\"seq\":2}\n{\"seq\"").unwrap();

        assert_eq!(truncate_partial_line(&path).unwrap(), 6);
        assert_eq!(fs::read(&path).unwrap(), b"{\"seq\":1}\n{\"seq\":2}\n");
        assert_eq!(truncate_partial_line(&path).unwrap(), 0);
    }

    #[test]
    fn test_partial_first_line_empties_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");
        fs::write(&path, b"{\"seq\":1").unwrap();

        assert_eq!(truncate_partial_line(&path).unwrap(), 8);
        assert!(fs::read(&path).unwrap().is_empty());
        assert_eq!(truncate_partial_line(temp_dir.path().join("missing")).unwrap(), 0);
    }

    #[test]
    fn test_cleanup_temp_files() {
        let temp_dir = TempDir::new().unwrap();

        fs::write(temp_dir.path().join("match.tmp"), "partial").unwrap();
        fs::write(temp_dir.path().join("match.json"), "keep").unwrap();

        let cleaned = cleanup_temp_files(temp_dir.path()).unwrap();
        assert_eq!(cleaned, 1);
        assert!(!temp_dir.path().join("match.tmp").exists());
        assert!(temp_dir.path().join("match.json").exists());
    }
}
