use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{CreateError, Result};

/// How much of a file is inspected to tell text from binary content.
const SNIFF_LEN: usize = 8192;

/// Read a file selected by a rule as UTF-8 text.
///
/// Returns `None` for content that is not safe to rewrite as text: anything
/// `content_inspector` flags in the leading bytes, or that is not valid UTF-8.
pub fn read_text(path: &Path) -> Result<Option<String>> {
    let bytes = std::fs::read(path).map_err(|e| CreateError::Io {
        context: format!("reading {}", path.display()),
        source: e,
    })?;

    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    if !content_inspector::inspect(head).is_text() {
        return Ok(None);
    }
    Ok(String::from_utf8(bytes).ok())
}

/// Replace `path` with `content` via a sibling temp file and a rename, so
/// readers see either the old or the new file. Permissions are carried over.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let io_err = |action: &str, e: std::io::Error| CreateError::Io {
        context: format!("{action} {}", path.display()),
        source: e,
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let permissions = std::fs::metadata(path)
        .map_err(|e| io_err("inspecting", e))?
        .permissions();

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| io_err("staging", e))?;
    tmp.write_all(content.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| io_err("writing", e))?;
    tmp.as_file()
        .set_permissions(permissions)
        .map_err(|e| io_err("setting permissions on", e))?;
    tmp.persist(path).map_err(|e| io_err("replacing", e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    fn read_back(content: &[u8]) -> Option<String> {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("asset");
        fs::write(&file, content).unwrap();
        read_text(&file).unwrap()
    }

    #[rstest]
    #[case::ascii(b"port: 8080\n", Some("port: 8080\n"))]
    #[case::utf8(b"caf\xc3\xa9", Some("caf\u{e9}"))]
    #[case::empty(b"", Some(""))]
    #[case::nul_byte(b"ut-microservice\x00\x01", None)]
    #[case::latin1(b"caf\xe9", None)]
    fn read_text_only_returns_utf8_text(#[case] content: &[u8], #[case] expected: Option<&str>) {
        assert_eq!(read_back(content).as_deref(), expected);
    }

    #[test]
    fn nul_byte_past_the_sniffed_prefix_is_still_text() {
        let mut content = vec![b'a'; SNIFF_LEN];
        content.extend_from_slice(b"\x00tail");
        let text = read_back(&content).unwrap();
        assert!(text.ends_with("tail"));
    }

    #[test]
    fn read_text_missing_file_errors() {
        let err = read_text(Path::new("/nonexistent/ut-create/file.txt")).unwrap_err();
        assert!(matches!(err, CreateError::Io { .. }));
    }

    #[test]
    fn write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("package.json");
        fs::write(&file, "old").unwrap();

        write_atomic(&file, "new").unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "new");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "no temp files should remain");
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("run.sh");
        fs::write(&file, "#!/bin/sh\necho old\n").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o755)).unwrap();

        write_atomic(&file, "#!/bin/sh\necho new\n").unwrap();

        let mode = fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn write_atomic_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_atomic(&dir.path().join("missing.txt"), "x").unwrap_err();
        assert!(matches!(err, CreateError::Io { .. }));
    }
}
