//! Input classification: decide whether a path is a supported document or
//! image, and derive the stable document identifier.
//!
//! ## Why magic bytes on top of extensions?
//!
//! The extension picks the processing path (paginated document vs.
//! one-page image), but files get renamed. Verifying the first bytes
//! before handing the path to pdfium or the image decoder turns a cryptic
//! downstream parse failure into a meaningful error at the boundary.

use crate::error::Pdf2BlocksError;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Supported input types. Anything else is a warn-and-skip, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Paginated document; pages come from the document's own metadata.
    Pdf,
    /// Single raster image → a one-page document with page_index 0.
    Png,
    /// Single raster image → a one-page document with page_index 0.
    Jpeg,
}

impl InputKind {
    /// True for inputs processed as a single synthetic page.
    pub fn is_image(&self) -> bool {
        matches!(self, InputKind::Png | InputKind::Jpeg)
    }
}

/// Classify an input path.
///
/// Returns `Ok(None)` for unsupported extensions — the driver logs a
/// warning and skips, matching batch semantics where one stray file must
/// not abort a run. Existence, readability, and content/extension
/// mismatches are errors, because they point at a real problem with a
/// file the caller did intend to process.
pub fn classify(path: &Path) -> Result<Option<InputKind>, Pdf2BlocksError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let kind = match ext.as_deref() {
        Some("pdf") => InputKind::Pdf,
        Some("png") => InputKind::Png,
        Some("jpg") | Some("jpeg") => InputKind::Jpeg,
        _ => return Ok(None),
    };

    let magic = read_magic(path)?;
    let matches = match kind {
        InputKind::Pdf => &magic == b"%PDF",
        InputKind::Png => magic == [0x89, b'P', b'N', b'G'],
        InputKind::Jpeg => magic[..3] == [0xFF, 0xD8, 0xFF],
    };
    if !matches {
        return Err(Pdf2BlocksError::ContentMismatch {
            path: path.to_path_buf(),
            magic,
        });
    }

    debug!("Classified {} as {:?}", path.display(), kind);
    Ok(Some(kind))
}

/// Read the first four bytes, mapping I/O failures to boundary errors.
fn read_magic(path: &Path) -> Result<[u8; 4], Pdf2BlocksError> {
    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2BlocksError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(Pdf2BlocksError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)
        .map_err(|_| Pdf2BlocksError::ContentMismatch {
            path: path.to_path_buf(),
            magic,
        })?;
    Ok(magic)
}

/// Derive the stable document identifier from the file name.
///
/// Lowercased stem with spaces collapsed to underscores; it keys both the
/// output directory and the image cache directory, so it must be
/// deterministic across runs.
pub fn document_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_lowercase()
        .replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn classifies_by_extension_and_magic() {
        let dir = TempDir::new().unwrap();
        let pdf = write_file(&dir, "doc.pdf", b"%PDF-1.7 rest");
        let png = write_file(&dir, "scan.png", &[0x89, b'P', b'N', b'G', 0x0D, 0x0A]);
        let jpg = write_file(&dir, "photo.JPG", &[0xFF, 0xD8, 0xFF, 0xE0, 0x00]);

        assert_eq!(classify(&pdf).unwrap(), Some(InputKind::Pdf));
        assert_eq!(classify(&png).unwrap(), Some(InputKind::Png));
        assert_eq!(classify(&jpg).unwrap(), Some(InputKind::Jpeg));
    }

    #[test]
    fn unsupported_extension_is_none_not_error() {
        let dir = TempDir::new().unwrap();
        let txt = write_file(&dir, "notes.txt", b"hello");
        assert_eq!(classify(&txt).unwrap(), None);
    }

    #[test]
    fn extension_content_mismatch_is_an_error() {
        let dir = TempDir::new().unwrap();
        let fake = write_file(&dir, "fake.pdf", b"GIF89a..");
        let err = classify(&fake).unwrap_err();
        assert!(matches!(err, Pdf2BlocksError::ContentMismatch { .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = classify(Path::new("/does/not/exist.pdf")).unwrap_err();
        assert!(matches!(err, Pdf2BlocksError::FileNotFound { .. }));
    }

    #[test]
    fn stem_is_lowercased_and_underscored() {
        assert_eq!(
            document_stem(Path::new("/tmp/Annual Report 2024.pdf")),
            "annual_report_2024"
        );
        assert_eq!(document_stem(Path::new("scan.png")), "scan");
    }
}
