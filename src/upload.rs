use std::path::Path;

use crate::errors::{AppError, MAX_UPLOAD_BYTES};

/// Content types the service accepts, keyed by lowercase file extension.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

pub fn is_image(path: &Path) -> bool {
    mime_for_path(path).is_some_and(|mime| mime.starts_with("image/"))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A local file read into memory and checked against the upload limits.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub async fn read(path: &Path) -> Result<Self, AppError> {
        let file_name = display_name(path);
        let read_error = |source| AppError::FileRead {
            path: path.display().to_string(),
            source,
        };

        let mime = mime_for_path(path).ok_or_else(|| AppError::UnsupportedFileType {
            file_name: file_name.clone(),
        })?;

        let size = tokio::fs::metadata(path).await.map_err(read_error)?.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(AppError::FileTooLarge {
                file_name,
                size,
                max: MAX_UPLOAD_BYTES,
            });
        }

        let bytes = tokio::fs::read(path).await.map_err(read_error)?;
        Ok(Self { file_name, mime, bytes })
    }

    pub fn size_mb(&self) -> f64 {
        self.bytes.len() as f64 / (1024.0 * 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn maps_known_extensions_case_insensitively() {
        assert_eq!(mime_for_path(Path::new("Mock.PNG")), Some("image/png"));
        assert_eq!(mime_for_path(Path::new("notes.md")), Some("text/markdown"));
        assert_eq!(mime_for_path(Path::new("archive.zip")), None);
        assert_eq!(mime_for_path(Path::new("README")), None);
    }

    #[test]
    fn detects_images() {
        assert!(is_image(Path::new("screen.webp")));
        assert!(!is_image(Path::new("brief.pdf")));
    }

    #[tokio::test]
    async fn reads_allowed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brief.txt");
        std::fs::write(&path, "login flow").unwrap();

        let file = UploadFile::read(&path).await.unwrap();
        assert_eq!(file.file_name, "brief.txt");
        assert_eq!(file.mime, "text/plain");
        assert_eq!(file.bytes, b"login flow");
    }

    #[tokio::test]
    async fn rejects_unsupported_types_before_reading() {
        let err = UploadFile::read(&PathBuf::from("/does/not/exist.exe"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let err = UploadFile::read(&PathBuf::from("/does/not/exist.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileRead { .. }));
    }
}
