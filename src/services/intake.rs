// src/services/intake.rs
use std::path::Path;

use bytes::Bytes;
use image::ImageFormat;
use log::{info, warn};

use crate::errors::{IntakeRejection, OsintError};
use crate::models::FileDescriptor;

pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

pub const SUPPORTED_IMAGE_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
];

/// A file the user picked, before any checks.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Bytes,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: Some(mime_type.into()),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk. The MIME type is sniffed from the content,
    /// falling back to the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, OsintError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            OsintError::Workflow(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mime_type = sniff_mime_type(&data).or_else(|| mime_from_extension(path));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self {
            name,
            mime_type: mime_type.map(str::to_string),
            bytes: Bytes::from(data),
        })
    }
}

fn sniff_mime_type(data: &[u8]) -> Option<&'static str> {
    match image::guess_format(data).ok()? {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Tiff => Some("image/tiff"),
        ImageFormat::Ico => Some("image/x-icon"),
        _ => None,
    }
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

/// Lowercased essence of a MIME string, parameters dropped.
fn normalize_mime(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

#[derive(Debug, Clone)]
pub struct FileIntakeGate {
    max_bytes: u64,
}

impl Default for FileIntakeGate {
    fn default() -> Self {
        Self::new()
    }
}

impl FileIntakeGate {
    pub fn new() -> Self {
        Self {
            max_bytes: MAX_FILE_SIZE,
        }
    }

    /// Size first, so an oversize file is `TooLarge` whatever its type.
    pub fn check(&self, mime_type: Option<&str>, byte_size: u64) -> Result<(), IntakeRejection> {
        if byte_size > self.max_bytes {
            return Err(IntakeRejection::TooLarge {
                size: byte_size,
                limit: self.max_bytes,
            });
        }

        let mime = mime_type.map(normalize_mime).unwrap_or_default();
        if !SUPPORTED_IMAGE_TYPES.contains(&mime.as_str()) {
            return Err(IntakeRejection::UnsupportedType {
                mime_type: if mime.is_empty() {
                    "unknown".to_string()
                } else {
                    mime
                },
            });
        }

        Ok(())
    }

    pub fn accept(&self, candidate: CandidateFile) -> Result<FileDescriptor, IntakeRejection> {
        let byte_size = candidate.bytes.len() as u64;
        if let Err(rejection) = self.check(candidate.mime_type.as_deref(), byte_size) {
            warn!("Rejected {}: {}", candidate.name, rejection);
            return Err(rejection);
        }

        let mime_type = candidate
            .mime_type
            .as_deref()
            .map(normalize_mime)
            .unwrap_or_default();
        info!(
            "Accepted {} ({}, {})",
            candidate.name,
            mime_type,
            format_file_size(byte_size)
        );
        Ok(FileDescriptor::new(candidate.name, mime_type, candidate.bytes))
    }
}

pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let k = 1024f64;
    let exp = ((bytes as f64).ln() / k.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / k.powi(exp as i32);
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[exp])
}
