//! File content categories and display helpers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};

use filenest_core::AppError;

/// The closed set of content categories a file can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF documents.
    Pdf,
    /// Raster and vector images.
    Image,
    /// Word-processor and plain-text documents.
    Document,
    /// Source code and structured text.
    Code,
    /// Audio recordings.
    Audio,
    /// Video recordings.
    Video,
    /// Spreadsheets.
    Sheet,
    /// Anything else.
    Other,
}

impl FileType {
    /// All categories, in declaration order.
    pub const ALL: [FileType; 8] = [
        Self::Pdf,
        Self::Image,
        Self::Document,
        Self::Code,
        Self::Audio,
        Self::Video,
        Self::Sheet,
        Self::Other,
    ];

    /// Categorize a file by the extension of its name.
    pub fn from_name(name: &str) -> Self {
        let Some(ext) = extension_of(name) else {
            return Self::Other;
        };

        match ext.as_str() {
            "doc" | "docx" | "txt" | "md" => Self::Document,
            "pdf" => Self::Pdf,
            "jpg" | "jpeg" | "png" | "apng" | "svg" | "gif" | "avif" | "webp" | "tiff" | "tif"
            | "woff" | "woff2" | "ico" => Self::Image,
            "html" | "xhtml" | "css" | "js" | "ts" | "jsx" | "tsx" | "py" | "c" | "h" | "cpp"
            | "hpp" | "java" | "rb" | "go" | "rs" | "php" | "swift" | "sh" | "json" | "xml"
            | "yaml" | "yml" | "sql" => Self::Code,
            "aac" | "mp3" | "oga" | "wav" | "ogg" | "flac" | "m4a" | "weba" => Self::Audio,
            "mp4" | "mpeg" | "ogv" | "mov" | "avi" | "mkv" | "webm" => Self::Video,
            "xls" | "xlsx" | "csv" | "ods" => Self::Sheet,
            _ => Self::Other,
        }
    }

    /// Return the category as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Document => "document",
            Self::Code => "code",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Sheet => "sheet",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.to_lowercase())
            .ok_or_else(|| AppError::validation(format!("Invalid file type: '{s}'")))
    }
}

impl Type<Postgres> for FileType {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Postgres> for FileType {
    fn encode_by_ref(
        &self,
        buf: &mut PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as Encode<'q, Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> Decode<'r, Postgres> for FileType {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as Decode<'r, Postgres>>::decode(value)?;
        raw.parse::<FileType>().map_err(Into::into)
    }
}

/// Lowercase extension of a file name. `.tar.gz` is kept whole.
pub(crate) fn extension_of(name: &str) -> Option<String> {
    let lower = name.to_lowercase();
    if lower.ends_with(".tar.gz") {
        return Some("tar.gz".to_string());
    }
    lower
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_string())
        .filter(|ext| !ext.is_empty())
}

/// Format a byte count for display, with one decimal place above 1 KB.
pub fn display_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let size = bytes as f64;
    if size < KB {
        format!("{bytes} B")
    } else if size < MB {
        format!("{:.1} KB", size / KB)
    } else if size < GB {
        format!("{:.1} MB", size / MB)
    } else {
        format!("{:.1} GB", size / GB)
    }
}
