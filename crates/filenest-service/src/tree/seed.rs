//! Sample content for an empty installation.

use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use filenest_core::result::AppResult;

use super::service::TreeService;

/// Top-level sample folders, with optional sub-folders.
const SAMPLE_FOLDERS: &[(&str, &[&str])] = &[
    ("Documents", &["Archived"]),
    ("Images", &[]),
    ("Project Files", &[]),
    ("Shared with Me", &[]),
];

/// Sample files: name, containing top-level folder, placeholder contents.
const SAMPLE_FILES: &[(&str, Option<&str>, &str)] = &[
    ("Annual Report.pdf", None, "%PDF-1.7 annual report"),
    ("Presentation.pdf", None, "%PDF-1.7 presentation"),
    ("Profile Picture.jpg", None, "JFIF profile picture"),
    ("Meeting Notes.docx", None, "Meeting notes"),
    ("main.js", Some("Documents"), "console.log(\"hello\");\n"),
];

/// Result of [`TreeService::seed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub folders: usize,
    pub files: usize,
    /// The tree already had content, so nothing was written.
    pub skipped: bool,
}

impl TreeService {
    /// Populate an empty tree with sample folders and files.
    ///
    /// Does nothing when any folder or file exists. Everything goes through
    /// the regular create operations, so counters stay consistent.
    pub async fn seed(&self) -> AppResult<SeedReport> {
        if !self.is_empty().await? {
            info!("Tree already has content, skipping seed");
            return Ok(SeedReport {
                skipped: true,
                ..SeedReport::default()
            });
        }

        let mut report = SeedReport::default();
        let mut top_level = Vec::with_capacity(SAMPLE_FOLDERS.len());
        for &(name, children) in SAMPLE_FOLDERS {
            let folder = self.create_folder(name, None).await?;
            report.folders += 1;
            for child in children {
                self.create_folder(child, Some(folder.id)).await?;
                report.folders += 1;
            }
            top_level.push((name, folder.id));
        }

        for &(name, folder, contents) in SAMPLE_FILES {
            let parent = folder.and_then(|wanted| {
                top_level
                    .iter()
                    .find(|(name, _)| *name == wanted)
                    .map(|(_, id)| *id)
            });
            self.upload_file(name, Bytes::from_static(contents.as_bytes()), parent)
                .await?;
            report.files += 1;
        }

        info!(folders = report.folders, files = report.files, "Seeded sample tree");
        Ok(report)
    }
}
