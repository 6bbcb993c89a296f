// File previews
// Kind classification, preview source selection and human-readable sizes

use crate::providers::FileRecord;

/// Broad file category derived from the MIME kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Folder,
    Image,
    Video,
    Audio,
    Pdf,
    Document,
    Spreadsheet,
    Presentation,
    Archive,
    Code,
    Generic,
}

impl FileKind {
    pub fn of(record: &FileRecord) -> Self {
        if record.is_folder() {
            return FileKind::Folder;
        }
        let mime = record.mime_kind.as_str();
        if mime.starts_with("image/") {
            return FileKind::Image;
        }
        if mime.starts_with("video/") {
            return FileKind::Video;
        }
        if mime.starts_with("audio/") {
            return FileKind::Audio;
        }
        match mime {
            "application/pdf" => FileKind::Pdf,
            "application/vnd.google-apps.document" | "application/rtf" | "text/plain" => FileKind::Document,
            "application/vnd.google-apps.spreadsheet"
            | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "text/csv" => FileKind::Spreadsheet,
            "application/vnd.google-apps.presentation"
            | "application/vnd.openxmlformats-officedocument.presentationml.presentation" => FileKind::Presentation,
            "application/zip"
            | "application/x-zip-compressed"
            | "application/x-rar-compressed"
            | "application/x-7z-compressed"
            | "application/x-tar"
            | "application/gzip" => FileKind::Archive,
            "text/html" | "application/json" | "text/javascript" | "application/javascript"
            | "text/x-typescript" | "application/xml" | "text/css" | "text/x-python" | "text/x-java" => {
                FileKind::Code
            }
            _ => FileKind::Generic,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FileKind::Folder => "Folder",
            FileKind::Image => "Image",
            FileKind::Video => "Video",
            FileKind::Audio => "Audio",
            FileKind::Pdf => "PDF",
            FileKind::Document => "Document",
            FileKind::Spreadsheet => "Spreadsheet",
            FileKind::Presentation => "Presentation",
            FileKind::Archive => "Archive",
            FileKind::Code => "Code",
            FileKind::Generic => "File",
        }
    }
}

/// What a preview pane should show for a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewSource {
    Image(String),
    /// Drive's embeddable viewer
    Embed(String),
    Audio(String),
    None,
}

/// Size used when asking Drive for a preview-quality thumbnail
const PREVIEW_THUMBNAIL_SIZE: u32 = 1000;

/// Replace a trailing `=s<N>` size suffix with the preview size
pub fn sized_thumbnail(url: &str) -> String {
    match url.rsplit_once("=s") {
        Some((base, size)) if !size.is_empty() && size.bytes().all(|b| b.is_ascii_digit()) => {
            format!("{}=s{}", base, PREVIEW_THUMBNAIL_SIZE)
        }
        _ => url.to_string(),
    }
}

pub fn embed_url(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/preview", file_id)
}

pub fn download_url(file_id: &str) -> String {
    format!("https://drive.google.com/uc?export=download&id={}", file_id)
}

pub fn preview_source(record: &FileRecord) -> PreviewSource {
    let links = &record.preview_links;
    match FileKind::of(record) {
        FileKind::Image => match (&links.thumbnail, &links.icon) {
            (Some(thumbnail), _) => PreviewSource::Image(sized_thumbnail(thumbnail)),
            (None, Some(icon)) => PreviewSource::Image(icon.clone()),
            (None, None) => PreviewSource::None,
        },
        FileKind::Video | FileKind::Pdf | FileKind::Document => PreviewSource::Embed(embed_url(&record.id)),
        FileKind::Audio => PreviewSource::Audio(download_url(&record.id)),
        _ if record.mime_kind.contains("text") || record.mime_kind.contains("document") => {
            PreviewSource::Embed(embed_url(&record.id))
        }
        _ => PreviewSource::None,
    }
}

/// `512 B`, `1.5 KB`, `3.2 MB`, `1.0 GB`; `--` when unknown
pub fn format_size(bytes: Option<u64>) -> String {
    let Some(bytes) = bytes else {
        return "--".to_string();
    };
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let kb = bytes as f64 / 1024.0;
    if kb < 1024.0 {
        return format!("{:.1} KB", kb);
    }
    let mb = kb / 1024.0;
    if mb < 1024.0 {
        return format!("{:.1} MB", mb);
    }
    format!("{:.1} GB", mb / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::PreviewLinks;

    #[test]
    fn test_classification() {
        let kind = |mime: &str| FileKind::of(&FileRecord::new("x", "x", mime));
        assert_eq!(kind("image/png"), FileKind::Image);
        assert_eq!(kind("video/mp4"), FileKind::Video);
        assert_eq!(kind("text/csv"), FileKind::Spreadsheet);
        assert_eq!(kind("application/gzip"), FileKind::Archive);
        assert_eq!(kind("text/x-python"), FileKind::Code);
        assert_eq!(kind("application/octet-stream"), FileKind::Generic);
        assert_eq!(FileKind::of(&FileRecord::folder("f", "f")), FileKind::Folder);
    }

    #[test]
    fn test_sized_thumbnail() {
        assert_eq!(
            sized_thumbnail("https://lh3.googleusercontent.com/abc=s220"),
            "https://lh3.googleusercontent.com/abc=s1000"
        );
        assert_eq!(sized_thumbnail("https://example.com/abc"), "https://example.com/abc");
        assert_eq!(sized_thumbnail("https://example.com/a=sx"), "https://example.com/a=sx");
    }

    #[test]
    fn test_preview_source() {
        let image = FileRecord::new("i1", "a.png", "image/png").with_preview_links(PreviewLinks {
            icon: Some("icon".into()),
            thumbnail: Some("thumb=s220".into()),
            web_view: None,
        });
        assert_eq!(preview_source(&image), PreviewSource::Image("thumb=s1000".into()));

        let video = FileRecord::new("v1", "a.mp4", "video/mp4");
        assert_eq!(preview_source(&video), PreviewSource::Embed(embed_url("v1")));

        let song = FileRecord::new("s1", "a.mp3", "audio/mpeg");
        assert_eq!(preview_source(&song), PreviewSource::Audio(download_url("s1")));

        let blob = FileRecord::new("b1", "a.bin", "application/octet-stream");
        assert_eq!(preview_source(&blob), PreviewSource::None);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(None), "--");
        assert_eq!(format_size(Some(512)), "512 B");
        assert_eq!(format_size(Some(1536)), "1.5 KB");
        assert_eq!(format_size(Some(5 * 1024 * 1024)), "5.0 MB");
        assert_eq!(format_size(Some(3 * 1024 * 1024 * 1024)), "3.0 GB");
    }
}
