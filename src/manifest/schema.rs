//! Session manifest schema, both supported versions.
//!
//! A manifest is an XML document describing one capture session: title,
//! description, date, and lists of videos, presentations, images, and
//! attachments, each referencing files on disk next to the manifest. Two
//! schema versions are in the wild; version 2 additionally carries a
//! thumbnail reference and names its file element `File` instead of
//! `Filename`. The root element name tells them apart: `PanoptoSession`
//! (v1) vs `Session` (v2).

use quick_xml::events::Event;
use serde::Deserialize;
use thiserror::Error;

/// File extension of candidate manifest files
pub const MANIFEST_EXTENSION: &str = "xml";

/// Why a candidate file could not be parsed as a session manifest
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("not well-formed XML: {0}")]
    Xml(String),

    #[error("document has no root element")]
    Empty,

    #[error("root element '{0}' is not a recognized session manifest")]
    UnrecognizedRoot(String),

    #[error("schema mismatch: {0}")]
    Deserialize(String),
}

/// A file reference inside a manifest: the element text is the
/// server-relative name, the attribute the original local-disk name.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FileRef {
    #[serde(rename = "@localFilename", default)]
    pub local_filename: Option<String>,
    #[serde(rename = "$text", default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CutV1 {
    #[serde(rename = "Start", default)]
    pub start: Option<String>,
    #[serde(rename = "Duration", default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TocEntryV1 {
    #[serde(rename = "Time", default)]
    pub time: Option<String>,
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptV1 {
    #[serde(rename = "Filename")]
    pub filename: FileRef,
    #[serde(rename = "Language", default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoV1 {
    #[serde(rename = "Start", default)]
    pub start: Option<String>,
    #[serde(rename = "Filename")]
    pub filename: FileRef,
    #[serde(rename = "Cuts", default)]
    pub cuts: Option<CutListV1>,
    #[serde(rename = "TableOfContents", default)]
    pub table_of_contents: Option<TocListV1>,
    #[serde(rename = "Type", default)]
    pub video_type: Option<String>,
    #[serde(rename = "Transcripts", default)]
    pub transcripts: Option<TranscriptListV1>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresentationV1 {
    #[serde(rename = "Start", default)]
    pub start: Option<String>,
    #[serde(rename = "Filename")]
    pub filename: FileRef,
    #[serde(rename = "SlideChanges", default)]
    pub slide_changes: Option<SlideChangeListV1>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageV1 {
    #[serde(rename = "Start", default)]
    pub start: Option<String>,
    #[serde(rename = "Filename")]
    pub filename: FileRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentV1 {
    #[serde(rename = "Filename")]
    pub filename: FileRef,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlideChangeV1 {
    #[serde(rename = "Time", default)]
    pub time: Option<String>,
    #[serde(rename = "Slide", default)]
    pub slide: Option<u32>,
}

// quick-xml needs a wrapper struct per XML list element
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoListV1 {
    #[serde(rename = "Video", default)]
    pub items: Vec<VideoV1>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PresentationListV1 {
    #[serde(rename = "Presentation", default)]
    pub items: Vec<PresentationV1>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageListV1 {
    #[serde(rename = "Image", default)]
    pub items: Vec<ImageV1>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentListV1 {
    #[serde(rename = "Attachment", default)]
    pub items: Vec<AttachmentV1>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptListV1 {
    #[serde(rename = "Transcript", default)]
    pub items: Vec<TranscriptV1>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CutListV1 {
    #[serde(rename = "Cut", default)]
    pub items: Vec<CutV1>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TocListV1 {
    #[serde(rename = "Entry", default)]
    pub items: Vec<TocEntryV1>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlideChangeListV1 {
    #[serde(rename = "SlideChange", default)]
    pub items: Vec<SlideChangeV1>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagList {
    #[serde(rename = "Tag", default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtensionList {
    #[serde(rename = "Extension", default)]
    pub items: Vec<String>,
}

/// Version 1 session manifest (root element `PanoptoSession`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionV1 {
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "Videos")]
    pub videos: Option<VideoListV1>,
    #[serde(rename = "Presentations")]
    pub presentations: Option<PresentationListV1>,
    #[serde(rename = "Images")]
    pub images: Option<ImageListV1>,
    #[serde(rename = "Cuts")]
    pub cuts: Option<CutListV1>,
    #[serde(rename = "Tags")]
    pub tags: Option<TagList>,
    #[serde(rename = "Extensions")]
    pub extensions: Option<ExtensionList>,
    #[serde(rename = "Attachments")]
    pub attachments: Option<AttachmentListV1>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptV2 {
    #[serde(rename = "File")]
    pub file: FileRef,
    #[serde(rename = "Language", default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoV2 {
    #[serde(rename = "Start", default)]
    pub start: Option<String>,
    #[serde(rename = "File")]
    pub file: FileRef,
    #[serde(rename = "Cuts", default)]
    pub cuts: Option<CutListV1>,
    #[serde(rename = "TableOfContents", default)]
    pub table_of_contents: Option<TocListV1>,
    #[serde(rename = "Type", default)]
    pub video_type: Option<String>,
    #[serde(rename = "Transcripts", default)]
    pub transcripts: Option<TranscriptListV2>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresentationV2 {
    #[serde(rename = "Start", default)]
    pub start: Option<String>,
    #[serde(rename = "File")]
    pub file: FileRef,
    #[serde(rename = "SlideChanges", default)]
    pub slide_changes: Option<SlideChangeListV1>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageV2 {
    #[serde(rename = "Start", default)]
    pub start: Option<String>,
    #[serde(rename = "File")]
    pub file: FileRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentV2 {
    #[serde(rename = "File")]
    pub file: FileRef,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoListV2 {
    #[serde(rename = "Video", default)]
    pub items: Vec<VideoV2>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PresentationListV2 {
    #[serde(rename = "Presentation", default)]
    pub items: Vec<PresentationV2>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageListV2 {
    #[serde(rename = "Image", default)]
    pub items: Vec<ImageV2>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentListV2 {
    #[serde(rename = "Attachment", default)]
    pub items: Vec<AttachmentV2>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptListV2 {
    #[serde(rename = "Transcript", default)]
    pub items: Vec<TranscriptV2>,
}

/// Version 2 session manifest (root element `Session`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionV2 {
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "Thumbnail")]
    pub thumbnail: Option<FileRef>,
    #[serde(rename = "Videos")]
    pub videos: Option<VideoListV2>,
    #[serde(rename = "Presentations")]
    pub presentations: Option<PresentationListV2>,
    #[serde(rename = "Images")]
    pub images: Option<ImageListV2>,
    #[serde(rename = "Cuts")]
    pub cuts: Option<CutListV1>,
    #[serde(rename = "Tags")]
    pub tags: Option<TagList>,
    #[serde(rename = "Extensions")]
    pub extensions: Option<ExtensionList>,
    #[serde(rename = "Attachments")]
    pub attachments: Option<AttachmentListV2>,
}

/// A parsed session manifest of either schema version
#[derive(Debug, Clone)]
pub enum SessionManifest {
    V1(SessionV1),
    V2(SessionV2),
}

impl SessionManifest {
    /// Parse a manifest document, dispatching on the root element name.
    pub fn parse(xml: &str) -> Result<Self, SchemaError> {
        match root_element_name(xml)? {
            name if name == "Session" => {
                let session: SessionV2 = quick_xml::de::from_str(xml)
                    .map_err(|e| SchemaError::Deserialize(e.to_string()))?;
                Ok(SessionManifest::V2(session))
            }
            name if name == "PanoptoSession" => {
                let session: SessionV1 = quick_xml::de::from_str(xml)
                    .map_err(|e| SchemaError::Deserialize(e.to_string()))?;
                Ok(SessionManifest::V1(session))
            }
            name => Err(SchemaError::UnrecognizedRoot(name)),
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            SessionManifest::V1(s) => s.title.as_deref(),
            SessionManifest::V2(s) => s.title.as_deref(),
        }
    }

    /// Every file name this manifest references, flattened, duplicates kept.
    ///
    /// Order is fixed by the schema version: v2 lists the thumbnail first,
    /// then both versions go videos, transcripts, presentations, images,
    /// attachments.
    pub fn referenced_files(&self) -> Vec<String> {
        let mut files = Vec::new();
        match self {
            SessionManifest::V1(s) => {
                if let Some(videos) = &s.videos {
                    files.extend(videos.items.iter().map(|v| v.filename.value.clone()));
                    for video in &videos.items {
                        if let Some(transcripts) = &video.transcripts {
                            files.extend(
                                transcripts.items.iter().map(|t| t.filename.value.clone()),
                            );
                        }
                    }
                }
                if let Some(presentations) = &s.presentations {
                    files.extend(presentations.items.iter().map(|p| p.filename.value.clone()));
                }
                if let Some(images) = &s.images {
                    files.extend(images.items.iter().map(|i| i.filename.value.clone()));
                }
                if let Some(attachments) = &s.attachments {
                    files.extend(attachments.items.iter().map(|a| a.filename.value.clone()));
                }
            }
            SessionManifest::V2(s) => {
                if let Some(thumbnail) = &s.thumbnail {
                    files.push(thumbnail.value.clone());
                }
                if let Some(videos) = &s.videos {
                    files.extend(videos.items.iter().map(|v| v.file.value.clone()));
                    for video in &videos.items {
                        if let Some(transcripts) = &video.transcripts {
                            files.extend(transcripts.items.iter().map(|t| t.file.value.clone()));
                        }
                    }
                }
                if let Some(presentations) = &s.presentations {
                    files.extend(presentations.items.iter().map(|p| p.file.value.clone()));
                }
                if let Some(images) = &s.images {
                    files.extend(images.items.iter().map(|i| i.file.value.clone()));
                }
                if let Some(attachments) = &s.attachments {
                    files.extend(attachments.items.iter().map(|a| a.file.value.clone()));
                }
            }
        }
        files
    }
}

/// Local name of the document's root element.
fn root_element_name(xml: &str) -> Result<String, SchemaError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => return Err(SchemaError::Empty),
            Ok(_) => continue,
            Err(e) => return Err(SchemaError::Xml(e.to_string())),
        }
    }
}
