use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::identity::IdentityGate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchMode {
    #[default]
    Single,
    Multi,
    Chat,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multi => "multi",
            Self::Chat => "chat",
        }
    }

    pub fn requires_sign_in(self) -> bool {
        matches!(self, Self::Multi | Self::Chat)
    }

    /// Returns the requested mode when the identity allows it, otherwise `Single`.
    pub fn gated(self, identity: &dyn IdentityGate) -> Self {
        if self.requires_sign_in() && !identity.is_signed_in() {
            return Self::Single;
        }
        self
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "multi" => Ok(Self::Multi),
            "chat" => Ok(Self::Chat),
            other => Err(format!("unknown search mode '{other}'")),
        }
    }
}

/// An image held in memory, shared between the request that sent it and the
/// history entry that previews it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageBlob {
    pub fn new(name: impl Into<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type,
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or("image")
            .to_string();
        Ok(Self::new(name, mime_for_path(path).map(str::to_string), bytes))
    }
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())?;
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" | "heif" => Some("image/heic"),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub images: Vec<Arc<ImageBlob>>,
    pub description: String,
    pub region: String,
    pub mode: SearchMode,
}

impl SearchRequest {
    pub fn new(mode: SearchMode, region: impl Into<String>) -> Self {
        Self {
            images: Vec::new(),
            description: String::new(),
            region: region.into(),
            mode,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image(mut self, image: ImageBlob) -> Self {
        self.images.push(Arc::new(image));
        self
    }

    pub fn has_description(&self) -> bool {
        !self.description.trim().is_empty()
    }

    pub fn ensure_sendable(&self) -> Result<(), PipelineError> {
        if self.images.is_empty() && !self.has_description() {
            return Err(PipelineError::invalid(
                "Please provide an image or a description to start the search.",
            ));
        }
        Ok(())
    }

    /// Images that will actually be sent. Single mode only keeps the most
    /// recently added one.
    pub fn effective_images(&self) -> &[Arc<ImageBlob>] {
        match self.mode {
            SearchMode::Single => {
                let start = self.images.len().saturating_sub(1);
                &self.images[start..]
            }
            SearchMode::Multi => &self.images,
            SearchMode::Chat => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::identity::StaticIdentity;

    use super::{ImageBlob, SearchMode, SearchRequest};

    #[test]
    fn restricted_modes_fall_back_to_single_when_signed_out() {
        let signed_out = StaticIdentity::signed_out();
        let signed_in = StaticIdentity::signed_in();
        assert_eq!(SearchMode::Multi.gated(&signed_out), SearchMode::Single);
        assert_eq!(SearchMode::Chat.gated(&signed_out), SearchMode::Single);
        assert_eq!(SearchMode::Single.gated(&signed_out), SearchMode::Single);
        assert_eq!(SearchMode::Multi.gated(&signed_in), SearchMode::Multi);
        assert_eq!(SearchMode::Chat.gated(&signed_in), SearchMode::Chat);
    }

    #[test]
    fn parse_mode_names() {
        assert_eq!("Multi".parse::<SearchMode>(), Ok(SearchMode::Multi));
        assert_eq!(" chat ".parse::<SearchMode>(), Ok(SearchMode::Chat));
        assert!("batch".parse::<SearchMode>().is_err());
    }

    #[test]
    fn empty_request_is_not_sendable() {
        let request = SearchRequest::new(SearchMode::Single, "Global").with_description("   ");
        assert!(request.ensure_sendable().is_err());

        let described =
            SearchRequest::new(SearchMode::Single, "Global").with_description("AirPods");
        assert!(described.ensure_sendable().is_ok());

        let pictured = SearchRequest::new(SearchMode::Single, "Global")
            .with_image(ImageBlob::new("a.png", None, vec![1]));
        assert!(pictured.ensure_sendable().is_ok());
    }

    #[test]
    fn single_mode_keeps_latest_image_only() {
        let request = SearchRequest::new(SearchMode::Single, "Global")
            .with_image(ImageBlob::new("first.png", None, vec![1]))
            .with_image(ImageBlob::new("second.png", None, vec![2]));
        let names: Vec<&str> = request
            .effective_images()
            .iter()
            .map(|image| image.name.as_str())
            .collect();
        assert_eq!(names, vec!["second.png"]);

        let multi = SearchRequest {
            mode: SearchMode::Multi,
            ..request
        };
        assert_eq!(multi.effective_images().len(), 2);
    }

    #[test]
    fn blob_from_path_reads_bytes_and_mime() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("Photo.JPG");
        std::fs::write(&path, [0xff, 0xd8, 0xff])?;
        let blob = ImageBlob::from_path(&path)?;
        assert_eq!(blob.name, "Photo.JPG");
        assert_eq!(blob.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(blob.bytes, vec![0xff, 0xd8, 0xff]);
        Ok(())
    }
}
