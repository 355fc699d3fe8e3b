use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Resolution tiers published for every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Thumbnail,
    Lowres,
    Highres,
    Pdf,
}

impl Resolution {
    pub const IMAGES: [Self; 3] = [Self::Thumbnail, Self::Lowres, Self::Highres];

    pub fn key(self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::Lowres => "lowres",
            Self::Highres => "highres",
            Self::Pdf => "pdf",
        }
    }

    /// Resource name inside the page folder; the PDF name comes from `page.json`.
    pub fn remote_name(self) -> Option<&'static str> {
        match self {
            Self::Thumbnail => Some("page_thumbnail.jpg"),
            Self::Lowres => Some("big_page.jpg"),
            Self::Highres => Some("big_page2.jpg"),
            Self::Pdf => None,
        }
    }

    pub fn file_name(self, page_number: u32) -> String {
        match self {
            Self::Pdf => format!("page-{page_number:03}-highres.pdf"),
            image => format!("page-{page_number:03}-{}.jpg", image.key()),
        }
    }

    pub fn dump_file_name(self, page_number: u32) -> String {
        format!("page-{page_number:03}-{}.dump", self.key())
    }

    /// Inverse of [`Resolution::file_name`] for image tiers.
    pub fn parse_image_file_name(file_name: &str) -> Option<(u32, Self)> {
        let rest = file_name.strip_prefix("page-")?.strip_suffix(".jpg")?;
        let (number, key) = rest.split_once('-')?;
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let resolution = Self::IMAGES.into_iter().find(|r| r.key() == key)?;
        let number = number.parse().ok()?;
        Some((number, resolution))
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    pub number: u32,
    pub title: String,
    pub folder: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOfContents {
    pub pages: Vec<PageEntry>,
}

/// Wire shape of one `toc.json` entry.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TocEntryRecord {
    pub page: PageNumberRecord,
    #[serde(default)]
    pub page_title: Option<String>,
    pub page_folder: String,
}

/// The publisher sends page numbers as strings; integers are accepted too.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum PageNumberRecord {
    Number(u32),
    Text(String),
}

impl PageNumberRecord {
    pub fn parse(&self) -> Option<u32> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// Wire shape of `page.json`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PageMetaRecord {
    #[serde(default)]
    pub pdf: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub source_url: String,
    pub local_filename: PathBuf,
    pub exists_on_disk: bool,
}

impl Resource {
    pub fn new(source_url: String, local_filename: PathBuf) -> Self {
        Self {
            source_url,
            local_filename,
            exists_on_disk: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResourceSet {
    pub thumbnail: Resource,
    pub lowres: Resource,
    pub highres: Resource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<Resource>,
}

impl PageResourceSet {
    pub fn get(&self, resolution: Resolution) -> Option<&Resource> {
        match resolution {
            Resolution::Thumbnail => Some(&self.thumbnail),
            Resolution::Lowres => Some(&self.lowres),
            Resolution::Highres => Some(&self.highres),
            Resolution::Pdf => self.pdf.as_ref(),
        }
    }

    pub fn get_mut(&mut self, resolution: Resolution) -> Option<&mut Resource> {
        match resolution {
            Resolution::Thumbnail => Some(&mut self.thumbnail),
            Resolution::Lowres => Some(&mut self.lowres),
            Resolution::Highres => Some(&mut self.highres),
            Resolution::Pdf => self.pdf.as_mut(),
        }
    }
}

/// One page with every resource it can be downloaded as; persisted to `page_metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResources {
    pub number: u32,
    pub title: String,
    pub folder: String,
    pub resources: PageResourceSet,
}

impl PageResources {
    pub fn dump_path(&self, resolution: Resolution) -> Option<PathBuf> {
        let resource = self.resources.get(resolution)?;
        let dir = resource.local_filename.parent().unwrap_or(Path::new(""));
        Some(dir.join(resolution.dump_file_name(self.number)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_zero_padded() {
        assert_eq!(Resolution::Thumbnail.file_name(1), "page-001-thumbnail.jpg");
        assert_eq!(Resolution::Highres.file_name(120), "page-120-highres.jpg");
        assert_eq!(Resolution::Pdf.file_name(7), "page-007-highres.pdf");
        assert_eq!(Resolution::Highres.dump_file_name(7), "page-007-highres.dump");
    }

    #[test]
    fn image_file_names_parse_back_exactly() {
        assert_eq!(
            Resolution::parse_image_file_name("page-001-thumbnail.jpg"),
            Some((1, Resolution::Thumbnail))
        );
        assert_eq!(
            Resolution::parse_image_file_name("page-100-lowres.jpg"),
            Some((100, Resolution::Lowres))
        );
        assert_eq!(
            Resolution::parse_image_file_name("page-1234-highres.jpg"),
            Some((1234, Resolution::Highres))
        );
    }

    #[test]
    fn unrelated_file_names_do_not_parse() {
        for name in [
            "page-001-highres.dump",
            "page-001-highres.pdf",
            "page--highres.jpg",
            "page-1a-highres.jpg",
            "page-001-medium.jpg",
            "page-001-highres-copy.jpg",
            "toc.json",
        ] {
            assert_eq!(Resolution::parse_image_file_name(name), None, "{name}");
        }
    }

    #[test]
    fn page_numbers_accept_strings_and_integers() -> anyhow::Result<()> {
        let entries: Vec<TocEntryRecord> = serde_json::from_str(
            r#"[{"page": "12", "page_title": "City", "page_folder": "p12"},
                {"page": 13, "page_folder": "p13"},
                {"page": "xiv", "page_folder": "p14"}]"#,
        )?;
        assert_eq!(entries[0].page.parse(), Some(12));
        assert_eq!(entries[1].page.parse(), Some(13));
        assert_eq!(entries[1].page_title, None);
        assert_eq!(entries[2].page.parse(), None);
        Ok(())
    }
}
