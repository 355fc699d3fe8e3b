//! Narrows a page list to the pages that still need downloading.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::formats::{PageResources, Resolution};
use crate::{Error, Result};

/// Image files already in the cache directory, keyed by page number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingFiles {
    by_page: BTreeMap<u32, BTreeSet<Resolution>>,
}

impl ExistingFiles {
    pub fn scan(cache_dir: &Path) -> Result<Self> {
        let mut existing = Self::default();
        let entries = match std::fs::read_dir(cache_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(existing),
            Err(err) => return Err(Error::fs(cache_dir, err)),
        };

        for entry in entries {
            let entry = entry.map_err(|err| Error::fs(cache_dir, err))?;
            let is_file = entry
                .file_type()
                .map_err(|err| Error::fs(entry.path(), err))?
                .is_file();
            if !is_file {
                continue;
            }
            let file_name = entry.file_name();
            let Some((number, resolution)) = file_name
                .to_str()
                .and_then(Resolution::parse_image_file_name)
            else {
                continue;
            };
            existing.by_page.entry(number).or_default().insert(resolution);
        }

        Ok(existing)
    }

    pub fn is_empty(&self) -> bool {
        self.by_page.is_empty()
    }

    pub fn contains(&self, page_number: u32, resolution: Resolution) -> bool {
        self.by_page
            .get(&page_number)
            .is_some_and(|saved| saved.contains(&resolution))
    }

    pub fn resolutions(&self, page_number: u32) -> BTreeSet<Resolution> {
        self.by_page.get(&page_number).cloned().unwrap_or_default()
    }

    /// Thumbnail and high-res present; low-res is only a fallback.
    pub fn is_complete(&self, page_number: u32) -> bool {
        self.contains(page_number, Resolution::Thumbnail)
            && self.contains(page_number, Resolution::Highres)
    }
}

/// Pages of `pages` that still lack their thumbnail or high-res image.
///
/// A cache without any page images yields every page unchanged. Library
/// callers use this directly; [`crate::download::run`] scans once with
/// [`ExistingFiles::scan`] and calls [`missing_pages`] because it also needs
/// the scan for `exists_on_disk` and cached outcomes.
pub fn plan_missing<'a>(
    pages: &'a [PageResources],
    cache_dir: &Path,
) -> Result<Vec<&'a PageResources>> {
    let existing = ExistingFiles::scan(cache_dir)?;
    Ok(missing_pages(pages, &existing))
}

pub fn missing_pages<'a>(
    pages: &'a [PageResources],
    existing: &ExistingFiles,
) -> Vec<&'a PageResources> {
    if existing.is_empty() {
        return pages.iter().collect();
    }
    pages
        .iter()
        .filter(|page| !existing.is_complete(page.number))
        .collect()
}

/// Updates every resource's `exists_on_disk` flag.
pub fn refresh_presence(pages: &mut [PageResources], existing: &ExistingFiles) {
    for page in pages {
        for resolution in Resolution::IMAGES {
            if let Some(resource) = page.resources.get_mut(resolution) {
                resource.exists_on_disk = existing.contains(page.number, resolution);
            }
        }
        if let Some(pdf) = page.resources.pdf.as_mut() {
            pdf.exists_on_disk = pdf.local_filename.is_file();
        }
    }
}
