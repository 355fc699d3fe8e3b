use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::Value;

use crate::edition::EditionSelector;
use crate::formats::{PageResources, Resolution};
use crate::report::{MIN_SAVED_RESOLUTIONS, PAGE_METADATA_FILE_NAME};
use crate::toc::TOC_FILE_NAME;
use crate::{Error, Result};

/// An edition with a `toc.json` somewhere under the cache root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CachedEdition {
    pub publication: String,
    pub edition: String,
    pub date: NaiveDate,
    pub dir: PathBuf,
}

/// Everything persisted for a previously attempted edition.
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub toc: Value,
    pub pages: Vec<PageResources>,
}

pub fn edition_dir(cache_root: &Path, selector: &EditionSelector) -> PathBuf {
    selector.cache_dir(cache_root)
}

/// Lists `root/<pub>/<edition>/<YYYY-MM-DD>` directories that hold a `toc.json`.
pub fn find_cached_editions(cache_root: &Path) -> Result<Vec<CachedEdition>> {
    let mut found = Vec::new();
    if !cache_root.is_dir() {
        return Ok(found);
    }

    let mut stack = vec![(cache_root.to_path_buf(), 0_usize)];
    while let Some((current, depth)) = stack.pop() {
        if depth == 3 {
            if current.join(TOC_FILE_NAME).is_file() {
                if let Some(edition) = cached_edition_from_dir(cache_root, &current) {
                    found.push(edition);
                }
            }
            continue;
        }

        for entry in std::fs::read_dir(&current).map_err(|err| Error::fs(&current, err))? {
            let entry = entry.map_err(|err| Error::fs(&current, err))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push((path, depth + 1));
            }
        }
    }

    found.sort();
    Ok(found)
}

fn cached_edition_from_dir(cache_root: &Path, dir: &Path) -> Option<CachedEdition> {
    let relative = dir.strip_prefix(cache_root).ok()?;
    let mut parts = relative.iter().filter_map(|part| part.to_str());
    let publication = parts.next()?.to_owned();
    let edition = parts.next()?.to_owned();
    let date = NaiveDate::parse_from_str(parts.next()?, "%Y-%m-%d").ok()?;
    Some(CachedEdition {
        publication,
        edition,
        date,
        dir: dir.to_path_buf(),
    })
}

impl CachedEdition {
    pub fn load(&self) -> Result<Option<CachedSnapshot>> {
        load_dir(&self.dir)
    }
}

impl CachedSnapshot {
    /// Pages whose metadata records at least two saved images.
    pub fn complete_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|page| {
                Resolution::IMAGES
                    .into_iter()
                    .filter_map(|resolution| page.resources.get(resolution))
                    .filter(|resource| resource.exists_on_disk)
                    .count()
                    >= MIN_SAVED_RESOLUTIONS
            })
            .count()
    }
}

/// Reads back `toc.json` and `page_metadata.json`; `None` unless both exist.
pub fn load_edition(cache_root: &Path, selector: &EditionSelector) -> Result<Option<CachedSnapshot>> {
    load_dir(&edition_dir(cache_root, selector))
}

fn load_dir(dir: &Path) -> Result<Option<CachedSnapshot>> {
    let toc_path = dir.join(TOC_FILE_NAME);
    let metadata_path = dir.join(PAGE_METADATA_FILE_NAME);
    if !toc_path.is_file() || !metadata_path.is_file() {
        return Ok(None);
    }

    let toc_json = std::fs::read(&toc_path).map_err(|err| Error::fs(&toc_path, err))?;
    let metadata_json =
        std::fs::read(&metadata_path).map_err(|err| Error::fs(&metadata_path, err))?;

    Ok(Some(CachedSnapshot {
        toc: serde_json::from_slice(&toc_json)?,
        pages: serde_json::from_slice(&metadata_json)?,
    }))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::formats::PageEntry;
    use crate::urls::page_resources;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn finds_only_edition_dirs_with_toc() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let root = temp.path();

        let with_toc = root.join("TOI").join("BOM").join("2024-03-07");
        fs::create_dir_all(&with_toc)?;
        fs::write(with_toc.join("toc.json"), "{}")?;

        let other_toc = root.join("ET").join("DEL").join("2024-03-06");
        fs::create_dir_all(&other_toc)?;
        fs::write(other_toc.join("toc.json"), "{}")?;

        fs::create_dir_all(root.join("TOI").join("BOM").join("2024-03-08"))?;
        let not_a_date = root.join("TOI").join("BOM").join("misc");
        fs::create_dir_all(&not_a_date)?;
        fs::write(not_a_date.join("toc.json"), "{}")?;

        let found = find_cached_editions(root)?;
        let triples = found
            .iter()
            .map(|e| (e.publication.as_str(), e.edition.as_str(), e.date))
            .collect::<Vec<_>>();
        assert_eq!(
            triples,
            vec![
                ("ET", "DEL", date(2024, 3, 6)),
                ("TOI", "BOM", date(2024, 3, 7)),
            ]
        );
        Ok(())
    }

    #[test]
    fn missing_cache_root_has_no_editions() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        assert!(find_cached_editions(&temp.path().join("absent"))?.is_empty());
        Ok(())
    }

    #[test]
    fn load_edition_needs_toc_and_metadata() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let day = date(2024, 3, 7);
        let selector = EditionSelector::new("TOI", "BOM", day, day)?;
        let dir = edition_dir(temp.path(), &selector);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(TOC_FILE_NAME), r#"{"toc": []}"#)?;

        assert!(load_edition(temp.path(), &selector)?.is_none());

        let entry = PageEntry {
            number: 1,
            title: "Front".to_owned(),
            folder: "p1".to_owned(),
        };
        let pages = vec![page_resources("http://site/p1", &entry, &dir, Some("p1.pdf"))];
        fs::write(
            dir.join(PAGE_METADATA_FILE_NAME),
            serde_json::to_vec(&pages)?,
        )?;

        let snapshot = load_edition(temp.path(), &selector)?.expect("snapshot");
        assert_eq!(snapshot.pages, pages);
        assert!(snapshot.toc.get("toc").is_some());
        Ok(())
    }

    #[test]
    fn complete_pages_counts_recorded_images() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let day = date(2024, 3, 7);
        let selector = EditionSelector::new("TOI", "BOM", day, day)?;
        let dir = edition_dir(temp.path(), &selector);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(TOC_FILE_NAME), r#"{"toc": []}"#)?;

        let mut pages = [1, 2, 3]
            .map(|number| {
                let entry = PageEntry {
                    number,
                    title: String::new(),
                    folder: format!("p{number}"),
                };
                page_resources("http://site/p", &entry, &dir, None)
            })
            .to_vec();
        pages[0].resources.thumbnail.exists_on_disk = true;
        pages[0].resources.highres.exists_on_disk = true;
        pages[1].resources.thumbnail.exists_on_disk = true;
        pages[1].resources.lowres.exists_on_disk = true;
        pages[2].resources.lowres.exists_on_disk = true;
        fs::write(
            dir.join(PAGE_METADATA_FILE_NAME),
            serde_json::to_vec(&pages)?,
        )?;

        let editions = find_cached_editions(temp.path())?;
        assert_eq!(editions.len(), 1);
        let snapshot = editions[0].load()?.expect("snapshot");
        assert_eq!(snapshot.pages.len(), 3);
        assert_eq!(snapshot.complete_pages(), 2);
        Ok(())
    }
}
