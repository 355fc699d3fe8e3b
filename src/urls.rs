use std::path::Path;

use crate::client::Session;
use crate::edition::EditionSelector;
use crate::formats::{PageEntry, PageMetaRecord, PageResourceSet, PageResources, Resolution, Resource};
use crate::toc::repository_url;
use crate::{Error, Result};

pub const PAGE_META_FILE_NAME: &str = "page.json";

/// `{site}/Repository/{pub}/{edition}/{YYYYMMDD}/{folder}`
pub fn page_base_url(site_url: &str, selector: &EditionSelector, folder: &str) -> String {
    format!("{}/{folder}", repository_url(site_url, selector))
}

/// Resource set with a known PDF name (or none), no network involved.
pub fn page_resources(
    base_url: &str,
    entry: &PageEntry,
    cache_dir: &Path,
    pdf_name: Option<&str>,
) -> PageResources {
    let image = |resolution: Resolution| {
        let remote = resolution.remote_name().unwrap_or_default();
        Resource::new(
            format!("{base_url}/{remote}"),
            cache_dir.join(resolution.file_name(entry.number)),
        )
    };

    let pdf = pdf_name.map(|name| {
        Resource::new(
            format!("{base_url}/{name}"),
            cache_dir.join(Resolution::Pdf.file_name(entry.number)),
        )
    });

    PageResources {
        number: entry.number,
        title: entry.title.clone(),
        folder: entry.folder.clone(),
        resources: PageResourceSet {
            thumbnail: image(Resolution::Thumbnail),
            lowres: image(Resolution::Lowres),
            highres: image(Resolution::Highres),
            pdf,
        },
    }
}

/// Builds every resource URL for `entry`. The PDF name needs one `page.json`
/// request; when that fails the page simply has no PDF.
pub async fn build_page_urls(
    session: &Session,
    site_url: &str,
    selector: &EditionSelector,
    entry: &PageEntry,
    cache_dir: &Path,
) -> PageResources {
    let base_url = page_base_url(site_url, selector, &entry.folder);

    let pdf_name = match lookup_pdf_name(session, &base_url).await {
        Ok(name) => Some(name),
        Err(err) => {
            tracing::warn!(page = entry.number, %err, "no pdf for page");
            None
        }
    };

    page_resources(&base_url, entry, cache_dir, pdf_name.as_deref())
}

async fn lookup_pdf_name(session: &Session, base_url: &str) -> Result<String> {
    let url = format!("{base_url}/{PAGE_META_FILE_NAME}");
    let lookup_error = |reason: String| Error::PageMetadataLookup {
        url: url.clone(),
        reason,
    };

    let body = session
        .get_bytes(&url)
        .await
        .map_err(|failure| lookup_error(failure.to_string()))?;
    let meta: PageMetaRecord =
        serde_json::from_slice(&body).map_err(|err| lookup_error(format!("invalid json: {err}")))?;

    match meta.pdf.map(|name| name.trim().to_owned()) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(lookup_error("missing 'pdf' field".to_owned())),
    }
}
