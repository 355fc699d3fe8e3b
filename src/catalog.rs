//! Publication and edition codes listed on the publisher's archive page.

use scraper::{Html, Selector};

use crate::client::Session;
use crate::{Error, Result};

const REGION_UNAVAILABLE: &str = "This website is currently not available in your region.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    pub label: String,
    pub code: String,
}

pub async fn fetch_publications(session: &Session, archive_url: &str) -> Result<Vec<CodeEntry>> {
    let html = fetch_archive_page(session, archive_url).await?;
    parse_codes_blocking(html, "Publications").await
}

pub async fn fetch_editions(
    session: &Session,
    archive_url: &str,
    publication: &str,
) -> Result<Vec<CodeEntry>> {
    let url = edition_archive_url(archive_url, publication);
    let html = fetch_archive_page(session, &url).await?;
    parse_codes_blocking(html, "Editions").await
}

/// `{archive_url}&PUB={publication}`
pub fn edition_archive_url(archive_url: &str, publication: &str) -> String {
    let separator = if archive_url.contains('?') { '&' } else { '?' };
    format!("{archive_url}{separator}PUB={publication}")
}

pub fn ensure_code(entries: &[CodeEntry], kind: &'static str, code: &str) -> Result<()> {
    if entries.iter().any(|entry| entry.code == code) {
        Ok(())
    } else {
        Err(Error::UnknownCode {
            kind,
            code: code.to_owned(),
        })
    }
}

async fn fetch_archive_page(session: &Session, url: &str) -> Result<String> {
    tracing::debug!(%url, "fetching archive page");
    let html = session
        .get_text(url)
        .await
        .map_err(|failure| Error::CatalogFetch {
            url: url.to_owned(),
            reason: failure.to_string(),
        })?;
    if html.contains(REGION_UNAVAILABLE) {
        return Err(Error::RegionUnavailable);
    }
    Ok(html)
}

async fn parse_codes_blocking(html: String, select_id: &'static str) -> Result<Vec<CodeEntry>> {
    let entries = tokio::task::spawn_blocking(move || parse_codes(&html, select_id)).await??;
    tracing::debug!(select_id, count = entries.len(), "parsed archive codes");
    Ok(entries)
}

/// Reads `<option value="CODE">Label</option>` items of `<select id="{select_id}">`.
pub fn parse_codes(html: &str, select_id: &str) -> Result<Vec<CodeEntry>> {
    let doc = Html::parse_document(html);
    let selector_str = format!(r#"[id="{select_id}"] option"#);
    let selector = Selector::parse(&selector_str).map_err(|_| Error::CatalogFetch {
        url: String::new(),
        reason: format!("invalid selector: {selector_str}"),
    })?;

    let mut entries = Vec::new();
    for option in doc.select(&selector) {
        let Some(code) = option.value().attr("value").map(str::trim) else {
            continue;
        };
        if code.is_empty() {
            continue;
        }
        let label = option.text().collect::<String>().trim().to_owned();
        entries.push(CodeEntry {
            label,
            code: code.to_owned(),
        });
    }
    Ok(entries)
}
