use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use crate::cli::{DownloadArgs, EditionsArgs};
use crate::client::Session;
use crate::config::AppConfig;
use crate::edition::{EditionSelector, available_dates, parse_date};
use crate::report::Summary;

pub async fn download(
    args: DownloadArgs,
    config: &AppConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<Summary> {
    let publication = args
        .publication
        .or_else(|| config.defaults.publication.clone())
        .ok_or_else(|| anyhow::anyhow!("--publication is required (no default configured)"))?;
    let edition = args
        .edition
        .or_else(|| config.defaults.edition.clone())
        .ok_or_else(|| anyhow::anyhow!("--edition is required (no default configured)"))?;

    let today = chrono::Local::now().date_naive();
    let date = match args.date.as_deref() {
        Some(raw) => parse_date(raw).context("parse --date")?,
        None => today,
    };
    let selector =
        EditionSelector::new(publication, edition, date, today).context("edition selection")?;

    let session = Session::new(&config.http, config.delay()).context("build http session")?;

    if args.verify_codes {
        let publications = crate::catalog::fetch_publications(&session, &config.archive_url)
            .await
            .context("fetch publication codes")?;
        crate::catalog::ensure_code(&publications, "publication", selector.publication())?;
        let editions =
            crate::catalog::fetch_editions(&session, &config.archive_url, selector.publication())
                .await
                .context("fetch edition codes")?;
        crate::catalog::ensure_code(&editions, "edition", selector.edition())?;
    }

    let summary = crate::download::run(&session, config, &selector, cancel, |outcome| {
        println!("{}", outcome.status_line());
    })
    .await
    .with_context(|| format!("download {selector}"))?;

    for line in summary.lines() {
        println!("{line}");
    }
    println!(
        "Saved to {}",
        selector.cache_dir(&config.cache_dir).display()
    );
    Ok(summary)
}

pub async fn publications(config: &AppConfig) -> anyhow::Result<()> {
    let session = Session::new(&config.http, config.delay()).context("build http session")?;
    let entries = crate::catalog::fetch_publications(&session, &config.archive_url)
        .await
        .context("fetch publication codes")?;
    for entry in entries {
        println!("{}\t{}", entry.code, entry.label);
    }
    Ok(())
}

pub async fn editions(args: EditionsArgs, config: &AppConfig) -> anyhow::Result<()> {
    let session = Session::new(&config.http, config.delay()).context("build http session")?;
    let entries = crate::catalog::fetch_editions(&session, &config.archive_url, &args.publication)
        .await
        .context("fetch edition codes")?;
    for entry in entries {
        println!("{}\t{}", entry.code, entry.label);
    }
    Ok(())
}

pub fn dates() {
    for date in available_dates(chrono::Local::now().date_naive()) {
        println!("{}", date.format("%Y-%m-%d"));
    }
}

pub fn cached(config: &AppConfig) -> anyhow::Result<()> {
    let editions = crate::cache::find_cached_editions(&config.cache_dir)
        .with_context(|| format!("scan cache: {}", config.cache_dir.display()))?;
    for edition in editions {
        let pages = match edition
            .load()
            .with_context(|| format!("read cached edition: {}", edition.dir.display()))?
        {
            Some(snapshot) => format!("{}/{}", snapshot.complete_pages(), snapshot.pages.len()),
            None => "-".to_owned(),
        };
        println!(
            "{}\t{}\t{}\t{pages}\t{}",
            edition.publication,
            edition.edition,
            edition.date.format("%Y-%m-%d"),
            edition.dir.display()
        );
    }
    Ok(())
}
