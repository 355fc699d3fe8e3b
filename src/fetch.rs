//! Tiered image download for one page: thumbnail, then high-res with retries,
//! then low-res when high-res never produced a usable image (or always, with
//! [`LowresMode::Always`]).

use std::collections::BTreeSet;
use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::client::{ImageResponse, Session};
use crate::config::DEFAULT_HIGHRES_ATTEMPTS;
use crate::formats::{PageResources, Resolution};
use crate::report::DownloadOutcome;
use crate::{Error, Result};

/// Progress of one resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierState {
    Pending,
    /// `n` attempts have failed so far.
    Retrying(u32),
    Saved,
    /// Budget spent; the next lower tier should be tried.
    ExhaustedFallback,
    /// Budget spent and nothing below this tier.
    ExhaustedTerminal,
}

impl TierState {
    pub fn failed_attempts(self) -> u32 {
        match self {
            Self::Retrying(n) => n,
            _ => 0,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(
            self,
            Self::Saved | Self::ExhaustedFallback | Self::ExhaustedTerminal
        )
    }

    pub fn is_exhausted(self) -> bool {
        matches!(self, Self::ExhaustedFallback | Self::ExhaustedTerminal)
    }

    pub fn after_success(self) -> Self {
        Self::Saved
    }

    pub fn after_failure(self, policy: &TierPolicy) -> Self {
        if self.is_finished() {
            return self;
        }
        let failed = self.failed_attempts() + 1;
        if failed < policy.attempts {
            Self::Retrying(failed)
        } else if policy.falls_back {
            Self::ExhaustedFallback
        } else {
            Self::ExhaustedTerminal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicy {
    pub resolution: Resolution,
    pub attempts: u32,
    pub falls_back: bool,
    /// Keep the raw body when the last attempt was not a decodable image.
    pub dumps_undecodable: bool,
}

impl TierPolicy {
    pub const fn thumbnail() -> Self {
        Self {
            resolution: Resolution::Thumbnail,
            attempts: 1,
            falls_back: false,
            dumps_undecodable: true,
        }
    }

    pub fn highres(attempts: u32) -> Self {
        Self {
            resolution: Resolution::Highres,
            attempts: attempts.max(1),
            falls_back: true,
            dumps_undecodable: true,
        }
    }

    pub const fn lowres() -> Self {
        Self {
            resolution: Resolution::Lowres,
            attempts: 1,
            falls_back: false,
            dumps_undecodable: false,
        }
    }
}

/// When the low-res tier runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LowresMode {
    /// Only after high-res exhausted its attempts.
    #[default]
    Fallback,
    /// After every high-res tier, whatever its result.
    Always,
}

pub struct FetchEngine<'a> {
    session: &'a Session,
    highres_attempts: u32,
    lowres_mode: LowresMode,
}

impl<'a> FetchEngine<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            highres_attempts: DEFAULT_HIGHRES_ATTEMPTS,
            lowres_mode: LowresMode::default(),
        }
    }

    pub fn with_highres_attempts(mut self, attempts: u32) -> Self {
        self.highres_attempts = attempts.max(1);
        self
    }

    pub fn with_lowres_mode(mut self, mode: LowresMode) -> Self {
        self.lowres_mode = mode;
        self
    }

    /// Downloads the page's images. Existing files are not checked here; the
    /// planner decides which pages reach this point. PDFs are never fetched.
    pub async fn fetch_and_save_page(
        &self,
        page: &PageResources,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome> {
        let mut saved = BTreeSet::new();

        let thumbnail = self.run_tier(page, &TierPolicy::thumbnail(), cancel).await?;
        if thumbnail == TierState::Saved {
            saved.insert(Resolution::Thumbnail);
        }

        let highres = self
            .run_tier(page, &TierPolicy::highres(self.highres_attempts), cancel)
            .await?;
        if highres == TierState::Saved {
            saved.insert(Resolution::Highres);
        }

        let run_lowres = match self.lowres_mode {
            LowresMode::Fallback => highres == TierState::ExhaustedFallback,
            LowresMode::Always => true,
        };
        if run_lowres {
            if highres != TierState::Saved {
                tracing::info!(page = page.number, "high-res unavailable; trying low-res");
            }
            let lowres = self.run_tier(page, &TierPolicy::lowres(), cancel).await?;
            if lowres == TierState::Saved {
                saved.insert(Resolution::Lowres);
            }
        }

        Ok(DownloadOutcome::downloaded(page.number, saved))
    }

    async fn run_tier(
        &self,
        page: &PageResources,
        policy: &TierPolicy,
        cancel: &CancellationToken,
    ) -> Result<TierState> {
        let Some(resource) = page.resources.get(policy.resolution) else {
            return Ok(TierState::ExhaustedTerminal);
        };

        let mut state = TierState::Pending;
        while !state.is_finished() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let attempt = state.failed_attempts() + 1;

            let response = self
                .session
                .fetch_image(&resource.source_url, cancel)
                .await?;
            state = match response {
                ImageResponse::Decoded(body) => {
                    // Stored as received, even when the body is not a JPEG.
                    if !is_jpeg(&body) {
                        tracing::warn!(
                            page = page.number,
                            resolution = %policy.resolution,
                            format = ?image::guess_format(&body).ok(),
                            "image is not a JPEG; saving original bytes"
                        );
                    }
                    write_file(&resource.local_filename, &body)?;
                    tracing::info!(
                        page = page.number,
                        resolution = %policy.resolution,
                        attempt,
                        bytes = body.len(),
                        "saved"
                    );
                    state.after_success()
                }
                ImageResponse::NotAnImage(body) => {
                    tracing::warn!(
                        page = page.number,
                        resolution = %policy.resolution,
                        attempt,
                        "response is not a decodable image"
                    );
                    let next = state.after_failure(policy);
                    if next.is_exhausted() && policy.dumps_undecodable {
                        if let Some(dump_path) = page.dump_path(policy.resolution) {
                            write_file(&dump_path, &body)?;
                            tracing::info!(path = %dump_path.display(), "saved raw response for inspection");
                        }
                    }
                    next
                }
                ImageResponse::HttpStatus(status) => {
                    tracing::warn!(
                        page = page.number,
                        resolution = %policy.resolution,
                        attempt,
                        %status,
                        "image request failed"
                    );
                    state.after_failure(policy)
                }
                ImageResponse::Transport(message) => {
                    tracing::warn!(
                        page = page.number,
                        resolution = %policy.resolution,
                        attempt,
                        error = %message,
                        "image request failed"
                    );
                    state.after_failure(policy)
                }
            };
        }

        Ok(state)
    }
}

fn is_jpeg(body: &[u8]) -> bool {
    matches!(image::guess_format(body), Ok(image::ImageFormat::Jpeg))
}

/// Writes through a sibling temp file so an interrupted write never leaves a
/// file the planner would take for complete.
fn write_file(path: &Path, body: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| Error::fs(parent, err))?;
    }
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = Path::new(&partial);

    std::fs::write(partial, body).map_err(|err| Error::fs(partial, err))?;
    std::fs::rename(partial, path).map_err(|err| Error::fs(path, err))?;
    Ok(())
}
