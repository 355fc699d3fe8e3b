//! HTTP session shared by every step of one pipeline run.

use std::time::Duration;

use rand::Rng as _;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use tokio_util::sync::CancellationToken;

use crate::config::{HttpConfig, PolitenessDelay};
use crate::{Error, Result};

/// Why a GET did not produce a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    Status(StatusCode),
    Transport(String),
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(status) => write!(f, "HTTP {status}"),
            Self::Transport(message) => write!(f, "transport error: {message}"),
        }
    }
}

/// Result of one image request, tagged by what the body turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageResponse {
    Decoded(Vec<u8>),
    NotAnImage(Vec<u8>),
    HttpStatus(StatusCode),
    Transport(String),
}

impl From<FetchFailure> for ImageResponse {
    fn from(failure: FetchFailure) -> Self {
        match failure {
            FetchFailure::Status(status) => Self::HttpStatus(status),
            FetchFailure::Transport(message) => Self::Transport(message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    client: reqwest::Client,
    user_agent: String,
    delay: PolitenessDelay,
}

impl Session {
    pub fn new(http: &HttpConfig, delay: PolitenessDelay) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs.max(1)))
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            user_agent: http.user_agent.clone(),
            delay,
        })
    }

    /// Single GET; any non-2xx status is a failure.
    pub async fn get_bytes(&self, url: &str) -> core::result::Result<Vec<u8>, FetchFailure> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(|err| FetchFailure::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%url, %status, "request failed");
            return Err(FetchFailure::Status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| FetchFailure::Transport(format!("read body: {err}")))?;
        Ok(body.to_vec())
    }

    pub async fn get_text(&self, url: &str) -> core::result::Result<String, FetchFailure> {
        let body = self.get_bytes(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Waits out the politeness delay, then requests and decodes an image.
    pub async fn fetch_image(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ImageResponse> {
        self.pace(cancel).await?;

        let body = match self.get_bytes(url).await {
            Ok(body) => body,
            Err(failure) => return Ok(failure.into()),
        };
        decode_image(body).await
    }

    /// Sleeps for a random duration within the configured bounds.
    pub async fn pace(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let pause = pick_delay(self.delay);
        if pause.is_zero() {
            return Ok(());
        }

        tracing::debug!(pause_ms = pause.as_millis() as u64, "politeness delay");
        tokio::select! {
            () = cancel.cancelled() => Err(Error::Cancelled),
            () = tokio::time::sleep(pause) => Ok(()),
        }
    }
}

fn pick_delay(delay: PolitenessDelay) -> Duration {
    if delay.min >= delay.max {
        return delay.min;
    }
    rand::thread_rng().gen_range(delay.min..=delay.max)
}

/// Checks that `body` decodes as a raster image, keeping the bytes either way.
pub async fn decode_image(body: Vec<u8>) -> Result<ImageResponse> {
    let response = tokio::task::spawn_blocking(move || match image::load_from_memory(&body) {
        Ok(_) => ImageResponse::Decoded(body),
        Err(err) => {
            tracing::debug!(?err, len = body.len(), "response is not a decodable image");
            ImageResponse::NotAnImage(body)
        }
    })
    .await?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes() -> anyhow::Result<Vec<u8>> {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 10, 10]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }

    #[tokio::test]
    async fn decode_image_tags_valid_and_invalid_bodies() -> anyhow::Result<()> {
        let png = png_bytes()?;
        assert_eq!(
            decode_image(png.clone()).await?,
            ImageResponse::Decoded(png)
        );

        let html = b"<html>maintenance</html>".to_vec();
        assert_eq!(
            decode_image(html.clone()).await?,
            ImageResponse::NotAnImage(html)
        );
        Ok(())
    }

    #[tokio::test]
    async fn truncated_png_is_not_an_image() -> anyhow::Result<()> {
        let mut png = png_bytes()?;
        png.truncate(png.len() / 2);
        assert!(matches!(
            decode_image(png).await?,
            ImageResponse::NotAnImage(_)
        ));
        Ok(())
    }

    #[test]
    fn pick_delay_stays_within_bounds() {
        let delay = PolitenessDelay::new(Duration::from_millis(15), Duration::from_millis(30));
        for _ in 0..100 {
            let pause = pick_delay(delay);
            assert!(pause >= delay.min && pause <= delay.max, "{pause:?}");
        }
        assert_eq!(pick_delay(PolitenessDelay::none()), Duration::ZERO);
    }

    #[tokio::test]
    async fn pace_observes_cancellation() -> anyhow::Result<()> {
        let session = Session::new(
            &HttpConfig::default(),
            PolitenessDelay::new(Duration::from_secs(60), Duration::from_secs(60)),
        )?;
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(session.pace(&cancel).await, Err(Error::Cancelled)));
        Ok(())
    }
}
