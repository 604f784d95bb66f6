//! Jacket download and preview cropping.

use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;

use bytes::Bytes;
use image::ImageFormat;
use rand::Rng;
use tracing::debug;

use crate::game::JacketSource;
use crate::{AppError, Result};

/// Downloads jackets over HTTP from a fixed base URL.
#[derive(Clone)]
pub struct HttpJacketSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpJacketSource {
    /// Create a source rooted at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl JacketSource for HttpJacketSource {
    fn fetch<'a>(
        &'a self,
        jacket: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Bytes>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.url(jacket);
            debug!(%url, "fetching jacket");
            let bytes = self
                .client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            Ok(bytes)
        })
    }

    fn url(&self, jacket: &str) -> String {
        jacket_url(&self.base_url, jacket)
    }
}

/// Join a jacket file name onto the jacket base URL.
#[must_use]
pub fn jacket_url(base_url: &str, jacket: &str) -> String {
    format!("{}/{jacket}", base_url.trim_end_matches('/'))
}

/// Cut a random `size`×`size` square out of an encoded image and return it as PNG.
///
/// # Errors
///
/// Returns `AppError::Image` if the bytes are not a decodable image or the
/// image is smaller than the requested square.
pub fn crop_random(encoded: &[u8], size: u32) -> Result<Vec<u8>> {
    crop_with_rng(encoded, size, &mut rand::thread_rng())
}

/// [`crop_random`] with a caller-supplied random source.
///
/// # Errors
///
/// Same as [`crop_random`].
pub fn crop_with_rng<R: Rng + ?Sized>(encoded: &[u8], size: u32, rng: &mut R) -> Result<Vec<u8>> {
    let img = image::load_from_memory(encoded)?;
    let (width, height) = (img.width(), img.height());
    if width < size || height < size {
        return Err(AppError::Image(format!(
            "jacket is {width}x{height}, smaller than the {size}px crop"
        )));
    }

    let x = rng.gen_range(0..=width - size);
    let y = rng.gen_range(0..=height - size);
    let cropped = img.crop_imm(x, y, size, size);

    let mut out = Cursor::new(Vec::new());
    cropped.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}
