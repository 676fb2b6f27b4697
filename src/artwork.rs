use crate::app::config::settings::DEFAULT_ACCENT;
use crate::error::RemoteResult;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Key faces are 144px square.
const KEY_SIZE: u32 = 144;
/// Colour sampling works on a small thumbnail.
const SAMPLE_SIZE: u32 = 50;

/// Album art ready for the album-art key, plus its accent colour.
#[derive(Debug, Clone, PartialEq)]
pub struct Artwork {
    pub data_url: String,
    pub accent: String,
}

impl Artwork {
    /// Decoding and resizing are CPU-bound, so they run off the event loop.
    pub async fn load(bytes: Vec<u8>) -> RemoteResult<Self> {
        tokio::task::spawn_blocking(move || Self::decode(&bytes)).await?
    }

    pub fn decode(bytes: &[u8]) -> RemoteResult<Self> {
        let img = image::load_from_memory(bytes)?;
        let accent = dominant_color(&img);

        let face = img.resize_to_fill(KEY_SIZE, KEY_SIZE, FilterType::Triangle);
        let mut png = Cursor::new(Vec::new());
        face.write_to(&mut png, ImageFormat::Png)?;

        Ok(Self {
            data_url: format!("data:image/png;base64,{}", STANDARD.encode(png.into_inner())),
            accent,
        })
    }
}

/// Average of the saturated mid-brightness pixels, with a small saturation
/// boost. Greyscale or blown-out art falls back to the default accent.
pub fn dominant_color(img: &DynamicImage) -> String {
    let sample = img
        .resize_exact(SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Triangle)
        .to_rgb8();

    let (mut r, mut g, mut b, mut count) = (0u64, 0u64, 0u64, 0u64);
    for pixel in sample.pixels() {
        let [pr, pg, pb] = pixel.0;
        let brightness = (pr as f64 + pg as f64 + pb as f64) / 3.0;
        if brightness <= 30.0 || brightness >= 220.0 {
            continue;
        }
        let max = pr.max(pg).max(pb) as f64;
        let min = pr.min(pg).min(pb) as f64;
        if max > 0.0 && (max - min) / max > 0.2 {
            r += pr as u64;
            g += pg as u64;
            b += pb as u64;
            count += 1;
        }
    }

    if count == 0 {
        return DEFAULT_ACCENT.to_string();
    }

    let avg = |sum: u64| (sum as f64 / count as f64).round();
    let (r, g, b) = (avg(r), avg(g), avg(b));
    let min = r.min(g).min(b);
    let boost = |c: f64| (c + (c - min) * 0.2).round().min(255.0) as u8;

    format!("#{:02x}{:02x}{:02x}", boost(r), boost(g), boost(b))
}
