// -- submodules
mod annotate_utils;
mod color;
mod detection;
mod font;

use detection::draw_detections;
use font::load_font;
use serde::Deserialize;

// -- external imports
use ab_glyph::FontRef;
use image::{DynamicImage, GenericImageView, RgbImage};

use crate::error::Result;
use crate::predict::Detection;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnnotateConfigs {
    /// whether to draw on a blank image
    pub on_blank: bool,

    /// whether to show boxes
    pub show_box: bool,

    /// whether to show class labels
    pub show_label: bool,

    /// whether to show confidence scores
    pub show_conf: bool,
}

impl Default for AnnotateConfigs {
    fn default() -> Self {
        Self {
            on_blank: false,
            show_box: true,
            show_label: true,
            show_conf: true,
        }
    }
}

/// Draw detections on a copy of `img` (or on a blank canvas of the same size).
pub fn annotate_image(
    img: &DynamicImage,
    detections: &[Detection],
    configs: &AnnotateConfigs,
) -> Result<DynamicImage> {
    let show_label = configs.show_label && configs.show_box;

    let mut annotated = if configs.on_blank {
        let (w, h) = img.dimensions();
        RgbImage::new(w, h)
    } else {
        img.to_rgb8()
    };

    // Labels need a font; pick the unicode one only when a class name requires it
    let font_data = if show_label && !detections.is_empty() {
        let use_unicode_font = detections.iter().any(|d| !d.name.is_ascii());
        let font_name = if use_unicode_font {
            "Arial.Unicode.ttf"
        } else {
            "Arial.ttf"
        };
        load_font(font_name)
    } else {
        None
    };

    let font = font_data
        .as_deref()
        .and_then(|data| FontRef::try_from_slice(data).ok());
    if show_label && font.is_none() && !detections.is_empty() {
        tracing::warn!("No font available, drawing boxes without labels");
    }

    draw_detections(&mut annotated, detections, configs, font.as_ref());

    Ok(DynamicImage::ImageRgb8(annotated))
}
