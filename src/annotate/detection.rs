use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::RgbImage;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use super::AnnotateConfigs;
use super::annotate_utils::{clamp_box, rect_intersect};
use super::color::{get_class_color, get_text_color};
use crate::predict::Detection;

/// Draw boxes and, when a font is available, class labels
pub fn draw_detections(
    img: &mut RgbImage,
    detections: &[Detection],
    configs: &AnnotateConfigs,
    font: Option<&FontRef>,
) {
    let show_box = configs.show_box;
    let show_label = configs.show_label && show_box;
    let show_conf = configs.show_conf && show_label;

    if !show_box || detections.is_empty() {
        return;
    }

    let (width, height) = img.dimensions();

    // Scale line and text with image size (reference 640x640)
    let max_dim = width.max(height) as f32;
    let scale_factor = (max_dim / 640.0).max(1.0);
    let thickness = scale_factor.round().max(1.0) as i32;
    let font_scale = (11.0 * scale_factor).max(10.0);

    // Occupied label areas, to avoid stacking labels on top of each other
    let mut labels_rects: Vec<Rect> = Vec::new();

    for det in detections {
        let Some((x1, y1, x2, y2)) = clamp_box(det.xyxy, width, height) else {
            continue;
        };
        let color = get_class_color(det.class_id);

        for t in 0..thickness {
            let tx1 = (x1 + t).min(x2);
            let ty1 = (y1 + t).min(y2);
            let tx2 = (x2 - t).max(tx1);
            let ty2 = (y2 - t).max(ty1);
            if tx2 > tx1 && ty2 > ty1 {
                let rect = Rect::at(tx1, ty1).of_size((tx2 - tx1) as u32, (ty2 - ty1) as u32);
                draw_hollow_rect_mut(img, rect, color);
            }
        }

        if !show_label {
            continue;
        }
        let Some(f) = font else {
            continue;
        };

        let label = if show_conf {
            format!("{} {:.2}", det.name, det.confidence)
        } else {
            det.name.clone()
        };

        let scale = PxScale::from(font_scale);
        let scaled_font = f.as_scaled(scale);
        let text_w: f32 = label
            .chars()
            .map(|c| scaled_font.h_advance(scaled_font.glyph_id(c)))
            .sum();
        let text_w = text_w.ceil() as i32;
        let text_h = scale.y.ceil() as i32;

        let Some(label_rect) = place_label(
            (x1, y1),
            (text_w, text_h),
            (width as i32, height as i32),
            &labels_rects,
        ) else {
            continue;
        };
        labels_rects.push(label_rect);

        draw_filled_rect_mut(img, label_rect, color);
        draw_text_mut(
            img,
            get_text_color(color),
            label_rect.left(),
            label_rect.top(),
            scale,
            f,
            &label,
        );
    }
}

/// Find a spot for a label of `size` near the box corner `anchor`.
///
/// Prefers just above the box, moves inside when clipped, then steps down (and right)
/// past existing labels. Returns `None` if the label cannot fit in the image.
fn place_label(
    anchor: (i32, i32),
    size: (i32, i32),
    image: (i32, i32),
    occupied: &[Rect],
) -> Option<Rect> {
    let (x1, y1) = anchor;
    let (text_w, text_h) = size;
    let (width, height) = image;
    if text_w <= 0 || text_h <= 0 || text_w >= width || text_h >= height {
        return None;
    }

    let top_choice = if y1 - text_h < 0 { y1 } else { y1 - text_h };
    let mut text_x = x1.clamp(0, width - text_w - 1);
    let mut text_y = top_choice.min(height - text_h - 1);
    let mut current = Rect::at(text_x, text_y).of_size(text_w as u32, text_h as u32);

    for _ in 0..10 {
        if !occupied.iter().any(|r| rect_intersect(&current, r)) {
            break;
        }
        text_y += text_h;
        if text_y + text_h >= height {
            text_y = top_choice.min(height - text_h - 1);
            text_x += 10;
            if text_x + text_w >= width {
                break;
            }
        }
        current = Rect::at(text_x, text_y).of_size(text_w as u32, text_h as u32);
    }

    let fits = current.left() >= 0
        && current.top() >= 0
        && current.left() + text_w < width
        && current.top() + text_h < height;
    fits.then_some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_above_box() {
        let rect = place_label((50, 100), (40, 12), (640, 480), &[]).unwrap();
        assert_eq!((rect.left(), rect.top()), (50, 88));
    }

    #[test]
    fn test_label_moves_inside_at_top_edge() {
        let rect = place_label((50, 3), (40, 12), (640, 480), &[]).unwrap();
        assert_eq!(rect.top(), 3);
    }

    #[test]
    fn test_label_steps_past_occupied() {
        let first = place_label((50, 100), (40, 12), (640, 480), &[]).unwrap();
        let second = place_label((55, 100), (40, 12), (640, 480), &[first]).unwrap();
        assert!(!rect_intersect(&first, &second));
    }

    #[test]
    fn test_label_too_large() {
        assert!(place_label((0, 0), (700, 12), (640, 480), &[]).is_none());
    }
}
