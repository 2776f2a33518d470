use image::Rgb;

/// Ultralytics default class palette
const PALETTE: [[u8; 3]; 20] = [
    [4, 42, 255],
    [11, 219, 235],
    [243, 243, 243],
    [0, 223, 183],
    [17, 31, 104],
    [255, 111, 221],
    [255, 68, 79],
    [204, 237, 0],
    [0, 243, 68],
    [189, 0, 255],
    [0, 180, 255],
    [221, 0, 186],
    [0, 255, 255],
    [38, 192, 0],
    [1, 255, 179],
    [125, 36, 255],
    [123, 0, 104],
    [255, 27, 108],
    [252, 109, 47],
    [162, 255, 11],
];

pub fn get_class_color(class_id: usize) -> Rgb<u8> {
    Rgb(PALETTE[class_id % PALETTE.len()])
}

/// Black or white, whichever reads better on `background`
pub fn get_text_color(background: Rgb<u8>) -> Rgb<u8> {
    let [r, g, b] = background.0;
    let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
    if luma > 140.0 {
        Rgb([0, 0, 0])
    } else {
        Rgb([255, 255, 255])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_wraps() {
        assert_eq!(get_class_color(0), get_class_color(20));
        assert_ne!(get_class_color(0), get_class_color(1));
    }

    #[test]
    fn test_text_contrast() {
        assert_eq!(get_text_color(Rgb([243, 243, 243])), Rgb([0, 0, 0]));
        assert_eq!(get_text_color(Rgb([17, 31, 104])), Rgb([255, 255, 255]));
    }
}
