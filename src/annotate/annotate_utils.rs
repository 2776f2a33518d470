use imageproc::rect::Rect;

pub fn rect_intersect(r1: &Rect, r2: &Rect) -> bool {
    !(r2.left() >= r1.right()
        || r2.right() <= r1.left()
        || r2.top() >= r1.bottom()
        || r2.bottom() <= r1.top())
}

/// Clamp a float box to integer pixel corners inside a `width` x `height` image.
///
/// Returns `None` when nothing of the box is left.
pub fn clamp_box(xyxy: [f32; 4], width: u32, height: u32) -> Option<(i32, i32, i32, i32)> {
    if width == 0 || height == 0 {
        return None;
    }
    let mut x1 = xyxy[0].round() as i32;
    let mut y1 = xyxy[1].round() as i32;
    let mut x2 = xyxy[2].round() as i32;
    let mut y2 = xyxy[3].round() as i32;

    if x1 > x2 {
        std::mem::swap(&mut x1, &mut x2);
    }
    if y1 > y2 {
        std::mem::swap(&mut y1, &mut y2);
    }

    let max_x = width as i32 - 1;
    let max_y = height as i32 - 1;
    x1 = x1.clamp(0, max_x);
    y1 = y1.clamp(0, max_y);
    x2 = x2.clamp(0, max_x);
    y2 = y2.clamp(0, max_y);

    (x2 > x1 && y2 > y1).then_some((x1, y1, x2, y2))
}
