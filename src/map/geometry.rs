use crate::braille::BrailleCanvas;
use glam::DVec2;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    draw_dashed_line(canvas, x0, y0, x1, y1, None, &mut 0);
}

/// Bresenham line with an optional on/off dash of `dash` pixels.
/// `phase` carries the dash position across connected segments.
pub fn draw_dashed_line(
    canvas: &mut BrailleCanvas,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    dash: Option<u32>,
    phase: &mut u32,
) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        let on = match dash {
            Some(len) if len > 0 => (*phase / len) % 2 == 0,
            _ => true,
        };
        if on {
            canvas.set_pixel_signed(x, y);
        }
        *phase = phase.wrapping_add(1);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Even-odd point in ring test (ray cast towards +x)
pub fn ring_contains(ring: &[DVec2], p: DVec2) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
