//! Overlay rasterizer.
//!
//! Burns detection box outlines into a copy of the frame before it is
//! written out as evidence. Only `Box` instructions rasterize; text and
//! banner instructions stay structured and reach the operator through log
//! lines and the session summary instead, which keeps the evidence path
//! free of a font stack.

use crate::evaluate::DrawInstruction;
use crate::frame::Frame;

/// Outline thickness in pixels.
pub const OUTLINE_THICKNESS: i64 = 3;

/// Render the draw payload onto a copy of the frame's pixels.
///
/// Box corners are truncated to integer coordinates and clamped to the
/// frame; a box entirely outside the frame draws nothing. The input frame
/// is never modified.
pub fn render(frame: &Frame, draw: &[DrawInstruction]) -> Vec<u8> {
    let mut pixels = frame.pixels.clone();
    for instruction in draw {
        if let DrawInstruction::Box { bbox, color, .. } = instruction {
            let (x1, y1) = (bbox.x1 as i64, bbox.y1 as i64);
            let (x2, y2) = (bbox.x2 as i64, bbox.y2 as i64);
            let t = OUTLINE_THICKNESS;
            let rgb = color.rgb();
            // Four edge strips, pulled inward so thin boxes never overrun
            // the opposite side.
            fill_rect(&mut pixels, frame.width, frame.height, x1, y1, x2, (y1 + t - 1).min(y2), rgb);
            fill_rect(&mut pixels, frame.width, frame.height, x1, (y2 - t + 1).max(y1), x2, y2, rgb);
            fill_rect(&mut pixels, frame.width, frame.height, x1, y1, (x1 + t - 1).min(x2), y2, rgb);
            fill_rect(&mut pixels, frame.width, frame.height, (x2 - t + 1).max(x1), y1, x2, y2, rgb);
        }
    }
    pixels
}

/// Fill an inclusive pixel rectangle, clamped to the frame bounds.
fn fill_rect(pixels: &mut [u8], width: u32, height: u32, x0: i64, y0: i64, x1: i64, y1: i64, rgb: [u8; 3]) {
    if width == 0 || height == 0 {
        return;
    }
    let xs = x0.max(0);
    let xe = x1.min(width as i64 - 1);
    let ys = y0.max(0);
    let ye = y1.min(height as i64 - 1);
    if xs > xe || ys > ye {
        return;
    }
    for y in ys..=ye {
        for x in xs..=xe {
            let at = (y as usize * width as usize + x as usize) * 3;
            pixels[at..at + 3].copy_from_slice(&rgb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BBox;
    use crate::evaluate::OverlayColor;

    fn blank_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![0u8; (width * height * 3) as usize], width, height, 1).unwrap()
    }

    fn pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 3] {
        let at = (y as usize * width as usize + x as usize) * 3;
        [pixels[at], pixels[at + 1], pixels[at + 2]]
    }

    fn boxed(x1: f32, y1: f32, x2: f32, y2: f32, color: OverlayColor) -> DrawInstruction {
        DrawInstruction::Box {
            bbox: BBox::new(x1, y1, x2, y2).unwrap(),
            color,
            label: "person 0.90".to_string(),
        }
    }

    #[test]
    fn outlines_edges_and_leaves_interior() {
        let frame = blank_frame(32, 24);
        let out = render(&frame, &[boxed(4.0, 4.0, 12.0, 12.0, OverlayColor::Red)]);
        // Corner and an edge strip pixel.
        assert_eq!(pixel(&out, 32, 4, 4), [255, 0, 0]);
        assert_eq!(pixel(&out, 32, 5, 8), [255, 0, 0]);
        assert_eq!(pixel(&out, 32, 8, 11), [255, 0, 0]);
        // Interior stays untouched.
        assert_eq!(pixel(&out, 32, 8, 8), [0, 0, 0]);
        // Outside the box too.
        assert_eq!(pixel(&out, 32, 20, 20), [0, 0, 0]);
    }

    #[test]
    fn compliant_boxes_render_green() {
        let frame = blank_frame(16, 16);
        let out = render(&frame, &[boxed(2.0, 2.0, 10.0, 10.0, OverlayColor::Green)]);
        assert_eq!(pixel(&out, 16, 2, 2), [0, 255, 0]);
    }

    #[test]
    fn clamps_boxes_that_leave_the_frame() {
        let frame = blank_frame(8, 8);
        let out = render(&frame, &[boxed(-10.0, -10.0, 5.0, 5.0, OverlayColor::Red)]);
        assert_eq!(pixel(&out, 8, 0, 0), [255, 0, 0]);

        let out = render(&frame, &[boxed(100.0, 100.0, 120.0, 120.0, OverlayColor::Red)]);
        assert_eq!(out, frame.pixels);
    }

    #[test]
    fn text_instructions_do_not_rasterize() {
        let frame = blank_frame(8, 8);
        let draw = [
            DrawInstruction::Text {
                text: "Missing: helmet!".to_string(),
                x: 1.0,
                y: 1.0,
            },
            DrawInstruction::Banner {
                text: "CRITICAL: PPE NON-COMPLIANCE - helmet".to_string(),
            },
        ];
        let out = render(&frame, &draw);
        assert_eq!(out, frame.pixels);
    }

    #[test]
    fn input_frame_is_not_modified() {
        let frame = blank_frame(8, 8);
        let before = frame.pixels.clone();
        let _ = render(&frame, &[boxed(1.0, 1.0, 6.0, 6.0, OverlayColor::Red)]);
        assert_eq!(frame.pixels, before);
    }
}
