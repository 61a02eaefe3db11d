// Stamping engine: turns a polyline into evenly spaced dabs and draws each dab.
// Visual expectation: a drag draws a line of overlapping round (or tip-shaped)
// marks, equally dense whether the mouse moved fast or slow.

use crate::brush::{BrushDescriptor, StampImage};
use crate::geometry::Point;
use crate::pixels::{PixelBuffer, mul255};

/// Longest walk allowed on one unclipped segment. Anything longer (or a
/// length that overflows) is treated as a jump straight to its end point.
const MAX_SEGMENT_STEPS: f32 = 1_048_576.0;

/// Axis-aligned rectangle outside of which a dab cannot touch any pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DabBounds {
    pub min: Point,
    pub max: Point,
}

impl DabBounds {
    /// `buffer`'s rectangle grown by a dab radius plus one pixel.
    pub fn around(buffer: &PixelBuffer, size: f32) -> Self {
        let margin = size * 0.5 + 1.0;
        Self {
            min: Point::new(-margin, -margin),
            max: Point::new(buffer.width() as f32 + margin, buffer.height() as f32 + margin),
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Part of p0->p1 inside the rectangle (Liang-Barsky, in f64 so the
    /// extent of far-apart f32 points cannot overflow). The flag is true
    /// when the segment enters from outside.
    fn clip(&self, p0: Point, p1: Point) -> Option<(Point, Point, bool)> {
        let (x0, y0) = (p0.x as f64, p0.y as f64);
        let dx = p1.x as f64 - x0;
        let dy = p1.y as f64 - y0;
        let (mut t0, mut t1) = (0.0f64, 1.0f64);
        let edges = [
            (-dx, x0 - self.min.x as f64),
            (dx, self.max.x as f64 - x0),
            (-dy, y0 - self.min.y as f64),
            (dy, self.max.y as f64 - y0),
        ];
        for (p, q) in edges {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
        // Clamp: far endpoints leave the f64 result only roughly on the edge.
        let at = |t: f64| {
            Point::new(
                ((x0 + dx * t) as f32).clamp(self.min.x, self.max.x),
                ((y0 + dy * t) as f32).clamp(self.min.y, self.max.y),
            )
        };
        let a = if t0 <= 0.0 { p0 } else { at(t0) };
        let b = if t1 >= 1.0 { p1 } else { at(t1) };
        Some((a, b, t0 > 0.0))
    }
}

/// Walk `points` and call `place` once per dab centre, in stroke order.
///
/// The first point always gets a dab. Every segment is cut into
/// `max(1, floor(len / spacing))` equal steps; a step position becomes a dab
/// only once it is at least `spacing` away from the last dab placed.
pub fn for_each_dab(points: &[Point], spacing: f32, place: impl FnMut(Point)) {
    for_each_dab_within(points, spacing, None, place);
}

/// `for_each_dab`, but segments leaving `bounds` are clipped to it first.
/// Off-bounds stretches place nothing; re-entering moves the last-dab
/// anchor to the entry point.
pub fn for_each_dab_within(points: &[Point], spacing: f32, bounds: Option<DabBounds>, mut place: impl FnMut(Point)) {
    let Some(&first) = points.first() else {
        return;
    };
    place(first);
    let mut last = first;

    for pair in points.windows(2) {
        let (p0, p1) = (pair[0], pair[1]);
        match bounds {
            Some(b) if !(b.contains(p0) && b.contains(p1)) => {
                let Some((a, z, entered)) = b.clip(p0, p1) else {
                    continue;
                };
                if entered {
                    last = a;
                }
                walk_segment(a, z, spacing, &mut last, &mut place);
            }
            _ => walk_segment(p0, p1, spacing, &mut last, &mut place),
        }
    }
}

fn walk_segment(p0: Point, p1: Point, spacing: f32, last: &mut Point, place: &mut impl FnMut(Point)) {
    let steps = (p0.distance(p1) / spacing).floor();
    // Also catches NaN and inf.
    if !(steps <= MAX_SEGMENT_STEPS) {
        place(p1);
        *last = p1;
        return;
    }
    let steps = (steps as usize).max(1);
    for j in 1..=steps {
        let q = p0.lerp(p1, j as f32 / steps as f32);
        if q.distance(*last) >= spacing {
            place(q);
            *last = q;
        }
    }
}

/// Dab centres for `points` at the given spacing.
pub fn dab_positions(points: &[Point], spacing: f32) -> Vec<Point> {
    let mut out = Vec::new();
    for_each_dab(points, spacing, |p| out.push(p));
    out
}

/// Render a whole stroke into `buffer`. Empty `points` is a no-op;
/// a single point is a single dab. Stretches far outside the buffer are
/// skipped rather than walked.
pub fn stamp_stroke(buffer: &mut PixelBuffer, points: &[Point], brush: &BrushDescriptor) {
    let bounds = DabBounds::around(buffer, brush.effective_size());
    for_each_dab_within(points, brush.spacing(), Some(bounds), |p| render_dab(buffer, p, brush));
}

/// Draw one dab centred at `center`.
/// Visual: eraser punches a transparent hole, a tip brush prints the tip
/// tinted with the colour, a plain brush prints a filled circle.
pub fn render_dab(buffer: &mut PixelBuffer, center: Point, brush: &BrushDescriptor) {
    let size = brush.effective_size();
    if brush.is_eraser {
        erase_circle(buffer, center, size);
    } else if let Some(tip) = &brush.stamp {
        stamp_tip(buffer, center, size, tip, brush);
    } else {
        fill_circle(buffer, center, size, brush);
    }
}

/// Pixel rectangle [x0, x1) x [y0, y1) covering a square of side `size`
/// around `center`, clipped to the buffer.
fn footprint(buffer: &PixelBuffer, center: Point, size: f32) -> (i32, i32, i32, i32) {
    let half = size * 0.5;
    let x0 = (center.x - half).floor().max(0.0) as i32;
    let y0 = (center.y - half).floor().max(0.0) as i32;
    let x1 = (center.x + half).ceil().min(buffer.width() as f32) as i32;
    let y1 = (center.y + half).ceil().min(buffer.height() as f32) as i32;
    (x0, y0, x1, y1)
}

/// A pixel is inside the disc when its centre is; the pixel holding the
/// dab centre always counts so even a 1px brush leaves a mark.
#[inline]
fn in_disc(x: i32, y: i32, center: Point, r2: f32) -> bool {
    let dx = x as f32 + 0.5 - center.x;
    let dy = y as f32 + 0.5 - center.y;
    dx * dx + dy * dy <= r2 || (x == center.x.floor() as i32 && y == center.y.floor() as i32)
}

fn fill_circle(buffer: &mut PixelBuffer, center: Point, size: f32, brush: &BrushDescriptor) {
    if brush.opacity == 0 {
        return;
    }
    let src = brush.color.with_alpha(brush.opacity);
    let r2 = size * size * 0.25;
    let (x0, y0, x1, y1) = footprint(buffer, center, size);
    for y in y0..y1 {
        for x in x0..x1 {
            if in_disc(x, y, center, r2) {
                buffer.blend(x, y, src);
            }
        }
    }
}

fn erase_circle(buffer: &mut PixelBuffer, center: Point, size: f32) {
    let r2 = size * size * 0.25;
    let (x0, y0, x1, y1) = footprint(buffer, center, size);
    for y in y0..y1 {
        for x in x0..x1 {
            if in_disc(x, y, center, r2) {
                buffer.clear_at(x, y);
            }
        }
    }
}

/// Print `tip` scaled onto a `size` x `size` square, its mask scaled by
/// the brush opacity and tinted with the brush colour.
fn stamp_tip(buffer: &mut PixelBuffer, center: Point, size: f32, tip: &StampImage, brush: &BrushDescriptor) {
    if brush.opacity == 0 {
        return;
    }
    let left = center.x - size * 0.5;
    let top = center.y - size * 0.5;
    let (x0, y0, x1, y1) = footprint(buffer, center, size);
    for y in y0..y1 {
        let v = (y as f32 + 0.5 - top) / size;
        if !(0.0..1.0).contains(&v) {
            continue;
        }
        for x in x0..x1 {
            let u = (x as f32 + 0.5 - left) / size;
            if !(0.0..1.0).contains(&u) {
                continue;
            }
            let alpha = mul255(tip.sample(u, v), brush.opacity);
            if alpha == 0 {
                continue;
            }
            buffer.blend(x, y, brush.color.with_alpha(alpha));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::{Rgb, TRANSPARENT};
    use image::{GrayImage, Luma};
    use std::sync::Arc;

    fn pen(size: f32) -> BrushDescriptor {
        BrushDescriptor::round(size, 255, 0.5, Rgb::BLACK)
    }

    #[test]
    fn straight_line_places_floor_len_over_spacing_plus_one() {
        let pts = [Point::new(10.0, 10.0), Point::new(90.0, 10.0)];
        let dabs = dab_positions(&pts, 5.0);
        assert_eq!(dabs.len(), 17);
        assert_eq!(dabs[0], Point::new(10.0, 10.0));
        assert_eq!(*dabs.last().unwrap(), Point::new(90.0, 10.0));
        for pair in dabs.windows(2) {
            assert!(pair[0].distance(pair[1]) >= 5.0);
            assert_eq!(pair[1].y, 10.0);
        }
    }

    #[test]
    fn dense_sampling_does_not_densify_dabs() {
        // Pointer sampled every pixel: dabs still land every 5px.
        let pts: Vec<Point> = (0..=50).map(|x| Point::new(x as f32, 0.0)).collect();
        let dabs = dab_positions(&pts, 5.0);
        assert_eq!(dabs.len(), 11);
        for pair in dabs.windows(2) {
            assert!(pair[0].distance(pair[1]) >= 5.0 - 1e-4);
        }
    }

    #[test]
    fn spacing_holds_around_corners() {
        let pts = [Point::new(0.0, 0.0), Point::new(23.0, 0.0), Point::new(23.0, 37.0), Point::new(-4.0, 12.0)];
        let dabs = dab_positions(&pts, 3.0);
        assert!(dabs.len() > 10);
        for pair in dabs.windows(2) {
            assert!(pair[0].distance(pair[1]) >= 3.0);
        }
    }

    #[test]
    fn empty_stroke_is_a_noop() {
        let mut buf = PixelBuffer::new(16, 16).unwrap();
        stamp_stroke(&mut buf, &[], &pen(4.0));
        assert!(buf.is_transparent());
        assert!(dab_positions(&[], 1.0).is_empty());
    }

    #[test]
    fn single_point_draws_one_brush_sized_dot() {
        let mut buf = PixelBuffer::new(100, 100).unwrap();
        let p = Point::new(50.0, 50.0);
        assert_eq!(dab_positions(&[p], 5.0), vec![p]);
        stamp_stroke(&mut buf, &[p], &pen(10.0));

        assert_eq!(buf.get(50, 50), Some([0, 0, 0, 255]));
        // Row through the centre spans exactly the diameter.
        let row: Vec<usize> = (0..100).filter(|&x| buf.get(x, 49).unwrap()[3] != 0).collect();
        assert_eq!(row.first(), Some(&45));
        assert_eq!(row.last(), Some(&54));
        // Nothing painted outside the disc.
        for y in 0..100 {
            for x in 0..100 {
                let dx = x as f32 + 0.5 - 50.0;
                let dy = y as f32 + 0.5 - 50.0;
                if dx * dx + dy * dy > 25.0 {
                    assert_eq!(buf.get(x, y).unwrap(), TRANSPARENT);
                }
            }
        }
    }

    #[test]
    fn one_pixel_brush_still_marks_its_pixel() {
        let mut buf = PixelBuffer::new(8, 8).unwrap();
        stamp_stroke(&mut buf, &[Point::new(3.0, 3.0)], &pen(1.0));
        assert_eq!(buf.painted_count(), 1);
        assert_eq!(buf.get(3, 3).unwrap()[3], 255);
    }

    #[test]
    fn translucent_dab_blends_source_over() {
        let mut buf = PixelBuffer::new(20, 20).unwrap();
        let soft = BrushDescriptor::round(6.0, 60, 0.5, Rgb::WHITE);
        render_dab(&mut buf, Point::new(10.0, 10.0), &soft);
        assert_eq!(buf.get(10, 10), Some([60, 60, 60, 60]));
        render_dab(&mut buf, Point::new(10.0, 10.0), &soft);
        let a = buf.get(10, 10).unwrap()[3];
        assert!(a > 60 && a < 255);
    }

    #[test]
    fn eraser_clears_regardless_of_color_and_opacity() {
        let mut buf = PixelBuffer::new(40, 40).unwrap();
        stamp_stroke(&mut buf, &[Point::new(20.0, 20.0)], &pen(30.0));

        let mut eraser = BrushDescriptor::eraser(10.0, 0.25);
        eraser.color = Rgb::new(255, 0, 0);
        eraser.opacity = 3;
        render_dab(&mut buf, Point::new(20.0, 20.0), &eraser);

        for y in 15..25 {
            for x in 15..25 {
                let dx = x as f32 + 0.5 - 20.0;
                let dy = y as f32 + 0.5 - 20.0;
                if dx * dx + dy * dy <= 25.0 {
                    assert_eq!(buf.get(x, y).unwrap(), TRANSPARENT);
                }
            }
        }
        // Outside the eraser footprint the paint survives.
        assert_eq!(buf.get(20, 7).unwrap()[3], 255);
    }

    #[test]
    fn eraser_ignores_stamp_image() {
        let mut buf = PixelBuffer::new(20, 20).unwrap();
        stamp_stroke(&mut buf, &[Point::new(10.0, 10.0)], &pen(16.0));
        let tip = StampImage::from_mask(GrayImage::from_pixel(2, 2, Luma([0]))).unwrap();
        let eraser = BrushDescriptor::eraser(6.0, 0.25).with_stamp(Arc::new(tip));
        render_dab(&mut buf, Point::new(10.0, 10.0), &eraser);
        assert_eq!(buf.get(10, 10), Some(TRANSPARENT));
    }

    #[test]
    fn tip_is_masked_and_tinted() {
        // Left half solid, right half empty.
        let mut mask = GrayImage::from_pixel(2, 1, Luma([255]));
        mask.put_pixel(1, 0, Luma([0]));
        let tip = Arc::new(StampImage::from_mask(mask).unwrap());
        let brush = BrushDescriptor::round(8.0, 255, 0.5, Rgb::new(0, 0, 255)).with_stamp(tip);

        let mut buf = PixelBuffer::new(20, 20).unwrap();
        render_dab(&mut buf, Point::new(10.0, 10.0), &brush);
        assert_eq!(buf.get(7, 10), Some([0, 0, 255, 255]));
        assert_eq!(buf.get(12, 10), Some(TRANSPARENT));
        // Square footprint: the corner is inked, unlike a circle.
        assert_eq!(buf.get(6, 6), Some([0, 0, 255, 255]));
        assert_eq!(buf.get(5, 10), Some(TRANSPARENT));
    }

    #[test]
    fn far_apart_points_finish_and_stay_in_bounds() {
        let brush = pen(10.0);
        let buf = PixelBuffer::new(16, 16).unwrap();
        let bounds = DabBounds::around(&buf, brush.effective_size());
        let strokes = [
            vec![Point::new(0.0, 0.0), Point::new(1e12, 0.0)],
            vec![Point::new(-3e38, 8.0), Point::new(3e38, 8.0)],
        ];
        for pts in &strokes {
            let mut dabs = Vec::new();
            for_each_dab_within(pts, brush.spacing(), Some(bounds), |p| dabs.push(p));
            // The first point always gets its dab; every other one is in bounds.
            assert!(dabs.len() > 1 && dabs.len() < 20, "{} dabs", dabs.len());
            assert!(dabs[1..].iter().all(|&d| bounds.contains(d)));

            let mut buf = PixelBuffer::new(16, 16).unwrap();
            stamp_stroke(&mut buf, pts, &brush);
            let row = pts[0].y as usize;
            assert_eq!(buf.get(8, row).unwrap()[3], 255);
        }
    }

    #[test]
    fn stroke_crossing_the_canvas_from_far_away_paints_the_crossing() {
        let mut buf = PixelBuffer::new(16, 16).unwrap();
        stamp_stroke(&mut buf, &[Point::new(-1e12, 8.0), Point::new(1e12, 8.0)], &pen(4.0));
        for x in 0..16 {
            assert_eq!(buf.get(x, 8).unwrap()[3], 255, "gap at x={x}");
        }
        assert_eq!(buf.get(8, 0).unwrap()[3], 0);
    }

    #[test]
    fn unbounded_walk_jumps_over_huge_segments() {
        let pts = [Point::new(0.0, 0.0), Point::new(1e12, 0.0), Point::new(-3e38, 0.0), Point::new(3e38, 0.0)];
        let dabs = dab_positions(&pts, 5.0);
        assert_eq!(dabs, pts.to_vec());
    }

    #[test]
    fn dabs_off_canvas_are_clipped() {
        let mut buf = PixelBuffer::new(10, 10).unwrap();
        stamp_stroke(&mut buf, &[Point::new(-50.0, -50.0), Point::new(-20.0, -40.0)], &pen(8.0));
        assert!(buf.is_transparent());
        stamp_stroke(&mut buf, &[Point::new(0.0, 0.0)], &pen(8.0));
        assert!(buf.painted_count() > 0);
    }
}
