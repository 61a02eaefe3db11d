// minifb window for the painting shell, plus the cursor and HUD overlays
// that are drawn on the screen copy of each frame (never into the canvas).

use dabble::error::Error;
use dabble::pixels::FrameBuffer;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

pub struct PaintWindow {
    window: Window,
}

impl PaintWindow {
    /// Open a window the size of the canvas, capped at 60 fps.
    pub fn open(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self { window })
    }

    pub fn show(&mut self, frame: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&frame.pixels, frame.width, frame.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    /// Closed by the user or ESC held.
    pub fn quit_requested(&self) -> bool {
        !self.window.is_open() || self.window.is_key_down(Key::Escape)
    }

    /// Pointer in canvas pixels, None while it is outside the window.
    pub fn cursor(&self) -> Option<(f32, f32)> {
        self.window.get_mouse_pos(MouseMode::Discard)
    }

    pub fn painting(&self) -> bool {
        self.window.get_mouse_down(MouseButton::Left)
    }

    /// Key went down this frame; holding it does not repeat.
    pub fn key_hit(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }
}

/// Clipped 1px drawing on top of a frame.
pub struct Overlay<'a> {
    frame: &'a mut FrameBuffer,
}

impl<'a> Overlay<'a> {
    pub fn new(frame: &'a mut FrameBuffer) -> Self {
        Self { frame }
    }

    fn plot(&mut self, x: i32, y: i32, color: u32) {
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            return;
        };
        if x < self.frame.width && y < self.frame.height {
            self.frame.pixels[y * self.frame.width + x] = color;
        }
    }

    /// Bresenham, both endpoints included.
    fn line(&mut self, from: (i32, i32), to: (i32, i32), color: u32) {
        let (mut x, mut y) = from;
        let (dx, dy) = ((to.0 - x).abs(), -(to.1 - y).abs());
        let (step_x, step_y) = ((to.0 - x).signum(), (to.1 - y).signum());
        let mut err = dx + dy;
        loop {
            self.plot(x, y, color);
            if (x, y) == to {
                return;
            }
            let twice = 2 * err;
            if twice >= dy {
                err += dy;
                x += step_x;
            }
            if twice <= dx {
                err += dx;
                y += step_y;
            }
        }
    }

    /// "+" of arm length `arm` with a 1px hole around the hot pixel.
    pub fn crosshair(&mut self, cx: i32, cy: i32, arm: i32, color: u32) {
        for (ux, uy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            self.line((cx + 2 * ux, cy + 2 * uy), (cx + arm * ux, cy + arm * uy), color);
        }
        self.plot(cx, cy, color);
    }

    /// Midpoint circle outline.
    pub fn ring(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        if radius <= 0 {
            return;
        }
        let (mut x, mut y) = (radius, 0);
        let mut err = 1 - radius;
        while x >= y {
            for (px, py) in [(x, y), (y, x), (-y, x), (-x, y), (-x, -y), (-y, -x), (y, -x), (x, -y)] {
                self.plot(cx + px, cy + py, color);
            }
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }

    /// HUD text with a black drop shadow. Unknown characters leave a gap.
    pub fn text(&mut self, x: i32, y: i32, text: &str, color: u32) {
        for (i, ch) in text.chars().enumerate() {
            let Some(rows) = glyph(ch) else {
                continue;
            };
            let left = x + GLYPH_ADVANCE * i as i32;
            for (offset, ink) in [(1, 0x0000_0000), (0, color)] {
                for (row, bits) in rows.iter().enumerate() {
                    for (col, cell) in bits.bytes().enumerate() {
                        if cell == b'#' {
                            self.plot(left + col as i32 + offset, y + row as i32 + offset, ink);
                        }
                    }
                }
            }
        }
    }
}

const GLYPH_ADVANCE: i32 = 6;

/// 5x7 cells for the status line alphabet.
fn glyph(ch: char) -> Option<[&'static str; 7]> {
    let rows = match ch {
        '0' => [".###.", "#...#", "#..##", "#.#.#", "##..#", "#...#", ".###."],
        '1' => ["..#..", ".##..", "..#..", "..#..", "..#..", "..#..", ".###."],
        '2' => [".###.", "#...#", "....#", "...#.", "..#..", ".#...", "#####"],
        '3' => ["####.", "....#", "....#", ".###.", "....#", "....#", "####."],
        '4' => ["...#.", "..##.", ".#.#.", "#..#.", "#####", "...#.", "...#."],
        '5' => ["#####", "#....", "####.", "....#", "....#", "#...#", ".###."],
        '6' => ["..##.", ".#...", "#....", "####.", "#...#", "#...#", ".###."],
        '7' => ["#####", "....#", "...#.", "..#..", ".#...", ".#...", ".#..."],
        '8' => [".###.", "#...#", "#...#", ".###.", "#...#", "#...#", ".###."],
        '9' => [".###.", "#...#", "#...#", ".####", "....#", "...#.", ".##.."],
        'L' => ["#....", "#....", "#....", "#....", "#....", "#....", "#####"],
        'B' => ["####.", "#...#", "#...#", "####.", "#...#", "#...#", "####."],
        'U' => ["#...#", "#...#", "#...#", "#...#", "#...#", "#...#", ".###."],
        'R' => ["####.", "#...#", "#...#", "####.", "#.#..", "#..#.", "#...#"],
        'H' => ["#...#", "#...#", "#...#", "#####", "#...#", "#...#", "#...#"],
        ' ' => ["....."; 7],
        ':' => [".....", "..#..", ".....", ".....", "..#..", ".....", "....."],
        '/' => ["....#", "...#.", "...#.", "..#..", ".#...", ".#...", "#...."],
        _ => return None,
    };
    Some(rows)
}
