// What you SEE:
// • A blank sheet of paper. Hold Left Mouse and drag to paint.
// • 1..9 pick a brush from the catalog (5 = eraser). Z undo, Y redo.
// • N adds a layer on top, Delete removes the active one, Tab cycles layers,
//   V hides/shows the active layer. ESC quits.
// • Optional first argument: an image to import as a brush tip (becomes key 6).

mod draw;
mod logging;

use dabble::brush::{BrushCatalog, BrushPreset, StampImage};
use dabble::canvas::{Canvas, InputEvent};
use dabble::config::PaintConfig;
use dabble::error::Error;
use dabble::geometry::Point;
use dabble::pixels::FrameBuffer;
use draw::{Overlay, PaintWindow};
use minifb::Key;
use std::path::Path;
use tracing::{info, warn};

const PRESET_KEYS: [Key; 9] = [
    Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5,
    Key::Key6, Key::Key7, Key::Key8, Key::Key9,
];

fn main() -> Result<(), Error> {
    /* --- Settings + logging --- */
    let mut config = PaintConfig::load_or_default();
    config.merge_with_env();
    logging::init(config.logging.debug);

    /* --- Brush catalog (owned here, handed to the canvas one preset at a time) --- */
    let mut catalog = BrushCatalog::with_defaults();
    if let Some(path) = std::env::args().nth(1) {
        import_tip(&mut catalog, Path::new(&path));
    }

    /* --- Canvas + window ---
       Visual: window opens showing empty paper. */
    let (w, h) = config.canvas_size();
    let mut canvas = Canvas::new(w, h)?;
    let mut preset = catalog.find(&config.brush.preset).unwrap_or(0);
    if let Some(p) = catalog.get(preset) {
        canvas.apply_preset(p);
    }
    canvas.set_brush_color(config.brush.color);

    let mut window = PaintWindow::open(&config.window.title, w, h)?;
    let paper = config.canvas.paper;

    /* --- Reusable buffers ---
       `frame` is the flattened painting, `screen` is painting + overlays. */
    let mut frame = canvas.render_frame(paper)?;
    let mut screen = FrameBuffer { width: frame.width, height: frame.height, pixels: vec![0u32; frame.pixels.len()] };
    let mut was_down = false;

    info!(width = w, height = h, brushes = catalog.len(), "painting");

    /* ------------------------------ Main loop ------------------------------ */
    while !window.quit_requested() {
        /* 1) Pointer -> gesture events. */
        let down = window.painting();
        let pos = window.cursor().map(|(x, y)| Point::new(x, y));
        match (was_down, down, pos) {
            (false, true, Some(p)) => canvas.handle(InputEvent::GestureStart(p))?,
            (true, true, Some(p)) => canvas.handle(InputEvent::GestureMove(p))?,
            (true, false, _) => canvas.handle(InputEvent::GestureEnd)?,
            _ => {}
        }
        // Pressing outside the window does not start a stroke.
        was_down = down && (was_down || pos.is_some());

        /* 2) Commands */
        if window.key_hit(Key::Z) { canvas.undo()?; }
        if window.key_hit(Key::Y) { canvas.redo()?; }
        if window.key_hit(Key::N) { canvas.add_layer()?; }
        if window.key_hit(Key::Delete) { canvas.delete_active_layer(); }
        if window.key_hit(Key::Tab) {
            let next = (canvas.active_index() + 1) % canvas.layers().len();
            canvas.set_active_layer(next);
        }
        if window.key_hit(Key::V) {
            let idx = canvas.active_index();
            let visible = canvas.active_layer().visible();
            canvas.set_layer_visible(idx, !visible);
        }
        for (i, key) in PRESET_KEYS.iter().enumerate() {
            if window.key_hit(*key) {
                if let Some(p) = catalog.get(i) {
                    canvas.apply_preset(p);
                    preset = i;
                }
            }
        }

        /* 3) Re-flatten only when the painting changed. */
        if canvas.take_dirty() {
            frame = canvas.render_frame(paper)?;
        }
        screen.pixels.copy_from_slice(&frame.pixels);

        /* 4) Overlays: cursor + HUD */
        let mut overlay = Overlay::new(&mut screen);
        if let Some(p) = pos {
            let (mx, my) = (p.x as i32, p.y as i32);
            overlay.crosshair(mx, my, 8, 0x00_FF_66_00);
            let radius = (canvas.brush().effective_size() * 0.5).round() as i32;
            if radius > 8 {
                overlay.ring(mx, my, radius, 0x00_80_80_80);
            }
        }
        let layer = canvas.active_layer();
        let hud = format!(
            "L:{}/{}{} B:{} U:{} R:{}",
            canvas.active_index() + 1,
            canvas.layers().len(),
            if layer.visible() { "" } else { " H" },
            preset + 1,
            layer.undo_history().len(),
            layer.redo_history().len(),
        );
        overlay.text(8, 8, &hud, 0x00_30_30_30);

        /* 5) Present to the window (this is when the on-screen image updates). */
        window.show(&screen)?;
    }

    Ok(())
}

/// Load an image as a brush tip and add it to the catalog under its file name.
fn import_tip(catalog: &mut BrushCatalog, path: &Path) {
    match StampImage::open(path) {
        Ok(tip) => {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Imported".to_string());
            let index = catalog.add(BrushPreset::imported(&name, tip, 32.0, 255, 0.15));
            info!(%name, key = index + 1, "brush tip imported");
        }
        Err(e) => warn!(path = %path.display(), error = %e, "could not import brush tip"),
    }
}
