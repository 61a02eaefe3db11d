// The document: an ordered layer stack, the live brush, and the in-progress
// gesture. All mutation goes through `&mut Canvas`, one call at a time.
//
// Live preview: on gesture start the active layer's pixels are copied aside.
// Every new point restores that copy and re-stamps the whole polyline, so the
// visible result after N points is the same as drawing the finished stroke
// once. On gesture end the polyline and brush become a StrokeRecord and the
// copy is dropped.

use crate::brush::{BrushDescriptor, BrushPreset};
use crate::error::Error;
use crate::geometry::Point;
use crate::layer::Layer;
use crate::pixels::{FrameBuffer, PixelBuffer, Rgb};
use crate::stamp::stamp_stroke;
use crate::stroke::StrokeRecord;
use tracing::{debug, info, warn};

/// Pointer input, in canvas pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    GestureStart(Point),
    GestureMove(Point),
    GestureEnd,
}

/// State of the stroke currently being drawn.
struct Gesture {
    layer: usize,
    brush: BrushDescriptor, // captured at start; later brush edits wait for the next gesture
    points: Vec<Point>,
    snapshot: PixelBuffer,  // layer pixels before this stroke
}

pub struct Canvas {
    width: usize,
    height: usize,
    layers: Vec<Layer>, // paint order: first = bottom
    active: usize,
    brush: BrushDescriptor,
    gesture: Option<Gesture>,
    layers_created: usize,
    dirty: bool,
}

impl Canvas {
    /// A canvas with a single blank layer.
    pub fn new(width: usize, height: usize) -> Result<Self, Error> {
        let base = Layer::new("Layer 1", width, height)?;
        info!(width, height, "canvas created");
        Ok(Self {
            width,
            height,
            layers: vec![base],
            active: 0,
            brush: BrushDescriptor::default(),
            gesture: None,
            layers_created: 1,
            dirty: true,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_layer(&self) -> &Layer {
        &self.layers[self.active]
    }

    /// True once something visible changed since the last call.
    /// The shell polls this to decide whether to re-render.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /* ---------- Live brush ---------- */

    pub fn brush(&self) -> &BrushDescriptor {
        &self.brush
    }

    /// Replace the live brush. Applies from the next gesture on.
    pub fn set_brush(&mut self, brush: BrushDescriptor) {
        self.brush = brush;
    }

    /// Take size, opacity, spacing, eraser flag and tip from a preset.
    /// The live colour is kept.
    pub fn apply_preset(&mut self, preset: &BrushPreset) {
        let color = self.brush.color;
        self.brush = BrushDescriptor { color, ..preset.brush.clone() };
        debug!(name = %preset.name, "brush preset applied");
    }

    pub fn set_brush_size(&mut self, size: f32) {
        self.brush.size = size;
    }

    pub fn set_brush_opacity(&mut self, opacity: u8) {
        self.brush.opacity = opacity;
    }

    pub fn set_brush_color(&mut self, color: Rgb) {
        self.brush.color = color;
    }

    /* ---------- Input feed ---------- */

    pub fn is_drawing(&self) -> bool {
        self.gesture.is_some()
    }

    /// Dispatch one input event.
    pub fn handle(&mut self, event: InputEvent) -> Result<(), Error> {
        match event {
            InputEvent::GestureStart(p) => self.gesture_start(p),
            InputEvent::GestureMove(p) => {
                self.gesture_move(p);
                Ok(())
            }
            InputEvent::GestureEnd => {
                self.gesture_end();
                Ok(())
            }
        }
    }

    /// Pointer down: snapshot the active layer and draw the first dab.
    /// A start while another gesture is open commits that gesture first.
    pub fn gesture_start(&mut self, p: Point) -> Result<(), Error> {
        self.gesture_end();
        if !p.is_finite() {
            return Ok(());
        }
        let layer = &mut self.layers[self.active];
        let snapshot = layer.pixels().try_clone()?;
        let points = vec![p];
        stamp_stroke(layer.pixels_mut(), &points, &self.brush);
        self.gesture = Some(Gesture { layer: self.active, brush: self.brush.clone(), points, snapshot });
        self.dirty = true;
        Ok(())
    }

    /// Pointer move: restore the snapshot and re-stamp the whole polyline.
    /// Ignored without an open gesture.
    pub fn gesture_move(&mut self, p: Point) {
        let Some(g) = self.gesture.as_mut() else {
            return;
        };
        if !p.is_finite() || g.points.last() == Some(&p) {
            return;
        }
        g.points.push(p);
        let pixels = self.layers[g.layer].pixels_mut();
        pixels.copy_from(&g.snapshot);
        stamp_stroke(pixels, &g.points, &g.brush);
        self.dirty = true;
    }

    /// Pointer up: record the stroke on its layer and clear that layer's
    /// redo history. Returns false when no gesture was open.
    pub fn gesture_end(&mut self) -> bool {
        let Some(g) = self.gesture.take() else {
            return false;
        };
        let count = g.points.len();
        if let Some(stroke) = StrokeRecord::new(g.points, g.brush) {
            let layer = &mut self.layers[g.layer];
            layer.record(stroke);
            debug!(layer = %layer.name(), points = count, history = layer.undo_history().len(), "stroke committed");
        }
        true
    }

    /* ---------- History ---------- */

    /// Undo the last stroke on the active layer. Ok(false) if there was none.
    pub fn undo(&mut self) -> Result<bool, Error> {
        self.gesture_end();
        let changed = self.layers[self.active].undo()?;
        self.dirty |= changed;
        Ok(changed)
    }

    /// Redo the last undone stroke on the active layer. Ok(false) if there was none.
    pub fn redo(&mut self) -> Result<bool, Error> {
        self.gesture_end();
        let changed = self.layers[self.active].redo()?;
        self.dirty |= changed;
        Ok(changed)
    }

    /* ---------- Layer stack ---------- */

    /// Push a blank layer on top, sized like the base layer, and select it.
    pub fn add_layer(&mut self) -> Result<usize, Error> {
        self.gesture_end();
        let (w, h) = (self.layers[0].width(), self.layers[0].height());
        let name = format!("Layer {}", self.layers_created + 1);
        let layer = Layer::new(name, w, h)?;
        self.layers_created += 1;
        self.layers.push(layer);
        self.active = self.layers.len() - 1;
        self.dirty = true;
        info!(index = self.active, count = self.layers.len(), "layer added");
        Ok(self.active)
    }

    /// Remove the active layer unless it is the only one.
    /// The layer below becomes active (or the new bottom layer).
    pub fn delete_active_layer(&mut self) -> bool {
        self.gesture_end();
        if self.layers.len() <= 1 {
            warn!("refusing to delete the last layer");
            return false;
        }
        let removed = self.layers.remove(self.active);
        self.active = self.active.saturating_sub(1).min(self.layers.len() - 1);
        self.dirty = true;
        info!(name = %removed.name(), active = self.active, count = self.layers.len(), "layer deleted");
        true
    }

    /// Select the layer new strokes go to. False if `index` is out of range.
    pub fn set_active_layer(&mut self, index: usize) -> bool {
        if index >= self.layers.len() {
            return false;
        }
        if index != self.active {
            self.gesture_end();
            self.active = index;
        }
        true
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> bool {
        let Some(layer) = self.layers.get_mut(index) else {
            return false;
        };
        layer.set_visible(visible);
        self.dirty = true;
        true
    }

    pub fn set_layer_opacity(&mut self, index: usize, opacity: f32) -> bool {
        let Some(layer) = self.layers.get_mut(index) else {
            return false;
        };
        layer.set_opacity(opacity);
        self.dirty = true;
        true
    }

    pub fn rename_layer(&mut self, index: usize, name: impl Into<String>) -> bool {
        let Some(layer) = self.layers.get_mut(index) else {
            return false;
        };
        layer.rename(name);
        true
    }

    /* ---------- Output ---------- */

    /// Flatten the stack bottom to top: hidden layers are skipped, each
    /// layer is scaled by its opacity on top of its own per-pixel alpha.
    pub fn render(&self) -> Result<PixelBuffer, Error> {
        let mut out = PixelBuffer::new(self.width, self.height)?;
        for layer in self.layers.iter().filter(|l| l.visible()) {
            out.composite(layer.pixels(), layer.opacity());
        }
        Ok(out)
    }

    /// `render` flattened over `paper` for the window.
    pub fn render_frame(&self, paper: Rgb) -> Result<FrameBuffer, Error> {
        FrameBuffer::flatten(&self.render()?, paper)
    }
}
