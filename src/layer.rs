// A paint layer and its stroke history.
//
// The pixels of a layer are never edited independently of its history: at
// rest, `pixels` is exactly the result of stamping every stroke in
// `undo_history`, oldest first, onto a transparent buffer. Undo and redo move
// one stroke between the two stacks and replay the history from scratch;
// no bitmap snapshots are kept per step.

use crate::error::Error;
use crate::pixels::PixelBuffer;
use crate::stamp::stamp_stroke;
use crate::stroke::StrokeRecord;
use std::iter;
use tracing::debug;

pub struct Layer {
    name: String,
    visible: bool,
    opacity: f32, // uniform multiplier applied when compositing, [0,1]
    pixels: PixelBuffer,
    undo_history: Vec<StrokeRecord>, // bottom = oldest, last = most recent
    redo_history: Vec<StrokeRecord>, // last = next stroke to redo
}

impl Layer {
    /// A visible, fully opaque, blank layer.
    pub fn new(name: impl Into<String>, width: usize, height: usize) -> Result<Self, Error> {
        Ok(Self {
            name: name.into(),
            visible: true,
            opacity: 1.0,
            pixels: PixelBuffer::new(width, height)?,
            undo_history: Vec::new(),
            redo_history: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Clamped to [0,1]; NaN counts as fully transparent.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };
    }

    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// Committed strokes, oldest first.
    pub fn undo_history(&self) -> &[StrokeRecord] {
        &self.undo_history
    }

    /// Undone strokes; the last entry is the next one `redo` brings back.
    pub fn redo_history(&self) -> &[StrokeRecord] {
        &self.redo_history
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_history.is_empty()
    }

    /// Draw `stroke` onto the layer and record it.
    pub fn draw(&mut self, stroke: StrokeRecord) {
        stamp_stroke(&mut self.pixels, stroke.points(), stroke.brush());
        self.record(stroke);
    }

    /// Record a stroke whose dabs are already in `pixels` (the live preview
    /// rendered them). A new stroke discards the redo branch.
    pub(crate) fn record(&mut self, stroke: StrokeRecord) {
        self.undo_history.push(stroke);
        if !self.redo_history.is_empty() {
            debug!(layer = %self.name, dropped = self.redo_history.len(), "redo history cleared");
            self.redo_history.clear();
        }
    }

    /// Mutable pixels for the live preview. Callers must restore the
    /// history invariant (via `record` or a snapshot restore) before returning.
    pub(crate) fn pixels_mut(&mut self) -> &mut PixelBuffer {
        &mut self.pixels
    }

    /// Take back the most recent stroke. Ok(false) when there is none.
    pub fn undo(&mut self) -> Result<bool, Error> {
        let Some(keep) = self.undo_history.len().checked_sub(1) else {
            return Ok(false);
        };
        let fresh = self.replay(&self.undo_history[..keep])?;
        if let Some(stroke) = self.undo_history.pop() {
            self.redo_history.push(stroke);
        }
        self.pixels = fresh;
        debug!(layer = %self.name, undo = self.undo_history.len(), redo = self.redo_history.len(), "undo");
        Ok(true)
    }

    /// Bring back the most recently undone stroke. Ok(false) when there is none.
    pub fn redo(&mut self) -> Result<bool, Error> {
        let Some(next) = self.redo_history.last() else {
            return Ok(false);
        };
        let fresh = self.replay(self.undo_history.iter().chain(iter::once(next)))?;
        if let Some(stroke) = self.redo_history.pop() {
            self.undo_history.push(stroke);
        }
        self.pixels = fresh;
        debug!(layer = %self.name, undo = self.undo_history.len(), redo = self.redo_history.len(), "redo");
        Ok(true)
    }

    /// Regenerate `pixels` from the undo history.
    pub fn rebuild(&mut self) -> Result<(), Error> {
        self.pixels = self.replay(&self.undo_history)?;
        Ok(())
    }

    /// Stamp `strokes` in order onto a new transparent buffer of this layer's
    /// size. The current pixels are left untouched until the caller swaps.
    fn replay<'a>(&self, strokes: impl IntoIterator<Item = &'a StrokeRecord>) -> Result<PixelBuffer, Error> {
        let mut fresh = PixelBuffer::new(self.width(), self.height())?;
        for stroke in strokes {
            stamp_stroke(&mut fresh, stroke.points(), stroke.brush());
        }
        Ok(fresh)
    }
}
