//! Freehand signature capture.
//!
//! A `SignaturePad` keeps an append-only buffer of strokes and renders every
//! pointer event onto a fixed-size raster as it arrives. Exporting trims the
//! raster to the ink bounding box and encodes it as a PNG data URL.

use tiny_skia::{
    Color, FillRule, IntRect, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform,
};

use crate::domain::{SignatureImage, ValidationError};

/// Default canvas width in pixels
pub const DEFAULT_WIDTH: u32 = 400;
/// Default canvas height in pixels
pub const DEFAULT_HEIGHT: u32 = 150;
/// Pen width in pixels
pub const PEN_WIDTH: f32 = 2.5;

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid canvas size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("failed to encode signature: {0}")]
    Encode(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A point on the canvas, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Signature capture surface
pub struct SignaturePad {
    field: &'static str,
    pixmap: Pixmap,
    strokes: Vec<Vec<Point>>,
    drawing: bool,
    paint: Paint<'static>,
    stroke: Stroke,
}

impl SignaturePad {
    /// Create a pad whose export is reported under `field`.
    pub fn new(field: &'static str, width: u32, height: u32) -> Result<Self, SignatureError> {
        let pixmap = Pixmap::new(width, height).ok_or(SignatureError::InvalidSize { width, height })?;

        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 255);
        paint.anti_alias = true;

        let stroke = Stroke {
            width: PEN_WIDTH,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };

        Ok(Self {
            field,
            pixmap,
            strokes: Vec::new(),
            drawing: false,
            paint,
            stroke,
        })
    }

    /// Pad for the notified party's signature
    pub fn notified() -> Result<Self, SignatureError> {
        Self::new("assinatura", DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    /// Pad for the notifying agent's signature
    pub fn agent() -> Result<Self, SignatureError> {
        Self::new("assinaturaAgente", DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Start a new stroke.
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        let point = Point::new(x, y);
        self.strokes.push(vec![point]);
        self.drawing = true;
        self.draw_dot(point);
    }

    /// Extend the current stroke. Ignored when no stroke is active.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if !self.drawing {
            return;
        }
        let point = Point::new(x, y);
        let Some(current) = self.strokes.last_mut() else {
            return;
        };
        let previous = current.last().copied();
        current.push(point);
        if let Some(previous) = previous {
            self.draw_segment(previous, point);
        }
    }

    /// Finish the current stroke.
    pub fn pointer_up(&mut self) {
        self.drawing = false;
    }

    /// Discard all strokes and blank the canvas.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.drawing = false;
        self.pixmap.fill(Color::TRANSPARENT);
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn strokes(&self) -> &[Vec<Point>] {
        &self.strokes
    }

    /// Export the ink, trimmed to its bounding box, as a PNG signature image.
    ///
    /// Returns `None` when nothing was drawn (or every stroke fell outside
    /// the canvas).
    pub fn export(&self) -> Result<Option<SignatureImage>, SignatureError> {
        if self.is_empty() {
            return Ok(None);
        }

        let Some(bounds) = self.ink_bounds() else {
            return Ok(None);
        };

        let trimmed = self
            .pixmap
            .clone_rect(bounds)
            .ok_or_else(|| SignatureError::Encode("ink bounds outside canvas".to_string()))?;
        let png = trimmed
            .encode_png()
            .map_err(|e| SignatureError::Encode(e.to_string()))?;

        Ok(Some(SignatureImage::from_png(self.field, png)?))
    }

    fn draw_dot(&mut self, point: Point) {
        if let Some(path) = PathBuilder::from_circle(point.x, point.y, PEN_WIDTH / 2.0) {
            self.pixmap.fill_path(
                &path,
                &self.paint,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    fn draw_segment(&mut self, from: Point, to: Point) {
        let mut pb = PathBuilder::new();
        pb.move_to(from.x, from.y);
        pb.line_to(to.x, to.y);
        if let Some(path) = pb.finish() {
            self.pixmap
                .stroke_path(&path, &self.paint, &self.stroke, Transform::identity(), None);
        }
    }

    /// Smallest rectangle containing every pixel with non-zero alpha.
    fn ink_bounds(&self) -> Option<IntRect> {
        let width = self.pixmap.width() as usize;
        let mut min_x = usize::MAX;
        let mut min_y = usize::MAX;
        let mut max_x = 0usize;
        let mut max_y = 0usize;
        let mut any = false;

        for (i, pixel) in self.pixmap.pixels().iter().enumerate() {
            if pixel.alpha() == 0 {
                continue;
            }
            let (x, y) = (i % width, i / width);
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            any = true;
        }

        if !any {
            return None;
        }

        IntRect::from_xywh(
            min_x as i32,
            min_y as i32,
            (max_x - min_x + 1) as u32,
            (max_y - min_y + 1) as u32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_line(pad: &mut SignaturePad, from: (f32, f32), to: (f32, f32)) {
        pad.pointer_down(from.0, from.1);
        for step in 1..=10 {
            let t = step as f32 / 10.0;
            pad.pointer_move(from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t);
        }
        pad.pointer_up();
    }

    #[test]
    fn test_empty_pad_exports_nothing() {
        let pad = SignaturePad::notified().unwrap();
        assert!(pad.is_empty());
        assert!(pad.export().unwrap().is_none());
    }

    #[test]
    fn test_export_is_trimmed_to_ink() {
        let mut pad = SignaturePad::notified().unwrap();
        draw_line(&mut pad, (100.0, 50.0), (200.0, 50.0));

        let image = pad.export().unwrap().expect("ink was drawn");
        assert!(image.width() < DEFAULT_WIDTH);
        assert!(image.height() < DEFAULT_HEIGHT);
        // horizontal line of 100px plus the round caps
        assert!(image.width() >= 100 && image.width() <= 106, "width {}", image.width());
        assert!(image.height() <= 6, "height {}", image.height());
    }

    #[test]
    fn test_single_tap_leaves_a_dot() {
        let mut pad = SignaturePad::agent().unwrap();
        pad.pointer_down(20.0, 20.0);
        pad.pointer_up();

        let image = pad.export().unwrap().expect("dot was drawn");
        assert!(image.width() <= 4);
    }

    #[test]
    fn test_move_without_down_is_ignored() {
        let mut pad = SignaturePad::notified().unwrap();
        pad.pointer_move(10.0, 10.0);
        pad.pointer_move(50.0, 50.0);
        assert!(pad.is_empty());
        assert!(pad.export().unwrap().is_none());
    }

    #[test]
    fn test_strokes_are_append_only() {
        let mut pad = SignaturePad::notified().unwrap();
        draw_line(&mut pad, (10.0, 10.0), (20.0, 20.0));
        draw_line(&mut pad, (30.0, 10.0), (40.0, 20.0));

        assert_eq!(pad.strokes().len(), 2);
        assert_eq!(pad.strokes()[0].len(), 11);
        assert_eq!(pad.strokes()[0][0], Point::new(10.0, 10.0));
    }

    #[test]
    fn test_clear_resets_buffer_and_canvas() {
        let mut pad = SignaturePad::notified().unwrap();
        draw_line(&mut pad, (10.0, 10.0), (80.0, 60.0));
        assert!(pad.export().unwrap().is_some());

        pad.clear();
        assert!(pad.is_empty());
        assert!(pad.export().unwrap().is_none());
        assert!(pad.ink_bounds().is_none());
    }

    #[test]
    fn test_strokes_outside_canvas_export_nothing() {
        let mut pad = SignaturePad::notified().unwrap();
        draw_line(&mut pad, (1000.0, 1000.0), (1100.0, 1100.0));
        assert!(!pad.is_empty());
        assert!(pad.export().unwrap().is_none());
    }

    #[test]
    fn test_pads_are_independent() {
        let mut notified = SignaturePad::notified().unwrap();
        let agent = SignaturePad::agent().unwrap();
        draw_line(&mut notified, (10.0, 10.0), (50.0, 50.0));

        assert!(notified.export().unwrap().is_some());
        assert!(agent.export().unwrap().is_none());
    }

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(matches!(
            SignaturePad::new("assinatura", 0, 10),
            Err(SignatureError::InvalidSize { .. })
        ));
    }
}
