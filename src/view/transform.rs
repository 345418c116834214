// ---------------------------------------------------------------------------
// Screen <-> image coordinate mapping and zoom/pan state
// ---------------------------------------------------------------------------

/// Smallest zoom factor reachable through `zoom_by`. There is no upper cap.
const MIN_ZOOM: f64 = 0.01;

/// Each zoom step changes the factor by `offset / ZOOM_DIVISOR`.
const ZOOM_DIVISOR: f64 = 10.0;

/// Viewport fraction moved per keyboard pan step.
pub const PAN_STEP_DIV: f64 = 4.0;

/// Map a screen pixel to image coordinates: the inverse of the draw
/// transform (scale about the pivot, then translate by the pan offset).
/// The live drag offset is deliberately not part of this mapping, so points
/// captured at drag start stay anchored while the gesture is in flight.
pub fn screen_to_image(sx: f64, sy: f64, pivot: (f64, f64), zoom: f64, pan: (f64, f64)) -> (f64, f64) {
    (
        (sx - pivot.0) / zoom + pan.0 + pivot.0,
        (sy - pivot.1) / zoom + pan.1 + pivot.1,
    )
}

/// Exact inverse of `screen_to_image`.
pub fn image_to_screen(ix: f64, iy: f64, pivot: (f64, f64), zoom: f64, pan: (f64, f64)) -> (f64, f64) {
    (
        (ix - pan.0 - pivot.0) * zoom + pivot.0,
        (iy - pan.1 - pivot.1) * zoom + pivot.1,
    )
}

/// Zoom factor, zoom pivot, committed pan offset and the transient offset of
/// an in-flight drag gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomPan {
    pub zoom: f64,
    pub pivot: (f64, f64),
    pub pan: (f64, f64),
    pub drag: (f64, f64),
    drag_anchor: (f64, f64),
}

impl Default for ZoomPan {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pivot: (0.0, 0.0),
            pan: (0.0, 0.0),
            drag: (0.0, 0.0),
            drag_anchor: (0.0, 0.0),
        }
    }
}

impl ZoomPan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen_to_image(&self, sx: f64, sy: f64) -> (f64, f64) {
        screen_to_image(sx, sy, self.pivot, self.zoom, self.pan)
    }

    /// Step the zoom factor. The pivot is recentered on the viewport middle
    /// for every step, not the cursor, so repeated zooms share a stable
    /// reference point.
    pub fn zoom_by(&mut self, offset: f64, viewport: (u32, u32)) {
        self.zoom = (self.zoom + offset / ZOOM_DIVISOR).max(MIN_ZOOM);
        self.pivot = (viewport.0 as f64 / 2.0, viewport.1 as f64 / 2.0);
    }

    /// Back to identity: unit zoom, origin pivot, no pan, no drag.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn begin_drag(&mut self, point: (f64, f64)) {
        self.drag_anchor = point;
        self.drag = (0.0, 0.0);
    }

    /// Live, non-committing preview offset relative to the drag anchor.
    pub fn update_drag(&mut self, point: (f64, f64)) {
        self.drag = (point.0 - self.drag_anchor.0, point.1 - self.drag_anchor.1);
    }

    /// Fold the finished gesture into the pan offset. The draw transform
    /// adds `drag` and subtracts `pan`, so committing subtracts.
    pub fn end_drag(&mut self) {
        self.pan.0 -= self.drag.0;
        self.pan.1 -= self.drag.1;
        self.drag = (0.0, 0.0);
    }

    /// Keyboard pan. The move is dropped whenever the image bounding box
    /// would lose all overlap with the viewport on either axis.
    pub fn translate(&mut self, dx: f64, dy: f64, image_w: f64, image_h: f64) -> bool {
        let ndx = self.pan.0 + dx;
        let ndy = self.pan.1 + dy;
        if image_w + ndx > 0.0 && ndx < image_w && image_h + ndy > 0.0 && ndy < image_h {
            self.pan = (ndx, ndy);
            true
        } else {
            false
        }
    }
}
