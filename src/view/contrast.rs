// ---------------------------------------------------------------------------
// Contrast window: center/radius -> affine pixel transform
// ---------------------------------------------------------------------------

/// Keeps the radius away from zero when the data minimum cannot (data with
/// `min <= 0` would otherwise collapse the window).
const RADIUS_FLOOR: f64 = 1e-6;

/// Fraction of the radius applied per adjustment step.
const STEP: f64 = 0.1;

/// The value range `[center - radius, center + radius]` mapped onto the
/// display range `[0, 1]`. The derived `scale`/`bias` pair is what the
/// renderer applies to every sample as `value * scale + bias`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContrastWindow {
    center: f64,
    radius: f64,
    data_min: f64,
    data_max: f64,
    scale: f64,
    bias: f64,
}

impl ContrastWindow {
    pub fn new(data_min: f64, data_max: f64) -> Self {
        let mut window = Self {
            center: 0.0,
            radius: 1.0,
            data_min,
            data_max,
            scale: 1.0,
            bias: 0.0,
        };
        window.reset(data_min, data_max);
        window
    }

    /// Scale and bias are applied to the pixels as `scale * value + bias`.
    fn update_scale_and_bias(&mut self) {
        self.scale = 1.0 / (2.0 * self.radius);
        self.bias = -(self.center - self.radius) * self.scale;
    }

    fn radius_floor(&self) -> f64 {
        self.data_min.max(RADIUS_FLOOR)
    }

    /// Re-seed the window to cover `[data_min, data_max]` exactly. A
    /// degenerate range (all samples equal) still yields a usable window.
    pub fn reset(&mut self, data_min: f64, data_max: f64) {
        self.data_min = data_min;
        self.data_max = data_max;
        self.center = (data_max + data_min) / 2.0;
        self.radius = ((data_max - data_min) / 2.0).max(RADIUS_FLOOR);
        self.update_scale_and_bias();
    }

    pub fn adjust_radius(&mut self, offset: f64) {
        let d = self.radius * STEP;
        self.radius = (self.radius + d * offset).max(self.radius_floor());
        self.update_scale_and_bias();
    }

    pub fn adjust_center(&mut self, offset: f64) {
        let d = self.radius * STEP;
        self.center = (self.center + d * offset).clamp(self.data_min, self.data_max);
        self.update_scale_and_bias();
    }

    /// Recenter on a concrete sampled value (contrast sweep).
    pub fn set_center(&mut self, value: f64) {
        self.center = value;
        self.update_scale_and_bias();
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn scale_bias(&self) -> (f32, f32) {
        (self.scale as f32, self.bias as f32)
    }
}
