use std::path::PathBuf;
use std::sync::Arc;
use winit::keyboard::NamedKey;

use crate::cache::ImageCache;
use crate::cli::HELP_KEYS;
use crate::loader::{self, FloatImage};
use crate::view::contrast::ContrastWindow;
use crate::view::render::{self, DrawParams};
use crate::view::transform::{self, PAN_STEP_DIV, ZoomPan};

// ---------------------------------------------------------------------------
// Input events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyInput {
    Named(NamedKey),
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Repeat,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Press,
    Release,
}

/// The closed set of raw inputs the viewport reacts to. The windowing layer
/// translates its native events into these and feeds them to
/// [`ViewportContext::handle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key { key: KeyInput, action: KeyAction },
    Button { button: PointerButton, action: ButtonAction },
    Motion { x: f64, y: f64 },
    Scroll { dx: f64, dy: f64 },
    Resize { width: u32, height: u32 },
}

/// What the caller owes the window system after an event: a redraw, a
/// surface resize to the current image, or shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedrawFlags {
    pub redisplay: bool,
    pub resize: bool,
    pub quit: bool,
}

impl RedrawFlags {
    fn redisplay() -> Self {
        Self {
            redisplay: true,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Event coalescing
// ---------------------------------------------------------------------------

/// Per-class mute flags plus the wheel accumulation buffer. A class is
/// muted when its first event lands within a display cycle; everything is
/// cleared together once the next frame has been presented, so bursty
/// devices cost at most one state mutation per rendered frame without
/// losing net input magnitude.
#[derive(Debug, Default)]
pub struct MuteState {
    pub wheel: bool,
    pub keyboard: bool,
    pub sweep: bool,
    wheel_buffer: (f64, f64),
}

impl MuteState {
    /// Admit a wheel delta. The first delta of a cycle passes through
    /// together with whatever accumulated while muted; later deltas only
    /// accumulate and report `None`.
    pub fn admit_wheel(&mut self, dx: f64, dy: f64) -> Option<(f64, f64)> {
        if self.wheel {
            self.wheel_buffer.0 += dx;
            self.wheel_buffer.1 += dy;
            return None;
        }
        let admitted = (dx + self.wheel_buffer.0, dy + self.wheel_buffer.1);
        self.wheel_buffer = (0.0, 0.0);
        self.wheel = true;
        Some(admitted)
    }

    /// Unconditional reset, hooked in right after a completed redisplay.
    pub fn frame_completed(&mut self) {
        self.wheel = false;
        self.keyboard = false;
        self.sweep = false;
    }
}

/// Modifier keys tracked from their own press/release events.
#[derive(Debug, Default)]
pub struct Modifiers {
    pub shift: bool,
    /// `z` held: routes the wheel to zoom instead of contrast.
    pub zoom_mod: bool,
}

/// Advisory rectangle dragged out with the right button; origin in image
/// coordinates plus the live width/height. Present only while the button
/// is down. It never touches the view transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionMarker {
    pub origin: (f64, f64),
    pub size: (f64, f64),
}

// ---------------------------------------------------------------------------
// Viewport context
// ---------------------------------------------------------------------------

/// The aggregate interaction state of the viewer: contrast window, zoom/pan,
/// image cache, mute discipline and gesture bookkeeping. Constructed once at
/// startup and handed by reference into every event handler.
pub struct ViewportContext {
    pub files: Vec<PathBuf>,
    pub current_index: usize,
    pub cache: ImageCache,
    pub current: Arc<FloatImage>,

    pub contrast: ContrastWindow,
    pub view: ZoomPan,

    pub viewport: (u32, u32),
    pub cursor: (f64, f64),
    pub mutes: MuteState,
    pub modifiers: Modifiers,
    dragging: bool,
    pub region: Option<RegionMarker>,

    pub flow_colors: bool,
    pub show_hud: bool,
    status: String,
}

impl ViewportContext {
    pub fn new(files: Vec<PathBuf>, first: Arc<FloatImage>, flow_colors: bool, show_hud: bool) -> Self {
        assert!(!files.is_empty());
        let mut cache = ImageCache::new();
        cache.insert(0, Arc::clone(&first), files.len());
        let contrast = ContrastWindow::new(first.v_min as f64, first.v_max as f64);
        let viewport = (first.width, first.height);
        Self {
            files,
            current_index: 0,
            cache,
            current: first,
            contrast,
            view: ZoomPan::new(),
            viewport,
            cursor: (0.0, 0.0),
            mutes: MuteState::default(),
            modifiers: Modifiers::default(),
            dragging: false,
            region: None,
            flow_colors,
            show_hud,
            status: String::new(),
        }
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.current.width, self.current.height)
    }

    /// Single dispatch point for all raw input.
    pub fn handle(&mut self, event: InputEvent) -> RedrawFlags {
        match event {
            InputEvent::Key { key, action } => self.on_key(key, action),
            InputEvent::Button { button, action } => self.on_button(button, action),
            InputEvent::Motion { x, y } => self.on_motion(x, y),
            InputEvent::Scroll { dx, dy } => self.on_scroll(dx, dy),
            InputEvent::Resize { width, height } => self.on_resize(width, height),
        }
    }

    /// Hook for the windowing layer once a frame has actually been
    /// presented; lifts all per-cycle mutes.
    pub fn frame_completed(&mut self) {
        self.mutes.frame_completed();
    }

    // -----------------------------------------------------------------------
    // Keyboard
    // -----------------------------------------------------------------------

    fn on_key(&mut self, key: KeyInput, action: KeyAction) -> RedrawFlags {
        if self.mutes.keyboard {
            return RedrawFlags::default();
        }
        let mut flags = RedrawFlags::default();
        let pressed = action != KeyAction::Release;
        let fresh = action == KeyAction::Press;

        // modifier keys persist until their release arrives
        if key == KeyInput::Named(NamedKey::Shift) {
            self.modifiers.shift = pressed;
            return flags;
        }
        if key == KeyInput::Char('z') {
            self.modifiers.zoom_mod = pressed;
            return flags;
        }
        if !pressed {
            return flags;
        }

        let step_x = self.viewport.0 as f64 / PAN_STEP_DIV / self.view.zoom;
        let step_y = self.viewport.1 as f64 / PAN_STEP_DIV / self.view.zoom;
        let (iw, ih) = (self.current.width as f64, self.current.height as f64);

        match key {
            KeyInput::Named(NamedKey::ArrowRight) => {
                flags.redisplay = self.view.translate(step_x, 0.0, iw, ih);
            }
            KeyInput::Named(NamedKey::ArrowLeft) => {
                flags.redisplay = self.view.translate(-step_x, 0.0, iw, ih);
            }
            KeyInput::Named(NamedKey::ArrowUp) => {
                flags.redisplay = self.view.translate(0.0, -step_y, iw, ih);
            }
            KeyInput::Named(NamedKey::ArrowDown) => {
                flags.redisplay = self.view.translate(0.0, step_y, iw, ih);
            }
            KeyInput::Named(NamedKey::Space) => {
                flags = self.change_image(self.current_index as i64 + 1);
                self.mutes.keyboard = true;
            }
            KeyInput::Named(NamedKey::Backspace) => {
                flags = self.change_image(self.current_index as i64 - 1);
                self.mutes.keyboard = true;
            }
            KeyInput::Named(NamedKey::Escape) if fresh => flags.quit = true,
            KeyInput::Char('q') if fresh => flags.quit = true,
            KeyInput::Char('e') => {
                self.contrast.adjust_radius(1.0);
                flags.redisplay = true;
            }
            KeyInput::Char('d') => {
                self.contrast.adjust_radius(-1.0);
                flags.redisplay = true;
            }
            KeyInput::Char('c') if fresh => {
                self.contrast
                    .reset(self.current.v_min as f64, self.current.v_max as f64);
                flags.redisplay = true;
            }
            KeyInput::Char('p') => {
                self.view.zoom_by(1.0, self.viewport);
                flags.redisplay = true;
            }
            KeyInput::Char('m') => {
                self.view.zoom_by(-1.0, self.viewport);
                flags.redisplay = true;
            }
            KeyInput::Char('r') if fresh => {
                self.view.reset();
                self.contrast
                    .reset(self.current.v_min as f64, self.current.v_max as f64);
                flags.redisplay = true;
            }
            KeyInput::Char('1') if fresh => {
                self.flow_colors = !self.flow_colors;
                flags.redisplay = true;
            }
            KeyInput::Char('u') if fresh => {
                self.show_hud = !self.show_hud;
                flags.redisplay = true;
            }
            KeyInput::Char('h') if fresh => {
                println!("{HELP_KEYS}");
            }
            _ => {}
        }
        flags
    }

    /// Navigate to the image at `target` (wrapping over the list). A load
    /// failure keeps the current image and index untouched.
    fn change_image(&mut self, target: i64) -> RedrawFlags {
        let count = self.files.len();
        let new_idx = ImageCache::resolve(target, count);
        if new_idx == self.current_index {
            return RedrawFlags::default();
        }
        let image = match self.cache.get(new_idx) {
            Some(image) => image,
            None => match loader::load_image(&self.files[new_idx]) {
                Ok(image) => {
                    let image = Arc::new(image);
                    self.cache.insert(new_idx, Arc::clone(&image), count);
                    image
                }
                Err(err) => {
                    log::error!("{err}");
                    self.status = format!("could not load {}", self.files[new_idx].display());
                    return RedrawFlags::redisplay();
                }
            },
        };
        log::debug!(
            "image {} -> {} ({})",
            self.current_index,
            new_idx,
            self.files[new_idx].display()
        );
        self.current_index = new_idx;
        self.current = image;
        self.status.clear();
        RedrawFlags {
            redisplay: true,
            resize: true,
            quit: false,
        }
    }

    // -----------------------------------------------------------------------
    // Pointer
    // -----------------------------------------------------------------------

    fn on_button(&mut self, button: PointerButton, action: ButtonAction) -> RedrawFlags {
        let point = self.view.screen_to_image(self.cursor.0, self.cursor.1);
        match (button, action) {
            (PointerButton::Left, ButtonAction::Press) => {
                self.view.begin_drag(point);
                self.dragging = true;
                RedrawFlags::redisplay()
            }
            (PointerButton::Left, ButtonAction::Release) => {
                if !self.dragging {
                    return RedrawFlags::default();
                }
                self.view.update_drag(point);
                self.view.end_drag();
                self.dragging = false;
                RedrawFlags::redisplay()
            }
            (PointerButton::Right, ButtonAction::Press) => {
                self.region = Some(RegionMarker {
                    origin: point,
                    size: (0.0, 0.0),
                });
                RedrawFlags::redisplay()
            }
            (PointerButton::Right, ButtonAction::Release) => {
                let Some(region) = self.region.take() else {
                    return RedrawFlags::default();
                };
                let x0 = region.origin.0 as i64;
                let y0 = region.origin.1 as i64;
                let w = point.0 as i64 - x0;
                let h = point.1 as i64 - y0;
                println!("{} {} {} {}", x0, y0, w.abs(), h.abs());
                RedrawFlags::redisplay()
            }
        }
    }

    fn on_motion(&mut self, x: f64, y: f64) -> RedrawFlags {
        let mut flags = RedrawFlags::default();
        self.cursor = (x, y);
        let (tx, ty) = self.view.screen_to_image(x, y);

        if let Some(region) = self.region.as_mut() {
            region.size = (tx - region.origin.0, ty - region.origin.1);
            flags.redisplay = true;
        }
        if self.dragging {
            self.view.update_drag((tx, ty));
            flags.redisplay = true;
        }
        // contrast sweep: recenter on the pixel under the cursor, once per
        // display cycle
        if self.modifiers.shift && !self.mutes.sweep {
            if let Some(mean) = self.current.sample_mean(tx.floor() as i64, ty.floor() as i64) {
                self.contrast.set_center(mean);
                self.mutes.sweep = true;
                flags.redisplay = true;
            }
        }
        // cursor readout for the HUD
        if let Some(px) = self.current.sample(tx.floor() as i64, ty.floor() as i64) {
            self.status = format_readout(tx, ty, px);
            flags.redisplay = true;
        }
        flags
    }

    fn on_scroll(&mut self, dx: f64, dy: f64) -> RedrawFlags {
        let Some((_, dy)) = self.mutes.admit_wheel(dx, dy) else {
            return RedrawFlags::default();
        };
        if self.modifiers.zoom_mod {
            self.view.zoom_by(dy / 10.0, self.viewport);
        } else if self.modifiers.shift {
            self.contrast.adjust_radius(dy / 10.0);
        } else {
            self.contrast.adjust_center(dy / 10.0);
        }
        RedrawFlags::redisplay()
    }

    fn on_resize(&mut self, width: u32, height: u32) -> RedrawFlags {
        self.viewport = (width, height);
        RedrawFlags::redisplay()
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    /// Fill the framebuffer for the current frame.
    pub fn render(&self, frame: &mut [u32], fb_w: u32, fb_h: u32) {
        let [r, g, b] = render::BG_COLOR;
        frame.fill(render::rgb(r, g, b));
        let (scale, bias) = self.contrast.scale_bias();
        let params = DrawParams {
            zoom: self.view.zoom,
            pivot: self.view.pivot,
            pan: self.view.pan,
            drag: self.view.drag,
            scale,
            bias,
            flow: self.flow_colors,
        };
        render::blit_shaded(frame, fb_w, fb_h, &self.current, &params);

        if let Some(region) = &self.region {
            let a = transform::image_to_screen(
                region.origin.0,
                region.origin.1,
                params.pivot,
                params.zoom,
                params.pan,
            );
            let b = transform::image_to_screen(
                region.origin.0 + region.size.0,
                region.origin.1 + region.size.1,
                params.pivot,
                params.zoom,
                params.pan,
            );
            render::draw_region(frame, fb_w, fb_h, a, b);
        }
    }

    pub fn window_title(&self) -> String {
        let name = self.files[self.current_index].display();
        if self.show_hud {
            format!(
                "fv [{}/{}] {} | {} | c={:.3} r={:.3} | [{:.3}..{:.3}]",
                self.current_index + 1,
                self.files.len(),
                name,
                self.status,
                self.contrast.center(),
                self.contrast.radius(),
                self.current.v_min,
                self.current.v_max,
            )
        } else {
            format!("fv [{}/{}] {}", self.current_index + 1, self.files.len(), name)
        }
    }
}

fn format_readout(tx: f64, ty: f64, px: &[f32]) -> String {
    let values = px
        .iter()
        .map(|v| format!("{v:.3}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{},{} [{}]", tx.floor() as i64, ty.floor() as i64, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image(w: u32, h: u32) -> Arc<FloatImage> {
        let n = (w * h) as usize;
        let pixels = (0..n).map(|i| i as f32 / (n - 1) as f32).collect();
        Arc::new(FloatImage::from_samples(pixels, w, h, 1))
    }

    fn test_ctx(n_files: usize) -> ViewportContext {
        let files = (0..n_files)
            .map(|i| PathBuf::from(format!("img-{i}.png")))
            .collect();
        let mut ctx = ViewportContext::new(files, gradient_image(8, 8), false, true);
        for i in 1..n_files {
            ctx.cache.insert(i, gradient_image(8, 8), n_files);
        }
        ctx
    }

    fn scroll(dy: f64) -> InputEvent {
        InputEvent::Scroll { dx: 0.0, dy }
    }

    fn press(key: KeyInput) -> InputEvent {
        InputEvent::Key {
            key,
            action: KeyAction::Press,
        }
    }

    fn release(key: KeyInput) -> InputEvent {
        InputEvent::Key {
            key,
            action: KeyAction::Release,
        }
    }

    #[test]
    fn wheel_bursts_coalesce_without_losing_magnitude() {
        let mut ctx = test_ctx(1);
        let center0 = ctx.contrast.center();
        let radius = ctx.contrast.radius();
        let step = |dy: f64| 0.1 * radius * (dy / 10.0);

        // five deltas before any frame completes: only the first mutates
        for _ in 0..5 {
            ctx.handle(scroll(1.0));
        }
        assert!((ctx.contrast.center() - (center0 + step(1.0))).abs() < 1e-12);

        // the buffered four are folded into the next admitted event
        ctx.frame_completed();
        ctx.handle(scroll(1.0));
        assert!((ctx.contrast.center() - (center0 + step(1.0) + step(5.0))).abs() < 1e-12);
    }

    #[test]
    fn scroll_routing_follows_modifiers() {
        let mut ctx = test_ctx(1);

        let zoom0 = ctx.view.zoom;
        ctx.handle(press(KeyInput::Char('z')));
        ctx.handle(scroll(2.0));
        assert!(ctx.view.zoom > zoom0, "z held routes the wheel to zoom");
        ctx.handle(release(KeyInput::Char('z')));
        ctx.frame_completed();

        let radius0 = ctx.contrast.radius();
        ctx.handle(press(KeyInput::Named(NamedKey::Shift)));
        ctx.handle(scroll(2.0));
        assert!(ctx.contrast.radius() > radius0, "shift routes to radius");
        ctx.handle(release(KeyInput::Named(NamedKey::Shift)));
        ctx.frame_completed();

        let center0 = ctx.contrast.center();
        ctx.handle(scroll(-2.0));
        assert!(ctx.contrast.center() < center0, "bare wheel moves the center");
    }

    #[test]
    fn sweep_samples_once_per_cycle() {
        let mut ctx = test_ctx(1);
        ctx.handle(press(KeyInput::Named(NamedKey::Shift)));

        ctx.handle(InputEvent::Motion { x: 1.2, y: 0.4 });
        let first = ctx.contrast.center();
        let expected = ctx.current.sample_mean(1, 0).unwrap();
        assert_eq!(first, expected);

        ctx.handle(InputEvent::Motion { x: 6.7, y: 6.2 });
        assert_eq!(ctx.contrast.center(), first, "second sweep is muted");

        ctx.frame_completed();
        ctx.handle(InputEvent::Motion { x: 6.7, y: 6.2 });
        assert_eq!(ctx.contrast.center(), ctx.current.sample_mean(6, 6).unwrap());
    }

    #[test]
    fn sweep_outside_image_is_skipped() {
        let mut ctx = test_ctx(1);
        ctx.handle(press(KeyInput::Named(NamedKey::Shift)));
        let center0 = ctx.contrast.center();
        ctx.handle(InputEvent::Motion { x: 100.0, y: 100.0 });
        assert_eq!(ctx.contrast.center(), center0);
        assert!(!ctx.mutes.sweep, "a miss does not spend the sweep");
    }

    #[test]
    fn navigation_wraps_and_requests_resize() {
        let mut ctx = test_ctx(3);
        let flags = ctx.handle(press(KeyInput::Named(NamedKey::Backspace)));
        assert_eq!(ctx.current_index, 2);
        assert!(flags.redisplay && flags.resize);

        ctx.frame_completed();
        let flags = ctx.handle(press(KeyInput::Named(NamedKey::Space)));
        assert_eq!(ctx.current_index, 0);
        assert!(flags.resize);
    }

    #[test]
    fn navigation_mutes_keyboard_until_frame_completes() {
        let mut ctx = test_ctx(3);
        ctx.handle(press(KeyInput::Named(NamedKey::Space)));
        assert_eq!(ctx.current_index, 1);

        // further keys are swallowed within the same display cycle
        ctx.handle(press(KeyInput::Named(NamedKey::Space)));
        assert_eq!(ctx.current_index, 1);
        let pan0 = ctx.view.pan;
        ctx.handle(press(KeyInput::Named(NamedKey::ArrowRight)));
        assert_eq!(ctx.view.pan, pan0);

        ctx.frame_completed();
        ctx.handle(press(KeyInput::Named(NamedKey::Space)));
        assert_eq!(ctx.current_index, 2);
    }

    #[test]
    fn failed_load_keeps_current_image() {
        let mut ctx = test_ctx(1);
        ctx.files.push(PathBuf::from("/nonexistent/fv-missing.png"));
        let before = Arc::clone(&ctx.current);

        let flags = ctx.handle(press(KeyInput::Named(NamedKey::Space)));
        assert_eq!(ctx.current_index, 0);
        assert!(Arc::ptr_eq(&ctx.current, &before));
        assert!(flags.redisplay && !flags.resize);
        assert!(!ctx.cache.contains(1), "no partial cache entry");
    }

    #[test]
    fn arrow_keys_pan_within_bounds() {
        let mut ctx = test_ctx(1);
        // viewport 8x8, zoom 1: step is 2 image pixels
        let flags = ctx.handle(press(KeyInput::Named(NamedKey::ArrowRight)));
        assert!(flags.redisplay);
        assert_eq!(ctx.view.pan, (2.0, 0.0));

        // pushing the image fully out of view is a silent no-op
        for _ in 0..10 {
            ctx.handle(press(KeyInput::Named(NamedKey::ArrowRight)));
        }
        assert!(ctx.view.pan.0 < 8.0);
    }

    #[test]
    fn drag_commits_on_release_only() {
        let mut ctx = test_ctx(1);
        ctx.handle(InputEvent::Motion { x: 2.0, y: 2.0 });
        ctx.handle(InputEvent::Button {
            button: PointerButton::Left,
            action: ButtonAction::Press,
        });
        ctx.handle(InputEvent::Motion { x: 5.0, y: 6.0 });
        assert_eq!(ctx.view.drag, (3.0, 4.0));
        assert_eq!(ctx.view.pan, (0.0, 0.0));

        ctx.handle(InputEvent::Button {
            button: PointerButton::Left,
            action: ButtonAction::Release,
        });
        assert_eq!(ctx.view.pan, (-3.0, -4.0));
        assert_eq!(ctx.view.drag, (0.0, 0.0));
    }

    #[test]
    fn region_marker_has_no_transform_side_effects() {
        let mut ctx = test_ctx(1);
        let view0 = ctx.view;
        let contrast0 = ctx.contrast;

        ctx.handle(InputEvent::Motion { x: 1.0, y: 1.0 });
        ctx.handle(InputEvent::Button {
            button: PointerButton::Right,
            action: ButtonAction::Press,
        });
        ctx.handle(InputEvent::Motion { x: 4.0, y: 6.0 });
        let region = ctx.region.expect("marker live while pressed");
        assert_eq!(region.origin, (1.0, 1.0));
        assert_eq!(region.size, (3.0, 5.0));

        ctx.handle(InputEvent::Button {
            button: PointerButton::Right,
            action: ButtonAction::Release,
        });
        assert!(ctx.region.is_none());
        assert_eq!(ctx.view, view0);
        assert_eq!(ctx.contrast, contrast0);
    }

    #[test]
    fn resize_updates_viewport() {
        let mut ctx = test_ctx(1);
        let flags = ctx.handle(InputEvent::Resize {
            width: 640,
            height: 480,
        });
        assert!(flags.redisplay);
        assert_eq!(ctx.viewport, (640, 480));
    }

    #[test]
    fn quit_keys_raise_the_flag() {
        let mut ctx = test_ctx(1);
        assert!(ctx.handle(press(KeyInput::Char('q'))).quit);
        assert!(ctx.handle(press(KeyInput::Named(NamedKey::Escape))).quit);
    }

    #[test]
    fn reset_key_restores_view_and_contrast() {
        let mut ctx = test_ctx(1);
        ctx.handle(press(KeyInput::Char('p')));
        ctx.handle(scroll(3.0));
        ctx.handle(press(KeyInput::Char('r')));
        assert_eq!(ctx.view, ZoomPan::new());
        let fresh = ContrastWindow::new(ctx.current.v_min as f64, ctx.current.v_max as f64);
        assert_eq!(ctx.contrast, fresh);
    }
}
