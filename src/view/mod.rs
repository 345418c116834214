use softbuffer::Surface;
use std::num::NonZeroU32;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::Key;
use winit::window::{Window, WindowId};

use crate::view::state::{
    ButtonAction, InputEvent, KeyAction, KeyInput, PointerButton, RedrawFlags, ViewportContext,
};

pub mod contrast;
pub mod render;
pub mod state;
pub mod transform;

// ---------------------------------------------------------------------------
// Application handler (winit 0.30 style)
// ---------------------------------------------------------------------------

/// Owns the window-system plumbing and translates winit events into the
/// viewport's input events. All interaction semantics live behind
/// [`ViewportContext::handle`]; this layer only shuttles events in and
/// flags out.
pub struct App {
    pub ctx: ViewportContext,
    window: Option<Arc<Window>>,
    context: Option<softbuffer::Context<Arc<Window>>>,
    surface: Option<Surface<Arc<Window>, Arc<Window>>>,
}

impl App {
    pub fn new(ctx: ViewportContext) -> Self {
        Self {
            ctx,
            window: None,
            context: None,
            surface: None,
        }
    }

    /// Act on what an event handler reported back.
    fn apply(&mut self, event_loop: &ActiveEventLoop, flags: RedrawFlags) {
        if flags.quit {
            event_loop.exit();
            return;
        }
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if flags.resize {
            // adopt the new image's dimensions, but only when they differ
            let (w, h) = self.ctx.image_size();
            let size = window.inner_size();
            if (size.width, size.height) != (w, h) {
                let _ = window.request_inner_size(PhysicalSize::new(w, h));
            }
        }
        if flags.redisplay {
            window.set_title(&self.ctx.window_title());
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let (w, h) = self.ctx.image_size();
        let attrs = Window::default_attributes()
            .with_title(self.ctx.window_title())
            .with_inner_size(PhysicalSize::new(w, h));
        let window = Arc::new(event_loop.create_window(attrs).expect("create window"));
        let context = softbuffer::Context::new(Arc::clone(&window)).expect("create context");
        let surface = Surface::new(&context, Arc::clone(&window)).expect("create surface");

        window.request_redraw();
        self.window = Some(window);
        self.context = Some(context);
        self.surface = Some(surface);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(PhysicalSize { width, height }) => {
                let w = width.max(1);
                let h = height.max(1);
                if let Some(surface) = self.surface.as_mut() {
                    let _ = surface.resize(
                        NonZeroU32::new(w).unwrap(),
                        NonZeroU32::new(h).unwrap(),
                    );
                }
                let flags = self.ctx.handle(InputEvent::Resize {
                    width: w,
                    height: h,
                });
                self.apply(event_loop, flags);
            }

            WindowEvent::KeyboardInput { event, .. } => {
                let Some(key) = translate_key(&event.logical_key) else {
                    return;
                };
                let action = match (event.state, event.repeat) {
                    (ElementState::Pressed, false) => KeyAction::Press,
                    (ElementState::Pressed, true) => KeyAction::Repeat,
                    (ElementState::Released, _) => KeyAction::Release,
                };
                let flags = self.ctx.handle(InputEvent::Key { key, action });
                self.apply(event_loop, flags);
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    MouseButton::Left => PointerButton::Left,
                    MouseButton::Right => PointerButton::Right,
                    _ => return,
                };
                let action = match state {
                    ElementState::Pressed => ButtonAction::Press,
                    ElementState::Released => ButtonAction::Release,
                };
                let flags = self.ctx.handle(InputEvent::Button { button, action });
                self.apply(event_loop, flags);
            }

            WindowEvent::CursorMoved {
                position: PhysicalPosition { x, y },
                ..
            } => {
                let flags = self.ctx.handle(InputEvent::Motion { x, y });
                self.apply(event_loop, flags);
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let (dx, dy) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => (x as f64, y as f64),
                    MouseScrollDelta::PixelDelta(PhysicalPosition { x, y }) => {
                        (x / 40.0, y / 40.0)
                    }
                };
                let flags = self.ctx.handle(InputEvent::Scroll { dx, dy });
                self.apply(event_loop, flags);
            }

            WindowEvent::RedrawRequested => {
                let Some(window) = self.window.as_ref() else {
                    return;
                };
                let size = window.inner_size();
                let fb_w = size.width.max(1);
                let fb_h = size.height.max(1);
                if let Some(surface) = self.surface.as_mut() {
                    if let Ok(mut buffer) = surface.buffer_mut() {
                        self.ctx.render(&mut buffer, fb_w, fb_h);
                        let _ = buffer.present();
                    }
                }
                // the display cycle is over: lift the per-class mutes
                self.ctx.frame_completed();
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // block until the next input arrives; rendering is driven purely by
        // the redisplay flag
        event_loop.set_control_flow(ControlFlow::Wait);
    }
}

fn translate_key(key: &Key) -> Option<KeyInput> {
    match key {
        Key::Named(named) => Some(KeyInput::Named(*named)),
        Key::Character(s) => s.chars().next().map(|c| KeyInput::Char(c.to_ascii_lowercase())),
        _ => None,
    }
}
