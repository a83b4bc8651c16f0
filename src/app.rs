use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use glam::Vec2;
use log::{error, info, warn};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{CursorGrabMode, Window, WindowId};

use crate::camera::Camera;
use crate::clock::FrameClock;
use crate::config::DemoSettings;
use crate::input::{InputState, KeyCode};
use crate::render::Renderer;
use crate::scene::{scene_for, Scene};

/// Pixels of trackpad scrolling that count as one wheel line.
const PIXELS_PER_LINE: f32 = 20.0;

/// The window or event loop could not be created, typically because no display
/// is available.
#[derive(Debug)]
pub struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

/// One interactive demo: window, renderer, camera and scene.
pub struct DemoApp {
    settings: DemoSettings,
    scene: Box<dyn Scene>,
    camera: Camera,
    input: InputState,
    clock: FrameClock,
    renderer: Option<Renderer>,
    last_error: Option<anyhow::Error>,
}

impl DemoApp {
    pub fn new(settings: DemoSettings) -> Self {
        Self {
            scene: scene_for(&settings),
            camera: Camera::new(settings.camera.clone()),
            input: InputState::new(),
            clock: FrameClock::new(),
            renderer: None,
            last_error: None,
            settings,
        }
    }

    /// Opens the window and runs until it is closed or `Esc` is pressed.
    pub fn run(settings: DemoSettings) -> Result<()> {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
        panic::set_hook(default_hook);
        let event_loop = event_loop
            .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
            .map_err(|err| WindowInitError::from_error("event loop", err))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = Self::new(settings);
        event_loop
            .run_app(&mut app)
            .map_err(|err| anyhow!("event loop terminated with error: {err}"))?;

        match app.last_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.last_error = Some(err);
        event_loop.exit();
    }

    fn init_renderer(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(self.settings.demo.window_title())
            .with_inner_size(PhysicalSize::new(
                self.settings.window_width,
                self.settings.window_height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );
        capture_cursor(&window);

        let renderer = block_on(Renderer::new(
            Arc::clone(&window),
            &self.settings,
            self.scene.as_ref(),
        ))?;
        info!(
            "running {} demo at {}x{}",
            self.settings.demo,
            renderer.size().width,
            renderer.size().height
        );
        self.renderer = Some(renderer);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let dt = self.clock.tick();
        if self.input.is_key_down(KeyCode::ESCAPE) {
            event_loop.exit();
            return Ok(());
        }

        self.camera.apply_input(&self.input, dt);
        self.scene.handle_input(&self.input);
        self.scene.update(dt);
        self.input.end_frame();

        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        let camera = self.camera.params(renderer.aspect());
        renderer.update_globals(&camera, &self.scene.light());
        match renderer.render(&self.scene.draw_list()) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = renderer.window().inner_size();
                renderer.resize(size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow!("GPU is out of memory"));
            }
            Err(wgpu::SurfaceError::Timeout) => {
                info!("Surface timeout; retrying next frame");
            }
            Err(other) => {
                warn!("skipping frame: {other}");
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(key) = map_keycode(code) else {
            return;
        };
        match event.state {
            ElementState::Pressed => self.input.set_key_down(key),
            ElementState::Released => self.input.set_key_up(key),
        }
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        if let Err(err) = self.init_renderer(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self
            .renderer
            .as_ref()
            .map_or(true, |renderer| renderer.window_id() != window_id)
        {
            return;
        }
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event),
            WindowEvent::MouseWheel { delta, .. } => self.input.add_scroll(scroll_lines(delta)),
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw(event_loop) {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.add_mouse_motion(Vec2::new(dx as f32, dy as f32));
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = self.renderer.as_ref() {
            renderer.window().request_redraw();
        }
    }
}

/// Keeps the pointer inside the window and hides it for mouse look.
fn capture_cursor(window: &Window) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Confined)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
    if let Err(err) = grabbed {
        warn!("cursor grab unavailable: {err}");
    }
    window.set_cursor_visible(false);
}

/// Vertical wheel movement in lines; touchpad pixel deltas count
/// `PIXELS_PER_LINE` pixels as one line.
pub fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
    }
}

/// Maps the physical keys the demos use; everything else is ignored.
pub fn map_keycode(code: winit::keyboard::KeyCode) -> Option<KeyCode> {
    use winit::keyboard::KeyCode as Key;
    Some(match code {
        Key::ArrowUp => KeyCode::UP,
        Key::ArrowDown => KeyCode::DOWN,
        Key::ArrowLeft => KeyCode::LEFT,
        Key::ArrowRight => KeyCode::RIGHT,
        Key::Escape => KeyCode::ESCAPE,
        Key::KeyA => KeyCode::letter('A'),
        Key::KeyD => KeyCode::letter('D'),
        Key::KeyM => KeyCode::letter('M'),
        Key::KeyN => KeyCode::letter('N'),
        Key::KeyO => KeyCode::letter('O'),
        Key::KeyP => KeyCode::letter('P'),
        Key::KeyS => KeyCode::letter('S'),
        Key::KeyW => KeyCode::letter('W'),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use winit::dpi::PhysicalPosition;
    use winit::keyboard::KeyCode as Key;

    use super::*;

    #[test]
    fn maps_control_keys() {
        assert_eq!(map_keycode(Key::ArrowLeft), Some(KeyCode::LEFT));
        assert_eq!(map_keycode(Key::KeyW), Some(KeyCode::letter('w')));
        assert_eq!(map_keycode(Key::KeyN), Some(KeyCode::letter('N')));
        assert_eq!(map_keycode(Key::F1), None);
    }

    #[test]
    fn pixel_scroll_converts_to_lines() {
        let pixels = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 40.0));
        assert_eq!(scroll_lines(pixels), 2.0);
        let pixels = MouseScrollDelta::PixelDelta(PhysicalPosition::new(15.0, -10.0));
        assert_eq!(scroll_lines(pixels), -0.5);
        assert_eq!(scroll_lines(MouseScrollDelta::LineDelta(3.0, -1.5)), -1.5);
    }

    #[test]
    fn window_errors_name_the_stage() {
        let err = WindowInitError::from_error("window", "no display");
        assert_eq!(err.to_string(), "failed to initialize window: no display");

        let err = WindowInitError::from_panic("event loop", Box::new("boom"));
        assert_eq!(err.to_string(), "failed to initialize event loop: boom");
    }
}
