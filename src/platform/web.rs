//! Browser host: animation-frame and interval tick sources, DOM input, canvas surface
//!
//! Every constructor returns [`EngineError::Host`] when the page is missing a
//! piece (window, canvas, 2D context) instead of panicking.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, EventTarget, HtmlCanvasElement, KeyboardEvent, MouseEvent, Performance,
    Window,
};

use super::input::{InputHost, InputSink, RawInput, Subscription};
use super::scheduler::{TickMode, TickSource, TickToken};
use crate::error::EngineError;
use crate::renderer::surface::{Color, Surface};

fn host_err(what: impl Into<String>) -> EngineError {
    EngineError::Host(what.into())
}

fn js_err(context: &str, value: JsValue) -> EngineError {
    EngineError::Host(format!("{context}: {value:?}"))
}

pub fn window() -> Result<Window, EngineError> {
    web_sys::window().ok_or_else(|| host_err("no window"))
}

pub fn document() -> Result<Document, EngineError> {
    window()?.document().ok_or_else(|| host_err("no document"))
}

/// Monotonic clock in seconds
pub fn now_secs(performance: &Performance) -> f64 {
    performance.now() / 1000.0
}

type TickCallback = Box<dyn FnMut(TickToken, f64)>;

/// Where fired ticks are delivered; connected after the loop is built
#[derive(Clone, Default)]
pub struct TickTarget {
    callback: Rc<RefCell<Option<TickCallback>>>,
}

impl TickTarget {
    pub fn connect(&self, callback: impl FnMut(TickToken, f64) + 'static) {
        *self.callback.borrow_mut() = Some(Box::new(callback));
    }

    pub fn disconnect(&self) {
        if let Ok(mut callback) = self.callback.try_borrow_mut() {
            callback.take();
        }
    }

    fn deliver(&self, token: TickToken, now: f64) {
        match self.callback.try_borrow_mut() {
            Ok(mut callback) => {
                if let Some(callback) = callback.as_mut() {
                    callback(token, now);
                }
            }
            Err(_) => log::warn!("Tick {:?} dropped: loop busy", token),
        }
    }
}

enum Registration {
    Frame(i32),
    Interval { id: i32, closure: Closure<dyn FnMut()> },
}

/// `requestAnimationFrame` / `setInterval` tick source
pub struct WebTickSource {
    window: Window,
    performance: Performance,
    target: TickTarget,
    next: u64,
    active: HashMap<u64, Registration>,
    // Disarmed interval closures may still be on the stack; freed on the next fire
    retired: Rc<RefCell<Vec<Closure<dyn FnMut()>>>>,
}

impl WebTickSource {
    pub fn new() -> Result<Self, EngineError> {
        let window = window()?;
        let performance = window.performance().ok_or_else(|| host_err("no performance clock"))?;
        Ok(Self {
            window,
            performance,
            target: TickTarget::default(),
            next: 0,
            active: HashMap::new(),
            retired: Rc::new(RefCell::new(Vec::new())),
        })
    }

    /// Handle for connecting the session once it exists
    pub fn target(&self) -> TickTarget {
        self.target.clone()
    }

    fn arm_frame(&self, token: TickToken) -> Result<Registration, EngineError> {
        let target = self.target.clone();
        // Closure frees itself after its single call
        let callback = Closure::once_into_js(move |time: f64| target.deliver(token, time / 1000.0));
        let id = self
            .window
            .request_animation_frame(callback.unchecked_ref())
            .map_err(|e| js_err("requestAnimationFrame", e))?;
        Ok(Registration::Frame(id))
    }

    fn arm_interval(&self, token: TickToken, hz: f32) -> Result<Registration, EngineError> {
        let target = self.target.clone();
        let performance = self.performance.clone();
        let retired = self.retired.clone();
        let closure = Closure::<dyn FnMut()>::new(move || {
            if let Ok(mut retired) = retired.try_borrow_mut() {
                retired.clear();
            }
            target.deliver(token, now_secs(&performance));
        });
        let ms = (1000.0 / hz).round().max(1.0) as i32;
        let id = self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(closure.as_ref().unchecked_ref(), ms)
            .map_err(|e| js_err("setInterval", e))?;
        Ok(Registration::Interval { id, closure })
    }
}

impl TickSource for WebTickSource {
    fn arm(&mut self, mode: TickMode) -> Result<TickToken, EngineError> {
        self.next += 1;
        let token = TickToken(self.next);
        let registration = match mode {
            TickMode::FixedStep { hz } => self.arm_interval(token, hz)?,
            TickMode::DisplaySync => self.arm_frame(token)?,
        };
        self.active.insert(token.0, registration);
        Ok(token)
    }

    fn disarm(&mut self, token: TickToken) {
        match self.active.remove(&token.0) {
            Some(Registration::Frame(id)) => {
                if let Err(e) = self.window.cancel_animation_frame(id) {
                    log::warn!("cancelAnimationFrame failed: {:?}", e);
                }
            }
            Some(Registration::Interval { id, closure }) => {
                self.window.clear_interval_with_handle(id);
                self.retired.borrow_mut().push(closure);
            }
            None => {}
        }
    }
}

impl Drop for WebTickSource {
    fn drop(&mut self) {
        let tokens: Vec<u64> = self.active.keys().copied().collect();
        for token in tokens {
            self.disarm(TickToken(token));
        }
        self.target.disconnect();
    }
}

/// A DOM listener removed when dropped
struct DomListener {
    target: EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

impl DomListener {
    fn attach(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<Self, EngineError> {
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
        target
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
            .map_err(|e| js_err(event, e))?;
        Ok(Self {
            target: target.clone(),
            event,
            closure,
        })
    }
}

impl Subscription for DomListener {
    fn event(&self) -> &str {
        self.event
    }
}

impl Drop for DomListener {
    fn drop(&mut self) {
        if let Err(e) = self
            .target
            .remove_event_listener_with_callback(self.event, self.closure.as_ref().unchecked_ref())
        {
            log::warn!("Removing '{}' listener failed: {:?}", self.event, e);
        }
    }
}

/// Keyboard on the window, pointer on the canvas
pub struct DomInput {
    window: Window,
    canvas: HtmlCanvasElement,
}

impl DomInput {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, EngineError> {
        Ok(Self {
            window: window()?,
            canvas,
        })
    }

    /// Register an extra listener (e.g. a pause key) owned by the caller
    pub fn listen(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<Box<dyn Subscription>, EngineError> {
        Ok(Box::new(DomListener::attach(target, event, handler)?))
    }
}

/// Pointer position in canvas pixels rather than CSS pixels
fn canvas_point(canvas: &HtmlCanvasElement, event: &MouseEvent) -> Vec2 {
    let css = Vec2::new(canvas.client_width() as f32, canvas.client_height() as f32);
    let px = Vec2::new(canvas.width() as f32, canvas.height() as f32);
    let scale = if css.x > 0.0 && css.y > 0.0 { px / css } else { Vec2::ONE };
    Vec2::new(event.offset_x() as f32, event.offset_y() as f32) * scale
}

impl InputHost for DomInput {
    fn subscribe(&mut self, sink: InputSink) -> Result<Vec<Box<dyn Subscription>>, EngineError> {
        let window: &EventTarget = self.window.as_ref();
        let canvas: &EventTarget = self.canvas.as_ref();
        let mut subs: Vec<Box<dyn Subscription>> = Vec::with_capacity(6);

        for (event, down) in [("keydown", true), ("keyup", false)] {
            let sink = sink.clone();
            subs.push(Box::new(DomListener::attach(window, event, move |e| {
                if let Some(key) = e.dyn_ref::<KeyboardEvent>() {
                    let key = key.key();
                    sink.send(if down { RawInput::KeyDown(key) } else { RawInput::KeyUp(key) });
                }
            })?));
        }

        {
            let sink = sink.clone();
            let el = self.canvas.clone();
            subs.push(Box::new(DomListener::attach(canvas, "pointermove", move |e| {
                if let Some(mouse) = e.dyn_ref::<MouseEvent>() {
                    let p = canvas_point(&el, mouse);
                    sink.send(RawInput::PointerMove { x: p.x, y: p.y });
                }
            })?));
        }

        for (event, down) in [("pointerdown", true), ("pointerup", false)] {
            let sink = sink.clone();
            subs.push(Box::new(DomListener::attach(canvas, event, move |e| {
                if let Some(mouse) = e.dyn_ref::<MouseEvent>() {
                    let button = mouse.button().max(0) as u16;
                    sink.send(if down {
                        RawInput::PointerDown { button }
                    } else {
                        RawInput::PointerUp { button }
                    });
                }
            })?));
        }

        {
            let sink = sink.clone();
            subs.push(Box::new(DomListener::attach(window, "blur", move |_| {
                sink.send(RawInput::Blur);
            })?));
        }

        Ok(subs)
    }
}

/// Look up a canvas element by id
pub fn canvas_by_id(id: &str) -> Result<HtmlCanvasElement, EngineError> {
    document()?
        .get_element_by_id(id)
        .ok_or_else(|| host_err(format!("no element #{id}")))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| host_err(format!("#{id} is not a canvas")))
}

/// 2D canvas context as a [`Surface`]
pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
    size: Vec2,
}

impl CanvasSurface {
    pub fn new(canvas: &HtmlCanvasElement) -> Result<Self, EngineError> {
        let ctx = canvas
            .get_context("2d")
            .map_err(|e| js_err("getContext", e))?
            .ok_or_else(|| host_err("2D context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| host_err("context is not 2D"))?;
        Ok(Self {
            ctx,
            size: Vec2::new(canvas.width() as f32, canvas.height() as f32),
        })
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    fn circle_path(&self, center: Vec2, radius: f32) -> bool {
        self.ctx.begin_path();
        self.ctx
            .arc(
                center.x as f64,
                center.y as f64,
                radius.max(0.0) as f64,
                0.0,
                std::f64::consts::TAU,
            )
            .is_ok()
    }
}

impl Surface for CanvasSurface {
    fn clear(&mut self, color: Color) {
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx.fill_rect(0.0, 0.0, self.size.x as f64, self.size.y as f64);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        if self.circle_path(center, radius) {
            self.ctx.set_fill_style_str(&color.to_css());
            self.ctx.fill();
        }
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Color) {
        if self.circle_path(center, radius) {
            self.ctx.set_stroke_style_str(&color.to_css());
            self.ctx.set_line_width(width as f64);
            self.ctx.stroke();
        }
    }

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Color) {
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx
            .fill_rect(origin.x as f64, origin.y as f64, size.x as f64, size.y as f64);
    }

    fn stroke_rect(&mut self, origin: Vec2, size: Vec2, width: f32, color: Color) {
        self.ctx.set_stroke_style_str(&color.to_css());
        self.ctx.set_line_width(width as f64);
        self.ctx
            .stroke_rect(origin.x as f64, origin.y as f64, size.x as f64, size.y as f64);
    }

    fn present(&mut self) {}
}
