// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod error;
pub mod logging;
pub mod ui;
pub mod utils;

// MVC Architecture
pub mod controller;
pub mod model;
pub mod view;

pub use config::RoamConfig;
pub use error::{Result, RoamError};

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
    use web_sys::{Document, Event, HtmlCanvasElement, KeyboardEvent, Window};

    use crate::config::RoamConfig;
    use crate::controller::input::wasm::keyboard_event_to_input;
    use crate::controller::{FrameLoopContext, InputEvent};
    use crate::logging;
    use crate::ui::{self, UiState};
    use crate::view::{GpuContext, RenderState, SurfaceRecovery, UiFrame};

    #[wasm_bindgen(start)]
    pub async fn start() -> Result<(), JsValue> {
        logging::init();
        let config = RoamConfig::default();
        let (window, document, canvas) = init_canvas(config.window.width, config.window.height)?;
        document.set_title(&config.window.title);
        setup_app(&config, &window, &document, &canvas).await
    }

    /// Main application setup for WASM
    async fn setup_app(
        config: &RoamConfig,
        window: &Window,
        document: &Document,
        canvas: &HtmlCanvasElement,
    ) -> Result<(), JsValue> {
        let gpu = GpuContext::new(canvas, config.window.width, config.window.height)
            .await
            .map_err(|e| js_error(format!("GPU init failed: {e}")))?;
        let (width, height) = (gpu.width(), gpu.height());

        let frame = Rc::new(RefCell::new(FrameLoopContext::new(config, width, height)));
        let mut render_state = RenderState::new(
            gpu.device.as_ref(),
            gpu.queue.as_ref(),
            gpu.format,
            width,
            height,
            &frame.borrow().environment,
        );
        let ui_state = Rc::new(RefCell::new(UiState::new(render_state.has_wireframe())));
        let egui_ctx = egui::Context::default();

        setup_input_listeners(document, window, frame.clone(), ui_state.clone())?;

        let mut last_time = now_ms(window);
        let f = RcCellCallback::new(window.clone(), {
            let window = window.clone();
            move || {
                let now = now_ms(&window);
                let dt = ((now - last_time) / 1000.0) as f32;
                last_time = now;

                let mut frame = frame.borrow_mut();
                let report = frame.update(dt);
                if report.quit {
                    tracing::info!("quit requested, stopping frame loop");
                    return false;
                }

                let dpr = window.device_pixel_ratio() as f32;
                let mut raw_input = egui::RawInput::default();
                raw_input.time = Some(now / 1000.0);
                raw_input.screen_rect = Some(egui::Rect::from_min_size(
                    egui::Pos2::ZERO,
                    egui::vec2(render_state.width as f32 / dpr, render_state.height as f32 / dpr),
                ));
                egui_ctx.set_pixels_per_point(dpr);
                let mut ui_state = ui_state.borrow_mut();
                let mut full_output = egui_ctx.run(raw_input, |ctx| ui::build_ui(ctx, &mut ui_state, &frame, dt));
                render_state.wireframe_mode = ui_state.wireframe;
                let ui_frame = UiFrame {
                    primitives: egui_ctx.tessellate(std::mem::take(&mut full_output.shapes), dpr),
                    textures_delta: full_output.textures_delta,
                    pixels_per_point: dpr,
                };

                render_state.update_scene(gpu.device.as_ref(), gpu.queue.as_ref(), &frame);
                if let Err(err) = render_state.draw_frame(gpu.device.as_ref(), gpu.queue.as_ref(), &gpu.surface, Some(ui_frame)) {
                    if gpu.recover(&err) == SurfaceRecovery::Fatal {
                        return false;
                    }
                }
                true
            }
        });
        f.start();

        Ok(())
    }

    /// Keyboard, focus and visibility listeners feeding the frame loop.
    fn setup_input_listeners(
        document: &Document,
        window: &Window,
        frame: Rc<RefCell<FrameLoopContext>>,
        ui_state: Rc<RefCell<UiState>>,
    ) -> Result<(), JsValue> {
        for (kind, is_down) in [("keydown", true), ("keyup", false)] {
            let frame = frame.clone();
            let ui_state = ui_state.clone();
            let listener = Closure::wrap(Box::new(move |e: KeyboardEvent| {
                let Some(event) = keyboard_event_to_input(&e, is_down) else {
                    return;
                };
                // keep arrows, tab and space away from the page
                e.prevent_default();
                if let InputEvent::KeyDown(key) = &event {
                    if ui_state.borrow_mut().handle_key(key) {
                        return;
                    }
                }
                frame.borrow_mut().handle_input(&event);
            }) as Box<dyn FnMut(KeyboardEvent)>);
            document.add_event_listener_with_callback(kind, listener.as_ref().unchecked_ref())?;
            listener.forget();
        }

        // Focus loss - release everything
        {
            let frame = frame.clone();
            let blur = Closure::wrap(Box::new(move |_e: Event| {
                frame.borrow_mut().handle_input(&InputEvent::FocusLost);
            }) as Box<dyn FnMut(Event)>);
            window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
            blur.forget();
        }

        {
            let doc = document.clone();
            let visibility = Closure::wrap(Box::new(move |_e: Event| {
                let visible = !doc.hidden();
                frame.borrow_mut().handle_input(&InputEvent::VisibilityChanged { visible });
            }) as Box<dyn FnMut(Event)>);
            document.add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
            visibility.forget();
        }

        Ok(())
    }

    fn now_ms(window: &Window) -> f64 {
        window.performance().map(|p| p.now()).unwrap_or(0.0)
    }

    fn init_canvas(width: u32, height: u32) -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
        let window = web_sys::window().ok_or(js_error("no global `window`"))?;
        let document = window.document().ok_or(js_error("no document on window"))?;
        let body = document.body().ok_or(js_error("no body on document"))?;
        let canvas_el = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| js_error("failed to create canvas"))?;
        canvas_el.set_width(width);
        canvas_el.set_height(height);
        body.append_child(&canvas_el)?;
        Ok((window, document, canvas_el))
    }

    fn js_error<E: Into<String>>(msg: E) -> JsValue {
        JsValue::from_str(&msg.into())
    }

    /// requestAnimationFrame loop. The callback returns false to stop.
    struct RcCellCallback {
        inner: Rc<RefCell<Box<dyn FnMut() -> bool>>>,
        window: Window,
    }

    impl RcCellCallback {
        fn new(window: Window, f: impl FnMut() -> bool + 'static) -> Self {
            Self {
                inner: Rc::new(RefCell::new(Box::new(f))),
                window,
            }
        }

        fn start(self) {
            let inner = self.inner.clone();
            let window = self.window.clone();

            let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
            let callback_clone = callback.clone();

            *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
                let keep_going = (inner.borrow_mut().as_mut())();
                if !keep_going {
                    return;
                }
                // Recursively schedule next frame
                if let Some(cb) = callback_clone.borrow().as_ref() {
                    if let Err(err) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                        tracing::error!(?err, "requestAnimationFrame failed");
                    }
                }
            }) as Box<dyn FnMut()>));

            if let Some(cb) = callback.borrow().as_ref() {
                if let Err(err) = self.window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    tracing::error!(?err, "requestAnimationFrame start failed");
                }
            }

            // Leak the closure to keep it alive
            std::mem::forget(callback);
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::start;
