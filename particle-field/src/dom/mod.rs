// dom/ - Browser host and wasm exports
//
// DomHost drives a full-bleed overlay div behind the page content: sprites are
// <img> clones positioned with inline styles, frames come from
// requestAnimationFrame. The overlay is attached to <body> on construction
// and removed again by `detach` or when the last handle is freed.
//
// JS surface:
//   new BackgroundParticles(configJson?)  load(urls) / start() / stop() / detach()
//   initParticles(baseUrl)                default config, fire-and-forget handle
//   initParticlesWith(baseUrl, json)      custom config
//   detachParticles()                     tear down the active field

mod loader;
mod logger;

pub use loader::load_images;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::{Array, Promise};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::{Document, HtmlElement, HtmlImageElement, Window};

use crate::config::{BackgroundConfig, FieldConfig, MOUNT_ID};
use crate::engine::{Engine, Host};
use crate::error::FieldError;
use crate::render::{Declaration, HOST_POSITION, OVERLAY_STYLE};
use crate::sim::Size;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;
type Shared = Rc<RefCell<Engine<DomHost>>>;

thread_local! {
    // Field started by initParticles; replaced on every navigation.
    static ACTIVE: RefCell<Option<BackgroundParticles>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
    logger::init(log::LevelFilter::Info);
}

// ============================================================================
// Host
// ============================================================================

pub struct DomHost {
    window: Window,
    document: Document,
    body: HtmlElement,
    container: HtmlElement,
    // body's inline `position` before we set it
    body_position: String,
    installed: bool,
    callback: FrameCallback,
}

impl DomHost {
    /// Create the overlay and attach it to the page body.
    ///
    /// Sets `position: relative` on the body so the overlay covers it.
    fn install(callback: FrameCallback) -> Result<Self, FieldError> {
        let window = web_sys::window().ok_or(FieldError::MissingGlobal("window"))?;
        let document = window.document().ok_or(FieldError::MissingGlobal("document"))?;
        let body = document.body().ok_or(FieldError::MissingGlobal("document.body"))?;

        let container: HtmlElement = document
            .create_element("div")?
            .dyn_into()
            .map_err(|_| FieldError::Dom("overlay is not an HTMLElement".into()))?;
        let style = container.style();
        for (prop, value) in OVERLAY_STYLE {
            style.set_property(prop, value)?;
        }

        let body_style = body.style();
        let body_position = body_style.get_property_value("position")?;
        body_style.set_property("position", HOST_POSITION)?;
        body.append_child(&container)?;

        Ok(Self { window, document, body, container, body_position, installed: true, callback })
    }

    /// Remove the overlay and restore the body's inline position. Runs once.
    fn uninstall(&mut self) -> Result<(), FieldError> {
        if !self.installed {
            return Ok(());
        }
        self.installed = false;
        self.container.remove();

        let style = self.body.style();
        if self.body_position.is_empty() {
            style.remove_property("position")?;
        } else {
            style.set_property("position", &self.body_position)?;
        }
        Ok(())
    }

    pub fn container(&self) -> &HtmlElement {
        &self.container
    }
}

impl Drop for DomHost {
    fn drop(&mut self) {
        if let Err(err) = self.uninstall() {
            log::warn!("removing particle overlay failed: {err}");
        }
    }
}

impl Host for DomHost {
    type Visual = HtmlImageElement;
    type Frame = i32;

    fn container_size(&self) -> Size {
        Size::new(self.container.offset_width() as f64, self.container.offset_height() as f64)
    }

    fn mount_height(&self) -> Option<f64> {
        self.document
            .get_element_by_id(MOUNT_ID)
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            .map(|el| el.offset_height() as f64)
    }

    fn measure(&self, visual: &HtmlImageElement) -> Size {
        Size::new(visual.width() as f64, visual.height() as f64)
    }

    fn duplicate(&mut self, template: &HtmlImageElement) -> Result<HtmlImageElement, FieldError> {
        template
            .clone_node_with_deep(true)?
            .dyn_into()
            .map_err(|_| FieldError::Dom("sprite clone is not an <img>".into()))
    }

    fn attach(&mut self, visual: &HtmlImageElement) -> Result<(), FieldError> {
        self.container.append_child(visual)?;
        Ok(())
    }

    fn detach(&mut self, visual: &HtmlImageElement) -> Result<(), FieldError> {
        self.container.remove_child(visual)?;
        Ok(())
    }

    fn apply_style(&mut self, visual: &HtmlImageElement, style: &[Declaration]) -> Result<(), FieldError> {
        let css = visual.style();
        for (prop, value) in style {
            css.set_property(prop, value)?;
        }
        Ok(())
    }

    fn request_frame(&mut self) -> Result<i32, FieldError> {
        let callback = self.callback.borrow();
        let callback = callback.as_ref().ok_or(FieldError::NoFrameCallback)?;
        Ok(self.window.request_animation_frame(callback.as_ref().unchecked_ref())?)
    }

    fn cancel_frame(&mut self, frame: i32) {
        if let Err(err) = self.window.cancel_animation_frame(frame) {
            log::warn!("cancelAnimationFrame failed: {err:?}");
        }
    }

    fn is_installed(&self) -> bool {
        self.installed
    }
}

// ============================================================================
// JS class
// ============================================================================

/// Floating sprite background.
#[wasm_bindgen]
pub struct BackgroundParticles {
    engine: Shared,
}

#[wasm_bindgen]
impl BackgroundParticles {
    /// Attach a new overlay. `config` is the JSON field config (without
    /// `source`); omitted means the default.
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<BackgroundParticles, JsValue> {
        let config = match config {
            Some(json) => {
                let config: FieldConfig = serde_json::from_str(&json).map_err(FieldError::from)?;
                config.validate()?;
                config
            }
            None => FieldConfig::default(),
        };
        Ok(Self::with_config(config)?)
    }

    /// Load sprite URLs and build the particle pool. Resolves once every
    /// image has loaded.
    pub fn load(&self, sources: Array) -> Promise {
        let sources: Vec<String> = sources.iter().filter_map(|v| v.as_string()).collect();
        let engine = self.engine.clone();
        future_to_promise(async move {
            let images = load_images(&sources).await?;
            engine.borrow_mut().populate(&images)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn start(&self) -> Result<(), JsValue> {
        Ok(self.engine.borrow_mut().start()?)
    }

    pub fn stop(&self) -> Result<(), JsValue> {
        Ok(self.engine.borrow_mut().stop()?)
    }

    /// Stop and remove the overlay from the page.
    pub fn detach(&self) -> Result<(), JsValue> {
        let mut engine = self.engine.borrow_mut();
        engine.stop()?;
        engine.host_mut().uninstall()?;
        Ok(())
    }

    #[wasm_bindgen(getter)]
    pub fn running(&self) -> bool {
        self.engine.borrow().is_running()
    }

    #[wasm_bindgen(getter, js_name = particleCount)]
    pub fn particle_count(&self) -> usize {
        self.engine.borrow().field().len()
    }

    /// The overlay element, for inspection.
    #[wasm_bindgen(getter)]
    pub fn container(&self) -> HtmlElement {
        self.engine.borrow().host().container().clone()
    }
}

impl BackgroundParticles {
    pub fn with_config(config: FieldConfig) -> Result<Self, FieldError> {
        let callback: FrameCallback = Rc::new(RefCell::new(None));
        let host = DomHost::install(callback.clone())?;
        let engine: Shared = Rc::new(RefCell::new(Engine::new(host, config, seed())));

        let weak = Rc::downgrade(&engine);
        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            let Some(engine) = weak.upgrade() else { return };
            if let Err(err) = engine.borrow_mut().on_frame() {
                log::error!("particle frame failed: {err}");
            }
        }) as Box<dyn FnMut()>));

        Ok(Self { engine })
    }
}

// ============================================================================
// Page entry points
// ============================================================================

/// Start the default field for a freshly rendered view.
///
/// Returns immediately; loading and starting continue in the background.
/// The field stays active until the next call or `detachParticles`, whether
/// or not the returned handle is kept.
#[wasm_bindgen(js_name = initParticles)]
pub fn init_particles(base_url: &str) -> Result<BackgroundParticles, JsValue> {
    launch(base_url, BackgroundConfig::default())
}

#[wasm_bindgen(js_name = initParticlesWith)]
pub fn init_particles_with(base_url: &str, config: &str) -> Result<BackgroundParticles, JsValue> {
    launch(base_url, BackgroundConfig::from_json(config)?)
}

/// Remove the field started by `initParticles`, if any.
#[wasm_bindgen(js_name = detachParticles)]
pub fn detach_particles() -> Result<(), JsValue> {
    let previous = ACTIVE.with(|active| active.borrow_mut().take());
    match previous {
        Some(previous) => previous.detach(),
        None => Ok(()),
    }
}

fn launch(base_url: &str, config: BackgroundConfig) -> Result<BackgroundParticles, JsValue> {
    config.validate()?;
    // a previous field that fails to detach is still removed when dropped
    if let Err(err) = detach_particles() {
        log::warn!("detaching previous particle field failed: {err:?}");
    }

    let urls = config.asset_urls(base_url);
    let particles = BackgroundParticles::with_config(config.field)?;
    spawn_local(load_and_start(Rc::downgrade(&particles.engine), urls));

    let handle = BackgroundParticles { engine: particles.engine.clone() };
    ACTIVE.with(|active| *active.borrow_mut() = Some(particles));
    Ok(handle)
}

// Skips the start if the field was detached while its sprites loaded.
async fn load_and_start(engine: Weak<RefCell<Engine<DomHost>>>, urls: Vec<String>) {
    let images = match load_images(&urls).await {
        Ok(images) => images,
        Err(err) => {
            log::error!("particle sprites failed: {err}");
            return;
        }
    };

    let Some(engine) = engine.upgrade() else { return };
    let mut engine = engine.borrow_mut();
    if let Err(err) = engine.populate(&images).and_then(|()| engine.start()) {
        log::error!("particle field failed: {err}");
    }
}

fn seed() -> u32 {
    (js_sys::Math::random() * u32::MAX as f64) as u32
}
