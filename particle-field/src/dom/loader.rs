// loader.rs - Sprite loading
//
// All sources are requested at once and joined with Promise.all. There is no
// failure path: an image that never fires `load` keeps the barrier pending,
// which leaves the field empty. Errors are only logged.

use js_sys::{Array, Promise};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlImageElement;

use crate::error::FieldError;
use crate::render::SPRITE_STYLE;

/// Load every source, resolving with the templates in source order.
pub async fn load_images(sources: &[String]) -> Result<Vec<HtmlImageElement>, FieldError> {
    let mut images = Vec::with_capacity(sources.len());
    let pending = Array::new();

    for src in sources {
        let image = sprite()?;
        pending.push(&loaded(&image, src));
        images.push(image);
    }

    JsFuture::from(Promise::all(&pending)).await?;
    log::debug!("loaded {} particle sprites", images.len());
    Ok(images)
}

// Decorative, absolutely positioned image with no source yet.
fn sprite() -> Result<HtmlImageElement, FieldError> {
    let image = HtmlImageElement::new()?;
    image.set_alt("");

    let style = image.style();
    for (prop, value) in SPRITE_STYLE {
        style.set_property(prop, value)?;
    }
    Ok(image)
}

// Promise settled by the image's `load` event; `error` only logs.
fn loaded(image: &HtmlImageElement, src: &str) -> Promise {
    Promise::new(&mut |resolve, _reject| {
        let onload = Closure::once_into_js(move || {
            let _ = resolve.call0(&JsValue::NULL);
        });
        image.set_onload(Some(onload.unchecked_ref()));

        let failed = src.to_owned();
        let onerror = Closure::once_into_js(move || {
            log::warn!("particle sprite {failed} failed to load");
        });
        image.set_onerror(Some(onerror.unchecked_ref()));

        image.set_src(src);
    })
}
