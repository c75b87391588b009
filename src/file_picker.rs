// Cross-platform image picker. Both backends hand the chosen file over through
// `take_picked_image`, which the app polls once per frame.

use once_cell::sync::Lazy;
use std::sync::Mutex;

use crate::intake::ImageFile;

static PICKED_IMAGE: Lazy<Mutex<Option<ImageFile>>> = Lazy::new(|| Mutex::new(None));

fn store(file: ImageFile) {
    if let Ok(mut slot) = PICKED_IMAGE.lock() {
        *slot = Some(file);
    }
}

pub fn take_picked_image() -> Option<ImageFile> {
    PICKED_IMAGE.lock().ok()?.take()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn open_image_picker() {
    use rfd::FileDialog;

    let Some(path) = FileDialog::new()
        .add_filter("Image", &["png", "jpg", "jpeg", "bmp", "gif", "webp"])
        .pick_file()
    else {
        return;
    };
    match ImageFile::from_path(&path) {
        Ok(file) => store(file),
        Err(e) => log::warn!("could not read {}: {e}", path.display()),
    }
}

#[cfg(target_arch = "wasm32")]
const INPUT_ID: &str = "photo-crop-file-input";

/// The page's single picker input, created with its change handler on first use.
#[cfg(target_arch = "wasm32")]
fn picker_input(document: &web_sys::Document) -> Option<web_sys::HtmlInputElement> {
    use js_sys::Uint8Array;
    use wasm_bindgen::JsCast as _;
    use wasm_bindgen::JsValue;
    use wasm_bindgen::closure::Closure;
    use web_sys::{FileReader, HtmlInputElement};

    if let Some(existing) = document.get_element_by_id(INPUT_ID) {
        return existing.dyn_into::<HtmlInputElement>().ok();
    }

    let input = document
        .create_element("input")
        .ok()?
        .dyn_into::<HtmlInputElement>()
        .ok()?;
    input.set_id(INPUT_ID);
    input.set_type("file");
    input.set_accept("image/*");
    // off-screen rather than display:none, some browsers block clicks on hidden inputs
    let _ = input.set_attribute(
        "style",
        "position: fixed; left: -9999px; width: 1px; height: 1px; opacity: 0;",
    );
    document.body()?.append_child(&input).ok()?;

    let onchange = Closure::wrap(Box::new(move |ev: web_sys::Event| {
        let Some(file) = ev
            .target()
            .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
            .and_then(|i| i.files())
            .and_then(|files| files.get(0))
        else {
            return;
        };
        let Ok(reader) = FileReader::new() else {
            return;
        };
        let name = file.name();
        let mime = file.type_();
        let reader_in_cb = reader.clone();
        let onload = Closure::once(Box::new(move |_e: JsValue| {
            let Ok(result) = reader_in_cb.result() else {
                return;
            };
            let bytes = Uint8Array::new(&result).to_vec();
            store(ImageFile::new(name, mime, bytes.into()));
        }) as Box<dyn FnOnce(_)>);
        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        onload.forget();
        let _ = reader.read_as_array_buffer(&file);
    }) as Box<dyn FnMut(_)>);

    // lives as long as the input, which is never removed
    input.set_onchange(Some(onchange.as_ref().unchecked_ref()));
    onchange.forget();

    Some(input)
}

#[cfg(target_arch = "wasm32")]
pub fn open_image_picker() {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let Some(input) = picker_input(&document) else {
        log::warn!("could not create the file input");
        return;
    };
    // picking the same file twice must still fire `change`
    input.set_value("");
    input.click();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picked_file_is_taken_once() {
        store(ImageFile::new("a.png", "image/png", vec![1u8].into()));
        let first = take_picked_image();
        assert_eq!(first.map(|f| f.name), Some("a.png".to_owned()));
        assert!(take_picked_image().is_none());
    }
}
