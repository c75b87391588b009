//! Getting a user-selected file into a decoded, displayable image.

use std::path::Path;
use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView as _};
use log::debug;

use crate::{CropError, Size};

/// A file handed over by the picker or a drop, before any validation.
#[derive(Clone, Debug)]
pub struct ImageFile {
    pub name: String,
    /// Declared or sniffed MIME type. May be empty if neither source knew.
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl ImageFile {
    /// Uses the declared MIME when present, otherwise sniffs the bytes.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Arc<[u8]>) -> Self {
        let mut mime = mime.into();
        if mime.is_empty() {
            mime = infer::get(&bytes)
                .map(|kind| kind.mime_type().to_owned())
                .unwrap_or_default();
        }
        Self {
            name: name.into(),
            mime,
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, CropError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, String::new(), bytes.into()))
    }

    /// Web drops carry bytes and MIME, native drops only a path.
    pub fn from_dropped(file: &eframe::egui::DroppedFile) -> Option<Self> {
        if let Some(bytes) = &file.bytes {
            return Some(Self::new(file.name.clone(), file.mime.clone(), bytes.clone()));
        }
        let path = file.path.as_ref()?;
        match Self::from_path(path) {
            Ok(f) => Some(f),
            Err(e) => {
                debug!("could not read dropped file {}: {e}", path.display());
                None
            }
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// Keeps image files, silently drops everything else.
pub fn accept(file: ImageFile) -> Option<ImageFile> {
    if file.is_image() {
        Some(file)
    } else {
        debug!("ignoring {:?} with type {:?}", file.name, file.mime);
        None
    }
}

/// A decoded image with its natural (original) resolution.
pub struct SourceImage {
    name: String,
    image: DynamicImage,
}

impl SourceImage {
    pub fn decode(file: &ImageFile) -> Result<Self, CropError> {
        let image = image::load_from_memory(&file.bytes).map_err(CropError::Decode)?;
        Ok(Self {
            name: file.name.clone(),
            image,
        })
    }

    pub fn from_image(name: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn natural(&self) -> Size {
        let (w, h) = self.image.dimensions();
        Size::new(w as f32, h as f32)
    }

    /// Pixels for the on-screen texture, no side longer than `max_side`.
    ///
    /// Larger images are shown from a downscaled copy that keeps the aspect
    /// ratio; [`Self::natural`] and the export still use the full image.
    pub fn to_display_image(&self, max_side: usize, filter: FilterType) -> eframe::egui::ColorImage {
        let max_side = u32::try_from(max_side).unwrap_or(u32::MAX).max(1);
        let (w, h) = self.image.dimensions();
        if w <= max_side && h <= max_side {
            return color_image(&self.image);
        }
        debug!("showing {w}x{h} image downscaled to fit {max_side}px");
        color_image(&self.image.resize(max_side, max_side, filter))
    }
}

fn color_image(image: &DynamicImage) -> eframe::egui::ColorImage {
    let size = [image.width() as _, image.height() as _];
    let image_buffer = image.to_rgba8();
    let pixels = image_buffer.as_flat_samples();
    eframe::egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice())
}

/// Whether a file is currently dragged over the drop zone. Visual only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DragState {
    hovering: bool,
}

impl DragState {
    pub fn enter(&mut self) {
        self.hovering = true;
    }

    pub fn leave(&mut self) {
        self.hovering = false;
    }

    pub fn drop_done(&mut self) {
        self.hovering = false;
    }

    pub fn is_hovering(self) -> bool {
        self.hovering
    }
}

/// What one frame of raw drag-and-drop input means for the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragEvent {
    Enter,
    Leave,
    Drop,
    Idle,
}

impl DragEvent {
    /// `hovering`: files are over the window; `dropped`: files were released
    /// this frame; `dragging`: the session already shows the hover state.
    pub fn from_frame(hovering: bool, dropped: bool, dragging: bool) -> Self {
        match (hovering, dropped, dragging) {
            (_, true, _) => Self::Drop,
            (true, false, false) => Self::Enter,
            (false, false, true) => Self::Leave,
            _ => Self::Idle,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, 90, 255])
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    pub(crate) fn png_file(width: u32, height: u32) -> ImageFile {
        ImageFile::new("test.png", "image/png", png_bytes(width, height).into())
    }

    #[test]
    fn declared_mime_wins() {
        let f = ImageFile::new("a.txt", "text/plain", png_bytes(2, 2).into());
        assert_eq!(f.mime, "text/plain");
        assert!(accept(f).is_none());
    }

    #[test]
    fn missing_mime_is_sniffed() {
        let f = ImageFile::new("photo", "", png_bytes(2, 2).into());
        assert_eq!(f.mime, "image/png");
        assert!(accept(f).is_some());
    }

    #[test]
    fn unknown_bytes_are_rejected() {
        let f = ImageFile::new("notes", "", b"just some text".to_vec().into());
        assert!(f.mime.is_empty());
        assert!(accept(f).is_none());
    }

    #[test]
    fn any_image_subtype_is_accepted() {
        let f = ImageFile::new("x.webp", "image/webp", Vec::<u8>::new().into());
        assert!(accept(f).is_some());
    }

    #[test]
    fn decode_reports_natural_size() {
        let src = SourceImage::decode(&png_file(40, 30)).unwrap();
        assert_eq!(src.natural(), Size::new(40.0, 30.0));
        assert_eq!(src.name(), "test.png");
        assert_eq!(src.to_display_image(2048, FilterType::Nearest).size, [40, 30]);
    }

    #[test]
    fn oversized_image_is_displayed_downscaled() {
        let src = SourceImage::decode(&png_file(200, 100)).unwrap();
        assert_eq!(src.to_display_image(64, FilterType::Triangle).size, [64, 32]);
        assert_eq!(src.to_display_image(200, FilterType::Triangle).size, [200, 100]);
        assert_eq!(src.natural(), Size::new(200.0, 100.0));
        assert_eq!((src.image().width(), src.image().height()), (200, 100));
    }

    #[test]
    fn decode_fails_on_garbage() {
        let f = ImageFile::new("bad.png", "image/png", vec![0u8; 16].into());
        assert!(matches!(SourceImage::decode(&f), Err(CropError::Decode(_))));
    }

    #[test]
    fn drag_state_toggles() {
        let mut drag = DragState::default();
        assert!(!drag.is_hovering());
        drag.enter();
        assert!(drag.is_hovering());
        drag.leave();
        assert!(!drag.is_hovering());
        drag.enter();
        drag.drop_done();
        assert!(!drag.is_hovering());
    }

    #[test]
    fn drag_events_from_raw_input() {
        use DragEvent::*;
        assert_eq!(DragEvent::from_frame(true, false, false), Enter);
        assert_eq!(DragEvent::from_frame(true, false, true), Idle);
        assert_eq!(DragEvent::from_frame(false, false, true), Leave);
        assert_eq!(DragEvent::from_frame(false, false, false), Idle);
        // a drop wins over whatever the hover state says
        assert_eq!(DragEvent::from_frame(false, true, true), Drop);
        assert_eq!(DragEvent::from_frame(true, true, false), Drop);
        assert_eq!(DragEvent::from_frame(false, true, false), Drop);
    }
}
