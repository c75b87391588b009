use image::imageops::FilterType;

use crate::AspectRatio;

/// Tunables for the cropper. `Default` is what the app ships with.
#[derive(Debug, Clone)]
pub struct CropperConfig {
    /// Window title and page heading.
    pub title: String,
    /// Initial inner window size (native only).
    pub window_size: [f32; 2],
    /// Ratio selected before the user picks one.
    pub default_aspect: AspectRatio,
    /// Share of the limiting image side the initial crop covers.
    pub initial_fill: f32,
    /// JPEG quality, 1-100. 92 matches the browser canvas default.
    pub jpeg_quality: u8,
    /// Resampling used when drawing the crop onto the export surface.
    pub resample_filter: FilterType,
}

impl Default for CropperConfig {
    fn default() -> Self {
        Self {
            title: "Photo Crop Tool".to_owned(),
            window_size: [1024.0, 720.0],
            default_aspect: AspectRatio::default(),
            initial_fill: 0.9,
            jpeg_quality: 92,
            resample_filter: FilterType::Lanczos3,
        }
    }
}

impl CropperConfig {
    pub fn native_options(&self) -> eframe::NativeOptions {
        eframe::NativeOptions {
            viewport: eframe::egui::ViewportBuilder::default()
                .with_title(self.title.clone())
                .with_inner_size(self.window_size)
                .with_drag_and_drop(true),
            ..Default::default()
        }
    }
}
