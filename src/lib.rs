#![warn(clippy::all, rust_2018_idioms)]

//! Pick or drop a photo, crop it to a preset aspect ratio and export the
//! region as a JPEG data URI at full source resolution.

mod app;
mod aspect;
mod config;
mod error;
pub mod export;
pub mod file_picker;
mod geometry;
pub mod intake;
mod session;
pub mod widget;

pub use app::CropperApp;
pub use aspect::AspectRatio;
pub use config::CropperConfig;
pub use error::CropError;
pub use export::{ExportPlan, ExportResult};
pub use geometry::{CropRect, CropUnit, PixelRect, Size};
pub use session::{Session, SessionState};
pub use widget::{CenteredCrop, CropInteraction, CropOverlay};

impl CropperApp {
    /// Runs the app natively with options derived from `config`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn run(config: CropperConfig) -> eframe::Result {
        let options = config.native_options();
        let title = config.title.clone();
        eframe::run_native(
            &title,
            options,
            Box::new(move |cc| Ok(Box::new(CropperApp::new(cc, config)))),
        )
    }
}
