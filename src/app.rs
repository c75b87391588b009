use eframe::egui;
use log::warn;

use crate::file_picker;
use crate::intake::{DragEvent, ImageFile, SourceImage};
use crate::{AspectRatio, CropOverlay, CropperConfig, Session, SessionState};

pub struct CropperApp {
    session: Session,
    overlay: CropOverlay,
    /// Texture for the current source, tagged with the session generation it was built for.
    source_texture: Option<(u64, egui::TextureHandle)>,
    output_texture: Option<egui::TextureHandle>,
    error: Option<String>,
}

impl CropperApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: CropperConfig) -> Self {
        Self {
            overlay: CropOverlay::new(),
            session: Session::new(config),
            source_texture: None,
            output_texture: None,
            error: None,
        }
    }

    fn report<T>(&mut self, result: Result<T, crate::CropError>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("{e}");
                self.error = Some(e.to_string());
                None
            }
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        let (hovering, dropped) =
            ctx.input(|i| (!i.raw.hovered_files.is_empty(), i.raw.dropped_files.clone()));

        match DragEvent::from_frame(hovering, !dropped.is_empty(), self.session.is_dragging()) {
            DragEvent::Enter => self.session.drag_enter(),
            DragEvent::Leave => self.session.drag_leave(),
            DragEvent::Drop => match dropped.first().and_then(ImageFile::from_dropped) {
                Some(file) => {
                    let result = self.session.drop_file(file);
                    if self.report(result) == Some(true) {
                        self.error = None;
                    }
                }
                None => self.session.drag_leave(),
            },
            DragEvent::Idle => {}
        }

        if let Some(file) = file_picker::take_picked_image() {
            let result = self.session.select(file);
            if self.report(result) == Some(true) {
                self.error = None;
            }
        }
    }

    /// Rebuilds the source texture when the image changes; the old one is freed on drop.
    fn sync_source_texture(&mut self, ctx: &egui::Context) {
        let generation = self.session.generation();
        let Some(source) = self.session.source() else {
            self.source_texture = None;
            return;
        };
        if self.source_texture.as_ref().is_some_and(|(g, _)| *g == generation) {
            return;
        }
        let texture = source_texture(ctx, source, self.session.config().resample_filter);
        self.source_texture = Some((generation, texture));
        self.overlay.reset();
    }

    fn export(&mut self, ctx: &egui::Context) {
        let pixel_ratio = ctx.pixels_per_point();
        let preview = match self.session.export(pixel_ratio) {
            Ok(Some(result)) => result.decode_preview(),
            Ok(None) => return,
            Err(e) => Err(e),
        };
        if let Some(image) = self.report(preview) {
            self.output_texture =
                Some(ctx.load_texture("cropped", image, egui::TextureOptions::LINEAR));
            self.error = None;
        }
    }

    fn aspect_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Choose Aspect Ratio");
        ui.separator();

        for aspect in AspectRatio::PRESETS {
            let selected = self.session.aspect() == aspect;
            if ui.selectable_label(selected, aspect.to_string()).clicked() {
                self.session.set_aspect(aspect);
            }
        }

        let current = self.session.aspect();
        if current.counterpart() != current && ui.button("🔄 Rotate").clicked() {
            self.session.set_aspect(current.counterpart());
        }

        ui.separator();
        ui.vertical_centered(|ui| {
            let save = ui.add_enabled(self.session.can_export(), egui::Button::new("Save Image"));
            if save.clicked() {
                self.export(ui.ctx());
            }
        });

        self.output_section(ui);
    }

    fn output_section(&mut self, ui: &mut egui::Ui) {
        let Some(texture) = &self.output_texture else {
            return;
        };
        ui.add_space(8.0);
        ui.label(egui::RichText::new("Cropped Image:").strong());
        let size = texture.size_vec2();
        let width = ui.available_width().min(size.x);
        ui.add(egui::Image::new((texture.id(), size * (width / size.x))));

        let Some(output) = self.session.output() else {
            return;
        };
        ui.label(format!("{}x{} JPEG, {} bytes", output.width, output.height, output.jpeg.len()));
        #[cfg_attr(target_arch = "wasm32", allow(unused_mut))]
        let mut save_result: Option<Result<(), crate::CropError>> = None;
        ui.horizontal(|ui| {
            if ui.button("Copy data URI").clicked() {
                ui.ctx().copy_text(output.data_uri.clone());
            }
            #[cfg(not(target_arch = "wasm32"))]
            if ui.button("Save As...").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("JPEG", &["jpg", "jpeg"])
                    .set_file_name("cropped.jpg")
                    .save_file()
                {
                    save_result = Some(output.save_to(&path));
                }
            }
        });
        if let Some(result) = save_result {
            self.report(result);
        }
    }

    fn drop_zone(&self, ui: &mut egui::Ui) {
        let dragging = self.session.is_dragging();
        let (fill, stroke) = if dragging {
            (
                egui::Color32::from_rgb(40, 70, 120),
                egui::Stroke::new(2.0, egui::Color32::LIGHT_BLUE),
            )
        } else {
            (
                egui::Color32::from_rgb(30, 60, 40),
                egui::Stroke::new(1.0, egui::Color32::DARK_GRAY),
            )
        };
        let width = ui.available_width();
        egui::Frame::none()
            .fill(fill)
            .stroke(stroke)
            .rounding(8.0)
            .show(ui, |ui| {
                ui.set_min_size(egui::vec2(width, width * 9.0 / 16.0));
                ui.vertical_centered(|ui| {
                    ui.add_space(width * 9.0 / 40.0);
                    let text = if dragging {
                        "Drop the image here!"
                    } else {
                        "Select image or drop image here"
                    };
                    ui.label(egui::RichText::new(text).strong().size(18.0));
                    ui.add_space(8.0);
                    if ui.button("Select image").clicked() {
                        file_picker::open_image_picker();
                    }
                });
            });
    }
}

/// Uploads `source` for display, downscaled to what the GPU accepts.
fn source_texture(
    ctx: &egui::Context,
    source: &SourceImage,
    filter: image::imageops::FilterType,
) -> egui::TextureHandle {
    let max_side = ctx.input(|i| i.max_texture_side);
    ctx.load_texture(
        "source",
        source.to_display_image(max_side, filter),
        egui::TextureOptions::LINEAR,
    )
}

impl eframe::App for CropperApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_input(ctx);
        self.sync_source_texture(ctx);

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.heading(self.session.config().title.as_str());
            ui.label(egui::RichText::new("- use desktop for better compatibility").weak());
        });

        egui::SidePanel::right("aspect_panel")
            .resizable(false)
            .min_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.aspect_panel(ui));
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(err) = &self.error {
                ui.colored_label(egui::Color32::RED, err);
            }

            let Some((_, texture)) = &self.source_texture else {
                self.drop_zone(ui);
                return;
            };

            if ui.button("Choose another image").clicked() {
                file_picker::open_image_picker();
            }
            if let Some(source) = self.session.source() {
                ui.label(source.name());
            }
            ui.separator();

            let Some(natural) = self.session.source().map(SourceImage::natural) else {
                return;
            };
            let response = self.overlay.show(
                ui,
                texture,
                natural,
                self.session.crop(),
                self.session.aspect(),
            );
            if matches!(self.session.state(), SessionState::Loaded { .. }) {
                self.session.image_ready(response.displayed);
                ctx.request_repaint();
            }
            if let Some(rect) = response.changed {
                self.session.rect_changed(rect);
            }
        });
    }
}
