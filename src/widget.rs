//! The crop interaction: initial placement and pointer-driven editing.

use eframe::egui;

use crate::{AspectRatio, CropRect, Size};

/// Smallest side, in normalized units, a constrained resize may shrink to.
const MIN_SIDE: f32 = 0.01;

/// Places the initial crop for an image.
///
/// The interactive part reports edits back to the caller each frame; this is
/// the part session logic depends on, so tests can swap it for a fake.
pub trait CropInteraction {
    fn initial_rect(&self, natural: Size, displayed: Size, aspect: AspectRatio) -> CropRect;
}

/// A centred crop covering `fill` of the limiting side of `displayed`.
///
/// With a ratio wider than the image, width is limiting; otherwise height.
/// Freeform covers `fill` of both sides. Returned in percent.
pub fn centered_aspect_crop(displayed: Size, aspect: AspectRatio, fill: f32) -> CropRect {
    let (w, h) = match (aspect.ratio(), displayed.aspect()) {
        (Some(ratio), Some(image_ratio)) if ratio >= image_ratio => {
            let w = displayed.width * fill;
            (w, w / ratio)
        }
        (Some(ratio), Some(_)) => {
            let h = displayed.height * fill;
            (h * ratio, h)
        }
        _ => (displayed.width * fill, displayed.height * fill),
    };
    CropRect::pixels(
        (displayed.width - w) / 2.0,
        (displayed.height - h) / 2.0,
        w,
        h,
    )
    .to_percent(displayed)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Top,
    Bottom,
    Left,
    Right,
    Center, // Moving
}

impl ResizeHandle {
    fn cursor(self) -> egui::CursorIcon {
        match self {
            Self::TopLeft | Self::BottomRight => egui::CursorIcon::ResizeNwSe,
            Self::TopRight | Self::BottomLeft => egui::CursorIcon::ResizeNeSw,
            Self::Top | Self::Bottom => egui::CursorIcon::ResizeVertical,
            Self::Left | Self::Right => egui::CursorIcon::ResizeHorizontal,
            Self::Center => egui::CursorIcon::Grab,
        }
    }
}

fn hit_test(pos: egui::Pos2, rect: egui::Rect) -> Option<ResizeHandle> {
    let tolerance = 10.0;

    let min = rect.min;
    let max = rect.max;

    if pos.distance(min) < tolerance {
        return Some(ResizeHandle::TopLeft);
    }
    if pos.distance(egui::pos2(max.x, min.y)) < tolerance {
        return Some(ResizeHandle::TopRight);
    }
    if pos.distance(egui::pos2(min.x, max.y)) < tolerance {
        return Some(ResizeHandle::BottomLeft);
    }
    if pos.distance(max) < tolerance {
        return Some(ResizeHandle::BottomRight);
    }

    if (pos.x - min.x).abs() < tolerance && pos.y > min.y && pos.y < max.y {
        return Some(ResizeHandle::Left);
    }
    if (pos.x - max.x).abs() < tolerance && pos.y > min.y && pos.y < max.y {
        return Some(ResizeHandle::Right);
    }
    if (pos.y - min.y).abs() < tolerance && pos.x > min.x && pos.x < max.x {
        return Some(ResizeHandle::Top);
    }
    if (pos.y - max.y).abs() < tolerance && pos.x > min.x && pos.x < max.x {
        return Some(ResizeHandle::Bottom);
    }

    if rect.contains(pos) {
        return Some(ResizeHandle::Center);
    }

    None
}

fn unit_rect() -> egui::Rect {
    egui::Rect::from_min_max(egui::Pos2::ZERO, egui::pos2(1.0, 1.0))
}

/// Moves the rect by `delta` without letting it leave the unit square.
fn pan(rect: egui::Rect, delta: egui::Vec2) -> egui::Rect {
    let mut d = delta;
    if rect.min.x + d.x < 0.0 {
        d.x = -rect.min.x;
    }
    if rect.max.x + d.x > 1.0 {
        d.x = 1.0 - rect.max.x;
    }
    if rect.min.y + d.y < 0.0 {
        d.y = -rect.min.y;
    }
    if rect.max.y + d.y > 1.0 {
        d.y = 1.0 - rect.max.y;
    }
    rect.translate(d)
}

/// Resize keeping the on-screen ratio. Returns `None` if the result would
/// leave the image or collapse, in which case the drag step is dropped.
fn resize_constrained(
    rect: egui::Rect,
    handle: ResizeHandle,
    delta: egui::Vec2,
    display_size: egui::Vec2,
    ratio: f32,
) -> Option<egui::Rect> {
    let norm_aspect = ratio * (display_size.y / display_size.x);

    let next = match handle {
        ResizeHandle::Center => pan(rect, delta),
        ResizeHandle::TopLeft
        | ResizeHandle::TopRight
        | ResizeHandle::BottomLeft
        | ResizeHandle::BottomRight => {
            // opposite corner stays put
            let (anchor, corner) = match handle {
                ResizeHandle::TopLeft => (rect.max, rect.min),
                ResizeHandle::TopRight => (rect.left_bottom(), rect.right_top()),
                ResizeHandle::BottomLeft => (rect.right_top(), rect.left_bottom()),
                _ => (rect.min, rect.max),
            };
            let corner = corner + delta;

            // project the dragged size onto the ratio direction, in screen space
            let raw = egui::vec2(
                (corner.x - anchor.x).abs() * display_size.x,
                (corner.y - anchor.y).abs() * display_size.y,
            );
            let u = egui::vec2(ratio, 1.0);
            let constrained = u * (raw.dot(u) / u.length_sq());
            let dim = constrained / display_size;

            match handle {
                ResizeHandle::TopLeft => egui::Rect::from_min_max(anchor - dim, anchor),
                ResizeHandle::TopRight => egui::Rect::from_min_max(
                    egui::pos2(anchor.x, anchor.y - dim.y),
                    egui::pos2(anchor.x + dim.x, anchor.y),
                ),
                ResizeHandle::BottomLeft => egui::Rect::from_min_max(
                    egui::pos2(anchor.x - dim.x, anchor.y),
                    egui::pos2(anchor.x, anchor.y + dim.y),
                ),
                _ => egui::Rect::from_min_max(anchor, anchor + dim),
            }
        }
        ResizeHandle::Left | ResizeHandle::Right => {
            let mut next = rect;
            if handle == ResizeHandle::Left {
                next.min.x += delta.x;
            } else {
                next.max.x += delta.x;
            }
            let h = next.width() / norm_aspect;
            let cy = rect.center().y;
            next.min.y = cy - h * 0.5;
            next.max.y = cy + h * 0.5;
            next
        }
        ResizeHandle::Top | ResizeHandle::Bottom => {
            let mut next = rect;
            if handle == ResizeHandle::Top {
                next.min.y += delta.y;
            } else {
                next.max.y += delta.y;
            }
            let w = next.height() * norm_aspect;
            let cx = rect.center().x;
            next.min.x = cx - w * 0.5;
            next.max.x = cx + w * 0.5;
            next
        }
    };

    let fits = unit_rect().expand(1e-4).contains_rect(next);
    (fits && next.width() >= MIN_SIDE && next.height() >= MIN_SIDE).then_some(next)
}

fn resize_free(rect: egui::Rect, handle: ResizeHandle, delta: egui::Vec2) -> egui::Rect {
    let mut r = rect;
    match handle {
        ResizeHandle::Center => return pan(rect, delta),
        ResizeHandle::TopLeft => r.min += delta,
        ResizeHandle::TopRight => {
            r.min.y += delta.y;
            r.max.x += delta.x;
        }
        ResizeHandle::BottomLeft => {
            r.min.x += delta.x;
            r.max.y += delta.y;
        }
        ResizeHandle::BottomRight => r.max += delta,
        ResizeHandle::Top => r.min.y += delta.y,
        ResizeHandle::Bottom => r.max.y += delta.y,
        ResizeHandle::Left => r.min.x += delta.x,
        ResizeHandle::Right => r.max.x += delta.x,
    }

    r.min = r.min.clamp(egui::Pos2::ZERO, egui::pos2(1.0, 1.0));
    r.max = r.max.clamp(egui::Pos2::ZERO, egui::pos2(1.0, 1.0));
    if r.min.x > r.max.x {
        std::mem::swap(&mut r.min.x, &mut r.max.x);
    }
    if r.min.y > r.max.y {
        std::mem::swap(&mut r.min.y, &mut r.max.y);
    }
    r
}

/// One drag step on a normalized rect. `delta` is in screen points.
pub fn drag_rect(
    rect: egui::Rect,
    handle: ResizeHandle,
    delta: egui::Vec2,
    display_size: egui::Vec2,
    aspect: AspectRatio,
) -> egui::Rect {
    let delta_norm = delta / display_size;
    match aspect.ratio() {
        Some(ratio) => resize_constrained(rect, handle, delta_norm, display_size, ratio)
            .unwrap_or(rect),
        None => resize_free(rect, handle, delta_norm),
    }
}

/// What the overlay did this frame.
pub struct OverlayResponse {
    /// Size the image is laid out at.
    pub displayed: Size,
    /// Set when the user moved or resized the crop.
    pub changed: Option<CropRect>,
}

/// Initial placement used by the app: a centred crop covering `fill` of the
/// limiting side.
#[derive(Clone, Copy, Debug)]
pub struct CenteredCrop {
    fill: f32,
}

impl CenteredCrop {
    pub fn new(fill: f32) -> Self {
        Self { fill }
    }
}

impl CropInteraction for CenteredCrop {
    fn initial_rect(&self, _natural: Size, displayed: Size, aspect: AspectRatio) -> CropRect {
        centered_aspect_crop(displayed, aspect, self.fill)
    }
}

/// Draggable crop rectangle painted over the image.
#[derive(Default)]
pub struct CropOverlay {
    selected_handle: Option<ResizeHandle>,
}

impl CropOverlay {
    const PADDING: f32 = 20.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Forget any drag in progress, e.g. after the image changed.
    pub fn reset(&mut self) {
        self.selected_handle = None;
    }

    /// Size at which an image fits `available`, never upscaled.
    pub fn fit(image_size: egui::Vec2, available: egui::Vec2) -> egui::Vec2 {
        let max_size = available - egui::vec2(Self::PADDING * 2.0, Self::PADDING * 2.0);
        let scale = (max_size.x / image_size.x)
            .min(max_size.y / image_size.y)
            .clamp(0.01, 1.0);
        image_size * scale
    }

    /// Lays the image out from its `natural` size. The texture may be a
    /// downscaled copy; it is stretched over the same rect.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        texture: &egui::TextureHandle,
        natural: Size,
        crop: Option<CropRect>,
        aspect: AspectRatio,
    ) -> OverlayResponse {
        let available_size = ui.available_size();
        let display_size = Self::fit(egui::vec2(natural.width, natural.height), available_size);
        let displayed = Size::from(display_size);

        let total_display_size = display_size + egui::vec2(Self::PADDING * 2.0, Self::PADDING * 2.0);
        let x_offset = (available_size.x - total_display_size.x) / 2.0;
        let start_pos = ui.cursor().min + egui::vec2(x_offset.max(0.0), 0.0);
        let target_rect = egui::Rect::from_min_size(start_pos, total_display_size);

        let response = ui.allocate_rect(target_rect, egui::Sense::drag());
        let painter = ui.painter_at(target_rect);
        let image_rect = egui::Rect::from_min_size(
            target_rect.min + egui::vec2(Self::PADDING, Self::PADDING),
            display_size,
        );

        painter.image(
            texture.id(),
            image_rect,
            unit_rect(),
            egui::Color32::WHITE,
        );

        let Some(crop) = crop else {
            return OverlayResponse {
                displayed,
                changed: None,
            };
        };

        let mut norm = crop.to_normalized(displayed);
        let to_screen = |r: egui::Rect| {
            egui::Rect::from_min_max(
                image_rect.lerp_inside(r.min.to_vec2()),
                image_rect.lerp_inside(r.max.to_vec2()),
            )
        };
        let mut screen_crop_rect = to_screen(norm);
        let mut changed = None;

        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.selected_handle = hit_test(pos, screen_crop_rect);
            }
        }

        if response.dragged() {
            if let Some(handle) = self.selected_handle {
                let next = drag_rect(norm, handle, response.drag_delta(), display_size, aspect);
                if next != norm {
                    norm = next;
                    screen_crop_rect = to_screen(norm);
                    changed = Some(CropRect::from_normalized(norm));
                }
                ui.ctx().set_cursor_icon(handle.cursor());
            }
        } else if let Some(handle) = response
            .hover_pos()
            .and_then(|pos| hit_test(pos, screen_crop_rect))
        {
            ui.ctx().set_cursor_icon(handle.cursor());
        }

        if response.drag_stopped() {
            self.selected_handle = None;
        }

        paint_overlay(&painter, image_rect, screen_crop_rect);

        OverlayResponse { displayed, changed }
    }
}

fn paint_overlay(painter: &egui::Painter, image_rect: egui::Rect, crop: egui::Rect) {
    // dim everything outside the crop
    let overlay_color = egui::Color32::from_black_alpha(150);
    let shades = [
        egui::Rect::from_min_max(image_rect.min, egui::pos2(image_rect.max.x, crop.min.y)),
        egui::Rect::from_min_max(egui::pos2(image_rect.min.x, crop.max.y), image_rect.max),
        egui::Rect::from_min_max(
            egui::pos2(image_rect.min.x, crop.min.y),
            egui::pos2(crop.min.x, crop.max.y),
        ),
        egui::Rect::from_min_max(
            egui::pos2(crop.max.x, crop.min.y),
            egui::pos2(image_rect.max.x, crop.max.y),
        ),
    ];
    for shade in shades {
        painter.rect_filled(shade, 0.0, overlay_color);
    }

    painter.rect_stroke(crop, 0.0, egui::Stroke::new(1.0, egui::Color32::WHITE));

    let handle_stroke = egui::Stroke::new(1.0, egui::Color32::BLACK);
    let handles = [
        crop.min,
        crop.max,
        crop.left_bottom(),
        crop.right_top(),
        crop.center_top(),
        crop.center_bottom(),
        crop.left_center(),
        crop.right_center(),
    ];
    for pos in handles {
        painter.circle(pos, 6.0, egui::Color32::WHITE, handle_stroke);
    }
}
