//! The single image session: what is loaded, how it is cropped, what was exported.
//!
//! `Unloaded -> Loaded -> Cropping`. An image becomes `Loaded` once decoded
//! and `Cropping` once it has been laid out, because only then are its
//! displayed dimensions known. Picking another image goes back to `Loaded`.

use log::{debug, info, warn};

use crate::intake::{self, DragState, ImageFile, SourceImage};
use crate::{
    AspectRatio, CenteredCrop, CropError, CropInteraction, CropRect, CropperConfig, ExportPlan,
    ExportResult, Size,
};

#[derive(Default)]
pub enum SessionState {
    #[default]
    Unloaded,
    Loaded {
        source: SourceImage,
    },
    Cropping {
        source: SourceImage,
        /// Captured once when the image is first laid out.
        displayed: Size,
        crop: CropRect,
    },
}

pub struct Session {
    state: SessionState,
    aspect: AspectRatio,
    output: Option<ExportResult>,
    drag: DragState,
    /// Bumped whenever the source image is replaced.
    generation: u64,
    config: CropperConfig,
    interaction: Box<dyn CropInteraction>,
}

impl Session {
    pub fn new(config: CropperConfig) -> Self {
        let interaction = Box::new(CenteredCrop::new(config.initial_fill));
        Self::with_interaction(config, interaction)
    }

    pub fn with_interaction(config: CropperConfig, interaction: Box<dyn CropInteraction>) -> Self {
        Self {
            state: SessionState::Unloaded,
            aspect: config.default_aspect,
            output: None,
            drag: DragState::default(),
            generation: 0,
            config,
            interaction,
        }
    }

    /// Takes a picked or dropped file. Returns `Ok(false)` when the file is
    /// not an image and was ignored; the session is then untouched.
    pub fn select(&mut self, file: ImageFile) -> Result<bool, CropError> {
        let Some(file) = intake::accept(file) else {
            return Ok(false);
        };
        let source = SourceImage::decode(&file)?;
        info!(
            "loaded {} ({}x{}, {})",
            source.name(),
            source.natural().width,
            source.natural().height,
            file.mime
        );
        self.load(source);
        Ok(true)
    }

    /// Replaces whatever image was loaded before.
    pub fn load(&mut self, source: SourceImage) {
        self.state = SessionState::Loaded { source };
        self.generation += 1;
    }

    /// The image has been laid out at `displayed`. Places the initial crop.
    pub fn image_ready(&mut self, displayed: Size) {
        if displayed.is_empty() {
            return;
        }
        let state = std::mem::take(&mut self.state);
        self.state = match state {
            SessionState::Loaded { source } => {
                let crop = self
                    .interaction
                    .initial_rect(source.natural(), displayed, self.aspect);
                debug!("image ready at {displayed:?}, initial crop {crop:?}");
                SessionState::Cropping {
                    source,
                    displayed,
                    crop,
                }
            }
            other => other,
        };
    }

    /// Switching ratio re-centres the crop; manual adjustments are lost.
    pub fn set_aspect(&mut self, aspect: AspectRatio) {
        self.aspect = aspect;
        if let SessionState::Cropping {
            source,
            displayed,
            crop,
        } = &mut self.state
        {
            *crop = self
                .interaction
                .initial_rect(source.natural(), *displayed, aspect);
            debug!("aspect set to {aspect}, crop reset to {crop:?}");
        }
    }

    /// Stores the widget's rectangle as is.
    pub fn rect_changed(&mut self, rect: CropRect) {
        if let SessionState::Cropping { crop, .. } = &mut self.state {
            *crop = rect;
        }
    }

    pub fn can_export(&self) -> bool {
        matches!(self.state, SessionState::Cropping { .. })
    }

    /// Renders the current crop. Does nothing until an image is being cropped.
    pub fn export(&mut self, pixel_ratio: f32) -> Result<Option<&ExportResult>, CropError> {
        let SessionState::Cropping {
            source,
            displayed,
            crop,
        } = &self.state
        else {
            warn!("export requested without a crop");
            return Ok(None);
        };
        let plan = ExportPlan::new(*crop, source.natural(), *displayed, pixel_ratio);
        let result = ExportResult::produce(
            source.image(),
            &plan,
            self.config.resample_filter,
            self.config.jpeg_quality,
        )?;
        info!("exported {}x{} JPEG", result.width, result.height);
        Ok(Some(&*self.output.insert(result)))
    }

    pub fn drag_enter(&mut self) {
        self.drag.enter();
    }

    pub fn drag_leave(&mut self) {
        self.drag.leave();
    }

    pub fn drop_file(&mut self, file: ImageFile) -> Result<bool, CropError> {
        self.drag.drop_done();
        self.select(file)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_hovering()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn aspect(&self) -> AspectRatio {
        self.aspect
    }

    pub fn crop(&self) -> Option<CropRect> {
        match &self.state {
            SessionState::Cropping { crop, .. } => Some(*crop),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<&SourceImage> {
        match &self.state {
            SessionState::Unloaded => None,
            SessionState::Loaded { source } | SessionState::Cropping { source, .. } => Some(source),
        }
    }

    pub fn displayed(&self) -> Option<Size> {
        match &self.state {
            SessionState::Cropping { displayed, .. } => Some(*displayed),
            _ => None,
        }
    }

    pub fn output(&self) -> Option<&ExportResult> {
        self.output.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &CropperConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::tests::{png_bytes, png_file};
    use crate::widget::centered_aspect_crop;
    use image::imageops::FilterType;
    use image::{DynamicImage, RgbImage};
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Counts calls and returns a fixed-fill centred crop.
    struct FakeInteraction {
        calls: Rc<Cell<usize>>,
    }

    impl CropInteraction for FakeInteraction {
        fn initial_rect(&self, _natural: Size, displayed: Size, aspect: AspectRatio) -> CropRect {
            self.calls.set(self.calls.get() + 1);
            centered_aspect_crop(displayed, aspect, 0.9)
        }
    }

    fn fake_session() -> (Session, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let session = Session::with_interaction(
            CropperConfig::default(),
            Box::new(FakeInteraction {
                calls: calls.clone(),
            }),
        );
        (session, calls)
    }

    fn text_file() -> ImageFile {
        ImageFile::new("notes.txt", "text/plain", b"hello".to_vec().into())
    }

    #[test]
    fn starts_unloaded_with_default_aspect() {
        let session = Session::new(CropperConfig::default());
        assert!(matches!(session.state(), SessionState::Unloaded));
        assert_eq!(session.aspect(), AspectRatio::Landscape16x9);
        assert!(!session.can_export());
        assert!(session.output().is_none());
    }

    #[test]
    fn select_then_layout_moves_through_states() {
        let (mut session, calls) = fake_session();
        assert!(session.select(png_file(40, 30)).unwrap());
        assert!(matches!(session.state(), SessionState::Loaded { .. }));
        assert!(session.crop().is_none());
        assert!(!session.can_export());

        session.image_ready(Size::new(40.0, 30.0));
        assert!(matches!(session.state(), SessionState::Cropping { .. }));
        assert_eq!(calls.get(), 1);
        assert!(session.can_export());
        assert_eq!(session.displayed(), Some(Size::new(40.0, 30.0)));

        // further layouts do not re-centre
        session.image_ready(Size::new(20.0, 15.0));
        assert_eq!(calls.get(), 1);
        assert_eq!(session.displayed(), Some(Size::new(40.0, 30.0)));
    }

    #[test]
    fn empty_layout_is_ignored() {
        let (mut session, calls) = fake_session();
        session.select(png_file(4, 4)).unwrap();
        session.image_ready(Size::new(0.0, 0.0));
        assert!(matches!(session.state(), SessionState::Loaded { .. }));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn non_image_leaves_session_untouched() {
        let (mut session, _) = fake_session();
        assert!(!session.select(text_file()).unwrap());
        assert!(matches!(session.state(), SessionState::Unloaded));

        session.select(png_file(10, 10)).unwrap();
        session.image_ready(Size::new(10.0, 10.0));
        let crop = session.crop();
        let generation = session.generation();

        session.drag_enter();
        assert!(!session.drop_file(text_file()).unwrap());
        assert!(!session.is_dragging());
        assert_eq!(session.generation(), generation);
        assert_eq!(session.crop(), crop);
        assert!(session.can_export());
    }

    #[test]
    fn undecodable_image_is_an_error_and_keeps_previous() {
        let (mut session, _) = fake_session();
        session.select(png_file(10, 10)).unwrap();
        let bad = ImageFile::new("bad.png", "image/png", vec![1u8, 2, 3].into());
        assert!(matches!(session.select(bad), Err(CropError::Decode(_))));
        assert_eq!(session.source().map(SourceImage::name), Some("test.png"));
    }

    #[test]
    fn new_image_replaces_old_and_drops_crop() {
        let (mut session, _) = fake_session();
        session.select(png_file(10, 10)).unwrap();
        session.image_ready(Size::new(10.0, 10.0));
        let file = ImageFile::new("second.png", "", png_bytes(20, 10).into());
        assert!(session.select(file).unwrap());
        assert!(session.crop().is_none());
        assert_eq!(session.source().map(SourceImage::natural), Some(Size::new(20.0, 10.0)));
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn aspect_change_without_image_creates_nothing() {
        let (mut session, calls) = fake_session();
        session.set_aspect(AspectRatio::Square);
        assert_eq!(session.aspect(), AspectRatio::Square);
        assert!(session.crop().is_none());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn aspect_change_recentres_and_discards_edits() {
        let (mut session, _) = fake_session();
        session.select(png_file(80, 60)).unwrap();
        session.image_ready(Size::new(800.0, 600.0));
        session.rect_changed(CropRect::percent(0.0, 0.0, 10.0, 10.0));

        session.set_aspect(AspectRatio::Square);
        let crop = session.crop().unwrap().to_pixels(Size::new(800.0, 600.0));
        assert!((crop.width - 540.0).abs() < 1e-3);
        assert!((crop.x - 130.0).abs() < 1e-3);
    }

    #[test]
    fn freeform_keeps_manual_ratio_after_reset() {
        let (mut session, _) = fake_session();
        let displayed = Size::new(800.0, 600.0);
        session.select(png_file(80, 60)).unwrap();
        session.image_ready(displayed);
        session.set_aspect(AspectRatio::Freeform);

        // the reset happens once, on the ratio change itself
        let manual = CropRect::pixels(10.0, 10.0, 300.0, 50.0);
        session.rect_changed(manual);
        assert_eq!(session.crop(), Some(manual));
        assert!((session.crop().unwrap().aspect(displayed) - 6.0).abs() < 1e-6);
    }

    #[test]
    fn rect_changes_before_layout_are_dropped() {
        let (mut session, _) = fake_session();
        session.rect_changed(CropRect::percent(1.0, 1.0, 1.0, 1.0));
        assert!(session.crop().is_none());
    }

    #[test]
    fn export_is_noop_until_cropping() {
        let (mut session, _) = fake_session();
        assert!(session.export(2.0).unwrap().is_none());
        session.select(png_file(8, 8)).unwrap();
        assert!(session.export(2.0).unwrap().is_none());
        assert!(session.output().is_none());
    }

    #[test]
    fn hidpi_square_scenario() {
        let config = CropperConfig {
            resample_filter: FilterType::Nearest,
            ..CropperConfig::default()
        };
        let mut session = Session::with_interaction(config, Box::new(CenteredCrop::new(0.9)));
        let image = DynamicImage::ImageRgb8(RgbImage::new(4000, 3000));
        session.load(SourceImage::from_image("big", image));
        session.image_ready(Size::new(800.0, 600.0));
        session.set_aspect(AspectRatio::Square);

        let crop = session.crop().unwrap();
        let plan = ExportPlan::new(crop, Size::new(4000.0, 3000.0), Size::new(800.0, 600.0), 2.0);
        assert!((plan.source.width - 2700.0).abs() < 0.05);
        assert!((plan.source.height - 2700.0).abs() < 0.05);
        assert_eq!(plan.surface(), (1080, 1080));

        let out = session.export(2.0).unwrap().unwrap();
        assert_eq!((out.width, out.height), (1080, 1080));
    }

    #[test]
    fn export_replaces_previous_result() {
        let (mut session, _) = fake_session();
        session.select(png_file(64, 64)).unwrap();
        session.image_ready(Size::new(64.0, 64.0));
        let first = session.export(1.0).unwrap().cloned().unwrap();
        session.rect_changed(CropRect::pixels(0.0, 0.0, 16.0, 8.0));
        session.export(1.0).unwrap();
        let second = session.output().unwrap();
        assert_ne!(&first, second);
        assert_eq!((second.width, second.height), (16, 8));
    }

    #[test]
    fn repeated_export_is_byte_identical() {
        let (mut session, _) = fake_session();
        session.select(png_file(50, 40)).unwrap();
        session.image_ready(Size::new(25.0, 20.0));
        let a = session.export(1.5).unwrap().cloned().unwrap();
        let b = session.export(1.5).unwrap().cloned().unwrap();
        assert_eq!(a.data_uri, b.data_uri);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn initial_crop_matches_active_ratio(
            w in 10.0f32..2000.0,
            h in 10.0f32..2000.0,
            aspect in prop::sample::select(AspectRatio::PRESETS.to_vec()),
        ) {
            let mut session = Session::new(CropperConfig::default());
            session.load(SourceImage::from_image("img", DynamicImage::ImageRgb8(RgbImage::new(4, 4))));
            session.set_aspect(aspect);
            let displayed = Size::new(w, h);
            session.image_ready(displayed);
            let crop = session.crop().unwrap();
            prop_assert!(crop.within(displayed));
            if let Some(ratio) = aspect.ratio() {
                prop_assert!((crop.aspect(displayed) - ratio).abs() / ratio < 1e-3);
            }
        }
    }
}
