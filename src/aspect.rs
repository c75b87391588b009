#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AspectRatio {
    #[default]
    Landscape16x9,
    Landscape4x3,
    Square,
    Portrait9x16,
    Freeform,
}

impl AspectRatio {
    /// In the order the preset list shows them.
    pub const PRESETS: [Self; 5] = [
        Self::Landscape16x9,
        Self::Landscape4x3,
        Self::Square,
        Self::Portrait9x16,
        Self::Freeform,
    ];

    /// Width over height, `None` when unconstrained.
    pub fn ratio(self) -> Option<f32> {
        match self {
            Self::Landscape16x9 => Some(16.0 / 9.0),
            Self::Landscape4x3 => Some(4.0 / 3.0),
            Self::Square => Some(1.0),
            Self::Portrait9x16 => Some(9.0 / 16.0),
            Self::Freeform => None,
        }
    }

    pub fn is_constrained(self) -> bool {
        self.ratio().is_some()
    }

    /// The same frame turned on its side.
    pub fn counterpart(self) -> Self {
        match self {
            Self::Landscape16x9 => Self::Portrait9x16,
            Self::Portrait9x16 => Self::Landscape16x9,
            // no 3:4 preset
            Self::Landscape4x3 | Self::Square | Self::Freeform => self,
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Landscape16x9 => "16:9",
            Self::Landscape4x3 => "4:3",
            Self::Square => "1:1 (Square)",
            Self::Portrait9x16 => "9:16 (Portrait)",
            Self::Freeform => "Freeform",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_widescreen() {
        assert_eq!(AspectRatio::default(), AspectRatio::Landscape16x9);
        assert_eq!(AspectRatio::PRESETS[0], AspectRatio::default());
    }

    #[test]
    fn freeform_is_the_only_unconstrained_preset() {
        let unconstrained: Vec<_> = AspectRatio::PRESETS
            .iter()
            .filter(|a| !a.is_constrained())
            .collect();
        assert_eq!(unconstrained, vec![&AspectRatio::Freeform]);
    }

    #[test]
    fn counterpart_swaps_orientation() {
        assert_eq!(
            AspectRatio::Landscape16x9.counterpart(),
            AspectRatio::Portrait9x16
        );
        for a in AspectRatio::PRESETS {
            assert_eq!(a.counterpart().counterpart(), a);
        }
        let wide = AspectRatio::Landscape16x9.ratio().unwrap_or_default();
        let tall = AspectRatio::Portrait9x16.ratio().unwrap_or_default();
        assert!((wide * tall - 1.0).abs() < 1e-6);
    }

    #[test]
    fn labels_match_preset_list() {
        let labels: Vec<String> = AspectRatio::PRESETS.iter().map(|a| a.to_string()).collect();
        assert_eq!(
            labels,
            ["16:9", "4:3", "1:1 (Square)", "9:16 (Portrait)", "Freeform"]
        );
    }
}
