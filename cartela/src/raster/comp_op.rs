use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Compositing operator: how a drawn (source) pixel is combined with the pixel already on the
/// surface (destination).
///
/// Porter-Duff operators follow their classic definitions. Blend modes use the separable blend
/// formula `Dca' = Sca·(1 − Da) + Dca·(1 − Sa) + Sa·Da·B(Sc, Dc)` with
/// `Da' = Sa + Da − Sa·Da`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum CompOp {
    /// Clears the destination.
    Clear,
    /// Replaces the destination.
    Src,
    /// Keeps the destination.
    Dst,
    /// Source over destination.
    #[default]
    SrcOver,
    /// Destination over source.
    DstOver,
    /// Source where the destination is.
    SrcIn,
    /// Destination where the source is.
    DstIn,
    /// Source where the destination is not.
    SrcOut,
    /// Destination where the source is not.
    DstOut,
    /// Source over destination, only where the destination is.
    SrcAtop,
    /// Destination over source, only where the source is.
    DstAtop,
    /// Source and destination where they don't overlap.
    Xor,
    /// Sum of source and destination.
    Plus,
    /// Destination minus source.
    Minus,
    /// Multiplies colors.
    Multiply,
    /// Inverse of multiplying inverted colors.
    Screen,
    /// Multiply or screen depending on the destination.
    Overlay,
    /// Minimum of the colors.
    Darken,
    /// Maximum of the colors.
    Lighten,
    /// Brightens the destination.
    ColorDodge,
    /// Darkens the destination.
    ColorBurn,
    /// Multiply or screen depending on the source.
    HardLight,
    /// Softer version of hard light.
    SoftLight,
    /// Absolute difference of the colors.
    Difference,
    /// Like difference with lower contrast.
    Exclusion,
    /// Scales the destination distance from mid-gray by the source value.
    Contrast,
    /// Inverts the destination where the source is.
    Invert,
    /// `Sc + Dc − 0.5`.
    GrainMerge,
    /// `Dc − Sc + 0.5`.
    GrainExtract,
}

const NAMES: &[(&str, CompOp)] = &[
    ("clear", CompOp::Clear),
    ("src", CompOp::Src),
    ("dst", CompOp::Dst),
    ("src-over", CompOp::SrcOver),
    ("dst-over", CompOp::DstOver),
    ("src-in", CompOp::SrcIn),
    ("dst-in", CompOp::DstIn),
    ("src-out", CompOp::SrcOut),
    ("dst-out", CompOp::DstOut),
    ("src-atop", CompOp::SrcAtop),
    ("dst-atop", CompOp::DstAtop),
    ("xor", CompOp::Xor),
    ("plus", CompOp::Plus),
    ("minus", CompOp::Minus),
    ("multiply", CompOp::Multiply),
    ("screen", CompOp::Screen),
    ("overlay", CompOp::Overlay),
    ("darken", CompOp::Darken),
    ("lighten", CompOp::Lighten),
    ("color-dodge", CompOp::ColorDodge),
    ("color-burn", CompOp::ColorBurn),
    ("hard-light", CompOp::HardLight),
    ("soft-light", CompOp::SoftLight),
    ("difference", CompOp::Difference),
    ("exclusion", CompOp::Exclusion),
    ("contrast", CompOp::Contrast),
    ("invert", CompOp::Invert),
    ("grain-merge", CompOp::GrainMerge),
    ("grain-extract", CompOp::GrainExtract),
];

impl CompOp {
    /// Looks up the operator by name. Both `src-over` and `src_over` spellings are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase().replace('_', "-");
        NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, op)| *op)
    }

    /// Canonical name of the operator.
    pub fn name(&self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, op)| op == self)
            .map(|(name, _)| *name)
            .unwrap_or("src-over")
    }

    /// Returns true if drawing a fully transparent source leaves the destination unchanged.
    pub fn is_src_bounded(&self) -> bool {
        !matches!(
            self,
            CompOp::Clear
                | CompOp::Src
                | CompOp::SrcIn
                | CompOp::DstIn
                | CompOp::SrcOut
                | CompOp::DstAtop
        )
    }

    /// Combines premultiplied source and destination pixels with channels in `0.0..=1.0`.
    pub fn blend(&self, s: [f32; 4], d: [f32; 4]) -> [f32; 4] {
        let sa = s[3];
        let da = d[3];
        let porter_duff = |fs: f32, fd: f32| [0, 1, 2, 3].map(|i| s[i] * fs + d[i] * fd);

        match self {
            CompOp::Clear => [0.0; 4],
            CompOp::Src => s,
            CompOp::Dst => d,
            CompOp::SrcOver => porter_duff(1.0, 1.0 - sa),
            CompOp::DstOver => porter_duff(1.0 - da, 1.0),
            CompOp::SrcIn => porter_duff(da, 0.0),
            CompOp::DstIn => porter_duff(0.0, sa),
            CompOp::SrcOut => porter_duff(1.0 - da, 0.0),
            CompOp::DstOut => porter_duff(0.0, 1.0 - sa),
            CompOp::SrcAtop => porter_duff(da, 1.0 - sa),
            CompOp::DstAtop => porter_duff(1.0 - da, sa),
            CompOp::Xor => porter_duff(1.0 - da, 1.0 - sa),
            CompOp::Plus => [0, 1, 2, 3].map(|i| (s[i] + d[i]).min(1.0)),
            CompOp::Minus => {
                let c = |i: usize| (d[i] - s[i]).max(0.0);
                [c(0), c(1), c(2), sa + da - sa * da]
            }
            CompOp::Invert => {
                let c = |i: usize| (da - d[i]) * sa + d[i] * (1.0 - sa);
                [c(0), c(1), c(2), sa + da - sa * da]
            }
            blend_mode => {
                let f = blend_mode.separable();
                let c = |i: usize| {
                    let sc = if sa > 0.0 { s[i] / sa } else { 0.0 };
                    let dc = if da > 0.0 { d[i] / da } else { 0.0 };
                    s[i] * (1.0 - da) + d[i] * (1.0 - sa) + sa * da * f(sc, dc)
                };
                [c(0), c(1), c(2), sa + da - sa * da]
            }
        }
    }

    fn separable(&self) -> fn(f32, f32) -> f32 {
        match self {
            CompOp::Multiply => |s, d| s * d,
            CompOp::Screen => screen,
            CompOp::Overlay => |s, d| hard_light(d, s),
            CompOp::Darken => |s, d| s.min(d),
            CompOp::Lighten => |s, d| s.max(d),
            CompOp::ColorDodge => |s, d| {
                if d <= 0.0 {
                    0.0
                } else if s >= 1.0 {
                    1.0
                } else {
                    (d / (1.0 - s)).min(1.0)
                }
            },
            CompOp::ColorBurn => |s, d| {
                if d >= 1.0 {
                    1.0
                } else if s <= 0.0 {
                    0.0
                } else {
                    1.0 - ((1.0 - d) / s).min(1.0)
                }
            },
            CompOp::HardLight => hard_light,
            CompOp::SoftLight => soft_light,
            CompOp::Difference => |s, d| (s - d).abs(),
            CompOp::Exclusion => |s, d| s + d - 2.0 * s * d,
            CompOp::Contrast => |s, d| ((d - 0.5) * 2.0 * s + 0.5).clamp(0.0, 1.0),
            CompOp::GrainMerge => |s, d| (s + d - 0.5).clamp(0.0, 1.0),
            CompOp::GrainExtract => |s, d| (d - s + 0.5).clamp(0.0, 1.0),
            _ => |s, _| s,
        }
    }
}

fn screen(s: f32, d: f32) -> f32 {
    s + d - s * d
}

fn hard_light(s: f32, d: f32) -> f32 {
    if s <= 0.5 {
        d * 2.0 * s
    } else {
        screen(d, 2.0 * s - 1.0)
    }
}

fn soft_light(s: f32, d: f32) -> f32 {
    if s <= 0.5 {
        d - (1.0 - 2.0 * s) * d * (1.0 - d)
    } else {
        let g = if d <= 0.25 {
            ((16.0 * d - 12.0) * d + 4.0) * d
        } else {
            d.sqrt()
        };
        d + (2.0 * s - 1.0) * (g - d)
    }
}

impl Display for CompOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CompOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown compositing operator: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const RED_HALF: [f32; 4] = [0.5, 0.0, 0.0, 0.5];
    const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

    #[test]
    fn names() {
        for (name, op) in NAMES {
            assert_eq!(CompOp::from_name(name), Some(*op));
            assert_eq!(op.name(), *name);
        }
        assert_eq!(CompOp::from_name("SRC_OVER"), Some(CompOp::SrcOver));
        assert_eq!(CompOp::from_name("unknown"), None);
    }

    #[test]
    fn porter_duff() {
        assert_eq!(CompOp::SrcOver.blend(RED_HALF, BLUE), [0.5, 0.0, 0.5, 1.0]);
        assert_eq!(CompOp::DstOver.blend(RED_HALF, BLUE), BLUE);
        assert_eq!(CompOp::SrcIn.blend(RED_HALF, BLUE), RED_HALF);
        assert_eq!(CompOp::DstOut.blend(RED_HALF, BLUE), [0.0, 0.0, 0.5, 0.5]);
        assert_eq!(CompOp::Xor.blend(RED_HALF, BLUE), [0.0, 0.0, 0.5, 0.5]);
        assert_eq!(CompOp::Clear.blend(RED_HALF, BLUE), [0.0; 4]);
    }

    #[test]
    fn transparent_source_keeps_bounded_destinations() {
        let transparent = [0.0; 4];
        let dst = [0.2, 0.4, 0.1, 0.6];
        for (_, op) in NAMES {
            if op.is_src_bounded() {
                let result = op.blend(transparent, dst);
                for i in 0..4 {
                    assert_abs_diff_eq!(result[i], dst[i], epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn blend_modes() {
        let gray = [0.5, 0.5, 0.5, 1.0];
        let white = [1.0; 4];
        assert_eq!(CompOp::Multiply.blend(gray, white), gray);
        assert_eq!(CompOp::Screen.blend(gray, [0.0, 0.0, 0.0, 1.0]), gray);
        assert_eq!(CompOp::Difference.blend(white, gray), gray);
        assert_eq!(CompOp::GrainMerge.blend(gray, gray), gray);
        assert_eq!(
            CompOp::Invert.blend(white, [0.25, 0.25, 0.25, 1.0]),
            [0.75, 0.75, 0.75, 1.0]
        );
    }
}
