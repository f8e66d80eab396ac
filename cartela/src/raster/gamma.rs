#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Shape of the function mapping pixel coverage to alpha.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum GammaMethod {
    /// `alpha = coverage ^ value`.
    #[default]
    Power,
    /// `alpha = min(coverage / value, 1)`.
    Linear,
    /// Coverage is used as is.
    None,
    /// `alpha = 1` if `coverage >= value`, otherwise `0`. Disables anti-aliasing.
    Threshold,
    /// `alpha = min(coverage * value, 1)`.
    Multiply,
}

/// Coverage-to-alpha function applied by the rasterizer before compositing.
///
/// The default is the identity.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gamma {
    /// Function shape.
    pub method: GammaMethod,
    /// Function parameter.
    pub value: f64,
}

impl Default for Gamma {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Gamma {
    /// Gamma that doesn't change coverage.
    pub const IDENTITY: Gamma = Gamma {
        method: GammaMethod::Power,
        value: 1.0,
    };

    /// Creates a new gamma function.
    pub fn new(method: GammaMethod, value: f64) -> Self {
        Self { method, value }
    }

    /// Power gamma with the given exponent.
    pub fn power(value: f64) -> Self {
        Self::new(GammaMethod::Power, value)
    }

    /// Applies the function to a coverage value in `0.0..=1.0`.
    pub fn apply(&self, coverage: f64) -> f64 {
        let x = coverage.clamp(0.0, 1.0);
        let value = self.value;
        let alpha = match self.method {
            GammaMethod::None => x,
            GammaMethod::Power if value == 1.0 => x,
            GammaMethod::Power => {
                if value > 0.0 {
                    x.powf(value)
                } else {
                    x
                }
            }
            GammaMethod::Linear => {
                if value > 0.0 {
                    x / value
                } else {
                    x
                }
            }
            GammaMethod::Threshold => {
                if x >= value && x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            GammaMethod::Multiply => x * value.max(0.0),
        };

        alpha.clamp(0.0, 1.0)
    }

    /// Lookup table from the number of covered sub-samples (`0..=samples`) to 8-bit alpha.
    pub(crate) fn table(&self, samples: u32) -> Vec<u8> {
        let samples = samples.max(1);
        (0..=samples)
            .map(|count| {
                if count == 0 {
                    return 0;
                }
                if count == samples && self.apply(1.0) >= 1.0 {
                    return 255;
                }

                let alpha = self.apply(count as f64 / samples as f64);
                (alpha * 255.0 + 0.5) as u8
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_table() {
        let table = Gamma::default().table(4);
        assert_eq!(table, vec![0, 64, 128, 191, 255]);
    }

    #[test]
    fn methods() {
        assert_abs_diff_eq!(Gamma::power(2.0).apply(0.5), 0.25);
        assert_abs_diff_eq!(Gamma::new(GammaMethod::Linear, 0.5).apply(0.25), 0.5);
        assert_abs_diff_eq!(Gamma::new(GammaMethod::Linear, 0.5).apply(0.75), 1.0);
        assert_abs_diff_eq!(Gamma::new(GammaMethod::Threshold, 0.5).apply(0.49), 0.0);
        assert_abs_diff_eq!(Gamma::new(GammaMethod::Threshold, 0.5).apply(0.5), 1.0);
        assert_abs_diff_eq!(Gamma::new(GammaMethod::Multiply, 3.0).apply(0.2), 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(Gamma::new(GammaMethod::None, 7.0).apply(0.3), 0.3);
    }

    #[test]
    fn threshold_disables_antialiasing() {
        let table = Gamma::new(GammaMethod::Threshold, 0.5).table(4);
        assert_eq!(table, vec![0, 0, 255, 255, 255]);
    }
}
