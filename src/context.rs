//! Options for a corrected-amplitude flagging run.

use std::fmt::Display;

use derive_builder::Builder;

use crate::error::AmpflagError;

/// Thresholds for a flagging run.
///
/// The sigma thresholds are multiples of the robust standard deviation
/// estimated per (field, spw, polarisation) selection; the `tm*` values
/// are fractions. Defaults match the task interface.
///
/// # Examples
///
/// ```rust
/// use ampflag::FlagContextBuilder;
///
/// let ctx = FlagContextBuilder::default()
///     .antnegsig(6.0)
///     .build()
///     .unwrap();
/// assert!(ctx.validate().is_ok());
/// ```
#[derive(Builder, Debug, Clone)]
pub struct FlagContext {
    /// Lower sigma threshold for outliers caused by bad antennas within
    /// individual timestamps.
    #[builder(default = "8.0")]
    pub antnegsig: f64,

    /// Upper sigma threshold for outliers caused by bad antennas within
    /// individual timestamps. Only consulted when `tmantint > 0`.
    #[builder(default = "5.8")]
    pub antpossig: f64,

    /// Maximum fraction of timestamps that are allowed to contain
    /// outliers before per-timestamp flagging gives up and relaxes the
    /// baseline thresholds instead. Zero disables the per-timestamp pass
    /// and restricts the outlier search to the negative side.
    #[builder(default = "0.06")]
    pub tmantint: f64,

    /// Initial threshold for the fraction of outlier timestamps over
    /// total timestamps that a baseline may be a part of.
    #[builder(default = "0.09")]
    pub tmint: f64,

    /// Initial threshold for the fraction of bad baselines over all
    /// baselines that an antenna may be a part of.
    #[builder(default = "0.18")]
    pub tmbl: f64,

    /// Lower sigma threshold for outliers caused by bad baselines or bad
    /// antennas across all timestamps. Zero restricts the baseline-level
    /// outlier search to the positive side.
    #[builder(default = "3.7")]
    pub antblnegsig: f64,

    /// Upper sigma threshold for outliers caused by bad baselines or bad
    /// antennas across all timestamps.
    #[builder(default = "3.0")]
    pub antblpossig: f64,

    /// Scale applied to `tmint` and `tmbl` when outliers are too spread
    /// out in time for per-timestamp attribution.
    #[builder(default = "2.0")]
    pub relaxed_factor: f64,

    /// Whether to draw a progress bar over the (field, spw, pol) units.
    #[builder(default = "false")]
    pub draw_progress: bool,
}

impl Default for FlagContext {
    fn default() -> Self {
        Self {
            antnegsig: 8.0,
            antpossig: 5.8,
            tmantint: 0.06,
            tmint: 0.09,
            tmbl: 0.18,
            antblnegsig: 3.7,
            antblpossig: 3.0,
            relaxed_factor: 2.0,
            draw_progress: false,
        }
    }
}

impl Display for FlagContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.tmantint > 0.0 {
            writeln!(
                f,
                "Will attribute per-timestamp outliers beyond -{}/+{} sigma \
                 in up to {} of timestamps.",
                self.antnegsig, self.antpossig, self.tmantint
            )?;
        } else {
            writeln!(
                f,
                "Will not attribute per-timestamp outliers (negative-only \
                 search beyond -{} sigma).",
                self.antnegsig
            )?;
        }
        writeln!(
            f,
            "Will flag baselines beyond {} of their timestamps ({} sigma \
             selection), antennas beyond {} of their baselines.",
            self.tmint,
            if self.antblnegsig > 0.0 {
                format!("-{}/+{}", self.antblnegsig, self.antblpossig)
            } else {
                format!("+{}", self.antblpossig)
            },
            self.tmbl
        )?;
        writeln!(f, "Relaxed threshold factor: {}.", self.relaxed_factor)?;
        Ok(())
    }
}

impl FlagContext {
    /// Check every threshold against its documented domain.
    ///
    /// Run once by the orchestrator before any data is read; callers that
    /// drive [`flag_chunk`](crate::flag_chunk) directly should do the
    /// same.
    ///
    /// # Errors
    ///
    /// [`AmpflagError::BadThreshold`] naming the first offending field.
    pub fn validate(&self) -> Result<(), AmpflagError> {
        let bad = |param: &'static str, value: f64, expected: &'static str| {
            Err(AmpflagError::BadThreshold {
                param,
                value,
                expected,
            })
        };

        if !self.antnegsig.is_finite() || self.antnegsig <= 0.0 {
            return bad("antnegsig", self.antnegsig, "finite and > 0");
        }
        if !self.tmantint.is_finite() || self.tmantint < 0.0 {
            return bad("tmantint", self.tmantint, "finite and >= 0");
        }
        if self.tmantint > 0.0 && (!self.antpossig.is_finite() || self.antpossig <= 0.0) {
            return bad("antpossig", self.antpossig, "finite and > 0 when tmantint > 0");
        }
        if !self.tmint.is_finite() || self.tmint <= 0.0 {
            return bad("tmint", self.tmint, "finite and > 0");
        }
        if !self.tmbl.is_finite() || self.tmbl <= 0.0 {
            return bad("tmbl", self.tmbl, "finite and > 0");
        }
        if !self.antblnegsig.is_finite() || self.antblnegsig < 0.0 {
            return bad("antblnegsig", self.antblnegsig, "finite and >= 0");
        }
        if !self.antblpossig.is_finite() || self.antblpossig <= 0.0 {
            return bad("antblpossig", self.antblpossig, "finite and > 0");
        }
        if !self.relaxed_factor.is_finite() || self.relaxed_factor < 1.0 {
            return bad("relaxed_factor", self.relaxed_factor, "finite and >= 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let ctx = FlagContext::default();
        assert!(ctx.validate().is_ok());

        let built = FlagContextBuilder::default().build().unwrap();
        assert_eq!(format!("{:?}", built), format!("{:?}", ctx));
    }

    #[test]
    fn test_builder_overrides() {
        let ctx = FlagContextBuilder::default()
            .tmantint(0.0)
            .antblnegsig(0.0)
            .build()
            .unwrap();
        // with the per-timestamp pass disabled, antpossig is not consulted
        assert!(ctx.validate().is_ok());
        assert!(format!("{}", ctx).contains("negative-only"));
    }

    #[test]
    fn test_validation_rejects_bad_thresholds() {
        for (ctx, param) in [
            (
                FlagContextBuilder::default().antnegsig(0.0).build().unwrap(),
                "antnegsig",
            ),
            (
                FlagContextBuilder::default().antpossig(-1.0).build().unwrap(),
                "antpossig",
            ),
            (
                FlagContextBuilder::default().tmantint(-0.5).build().unwrap(),
                "tmantint",
            ),
            (
                FlagContextBuilder::default().tmint(f64::NAN).build().unwrap(),
                "tmint",
            ),
            (
                FlagContextBuilder::default().tmbl(0.0).build().unwrap(),
                "tmbl",
            ),
            (
                FlagContextBuilder::default().antblnegsig(-1.0).build().unwrap(),
                "antblnegsig",
            ),
            (
                FlagContextBuilder::default().antblpossig(0.0).build().unwrap(),
                "antblpossig",
            ),
            (
                FlagContextBuilder::default().relaxed_factor(0.5).build().unwrap(),
                "relaxed_factor",
            ),
        ] {
            match ctx.validate() {
                Err(AmpflagError::BadThreshold { param: p, .. }) => assert_eq!(p, param),
                other => panic!("expected BadThreshold for {}, got {:?}", param, other),
            }
        }
    }
}
