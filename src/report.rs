//! Batch fitting driver and the CSV serialization boundary.
//!
//! Core functions return numbers; the strings live here. The streak table's
//! column order is fixed by the downstream analysis notebooks, so
//! [`StreakRecord`]'s field order must not be rearranged.

use std::io::Write;

use serde::Serialize;
use tracing::{debug, warn};

use crate::fit::{fit_streak, FitConfig};
use crate::photometry::{pill_mask, pill_photometry, zeropoint};
use crate::streak::{ImageSection, Psf, StreakParameters};

/// One row of the streak analysis table. Field order is the CSV column
/// order.
#[derive(Debug, Clone, Serialize)]
pub struct StreakRecord {
    pub index: usize,
    pub center_x: f64,
    pub center_y: f64,
    pub length: f64,
    pub angle_rad: f64,
    pub flux: f64,
    pub flux_err: f64,
    pub magzero: Option<f64>,
    pub magzero_err: Option<f64>,
    pub saturated: bool,
}

/// A candidate streak handed over by the line detector.
#[derive(Debug, Clone)]
pub struct StreakCandidate {
    /// Cutout around the candidate.
    pub section: ImageSection,
    /// Initial parameters from the detector (offsets relative to the cutout
    /// center).
    pub best_guess: StreakParameters,
    /// Absolute full-frame coordinates `(x, y)` of the cutout center, so
    /// fitted offsets can be reported in frame coordinates.
    pub origin: (f64, f64),
    /// True total magnitude, when known (simulated or catalog streaks).
    pub total_mag: Option<f64>,
    /// Detector saturation level in counts; any cutout pixel at or above it
    /// flags the record.
    pub saturation_level: Option<f64>,
}

/// Fit and measure every candidate, skipping failures.
///
/// One candidate failing (bad guess geometry, degenerate cutout) must not
/// abort a night's batch: the error is logged and the loop continues.
/// Photometry runs through a pill of `aperture_radius` around the *fitted*
/// streak.
pub fn fit_candidates(
    candidates: &[StreakCandidate],
    psf: &Psf,
    search_radius: &[f64; 6],
    aperture_radius: f64,
    config: &FitConfig,
) -> Vec<StreakRecord> {
    let mut records = Vec::with_capacity(candidates.len());

    for (i, candidate) in candidates.iter().enumerate() {
        let index = i + 1;
        let fit = fit_streak(
            &candidate.section,
            psf,
            &candidate.best_guess,
            search_radius,
            candidate.total_mag,
            config,
        );
        let (result, _posterior) = match fit {
            Ok(ok) => ok,
            Err(err) => {
                warn!("streak {index}: fit failed, skipping: {err}");
                continue;
            }
        };

        let (h, w) = candidate.section.shape();
        let best = result.parameters();
        let mask = pill_mask(
            (h, w),
            w as f64 / 2.0 + best.x,
            h as f64 / 2.0 + best.y,
            aperture_radius,
            best.length,
            best.angle,
        );
        let phot = pill_photometry(
            &candidate.section.pixels,
            &mask,
            candidate.section.noise_sigma,
        );
        debug!(
            "streak {index}: {} px in pill aperture, flux {:.0} ± {:.0}",
            phot.n_pixels, phot.flux, phot.flux_err
        );
        let magzero = candidate
            .total_mag
            .map(|mag| zeropoint(mag, phot.flux, phot.flux_err));

        let saturated = candidate.saturation_level.is_some_and(|level| {
            candidate.section.pixels.iter().any(|&v| v >= level)
        });

        records.push(StreakRecord {
            index,
            center_x: candidate.origin.0 + result.x.mean,
            center_y: candidate.origin.1 + result.y.mean,
            length: result.length.mean,
            angle_rad: result.angle.mean,
            flux: phot.flux,
            flux_err: phot.flux_err,
            magzero: magzero.map(|(zp, _)| zp),
            magzero_err: magzero.map(|(_, err)| err),
            saturated,
        });
    }

    records
}

/// Write records as CSV with a header row.
pub fn write_records<W: Write>(writer: W, records: &[StreakRecord]) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Render an eclipse percentage the way the observation tables embed it:
/// rounded to the nearest whole percent with a `%` suffix.
pub fn format_eclipse_percent(percent: f64) -> String {
    format!("{}%", percent.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::{apply_poisson_noise, inject_streak};
    use ndarray::Array2;

    #[test]
    fn test_format_eclipse_percent() {
        assert_eq!(format_eclipse_percent(0.0), "0%");
        assert_eq!(format_eclipse_percent(0.4), "0%");
        assert_eq!(format_eclipse_percent(49.85), "50%");
        assert_eq!(format_eclipse_percent(100.0), "100%");
    }

    #[test]
    fn test_csv_column_order() {
        let record = StreakRecord {
            index: 1,
            center_x: 101.5,
            center_y: 203.25,
            length: 30.0,
            angle_rad: 0.5,
            flux: 1234.0,
            flux_err: 56.0,
            magzero: None,
            magzero_err: None,
            saturated: false,
        };
        let mut buf = Vec::new();
        write_records(&mut buf, &[record]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "index,center_x,center_y,length,angle_rad,flux,flux_err,magzero,magzero_err,saturated"
        );
    }

    #[test]
    fn test_batch_skips_failed_candidate() {
        let truth = StreakParameters {
            x: 0.0,
            y: 0.0,
            flux: 50_000.0,
            length: 12.0,
            angle: 0.3,
            background: 0.0,
        };
        let psf = Psf::Gaussian(1.2);
        let mut pixels = Array2::zeros((32, 32));
        inject_streak(&mut pixels, &truth, &psf, 3);
        let pixels = apply_poisson_noise(&pixels, 11);

        let good = StreakCandidate {
            section: ImageSection::new(pixels, 6.4),
            best_guess: truth,
            origin: (100.0, 200.0),
            total_mag: Some(9.5),
            saturation_level: Some(1e9),
        };
        let mut bad = good.clone();
        bad.best_guess.length = -5.0;

        let config = FitConfig {
            n_walkers: 12,
            n_burn: 10,
            n_steps: 20,
            fit_bound: None,
            ..Default::default()
        };
        let radius = [2.0, 2.0, 20_000.0, 4.0, 0.2, 4.0];
        let records = fit_candidates(&[good, bad], &psf, &radius, 5.0, &config);

        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.index, 1);
        assert!(!rec.saturated);
        assert!(rec.flux > 0.0);
        assert!(rec.magzero.is_some());
        assert!((rec.center_x - 100.0).abs() < 3.0);
        assert!((rec.center_y - 200.0).abs() < 3.0);
    }
}
