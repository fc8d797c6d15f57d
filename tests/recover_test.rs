//! Simulate-and-recover: render a streak with known parameters, add photon
//! noise, and verify the MCMC fit and pill photometry recover the truth.

use ndarray::Array2;
use streakfit::{
    apply_poisson_noise, fit_streak, inject_streak, pill_mask, pill_photometry, FitConfig,
    ImageSection, Psf, StreakParameters,
};

fn make_scene(truth: &StreakParameters, psf: &Psf, seed: u64) -> ImageSection {
    let mut pixels = Array2::zeros((64, 64));
    inject_streak(&mut pixels, truth, psf, 3);
    let pixels = apply_poisson_noise(&pixels, seed);
    ImageSection::new(pixels, 6.4)
}

#[test]
fn test_mcmc_recovers_known_streak() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("streakfit=debug")
        .try_init();

    let truth = StreakParameters {
        x: 1.0,
        y: -2.0,
        flux: 80_000.0,
        length: 26.0,
        angle: 0.6,
        background: 5.0,
    };
    let psf = Psf::Gaussian(1.5);
    let section = make_scene(&truth, &psf, 2024);

    // Detector-quality initial guess: a little off in every parameter
    let guess = StreakParameters {
        x: 1.6,
        y: -1.3,
        flux: 60_000.0,
        length: 23.0,
        angle: 0.55,
        background: 3.0,
    };
    let radius = [4.0, 4.0, 60_000.0, 10.0, 0.3, 8.0];

    let config = FitConfig {
        n_walkers: 24,
        n_burn: 150,
        n_steps: 300,
        fit_bound: Some(12.0),
        seed: 7,
        ..Default::default()
    };

    let (result, posterior) =
        fit_streak(&section, &psf, &guess, &radius, Some(9.5), &config).unwrap();

    assert!(posterior.acceptance > 0.05, "sampler stalled");
    assert_eq!(posterior.flat[0].len(), 24 * 300);

    assert!(
        (result.x.mean - truth.x).abs() < 1.5,
        "x: {} vs {}",
        result.x.mean,
        truth.x
    );
    assert!(
        (result.y.mean - truth.y).abs() < 1.5,
        "y: {} vs {}",
        result.y.mean,
        truth.y
    );
    assert!(
        (result.flux.mean - truth.flux).abs() / truth.flux < 0.15,
        "flux: {} vs {}",
        result.flux.mean,
        truth.flux
    );
    assert!(
        (result.length.mean - truth.length).abs() < 5.0,
        "length: {} vs {}",
        result.length.mean,
        truth.length
    );
    assert!(
        (result.angle.mean - truth.angle).abs() < 0.15,
        "angle: {} vs {}",
        result.angle.mean,
        truth.angle
    );
    assert!(
        (result.background.mean - truth.background).abs() < 4.0,
        "background: {} vs {}",
        result.background.mean,
        truth.background
    );

    // Zeropoint should be consistent with the injected flux
    let (zp, zp_err) = result.magzero.unwrap();
    let expected_zp = 9.5 + 2.5 * truth.flux.log10();
    assert!(
        (zp - expected_zp).abs() < 0.25,
        "zeropoint {zp} vs {expected_zp} (err {zp_err})"
    );
}

#[test]
fn test_fixed_background_recovery() {
    let truth = StreakParameters {
        x: 0.0,
        y: 0.0,
        flux: 60_000.0,
        length: 20.0,
        angle: -0.4,
        background: 0.0,
    };
    let psf = Psf::Gaussian(1.3);
    let section = make_scene(&truth, &psf, 77);

    let config = FitConfig {
        n_walkers: 20,
        n_burn: 120,
        n_steps: 250,
        fit_bound: Some(10.0),
        fixed_background: Some(0.0),
        seed: 3,
        ..Default::default()
    };
    let radius = [3.0, 3.0, 40_000.0, 8.0, 0.25, 0.0];

    let (result, posterior) =
        fit_streak(&section, &psf, &truth, &radius, None, &config).unwrap();

    assert_eq!(posterior.flat.len(), 5);
    assert_eq!(result.background.mean, 0.0);
    assert!((result.flux.mean - truth.flux).abs() / truth.flux < 0.15);
    assert!((result.angle.mean - truth.angle).abs() < 0.15);
}

#[test]
fn test_pill_photometry_recovers_flux() {
    let truth = StreakParameters {
        x: 0.0,
        y: 0.0,
        flux: 100_000.0,
        length: 24.0,
        angle: 0.9,
        background: 0.0,
    };
    let psf = Psf::Gaussian(1.4);
    let section = make_scene(&truth, &psf, 5);

    // A generous pill captures essentially all of the streak's flux
    let mask = pill_mask((64, 64), 32.0, 32.0, 8.0, truth.length, truth.angle);
    let phot = pill_photometry(&section.pixels, &mask, section.noise_sigma);

    assert!(
        (phot.flux - truth.flux).abs() / truth.flux < 0.05,
        "pill flux {} vs injected {}",
        phot.flux,
        truth.flux
    );
    // Uncertainty should be of order sqrt(flux)
    assert!(phot.flux_err > (truth.flux * 0.5).sqrt());
    assert!(phot.flux_err < 3.0 * truth.flux.sqrt() + 100.0);
}
