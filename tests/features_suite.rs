use fractal_visualizer::features::{
    condition_features, normalize_robust, percentile, smooth_attack_release, FeatureConfig,
};

#[test]
fn percentile_interpolates_linearly() {
    let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
    assert!((percentile(&xs, 0.0) - 0.0).abs() < 1e-6);
    assert!((percentile(&xs, 50.0) - 2.0).abs() < 1e-6);
    assert!((percentile(&xs, 100.0) - 4.0).abs() < 1e-6);
    assert!((percentile(&xs, 25.0) - 1.0).abs() < 1e-6);
    assert!((percentile(&xs, 10.0) - 0.4).abs() < 1e-6);
}

#[test]
fn percentile_handles_unsorted_input() {
    let xs = [3.0, 0.0, 4.0, 1.0, 2.0];
    assert!((percentile(&xs, 50.0) - 2.0).abs() < 1e-6);
}

#[test]
fn normalize_clips_outliers_into_unit_range() {
    let mut xs: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
    xs.push(1000.0);
    xs.push(-1000.0);

    let out = normalize_robust(&xs, 5.0, 95.0);
    assert_eq!(out.len(), xs.len());
    for &v in &out {
        assert!((0.0..=1.0).contains(&v), "normalized value {v} out of range");
    }

    // Outliers collapse onto the band edges instead of stretching the scale.
    assert!((out[xs.len() - 2] - 1.0).abs() < 1e-3);
    assert!(out[xs.len() - 1] < 1e-3);
}

#[test]
fn normalize_constant_input_is_finite() {
    let xs = [0.25f32; 64];
    let out = normalize_robust(&xs, 5.0, 95.0);
    for &v in &out {
        assert!(v.is_finite());
        assert!((0.0..=1.0).contains(&v));
    }
}

#[test]
fn smoothing_rises_fast_and_falls_slow() {
    let mut xs = vec![0.0f32; 1];
    xs.extend(std::iter::repeat(1.0).take(20));
    xs.extend(std::iter::repeat(0.0).take(20));

    let out = smooth_attack_release(&xs, 0.30, 0.12);

    // Attack: distance to 1.0 closed by 30% per step.
    assert!((out[1] - 0.30).abs() < 1e-6);
    let rise = out[5] - out[0];
    // Release from the peak is slower than the rise was.
    let peak = out[20];
    let fall = peak - out[25];
    assert!(rise > fall, "attack must outpace release (rise {rise}, fall {fall})");
}

#[test]
fn smoothing_never_overshoots_a_step() {
    let mut xs = vec![0.0f32; 4];
    xs.extend(std::iter::repeat(1.0).take(60));

    let out = smooth_attack_release(&xs, 0.30, 0.12);
    let mut prev = out[3];
    for &v in &out[4..] {
        assert!(v >= prev - 1e-6, "must rise monotonically toward the step");
        assert!(v <= 1.0 + 1e-6, "must never overshoot the target");
        prev = v;
    }
    // Converges close to the plateau.
    assert!(out.last().copied().unwrap_or(0.0) > 0.99);
}

#[test]
fn smoothing_first_sample_passes_through() {
    let out = smooth_attack_release(&[0.7, 0.7, 0.7], 0.3, 0.12);
    assert_eq!(out, vec![0.7, 0.7, 0.7]);
}

#[test]
fn conditioning_is_deterministic() {
    let energy: Vec<f32> = (0..240).map(|i| ((i as f32) * 0.37).sin().abs()).collect();
    let brightness: Vec<f32> = (0..240).map(|i| 800.0 + 400.0 * ((i as f32) * 0.11).cos()).collect();
    let cfg = FeatureConfig::default();

    let a = condition_features(&energy, &brightness, &cfg).expect("conditioning should succeed");
    let b = condition_features(&energy, &brightness, &cfg).expect("conditioning should succeed");

    assert_eq!(a.len(), 240);
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.energy.to_bits(), y.energy.to_bits());
        assert_eq!(x.brightness.to_bits(), y.brightness.to_bits());
        assert_eq!(x.index, y.index);
    }
}

#[test]
fn conditioning_outputs_stay_in_unit_range() {
    let energy: Vec<f32> = (0..300).map(|i| (i % 17) as f32 * 0.9).collect();
    let brightness: Vec<f32> = (0..300).map(|i| (i % 29) as f32 * 150.0).collect();

    let frames = condition_features(&energy, &brightness, &FeatureConfig::default())
        .expect("conditioning should succeed");
    for f in &frames {
        assert!((0.0..=1.0).contains(&f.energy), "energy {} out of range", f.energy);
        assert!(
            (0.0..=1.0).contains(&f.brightness),
            "brightness {} out of range",
            f.brightness
        );
    }
}

#[test]
fn conditioning_rejects_mismatched_and_bad_input() {
    let cfg = FeatureConfig::default();
    assert!(condition_features(&[0.1, 0.2], &[0.1], &cfg).is_err());
    assert!(condition_features(&[], &[], &cfg).is_err());
    assert!(condition_features(&[0.1, f32::NAN], &[0.1, 0.2], &cfg).is_err());
    assert!(condition_features(&[0.1, 0.2], &[0.1, f32::INFINITY], &cfg).is_err());
}
