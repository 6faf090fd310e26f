use proptest::prelude::*;
use verivoice::audio;
use verivoice::config::HeuristicConfig;
use verivoice::engine::{DecisionEngine, ExtractedFeatures, Label};
use verivoice::features::LightweightFeatures;

proptest! {
    /// Resampling preserves duration: output length matches the rate ratio
    /// to within one sample for any input length and rate pair.
    #[test]
    fn resample_length_tracks_rate_ratio(
        len in 1usize..10_000,
        from_rate in prop::sample::select(vec![8_000u32, 16_000, 22_050, 44_100, 48_000]),
        to_rate in prop::sample::select(vec![8_000u32, 16_000, 22_050, 44_100, 48_000]),
    ) {
        let samples = vec![0.25f32; len];
        let out = audio::resample(&samples, from_rate, to_rate);

        let expected = (len as f64 * to_rate as f64 / from_rate as f64).round() as isize;
        prop_assert!((out.len() as isize - expected).abs() <= 1);
    }

    /// Resampled output stays within the normalized amplitude range.
    #[test]
    fn resample_output_stays_normalized(
        seed in 0u64..1_000,
        len in 64usize..4_096,
    ) {
        // Cheap deterministic pseudo-noise from the seed.
        let samples: Vec<f32> = (0..len)
            .map(|i| {
                let x = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(i as u64);
                (x >> 33) as f32 / (u32::MAX >> 1) as f32 - 1.0
            })
            .collect();

        let out = audio::resample(&samples, 44_100, 16_000);
        prop_assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    /// The rule-based strategies always produce a definite verdict with a
    /// confidence in range, whatever the scalar features look like.
    #[test]
    fn heuristic_verdict_is_total(
        duration in 0.0f32..60.0,
        silence_ratio in 0.0f32..1.0,
        pitch_variance in 0.0f32..10_000.0,
    ) {
        let features = ExtractedFeatures::Lightweight(LightweightFeatures {
            duration_secs: duration,
            silence_ratio,
            spectral_centroid_hz: 1_000.0,
            spectral_bandwidth_hz: 500.0,
            pitch_variance,
        });

        for engine in [
            DecisionEngine::Heuristic(HeuristicConfig::default()),
            DecisionEngine::Degraded(HeuristicConfig::default()),
        ] {
            let verdict = engine.decide(&features).unwrap();
            prop_assert!(matches!(
                verdict.label,
                Label::AiGenerated | Label::HumanGenerated
            ));
            prop_assert!((0.0..=1.0).contains(&verdict.confidence));
            prop_assert!(!verdict.rationale.is_empty());
        }
    }
}
