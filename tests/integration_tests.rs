//! Integration tests for direction-of-arrival analysis
//!
//! Signals are synthetic: one broadband noise source, copied to the four
//! microphones with per-channel sample delays that match the estimator's pair
//! model for the bearing under test.

use stratum_doa::analysis::driver::merge_out_of_order;
use stratum_doa::preprocessing::channel_mixer::signal_from_capture;
use stratum_doa::{
    analyze_doa, AnalysisConfig, AnalysisError, CaptureLayout, DirectionLabel, DoaAnalyzer,
    DoaEstimate, FusionMethod, Signal, StreamingAnalyzer, WindowPlan,
};

/// Deterministic broadband noise in [-1, 1)
fn noise(len: usize, seed: u64) -> Vec<f32> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
        })
        .collect()
}

/// One noise source heard by each microphone `delays[i]` samples late
fn delayed_source(len: usize, delays: [usize; 4], sample_rate: u32, seed: u64) -> Signal {
    let max_delay = delays.iter().copied().max().unwrap_or(0);
    let source = noise(len + max_delay, seed);
    let channels = delays
        .iter()
        .map(|&d| source[max_delay - d..max_delay - d + len].to_vec())
        .collect();
    Signal::from_planar(channels, sample_rate).unwrap()
}

fn circular_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

fn to_interleaved(signal: &Signal) -> Vec<f32> {
    (0..signal.len())
        .flat_map(|i| (0..4).map(move |ch| signal.channel(ch)[i]))
        .collect()
}

// Lags of 2 samples are the admissible limit at 16 kHz for the default ring
const FRONT: [usize; 4] = [0, 0, 2, 2];
const RIGHT: [usize; 4] = [0, 2, 2, 0];
const BACK: [usize; 4] = [2, 2, 0, 0];
const LEFT: [usize; 4] = [2, 0, 0, 2];

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_bearing(delays: [usize; 4], expected_angle: f32, expected_label: DirectionLabel) {
        let signal = delayed_source(16000, delays, 16000, 42);
        let analysis = analyze_doa(&signal, AnalysisConfig::default())
            .expect("Analysis should succeed");

        // floor((16000 - 4096) / 2048) + 1
        assert_eq!(analysis.estimates.len(), 6);
        for estimate in &analysis.estimates {
            assert!(
                circular_distance(estimate.angle_degrees, expected_angle) < 5.0,
                "expected ~{}°, got {}°",
                expected_angle,
                estimate.angle_degrees
            );
            assert!(estimate.confidence > 0.3);
            assert_eq!(estimate.direction, expected_label);
            assert_eq!(estimate.pair_count, 4);
        }
    }

    #[test]
    fn test_front_source() {
        assert_bearing(FRONT, 0.0, DirectionLabel::North);
    }

    #[test]
    fn test_right_source() {
        assert_bearing(RIGHT, 90.0, DirectionLabel::East);
    }

    #[test]
    fn test_back_source() {
        assert_bearing(BACK, 180.0, DirectionLabel::South);
    }

    #[test]
    fn test_left_source() {
        assert_bearing(LEFT, 270.0, DirectionLabel::West);
    }

    #[test]
    fn test_front_source_with_ring_delays() {
        // Channel 0 faces the source; 1 and 3 hear it one sample later, 2 three
        // samples later. Pair bearings 19.6°, 47.9°, 137.9°, 289.6° fuse to ~34°.
        let signal = delayed_source(16000, [0, 1, 3, 1], 16000, 31);
        let analysis = analyze_doa(&signal, AnalysisConfig::default()).unwrap();

        assert_eq!(analysis.estimates.len(), 6);
        for estimate in &analysis.estimates {
            assert_eq!(estimate.direction, DirectionLabel::North);
            assert!(
                circular_distance(estimate.angle_degrees, 0.0) < 45.0,
                "got {}°",
                estimate.angle_degrees
            );
            assert!(estimate.confidence > 0.3);
        }
    }

    #[test]
    fn test_front_source_at_48k() {
        // Admissible limit is 8 samples at 48 kHz
        let signal = delayed_source(48000, [0, 0, 8, 8], 48000, 5);
        let analysis = analyze_doa(&signal, AnalysisConfig::default()).unwrap();

        assert_eq!(analysis.metadata.max_delay_samples, 8);
        assert!(!analysis.estimates.is_empty());
        for estimate in &analysis.estimates {
            assert!(circular_distance(estimate.angle_degrees, 0.0) < 5.0);
            assert_eq!(estimate.direction, DirectionLabel::North);
        }
    }

    #[test]
    fn test_linear_fusion_of_front_source() {
        // Pair bearings 0°, 47.9°, 180°, 312.1° average literally to 135°
        let signal = delayed_source(8192, FRONT, 16000, 42);
        let config = AnalysisConfig {
            fusion: FusionMethod::Linear,
            ..Default::default()
        };
        let analysis = analyze_doa(&signal, config).unwrap();

        assert!(!analysis.estimates.is_empty());
        for estimate in &analysis.estimates {
            assert!((estimate.angle_degrees - 135.0).abs() < 0.1);
        }
    }

    #[test]
    fn test_identical_channels() {
        let signal = delayed_source(12288, [0; 4], 16000, 9);

        let analysis = analyze_doa(&signal, AnalysisConfig::default()).unwrap();
        assert_eq!(analysis.estimates.len(), 5);
        for estimate in &analysis.estimates {
            assert_eq!(estimate.angle_degrees, 0.0);
            assert!(estimate.confidence > 0.99);
            assert_eq!(estimate.direction, DirectionLabel::North);
        }

        let config = AnalysisConfig {
            fusion: FusionMethod::Linear,
            ..Default::default()
        };
        let linear = analyze_doa(&signal, config).unwrap();
        for estimate in &linear.estimates {
            assert!((estimate.angle_degrees - 135.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_all_zero_signal() {
        let signal = Signal::from_interleaved(&vec![0.0; 4 * 16000], 4, 16000).unwrap();
        let analysis = analyze_doa(&signal, AnalysisConfig::default()).unwrap();

        assert!(analysis.estimates.is_empty());
        assert_eq!(analysis.metadata.windows.windows_total, 6);
        assert_eq!(analysis.metadata.windows.windows_silent, 6);
    }

    #[test]
    fn test_impulses_beyond_admissible_lag() {
        // Adjacent channels 90 samples apart: no pair has an admissible peak
        let mut early = vec![0.0f32; 256];
        let mut late = vec![0.0f32; 256];
        early[10] = 1.0;
        late[100] = 1.0;
        let signal = Signal::from_planar(vec![early.clone(), late.clone(), early, late], 16000)
            .unwrap();
        let config = AnalysisConfig {
            window_length: 256,
            overlap: 0.0,
            ..Default::default()
        };

        let analysis = analyze_doa(&signal, config).unwrap();
        assert!(analysis.estimates.is_empty());
        assert_eq!(analysis.metadata.windows.windows_total, 1);
        assert_eq!(analysis.metadata.windows.windows_without_estimate, 1);
    }

    #[test]
    fn test_energy_threshold_gates_quiet_signal() {
        let quiet: Vec<f32> = noise(4 * 8192, 3).iter().map(|x| x * 1e-5).collect();
        let signal = Signal::from_interleaved(&quiet, 4, 16000).unwrap();

        let gated = analyze_doa(&signal, AnalysisConfig::default()).unwrap();
        assert!(gated.estimates.is_empty());

        let config = AnalysisConfig {
            energy_threshold: 0.0,
            ..Default::default()
        };
        let open = analyze_doa(&signal, config).unwrap();
        assert_eq!(open.metadata.windows.windows_silent, 0);
    }

    #[test]
    fn test_signal_shorter_than_one_window() {
        let signal = delayed_source(4095, FRONT, 16000, 1);
        let analysis = analyze_doa(&signal, AnalysisConfig::default())
            .expect("Short signal is not an error");

        assert!(analysis.estimates.is_empty());
        assert_eq!(analysis.metadata.windows.windows_total, 0);
    }

    #[test]
    fn test_output_ranges_on_uncorrelated_channels() {
        let channels = (0..4).map(|ch| noise(20000, 100 + ch)).collect();
        let signal = Signal::from_planar(channels, 16000).unwrap();
        let config = AnalysisConfig {
            window_length: 1024,
            overlap: 0.75,
            ..Default::default()
        };

        let analysis = analyze_doa(&signal, config).unwrap();
        assert!(!analysis.estimates.is_empty());
        for estimate in &analysis.estimates {
            assert!((0.0..360.0).contains(&estimate.angle_degrees));
            assert!((0.0..=1.0).contains(&estimate.confidence));
            assert!((1..=4).contains(&estimate.pair_count));
        }

        let timestamps: Vec<f32> = analysis.estimates.iter().map(|e| e.timestamp_seconds).collect();
        assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_runs_are_identical() {
        let signal = delayed_source(20000, RIGHT, 16000, 77);

        let first = analyze_doa(&signal, AnalysisConfig::default()).unwrap();
        let second = analyze_doa(&signal, AnalysisConfig::default()).unwrap();
        assert_eq!(first.estimates, second.estimates);

        let config = AnalysisConfig {
            parallel: true,
            ..Default::default()
        };
        let parallel = analyze_doa(&signal, config).unwrap();
        assert_eq!(first.estimates, parallel.estimates);
        assert_eq!(first.metadata.windows, parallel.metadata.windows);
    }

    #[test]
    fn test_out_of_order_completion() {
        let signal = delayed_source(30000, LEFT, 16000, 13);
        let config = AnalysisConfig {
            window_length: 2048,
            ..Default::default()
        };
        let plan = WindowPlan::new(config.window_length, config.overlap).unwrap();

        let mut analyzer = DoaAnalyzer::new(&config, 16000).unwrap();
        let sequential = analyzer.analyze_signal(&signal, plan).unwrap();

        // Complete windows back to front, odd ones first
        let windows = plan.windows(&signal);
        let mut completed: Vec<(usize, Option<DoaEstimate>)> = windows
            .clone()
            .map(|w| (w.index(), analyzer.processor().process(&w).into_estimate()))
            .collect();
        completed.reverse();
        completed.sort_by_key(|(index, _)| index % 2 == 0);

        assert_eq!(merge_out_of_order(completed), sequential);
    }

    #[test]
    fn test_streaming_matches_batch() {
        let signal = delayed_source(20000, BACK, 16000, 21);
        let config = AnalysisConfig::default();
        let batch = analyze_doa(&signal, config.clone()).unwrap();

        let mut streaming = StreamingAnalyzer::new(&config, 16000).unwrap();
        let mut streamed = Vec::new();
        // 1000 frames per block, not a divisor of the hop
        for block in to_interleaved(&signal).chunks(4 * 1000) {
            streamed.extend(streaming.push_interleaved(block).unwrap());
            assert!(streaming.buffered() <= config.window_length);
        }

        assert_eq!(streamed, batch.estimates);
    }

    #[test]
    fn test_respeaker_capture() {
        let mics = delayed_source(8192, FRONT, 16000, 8);
        let junk = noise(8192 * 2, 99);

        // Channel 0 processed output, channel 1 playback reference, 2..=5 microphones
        let capture: Vec<f32> = (0..mics.len())
            .flat_map(|i| {
                [
                    junk[2 * i],
                    junk[2 * i + 1],
                    mics.channel(0)[i],
                    mics.channel(1)[i],
                    mics.channel(2)[i],
                    mics.channel(3)[i],
                ]
            })
            .collect();

        let signal = signal_from_capture(&capture, CaptureLayout::RESPEAKER_V2, 16000).unwrap();
        assert_eq!(signal, mics);

        let analysis = analyze_doa(&signal, AnalysisConfig::default()).unwrap();
        assert!(analysis
            .estimates
            .iter()
            .all(|e| e.direction == DirectionLabel::North));
    }

    #[test]
    fn test_metadata() {
        let signal = delayed_source(16000, FRONT, 16000, 4);
        let analysis = analyze_doa(&signal, AnalysisConfig::default()).unwrap();
        let metadata = &analysis.metadata;

        assert!((metadata.duration_seconds - 1.0).abs() < 1e-6);
        assert_eq!(metadata.sample_rate, 16000);
        assert_eq!(metadata.window_length, 4096);
        assert_eq!(metadata.hop_size, 2048);
        assert_eq!(metadata.max_delay_samples, 2);
        assert_eq!(metadata.fusion, FusionMethod::Circular);
        assert_eq!(metadata.windows.windows_total, 6);
        assert_eq!(metadata.windows.estimates_emitted, 6);
        assert!(metadata.processing_time_ms >= 0.0);
    }

    #[test]
    fn test_config_from_json() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"window_length": 1024, "fusion": "Linear"}"#).unwrap();
        assert_eq!(config.overlap, 0.5);

        let signal = delayed_source(4096, [0; 4], 16000, 6);
        let analysis = analyze_doa(&signal, config).unwrap();
        assert_eq!(analysis.estimates.len(), 7);

        let json = serde_json::to_string(&analysis).unwrap();
        assert!(json.contains("\"fusion\":\"Linear\""));
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(
            Signal::from_interleaved(&[0.0; 12], 3, 16000),
            Err(AnalysisError::InvalidInput(_))
        ));
        assert!(matches!(
            Signal::from_planar(vec![vec![0.0; 8]; 5], 16000),
            Err(AnalysisError::InvalidInput(_))
        ));
        assert!(matches!(
            Signal::from_interleaved(&[], 4, 16000),
            Err(AnalysisError::InvalidInput(_))
        ));
        assert!(matches!(
            Signal::from_interleaved(&[0.0; 8], 4, 0),
            Err(AnalysisError::InvalidInput(_))
        ));
        assert!(matches!(
            signal_from_capture(&[0.0; 12], CaptureLayout::RESPEAKER_V2, 16000),
            Ok(_)
        ));
        assert!(matches!(
            signal_from_capture(&[0.0; 10], CaptureLayout::RESPEAKER_V2, 16000),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invalid_configuration() {
        let signal = delayed_source(8192, FRONT, 16000, 2);

        let bad_configs = [
            AnalysisConfig {
                window_length: 0,
                ..Default::default()
            },
            AnalysisConfig {
                overlap: 1.0,
                ..Default::default()
            },
            AnalysisConfig {
                radius: 0.0,
                ..Default::default()
            },
            AnalysisConfig {
                sound_speed: -343.0,
                ..Default::default()
            },
            AnalysisConfig {
                energy_threshold: f32::NAN,
                ..Default::default()
            },
            // Cannot hold lags -2..=2
            AnalysisConfig {
                window_length: 4,
                overlap: 0.0,
                ..Default::default()
            },
        ];

        for config in bad_configs {
            assert!(
                matches!(
                    analyze_doa(&signal, config.clone()),
                    Err(AnalysisError::InvalidConfiguration(_))
                ),
                "config should be rejected: {:?}",
                config
            );
        }
    }
}
