//! Property-based tests for geometry, pooling, activations and the codec.

use proptest::prelude::*;
use trickle_core::codec::{decode_values, encode_values};
use trickle_core::math::{check_conv, check_pool, conv_output_size};
use trickle_core::progress::progress_value;
use trickle_core::*;

proptest! {
    #[test]
    fn conv_size_formula(w in 1usize..64, k in 1usize..8, p in 0usize..4, s in 1usize..4) {
        prop_assume!(k <= w + 2 * p);
        let v = check_conv(w, k, p, s).unwrap();
        prop_assert_eq!(v, (w + 2 * p - k) / s + 1);
        prop_assert!(v >= 1);
    }

    #[test]
    fn same_padding_keeps_size(w in 1usize..64, half in 0usize..4) {
        let k = 2 * half + 1;
        prop_assume!(k <= w + 2 * half);
        let p = Padding::Same.resolve(k);
        prop_assert_eq!(conv_output_size(w, k, p, 1), w);
    }

    #[test]
    fn pool_size_formula(w in 1usize..64, size in 1usize..6, stride in 1usize..6) {
        prop_assume!(size <= w);
        prop_assert_eq!(check_pool(w, size, stride).unwrap(), (w - size) / stride + 1);
    }

    #[test]
    fn identity_pool_is_noop(w in 1usize..12, seed in proptest::collection::vec(-100.0f32..100.0, 144)) {
        let map = &seed[..w * w];
        let mut out = vec![0.0f32; w * w];
        for mode in [PoolMode::Max, PoolMode::Mean] {
            prop_assert_eq!(pool2d_into(mode, map, w, &Pool::IDENTITY, &mut out).unwrap(), w);
            prop_assert_eq!(&out[..], map);
        }
    }

    #[test]
    fn mean_pool_of_constant(value in -1000.0f32..1000.0, size in 1usize..4, stride in 1usize..4) {
        let w = 8;
        let map = vec![value; w * w];
        let wo = (w - size) / stride + 1;
        let mut out = vec![0.0f32; wo * wo];
        pool2d_into(PoolMode::Mean, &map, w, &Pool::new(size, stride), &mut out).unwrap();
        for x in out {
            prop_assert!((x - value).abs() <= value.abs() * 4e-6);
        }
    }

    #[test]
    fn max_pool_picks_window_max(map in proptest::collection::vec(-50.0f32..50.0, 16)) {
        let mut out = [0.0f32; 4];
        pool2d_into(PoolMode::Max, &map, 4, &Pool::new(2, 2), &mut out).unwrap();
        for (i, &got) in out.iter().enumerate() {
            let (r, c) = (2 * (i / 2), 2 * (i % 2));
            let window = [map[r * 4 + c], map[r * 4 + c + 1], map[(r + 1) * 4 + c], map[(r + 1) * 4 + c + 1]];
            let expected = window.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            prop_assert_eq!(got, expected);
        }
    }

    #[test]
    fn softmax_is_a_distribution(logits in proptest::collection::vec(-50.0f32..50.0, 1..32)) {
        let mut probs = logits.clone();
        softmax(&mut probs);
        let sum: f32 = probs.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-5);
        prop_assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
        let (_, arg_logit) = find_max(&logits).unwrap();
        let (_, arg_prob) = find_max(&probs).unwrap();
        prop_assert_eq!(probs[arg_logit], probs[arg_prob]);
    }

    #[test]
    fn softmax_is_shift_invariant(
        logits in proptest::collection::vec(-50.0f32..50.0, 1..32),
        c in -100.0f32..100.0,
    ) {
        let mut plain = logits.clone();
        softmax(&mut plain);
        let mut shifted: Vec<f32> = logits.iter().map(|&x| x + c).collect();
        softmax(&mut shifted);
        for (x, y) in plain.iter().zip(shifted.iter()) {
            prop_assert!((x - y).abs() <= 1e-4, "{} vs {}", x, y);
        }
    }

    #[test]
    fn sigmoid_in_open_unit_interval(xs in proptest::collection::vec(-15.0f32..15.0, 1..32)) {
        let mut ys = xs.clone();
        sigmoid(&mut ys);
        prop_assert!(ys.iter().all(|&y| y > 0.0 && y < 1.0));
    }

    #[test]
    fn relu_is_non_negative_and_idempotent(xs in proptest::collection::vec(-100.0f32..100.0, 0..32)) {
        let mut once = xs.clone();
        relu(&mut once);
        prop_assert!(once.iter().all(|&y| y >= 0.0));
        let mut twice = once.clone();
        relu(&mut twice);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn find_max_returns_first_maximum(xs in proptest::collection::vec(-5i32..5, 1..32)) {
        let values: Vec<f32> = xs.iter().map(|&x| x as f32).collect();
        let (best, index) = find_max(&values).unwrap();
        prop_assert!(values.iter().all(|&v| v <= best));
        prop_assert_eq!(values.iter().position(|&v| v == best), Some(index));
    }

    #[test]
    fn codec_round_trip(values in proptest::collection::vec(-10_000.0f32..10_000.0, 0..64)) {
        let back = decode_values(&encode_values(&values));
        prop_assert_eq!(back.len(), values.len());
        for (x, y) in values.iter().zip(back.iter()) {
            prop_assert!((x - y).abs() <= 5e-7 + x.abs() * 1e-6, "{} vs {}", x, y);
        }
    }

    #[test]
    fn flatten_interleaves_channels(v in 1usize..6, channels in 1usize..5) {
        let total = v * v * channels;
        let input: Vec<f32> = (0..total).map(|x| x as f32).collect();
        let mut out = vec![0.0f32; total];
        prop_assert_eq!(flatten_planes(&input, v, channels, &mut out).unwrap(), total);
        for c in 0..channels {
            for i in 0..v * v {
                prop_assert_eq!(out[i * channels + c], input[c * v * v + i]);
            }
        }
    }

    #[test]
    fn dense_matches_dot_product(
        x in proptest::collection::vec(-8i32..8, 1..12),
        n_out in 1usize..6,
        seed in 0u32..1000,
    ) {
        let n_in = x.len();
        let input: Vec<f32> = x.iter().map(|&v| v as f32).collect();
        let weights: Vec<f32> = (0..n_in * n_out)
            .map(|i| ((i as u32 * 31 + seed) % 9) as f32 - 4.0)
            .collect();
        let bias: Vec<f32> = (0..n_out).map(|k| k as f32 - 1.0).collect();
        let mut out = vec![0.0f32; n_out];
        let mut accum = [0.0f32; 1];
        let mut engine = Engine::in_memory(ScratchPool::accumulator_only(&mut accum));
        engine
            .dense(TensorIn::F32(&input), n_in, TensorOut::Memory(&mut out), n_out, &Dense::memory(Activation::None, &weights, &bias))
            .unwrap();
        for k in 0..n_out {
            let dot: f32 = bias[k] + (0..n_in).map(|j| input[j] * weights[k * n_in + j]).sum::<f32>();
            prop_assert_eq!(out[k], dot);
        }
    }

    #[test]
    fn progress_is_monotone_and_complete(units in 1usize..200) {
        let values: Vec<f32> = (0..units).map(|i| progress_value(i, units)).collect();
        prop_assert!(values.windows(2).all(|p| p[0] <= p[1]));
        prop_assert_eq!(values[units - 1], 1.0);
        prop_assert!(values.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }
}
