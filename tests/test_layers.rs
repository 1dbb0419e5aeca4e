//! Integration tests for individual layers
//!
//! This file covers:
//! - Fully connected forward/backward on a hand-computed example
//! - Convolution fixtures (1×1 multi-channel, 2×2 with stride, 3×3 cross filter)
//! - Shape propagation through Padding, Convolution and Cropping
//! - Batch resizing
//! - Error cases for malformed inputs

use approx::assert_abs_diff_eq;
use mlnn::layers::{
    Activation, Convolution, Cropping, Dropout, Layer, LayerKind, Linear, MaxPooling, Padding,
    Shape, Softmax,
};
use mlnn::utils::SimpleRng;
use mlnn::NetworkError;

fn range(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64).collect()
}

fn convolution(input: Shape, filter_size: usize, filters: usize, stride: usize, weights: &[f64], bias: &[f64]) -> Convolution {
    let mut rng = SimpleRng::new(0);
    let mut layer = Convolution::new(input, filter_size, filters, stride, &mut rng).unwrap();
    layer.weights_mut().set_values(weights).unwrap();
    layer.bias_mut().set_values(bias).unwrap();
    layer
}

// ============================================================================
// Linear Layer Tests
// ============================================================================

mod linear_tests {
    use super::*;

    #[test]
    fn test_dense_forward_backward() {
        let mut rng = SimpleRng::new(0);
        let mut layer = Linear::new(2, 3, &mut rng).unwrap();
        layer
            .weights_mut()
            .set_values(&[1.0, 0.0, 0.0, 1.0, 1.0, 1.0])
            .unwrap();
        layer.bias_mut().set_values(&[0.0, 0.0, 0.0]).unwrap();

        layer.forward(&[1.0, 2.0], false).unwrap();
        assert_eq!(layer.output(), &[1.0, 2.0, 3.0]);

        layer.backward(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(layer.input_gradient(), &[2.0, 2.0]);
        assert_eq!(layer.weights().gradients(), &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        assert_eq!(layer.bias().gradients(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_backward_rejects_wrong_gradient_length() {
        let mut rng = SimpleRng::new(0);
        let mut layer = Linear::new(2, 3, &mut rng).unwrap();
        layer.forward(&[1.0, 2.0], false).unwrap();
        assert!(matches!(
            layer.backward(&[1.0, 1.0]),
            Err(NetworkError::ShapeMismatch { expected: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn test_reset_grads_clears_accumulators() {
        let mut rng = SimpleRng::new(0);
        let mut layer = Linear::new(2, 1, &mut rng).unwrap();
        layer.forward(&[1.0, 1.0], false).unwrap();
        layer.backward(&[1.0]).unwrap();
        assert!(layer.weights().gradients().iter().any(|&g| g != 0.0));
        layer.reset_grads();
        assert!(layer.weights().gradients().iter().all(|&g| g == 0.0));
        assert!(layer.bias().gradients().iter().all(|&g| g == 0.0));
    }
}

// ============================================================================
// Convolution Fixture Tests
// ============================================================================

mod convolution_tests {
    use super::*;

    #[test]
    fn test_one_by_one_filters_over_two_channels() {
        let mut layer = convolution(Shape::new(2, 2, 2), 1, 2, 1, &[0.0, 2.0, 3.0, 1.0], &[0.0, 1.0]);
        layer.forward(&range(8), false).unwrap();
        assert_eq!(layer.output(), &[8.0, 10.0, 12.0, 14.0, 5.0, 9.0, 13.0, 17.0]);

        layer.backward(&range(8)).unwrap();
        assert_eq!(layer.input_gradient(), &[12.0, 15.0, 18.0, 21.0, 4.0, 7.0, 10.0, 13.0]);
        assert_eq!(layer.weights().gradients(), &[14.0, 38.0, 38.0, 126.0]);
        assert_eq!(layer.bias().gradients(), &[6.0, 22.0]);
    }

    #[test]
    fn test_three_filters_over_two_channels() {
        let weights = [
            0.0, 1.0, 1.0, 0.0, 0.0, -1.0, -1.0, 0.0, //
            -1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, -1.0, //
            0.0, 0.0, 1.0, 1.0, 0.0, 0.0, -1.0, -1.0,
        ];
        let mut layer = convolution(Shape::new(3, 3, 2), 2, 3, 1, &weights, &[1.0, 0.0, -1.0]);
        let input = [
            1.0, 4.0, 7.0, 2.0, 5.0, 8.0, 3.0, 6.0, 9.0, //
            9.0, 6.0, 3.0, 8.0, 5.0, 2.0, 7.0, 4.0, 1.0,
        ];
        layer.forward(&input, false).unwrap();
        assert_eq!(layer.output_shape(), Shape::new(2, 2, 3));
        assert_eq!(
            layer.output(),
            &[-7.0, 5.0, -3.0, 9.0, 8.0, 8.0, 8.0, 8.0, -7.0, 5.0, -3.0, 9.0]
        );
    }

    #[test]
    fn test_two_by_two_filter_with_stride_two() {
        let mut layer = convolution(Shape::new(4, 4, 1), 2, 1, 2, &[0.0, 1.0, 2.0, 3.0], &[0.0]);
        layer.forward(&range(16), false).unwrap();
        assert_eq!(layer.output(), &[24.0, 36.0, 72.0, 84.0]);

        layer.backward(&range(4)).unwrap();
        assert_eq!(
            layer.input_gradient(),
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 3.0, 0.0, 2.0, 0.0, 3.0, 4.0, 6.0, 6.0, 9.0]
        );
        assert_eq!(layer.weights().gradients(), &[48.0, 54.0, 72.0, 78.0]);
        assert_eq!(layer.bias().gradients(), &[6.0]);
    }

    #[test]
    fn test_one_by_one_filters_with_stride_three() {
        let mut layer = convolution(Shape::new(4, 4, 1), 1, 3, 3, &[0.0, 1.0, 2.0], &[-1.0, 0.0, 1.0]);
        layer.forward(&range(16), false).unwrap();
        assert_eq!(
            layer.output(),
            &[-1.0, -1.0, -1.0, -1.0, 0.0, 3.0, 12.0, 15.0, 1.0, 7.0, 25.0, 31.0]
        );

        layer.backward(&range(12)).unwrap();
        let mut expected = vec![0.0; 16];
        expected[0] = 20.0;
        expected[3] = 23.0;
        expected[12] = 26.0;
        expected[15] = 29.0;
        assert_eq!(layer.input_gradient(), expected.as_slice());
        assert_eq!(layer.weights().gradients(), &[72.0, 192.0, 312.0]);
        assert_eq!(layer.bias().gradients(), &[6.0, 22.0, 38.0]);
    }

    #[test]
    fn test_three_by_three_filter_on_five_by_five() {
        let filter = [1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let mut layer = convolution(Shape::new(5, 5, 1), 3, 1, 1, &filter, &[0.0]);
        let input = [
            1.0, 1.0, 1.0, 0.0, 0.0, //
            0.0, 1.0, 1.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, 1.0, 1.0, //
            0.0, 0.0, 1.0, 1.0, 0.0, //
            0.0, 1.0, 1.0, 0.0, 0.0,
        ];
        layer.forward(&input, false).unwrap();
        assert_eq!(layer.output(), &[4.0, 3.0, 4.0, 2.0, 4.0, 3.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_batch_of_two_matches_single_samples() {
        let mut rng = SimpleRng::new(17);
        let mut layer = Convolution::new(Shape::new(4, 4, 2), 3, 2, 1, &mut rng).unwrap();
        let a: Vec<f64> = (0..32).map(|i| (i as f64 * 0.37).sin()).collect();
        let b: Vec<f64> = (0..32).map(|i| (i as f64 * 0.11).cos()).collect();

        layer.forward(&a, true).unwrap();
        let single_a = layer.output().to_vec();
        layer.forward(&b, true).unwrap();
        let single_b = layer.output().to_vec();

        layer.resize_batch(2);
        let batch: Vec<f64> = a.iter().chain(&b).copied().collect();
        layer.forward(&batch, true).unwrap();
        let expected: Vec<f64> = single_a.iter().chain(&single_b).copied().collect();
        for (x, y) in layer.output().iter().zip(&expected) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_non_exact_geometry_fails() {
        let mut rng = SimpleRng::new(0);
        assert!(matches!(
            Convolution::new(Shape::new(5, 5, 1), 2, 1, 2, &mut rng),
            Err(NetworkError::InvalidConfiguration(_))
        ));
        assert!(Convolution::new(Shape::new(3, 3, 1), 4, 1, 1, &mut rng).is_err());
        assert!(Convolution::new(Shape::new(3, 3, 1), 3, 0, 1, &mut rng).is_err());
        assert!(Convolution::new(Shape::new(3, 3, 1), 3, 1, 0, &mut rng).is_err());
    }
}

// ============================================================================
// Shape Propagation Tests
// ============================================================================

mod shape_tests {
    use super::*;

    #[test]
    fn test_padding_convolution_cropping_chain() {
        let mut rng = SimpleRng::new(3);
        let mut padding = Padding::new(Shape::new(4, 4, 1), 2).unwrap();
        let mut conv = Convolution::new(padding.output_shape(), 3, 2, 1, &mut rng).unwrap();
        let mut cropping = Cropping::new(conv.output_shape(), 1).unwrap();

        assert_eq!(padding.output_shape(), Shape::new(8, 8, 1));
        assert_eq!(conv.output_shape(), Shape::new(6, 6, 2));
        assert_eq!(cropping.output_shape(), Shape::new(4, 4, 2));

        padding.forward(&range(16), false).unwrap();
        conv.forward(padding.output(), false).unwrap();
        cropping.forward(conv.output(), false).unwrap();
        assert_eq!(cropping.output().len(), 32);

        cropping.backward(&vec![1.0; 32]).unwrap();
        conv.backward(cropping.input_gradient()).unwrap();
        padding.backward(conv.input_gradient()).unwrap();
        assert_eq!(padding.input_gradient().len(), 16);
    }

    #[test]
    fn test_pooling_halves_spatial_size() {
        let mut pooling = MaxPooling::new(Shape::new(4, 6, 3), 2).unwrap();
        assert_eq!(pooling.output_shape(), Shape::new(2, 3, 3));
        pooling.forward(&range(72), false).unwrap();
        // maximum of every window is its bottom-right value
        assert_eq!(pooling.output()[0], 7.0);
        assert!(MaxPooling::new(Shape::new(5, 4, 1), 2).is_err());
    }

    #[test]
    fn test_resize_batch_is_idempotent() {
        let mut rng = SimpleRng::new(3);
        let mut layers: Vec<Box<dyn Layer>> = vec![
            Box::new(Linear::new(4, 4, &mut rng).unwrap()),
            Box::new(Activation::elu(Shape::flat(4)).unwrap()),
            Box::new(Dropout::new(Shape::flat(4), 0.5, &mut rng).unwrap()),
            Box::new(Softmax::new(4).unwrap()),
            Box::new(MaxPooling::new(Shape::new(2, 2, 1), 2).unwrap()),
        ];
        for layer in layers.iter_mut() {
            layer.resize_batch(3);
            layer.forward(&range(12), true).unwrap();
            let output = layer.output().to_vec();
            layer.resize_batch(3);
            assert_eq!(layer.batch_size(), 3);
            assert_eq!(layer.output(), output.as_slice(), "{} lost its buffers", layer.kind());
        }
    }

    #[test]
    fn test_max_pooling_keeps_argmax_across_same_size_resize() {
        let mut pooling = MaxPooling::new(Shape::new(2, 2, 1), 2).unwrap();
        pooling.resize_batch(3);
        pooling.forward(&range(12), false).unwrap();
        pooling.resize_batch(3);
        pooling.backward(&[1.0, 2.0, 3.0]).unwrap();
        // the maximum of every sample is its last value
        #[rustfmt::skip]
        let expected = [
            0.0, 0.0, 0.0, 1.0,
            0.0, 0.0, 0.0, 2.0,
            0.0, 0.0, 0.0, 3.0,
        ];
        assert_eq!(pooling.input_gradient(), &expected);
    }

    #[test]
    fn test_activation_kinds() {
        assert_eq!(Activation::relu(Shape::flat(1)).unwrap().kind(), LayerKind::ReLU);
        assert_eq!(Activation::sigmoid(Shape::flat(1)).unwrap().kind(), LayerKind::Sigmoid);
        assert_eq!(Activation::elu(Shape::flat(1)).unwrap().kind(), LayerKind::ELU);
        assert!(LayerKind::ELU.is_activation());
        assert!(!LayerKind::Softmax.is_activation());
    }
}
