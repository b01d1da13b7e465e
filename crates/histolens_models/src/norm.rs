//! Inference-time batch normalization.

use burn::module::Param;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for [`FrozenBatchNorm`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrozenBatchNormConfig {
    /// Number of channels normalized independently.
    pub num_features: usize,
    /// Small constant added to the variance.
    pub epsilon: f64,
}

impl FrozenBatchNormConfig {
    /// Create a config with the default epsilon.
    #[must_use]
    pub fn new(num_features: usize) -> Self {
        Self {
            num_features,
            epsilon: 1e-5,
        }
    }

    /// Override epsilon.
    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Initialize with identity statistics (unit variance, zero mean).
    pub fn init<B: Backend>(&self, device: &B::Device) -> FrozenBatchNorm<B> {
        let c = self.num_features;
        FrozenBatchNorm {
            gamma: Param::from_tensor(Tensor::ones([c], device)),
            beta: Param::from_tensor(Tensor::zeros([c], device)),
            running_mean: Param::from_tensor(Tensor::zeros([c], device)),
            running_var: Param::from_tensor(Tensor::ones([c], device)),
            epsilon: self.epsilon,
        }
    }
}

/// Batch normalization with frozen statistics.
///
/// Applies `gamma * (x - mean) / sqrt(var + eps) + beta` per channel using
/// the recorded statistics, on every backend. Unlike a trainable batch norm
/// it never switches to batch statistics under autodiff and never updates
/// running state, so the gradient-enabled attribution pass computes exactly
/// the same function as plain inference.
#[derive(Module, Debug)]
pub struct FrozenBatchNorm<B: Backend> {
    /// Per-channel scale.
    gamma: Param<Tensor<B, 1>>,
    /// Per-channel shift.
    beta: Param<Tensor<B, 1>>,
    /// Recorded per-channel mean.
    running_mean: Param<Tensor<B, 1>>,
    /// Recorded per-channel variance.
    running_var: Param<Tensor<B, 1>>,
    #[module(skip)]
    epsilon: f64,
}

impl<B: Backend> FrozenBatchNorm<B> {
    /// Build from explicit per-channel statistics.
    ///
    /// # Panics
    ///
    /// Panics if the four slices differ in length.
    pub fn from_parts(
        gamma: &[f32],
        beta: &[f32],
        mean: &[f32],
        var: &[f32],
        epsilon: f64,
        device: &B::Device,
    ) -> Self {
        assert!(
            gamma.len() == beta.len() && beta.len() == mean.len() && mean.len() == var.len(),
            "statistics slices must share one length"
        );
        Self {
            gamma: Param::from_tensor(Tensor::from_floats(gamma, device)),
            beta: Param::from_tensor(Tensor::from_floats(beta, device)),
            running_mean: Param::from_tensor(Tensor::from_floats(mean, device)),
            running_var: Param::from_tensor(Tensor::from_floats(var, device)),
            epsilon,
        }
    }

    /// Normalize a `(batch, channels, height, width)` tensor.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, channels, _, _] = input.dims();
        let shape = [1, channels, 1, 1];

        let mean = self.running_mean.val().reshape(shape);
        let var = self.running_var.val().reshape(shape);
        let gamma = self.gamma.val().reshape(shape);
        let beta = self.beta.val().reshape(shape);

        let scale = gamma / (var + self.epsilon).sqrt();
        (input - mean) * scale + beta
    }

    /// Number of channels this layer normalizes.
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.gamma.val().dims()[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_identity_statistics_pass_through() {
        let device = Default::default();
        let bn = FrozenBatchNormConfig::new(2)
            .with_epsilon(0.0)
            .init::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 1>::from_floats([1.0, -2.0, 3.0, 0.5], &device)
            .reshape([1, 2, 1, 2]);
        let y: Vec<f32> = bn.forward(x.clone()).into_data().to_vec().unwrap();
        let x: Vec<f32> = x.into_data().to_vec().unwrap();
        for (a, b) in x.iter().zip(y.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_closed_form_affine() {
        let device = Default::default();
        // y = 2 * (x - 0.5) / sqrt(4) + 1 = x + 0.5
        let bn = FrozenBatchNorm::<TestBackend>::from_parts(
            &[2.0],
            &[1.0],
            &[0.5],
            &[4.0],
            0.0,
            &device,
        );

        let x = Tensor::<TestBackend, 1>::from_floats([0.0, 1.0, -3.0, 10.0], &device)
            .reshape([1, 1, 2, 2]);
        let y: Vec<f32> = bn.forward(x).into_data().to_vec().unwrap();
        let expected = [0.5, 1.5, -2.5, 10.5];
        for (a, b) in y.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-5, "got {a}, expected {b}");
        }
    }

    #[test]
    fn test_per_channel_statistics() {
        let device = Default::default();
        let bn = FrozenBatchNorm::<TestBackend>::from_parts(
            &[1.0, 3.0],
            &[0.0, -1.0],
            &[0.0, 2.0],
            &[1.0, 1.0],
            0.0,
            &device,
        );

        let x = Tensor::<TestBackend, 1>::from_floats([1.0, 1.0, 4.0, 4.0], &device)
            .reshape([1, 2, 1, 2]);
        let y: Vec<f32> = bn.forward(x).into_data().to_vec().unwrap();
        // channel 0: identity; channel 1: 3 * (4 - 2) - 1 = 5
        assert!((y[0] - 1.0).abs() < 1e-6);
        assert!((y[1] - 1.0).abs() < 1e-6);
        assert!((y[2] - 5.0).abs() < 1e-6);
        assert!((y[3] - 5.0).abs() < 1e-6);
    }
}
