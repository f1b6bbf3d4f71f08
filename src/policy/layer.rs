use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

/// A fully connected layer with row-major weights. Forward and backward
/// passes work on plain slices so the network can reuse caller-owned
/// buffers; SGD is applied in place during the backward pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

impl Dense {
    /// He-style uniform init for ReLU layers
    pub fn he<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let limit = (6.0 / inputs as f32).sqrt();
        Self::uniform(inputs, outputs, limit, rng)
    }

    /// Xavier-style uniform init for output layers
    pub fn xavier<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let limit = (6.0 / (inputs + outputs) as f32).sqrt();
        Self::uniform(inputs, outputs, limit, rng)
    }

    fn uniform<R: Rng>(inputs: usize, outputs: usize, limit: f32, rng: &mut R) -> Self {
        Self {
            inputs,
            outputs,
            weights: (0..inputs * outputs)
                .map(|_| rng.random_range(-limit..limit))
                .collect(),
            biases: vec![0.0; outputs],
        }
    }

    /// y = Wx + b
    pub fn forward(&self, x: &[f32], y: &mut [f32]) {
        debug_assert!(x.len() == self.inputs && y.len() == self.outputs);
        for (o, out) in y.iter_mut().enumerate() {
            let row = &self.weights[o * self.inputs..(o + 1) * self.inputs];
            *out = self.biases[o] + row.iter().zip(x.iter()).map(|(w, v)| w * v).sum::<f32>();
        }
    }

    /// Given the layer input and the gradient at the layer output,
    /// returns the gradient at the input and applies one SGD step.
    /// The input gradient is computed against the pre-update weights.
    pub fn backward(&mut self, x: &[f32], dz: &[f32], lr: f32) -> Vec<f32> {
        debug_assert!(x.len() == self.inputs && dz.len() == self.outputs);
        let mut dx = vec![0.0; self.inputs];
        for (o, &g) in dz.iter().enumerate() {
            let row = &self.weights[o * self.inputs..(o + 1) * self.inputs];
            for (i, &w) in row.iter().enumerate() {
                dx[i] += w * g;
            }
        }
        for (o, &g) in dz.iter().enumerate() {
            let row = &mut self.weights[o * self.inputs..(o + 1) * self.inputs];
            for (i, w) in row.iter_mut().enumerate() {
                *w -= lr * g * x[i];
            }
            self.biases[o] -= lr * g;
        }
        dx
    }

    pub fn parameters(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    pub fn is_finite(&self) -> bool {
        self.weights.iter().all(|w| w.is_finite()) && self.biases.iter().all(|b| b.is_finite())
    }
}
