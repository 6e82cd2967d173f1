/// Two-layer integer MLP, the quantized classifier the accelerators run.
///
/// `hidden = clamp(relu(W1·x + b1) / h_div, 0, 127)`,
/// `logits = W2·hidden + b2`, `class = argmax(logits)`.
use super::kernels::cpu_matvec;
use crate::npu::ActivationMode;
use serde::{Deserialize, Serialize};

/// Largest hidden activation, keeps hidden values valid as signed bytes
pub const HIDDEN_MAX: i32 = 127;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Mlp {
  pub input_size: usize,
  pub hidden_size: usize,
  pub output_size: usize,
  /// `hidden_size x input_size`, row-major
  pub w1: Vec<i8>,
  pub b1: Vec<i32>,
  /// `output_size x hidden_size`, row-major
  pub w2: Vec<i8>,
  pub b2: Vec<i32>,
  /// Hidden requantization divisor, positive
  pub h_div: i32,
}

/// Everything one forward pass produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inference {
  pub hidden: Vec<u8>,
  pub logits: Vec<i32>,
  pub class: usize,
}

/// Index of the first largest value
pub fn argmax(values: &[i32]) -> usize {
  let mut best = 0;
  for (i, v) in values.iter().enumerate().skip(1) {
    if *v > values[best] {
      best = i;
    }
  }
  best
}

impl Mlp {
  /// Layer-1 accumulators to hidden activations: bias, ReLU, divide, clamp
  pub fn hidden(&self, acc: &[i32]) -> Vec<u8> {
    debug_assert_eq!(acc.len(), self.hidden_size);
    acc
      .iter()
      .zip(&self.b1)
      .map(|(a, b)| {
        let v = a.wrapping_add(*b).max(0) / self.h_div.max(1);
        v.min(HIDDEN_MAX) as u8
      })
      .collect()
  }

  /// Layer-2 accumulators to logits
  pub fn logits(&self, acc: &[i32]) -> Vec<i32> {
    debug_assert_eq!(acc.len(), self.output_size);
    acc.iter().zip(&self.b2).map(|(a, b)| a.wrapping_add(*b)).collect()
  }

  /// Reference forward pass on the host
  pub fn infer(&self, image: &[u8]) -> Inference {
    let acc1 = cpu_matvec(&self.w1, self.hidden_size, self.input_size, image, ActivationMode::Unsigned);
    let hidden = self.hidden(&acc1);
    let acc2 = cpu_matvec(&self.w2, self.output_size, self.hidden_size, &hidden, ActivationMode::Signed);
    let logits = self.logits(&acc2);
    Inference {
      class: argmax(&logits),
      hidden,
      logits,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tiny() -> Mlp {
    Mlp {
      input_size: 2,
      hidden_size: 2,
      output_size: 2,
      w1: vec![1, 0, 0, 1],
      b1: vec![-10, 0],
      w2: vec![1, -1, -1, 1],
      b2: vec![0, 5],
      h_div: 2,
    }
  }

  #[test]
  fn test_hidden_requantization() {
    let mlp = Mlp {
      hidden_size: 4,
      b1: vec![0, -100, 10, 0],
      ..tiny()
    };
    // negative clamps to 0, large clamps to 127, division truncates
    assert_eq!(mlp.hidden(&[7, 50, 1000, 255]), vec![3, 0, 127, 127]);
  }

  #[test]
  fn test_argmax_first_wins() {
    assert_eq!(argmax(&[1, 5, 5, -2]), 1);
    assert_eq!(argmax(&[-3]), 0);
    assert_eq!(argmax(&[]), 0);
  }

  #[test]
  fn test_forward_pass() {
    let mlp = tiny();
    // acc1 = [30, 8] -> +b1 [20, 8] -> /2 [10, 4]
    let out = mlp.infer(&[30, 8]);
    assert_eq!(out.hidden, vec![10, 4]);
    // acc2 = [6, -6] -> +b2 [6, -1]
    assert_eq!(out.logits, vec![6, -1]);
    assert_eq!(out.class, 0);
  }
}
