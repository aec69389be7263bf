mod convolution;
mod residual;

pub use convolution::*;
pub use residual::*;
