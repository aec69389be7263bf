#![warn(missing_docs)]

//! Parametrized convolution building blocks for Burn.
//!
//! Two modules are provided, both independent of the number of spatial dimensions:
//!
//! * [`Convolution`]: a convolution (or transposed convolution) followed by optional
//!   normalization, dropout and activation layers.
//! * [`ResidualUnit`]: a stack of [`Convolution`] blocks with an additive skip connection.
//!
//! Normalization, activation and dropout layers are described symbolically with
//! [`LayerSpec`](factory::LayerSpec) and resolved through the [factory](factory) tables.

/// Convolution and residual blocks.
pub mod blocks;

/// Symbolic layer descriptions and their resolution into concrete layers.
pub mod factory;

/// "Same" padding calculation.
pub mod padding;

mod error;
mod spatial;

pub use blocks::*;
pub use error::*;
pub use spatial::*;

/// Backend for test cases
#[cfg(test)]
pub type TestBackend = burn::backend::NdArray<f32>;

/// Backend for autodiff test cases
#[cfg(test)]
pub type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;
