use burn::module::Module;
use burn::nn::{
    BatchNorm, BatchNormConfig, GroupNorm, GroupNormConfig, InstanceNorm, InstanceNormConfig,
};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::{check_dimensions, ArgReader, LayerArgs, LayerKind};
use crate::FactoryError;

/// Registered normalization kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormKind {
    /// Instance normalization, statistics per sample and channel.
    Instance,
    /// Batch normalization, statistics per channel over the batch.
    Batch,
    /// Group normalization, statistics per sample and group of channels.
    Group,
}

impl LayerKind for NormKind {
    const CATEGORY: &'static str = "normalization";
    const REGISTRY: &'static [(&'static str, Self)] = &[
        ("instance", Self::Instance),
        ("instancenorm", Self::Instance),
        ("batch", Self::Batch),
        ("batchnorm", Self::Batch),
        ("group", Self::Group),
        ("groupnorm", Self::Group),
    ];
}

impl core::str::FromStr for NormKind {
    type Err = FactoryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::lookup(name)
    }
}

impl NormKind {
    /// Resolve the concrete normalization for inputs with `dimensions` spatial axes.
    pub fn resolve(self, dimensions: usize) -> Result<NormType, FactoryError> {
        check_dimensions(Self::CATEGORY, dimensions)?;

        let norm_type = match (self, dimensions) {
            (Self::Instance, 1) => NormType::InstanceNorm1d,
            (Self::Instance, 2) => NormType::InstanceNorm2d,
            (Self::Instance, _) => NormType::InstanceNorm3d,
            (Self::Batch, 1) => NormType::BatchNorm1d,
            (Self::Batch, 2) => NormType::BatchNorm2d,
            (Self::Batch, _) => NormType::BatchNorm3d,
            (Self::Group, _) => NormType::GroupNorm,
        };

        Ok(norm_type)
    }
}

/// Concrete normalization layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum NormType {
    InstanceNorm1d,
    InstanceNorm2d,
    InstanceNorm3d,
    BatchNorm1d,
    BatchNorm2d,
    BatchNorm3d,
    GroupNorm,
}

impl NormType {
    /// Number of spatial dimensions the layer is specialized for, `None` when it accepts any.
    pub fn dimensions(&self) -> Option<usize> {
        match self {
            Self::InstanceNorm1d | Self::BatchNorm1d => Some(1),
            Self::InstanceNorm2d | Self::BatchNorm2d => Some(2),
            Self::InstanceNorm3d | Self::BatchNorm3d => Some(3),
            Self::GroupNorm => None,
        }
    }

    /// Initialize the normalization layer over `num_features` channels.
    ///
    /// Accepted arguments:
    ///
    /// - instance: `eps` (`1e-5`), `affine` (`false`)
    /// - batch: `eps` (`1e-5`), `momentum` (`0.1`)
    /// - group: `num_groups` (required, must divide `num_features`), `eps` (`1e-5`),
    ///   `affine` (`true`)
    pub fn init<B: Backend>(
        self,
        num_features: usize,
        args: &LayerArgs,
        device: &B::Device,
    ) -> Result<Norm<B>, FactoryError> {
        log::debug!("Initializing {self:?} over {num_features} channels");

        let norm = match self {
            Self::InstanceNorm1d | Self::InstanceNorm2d | Self::InstanceNorm3d => {
                let args = ArgReader::new("instance", args, &["eps", "affine"])?;

                Norm::Instance(
                    InstanceNormConfig::new(num_features)
                        .with_epsilon(args.f64("eps", 1e-5)?)
                        .with_affine(args.bool("affine", false)?)
                        .init(device),
                )
            }
            Self::BatchNorm1d | Self::BatchNorm2d | Self::BatchNorm3d => {
                let args = ArgReader::new("batch", args, &["eps", "momentum"])?;
                let config = BatchNormConfig::new(num_features)
                    .with_epsilon(args.f64("eps", 1e-5)?)
                    .with_momentum(args.f64("momentum", 0.1)?);

                match self {
                    Self::BatchNorm1d => Norm::Batch1d(config.init(device)),
                    Self::BatchNorm2d => Norm::Batch2d(config.init(device)),
                    _ => Norm::Batch3d(config.init(device)),
                }
            }
            Self::GroupNorm => {
                let args = ArgReader::new("group", args, &["num_groups", "eps", "affine"])?;
                let num_groups = args.usize("num_groups", None)?;

                if num_features % num_groups != 0 {
                    return Err(args.invalid("num_groups", "a divisor of the number of channels"));
                }

                Norm::Group(
                    GroupNormConfig::new(num_groups, num_features)
                        .with_epsilon(args.f64("eps", 1e-5)?)
                        .with_affine(args.bool("affine", true)?)
                        .init(device),
                )
            }
        };

        Ok(norm)
    }
}

/// One of Burn's normalization layers.
///
/// Batch normalization keeps its dimensionality in the type and only accepts inputs of
/// the matching rank.
#[derive(Module, Debug)]
#[allow(missing_docs)]
pub enum Norm<B: Backend> {
    Instance(InstanceNorm<B>),
    Batch1d(BatchNorm<B, 1>),
    Batch2d(BatchNorm<B, 2>),
    Batch3d(BatchNorm<B, 3>),
    Group(GroupNorm<B>),
}

impl<B: Backend> Norm<B> {
    /// The normalization kind of the layer.
    pub fn kind(&self) -> NormKind {
        match self {
            Norm::Instance(_) => NormKind::Instance,
            Norm::Batch1d(_) | Norm::Batch2d(_) | Norm::Batch3d(_) => NormKind::Batch,
            Norm::Group(_) => NormKind::Group,
        }
    }

    /// Applies the forward pass on the input tensor.
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, channels, ...]`
    /// - output: `[batch_size, channels, ...]`
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Norm::Instance(norm) => norm.forward(input),
            Norm::Batch1d(norm) => norm.forward(input),
            Norm::Batch2d(norm) => norm.forward(input),
            Norm::Batch3d(norm) => norm.forward(input),
            Norm::Group(norm) => norm.forward(input),
        }
    }
}
