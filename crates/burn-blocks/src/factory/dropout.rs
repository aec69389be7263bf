use burn::module::Module;
use burn::nn::DropoutConfig;
use burn::tensor::backend::Backend;
use burn::tensor::{Distribution, Tensor};

use super::{check_dimensions, ArgReader, LayerArgs, LayerKind};
use crate::FactoryError;

/// Registered dropout kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropoutKind {
    /// Standard dropout, the default for a bare dropout ratio.
    Dropout,
}

impl LayerKind for DropoutKind {
    const CATEGORY: &'static str = "dropout";
    const REGISTRY: &'static [(&'static str, Self)] = &[("dropout", Self::Dropout)];
}

impl core::str::FromStr for DropoutKind {
    type Err = FactoryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::lookup(name)
    }
}

impl DropoutKind {
    /// Resolve the concrete dropout for inputs with `dimensions` spatial axes.
    ///
    /// One dimensional inputs drop single elements, two and three dimensional inputs drop
    /// whole feature maps.
    pub fn resolve(self, dimensions: usize) -> Result<DropoutType, FactoryError> {
        check_dimensions(Self::CATEGORY, dimensions)?;

        let dropout_type = match dimensions {
            1 => DropoutType::Dropout,
            2 => DropoutType::Dropout2d,
            _ => DropoutType::Dropout3d,
        };

        Ok(dropout_type)
    }
}

/// Concrete dropout layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropoutType {
    /// Element-wise dropout.
    Dropout,
    /// Channel-wise dropout over 2D feature maps.
    Dropout2d,
    /// Channel-wise dropout over 3D feature maps.
    Dropout3d,
}

impl DropoutType {
    /// Whether whole channels are dropped.
    pub fn is_channel_wise(&self) -> bool {
        !matches!(self, Self::Dropout)
    }

    /// Initialize the dropout layer.
    ///
    /// Accepted arguments: `p` (`0.5`), the drop probability in `[0, 1)`.
    pub fn init(self, args: &LayerArgs) -> Result<DropoutLayer, FactoryError> {
        let args = ArgReader::new("dropout", args, &["p"])?;
        let prob = args.f64("p", 0.5)?;

        if !(0.0..1.0).contains(&prob) {
            return Err(args.invalid("p", "a probability in [0, 1)"));
        }

        log::debug!("Initializing {self:?} with probability {prob}");

        Ok(DropoutLayer {
            prob,
            channel_wise: self.is_channel_wise(),
        })
    }
}

/// Randomly zeroes elements, or whole channels, of the input tensor during training.
///
/// Kept values are scaled by `1 / (1 - prob)`. Like [`Dropout`](burn::nn::Dropout), the
/// layer is the identity when the backend doesn't track gradients.
///
/// Should be created with [`DropoutType::init`].
#[derive(Module, Clone, Debug)]
pub struct DropoutLayer {
    /// The probability of zeroing an element, or a channel.
    pub prob: f64,
    /// Whether whole channels are zeroed together.
    pub channel_wise: bool,
}

impl DropoutLayer {
    /// Applies the forward pass on the input tensor.
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, channels, ...]`
    /// - output: `[batch_size, channels, ...]`
    pub fn forward<B: Backend, const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        if !self.channel_wise {
            return DropoutConfig::new(self.prob).init().forward(input);
        }

        if !B::ad_enabled() || self.prob == 0.0 {
            return input;
        }

        let dims = input.dims();
        let mut shape = [1; D];
        shape[0] = dims[0];
        shape[1] = dims[1];

        let keep = Tensor::<B, D>::random(
            shape,
            Distribution::Bernoulli(1.0 - self.prob),
            &input.device(),
        );

        input.mul(keep).div_scalar(1.0 - self.prob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::LayerSpec;
    use crate::{TestAutodiffBackend, TestBackend};

    #[test]
    fn resolve_matches_dimensions() {
        assert_eq!(DropoutKind::Dropout.resolve(1), Ok(DropoutType::Dropout));
        assert_eq!(DropoutKind::Dropout.resolve(2), Ok(DropoutType::Dropout2d));
        assert_eq!(DropoutKind::Dropout.resolve(3), Ok(DropoutType::Dropout3d));
        assert!(DropoutKind::Dropout.resolve(4).is_err());
    }

    #[test]
    fn probability_must_be_below_one() {
        let spec = LayerSpec::from("dropout").with_arg("p", 1.0);

        assert!(matches!(
            DropoutType::Dropout.init(&spec.args),
            Err(FactoryError::InvalidArgument { key: "p", .. })
        ));
    }

    #[test]
    fn without_ad_backend_should_not_change_input() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::ones([2, 8, 4, 4], &device);
        let dropout = DropoutType::Dropout2d.init(&LayerArgs::new()).unwrap();

        let output = dropout.forward(tensor.clone());

        output.to_data().assert_eq(&tensor.to_data(), true);
    }

    #[test]
    fn channel_wise_dropout_zeroes_whole_channels() {
        let device = Default::default();
        let tensor = Tensor::<TestAutodiffBackend, 4>::ones([2, 16, 3, 3], &device);
        let dropout = DropoutType::Dropout2d.init(&LayerArgs::new()).unwrap();

        let output = dropout.forward(tensor).into_data().to_vec::<f32>().unwrap();

        for channel in output.chunks(9) {
            let first = channel[0];
            assert!(first == 0.0 || first == 2.0, "unexpected value {first}");
            assert!(channel.iter().all(|value| *value == first));
        }
    }
}
