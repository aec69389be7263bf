use burn::module::Module;
use burn::nn::{
    Gelu, HardSigmoid, HardSigmoidConfig, LeakyRelu, LeakyReluConfig, PRelu, PReluConfig, Relu,
    Sigmoid, Tanh,
};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::{ArgReader, LayerArgs, LayerKind};
use crate::FactoryError;

/// Registered activation kinds.
///
/// Activations are applied element-wise, so they don't depend on the number of spatial
/// dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ActKind {
    Relu,
    LeakyRelu,
    PRelu,
    Gelu,
    Sigmoid,
    Tanh,
    HardSigmoid,
    Swish,
}

impl LayerKind for ActKind {
    const CATEGORY: &'static str = "activation";
    const REGISTRY: &'static [(&'static str, Self)] = &[
        ("relu", Self::Relu),
        ("leakyrelu", Self::LeakyRelu),
        ("prelu", Self::PRelu),
        ("gelu", Self::Gelu),
        ("sigmoid", Self::Sigmoid),
        ("tanh", Self::Tanh),
        ("hardsigmoid", Self::HardSigmoid),
        ("swish", Self::Swish),
        ("silu", Self::Swish),
    ];
}

impl core::str::FromStr for ActKind {
    type Err = FactoryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::lookup(name)
    }
}

impl ActKind {
    /// Initialize the activation layer.
    ///
    /// Accepted arguments:
    ///
    /// - leakyrelu: `negative_slope` (`0.01`)
    /// - prelu: `num_parameters` (`1`), `init` (`0.25`)
    /// - hardsigmoid: `alpha` (`0.2`), `beta` (`0.5`)
    ///
    /// The other activations take no argument.
    pub fn init<B: Backend>(
        self,
        args: &LayerArgs,
        device: &B::Device,
    ) -> Result<Activation<B>, FactoryError> {
        log::debug!("Initializing activation {}", self.name());

        let act = match self {
            Self::LeakyRelu => {
                let args = ArgReader::new("leakyrelu", args, &["negative_slope"])?;

                Activation::LeakyRelu(
                    LeakyReluConfig::new()
                        .with_negative_slope(args.f64("negative_slope", 0.01)?)
                        .init(),
                )
            }
            Self::PRelu => {
                let args = ArgReader::new("prelu", args, &["num_parameters", "init"])?;

                Activation::PRelu(
                    PReluConfig::new()
                        .with_num_parameters(args.usize("num_parameters", Some(1))?)
                        .with_alpha(args.f64("init", 0.25)?)
                        .init(device),
                )
            }
            Self::HardSigmoid => {
                let args = ArgReader::new("hardsigmoid", args, &["alpha", "beta"])?;

                Activation::HardSigmoid(
                    HardSigmoidConfig::new()
                        .with_alpha(args.f64("alpha", 0.2)?)
                        .with_beta(args.f64("beta", 0.5)?)
                        .init(),
                )
            }
            kind => {
                ArgReader::new(kind.name(), args, &[])?;

                match kind {
                    Self::Relu => Activation::Relu(Relu::new()),
                    Self::Gelu => Activation::Gelu(Gelu::new()),
                    Self::Sigmoid => Activation::Sigmoid(Sigmoid::new()),
                    Self::Tanh => Activation::Tanh(Tanh::new()),
                    _ => Activation::Swish(Swish::new()),
                }
            }
        };

        Ok(act)
    }
}

/// Applies the Swish (SiLU) function element-wise, `x * sigmoid(x)`.
/// See also [silu](burn::tensor::activation::silu)
#[derive(Module, Clone, Debug, Default)]
pub struct Swish;

impl Swish {
    /// Create the module.
    pub fn new() -> Self {
        Self {}
    }

    /// Applies the forward pass on the input tensor.
    ///
    /// # Shapes
    ///
    /// - input: `[..., any]`
    /// - output: `[..., any]`
    pub fn forward<B: Backend, const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        burn::tensor::activation::silu(input)
    }
}

/// One of Burn's activation layers.
#[derive(Module, Debug)]
#[allow(missing_docs)]
pub enum Activation<B: Backend> {
    Relu(Relu),
    LeakyRelu(LeakyRelu),
    PRelu(PRelu<B>),
    Gelu(Gelu),
    Sigmoid(Sigmoid),
    Tanh(Tanh),
    HardSigmoid(HardSigmoid),
    Swish(Swish),
}

impl<B: Backend> Activation<B> {
    /// The activation kind of the layer.
    pub fn kind(&self) -> ActKind {
        match self {
            Activation::Relu(_) => ActKind::Relu,
            Activation::LeakyRelu(_) => ActKind::LeakyRelu,
            Activation::PRelu(_) => ActKind::PRelu,
            Activation::Gelu(_) => ActKind::Gelu,
            Activation::Sigmoid(_) => ActKind::Sigmoid,
            Activation::Tanh(_) => ActKind::Tanh,
            Activation::HardSigmoid(_) => ActKind::HardSigmoid,
            Activation::Swish(_) => ActKind::Swish,
        }
    }

    /// Applies the forward pass on the input tensor.
    ///
    /// # Shapes
    ///
    /// - input: `[..., any]`
    /// - output: `[..., any]`
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Relu(act) => act.forward(input),
            Activation::LeakyRelu(act) => act.forward(input),
            Activation::PRelu(act) => act.forward(input),
            Activation::Gelu(act) => act.forward(input),
            Activation::Sigmoid(act) => act.forward(input),
            Activation::Tanh(act) => act.forward(input),
            Activation::HardSigmoid(act) => act.forward(input),
            Activation::Swish(act) => act.forward(input),
        }
    }
}
