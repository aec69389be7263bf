use burn::module::{Ignored, Module};
use burn::nn::conv::{
    Conv1d, Conv1dConfig, Conv2d, Conv2dConfig, Conv3d, Conv3dConfig, ConvTranspose1d,
    ConvTranspose1dConfig, ConvTranspose2d, ConvTranspose2dConfig, ConvTranspose3d,
    ConvTranspose3dConfig,
};
use burn::nn::{PaddingConfig1d, PaddingConfig2d, PaddingConfig3d};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::{check_dimensions, LayerKind};
use crate::FactoryError;

/// Registered convolution kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvKind {
    /// Regular convolution.
    Conv,
    /// Transposed convolution.
    ConvTrans,
}

impl LayerKind for ConvKind {
    const CATEGORY: &'static str = "convolution";
    const REGISTRY: &'static [(&'static str, Self)] = &[
        ("conv", Self::Conv),
        ("convtrans", Self::ConvTrans),
        ("convtranspose", Self::ConvTrans),
    ];
}

impl core::str::FromStr for ConvKind {
    type Err = FactoryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::lookup(name)
    }
}

impl ConvKind {
    /// The convolution kind for the given direction.
    pub fn new(is_transposed: bool) -> Self {
        match is_transposed {
            true => Self::ConvTrans,
            false => Self::Conv,
        }
    }

    /// Resolve the concrete convolution operating on `dimensions` spatial axes.
    pub fn resolve(self, dimensions: usize) -> Result<ConvType, FactoryError> {
        check_dimensions(Self::CATEGORY, dimensions)?;

        let conv_type = match (self, dimensions) {
            (Self::Conv, 1) => ConvType::Conv1d,
            (Self::Conv, 2) => ConvType::Conv2d,
            (Self::Conv, _) => ConvType::Conv3d,
            (Self::ConvTrans, 1) => ConvType::ConvTranspose1d,
            (Self::ConvTrans, 2) => ConvType::ConvTranspose2d,
            (Self::ConvTrans, _) => ConvType::ConvTranspose3d,
        };

        Ok(conv_type)
    }
}

/// Concrete convolution layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvType {
    /// [`Conv1d`]
    Conv1d,
    /// [`Conv2d`]
    Conv2d,
    /// [`Conv3d`]
    Conv3d,
    /// [`ConvTranspose1d`]
    ConvTranspose1d,
    /// [`ConvTranspose2d`]
    ConvTranspose2d,
    /// [`ConvTranspose3d`]
    ConvTranspose3d,
}

/// Geometry of a convolution layer. Every per-axis vector holds one value per spatial axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvGeometry {
    /// Input and output channels.
    pub channels: [usize; 2],
    /// Size of the kernel.
    pub kernel_size: Vec<usize>,
    /// Stride of the convolution.
    pub stride: Vec<usize>,
    /// Symmetric padding added to both sides of each axis.
    pub padding: Vec<usize>,
    /// Extra size added to one side of the output, transposed convolutions only.
    pub padding_out: Vec<usize>,
    /// Spacing between kernel elements.
    pub dilation: Vec<usize>,
    /// If bias should be added to the output.
    pub bias: bool,
}

impl ConvType {
    /// Number of spatial dimensions the layer operates on.
    pub fn dimensions(&self) -> usize {
        match self {
            Self::Conv1d | Self::ConvTranspose1d => 1,
            Self::Conv2d | Self::ConvTranspose2d => 2,
            Self::Conv3d | Self::ConvTranspose3d => 3,
        }
    }

    /// Whether the layer is a transposed convolution.
    pub fn is_transposed(&self) -> bool {
        matches!(
            self,
            Self::ConvTranspose1d | Self::ConvTranspose2d | Self::ConvTranspose3d
        )
    }

    /// Initialize the convolution layer.
    ///
    /// # Panics
    ///
    /// When a per-axis vector of the geometry has fewer entries than [dimensions](Self::dimensions).
    pub fn init<B: Backend>(self, geometry: ConvGeometry, device: &B::Device) -> ConvLayer<B> {
        let g = &geometry;

        log::debug!(
            "Initializing {self:?} with channels {:?}, kernel size {:?}, stride {:?}, padding {:?}",
            g.channels,
            g.kernel_size,
            g.stride,
            g.padding
        );

        let conv = match self {
            Self::Conv1d => Conv::Conv1d(
                Conv1dConfig::new(g.channels[0], g.channels[1], g.kernel_size[0])
                    .with_stride(g.stride[0])
                    .with_dilation(g.dilation[0])
                    .with_padding(PaddingConfig1d::Explicit(g.padding[0]))
                    .with_bias(g.bias)
                    .init(device),
            ),
            Self::Conv2d => {
                let [p0, p1] = axes::<2>(&g.padding);
                Conv::Conv2d(
                    Conv2dConfig::new(g.channels, axes(&g.kernel_size))
                        .with_stride(axes(&g.stride))
                        .with_dilation(axes(&g.dilation))
                        .with_padding(PaddingConfig2d::Explicit(p0, p1))
                        .with_bias(g.bias)
                        .init(device),
                )
            }
            Self::Conv3d => {
                let [p0, p1, p2] = axes::<3>(&g.padding);
                Conv::Conv3d(
                    Conv3dConfig::new(g.channels, axes(&g.kernel_size))
                        .with_stride(axes(&g.stride))
                        .with_dilation(axes(&g.dilation))
                        .with_padding(PaddingConfig3d::Explicit(p0, p1, p2))
                        .with_bias(g.bias)
                        .init(device),
                )
            }
            Self::ConvTranspose1d => Conv::ConvTranspose1d(
                ConvTranspose1dConfig::new(g.channels, g.kernel_size[0])
                    .with_stride(g.stride[0])
                    .with_dilation(g.dilation[0])
                    .with_padding(g.padding[0])
                    .with_padding_out(g.padding_out[0])
                    .with_bias(g.bias)
                    .init(device),
            ),
            Self::ConvTranspose2d => Conv::ConvTranspose2d(
                ConvTranspose2dConfig::new(g.channels, axes(&g.kernel_size))
                    .with_stride(axes(&g.stride))
                    .with_dilation(axes(&g.dilation))
                    .with_padding(axes(&g.padding))
                    .with_padding_out(axes(&g.padding_out))
                    .with_bias(g.bias)
                    .init(device),
            ),
            Self::ConvTranspose3d => Conv::ConvTranspose3d(
                ConvTranspose3dConfig::new(g.channels, axes(&g.kernel_size))
                    .with_stride(axes(&g.stride))
                    .with_dilation(axes(&g.dilation))
                    .with_padding(axes(&g.padding))
                    .with_padding_out(axes(&g.padding_out))
                    .with_bias(g.bias)
                    .init(device),
            ),
        };

        ConvLayer {
            conv,
            geometry: Ignored(geometry),
        }
    }
}

fn axes<const N: usize>(values: &[usize]) -> [usize; N] {
    core::array::from_fn(|axis| values[axis])
}

/// One of Burn's convolution layers.
#[derive(Module, Debug)]
#[allow(missing_docs)]
pub enum Conv<B: Backend> {
    Conv1d(Conv1d<B>),
    Conv2d(Conv2d<B>),
    Conv3d(Conv3d<B>),
    ConvTranspose1d(ConvTranspose1d<B>),
    ConvTranspose2d(ConvTranspose2d<B>),
    ConvTranspose3d(ConvTranspose3d<B>),
}

/// A convolution layer of any dimensionality, along with the geometry it was built with.
///
/// Should be created with [`ConvType::init`].
#[derive(Module, Debug)]
pub struct ConvLayer<B: Backend> {
    /// The wrapped convolution.
    pub conv: Conv<B>,
    geometry: Ignored<ConvGeometry>,
}

impl<B: Backend> ConvLayer<B> {
    /// The geometry the layer was built with.
    pub fn geometry(&self) -> &ConvGeometry {
        &self.geometry.0
    }

    /// The concrete convolution type.
    pub fn conv_type(&self) -> ConvType {
        match &self.conv {
            Conv::Conv1d(_) => ConvType::Conv1d,
            Conv::Conv2d(_) => ConvType::Conv2d,
            Conv::Conv3d(_) => ConvType::Conv3d,
            Conv::ConvTranspose1d(_) => ConvType::ConvTranspose1d,
            Conv::ConvTranspose2d(_) => ConvType::ConvTranspose2d,
            Conv::ConvTranspose3d(_) => ConvType::ConvTranspose3d,
        }
    }

    /// Shape of the weight tensor.
    ///
    /// `[channels_out, channels_in, kernel_size...]` for regular convolutions and
    /// `[channels_in, channels_out, kernel_size...]` for transposed ones.
    pub fn weight_dims(&self) -> Vec<usize> {
        match &self.conv {
            Conv::Conv1d(conv) => conv.weight.val().dims().to_vec(),
            Conv::Conv2d(conv) => conv.weight.val().dims().to_vec(),
            Conv::Conv3d(conv) => conv.weight.val().dims().to_vec(),
            Conv::ConvTranspose1d(conv) => conv.weight.val().dims().to_vec(),
            Conv::ConvTranspose2d(conv) => conv.weight.val().dims().to_vec(),
            Conv::ConvTranspose3d(conv) => conv.weight.val().dims().to_vec(),
        }
    }

    /// Applies the forward pass on the input tensor.
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, channels_in, spatial...]`
    /// - output: `[batch_size, channels_out, spatial...]`
    ///
    /// # Panics
    ///
    /// This function will panic if the input rank isn't the number of spatial dimensions plus 2.
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        match &self.conv {
            Conv::Conv1d(conv) => with_rank(input, |x| conv.forward(x)),
            Conv::Conv2d(conv) => with_rank(input, |x| conv.forward(x)),
            Conv::Conv3d(conv) => with_rank(input, |x| conv.forward(x)),
            Conv::ConvTranspose1d(conv) => with_rank(input, |x| conv.forward(x)),
            Conv::ConvTranspose2d(conv) => with_rank(input, |x| conv.forward(x)),
            Conv::ConvTranspose3d(conv) => with_rank(input, |x| conv.forward(x)),
        }
    }
}

/// Run `func` on the input seen as a tensor of rank `R`.
fn with_rank<B: Backend, const D: usize, const R: usize>(
    input: Tensor<B, D>,
    func: impl FnOnce(Tensor<B, R>) -> Tensor<B, R>,
) -> Tensor<B, D> {
    // Should be a compilation error once const generics allow that kind of validation.
    if D != R {
        panic!(
            "Convolution over {} spatial dimensions can only be applied on tensors of rank {} \
             with the following shape [batch_size, channels, ...], received rank {}",
            R - 2,
            R,
            D
        );
    }

    let dims = input.dims();
    let output = func(input.reshape(axes::<R>(&dims)));
    let dims = output.dims();
    output.reshape(axes::<D>(&dims))
}
