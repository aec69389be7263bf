use burn::config::Config;
use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::factory::{
    split_args, ActKind, Activation, ConvGeometry, ConvKind, ConvLayer, DropoutLayer, DropoutSpec,
    LayerSpec, Norm, NormKind,
};
use crate::padding::{same_padding, stride_minus_one};
use crate::{BlockError, Spatial};

/// Configuration to create a [Convolution] block, using the [init function](ConvolutionConfig::init).
///
/// The block applies, in order:
///
/// ```text
/// -- (Conv|ConvTrans) -- Norm -- (Dropout) -- (Act) --
/// ```
///
/// or only the convolution when `conv_only` is set.
#[derive(Config, Debug)]
pub struct ConvolutionConfig {
    /// The number of spatial dimensions, 1, 2 or 3.
    pub dimensions: usize,
    /// The number of input channels.
    pub in_channels: usize,
    /// The number of output channels.
    pub out_channels: usize,
    /// The stride of the convolution.
    #[config(default = "Spatial::Uniform(1)")]
    pub strides: Spatial,
    /// The size of the kernel, odd on every axis.
    #[config(default = "Spatial::Uniform(3)")]
    pub kernel_size: Spatial,
    /// The activation layer, none when `None`.
    #[config(default = "Some(LayerSpec::from(\"prelu\"))")]
    pub act: Option<LayerSpec>,
    /// The normalization layer, none when `None`.
    #[config(default = "Some(LayerSpec::from(\"instance\"))")]
    pub norm: Option<LayerSpec>,
    /// The dropout layer, none when `None` or a ratio of zero.
    #[config(default = "None")]
    pub dropout: Option<DropoutSpec>,
    /// Spacing between kernel elements.
    #[config(default = "Spatial::Uniform(1)")]
    pub dilation: Spatial,
    /// If bias should be added to the convolution output.
    #[config(default = true)]
    pub bias: bool,
    /// Only keep the convolution, without normalization, dropout and activation.
    #[config(default = false)]
    pub conv_only: bool,
    /// Use a transposed convolution instead of a regular one.
    #[config(default = false)]
    pub is_transposed: bool,
}

/// A convolution followed by optional normalization, dropout and activation layers.
///
/// Accepts tensors of shape `[batch_size, channels, spatial...]` with as many spatial axes
/// as the configured dimensions.
///
/// Should be created with [ConvolutionConfig].
#[derive(Module, Debug)]
pub struct Convolution<B: Backend> {
    /// The convolution, always applied first.
    pub conv: ConvLayer<B>,
    /// Layers applied after the convolution, in order.
    pub layers: Vec<SubLayer<B>>,
    dimensions: usize,
}

/// A layer applied after the convolution of a [Convolution] block.
#[derive(Module, Debug)]
pub enum SubLayer<B: Backend> {
    /// Normalization layer.
    Norm(Norm<B>),
    /// Dropout layer.
    Dropout(DropoutLayer),
    /// Activation layer.
    Act(Activation<B>),
}

impl<B: Backend> SubLayer<B> {
    /// Name of the layer within the block.
    pub fn name(&self) -> &'static str {
        match self {
            SubLayer::Norm(_) => "norm",
            SubLayer::Dropout(_) => "dropout",
            SubLayer::Act(_) => "act",
        }
    }

    /// Applies the forward pass on the input tensor.
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            SubLayer::Norm(norm) => norm.forward(input),
            SubLayer::Dropout(dropout) => dropout.forward(input),
            SubLayer::Act(act) => act.forward(input),
        }
    }
}

impl ConvolutionConfig {
    /// Initialize a new [convolution](Convolution) block.
    ///
    /// # Panics
    ///
    /// When the configuration is invalid, see [try_init](Self::try_init).
    pub fn init<B: Backend>(&self, device: &B::Device) -> Convolution<B> {
        match self.try_init(device) {
            Ok(block) => block,
            Err(err) => panic!("Invalid convolution configuration: {err}"),
        }
    }

    /// Initialize a new [convolution](Convolution) block.
    ///
    /// Every layer name is resolved before any layer is built, even the layers skipped
    /// because of `conv_only`.
    ///
    /// # Errors
    ///
    /// When the channel counts or strides are zero, when an even kernel size makes "same"
    /// padding impossible, or when a layer name or argument is invalid.
    pub fn try_init<B: Backend>(&self, device: &B::Device) -> Result<Convolution<B>, BlockError> {
        let dimensions = self.dimensions;
        let conv_type = ConvKind::new(self.is_transposed).resolve(dimensions)?;

        check_channels(self.in_channels, self.out_channels)?;
        let strides = check_strides(&self.strides, dimensions)?;
        let padding = same_padding(&self.kernel_size, &self.dilation, dimensions)?;

        let norm = match &self.norm {
            Some(spec) => {
                let (kind, args) = split_args::<NormKind>(spec)?;
                Some((kind.resolve(dimensions)?, args))
            }
            None => None,
        };
        let act = match &self.act {
            Some(spec) => Some(split_args::<ActKind>(spec)?),
            None => None,
        };
        let dropout = match &self.dropout {
            Some(spec) => match spec.split()? {
                Some((kind, args)) => Some((kind.resolve(dimensions)?, args)),
                None => None,
            },
            None => None,
        };

        let padding_out = match self.is_transposed {
            true => stride_minus_one(&strides),
            false => vec![0; dimensions],
        };
        let geometry = ConvGeometry {
            channels: [self.in_channels, self.out_channels],
            kernel_size: expand(&self.kernel_size, "kernel_size", dimensions)?,
            stride: strides,
            padding,
            padding_out,
            dilation: expand(&self.dilation, "dilation", dimensions)?,
            bias: self.bias,
        };
        let conv = conv_type.init(geometry, device);

        let mut layers = Vec::new();

        if !self.conv_only {
            if let Some((norm_type, args)) = norm {
                layers.push(SubLayer::Norm(norm_type.init(
                    self.out_channels,
                    args,
                    device,
                )?));
            }
            if let Some((dropout_type, args)) = dropout {
                layers.push(SubLayer::Dropout(dropout_type.init(&args)?));
            }
            if let Some((act_kind, args)) = act {
                layers.push(SubLayer::Act(act_kind.init(args, device)?));
            }
        }

        Ok(Convolution {
            conv,
            layers,
            dimensions,
        })
    }
}

impl<B: Backend> Convolution<B> {
    /// Applies the forward pass on the input tensor.
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, in_channels, spatial...]`
    /// - output: `[batch_size, out_channels, spatial...]`
    ///
    /// # Panics
    ///
    /// This function will panic if the input rank isn't the number of spatial dimensions plus 2.
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let x = self.conv.forward(input);

        self.layers.iter().fold(x, |x, layer| layer.forward(x))
    }

    /// Names of the layers of the block, in application order.
    pub fn layer_names(&self) -> Vec<&'static str> {
        let mut names = vec!["conv"];
        names.extend(self.layers.iter().map(SubLayer::name));
        names
    }

    /// Number of spatial dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of input channels.
    pub fn in_channels(&self) -> usize {
        self.conv.geometry().channels[0]
    }

    /// Number of output channels.
    pub fn out_channels(&self) -> usize {
        self.conv.geometry().channels[1]
    }

    /// Whether the convolution is transposed.
    pub fn is_transposed(&self) -> bool {
        self.conv.conv_type().is_transposed()
    }
}

fn check_channels(in_channels: usize, out_channels: usize) -> Result<(), BlockError> {
    match in_channels == 0 || out_channels == 0 {
        true => Err(BlockError::InvalidChannels {
            in_channels,
            out_channels,
        }),
        false => Ok(()),
    }
}

pub(crate) fn check_strides(strides: &Spatial, dimensions: usize) -> Result<Vec<usize>, BlockError> {
    let strides = expand(strides, "strides", dimensions)?;

    match strides.contains(&0) {
        true => Err(BlockError::InvalidStrides { strides }),
        false => Ok(strides),
    }
}

pub(crate) fn expand(
    values: &Spatial,
    argument: &'static str,
    dimensions: usize,
) -> Result<Vec<usize>, BlockError> {
    values
        .expand(dimensions)
        .ok_or_else(|| BlockError::AxisCount {
            argument,
            expected: dimensions,
            actual: values.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::ConvType;
    use crate::{FactoryError, PaddingError, TestBackend};

    fn config(dimensions: usize) -> ConvolutionConfig {
        ConvolutionConfig::new(dimensions, 4, 8)
            .with_norm(Some(LayerSpec::from("batch")))
            .with_dropout(Some(DropoutSpec::Ratio(0.2)))
    }

    #[test]
    fn full_block_has_four_layers_in_order() {
        let block = config(2).init::<TestBackend>(&Default::default());

        assert_eq!(block.layer_names(), vec!["conv", "norm", "dropout", "act"]);
        assert!(matches!(block.layers[0], SubLayer::Norm(Norm::Batch2d(_))));
    }

    #[test]
    fn conv_only_block_has_a_single_layer() {
        let block = config(2)
            .with_conv_only(true)
            .init::<TestBackend>(&Default::default());

        assert_eq!(block.layer_names(), vec!["conv"]);
        assert_eq!(block.num_params(), 8 * 4 * 3 * 3 + 8);
    }

    #[test]
    fn missing_specs_skip_layers() {
        let block = ConvolutionConfig::new(1, 4, 8)
            .with_act(None)
            .init::<TestBackend>(&Default::default());

        assert_eq!(block.layer_names(), vec!["conv", "norm"]);

        let block = ConvolutionConfig::new(1, 4, 8)
            .with_norm(None)
            .with_dropout(Some(DropoutSpec::Ratio(0.0)))
            .init::<TestBackend>(&Default::default());

        assert_eq!(block.layer_names(), vec!["conv", "act"]);
    }

    #[test]
    fn default_block_keeps_spatial_size() {
        let device = Default::default();

        let block = ConvolutionConfig::new(1, 3, 5).init::<TestBackend>(&device);
        let output = block.forward(Tensor::<TestBackend, 3>::ones([2, 3, 9], &device));
        assert_eq!(output.dims(), [2, 5, 9]);

        let block = ConvolutionConfig::new(2, 3, 5).init::<TestBackend>(&device);
        let output = block.forward(Tensor::<TestBackend, 4>::ones([2, 3, 9, 6], &device));
        assert_eq!(output.dims(), [2, 5, 9, 6]);

        let block = ConvolutionConfig::new(3, 3, 5).init::<TestBackend>(&device);
        let output = block.forward(Tensor::<TestBackend, 5>::ones([1, 3, 4, 5, 6], &device));
        assert_eq!(output.dims(), [1, 5, 4, 5, 6]);
    }

    #[test]
    fn strided_block_downsamples() {
        let device = Default::default();
        let block = config(2)
            .with_strides(Spatial::from([2, 1]))
            .with_kernel_size(Spatial::from([3, 5]))
            .init::<TestBackend>(&device);

        let output = block.forward(Tensor::<TestBackend, 4>::ones([2, 4, 9, 8], &device));

        assert_eq!(block.conv.geometry().padding, vec![1, 2]);
        assert_eq!(output.dims(), [2, 8, 5, 8]);
    }

    #[test]
    fn transposed_block_upsamples() {
        let device = Default::default();
        let block = config(2)
            .with_strides(Spatial::Uniform(2))
            .with_is_transposed(true)
            .init::<TestBackend>(&device);

        let output = block.forward(Tensor::<TestBackend, 4>::ones([1, 4, 5, 6], &device));

        assert!(block.is_transposed());
        assert_eq!(block.conv.conv_type(), ConvType::ConvTranspose2d);
        assert_eq!(block.conv.geometry().padding_out, vec![1, 1]);
        assert_eq!(output.dims(), [1, 8, 10, 12]);
    }

    #[test]
    fn dilated_block_keeps_spatial_size() {
        let device = Default::default();
        let block = config(1)
            .with_dilation(Spatial::Uniform(2))
            .with_kernel_size(Spatial::Uniform(5))
            .init::<TestBackend>(&device);

        let output = block.forward(Tensor::<TestBackend, 3>::ones([2, 4, 16], &device));

        assert_eq!(block.conv.geometry().padding, vec![4]);
        assert_eq!(output.dims(), [2, 8, 16]);
    }

    #[test]
    fn accessors_describe_the_block() {
        let block = config(3).init::<TestBackend>(&Default::default());

        assert_eq!(block.dimensions(), 3);
        assert_eq!(block.in_channels(), 4);
        assert_eq!(block.out_channels(), 8);
        assert!(!block.is_transposed());
        assert_eq!(block.conv.weight_dims(), vec![8, 4, 3, 3, 3]);
    }

    #[test]
    fn ratio_and_named_dropout_build_the_same_layer() {
        let device = Default::default();
        let shorthand = config(2)
            .with_dropout(Some(DropoutSpec::Ratio(0.3)))
            .init::<TestBackend>(&device);
        let named = config(2)
            .with_dropout(Some(DropoutSpec::Named(
                LayerSpec::from("dropout").with_arg("p", 0.3),
            )))
            .init::<TestBackend>(&device);

        for block in [shorthand, named] {
            match &block.layers[1] {
                SubLayer::Dropout(dropout) => {
                    assert_eq!(dropout.prob, 0.3);
                    assert!(dropout.channel_wise);
                }
                layer => panic!("Expected dropout, got {}", layer.name()),
            }
        }
    }

    #[test]
    fn even_kernel_fails_in_padding() {
        let result = config(2)
            .with_kernel_size(Spatial::Uniform(4))
            .try_init::<TestBackend>(&Default::default());

        assert!(matches!(
            result,
            Err(BlockError::Padding(PaddingError::EvenKernel { .. }))
        ));
    }

    #[test]
    fn unknown_names_fail_even_when_unused() {
        let result = config(2)
            .with_norm(Some(LayerSpec::from("spectral")))
            .with_conv_only(true)
            .try_init::<TestBackend>(&Default::default());

        assert!(matches!(
            result,
            Err(BlockError::Factory(FactoryError::UnknownName { .. }))
        ));
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        let device = Default::default();

        let result = ConvolutionConfig::new(2, 0, 8).try_init::<TestBackend>(&device);
        assert!(matches!(result, Err(BlockError::InvalidChannels { .. })));

        let result = ConvolutionConfig::new(2, 4, 8)
            .with_strides(Spatial::from([2, 0]))
            .try_init::<TestBackend>(&device);
        assert!(matches!(result, Err(BlockError::InvalidStrides { .. })));

        let result = ConvolutionConfig::new(3, 4, 8)
            .with_strides(Spatial::from([2, 2]))
            .try_init::<TestBackend>(&device);
        assert!(matches!(
            result,
            Err(BlockError::AxisCount {
                argument: "strides",
                ..
            })
        ));

        let result = ConvolutionConfig::new(4, 4, 8).try_init::<TestBackend>(&device);
        assert!(matches!(
            result,
            Err(BlockError::Factory(FactoryError::UnsupportedDimensions { .. }))
        ));
    }

    #[test]
    #[should_panic = "Invalid convolution configuration"]
    fn init_panics_on_invalid_configuration() {
        ConvolutionConfig::new(2, 4, 8)
            .with_kernel_size(Spatial::Uniform(2))
            .init::<TestBackend>(&Default::default());
    }

    #[test]
    #[should_panic = "can only be applied on tensors of rank 4"]
    fn wrong_rank_panics() {
        let device = Default::default();
        let block = config(2).init::<TestBackend>(&device);

        block.forward(Tensor::<TestBackend, 5>::ones([1, 4, 3, 3, 3], &device));
    }
}
