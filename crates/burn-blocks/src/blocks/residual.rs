use burn::config::Config;
use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::convolution::{check_strides, expand};
use super::{Convolution, ConvolutionConfig};
use crate::factory::{ConvGeometry, ConvKind, ConvLayer, DropoutSpec, LayerSpec};
use crate::padding::same_padding;
use crate::{BlockError, Spatial};

/// Configuration to create a [ResidualUnit], using the [init function](ResidualUnitConfig::init).
#[derive(Config, Debug)]
pub struct ResidualUnitConfig {
    /// The number of spatial dimensions, 1, 2 or 3.
    pub dimensions: usize,
    /// The number of input channels.
    pub in_channels: usize,
    /// The number of output channels.
    pub out_channels: usize,
    /// The stride of the first sub-unit, and of the residual path.
    #[config(default = "Spatial::Uniform(1)")]
    pub strides: Spatial,
    /// The size of the kernel, odd on every axis.
    #[config(default = "Spatial::Uniform(3)")]
    pub kernel_size: Spatial,
    /// The number of stacked convolution blocks, at least 1.
    #[config(default = 2)]
    pub subunits: usize,
    /// The activation layer of each sub-unit.
    #[config(default = "Some(LayerSpec::from(\"prelu\"))")]
    pub act: Option<LayerSpec>,
    /// The normalization layer of each sub-unit.
    #[config(default = "Some(LayerSpec::from(\"instance\"))")]
    pub norm: Option<LayerSpec>,
    /// The dropout layer of each sub-unit.
    #[config(default = "None")]
    pub dropout: Option<DropoutSpec>,
    /// Spacing between kernel elements.
    #[config(default = "Spatial::Uniform(1)")]
    pub dilation: Spatial,
    /// If bias should be added to the convolution outputs.
    #[config(default = true)]
    pub bias: bool,
    /// Only keep the convolution of the last sub-unit.
    #[config(default = false)]
    pub last_conv_only: bool,
}

/// Stacked [convolution](Convolution) blocks with an additive residual connection.
///
/// `output = residual(input) + conv(input)`
///
/// The first sub-unit maps the input channels to the output channels with the configured
/// stride, the following ones keep the output channels with a stride of 1. The residual
/// path is the identity when neither the channels nor the spatial size change, and a
/// single convolution otherwise.
///
/// Should be created with [ResidualUnitConfig].
#[derive(Module, Debug)]
pub struct ResidualUnit<B: Backend> {
    /// The main path, applied in order.
    pub conv: Vec<Convolution<B>>,
    /// The residual path, the identity when `None`.
    pub residual: Option<ConvLayer<B>>,
}

impl ResidualUnitConfig {
    /// Initialize a new [residual unit](ResidualUnit).
    ///
    /// # Panics
    ///
    /// When the configuration is invalid, see [try_init](Self::try_init).
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResidualUnit<B> {
        match self.try_init(device) {
            Ok(unit) => unit,
            Err(err) => panic!("Invalid residual unit configuration: {err}"),
        }
    }

    /// Initialize a new [residual unit](ResidualUnit).
    ///
    /// # Errors
    ///
    /// Same as [ConvolutionConfig::try_init].
    pub fn try_init<B: Backend>(&self, device: &B::Device) -> Result<ResidualUnit<B>, BlockError> {
        let dimensions = self.dimensions;
        let subunits = self.subunits.max(1);

        let mut conv = Vec::with_capacity(subunits);
        let mut channels = self.in_channels;
        let mut strides = self.strides.clone();

        for index in 0..subunits {
            let unit = ConvolutionConfig::new(dimensions, channels, self.out_channels)
                .with_strides(strides)
                .with_kernel_size(self.kernel_size.clone())
                .with_act(self.act.clone())
                .with_norm(self.norm.clone())
                .with_dropout(self.dropout.clone())
                .with_dilation(self.dilation.clone())
                .with_bias(self.bias)
                .with_conv_only(self.last_conv_only && index == subunits - 1)
                .try_init(device)?;

            conv.push(unit);
            channels = self.out_channels;
            strides = Spatial::Uniform(1);
        }

        let residual = self.residual_geometry()?.map(|geometry| {
            log::debug!("Residual path projects with {geometry:?}");
            // Dimensions were validated by the sub-units.
            ConvKind::Conv.resolve(dimensions).map(|conv_type| conv_type.init(geometry, device))
        });

        Ok(ResidualUnit {
            conv,
            residual: residual.transpose()?,
        })
    }

    /// Geometry of the residual convolution, `None` for the identity.
    ///
    /// The residual convolution is never dilated: with the padding of an undilated kernel,
    /// it produces the same spatial size as the dilated main path.
    fn residual_geometry(&self) -> Result<Option<ConvGeometry>, BlockError> {
        let dimensions = self.dimensions;
        let stride = check_strides(&self.strides, dimensions)?;
        let downsamples = self.strides.product() != 1;

        if !downsamples && self.in_channels == self.out_channels {
            return Ok(None);
        }

        let (kernel_size, padding) = match downsamples {
            true => (
                expand(&self.kernel_size, "kernel_size", dimensions)?,
                same_padding(&self.kernel_size, &Spatial::Uniform(1), dimensions)?,
            ),
            // Only the channels change: a 1x1 projection without padding.
            false => (vec![1; dimensions], vec![0; dimensions]),
        };

        Ok(Some(ConvGeometry {
            channels: [self.in_channels, self.out_channels],
            kernel_size,
            stride,
            padding,
            padding_out: vec![0; dimensions],
            dilation: vec![1; dimensions],
            bias: self.bias,
        }))
    }
}

impl<B: Backend> ResidualUnit<B> {
    /// Applies the forward pass on the input tensor.
    ///
    /// The residual and main paths are computed independently from the same input.
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, in_channels, spatial...]`
    /// - output: `[batch_size, out_channels, spatial_out...]`, where each spatial size is
    ///   divided by the stride, rounding up.
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let residual = match &self.residual {
            Some(conv) => conv.forward(input.clone()),
            None => input.clone(),
        };
        let x = self.conv.iter().fold(input, |x, unit| unit.forward(x));

        x + residual
    }

    /// Number of stacked sub-units.
    pub fn subunits(&self) -> usize {
        self.conv.len()
    }

    /// Whether the residual path is the identity.
    pub fn has_identity_residual(&self) -> bool {
        self.residual.is_none()
    }

    /// Number of spatial dimensions.
    pub fn dimensions(&self) -> usize {
        self.conv[0].dimensions()
    }

    /// Number of input channels.
    pub fn in_channels(&self) -> usize {
        self.conv[0].in_channels()
    }

    /// Number of output channels.
    pub fn out_channels(&self) -> usize {
        self.conv[0].out_channels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::ConvType;
    use crate::TestBackend;

    #[test]
    fn subunit_count_is_at_least_one() {
        let unit = ResidualUnitConfig::new(2, 4, 4)
            .with_subunits(0)
            .init::<TestBackend>(&Default::default());

        assert_eq!(unit.subunits(), 1);
        assert!(unit.has_identity_residual());
    }

    #[test]
    fn dilated_strided_unit_paths_agree() {
        let device = Default::default();
        let unit = ResidualUnitConfig::new(1, 2, 4)
            .with_strides(Spatial::Uniform(2))
            .with_dilation(Spatial::Uniform(3))
            .init::<TestBackend>(&device);

        let output = unit.forward(Tensor::<TestBackend, 3>::ones([1, 2, 11], &device));

        let residual = unit.residual.as_ref().unwrap().geometry();
        assert_eq!(residual.padding, vec![1]);
        assert_eq!(residual.dilation, vec![1]);
        assert_eq!(output.dims(), [1, 4, 6]);
    }

    #[test]
    fn per_axis_strides_project_with_the_kernel() {
        let device = Default::default();
        let unit = ResidualUnitConfig::new(2, 3, 3)
            .with_strides(Spatial::from([1, 2]))
            .init::<TestBackend>(&device);

        let output = unit.forward(Tensor::<TestBackend, 4>::ones([2, 3, 6, 7], &device));

        let residual = unit.residual.as_ref().unwrap();
        assert_eq!(residual.conv_type(), ConvType::Conv2d);
        assert_eq!(residual.geometry().stride, vec![1, 2]);
        assert_eq!(residual.geometry().kernel_size, vec![3, 3]);
        assert_eq!(output.dims(), [2, 3, 6, 4]);
    }

    #[test]
    fn errors_surface_from_the_sub_units() {
        let result = ResidualUnitConfig::new(2, 4, 8)
            .with_act(Some(LayerSpec::from("softsign")))
            .try_init::<TestBackend>(&Default::default());

        assert!(matches!(result, Err(BlockError::Factory(_))));
    }
}
