use thiserror::Error;

/// Error raised by the [padding calculator](crate::padding).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaddingError {
    /// "Same" padding only exists for odd kernel sizes.
    #[error("Same padding not available for kernel_size={kernel_size:?} and dilation={dilation:?}")]
    EvenKernel {
        /// Kernel size per axis.
        kernel_size: Vec<usize>,
        /// Dilation per axis.
        dilation: Vec<usize>,
    },
    /// Kernel sizes and dilations must be positive.
    #[error("`{argument}` must be positive on every axis, got {values:?}")]
    NonPositive {
        /// Name of the offending argument.
        argument: &'static str,
        /// Values per axis.
        values: Vec<usize>,
    },
    /// A per-axis argument does not have one entry per spatial dimension.
    #[error("`{argument}` has {actual} values but {expected} spatial dimensions are used")]
    AxisCount {
        /// Name of the offending argument.
        argument: &'static str,
        /// Number of spatial dimensions.
        expected: usize,
        /// Number of values given.
        actual: usize,
    },
}

/// Error raised when a symbolic layer description can't be resolved or constructed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FactoryError {
    /// No layer with that name is registered.
    #[error("Unknown {category} layer `{name}`, expected one of: {available}")]
    UnknownName {
        /// Layer category, e.g. `normalization`.
        category: &'static str,
        /// The requested name.
        name: String,
        /// Registered names of the category.
        available: String,
    },
    /// Only 1, 2 and 3 spatial dimensions are supported.
    #[error("{category} layers support 1, 2 or 3 spatial dimensions, got {dimensions}")]
    UnsupportedDimensions {
        /// Layer category, e.g. `convolution`.
        category: &'static str,
        /// The requested number of spatial dimensions.
        dimensions: usize,
    },
    /// The layer doesn't accept this keyword argument.
    #[error("`{layer}` got an unexpected argument `{key}`")]
    UnexpectedArgument {
        /// Layer name.
        layer: &'static str,
        /// The unexpected key.
        key: String,
    },
    /// The layer requires this keyword argument.
    #[error("`{layer}` requires the argument `{key}`")]
    MissingArgument {
        /// Layer name.
        layer: &'static str,
        /// The missing key.
        key: &'static str,
    },
    /// The keyword argument has an invalid value.
    #[error("Argument `{key}` of `{layer}` must be {expected}")]
    InvalidArgument {
        /// Layer name.
        layer: &'static str,
        /// The offending key.
        key: &'static str,
        /// Description of the accepted values.
        expected: &'static str,
    },
}

/// Error raised when building a [convolution](crate::Convolution) or a
/// [residual unit](crate::ResidualUnit).
///
/// Errors of the padding calculator and of the layer factory are forwarded unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    /// Padding could not be computed.
    #[error(transparent)]
    Padding(#[from] PaddingError),
    /// A layer could not be resolved or constructed.
    #[error(transparent)]
    Factory(#[from] FactoryError),
    /// Channel counts must be positive.
    #[error("Channel counts must be positive, got {in_channels} -> {out_channels}")]
    InvalidChannels {
        /// Number of input channels.
        in_channels: usize,
        /// Number of output channels.
        out_channels: usize,
    },
    /// Strides must be positive.
    #[error("Strides must be positive on every axis, got {strides:?}")]
    InvalidStrides {
        /// Strides per axis.
        strides: Vec<usize>,
    },
    /// A per-axis argument does not have one entry per spatial dimension.
    #[error("`{argument}` has {actual} values but {expected} spatial dimensions are used")]
    AxisCount {
        /// Name of the offending argument.
        argument: &'static str,
        /// Number of spatial dimensions.
        expected: usize,
        /// Number of values given.
        actual: usize,
    },
}
