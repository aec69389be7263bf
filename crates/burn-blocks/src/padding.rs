use crate::{PaddingError, Spatial};

/// Calculate the symmetric padding preserving the spatial size of a stride-1 convolution.
///
/// Returns `(kernel_size - 1) / 2 * dilation` for each of the `dimensions` axes. A scalar
/// argument is applied to every axis.
///
/// # Errors
///
/// * [`PaddingError::EvenKernel`] when any kernel size is even, since the padding would have
///   to be asymmetric.
/// * [`PaddingError::NonPositive`] when any kernel size or dilation is zero.
/// * [`PaddingError::AxisCount`] when a per-axis argument doesn't match `dimensions`.
pub fn same_padding(
    kernel_size: &Spatial,
    dilation: &Spatial,
    dimensions: usize,
) -> Result<Vec<usize>, PaddingError> {
    let kernel_size = per_axis("kernel_size", kernel_size, dimensions)?;
    let dilation = per_axis("dilation", dilation, dimensions)?;

    if kernel_size.iter().any(|k| k % 2 == 0) {
        return Err(PaddingError::EvenKernel {
            kernel_size,
            dilation,
        });
    }

    let padding = kernel_size
        .iter()
        .zip(dilation.iter())
        .map(|(kernel_size, dilation)| (kernel_size - 1) / 2 * dilation)
        .collect::<Vec<_>>();

    log::trace!(
        "Same padding {padding:?} for kernel_size={kernel_size:?} and dilation={dilation:?}"
    );

    Ok(padding)
}

/// Output padding of a transposed convolution, `stride - 1` on each axis.
///
/// With "same" padding, this makes a transposed convolution produce exactly
/// `input_size * stride` elements per axis, the inverse of the strided convolution.
pub fn stride_minus_one(strides: &[usize]) -> Vec<usize> {
    strides
        .iter()
        .map(|stride| stride.saturating_sub(1))
        .collect()
}

fn per_axis(
    argument: &'static str,
    values: &Spatial,
    dimensions: usize,
) -> Result<Vec<usize>, PaddingError> {
    let values = values
        .expand(dimensions)
        .ok_or_else(|| PaddingError::AxisCount {
            argument,
            expected: dimensions,
            actual: values.len(),
        })?;

    if values.contains(&0) {
        return Err(PaddingError::NonPositive { argument, values });
    }

    Ok(values)
}
