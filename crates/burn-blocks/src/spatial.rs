use burn::config::Config;

/// Integer argument of a spatial operation (stride, kernel size, dilation), given
/// either once for all axes or once per axis.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum Spatial {
    /// The same value on every spatial axis.
    Uniform(usize),
    /// One value per spatial axis.
    PerAxis(Vec<usize>),
}

impl Spatial {
    /// Returns one value per axis, or `None` when a per-axis argument doesn't have exactly
    /// `dimensions` entries.
    pub fn expand(&self, dimensions: usize) -> Option<Vec<usize>> {
        match self {
            Self::Uniform(value) => Some(vec![*value; dimensions]),
            Self::PerAxis(values) if values.len() == dimensions => Some(values.clone()),
            Self::PerAxis(_) => None,
        }
    }

    /// Number of values given.
    pub fn len(&self) -> usize {
        match self {
            Self::Uniform(_) => 1,
            Self::PerAxis(values) => values.len(),
        }
    }

    /// Whether no value is given at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Product of the given values.
    ///
    /// For strides this is the net downsampling factor: `1` means every axis keeps its size.
    pub fn product(&self) -> usize {
        match self {
            Self::Uniform(value) => *value,
            Self::PerAxis(values) => values.iter().product(),
        }
    }
}

impl From<usize> for Spatial {
    fn from(value: usize) -> Self {
        Self::Uniform(value)
    }
}

impl<const N: usize> From<[usize; N]> for Spatial {
    fn from(values: [usize; N]) -> Self {
        Self::PerAxis(values.to_vec())
    }
}

impl From<Vec<usize>> for Spatial {
    fn from(values: Vec<usize>) -> Self {
        Self::PerAxis(values)
    }
}
