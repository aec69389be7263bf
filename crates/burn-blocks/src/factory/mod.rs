//! Resolution of symbolic layer names into concrete Burn layers.
//!
//! Every layer category has a *kind* enum listing the registered names (e.g. [`NormKind`]),
//! and a `resolve` step turning a kind and a number of spatial dimensions into the concrete
//! layer type to build (e.g. [`NormType::BatchNorm2d`]). The resolved type then builds the
//! module from the keyword arguments of a [`LayerSpec`].

mod act;
mod conv;
mod dropout;
mod norm;
mod spec;

pub use act::*;
pub use conv::*;
pub use dropout::*;
pub use norm::*;
pub use spec::*;

use crate::FactoryError;

/// A category of layers addressable by name.
pub trait LayerKind: Copy + PartialEq + core::fmt::Debug + 'static {
    /// Human readable category, used in error messages.
    const CATEGORY: &'static str;

    /// Registered names, lowercase without separators. The first name of each kind is its
    /// canonical name.
    const REGISTRY: &'static [(&'static str, Self)];

    /// Find the kind registered under `name`.
    ///
    /// Matching ignores case as well as `_`, `-` and spaces, so `"LeakyReLU"` and
    /// `"leaky_relu"` both resolve to the same kind.
    fn lookup(name: &str) -> Result<Self, FactoryError> {
        let key = normalize(name);

        Self::REGISTRY
            .iter()
            .find(|(registered, _)| *registered == key)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| FactoryError::UnknownName {
                category: Self::CATEGORY,
                name: name.to_string(),
                available: Self::names().join(", "),
            })
    }

    /// Canonical name of the kind.
    fn name(self) -> &'static str {
        Self::REGISTRY
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(name, _)| *name)
            .unwrap_or(Self::CATEGORY)
    }

    /// Canonical names of every kind of the category.
    fn names() -> Vec<&'static str> {
        let mut names = Vec::new();

        for (name, kind) in Self::REGISTRY {
            if kind.name() == *name {
                names.push(*name);
            }
        }

        names
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Validate the number of spatial dimensions for a layer category.
pub(crate) fn check_dimensions(
    category: &'static str,
    dimensions: usize,
) -> Result<(), FactoryError> {
    match dimensions {
        1..=3 => Ok(()),
        _ => Err(FactoryError::UnsupportedDimensions {
            category,
            dimensions,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_separators() {
        assert_eq!(ActKind::lookup("LeakyReLU"), Ok(ActKind::LeakyRelu));
        assert_eq!(ActKind::lookup("leaky_relu"), Ok(ActKind::LeakyRelu));
        assert_eq!(NormKind::lookup("INSTANCE"), Ok(NormKind::Instance));
        assert_eq!(ConvKind::lookup("conv-trans"), Ok(ConvKind::ConvTrans));
    }

    #[test]
    fn aliases_resolve_to_the_same_kind() {
        assert_eq!(ActKind::lookup("silu"), Ok(ActKind::Swish));
        assert_eq!(ActKind::Swish.name(), "swish");
    }

    #[test]
    fn unknown_name_lists_registered_names() {
        let error = NormKind::lookup("spectral").unwrap_err();

        assert_eq!(
            error,
            FactoryError::UnknownName {
                category: "normalization",
                name: "spectral".to_string(),
                available: "instance, batch, group".to_string(),
            }
        );
    }

    #[test]
    fn names_skip_aliases() {
        assert!(!ActKind::names().contains(&"silu"));
        assert!(ActKind::names().contains(&"swish"));
    }
}
