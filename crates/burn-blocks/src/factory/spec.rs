use burn::config::Config;
use serde_json::Value;

use super::{DropoutKind, LayerKind};
use crate::FactoryError;

/// Keyword arguments of a layer constructor.
pub type LayerArgs = serde_json::Map<String, Value>;

/// Deferred description of a layer: a registered name and the keyword arguments to build it
/// with.
///
/// # Example
///
/// ```rust
/// use burn_blocks::factory::LayerSpec;
///
/// let act = LayerSpec::from("leakyrelu").with_arg("negative_slope", 0.2);
/// let norm = LayerSpec::from("batch");
/// ```
#[derive(Config, Debug, PartialEq)]
pub struct LayerSpec {
    /// Registered name of the layer.
    pub name: String,
    /// Keyword arguments forwarded to the layer constructor.
    #[config(default = "LayerArgs::new()")]
    pub args: LayerArgs,
}

impl LayerSpec {
    /// Set a single keyword argument.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

impl From<&str> for LayerSpec {
    fn from(name: &str) -> Self {
        Self::new(name.to_string())
    }
}

impl From<String> for LayerSpec {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Split a layer description into the kind it names and its keyword arguments.
///
/// # Errors
///
/// [`FactoryError::UnknownName`] when the name isn't registered for the category `K`.
pub fn split_args<K: LayerKind>(spec: &LayerSpec) -> Result<(K, &LayerArgs), FactoryError> {
    Ok((K::lookup(&spec.name)?, &spec.args))
}

/// Dropout argument of a block: either a bare ratio or a full layer description.
#[derive(Config, Debug, PartialEq)]
pub enum DropoutSpec {
    /// The default dropout layer with `p` set to the ratio.
    Ratio(f64),
    /// A named dropout layer with its arguments.
    Named(LayerSpec),
}

impl DropoutSpec {
    /// Normalize the description into a dropout kind and its keyword arguments.
    ///
    /// A ratio of zero means no dropout layer at all, and returns `None`.
    pub fn split(&self) -> Result<Option<(DropoutKind, LayerArgs)>, FactoryError> {
        match self {
            Self::Ratio(ratio) if *ratio == 0.0 => Ok(None),
            Self::Ratio(ratio) => {
                let mut args = LayerArgs::new();
                args.insert("p".to_string(), Value::from(*ratio));
                Ok(Some((DropoutKind::Dropout, args)))
            }
            Self::Named(spec) => {
                let (kind, args) = split_args::<DropoutKind>(spec)?;
                Ok(Some((kind, args.clone())))
            }
        }
    }
}

impl From<f64> for DropoutSpec {
    fn from(ratio: f64) -> Self {
        Self::Ratio(ratio)
    }
}

impl From<LayerSpec> for DropoutSpec {
    fn from(spec: LayerSpec) -> Self {
        Self::Named(spec)
    }
}

/// Typed access to the keyword arguments of one layer.
pub(crate) struct ArgReader<'a> {
    layer: &'static str,
    args: &'a LayerArgs,
}

impl<'a> ArgReader<'a> {
    /// Check that only `accepted` keys are present.
    pub(crate) fn new(
        layer: &'static str,
        args: &'a LayerArgs,
        accepted: &[&str],
    ) -> Result<Self, FactoryError> {
        if let Some(key) = args.keys().find(|key| !accepted.contains(&key.as_str())) {
            return Err(FactoryError::UnexpectedArgument {
                layer,
                key: key.clone(),
            });
        }

        Ok(Self { layer, args })
    }

    pub(crate) fn f64(&self, key: &'static str, default: f64) -> Result<f64, FactoryError> {
        match self.args.get(key) {
            None => Ok(default),
            Some(value) => value.as_f64().ok_or_else(|| self.invalid(key, "a number")),
        }
    }

    pub(crate) fn bool(&self, key: &'static str, default: bool) -> Result<bool, FactoryError> {
        match self.args.get(key) {
            None => Ok(default),
            Some(value) => value.as_bool().ok_or_else(|| self.invalid(key, "a boolean")),
        }
    }

    pub(crate) fn usize(
        &self,
        key: &'static str,
        default: Option<usize>,
    ) -> Result<usize, FactoryError> {
        match (self.args.get(key), default) {
            (None, Some(default)) => Ok(default),
            (None, None) => Err(FactoryError::MissingArgument {
                layer: self.layer,
                key,
            }),
            (Some(value), _) => value
                .as_u64()
                .filter(|value| *value > 0)
                .map(|value| value as usize)
                .ok_or_else(|| self.invalid(key, "a positive integer")),
        }
    }

    pub(crate) fn invalid(&self, key: &'static str, expected: &'static str) -> FactoryError {
        FactoryError::InvalidArgument {
            layer: self.layer,
            key,
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::NormKind;

    #[test]
    fn split_resolves_the_name() {
        let spec = LayerSpec::from("Batch").with_arg("momentum", 0.2);
        let (kind, args) = split_args::<NormKind>(&spec).unwrap();

        assert_eq!(kind, NormKind::Batch);
        assert_eq!(args.get("momentum"), Some(&Value::from(0.2)));
    }

    #[test]
    fn split_fails_on_unknown_name() {
        let spec = LayerSpec::from("layer");

        assert!(matches!(
            split_args::<NormKind>(&spec),
            Err(FactoryError::UnknownName { .. })
        ));
    }

    #[test]
    fn ratio_is_shorthand_for_default_dropout() {
        let shorthand = DropoutSpec::from(0.3).split().unwrap();
        let explicit = DropoutSpec::from(LayerSpec::from("dropout").with_arg("p", 0.3))
            .split()
            .unwrap();

        assert_eq!(shorthand, explicit);
        assert_eq!(
            shorthand.map(|(kind, args)| (kind, args.get("p").and_then(Value::as_f64))),
            Some((DropoutKind::Dropout, Some(0.3)))
        );
    }

    #[test]
    fn zero_ratio_means_no_dropout() {
        assert_eq!(DropoutSpec::Ratio(0.0).split(), Ok(None));
    }

    #[test]
    fn reader_rejects_unexpected_keys() {
        let spec = LayerSpec::from("instance").with_arg("momentum", 0.1);

        assert_eq!(
            ArgReader::new("instance", &spec.args, &["eps", "affine"]).err(),
            Some(FactoryError::UnexpectedArgument {
                layer: "instance",
                key: "momentum".to_string(),
            })
        );
    }

    #[test]
    fn reader_checks_value_types() {
        let spec = LayerSpec::from("group")
            .with_arg("num_groups", 0)
            .with_arg("affine", "yes");
        let reader = ArgReader::new("group", &spec.args, &["num_groups", "affine"]).unwrap();

        assert!(reader.usize("num_groups", None).is_err());
        assert!(reader.bool("affine", true).is_err());
        assert_eq!(reader.f64("eps", 1e-5), Ok(1e-5));
    }

    #[test]
    fn spec_survives_config_serialization() {
        let spec = LayerSpec::from("prelu").with_arg("init", 0.1);
        let json = spec.to_string();

        assert_eq!(LayerSpec::load_binary(json.as_bytes()).unwrap(), spec);
    }
}
