use regex::Regex;

use crate::core::error::{MimError, MimResult};
use crate::core::model::PluginAsset;

/// Regular expressions restricting which asset files are wanted.
///
/// Each pattern is searched for anywhere in the filename. An empty filter
/// accepts every asset.
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    patterns: Vec<Regex>,
}

impl AssetFilter {
    pub fn new<I, S>(patterns: I) -> MimResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).map_err(|e| {
                    MimError::Validation(format!("Invalid asset regex '{}': {}", pattern, e))
                })
            })
            .collect::<MimResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether any pattern matches `filename`.
    pub fn accepts(&self, filename: &str) -> bool {
        self.is_empty() || self.patterns.iter().any(|p| p.is_match(filename))
    }

    /// Whether every pattern matches at least one of `assets`.
    pub fn matches_all(&self, assets: &[PluginAsset]) -> bool {
        self.patterns
            .iter()
            .all(|p| assets.iter().any(|asset| p.is_match(&asset.filename)))
    }

    /// The assets matched by at least one pattern, in their original order.
    pub fn select<'a>(&self, assets: &'a [PluginAsset]) -> Vec<&'a PluginAsset> {
        assets
            .iter()
            .filter(|asset| self.accepts(&asset.filename))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::model::{PluginIdentity, PluginVersion};
    use crate::core::registry::RegistryInfo;

    fn assets(filenames: &[&str]) -> Vec<PluginAsset> {
        let version = PluginVersion::new(
            Arc::new(PluginIdentity::new(Some("Foo".into()), None)),
            "1.0.0",
            &RegistryInfo::new("Test", "", "", ""),
            None,
            serde_json::Value::Null,
        );
        filenames
            .iter()
            .map(|name| PluginAsset::new(*name, &version, serde_json::Value::Null))
            .collect()
    }

    #[test]
    fn single_pattern_selects_only_matching_assets() {
        let available = assets(&["Foo.jar", "Bar.jar"]);
        let filter = AssetFilter::new(["Foo.*"]).unwrap();

        assert!(filter.matches_all(&available));
        let chosen: Vec<&str> = filter
            .select(&available)
            .iter()
            .map(|a| a.filename.as_str())
            .collect();
        assert_eq!(chosen, vec!["Foo.jar"]);
    }

    #[test]
    fn every_pattern_must_find_an_asset() {
        let available = assets(&["Foo.jar", "Bar.jar"]);
        let filter = AssetFilter::new(["Foo.*", "Baz.*"]).unwrap();
        assert!(!filter.matches_all(&available));
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let available = assets(&["Foo.jar", "Bar.jar"]);
        let filter = AssetFilter::default();

        assert!(filter.matches_all(&available));
        assert_eq!(filter.select(&available).len(), 2);
    }

    #[test]
    fn invalid_regex_is_a_validation_error() {
        let err = AssetFilter::new(["Foo(["]).unwrap_err();
        assert!(matches!(err, MimError::Validation(_)));
    }
}
