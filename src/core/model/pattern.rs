use regex::Regex;

use crate::core::error::{MimError, MimResult};

/// A Minecraft version selector such as `1.21.1`, `1.20.x` or `1.x.x`.
///
/// Every `x` segment matches an optional numeric component, so `1.20.x`
/// accepts both `1.20` and `1.20.4`.
#[derive(Debug, Clone)]
pub struct VersionPattern {
    selector: String,
    regex: Regex,
}

impl VersionPattern {
    pub fn parse(selector: &str) -> MimResult<Self> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(MimError::Validation(
                "Minecraft version selector must not be empty".into(),
            ));
        }

        let mut pattern = String::from("^");
        for (index, segment) in selector.split('.').enumerate() {
            let wildcard = segment.eq_ignore_ascii_case("x");
            match (index, wildcard) {
                (0, true) => pattern.push_str(r"\d+"),
                (0, false) => pattern.push_str(&regex::escape(segment)),
                (_, true) => pattern.push_str(r"(?:\.\d+)?"),
                (_, false) => {
                    pattern.push_str(r"\.");
                    pattern.push_str(&regex::escape(segment));
                }
            }
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| {
            MimError::Validation(format!("Invalid version selector '{}': {}", selector, e))
        })?;

        Ok(Self {
            selector: selector.to_string(),
            regex,
        })
    }

    pub fn matches(&self, minecraft_version: &str) -> bool {
        self.regex.is_match(minecraft_version)
    }

    pub fn as_str(&self) -> &str {
        &self.selector
    }
}
