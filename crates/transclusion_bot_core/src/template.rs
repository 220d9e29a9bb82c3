use std::fmt;

use crate::error::{BotError, BotResult};

const FORBIDDEN_TITLE_CHARS: &[char] = &['{', '}', '[', ']', '|', '<', '>', '#'];

/// Unqualified template name, e.g. `Clean` for `Template:Clean`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateName(String);

impl TemplateName {
    pub fn parse(value: &str) -> BotResult<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(BotError::Config(
                "template name must not be empty".to_string(),
            ));
        }
        if let Some(ch) = trimmed.chars().find(|ch| FORBIDDEN_TITLE_CHARS.contains(ch)) {
            return Err(BotError::Config(format!(
                "template name contains `{ch}`, which cannot appear in a page title: {trimmed}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full title of the template page, used as the `embeddedin` target.
    pub fn page_title(&self) -> String {
        format!("Template:{}", self.0)
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
