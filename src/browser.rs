//! Browser automation seam
//!
//! The primitives mirror what the installer tests need: clicks, visibility
//! and presence waits, iframe switching and checkbox toggling. Every wait
//! blocks until the condition holds or the implementation's own timeout
//! elapses, in which case it returns `NetcheckError::Timeout`.

use crate::error::NetcheckResult;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Browser: Send + Sync {
    /// Click the element matching `selector`
    async fn click(&self, selector: &str) -> NetcheckResult<()>;

    /// Wait until an element matching `selector` exists in the DOM
    async fn wait_present(&self, selector: &str) -> NetcheckResult<()>;

    /// Wait until an element matching `selector` is displayed
    async fn wait_visible(&self, selector: &str) -> NetcheckResult<()>;

    /// Wait until no element matches `selector`
    async fn wait_not_present(&self, selector: &str) -> NetcheckResult<()>;

    /// Enter the iframe named `name`
    async fn switch_to_frame(&self, name: &str) -> NetcheckResult<()>;

    /// Return to the top-level document
    async fn switch_to_top(&self) -> NetcheckResult<()>;

    /// Bring the checkbox matching `selector` to `checked`
    async fn set_checked(&self, selector: &str, checked: bool) -> NetcheckResult<()>;
}

#[async_trait]
impl<B: Browser + ?Sized> Browser for &B {
    async fn click(&self, selector: &str) -> NetcheckResult<()> {
        (**self).click(selector).await
    }

    async fn wait_present(&self, selector: &str) -> NetcheckResult<()> {
        (**self).wait_present(selector).await
    }

    async fn wait_visible(&self, selector: &str) -> NetcheckResult<()> {
        (**self).wait_visible(selector).await
    }

    async fn wait_not_present(&self, selector: &str) -> NetcheckResult<()> {
        (**self).wait_not_present(selector).await
    }

    async fn switch_to_frame(&self, name: &str) -> NetcheckResult<()> {
        (**self).switch_to_frame(name).await
    }

    async fn switch_to_top(&self) -> NetcheckResult<()> {
        (**self).switch_to_top().await
    }

    async fn set_checked(&self, selector: &str, checked: bool) -> NetcheckResult<()> {
        (**self).set_checked(selector, checked).await
    }
}

/// A selector split into a CSS part and an optional text filter.
///
/// `"#modal button:contains('Close')"` becomes css `#modal`, and a
/// `button` descendant whose text contains `Close`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub css: String,
    pub text_filter: Option<TextFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFilter {
    pub tag: String,
    pub text: String,
}

impl TextFilter {
    /// XPath relative to the element found with the CSS part
    pub fn xpath(&self) -> String {
        format!(".//{}[contains(normalize-space(.), {})]", self.tag, xpath_literal(&self.text))
    }
}

impl Locator {
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim();
        let Some((head, rest)) = selector.split_once(":contains(") else {
            return Self { css: selector.to_string(), text_filter: None };
        };

        let text = rest
            .trim_end()
            .trim_end_matches(')')
            .trim_matches(|c| c == '\'' || c == '"')
            .to_string();

        let (scope, tag) = match head.rsplit_once(' ') {
            Some((scope, tag)) => (scope.trim().to_string(), tag.to_string()),
            None => (":root".to_string(), head.to_string()),
        };
        let tag = if tag.is_empty() { "*".to_string() } else { tag };

        Self {
            css: scope,
            text_filter: Some(TextFilter { tag, text }),
        }
    }
}

fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{}'", text)
    } else if !text.contains('"') {
        format!("\"{}\"", text)
    } else {
        let parts: Vec<String> = text.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
