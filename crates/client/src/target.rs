//! Target page URL resolution.

use linkmirror_core::Error;
use url::Url;

/// URL template with a `{id}` placeholder.
///
/// The template shape is a startup-time concern; construction fails
/// on a template without the placeholder so requests never have to.
#[derive(Debug, Clone)]
pub struct TargetTemplate {
    template: String,
}

impl TargetTemplate {
    /// Build a template, verifying the `{id}` placeholder is present.
    pub fn new(template: impl Into<String>) -> Result<Self, Error> {
        let template = template.into();
        if !template.contains("{id}") {
            return Err(Error::InvalidInput(format!(
                "url template must contain the {{id}} placeholder: {template}"
            )));
        }
        Ok(Self { template })
    }

    /// Substitute the identifier into the template.
    ///
    /// The identifier is caller-supplied and trusted to be
    /// interpolation-safe; no shape validation happens here.
    pub fn resolve(&self, id: &str) -> Result<Url, Error> {
        let target = self.template.replace("{id}", id);
        Url::parse(&target).map_err(|e| Error::InvalidInput(format!("resolved target is not a valid URL: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_substitutes_id() {
        let template = TargetTemplate::new("https://example.test/item/{id}").unwrap();
        let target = template.resolve("12345").unwrap();
        assert_eq!(target.as_str(), "https://example.test/item/12345");
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let result = TargetTemplate::new("https://example.test/item");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_resolve_rejects_unparseable_result() {
        let template = TargetTemplate::new("not a url {id}").unwrap();
        assert!(matches!(template.resolve("12345"), Err(Error::InvalidInput(_))));
    }
}
