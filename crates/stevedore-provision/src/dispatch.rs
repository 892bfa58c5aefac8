//! Scheme-to-provider resolution.
//!
//! Dispatch is permissive: every provider whose declared scheme set matches
//! is collected and later invoked in turn, and an identifier that fails URI
//! parsing is a local path, never an error.

use std::sync::Arc;

use stevedore_provider::TransferProvider;
use url::Url;

/// Scheme of `identifier` when it parses as a URI with one.
///
/// Bare and malformed identifiers return `None` and are treated as local
/// filesystem paths.
#[must_use]
pub fn scheme_of(identifier: &str) -> Option<String> {
    Url::parse(identifier)
        .ok()
        .map(|url| url.scheme().to_string())
}

/// Ordered set of providers registered for one provisioning session.
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: Vec<Arc<dyn TransferProvider>>,
}

impl ProviderSet {
    /// Wrap an externally discovered provider list; order is preserved and
    /// determines group order during upload flushes.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn TransferProvider>>) -> Self {
        Self { providers }
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the session has no providers at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Every provider claiming the scheme of `identifier`, in registration
    /// order; empty when the identifier is local or no provider matches.
    #[must_use]
    pub fn resolve(&self, identifier: &str) -> Vec<Arc<dyn TransferProvider>> {
        self.resolve_indices(identifier)
            .into_iter()
            .map(|index| Arc::clone(&self.providers[index]))
            .collect()
    }

    pub(crate) fn resolve_indices(&self, identifier: &str) -> Vec<usize> {
        let Some(scheme) = scheme_of(identifier) else {
            return Vec::new();
        };
        let lower = scheme.to_lowercase();
        let upper = scheme.to_uppercase();
        self.providers
            .iter()
            .enumerate()
            .filter(|(_, provider)| {
                let schemes = provider.schemes_handled();
                schemes.contains(&lower) || schemes.contains(&upper)
            })
            .map(|(index, _)| index)
            .collect()
    }

    pub(crate) fn get(&self, index: usize) -> Arc<dyn TransferProvider> {
        Arc::clone(&self.providers[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stevedore_test_support::mocks::ScriptedProvider;

    fn set_of(providers: Vec<ScriptedProvider>) -> ProviderSet {
        ProviderSet::new(
            providers
                .into_iter()
                .map(|provider| Arc::new(provider) as Arc<dyn TransferProvider>)
                .collect(),
        )
    }

    #[test]
    fn bare_and_malformed_identifiers_are_local() {
        assert_eq!(scheme_of("/tmp/in.txt"), None);
        assert_eq!(scheme_of("work/in.txt"), None);
        assert_eq!(scheme_of("not a uri"), None);
        assert_eq!(scheme_of("mem://bucket/key"), Some("mem".to_string()));
    }

    #[test]
    fn scheme_matching_is_case_insensitive_both_ways() {
        let set = set_of(vec![ScriptedProvider::new(["MEM"])]);
        assert_eq!(set.resolve("mem://bucket/key").len(), 1);
        assert_eq!(set.resolve("MEM://bucket/key").len(), 1);

        let set = set_of(vec![ScriptedProvider::new(["s3"])]);
        assert_eq!(set.resolve("S3://bucket/key").len(), 1);
    }

    #[test]
    fn all_matching_providers_are_collected_in_order() {
        let set = set_of(vec![
            ScriptedProvider::new(["mem"]),
            ScriptedProvider::new(["web"]),
            ScriptedProvider::new(["mem", "web"]),
        ]);
        assert_eq!(set.resolve_indices("mem://bucket/key"), vec![0, 2]);
        assert_eq!(set.resolve_indices("web://host/key"), vec![1, 2]);
    }

    #[test]
    fn unclaimed_schemes_resolve_to_nothing() {
        let set = set_of(vec![ScriptedProvider::new(["mem"])]);
        assert!(set.resolve("ftp://host/key").is_empty());
        assert!(set.resolve("/tmp/in.txt").is_empty());
        assert!(!set.is_empty());
        assert_eq!(set.len(), 1);
    }
}
