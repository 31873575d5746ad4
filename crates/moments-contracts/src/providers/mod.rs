use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ProviderKind {
    #[default]
    Gemini,
    Zhipu,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Gemini, ProviderKind::Zhipu];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Zhipu => "zhipu",
        }
    }

    /// Human-facing label for the switcher.
    pub fn label(self) -> &'static str {
        match self {
            Self::Gemini => "Google Gemini",
            Self::Zhipu => "智谱 AI (GLM)",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "zhipu" | "glm" | "bigmodel" => Ok(Self::Zhipu),
            other => Err(format!(
                "Unknown provider '{other}'. Expected one of: gemini, zhipu."
            )),
        }
    }
}

/// The single routing choice read before every dispatch. Changing it only
/// affects the next action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderSelector {
    active: ProviderKind,
}

impl ProviderSelector {
    pub fn new(active: ProviderKind) -> Self {
        Self { active }
    }

    pub fn active(&self) -> ProviderKind {
        self.active
    }

    /// Returns true when the selection actually changed.
    pub fn select(&mut self, kind: ProviderKind) -> bool {
        let changed = self.active != kind;
        self.active = kind;
        changed
    }
}

pub trait NamedProvider {
    fn kind(&self) -> ProviderKind;
}

impl<T: NamedProvider + ?Sized> NamedProvider for Box<T> {
    fn kind(&self) -> ProviderKind {
        (**self).kind()
    }
}

#[derive(Debug, Clone)]
pub struct ProviderRegistry<T: NamedProvider> {
    providers: Vec<T>,
}

impl<T: NamedProvider> Default for ProviderRegistry<T> {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
        }
    }
}

impl<T: NamedProvider> ProviderRegistry<T> {
    pub fn new(providers: Vec<T>) -> Self {
        Self { providers }
    }

    /// Registers a provider, replacing any earlier one of the same kind.
    pub fn register(&mut self, provider: T) {
        let kind = provider.kind();
        self.providers.retain(|existing| existing.kind() != kind);
        self.providers.push(provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&T> {
        self.providers
            .iter()
            .find(|provider| provider.kind() == kind)
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        let mut kinds = self
            .providers
            .iter()
            .map(NamedProvider::kind)
            .collect::<Vec<ProviderKind>>();
        kinds.sort();
        kinds
    }

    pub fn providers(&self) -> &[T] {
        self.providers.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::{NamedProvider, ProviderKind, ProviderRegistry, ProviderSelector};

    #[derive(Clone, Debug)]
    struct DummyProvider {
        kind: ProviderKind,
        tag: &'static str,
    }

    impl NamedProvider for DummyProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }
    }

    #[test]
    fn provider_kind_parses_aliases() {
        assert_eq!("Gemini".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert_eq!(" glm ".parse::<ProviderKind>(), Ok(ProviderKind::Zhipu));
        assert_eq!(
            "openai".parse::<ProviderKind>().err().unwrap_or_default(),
            "Unknown provider 'openai'. Expected one of: gemini, zhipu."
        );
        assert_eq!(ProviderKind::Zhipu.to_string(), "zhipu");
    }

    #[test]
    fn selector_defaults_to_gemini_and_reports_changes() {
        let mut selector = ProviderSelector::default();
        assert_eq!(selector.active(), ProviderKind::Gemini);
        assert!(selector.select(ProviderKind::Zhipu));
        assert!(!selector.select(ProviderKind::Zhipu));
        assert_eq!(selector.active(), ProviderKind::Zhipu);
    }

    #[test]
    fn registry_replaces_same_kind_and_lists_sorted() {
        let mut registry = ProviderRegistry::default();
        registry.register(DummyProvider {
            kind: ProviderKind::Zhipu,
            tag: "first",
        });
        registry.register(DummyProvider {
            kind: ProviderKind::Gemini,
            tag: "gemini",
        });
        registry.register(DummyProvider {
            kind: ProviderKind::Zhipu,
            tag: "second",
        });

        assert_eq!(registry.kinds(), vec![ProviderKind::Gemini, ProviderKind::Zhipu]);
        assert_eq!(registry.providers().len(), 2);
        assert_eq!(
            registry.get(ProviderKind::Zhipu).map(|provider| provider.tag),
            Some("second")
        );
    }

    #[test]
    fn boxed_providers_keep_their_kind() {
        let boxed: Box<DummyProvider> = Box::new(DummyProvider {
            kind: ProviderKind::Gemini,
            tag: "boxed",
        });
        let registry = ProviderRegistry::new(vec![boxed]);
        assert!(registry.get(ProviderKind::Gemini).is_some());
        assert!(registry.get(ProviderKind::Zhipu).is_none());
    }
}
