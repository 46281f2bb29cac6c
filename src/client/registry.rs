use std::sync::Arc;

use crate::drivers::{ProviderDriver, ProviderKind};

/// One slot per [`ProviderKind`]; lookups are exhaustive matches.
#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    openai: Option<Arc<dyn ProviderDriver>>,
    claude: Option<Arc<dyn ProviderDriver>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, kind: ProviderKind) -> &mut Option<Arc<dyn ProviderDriver>> {
        match kind {
            ProviderKind::OpenAi => &mut self.openai,
            ProviderKind::Claude => &mut self.claude,
        }
    }

    /// Register `driver` under `kind`, returning the adapter it replaced.
    pub fn insert(
        &mut self,
        kind: ProviderKind,
        driver: Arc<dyn ProviderDriver>,
    ) -> Option<Arc<dyn ProviderDriver>> {
        self.slot_mut(kind).replace(driver)
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&Arc<dyn ProviderDriver>> {
        match kind {
            ProviderKind::OpenAi => self.openai.as_ref(),
            ProviderKind::Claude => self.claude.as_ref(),
        }
    }

    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.get(kind).is_some()
    }

    /// Registered kinds in declaration order.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.contains(*k))
            .collect()
    }

    pub fn drivers(&self) -> impl Iterator<Item = &Arc<dyn ProviderDriver>> {
        self.openai.iter().chain(self.claude.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.openai.is_none() && self.claude.is_none()
    }
}
