//! Model dispatch table.
//!
//! The viewer selects a model by its display name. Names map onto a closed
//! set of [`ModelId`]s, and the table must hold an adapter for every one of
//! them before the runner starts serving.

use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters::LlmAdapter;
use crate::error::{Error, Result};

/// Multimodal models the runner can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelId {
    /// Google MedGemma, image plus vital signs.
    MedGemma,
    /// NVIDIA Clara NV-Reason-CXR-3B, chest X-ray only.
    ClaraNvReasonCxr3b,
}

impl ModelId {
    /// All dispatchable models.
    pub const ALL: [ModelId; 2] = [ModelId::MedGemma, ModelId::ClaraNvReasonCxr3b];

    /// Name shown in (and sent by) the viewer.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MedGemma => "MedGemma",
            Self::ClaraNvReasonCxr3b => "Clara NV-Reason-CXR-3B",
        }
    }

    /// Parse a display name. Exact and case-sensitive.
    pub fn from_display_name(name: &str) -> Option<Self> {
        match name {
            "MedGemma" => Some(Self::MedGemma),
            "Clara NV-Reason-CXR-3B" => Some(Self::ClaraNvReasonCxr3b),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Problems building the table at startup.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("No adapter registered for model {0}")]
    MissingAdapter(ModelId),

    #[error("More than one adapter registered for model {0}")]
    DuplicateAdapter(ModelId),
}

/// Immutable mapping from model to adapter.
pub struct DispatchTable {
    adapters: HashMap<ModelId, Arc<dyn LlmAdapter>>,
}

impl DispatchTable {
    /// Build the table, requiring exactly one adapter per [`ModelId`].
    pub fn new(adapters: Vec<Arc<dyn LlmAdapter>>) -> std::result::Result<Self, DispatchError> {
        let mut table = HashMap::new();
        for adapter in adapters {
            let model = adapter.model();
            if table.insert(model, adapter).is_some() {
                return Err(DispatchError::DuplicateAdapter(model));
            }
        }

        if let Some(missing) = ModelId::ALL.iter().find(|m| !table.contains_key(*m)) {
            return Err(DispatchError::MissingAdapter(*missing));
        }

        Ok(Self { adapters: table })
    }

    /// Look up the adapter for a display name.
    pub fn resolve(&self, model_name: &str) -> Result<Arc<dyn LlmAdapter>> {
        ModelId::from_display_name(model_name)
            .and_then(|model| self.adapters.get(&model).cloned())
            .ok_or_else(|| Error::UnknownModel {
                name: model_name.to_string(),
                available: self.names().iter().map(|n| n.to_string()).collect(),
            })
    }

    /// Display names of every dispatchable model, in a stable order.
    pub fn names(&self) -> Vec<&'static str> {
        ModelId::ALL.iter().map(ModelId::display_name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::AdapterError;
    use volview_insight_common::{PromptContext, WireImage};

    struct Echo(ModelId);

    impl LlmAdapter for Echo {
        fn model(&self) -> ModelId {
            self.0
        }

        fn infer(&self, _: Option<&WireImage>, _: &PromptContext) -> std::result::Result<String, AdapterError> {
            Ok(self.0.to_string())
        }
    }

    fn full_table() -> DispatchTable {
        DispatchTable::new(vec![
            Arc::new(Echo(ModelId::MedGemma)),
            Arc::new(Echo(ModelId::ClaraNvReasonCxr3b)),
        ])
        .unwrap()
    }

    #[test]
    fn test_display_names_round_trip() {
        for model in ModelId::ALL {
            assert_eq!(ModelId::from_display_name(model.display_name()), Some(model));
        }
    }

    #[test]
    fn test_from_display_name_is_case_sensitive() {
        assert_eq!(ModelId::from_display_name("medgemma"), None);
        assert_eq!(ModelId::from_display_name("MedGemma "), None);
        assert_eq!(ModelId::from_display_name("Clara NV-Reason-CXR-3B"), Some(ModelId::ClaraNvReasonCxr3b));
    }

    #[test]
    fn test_resolve_known_models() {
        let table = full_table();
        for name in table.names() {
            let adapter = table.resolve(name).unwrap();
            assert_eq!(adapter.model().display_name(), name);
        }
    }

    #[test]
    fn test_resolve_unknown_model() {
        let table = full_table();
        match table.resolve("NotARealModel") {
            Err(Error::UnknownModel { name, available }) => {
                assert_eq!(name, "NotARealModel");
                assert_eq!(available, vec!["MedGemma", "Clara NV-Reason-CXR-3B"]);
            }
            _ => panic!("Expected UnknownModel error"),
        }
    }

    #[test]
    fn test_new_requires_every_model() {
        let result = DispatchTable::new(vec![Arc::new(Echo(ModelId::MedGemma))]);
        assert!(matches!(
            result,
            Err(DispatchError::MissingAdapter(ModelId::ClaraNvReasonCxr3b))
        ));
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let result = DispatchTable::new(vec![
            Arc::new(Echo(ModelId::MedGemma)),
            Arc::new(Echo(ModelId::MedGemma)),
        ]);
        assert!(matches!(result, Err(DispatchError::DuplicateAdapter(ModelId::MedGemma))));
    }
}
