use resources::LaboratoryConfig;
use std::rc::Rc;
use yewdux::prelude::*;

/// Global UI state. Fetched collections live in the resource cache, not
/// here; this only mirrors the laboratory configuration so components
/// re-render when it arrives.
#[derive(Default, Clone, PartialEq, Store)]
pub struct State {
    // === Laboratory configuration (managed by use_laboratory_config) ===
    pub config: Option<Rc<LaboratoryConfig>>,
    pub config_error: Option<String>,
}

impl State {
    pub fn is_config_loaded(&self) -> bool {
        self.config.is_some()
    }

    /// The loaded configuration, or the defaults until it arrives.
    pub fn config(&self) -> Rc<LaboratoryConfig> {
        self.config.clone().unwrap_or_default()
    }
}
