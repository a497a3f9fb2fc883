//! Laboratory configuration: static defaults overridden by the backend's
//! `labmanagement.*` global properties, loaded once per session.

use crate::cache::SharedError;
use futures::future::{self, FutureExt, LocalBoxFuture, Shared};
use payloads::{APIClient, ClientError, responses::GlobalProperty};
use std::{
    cell::RefCell,
    collections::BTreeMap,
    future::Future,
    rc::{Rc, Weak},
    str::FromStr,
};

pub const PROPERTY_PREFIX: &str = "labmanagement.";

pub const DEFAULT_PAGE_SIZE_PROPERTY: &str = "labmanagement.defaultPageSize";
pub const PAGE_SIZES_PROPERTY: &str = "labmanagement.pageSizes";
pub const SEARCH_DEBOUNCE_PROPERTY: &str = "labmanagement.searchDebounceMs";
pub const BATCH_JOB_POLL_PROPERTY: &str = "labmanagement.batchJobPollIntervalMs";
pub const REQUIRE_APPROVAL_PROPERTY: &str =
    "labmanagement.testConfigRequireApproval";
pub const WORKSHEET_IMPORT_PROPERTY: &str = "labmanagement.enableWorksheetImport";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaboratoryConfig {
    pub default_page_size: usize,
    pub page_sizes: Vec<usize>,
    pub search_debounce_ms: u32,
    /// Polling interval for batch job lists; 0 disables polling.
    pub batch_job_poll_ms: u32,
    /// Default for new test configurations.
    pub require_approval: bool,
    pub worksheet_import_enabled: bool,
    /// Every `labmanagement.*` property as received, including ones without
    /// a typed field.
    pub properties: BTreeMap<String, String>,
}

impl Default for LaboratoryConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            page_sizes: vec![10, 20, 50, 100],
            search_debounce_ms: crate::debounce::DEFAULT_DEBOUNCE_MS,
            batch_job_poll_ms: 5_000,
            require_approval: false,
            worksheet_import_enabled: true,
            properties: BTreeMap::new(),
        }
    }
}

impl LaboratoryConfig {
    pub fn from_properties(properties: &[GlobalProperty]) -> Self {
        let mut config = Self::default();
        config.merge(properties);
        config
    }

    /// Override defaults with global properties. Properties outside the
    /// `labmanagement.` namespace are ignored; a value that doesn't parse
    /// keeps the current setting.
    pub fn merge(&mut self, properties: &[GlobalProperty]) {
        for property in properties {
            let Some(value) = property.value.as_deref().map(str::trim) else {
                continue;
            };
            if !property.property.starts_with(PROPERTY_PREFIX) || value.is_empty() {
                continue;
            }
            self.properties
                .insert(property.property.clone(), value.to_string());

            match property.property.as_str() {
                DEFAULT_PAGE_SIZE_PROPERTY => {
                    set_parsed(&mut self.default_page_size, &property.property, value)
                }
                PAGE_SIZES_PROPERTY => {
                    let sizes: Result<Vec<usize>, _> = value
                        .split(',')
                        .map(|size| size.trim().parse::<usize>())
                        .collect();
                    match sizes {
                        Ok(sizes) if !sizes.is_empty() && !sizes.contains(&0) => {
                            self.page_sizes = sizes
                        }
                        _ => tracing::warn!(
                            property = %property.property,
                            value,
                            "ignoring invalid page sizes"
                        ),
                    }
                }
                SEARCH_DEBOUNCE_PROPERTY => {
                    set_parsed(&mut self.search_debounce_ms, &property.property, value)
                }
                BATCH_JOB_POLL_PROPERTY => {
                    set_parsed(&mut self.batch_job_poll_ms, &property.property, value)
                }
                REQUIRE_APPROVAL_PROPERTY => {
                    set_parsed(&mut self.require_approval, &property.property, value)
                }
                WORKSHEET_IMPORT_PROPERTY => set_parsed(
                    &mut self.worksheet_import_enabled,
                    &property.property,
                    value,
                ),
                _ => {}
            }
        }
        if self.default_page_size == 0 {
            self.default_page_size = Self::default().default_page_size;
        }
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

fn set_parsed<T: FromStr>(target: &mut T, property: &str, value: &str) {
    match value.parse() {
        Ok(parsed) => *target = parsed,
        Err(_) => tracing::warn!(property, value, "ignoring unparseable property"),
    }
}

type ConfigResult = Result<Rc<LaboratoryConfig>, SharedError>;

#[derive(Default)]
struct StoreState {
    config: Option<Rc<LaboratoryConfig>>,
    pending: Option<Shared<LocalBoxFuture<'static, ConfigResult>>>,
}

/// The session's configuration cell.
///
/// [`ConfigStore::init`] fetches once; callers that arrive while the fetch is
/// running share it. If it fails the store stays uninitialized and the next
/// `init` tries again.
#[derive(Clone, Default)]
pub struct ConfigStore {
    state: Rc<RefCell<StoreState>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.borrow().config.is_some()
    }

    /// The loaded configuration, or the defaults before initialization.
    pub fn get(&self) -> Rc<LaboratoryConfig> {
        self.state.borrow().config.clone().unwrap_or_default()
    }

    pub fn init(&self, client: &APIClient) -> LocalBoxFuture<'static, ConfigResult> {
        let client = client.clone();
        self.init_with(move || async move {
            let page = client.list_global_properties(PROPERTY_PREFIX).await?;
            Ok::<_, ClientError>(page.results)
        })
    }

    pub fn init_with<Fut>(
        &self,
        fetch: impl FnOnce() -> Fut,
    ) -> LocalBoxFuture<'static, ConfigResult>
    where
        Fut: Future<Output = Result<Vec<GlobalProperty>, ClientError>> + 'static,
    {
        let mut state = self.state.borrow_mut();
        if let Some(config) = &state.config {
            return future::ready(Ok(config.clone())).boxed_local();
        }
        if let Some(pending) = &state.pending {
            return pending.clone().boxed_local();
        }

        tracing::debug!("loading laboratory configuration");
        let request = fetch();
        let store: Weak<RefCell<StoreState>> = Rc::downgrade(&self.state);
        let pending = async move {
            let result: ConfigResult = match request.await {
                Ok(properties) => {
                    Ok(Rc::new(LaboratoryConfig::from_properties(&properties)))
                }
                Err(e) => Err(Rc::new(e)),
            };
            if let Some(store) = store.upgrade() {
                let mut state = store.borrow_mut();
                state.pending = None;
                match &result {
                    Ok(config) => state.config = Some(config.clone()),
                    Err(error) => tracing::error!(%error, "failed to load laboratory configuration"),
                }
            }
            result
        }
        .boxed_local()
        .shared();
        state.pending = Some(pending.clone());
        pending.boxed_local()
    }
}
