use resources::LaboratoryConfig;
use std::rc::Rc;
use yew::prelude::*;
use yewdux::prelude::*;

use crate::{State, config_store, get_api_client};

/// The laboratory configuration, loading it on first use.
///
/// Returns the defaults until the `labmanagement.*` global properties have
/// arrived. A failed load is recorded in [`State::config_error`] and retried
/// by the next component that mounts.
#[hook]
pub fn use_laboratory_config() -> Rc<LaboratoryConfig> {
    let (state, dispatch) = use_store::<State>();

    use_effect_with((), move |_| {
        let store = config_store();
        if store.is_initialized() {
            let config = store.get();
            dispatch.reduce_mut(move |state| state.config = Some(config));
        } else {
            let request = store.init(&get_api_client());
            yew::platform::spawn_local(async move {
                match request.await {
                    Ok(config) => dispatch.reduce_mut(move |state| {
                        state.config = Some(config);
                        state.config_error = None;
                    }),
                    Err(e) => {
                        let message = e.to_string();
                        dispatch.reduce_mut(move |state| {
                            state.config_error = Some(message)
                        })
                    }
                }
            });
        }
    });

    state.config()
}
