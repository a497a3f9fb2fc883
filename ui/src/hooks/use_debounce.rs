use gloo_timers::callback::Timeout;
use resources::Debouncer;
use yew::prelude::*;

use crate::hooks::use_laboratory_config;

/// `value`, once it has stopped changing for `window_ms`.
///
/// A burst of changes (keystrokes in a search box) yields one update, so a
/// resource keyed on the debounced value fetches once.
#[hook]
pub fn use_debounced<T>(value: T, window_ms: u32) -> T
where
    T: Clone + PartialEq + 'static,
{
    let debounced = use_state_eq(|| value.clone());
    let debouncer = use_mut_ref(|| Debouncer::<T>::new(window_ms));
    let timeout = use_mut_ref(|| None::<Timeout>);

    {
        let debounced = debounced.clone();
        let timeout = timeout.clone();
        use_effect_with(value, move |value| {
            // The configured delay may arrive after the first render.
            debouncer.borrow_mut().set_window_ms(window_ms);
            let ticket = debouncer.borrow_mut().input(value.clone());
            // Replacing the timeout drops, and so cancels, the previous one.
            *timeout.borrow_mut() = Some(Timeout::new(window_ms, move || {
                if let Some(value) = debouncer.borrow_mut().fire(ticket) {
                    debounced.set(value);
                }
            }));
        });
    }

    use_effect_with((), move |_| {
        move || {
            timeout.borrow_mut().take();
        }
    });

    (*debounced).clone()
}

/// Debounced search text using the configured search delay.
#[hook]
pub fn use_debounced_search(query: String) -> String {
    let config = use_laboratory_config();
    use_debounced(query, config.search_debounce_ms)
}
