use gloo_timers::callback::Interval;
use resources::RefreshPolicy;
use wasm_bindgen::prelude::*;
use yew::prelude::*;

/// A window event listener that is removed when dropped.
struct WindowListener {
    window: web_sys::Window,
    event: &'static str,
    closure: Closure<dyn FnMut()>,
}

impl WindowListener {
    fn new(event: &'static str, callback: Callback<()>) -> Option<Self> {
        let window = web_sys::window()?;
        let closure =
            Closure::wrap(Box::new(move || callback.emit(())) as Box<dyn FnMut()>);
        window
            .add_event_listener_with_callback(
                event,
                closure.as_ref().unchecked_ref(),
            )
            .ok()?;
        Some(Self {
            window,
            event,
            closure,
        })
    }
}

impl Drop for WindowListener {
    fn drop(&mut self) {
        let _ = self.window.remove_event_listener_with_callback(
            self.event,
            self.closure.as_ref().unchecked_ref(),
        );
    }
}

/// Call `revalidate` on the policy's triggers: a polling interval, the
/// window regaining focus, and the browser coming back online.
#[hook]
pub fn use_refresh(policy: RefreshPolicy, revalidate: Callback<()>) {
    use_effect_with(
        (policy.refresh_interval_ms, revalidate.clone()),
        |(interval_ms, revalidate)| {
            let timer = (*interval_ms > 0).then(|| {
                tracing::debug!(interval_ms, "polling");
                let revalidate = revalidate.clone();
                Interval::new(*interval_ms, move || revalidate.emit(()))
            });
            move || drop(timer)
        },
    );

    use_effect_with(
        (
            policy.revalidate_on_focus,
            policy.revalidate_on_reconnect,
            revalidate,
        ),
        |(on_focus, on_reconnect, revalidate)| {
            let listeners: Vec<WindowListener> =
                [("focus", *on_focus), ("online", *on_reconnect)]
                    .into_iter()
                    .filter(|(_, enabled)| *enabled)
                    .filter_map(|(event, _)| {
                        WindowListener::new(event, revalidate.clone())
                    })
                    .collect();
            move || drop(listeners)
        },
    );
}
