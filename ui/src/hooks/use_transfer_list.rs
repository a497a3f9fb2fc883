use resources::{TransferList, transfer::Transferable};
use yew::prelude::*;

/// Picker state plus the callbacks for its buttons.
pub struct TransferHandle<T: Transferable> {
    pub list: TransferList<T>,
    pub toggle: Callback<T::Key>,
    pub move_checked: Callback<()>,
    pub move_all: Callback<()>,
    pub remove_checked: Callback<()>,
    pub remove_all: Callback<()>,
}

fn action<T, IN>(
    state: &UseStateHandle<TransferList<T>>,
    apply: impl Fn(&mut TransferList<T>, IN) + 'static,
) -> Callback<IN>
where
    T: Transferable + PartialEq + 'static,
    IN: 'static,
{
    let state = state.clone();
    Callback::from(move |input| {
        let mut next = (*state).clone();
        apply(&mut next, input);
        state.set(next);
    })
}

/// Two-list picker for building a worksheet from pending request items.
///
/// The lists are seeded once, on mount.
#[hook]
pub fn use_transfer_list<T>(available: Vec<T>, selected: Vec<T>) -> TransferHandle<T>
where
    T: Transferable + PartialEq + 'static,
    T::Key: 'static,
{
    let state = use_state_eq(|| TransferList::new(available, selected));

    TransferHandle {
        list: (*state).clone(),
        toggle: action(&state, |list, key: T::Key| list.toggle(&key)),
        move_checked: action(&state, |list, ()| list.move_checked()),
        move_all: action(&state, |list, ()| list.move_all()),
        remove_checked: action(&state, |list, ()| list.remove_checked()),
        remove_all: action(&state, |list, ()| list.remove_all()),
    }
}
