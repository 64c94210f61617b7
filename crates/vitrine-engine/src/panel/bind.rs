use crate::reactive::ReactiveValue;

use super::model::{Binding, BindingParams, Section};
use super::value::PanelValue;

/// Two-way binding between a reactive value and a panel control.
///
/// Changes to `accessor` show up on the control through an effect owned by
/// the binding. User edits are written back with
/// [`ReactiveValue::try_set`]; a read-only accessor turns the control into a
/// monitor whose edits are logged and dropped. The echo of a user edit is a
/// no-op write, so the two directions never ping-pong.
pub fn bind<T, A>(section: &Section, accessor: &A, params: BindingParams) -> Binding
where
    T: PanelValue,
    A: ReactiveValue<T>,
{
    let runtime = accessor.runtime().clone();
    let initial = runtime.untrack(|| accessor.get());
    let binding = section.add_binding(initial.to_control(), params);

    let mirror = binding.downgrade();
    let source = accessor.clone();
    let sync = runtime.effect(move || {
        let value = source.get();
        if let Some(binding) = mirror.upgrade() {
            binding.set_value(value.to_control());
        }
    });

    let target = accessor.clone();
    let label = binding.label().to_owned();
    binding.on_change(move |value| {
        let Some(value) = T::from_control(value) else {
            log::warn!("binding `{label}`: cannot convert {value:?}");
            return;
        };
        if let Err(err) = target.try_set(value) {
            log::warn!("binding `{label}` rejected input: {err}");
        }
    });

    binding.attach(Box::new(sync));
    binding
}
