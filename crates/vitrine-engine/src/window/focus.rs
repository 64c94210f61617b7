use crate::panel::{Binding, Panel};

/// Keyboard interaction with the panel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PanelKey {
    /// Move focus to the next editable binding.
    Next,
    Increase,
    Decrease,
}

/// Tracks which editable binding keyboard input goes to.
#[derive(Debug, Default)]
pub struct PanelFocus {
    index: Option<usize>,
}

impl PanelFocus {
    pub fn focused(&self, panel: &Panel) -> Option<Binding> {
        let editable = editable(panel);
        self.index.and_then(|i| editable.get(i).cloned())
    }

    /// Applies `key` and returns the binding it acted on.
    pub fn handle(&mut self, panel: &Panel, key: PanelKey) -> Option<Binding> {
        let editable = editable(panel);
        if editable.is_empty() {
            self.index = None;
            return None;
        }

        let index = match (key, self.index) {
            (PanelKey::Next, Some(i)) => (i + 1) % editable.len(),
            (PanelKey::Next, None) => 0,
            (_, current) => current.unwrap_or(0).min(editable.len() - 1),
        };
        self.index = Some(index);

        let binding = editable[index].clone();
        match key {
            PanelKey::Next => log::info!("focus: {} = {}", binding.label(), binding.value()),
            PanelKey::Increase | PanelKey::Decrease => {
                let direction = if key == PanelKey::Increase { 1 } else { -1 };
                if binding.step(direction) {
                    log::info!("{} = {}", binding.label(), binding.value());
                }
            }
        }
        Some(binding)
    }
}

fn editable(panel: &Panel) -> Vec<Binding> {
    panel
        .bindings()
        .into_iter()
        .filter(|b| !b.is_readonly())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::{BindingParams, ControlValue};

    fn panel() -> Panel {
        let panel = Panel::new("Pane");
        panel.add_binding(ControlValue::Number(5.0), BindingParams::new().label("count").range(1.0, 10.0));
        panel.add_binding(ControlValue::Number(0.0), BindingParams::new().label("fps").readonly());
        panel.add_binding(ControlValue::Bool(false), BindingParams::new().label("wire"));
        panel
    }

    #[test]
    fn next_skips_readonly_and_wraps() {
        let panel = panel();
        let mut focus = PanelFocus::default();

        let labels: Vec<_> = (0..3)
            .filter_map(|_| focus.handle(&panel, PanelKey::Next))
            .map(|b| b.label().to_owned())
            .collect();
        assert_eq!(labels, ["count", "wire", "count"]);
    }

    #[test]
    fn arrows_step_the_focused_binding() {
        let panel = panel();
        let mut focus = PanelFocus::default();

        focus.handle(&panel, PanelKey::Increase);
        focus.handle(&panel, PanelKey::Increase);
        assert_eq!(panel.bindings()[0].value(), ControlValue::Number(7.0));

        focus.handle(&panel, PanelKey::Next);
        focus.handle(&panel, PanelKey::Decrease);
        assert_eq!(panel.bindings()[2].value(), ControlValue::Bool(true));
        assert_eq!(focus.focused(&panel).map(|b| b.label().to_owned()), Some("wire".into()));
    }

    #[test]
    fn disposed_panel_has_nothing_to_focus() {
        let panel = panel();
        panel.dispose();
        assert!(PanelFocus::default().handle(&panel, PanelKey::Next).is_none());
    }
}
