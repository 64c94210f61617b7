use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::time::{FrameHandle, FrameScheduler, FrameTime};

use super::model::{Binding, BindingParams, ControlValue, Panel};

/// Frame timing graphs on a panel, refreshed every scheduler tick.
///
/// Runs until [`FrameMonitor::stop`] is called, the monitor is dropped, or
/// the panel is disposed.
pub struct FrameMonitor {
    state: Rc<MonitorState>,
}

struct MonitorState {
    panel: Panel,
    scheduler: FrameScheduler,
    fps: Binding,
    ft: Binding,
    frame: Cell<Option<FrameHandle>>,
    stopped: Cell<bool>,
}

impl MonitorState {
    fn active(&self) -> bool {
        !self.stopped.get() && !self.panel.is_disposed()
    }

    fn sample(&self, time: FrameTime) {
        let ft = time.dt_ms();
        self.ft.set_value(ControlValue::Number(ft));
        self.fps.set_value(ControlValue::Number((1000.0 / ft).round()));
    }
}

fn schedule(state: &Rc<MonitorState>) {
    let weak: Weak<MonitorState> = Rc::downgrade(state);
    let handle = state.scheduler.request_frame(move |time| {
        let Some(state) = weak.upgrade() else { return };
        state.frame.set(None);
        if !state.active() {
            return;
        }
        state.sample(time);
        schedule(&state);
    });
    state.frame.set(Some(handle));
}

/// Adds a `Frame` folder with `FPS` and `FT` graph pages and starts sampling.
pub fn monitor_frame(panel: &Panel, scheduler: &FrameScheduler) -> FrameMonitor {
    let folder = panel.add_folder("Frame");
    let [fps_page, ft_page] = folder.add_tab(["FPS", "FT"]);

    let fps = fps_page.add_binding(
        ControlValue::Number(0.0),
        BindingParams::new()
            .label("fps")
            .graph()
            .readonly()
            .range(0.0, 200.0)
            .interval(128),
    );
    let ft = ft_page.add_binding(
        ControlValue::Number(0.0),
        BindingParams::new()
            .label("ft")
            .graph()
            .readonly()
            .range(0.0, 1000.0)
            .interval(128),
    );

    let state = Rc::new(MonitorState {
        panel: panel.clone(),
        scheduler: scheduler.clone(),
        fps,
        ft,
        frame: Cell::new(None),
        stopped: Cell::new(false),
    });
    schedule(&state);

    FrameMonitor { state }
}

impl FrameMonitor {
    pub fn fps(&self) -> &Binding {
        &self.state.fps
    }

    pub fn ft(&self) -> &Binding {
        &self.state.ft
    }

    pub fn is_running(&self) -> bool {
        self.state.active()
    }

    /// Idempotent.
    pub fn stop(&self) {
        self.state.stopped.set(true);
        if let Some(handle) = self.state.frame.take() {
            self.state.scheduler.cancel_frame(handle);
        }
    }
}

impl Drop for FrameMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
