//! Debug panel model and reactive bindings.
//!
//! The panel is a retained tree of sections and bindings. Hosts render and
//! drive it; demos populate it through [`bind`] and [`monitor_frame`].

mod bind;
mod model;
mod monitor;
mod value;

pub use bind::bind;
pub use model::{
    Binding, BindingParams, BindingView, ControlValue, HISTORY_LEN, Panel, Section, SectionKind,
    WeakBinding,
};
pub use monitor::{FrameMonitor, monitor_frame};
pub use value::PanelValue;
