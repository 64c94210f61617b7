use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

/// Samples kept per graph-view binding.
pub const HISTORY_LEN: usize = 64;

/// Value shown by a panel control.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl ControlValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingView {
    /// Scrolling plot of recent numeric values.
    Graph,
}

/// Presentation parameters of a binding, passed through to the panel as given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingParams {
    pub label: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    /// Named choices. When non-empty, user input must be one of the values.
    pub options: Vec<(String, ControlValue)>,
    pub view: Option<BindingView>,
    pub readonly: bool,
    /// Refresh interval of monitor views, in milliseconds.
    pub interval: Option<u32>,
}

impl BindingParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn option(mut self, name: impl Into<String>, value: ControlValue) -> Self {
        self.options.push((name.into(), value));
        self
    }

    pub fn graph(mut self) -> Self {
        self.view = Some(BindingView::Graph);
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn interval(mut self, ms: u32) -> Self {
        self.interval = Some(ms);
        self
    }
}

type ChangeListener = Rc<dyn Fn(&ControlValue)>;

/// One control on a panel.
///
/// [`Binding::set_value`] is the program updating the display and never emits
/// a change event. [`Binding::input`] is the user editing the control and does.
#[derive(Clone)]
pub struct Binding {
    inner: Rc<BindingInner>,
}

struct BindingInner {
    disposed: Rc<Cell<bool>>,
    params: BindingParams,
    value: RefCell<ControlValue>,
    history: RefCell<VecDeque<f64>>,
    listeners: RefCell<Vec<ChangeListener>>,
    attachments: RefCell<Vec<Box<dyn Any>>>,
}

/// Non-owning binding handle.
#[derive(Clone)]
pub struct WeakBinding(Weak<BindingInner>);

impl WeakBinding {
    pub fn upgrade(&self) -> Option<Binding> {
        self.0.upgrade().map(|inner| Binding { inner })
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("label", &self.label())
            .field("value", &*self.inner.value.borrow())
            .field("readonly", &self.inner.params.readonly)
            .finish()
    }
}

impl Binding {
    fn new(disposed: Rc<Cell<bool>>, initial: ControlValue, params: BindingParams) -> Self {
        let binding = Self {
            inner: Rc::new(BindingInner {
                disposed,
                params,
                value: RefCell::new(initial.clone()),
                history: RefCell::new(VecDeque::with_capacity(HISTORY_LEN)),
                listeners: RefCell::new(Vec::new()),
                attachments: RefCell::new(Vec::new()),
            }),
        };
        binding.record(&initial);
        binding
    }

    pub fn downgrade(&self) -> WeakBinding {
        WeakBinding(Rc::downgrade(&self.inner))
    }

    pub fn label(&self) -> &str {
        self.inner.params.label.as_deref().unwrap_or("value")
    }

    pub fn params(&self) -> &BindingParams {
        &self.inner.params
    }

    pub fn value(&self) -> ControlValue {
        self.inner.value.borrow().clone()
    }

    pub fn is_readonly(&self) -> bool {
        self.inner.params.readonly
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Recent values of a graph view, oldest first. Empty for other views.
    pub fn history(&self) -> Vec<f64> {
        self.inner.history.borrow().iter().copied().collect()
    }

    /// Updates the displayed value without emitting a change event.
    ///
    /// Values outside the declared range are shown as-is.
    pub fn set_value(&self, value: ControlValue) {
        if self.is_disposed() {
            return;
        }
        self.record(&value);
        *self.inner.value.borrow_mut() = value;
    }

    /// Applies a user edit and emits a change event.
    ///
    /// Numbers are clamped to the declared range. Returns `false` when the
    /// edit is rejected: disposed panel, read-only binding, wrong value kind,
    /// or a value outside the option list.
    pub fn input(&self, value: ControlValue) -> bool {
        if self.is_disposed() || self.is_readonly() {
            return false;
        }
        if !value.same_kind(&self.inner.value.borrow()) {
            log::debug!("binding `{}` ignored {value:?}: wrong kind", self.label());
            return false;
        }

        let value = self.clamp(value);
        let params = &self.inner.params;
        if !params.options.is_empty() && !params.options.iter().any(|(_, v)| *v == value) {
            log::debug!("binding `{}` ignored {value:?}: not an option", self.label());
            return false;
        }

        self.set_value(value.clone());

        let listeners = self.inner.listeners.borrow().clone();
        for listener in listeners {
            if self.is_disposed() {
                break;
            }
            listener(&value);
        }
        true
    }

    /// Nudges the control one step in `direction`, as a keyboard would.
    ///
    /// Option lists cycle through their values, numbers move by `step`
    /// (default 1), and booleans toggle.
    pub fn step(&self, direction: i32) -> bool {
        let params = &self.inner.params;
        let current = self.value();

        let next = if !params.options.is_empty() {
            let len = params.options.len() as i64;
            let pos = params
                .options
                .iter()
                .position(|(_, v)| *v == current)
                .map_or(0, |p| p as i64);
            let next = (pos + i64::from(direction.signum())).rem_euclid(len);
            params.options[next as usize].1.clone()
        } else {
            match current {
                ControlValue::Number(v) => {
                    ControlValue::Number(v + params.step.unwrap_or(1.0) * f64::from(direction))
                }
                ControlValue::Bool(v) => ControlValue::Bool(!v),
                ControlValue::Text(_) => return false,
            }
        };
        self.input(next)
    }

    pub fn on_change(&self, listener: impl Fn(&ControlValue) + 'static) {
        if self.is_disposed() {
            return;
        }
        self.inner.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Hands ownership of `resource` to the binding; it is dropped when the panel is disposed.
    pub fn attach(&self, resource: Box<dyn Any>) {
        if self.is_disposed() {
            return;
        }
        self.inner.attachments.borrow_mut().push(resource);
    }

    fn clamp(&self, value: ControlValue) -> ControlValue {
        let ControlValue::Number(mut v) = value else { return value };
        if let Some(min) = self.inner.params.min {
            v = v.max(min);
        }
        if let Some(max) = self.inner.params.max {
            v = v.min(max);
        }
        ControlValue::Number(v)
    }

    fn record(&self, value: &ControlValue) {
        if self.inner.params.view != Some(BindingView::Graph) {
            return;
        }
        let Some(v) = value.as_number() else { return };
        let mut history = self.inner.history.borrow_mut();
        if history.len() == HISTORY_LEN {
            history.pop_front();
        }
        history.push_back(v);
    }

    fn release(&self) {
        let listeners = std::mem::take(&mut *self.inner.listeners.borrow_mut());
        let attachments = std::mem::take(&mut *self.inner.attachments.borrow_mut());
        drop(listeners);
        drop(attachments);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Root,
    Folder,
    TabPage,
}

/// A container of bindings and nested sections: the panel root, a folder, or a tab page.
#[derive(Clone)]
pub struct Section {
    inner: Rc<SectionInner>,
}

struct SectionInner {
    title: String,
    kind: SectionKind,
    disposed: Rc<Cell<bool>>,
    bindings: RefCell<Vec<Binding>>,
    children: RefCell<Vec<Section>>,
}

impl Section {
    fn new(title: &str, kind: SectionKind, disposed: Rc<Cell<bool>>) -> Self {
        Self {
            inner: Rc::new(SectionInner {
                title: title.to_owned(),
                kind,
                disposed,
                bindings: RefCell::new(Vec::new()),
                children: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn kind(&self) -> SectionKind {
        self.inner.kind
    }

    pub fn add_folder(&self, title: &str) -> Section {
        let folder = Section::new(title, SectionKind::Folder, self.inner.disposed.clone());
        self.adopt(folder.clone());
        folder
    }

    /// Adds a tab control and returns one page per title.
    pub fn add_tab<const N: usize>(&self, titles: [&str; N]) -> [Section; N] {
        titles.map(|title| {
            let page = Section::new(title, SectionKind::TabPage, self.inner.disposed.clone());
            self.adopt(page.clone());
            page
        })
    }

    pub fn add_binding(&self, initial: ControlValue, params: BindingParams) -> Binding {
        let binding = Binding::new(self.inner.disposed.clone(), initial, params);
        if !self.inner.disposed.get() {
            self.inner.bindings.borrow_mut().push(binding.clone());
        }
        binding
    }

    pub fn children(&self) -> Vec<Section> {
        self.inner.children.borrow().clone()
    }

    /// Bindings of this section and its descendants, depth first.
    pub fn bindings(&self) -> Vec<Binding> {
        let mut out = self.inner.bindings.borrow().clone();
        for child in self.children() {
            out.extend(child.bindings());
        }
        out
    }

    fn adopt(&self, child: Section) {
        if !self.inner.disposed.get() {
            self.inner.children.borrow_mut().push(child);
        }
    }

    fn release(&self) {
        let bindings = std::mem::take(&mut *self.inner.bindings.borrow_mut());
        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        for binding in &bindings {
            binding.release();
        }
        for child in &children {
            child.release();
        }
    }
}

/// Retained debug panel.
///
/// Disposing the panel releases every binding: listeners and attached
/// resources are dropped, and later input or updates are ignored.
#[derive(Clone)]
pub struct Panel {
    root: Section,
}

impl fmt::Debug for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panel")
            .field("title", &self.title())
            .field("bindings", &self.bindings().len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Panel {
    pub fn new(title: &str) -> Self {
        Self {
            root: Section::new(title, SectionKind::Root, Rc::new(Cell::new(false))),
        }
    }

    pub fn title(&self) -> &str {
        self.root.title()
    }

    pub fn root(&self) -> &Section {
        &self.root
    }

    pub fn add_folder(&self, title: &str) -> Section {
        self.root.add_folder(title)
    }

    pub fn add_binding(&self, initial: ControlValue, params: BindingParams) -> Binding {
        self.root.add_binding(initial, params)
    }

    pub fn bindings(&self) -> Vec<Binding> {
        self.root.bindings()
    }

    pub fn is_disposed(&self) -> bool {
        self.root.inner.disposed.get()
    }

    /// Idempotent.
    pub fn dispose(&self) {
        if self.root.inner.disposed.replace(true) {
            return;
        }
        self.root.release();
        log::debug!("panel `{}` disposed", self.title());
    }
}
