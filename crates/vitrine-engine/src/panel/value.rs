use super::model::ControlValue;

/// Conversion between a reactive value and what a panel control displays.
pub trait PanelValue: Clone + 'static {
    fn to_control(&self) -> ControlValue;

    /// `None` when the control value cannot represent `Self`.
    fn from_control(value: &ControlValue) -> Option<Self>;
}

impl PanelValue for f64 {
    fn to_control(&self) -> ControlValue {
        ControlValue::Number(*self)
    }

    fn from_control(value: &ControlValue) -> Option<Self> {
        value.as_number()
    }
}

impl PanelValue for f32 {
    fn to_control(&self) -> ControlValue {
        ControlValue::Number(f64::from(*self))
    }

    fn from_control(value: &ControlValue) -> Option<Self> {
        value.as_number().map(|v| v as f32)
    }
}

macro_rules! integer_panel_value {
    ($($ty:ty),*) => {$(
        impl PanelValue for $ty {
            fn to_control(&self) -> ControlValue {
                ControlValue::Number(*self as f64)
            }

            fn from_control(value: &ControlValue) -> Option<Self> {
                let v = value.as_number()?.round();
                (v >= <$ty>::MIN as f64 && v <= <$ty>::MAX as f64).then_some(v as $ty)
            }
        }
    )*};
}

integer_panel_value!(i32, u32, usize);

impl PanelValue for bool {
    fn to_control(&self) -> ControlValue {
        ControlValue::Bool(*self)
    }

    fn from_control(value: &ControlValue) -> Option<Self> {
        value.as_bool()
    }
}

impl PanelValue for String {
    fn to_control(&self) -> ControlValue {
        ControlValue::Text(self.clone())
    }

    fn from_control(value: &ControlValue) -> Option<Self> {
        value.as_text().map(str::to_owned)
    }
}
