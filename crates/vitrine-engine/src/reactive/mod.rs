//! Fine-grained reactive state: signals, memoized computeds and effects.
//!
//! Everything lives in an explicit [`Runtime`]. Propagation is push-pull:
//! a write marks dependents dirty and queues affected effects, and computeds
//! re-evaluate only when read. Effects run synchronously once the outermost
//! write or evaluation completes, each at most once per change.

mod computed;
mod effect;
mod error;
mod runtime;
mod signal;
mod value;

#[cfg(test)]
mod tests;

pub use computed::Computed;
pub use effect::Effect;
pub use error::ReactiveError;
pub use runtime::{MAX_EFFECT_RERUNS, Runtime};
pub use signal::Signal;
pub use value::ReactiveValue;
