//! Cancellable timed presentation effects
//!
//! Two primitives drive all timed animation in the runtime: [`fade::Fade`]
//! over an opacity property and [`typewriter::Typewriter`] over a text
//! reveal. Only the typewriter is cancellable; fades run to completion and
//! are always awaited so sequential fades on one target cannot race.

pub mod fade;
pub mod typewriter;

pub use fade::{Fade, FadeTarget};
pub use typewriter::Typewriter;
