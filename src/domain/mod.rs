//! Pure domain types with minimal dependencies
//!
//! Types here carry no I/O and no widget state. The GUI layer owns
//! interaction (move/resize/rotate mutate the stored attributes directly);
//! this module owns the stored values and the math over them.

pub mod roi;

pub use roi::*;
