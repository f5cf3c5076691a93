//! # Port Layer
//!
//! Hardware-specific pieces of the kernel: context frames, the tick
//! source, and the preemption handler. One module per supported
//! architecture; everything above this boundary is portable.

pub mod cortex_m4;
