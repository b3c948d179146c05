//! Bundled speech-provider implementations.
//!
//! Real deployments wrap a platform speech facility behind
//! [`SpeechProvider`](crate::SpeechProvider); this module ships the
//! reference implementation used by the demo and by headless previews.

pub mod silent;

pub use silent::SilentProvider;
