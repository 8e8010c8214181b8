pub mod fingerprint;
pub mod policy;
pub mod selectors;
pub mod snapshot;
pub mod synthesizer;
