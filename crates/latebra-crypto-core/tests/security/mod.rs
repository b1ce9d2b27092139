mod decoy_indistinguishability;
mod mlock_verification;
mod tamper_detection;
mod wipe_registry;
