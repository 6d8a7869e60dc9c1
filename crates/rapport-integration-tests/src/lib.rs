//! Test-only crate. The cross-crate integration suite lives in `tests/`.
