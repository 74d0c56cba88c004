//! Workspace root crate; exists to anchor development tooling such as the
//! git hooks installed by `cargo-husky`. The SDK itself lives under
//! `crates/`.
