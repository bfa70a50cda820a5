//! Unit tests for dockmgr configuration types.
//!
//! This module contains tests organised into:
//! - [`helpers`] - Shared fixtures and helper functions
//! - [`types_tests`] - Defaults, TOML parsing and limit validation
//! - [`layer_precedence_tests`] - `MergeComposer` layer precedence tests
