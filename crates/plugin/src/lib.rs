//! Plugin discovery, dependency resolution, and lifecycle management.
//!
//! A plugin ships as a directory holding a `manifest.toml`; the code behind
//! it is a registered factory (plugins are linked into the binary and
//! register constructors by name, the static counterpart of a module
//! import). The loader pairs discovered manifests with factories, orders
//! them by dependencies with semver range validation, and drives the
//! `on_load`/`on_close` hooks with per-plugin config and workspace
//! directories.

pub mod error;
pub mod loader;
pub mod manifest;
pub mod plugin;
pub mod resolver;

pub use {
    error::{Error, Result},
    loader::{LoadReport, PluginLoader},
    manifest::{MANIFEST_FILE, PluginManifest},
    plugin::{Plugin, PluginContext, PluginState},
    resolver::{Resolution, resolve},
};
