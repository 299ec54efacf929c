// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Module graph resolution, linking and evaluation for ECMAScript modules.
//!
//! The crate owns the graph algorithms of ECMA-262 section 16.2: it resolves
//! the module graph through host hooks, links cyclic groups with Tarjan's
//! strongly connected components walk, evaluates modules in dependency order
//! (including top-level await and asynchronous cycles), and serves dynamic
//! `import()`, module namespace objects and `import.meta`.
//!
//! Executing module bodies is left to an [`engine::Interpreter`] supplied by
//! the embedder.

pub mod ecmascript;
pub mod engine;
pub(crate) mod heap;
