/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Live network topology viewer.
//!
//! Polls a topology API for node/connection snapshots and reconciles them
//! into a stable graph, emitting only the add/update operations a drawing
//! surface needs to stay in sync.

pub mod app;
pub mod config;
pub mod fetch;
pub mod graph;
pub mod poll;
pub mod reconcile;
pub mod render;
pub mod snapshot;
mod util;
