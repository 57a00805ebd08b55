// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration files repository manager.
//!
//! Cfgs keeps canonical copies of configuration files in a git repository,
//! and exposes them under the user's configuration directory (the __live
//! root__) through symlinks. Files can be tracked, untracked, or materialized
//! back into plain copies, while the [`doctor`] keeps both sides consistent
//! no matter how they drifted apart.
//!
//! # Trust Boundary
//!
//! Every relative path that reaches a mutating operation goes through
//! [`path::normalize`] first. Nothing outside the live root or repository,
//! and nothing under repository metadata, can ever be touched.

pub mod config;
pub mod doctor;
pub mod files;
pub mod managed;
pub mod matcher;
pub mod path;
pub mod picker;
pub mod repo;
pub mod report;
pub mod scan;
pub mod track;
pub mod vcs;
pub mod workspace;

pub use config::CfgsConfig;
pub use doctor::Doctor;
pub use managed::ManagedSet;
pub use path::ManagedPath;
pub use report::{DoctorReport, OperationReport};
pub use workspace::Workspace;
