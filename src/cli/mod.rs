/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Command line interface structs and functions, organized by subcommands.

pub mod classes;
pub mod info;
pub mod init;
