//! Parsing of the system account databases.
// SPDX-License-Identifier: Apache-2.0 OR MIT

pub mod shadow;
