//! Generation of shell statements for bootstrapping machines; currently the
//! atomic replacement of a password hash in the shadow database.
// SPDX-License-Identifier: Apache-2.0 OR MIT

pub mod cli;
pub mod cmdutils;
pub mod config;
pub mod crypt;
mod error;
pub use self::error::*;
pub mod login;
pub use self::login::{build, ReplaceShadowPasswordEntry};
pub mod nameservice;
mod osfamily;
pub use self::osfamily::*;
pub mod statements;
pub use self::statements::{Exec, Statement, StatementList};
