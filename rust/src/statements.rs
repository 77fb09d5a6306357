//! Composable pieces of a boot script.
//!
//! A [`Statement`] knows how to render itself as script text for a given
//! [`OsFamily`]; a [`StatementList`] renders its members strictly in order.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt::Write;

use crate::error::Result;
use crate::osfamily::OsFamily;

/// Something that can be rendered into script text.
pub trait Statement: Send + Sync {
    /// Names of shell functions that must be defined earlier in the script
    /// for the rendered text to work.
    fn function_dependencies(&self, family: OsFamily) -> Vec<String>;

    /// Render to text for the given OS family.
    fn render(&self, family: OsFamily) -> Result<String>;
}

/// A single command line, executed as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exec {
    command: String,
}

impl Exec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Statement for Exec {
    fn function_dependencies(&self, _family: OsFamily) -> Vec<String> {
        Vec::new()
    }

    fn render(&self, family: OsFamily) -> Result<String> {
        let mut r = String::with_capacity(self.command.len() + 2);
        write!(&mut r, "{}{}", self.command, family.line_terminator())?;
        Ok(r)
    }
}

/// An ordered sequence of statements.
#[derive(Default)]
pub struct StatementList {
    statements: Vec<Box<dyn Statement>>,
}

impl StatementList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: impl Statement + 'static) -> &mut Self {
        self.statements.push(Box::new(statement));
        self
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Statement> {
        self.statements.iter().map(|s| s.as_ref())
    }
}

impl std::fmt::Debug for StatementList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementList")
            .field("len", &self.statements.len())
            .finish()
    }
}

impl Statement for StatementList {
    fn function_dependencies(&self, family: OsFamily) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        for dep in self.iter().flat_map(|s| s.function_dependencies(family)) {
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        deps
    }

    fn render(&self, family: OsFamily) -> Result<String> {
        // Any member failing aborts the whole list; we never hand back a
        // partially rendered script.
        self.iter().try_fold(String::new(), |mut acc, s| {
            acc.push_str(&s.render(family)?);
            Ok(acc)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct NeedsFunctions(&'static [&'static str]);

    impl Statement for NeedsFunctions {
        fn function_dependencies(&self, _family: OsFamily) -> Vec<String> {
            self.0.iter().map(|s| s.to_string()).collect()
        }

        fn render(&self, _family: OsFamily) -> Result<String> {
            Ok(String::new())
        }
    }

    struct Fails;

    impl Statement for Fails {
        fn function_dependencies(&self, _family: OsFamily) -> Vec<String> {
            Vec::new()
        }

        fn render(&self, family: OsFamily) -> Result<String> {
            Err(Error::UnsupportedPlatform(family))
        }
    }

    #[test]
    fn test_exec_render() {
        let e = Exec::new("echo hello");
        assert_eq!(e.render(OsFamily::Unix).unwrap(), "echo hello\n");
        assert_eq!(e.render(OsFamily::Windows).unwrap(), "echo hello\r\n");
        assert!(e.function_dependencies(OsFamily::Unix).is_empty());
    }

    #[test]
    fn test_list_order() {
        let mut l = StatementList::new();
        l.push(Exec::new("first")).push(Exec::new("second"));
        assert_eq!(l.len(), 2);
        similar_asserts::assert_eq!(l.render(OsFamily::Unix).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_list_dependencies() {
        let mut l = StatementList::new();
        l.push(NeedsFunctions(&["setupPublicCurl", "installJdk"]))
            .push(NeedsFunctions(&["installJdk", "abort"]));
        assert_eq!(
            l.function_dependencies(OsFamily::Unix),
            ["setupPublicCurl", "installJdk", "abort"]
        );
    }

    #[test]
    fn test_list_failure_is_total() {
        let mut l = StatementList::new();
        l.push(Exec::new("echo ok")).push(Fails);
        assert!(matches!(
            l.render(OsFamily::Windows),
            Err(Error::UnsupportedPlatform(OsFamily::Windows))
        ));
    }
}
