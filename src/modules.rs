use std::env;

use tracing::debug;

/// Environment variable carrying the module directives
pub const ARGV_VAR: &str = "_PYPLAY_ARGV";

/// Directive string for this launch: `_PYPLAY_ARGV` if set, otherwise the
/// process arguments
pub fn launch_arguments() -> String {
    match env::var(ARGV_VAR) {
        Ok(argv) => argv,
        Err(_) => env::args().skip(1).collect::<Vec<_>>().join(" "),
    }
}

/// One whitespace-separated word of the directive string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    /// `--none`
    Clear,
    /// `-name`
    Remove(&'a str),
    /// `name`
    Add(&'a str),
}

impl<'a> Directive<'a> {
    pub fn parse(word: &'a str) -> Self {
        if word == "--none" {
            Directive::Clear
        } else if let Some(name) = word.strip_prefix('-') {
            Directive::Remove(name)
        } else {
            Directive::Add(word)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Default,
    Requested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    origin: Origin,
}

/// Working list of modules to pre-import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleList {
    entries: Vec<Entry>,
}

impl ModuleList {
    pub fn from_defaults<S: AsRef<str>>(defaults: &[S]) -> Self {
        let mut list = Self::default();
        for name in defaults {
            list.push(name.as_ref(), Origin::Default);
        }
        list
    }

    pub fn apply(&mut self, directive: Directive<'_>) {
        match directive {
            Directive::Clear => self.entries.clear(),
            Directive::Remove(name) => {
                if let Some(pos) = self.position(name) {
                    self.entries.remove(pos);
                }
            }
            Directive::Add(name) => self.push(name, Origin::Requested),
        }
    }

    /// Apply every directive of a whitespace-separated string, left to right
    pub fn apply_all(&mut self, argv: &str) {
        for word in argv.split_whitespace() {
            let directive = Directive::parse(word);
            debug!(?directive, "applying module directive");
            self.apply(directive);
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// `import` statements in execution order: requested modules latest
    /// first, then the surviving defaults in configured order
    pub fn import_commands(&self) -> Vec<String> {
        let requested = self
            .entries
            .iter()
            .rev()
            .filter(|entry| entry.origin == Origin::Requested);
        let defaults = self
            .entries
            .iter()
            .filter(|entry| entry.origin == Origin::Default);
        requested
            .chain(defaults)
            .map(|entry| format!("import {}", entry.name))
            .collect()
    }

    /// Put the import statements ahead of `commands`
    pub fn prepend_to(&self, commands: &mut Vec<String>) {
        commands.splice(0..0, self.import_commands());
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }

    fn push(&mut self, name: &str, origin: Origin) {
        if self.position(name).is_none() {
            self.entries.push(Entry {
                name: name.to_string(),
                origin,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: [&str; 3] = ["os", "sys", "re"];

    fn built(argv: &str) -> ModuleList {
        let mut list = ModuleList::from_defaults(&DEFAULTS);
        list.apply_all(argv);
        list
    }

    #[test]
    fn parses_directive_forms() {
        assert_eq!(Directive::parse("--none"), Directive::Clear);
        assert_eq!(Directive::parse("-os"), Directive::Remove("os"));
        assert_eq!(Directive::parse("json"), Directive::Add("json"));
        assert_eq!(Directive::parse("--verbose"), Directive::Remove("-verbose"));
    }

    #[test]
    fn add_remove_and_append() {
        let list = built("re -os extra");
        assert_eq!(list.names(), vec!["sys", "re", "extra"]);
        assert_eq!(
            list.import_commands(),
            vec!["import extra", "import sys", "import re"]
        );
    }

    #[test]
    fn clear_discards_defaults() {
        let list = built("--none foo");
        assert_eq!(list.import_commands(), vec!["import foo"]);
    }

    #[test]
    fn later_requests_import_first() {
        let list = built("--none a b c");
        assert_eq!(
            list.import_commands(),
            vec!["import c", "import b", "import a"]
        );
    }

    #[test]
    fn removing_an_absent_module_is_ignored() {
        let list = built("-nonexistent");
        assert_eq!(list.names(), DEFAULTS.to_vec());
    }

    #[test]
    fn empty_argv_keeps_defaults_in_order() {
        let list = built("   ");
        assert_eq!(
            list.import_commands(),
            vec!["import os", "import sys", "import re"]
        );
    }

    #[test]
    fn removed_then_requested_counts_as_requested() {
        let list = built("-os json os");
        assert_eq!(list.names(), vec!["sys", "re", "json", "os"]);
        assert_eq!(
            list.import_commands(),
            vec!["import os", "import json", "import sys", "import re"]
        );
    }

    #[test]
    fn imports_go_before_existing_commands() {
        let mut commands = vec!["print('hi')".to_string()];
        built("re -os extra").prepend_to(&mut commands);
        assert_eq!(
            commands,
            vec!["import extra", "import sys", "import re", "print('hi')"]
        );
    }
}
