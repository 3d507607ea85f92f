//! Accumulated CMake output of a translation run.

use std::collections::BTreeSet;

/// The CMake text sink. Fragments are appended in evaluation order;
/// `find_package` requests are deduplicated and hoisted to the top.
#[derive(Debug, Default)]
pub struct CMakeBuilder {
    find_packages: BTreeSet<String>,
    text: String,
}

impl CMakeBuilder {
    pub fn new() -> Self {
        CMakeBuilder::default()
    }

    pub fn add_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Request `find_package(<name>)` once in the output.
    pub fn find_package(&mut self, name: &str) {
        self.find_packages.insert(name.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.find_packages.is_empty() && self.text.is_empty()
    }

    pub fn as_text(&self) -> String {
        let mut out = String::new();
        for package in &self.find_packages {
            out.push_str(&format!("find_package({})\n", package));
        }
        out.push_str(&self.text);
        out
    }
}
