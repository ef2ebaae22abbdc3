//! Fragment set - the in-memory shape of the user's editable files.
//!
//! A fragment is one named, independently edited unit of source text. The
//! set keeps them in edit order and upholds two invariants: names are
//! unique, and exactly one entry fragment named `index` exists. Violations
//! fail fast at construction; there is no safe default for a malformed set.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the entry fragment bundling starts from.
pub const ENTRY_FRAGMENT: &str = "index";

/// Names this long or longer are rejected on rename.
const MAX_NAME_LEN: usize = 50;

/// One named, independently editable unit of source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub name: String,
    pub code: String,
}

impl Fragment {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

/// Ordered collection of fragments with unique names and a mandatory entry.
#[derive(Debug, Clone)]
pub struct FragmentSet {
    fragments: Vec<Fragment>,
}

impl FragmentSet {
    /// Validate and take ownership of `fragments`.
    ///
    /// # Errors
    /// Fails when the set is empty, a name appears twice, or no fragment is
    /// named `index`.
    pub fn new(fragments: Vec<Fragment>) -> Result<Self> {
        if fragments.is_empty() {
            bail!("fragment set is empty");
        }
        for (i, fragment) in fragments.iter().enumerate() {
            if fragments[..i].iter().any(|f| f.name == fragment.name) {
                bail!("duplicate fragment name '{}'", fragment.name);
            }
        }
        if !fragments.iter().any(|f| f.name == ENTRY_FRAGMENT) {
            bail!("fragment set has no '{ENTRY_FRAGMENT}' entry fragment");
        }
        Ok(Self { fragments })
    }

    /// Read a JSON array of `{name, code}` objects from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read '{}': {}", path.display(), e))?;
        let fragments: Vec<Fragment> = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Invalid fragment JSON in '{}': {}", path.display(), e))?;
        Self::new(fragments)
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// The entry fragment. Always present once the set is constructed.
    pub fn entry(&self) -> &Fragment {
        self.fragments
            .iter()
            .find(|f| f.name == ENTRY_FRAGMENT)
            .expect("validated at construction")
    }

    pub fn get(&self, name: &str) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.name == name)
    }

    /// Look up a fragment other than the entry. The resolver inlines only
    /// siblings; `import "index"` is a missing-fragment error.
    pub fn sibling(&self, name: &str) -> Option<&Fragment> {
        if name == ENTRY_FRAGMENT {
            return None;
        }
        self.get(name)
    }

    /// Replace the code of the named fragment.
    pub fn set_code(&mut self, name: &str, code: impl Into<String>) -> Result<()> {
        let fragment = self
            .fragments
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| anyhow!("no fragment named '{}'", name))?;
        fragment.code = code.into();
        Ok(())
    }

    /// Rename a fragment in place. The entry fragment keeps its name; the
    /// new name must be non-empty, shorter than 50 characters and unused.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let to = to.trim();
        if from == ENTRY_FRAGMENT {
            bail!("the entry fragment cannot be renamed");
        }
        if to.is_empty() {
            bail!("fragment name cannot be empty");
        }
        if to.len() >= MAX_NAME_LEN {
            bail!("fragment name too long (max {} characters)", MAX_NAME_LEN - 1);
        }
        if self.fragments.iter().any(|f| f.name == to) {
            bail!("fragment name '{}' is already taken", to);
        }
        let fragment = self
            .fragments
            .iter_mut()
            .find(|f| f.name == from)
            .ok_or_else(|| anyhow!("no fragment named '{}'", from))?;
        fragment.name = to.to_string();
        Ok(())
    }

    /// Append an empty fragment under a generated unique name and return
    /// the name: `Untitled`, then `Untitled 1`, `Untitled 2`, ...
    pub fn add_fragment(&mut self) -> String {
        let base = "Untitled";
        let mut name = base.to_string();
        let mut n = 1;
        while self.fragments.iter().any(|f| f.name == name) {
            name = format!("{base} {n}");
            n += 1;
        }
        self.fragments.push(Fragment::new(name.clone(), ""));
        name
    }
}
