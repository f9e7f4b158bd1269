use std::fmt::{Display, Formatter};

/// A snapshot of a container's local registrations, for diagnostics.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DebugInfo {
    /// Name given to the container, if any.
    pub name: Option<String>,
    /// Number of locally registered providers.
    pub provider_count: usize,
    /// Each local provider described as `type(name, scope)`, sorted.
    pub providers: Vec<String>,
    /// Whether the container falls back to a parent.
    pub has_parent: bool,
}

impl Display for DebugInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "container {} ({} providers{})",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.provider_count,
            if self.has_parent { ", has parent" } else { "" }
        )?;
        for provider in &self.providers {
            write!(f, "\n  {provider}")?;
        }
        Ok(())
    }
}
