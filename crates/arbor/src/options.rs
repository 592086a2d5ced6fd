/// Flags controlling a single write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOptions {
    /// Suppress `change` events for this write.
    pub silent: bool,
    /// Remove the named attributes instead of assigning them.
    pub unset: bool,
    /// Run the type's validator before applying the write.
    pub validate: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self { silent: false, unset: false, validate: true }
    }
}

impl SetOptions {
    /// Default options with events suppressed.
    #[must_use]
    pub fn silent() -> Self {
        Self { silent: true, ..Self::default() }
    }

    #[must_use]
    pub const fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    pub(crate) const fn unsetting(mut self) -> Self {
        self.unset = true;
        self
    }

    /// Options used while building a new instance.
    pub(crate) const fn construction() -> Self {
        Self { silent: true, unset: false, validate: false }
    }
}

/// Result of a write that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Applied,
    /// A validator vetoed the write, or part of it. See [`crate::Entity::validation_error`].
    Rejected,
}

impl SetOutcome {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }

    pub(crate) const fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Applied, Self::Applied) => Self::Applied,
            _ => Self::Rejected,
        }
    }
}
