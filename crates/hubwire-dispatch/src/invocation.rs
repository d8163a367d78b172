use hubwire_progress::ProgressType;
use std::fmt;

/// Identifier of one invocation, e.g. `inv_6f1c...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvocationId(String);

impl InvocationId {
    pub fn new() -> Self {
        Self(format!("inv_{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for InvocationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for InvocationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the dispatcher knows about a call before running its handler.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub id: InvocationId,
    pub method: String,
    /// Progress value type declared by the handler, if it accepts one.
    pub progress: Option<ProgressType>,
}

impl Invocation {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            id: InvocationId::new(),
            method: method.into(),
            progress: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<InvocationId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_progress(mut self, progress: ProgressType) -> Self {
        self.progress = Some(progress);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_prefixed_and_unique() {
        let a = InvocationId::new();
        let b = InvocationId::new();
        assert!(a.as_str().starts_with("inv_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_builder() {
        let invocation = Invocation::new("reindex")
            .with_id("42")
            .with_progress(ProgressType::of::<u32>());

        assert_eq!(invocation.id.to_string(), "42");
        assert_eq!(invocation.method, "reindex");
        assert_eq!(invocation.progress, Some(ProgressType::of::<u32>()));
    }
}
