/// Name reported for sessions that did not authenticate.
pub const ANONYMOUS: &str = "anonymous";

/// Identity of the client session driving a view.
///
/// Document trees have no ownership model, so this is also what the adapter
/// reports as owner and group of every file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    name: String,
}

impl SessionUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for SessionUser {
    fn default() -> Self {
        Self::anonymous()
    }
}
