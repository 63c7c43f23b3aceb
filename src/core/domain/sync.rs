/// Result of pushing the secrets cache into a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Secrets that did not exist remotely and were created
    pub created: Vec<String>,
    /// Secrets that existed remotely and were patched
    pub patched: Vec<String>,
    /// Whether the target namespace had to be created
    pub namespace_created: bool,
}

impl SyncReport {
    /// Total number of secrets written.
    pub fn total(&self) -> usize {
        self.created.len() + self.patched.len()
    }
}
