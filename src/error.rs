/// Plumbing errors from stores, config and the runtime
pub type Error = Box<dyn std::error::Error + Send + Sync>;
