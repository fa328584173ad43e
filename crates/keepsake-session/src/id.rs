//! Session identifier generation.

use std::sync::Arc;

use uuid::Uuid;

/// Produces new session identifiers.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// A random 128-bit identifier as 32 lowercase hex characters.
pub fn generate_identifier() -> String {
    Uuid::new_v4().simple().to_string()
}

/// The generator used when none is configured.
pub fn default_generator() -> IdGenerator {
    Arc::new(generate_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identifier_shape() {
        let id = generate_identifier();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_identifiers_do_not_repeat() {
        let generator = default_generator();
        let ids: HashSet<String> = (0..1000).map(|_| generator()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
