use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        NodeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        NodeError::precondition("x")
            .to_string()
            .contains("precondition failed:")
    );
    assert!(
        NodeError::expression("x")
            .to_string()
            .contains("expression error:")
    );
    assert!(
        NodeError::state("x")
            .to_string()
            .contains("exploration state error:")
    );
    assert!(
        NodeError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn incompatible_state_names_both_versions() {
    let msg = NodeError::IncompatibleState {
        found: 7,
        expected: 1,
    }
    .to_string();
    assert!(msg.contains("version 7"));
    assert!(msg.contains("expected 1"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = NodeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
