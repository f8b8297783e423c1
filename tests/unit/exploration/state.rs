use super::*;

fn sample() -> ExplorationState {
    let embed = Tensor::new(vec![1, 1, 4], vec![0.25, -1.5, f32::MIN_POSITIVE, 3.0e8]).unwrap();
    ExplorationState::new(embed)
}

#[test]
fn save_then_load_is_bit_exact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.bin");
    let state = sample();
    state.save(&path).unwrap();

    let loaded = ExplorationState::load(&path).unwrap();
    assert_eq!(loaded.sample_embed().shape(), &[1, 1, 4]);
    let a: Vec<u32> = state.sample_embed().data().iter().map(|v| v.to_bits()).collect();
    let b: Vec<u32> = loaded.sample_embed().data().iter().map(|v| v.to_bits()).collect();
    assert_eq!(a, b);
}

#[test]
fn save_overwrites_previous_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.bin");
    sample().save(&path).unwrap();
    ExplorationState::new(Tensor::from_vec1(vec![9.0]))
        .save(&path)
        .unwrap();

    let loaded = ExplorationState::load(&path).unwrap();
    assert_eq!(loaded.sample_embed().data(), &[9.0]);
    assert!(!dir.path().join("state.bin.tmp").exists());
}

#[test]
fn failed_replace_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.bin");
    std::fs::create_dir(&path).unwrap();
    std::fs::write(path.join("keep"), b"x").unwrap();

    let err = sample().save(&path).unwrap_err();
    assert!(matches!(err, NodeError::Other(_)));
    assert!(!dir.path().join("state.bin.tmp").exists());
    assert!(path.join("keep").is_file());
}

#[test]
fn save_creates_missing_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("state.bin");
    sample().save(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ExplorationState::load(dir.path().join("missing.bin")).unwrap_err();
    assert!(matches!(err, NodeError::Other(_)));
}

#[test]
fn other_version_is_reported_as_incompatible() {
    let mut bytes = sample().to_bytes().unwrap();
    bytes[4] = STATE_VERSION + 1;
    let err = ExplorationState::from_bytes(&bytes).unwrap_err();
    assert!(matches!(
        err,
        NodeError::IncompatibleState {
            found,
            expected: STATE_VERSION,
        } if found == STATE_VERSION + 1
    ));
}

#[test]
fn flipped_payload_byte_fails_checksum() {
    let mut bytes = sample().to_bytes().unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xff;
    let err = ExplorationState::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, NodeError::State(_)));
}

#[test]
fn foreign_and_truncated_files_are_rejected() {
    assert!(matches!(
        ExplorationState::from_bytes(b"PK\x03\x04 not a state file").unwrap_err(),
        NodeError::State(_)
    ));
    assert!(matches!(
        ExplorationState::from_bytes(&STATE_MAGIC).unwrap_err(),
        NodeError::State(_)
    ));
}
