use super::*;

fn latent_1x4x4() -> Latent {
    let data: Vec<f32> = (0..16).map(|i| i as f32 * 0.5).collect();
    Latent::new(Tensor::new(vec![1, 4, 4], data).unwrap())
}

fn input_in(dir: &std::path::Path, pos_embed: Tensor) -> RandomRotateInput {
    RandomRotateInput {
        exploration_state_filename: dir.join("state.bin"),
        ..RandomRotateInput::new(pos_embed, latent_1x4x4())
    }
}

#[test]
fn scenario_unit_vector_with_square_latent() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_in(dir.path(), Tensor::from_vec1(vec![1.0, 0.0]));
    let out = RandomRotateEmbeds.run(input).unwrap();

    assert_eq!(out.pos_embeds.shape(), &[4, 2]);
    for row in out.pos_embeds.data().chunks_exact(2) {
        let dist = ((row[0] - 1.0).powi(2) + row[1].powi(2)).sqrt();
        assert!(dist < 0.05);
    }

    let latent = &out.latent_batch.samples;
    assert_eq!(latent.shape(), &[4, 4, 4]);
    let original = latent_1x4x4();
    for slice in latent.data().chunks_exact(16) {
        assert_eq!(slice, original.samples.data());
    }
}

#[test]
fn latent_batch_other_than_one_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut input = input_in(dir.path(), Tensor::from_vec1(vec![1.0, 0.0]));
    input.latent = Latent::new(Tensor::zeros(vec![2, 4, 4]).unwrap());
    let err = RandomRotateEmbeds.run(input).unwrap_err();
    assert!(matches!(err, NodeError::Precondition(_)));
}

#[test]
fn missing_state_falls_back_to_pos_embed() {
    let dir = tempfile::tempdir().unwrap();
    let mut input = input_in(dir.path(), Tensor::from_vec1(vec![0.0, 2.0, 0.0]));
    input.noise_scale = 0.0;
    input.num_samples = 2;
    let out = RandomRotateEmbeds.run(input).unwrap();
    assert_eq!(out.pos_embeds.shape(), &[2, 3]);
    assert_eq!(out.pos_embeds.data(), &[0.0, 2.0, 0.0, 0.0, 2.0, 0.0]);
}

#[test]
fn stored_state_replaces_pos_embed() {
    let dir = tempfile::tempdir().unwrap();
    let stored = Tensor::from_vec1(vec![5.0, 6.0]);
    SaveExplorationStateNode
        .run(SaveStateInput {
            pos_embed: stored.clone(),
            filename: dir.path().join("state.bin"),
        })
        .unwrap();

    let mut input = input_in(dir.path(), Tensor::from_vec1(vec![1.0, 1.0]));
    input.noise_scale = 0.0;
    input.num_samples = 3;
    let out = RandomRotateEmbeds.run(input).unwrap();
    for row in out.pos_embeds.data().chunks_exact(2) {
        assert_eq!(row, stored.data());
    }
}

#[test]
fn corrupt_state_file_aborts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("state.bin"), b"garbage").unwrap();
    let input = input_in(dir.path(), Tensor::from_vec1(vec![1.0, 0.0]));
    assert!(RandomRotateEmbeds.run(input).is_err());
}

#[test]
fn unit_batch_embeds_fold_into_sample_axis() {
    let dir = tempfile::tempdir().unwrap();
    let embed = Tensor::new(vec![1, 1, 8], vec![0.1; 8]).unwrap();
    let mut input = input_in(dir.path(), embed);
    input.num_samples = 3;
    let out = RandomRotateEmbeds.run(input).unwrap();
    assert_eq!(out.pos_embeds.shape(), &[3, 1, 8]);
    assert_eq!(out.latent_batch.samples.shape(), &[3, 4, 4]);
}

#[test]
fn seed_controls_the_draws() {
    let dir = tempfile::tempdir().unwrap();
    let embed = Tensor::from_vec1(vec![0.4, -0.2, 0.9]);
    let run = |seed| {
        let mut input = input_in(dir.path(), embed.clone());
        input.seed = seed;
        RandomRotateEmbeds.run(input).unwrap().pos_embeds
    };
    assert_eq!(run(11), run(11));
    assert_ne!(run(11), run(12));
}

#[test]
fn save_state_echoes_filename() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seed.bin");
    let echoed = SaveExplorationStateNode
        .run(SaveStateInput {
            pos_embed: Tensor::from_vec1(vec![1.0]),
            filename: path.clone(),
        })
        .unwrap();
    assert_eq!(echoed, path);
    assert!(path.is_file());
}

#[test]
fn descriptors_carry_host_defaults() {
    let d = RandomRotateEmbeds::descriptor();
    assert_eq!(d.name, "IPAdapterRandomRotateEmbeds");
    assert_eq!(
        d.input("num_samples").map(|i| i.kind),
        Some(ParamKind::Int {
            default: 4,
            min: Some(1),
            max: None
        })
    );
    assert_eq!(d.outputs.len(), 2);
    assert_eq!(
        SaveExplorationStateNode::descriptor().outputs[0].name,
        "filename"
    );
}
