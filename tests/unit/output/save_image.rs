use serde_json::json;

use super::*;

fn node_in(dir: &Path) -> SaveImageAdvanced {
    SaveImageAdvanced {
        settings: NodeSettings {
            output_dir: dir.to_path_buf(),
            ..NodeSettings::default()
        },
    }
}

fn rgb_batch(n: usize) -> Tensor {
    let data = (0..n * 2 * 2 * 3).map(|i| (i % 3) as f32 * 0.5).collect();
    Tensor::new(vec![n, 2, 2, 3], data).unwrap()
}

fn plain_input(images: Tensor) -> SaveImageInput {
    SaveImageInput {
        add_timestamp: false,
        ..SaveImageInput::new(images)
    }
}

fn read_png(path: &Path) -> (png::Info<'static>, Vec<u8>) {
    let decoder = png::Decoder::new(File::open(path).unwrap());
    let mut reader = decoder.read_info().unwrap();
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf).unwrap();
    buf.truncate(frame.buffer_size());
    (reader.info().clone(), buf)
}

#[test]
fn numbered_files_and_ui_listing() {
    let dir = tempfile::tempdir().unwrap();
    let out = node_in(dir.path()).run(plain_input(rgb_batch(2))).unwrap();

    let names: Vec<_> = out.ui.images.iter().map(|i| i.filename.as_str()).collect();
    assert_eq!(names, ["ComfyUI_00001_.png", "ComfyUI_00002_.png"]);
    for name in names {
        assert!(dir.path().join(name).is_file());
    }

    let v = serde_json::to_value(&out).unwrap();
    assert_eq!(
        v["ui"]["images"][0],
        json!({"filename": "ComfyUI_00001_.png", "subfolder": "", "type": "output"})
    );
}

#[test]
fn counter_continues_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let node = node_in(dir.path());
    node.run(plain_input(rgb_batch(2))).unwrap();
    let out = node.run(plain_input(rgb_batch(1))).unwrap();
    assert_eq!(out.ui.images[0].filename, "ComfyUI_00003_.png");
}

#[test]
fn timestamped_names() {
    let dir = tempfile::tempdir().unwrap();
    let out = node_in(dir.path())
        .run(SaveImageInput::new(rgb_batch(1)))
        .unwrap();
    let name = &out.ui.images[0].filename;
    // ComfyUI_YYYYmmdd-HHMMSS_00001.png
    assert!(name.starts_with("ComfyUI_"));
    assert!(name.ends_with("_00001.png"));
    assert_eq!(name.len(), "ComfyUI_".len() + 15 + "_00001.png".len());
}

#[test]
fn pixels_are_quantised() {
    let dir = tempfile::tempdir().unwrap();
    let out = node_in(dir.path()).run(plain_input(rgb_batch(1))).unwrap();
    let (info, bytes) = read_png(&dir.path().join(&out.ui.images[0].filename));
    assert_eq!((info.width, info.height), (2, 2));
    assert_eq!(info.color_type, png::ColorType::Rgb);
    assert_eq!(&bytes[..3], &[0, 127, 255]);
}

#[test]
fn metadata_goes_into_text_chunks_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let mut extra = Map::new();
    extra.insert("workflow".into(), json!({"nodes": [1, 2]}));
    let input = SaveImageInput {
        prompt: Some(json!({"3": {"class_type": "KSampler"}})),
        extra_pnginfo: Some(extra),
        ..plain_input(rgb_batch(1))
    };
    let out = node_in(dir.path()).run(input).unwrap();
    let path = dir.path().join(&out.ui.images[0].filename);

    let (info, _) = read_png(&path);
    let chunk = |key: &str| {
        info.uncompressed_latin1_text
            .iter()
            .find(|c| c.keyword == key)
            .map(|c| c.text.clone())
    };
    let prompt: Value = serde_json::from_str(&chunk("prompt").unwrap()).unwrap();
    assert_eq!(prompt["3"]["class_type"], "KSampler");
    let workflow: Value = serde_json::from_str(&chunk("workflow").unwrap()).unwrap();
    assert_eq!(workflow, json!({"nodes": [1, 2]}));

    let text = std::fs::read_to_string(path.with_extension("json")).unwrap();
    assert!(text.contains("\n    \"prompt\": {"));
    let sidecar: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(sidecar["workflow"]["nodes"][1], 2);
}

#[test]
fn non_latin1_metadata_uses_itxt() {
    let dir = tempfile::tempdir().unwrap();
    let input = SaveImageInput {
        prompt: Some(json!("🌱 sprout")),
        ..plain_input(rgb_batch(1))
    };
    let out = node_in(dir.path()).run(input).unwrap();
    let (info, _) = read_png(&dir.path().join(&out.ui.images[0].filename));
    assert!(info.uncompressed_latin1_text.is_empty());
    let itxt = info.utf8_text.iter().find(|c| c.keyword == "prompt").unwrap();
    assert_eq!(itxt.get_text().unwrap(), "\"🌱 sprout\"");
}

#[test]
fn json_sidecar_is_optional() {
    let dir = tempfile::tempdir().unwrap();
    let input = SaveImageInput {
        save_metadata_json: false,
        prompt: Some(json!({})),
        ..plain_input(rgb_batch(1))
    };
    let out = node_in(dir.path()).run(input).unwrap();
    let path = dir.path().join(&out.ui.images[0].filename);
    assert!(!path.with_extension("json").exists());
    let (info, _) = read_png(&path);
    assert_eq!(info.uncompressed_latin1_text.len(), 1);
}

#[test]
fn disabled_metadata_writes_bare_png() {
    let dir = tempfile::tempdir().unwrap();
    let mut node = node_in(dir.path());
    node.settings.disable_metadata = true;
    let input = SaveImageInput {
        prompt: Some(json!({"a": 1})),
        ..plain_input(rgb_batch(1))
    };
    let out = node.run(input).unwrap();
    let path = dir.path().join(&out.ui.images[0].filename);
    assert!(!path.with_extension("json").exists());
    let (info, _) = read_png(&path);
    assert!(info.uncompressed_latin1_text.is_empty());
    assert!(info.utf8_text.is_empty());
}

#[test]
fn subfolder_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let input = SaveImageInput {
        filename_prefix: "eden/run".into(),
        ..plain_input(rgb_batch(1))
    };
    let out = node_in(dir.path()).run(input).unwrap();
    assert_eq!(out.ui.images[0].subfolder, "eden");
    assert!(dir.path().join("eden/run_00001_.png").is_file());
}

#[test]
fn invalid_batches_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let node = node_in(dir.path());
    let empty = Tensor::zeros(vec![0, 2, 2, 3]).unwrap();
    assert!(matches!(
        node.run(plain_input(empty)).unwrap_err(),
        NodeError::Validation(_)
    ));
    let five = Tensor::zeros(vec![1, 2, 2, 5]).unwrap();
    assert!(matches!(
        node.run(plain_input(five)).unwrap_err(),
        NodeError::Validation(_)
    ));
    let escape = SaveImageInput {
        filename_prefix: "../out".into(),
        ..plain_input(rgb_batch(1))
    };
    assert!(node.run(escape).is_err());
}
