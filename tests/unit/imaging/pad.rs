use super::*;

/// `[1, h, w, 1]` image whose value at (y, x) is `f(y, x)`.
fn image(h: usize, w: usize, f: impl Fn(usize, usize) -> f32) -> Tensor {
    let mut data = Vec::with_capacity(h * w);
    for y in 0..h {
        for x in 0..w {
            data.push(f(y, x));
        }
    }
    Tensor::new(vec![1, h, w, 1], data).unwrap()
}

fn pad(image: Tensor, f: f64, side: Side) -> NodeResult<Tensor> {
    ImagePadder.run(PadInput {
        image,
        pad_fraction: f,
        pad_location: side,
    })
}

fn unpad(image: Tensor, f: f64, side: Side) -> NodeResult<Tensor> {
    ImageUnpadder.run(UnpadInput {
        image,
        unpad_fraction: f,
        unpad_location: side,
    })
}

#[test]
fn bottom_border_uses_mean_of_last_rows() {
    let out = pad(image(8, 2, |y, _| y as f32), 0.25, Side::Bottom).unwrap();
    assert_eq!(out.shape(), &[1, 10, 2, 1]);
    assert_eq!(&out.data()[..16], image(8, 2, |y, _| y as f32).data());
    assert!(out.data()[16..].iter().all(|&v| v == 5.5));
}

#[test]
fn top_border_is_prepended() {
    let out = pad(image(8, 2, |y, _| y as f32), 0.25, Side::Top).unwrap();
    assert_eq!(out.shape(), &[1, 10, 2, 1]);
    assert!(out.data()[..4].iter().all(|&v| v == 1.5));
    assert_eq!(out.data()[4], 0.0);
}

#[test]
fn left_and_right_borders_extend_rows() {
    let src = image(2, 8, |_, x| x as f32);
    let left = pad(src.clone(), 0.25, Side::Left).unwrap();
    assert_eq!(left.shape(), &[1, 2, 10, 1]);
    assert_eq!(
        &left.data()[..10],
        &[1.5, 1.5, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]
    );

    let right = pad(src, 0.25, Side::Right).unwrap();
    assert_eq!(&right.data()[8..10], &[5.5, 5.5]);
}

#[test]
fn small_images_average_what_they_have() {
    let out = pad(image(2, 2, |y, x| (y * 2 + x) as f32), 0.5, Side::Bottom).unwrap();
    assert_eq!(out.shape(), &[1, 3, 2, 1]);
    assert_eq!(&out.data()[4..], &[1.5, 1.5]);
}

#[test]
fn zero_fraction_is_identity() {
    let src = image(3, 3, |y, x| (y + x) as f32);
    assert_eq!(pad(src.clone(), 0.0, Side::Left).unwrap(), src);
}

#[test]
fn bad_inputs_are_rejected() {
    assert!(pad(image(2, 2, |_, _| 0.0), 1.5, Side::Top).is_err());
    assert!(pad(image(2, 2, |_, _| 0.0), -0.1, Side::Top).is_err());
    assert!(pad(Tensor::zeros(vec![1, 0, 2, 1]).unwrap(), 0.5, Side::Top).is_err());
    assert!(unpad(image(2, 2, |_, _| 0.0), 2.0, Side::Top).is_err());
}

#[test]
fn unpad_bottom_then_trims_to_multiple_of_four() {
    let out = unpad(image(10, 6, |y, x| (y * 6 + x) as f32), 0.2, Side::Bottom).unwrap();
    assert_eq!(out.shape(), &[1, 8, 4, 1]);
    assert_eq!(&out.data()[..4], &[0.0, 1.0, 2.0, 3.0]);
    assert_eq!(out.data()[4], 6.0);
}

#[test]
fn unpad_top_keeps_the_lower_part() {
    let out = unpad(image(10, 4, |y, _| y as f32), 0.3, Side::Top).unwrap();
    assert_eq!(out.shape(), &[1, 4, 4, 1]);
    assert_eq!(out.data()[0], 3.0);
    assert_eq!(out.data()[15], 6.0);
}

#[test]
fn unpad_left_and_right_cut_columns() {
    let src = image(4, 10, |_, x| x as f32);
    let left = unpad(src.clone(), 0.2, Side::Left).unwrap();
    assert_eq!(left.shape(), &[1, 4, 8, 1]);
    assert_eq!(left.data()[0], 2.0);

    let right = unpad(src, 0.5, Side::Right).unwrap();
    assert_eq!(right.shape(), &[1, 4, 4, 1]);
    assert_eq!(&right.data()[..4], &[0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn pad_then_unpad_restores_aligned_image() {
    let src = image(8, 8, |y, x| (y * 8 + x) as f32 / 64.0);
    let padded = pad(src.clone(), 0.5, Side::Bottom).unwrap();
    assert_eq!(padded.shape(), &[1, 12, 8, 1]);
    // 12 * 0.75 = 9 rows kept, trimmed to 8
    let back = unpad(padded, 0.25, Side::Bottom).unwrap();
    assert_eq!(back, src);
}
