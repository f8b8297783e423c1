use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::tensor::Tensor;

/// Apply one random small-angle rotation to every length-`d` row of `embed`.
///
/// Draws `M` (d×d, i.i.d. standard normal), forms the skew-symmetric `A = (M - Mᵀ) / 2` and
/// returns `embed · (I + epsilon·A)`. This is the first-order approximation of a random
/// rotation: it is not exactly orthonormal, but norms change only by `O(epsilon²)`.
pub fn small_random_rotation<R: Rng + ?Sized>(
    embed: &Tensor,
    epsilon: f32,
    rng: &mut R,
) -> NodeResult<Tensor> {
    let dim = embedding_dim(embed)?;
    check_noise_scale(epsilon)?;

    let rotation = near_identity_rotation(dim, epsilon, rng);
    let mut out = Vec::with_capacity(embed.numel());
    for row in embed.data().chunks_exact(dim) {
        for j in 0..dim {
            let mut acc = 0.0f32;
            for (i, &v) in row.iter().enumerate() {
                acc += v * rotation[i * dim + j];
            }
            out.push(acc);
        }
    }
    Tensor::new(embed.shape().to_vec(), out)
}

/// `num_samples` independent [`small_random_rotation`]s of `embed`, stacked along a new
/// leading axis: the result has shape `[num_samples, ..embed.shape]`.
pub fn random_rotate_embeds<R: Rng + ?Sized>(
    embed: &Tensor,
    noise_scale: f32,
    num_samples: usize,
    rng: &mut R,
) -> NodeResult<Tensor> {
    if num_samples == 0 {
        return Err(NodeError::validation("num_samples must be >= 1"));
    }
    let samples = (0..num_samples)
        .map(|_| small_random_rotation(embed, noise_scale, rng))
        .collect::<NodeResult<Vec<_>>>()?;
    Tensor::stack(&samples)
}

fn embedding_dim(embed: &Tensor) -> NodeResult<usize> {
    match embed.last_dim() {
        Some(d) if d >= 1 => Ok(d),
        Some(_) => Err(NodeError::validation(
            "embedding last dimension must be >= 1",
        )),
        None => Err(NodeError::validation(
            "embedding must have at least one dimension",
        )),
    }
}

fn check_noise_scale(epsilon: f32) -> NodeResult<()> {
    if !epsilon.is_finite() || epsilon < 0.0 {
        return Err(NodeError::validation(format!(
            "noise_scale must be finite and >= 0, got {epsilon}"
        )));
    }
    Ok(())
}

// Row-major d×d matrix I + epsilon·(M - Mᵀ)/2.
fn near_identity_rotation<R: Rng + ?Sized>(dim: usize, epsilon: f32, rng: &mut R) -> Vec<f32> {
    let m: Vec<f32> = (0..dim * dim)
        .map(|_| StandardNormal.sample(&mut *rng))
        .collect();

    let mut r = vec![0.0f32; dim * dim];
    for i in 0..dim {
        for j in 0..dim {
            let skew = (m[i * dim + j] - m[j * dim + i]) / 2.0;
            let identity = if i == j { 1.0 } else { 0.0 };
            r[i * dim + j] = identity + epsilon * skew;
        }
    }
    r
}

#[cfg(test)]
#[path = "../../tests/unit/exploration/rotate.rs"]
mod tests;
