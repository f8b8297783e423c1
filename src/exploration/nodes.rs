use std::path::PathBuf;

use crate::exploration::rotate::random_rotate_embeds;
use crate::exploration::state::ExplorationState;
use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::rng::SeedSource;
use crate::foundation::tensor::{Latent, Tensor};
use crate::node::schema::{
    CATEGORY, InputDescriptor, Node, NodeDescriptor, OutputDescriptor, ParamKind,
};

/// Default file the exploration nodes read and write.
pub const DEFAULT_STATE_FILENAME: &str = "eden_exploration_state.bin";

/// Inputs of [`RandomRotateEmbeds`].
#[derive(Clone, Debug)]
pub struct RandomRotateInput {
    pub pos_embed: Tensor,
    /// Must hold exactly one latent.
    pub latent: Latent,
    pub num_samples: usize,
    pub noise_scale: f32,
    pub seed: u64,
    /// If this file exists, its stored embedding replaces `pos_embed`.
    pub exploration_state_filename: PathBuf,
    /// Ignore `seed` and draw from the wall clock instead (non-reproducible).
    pub reseed_from_clock: bool,
}

impl RandomRotateInput {
    pub fn new(pos_embed: Tensor, latent: Latent) -> Self {
        Self {
            pos_embed,
            latent,
            num_samples: 4,
            noise_scale: 1e-2,
            seed: 4,
            exploration_state_filename: PathBuf::from(DEFAULT_STATE_FILENAME),
            reseed_from_clock: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RandomRotateOutput {
    pub pos_embeds: Tensor,
    /// The single input latent repeated once per embedding.
    pub latent_batch: Latent,
}

/// Exploration sampling: a batch of small random rotations of a seed embedding, paired 1:1
/// with copies of a single latent.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomRotateEmbeds;

static RANDOM_ROTATE_DESCRIPTOR: NodeDescriptor = NodeDescriptor {
    name: "IPAdapterRandomRotateEmbeds",
    display_name: "Random Rotate Embeds",
    category: CATEGORY,
    inputs: &[
        InputDescriptor {
            name: "pos_embed",
            kind: ParamKind::Embeds,
        },
        InputDescriptor {
            name: "latent",
            kind: ParamKind::Latent,
        },
        InputDescriptor {
            name: "num_samples",
            kind: ParamKind::Int {
                default: 4,
                min: Some(1),
                max: None,
            },
        },
        InputDescriptor {
            name: "seed",
            kind: ParamKind::Int {
                default: 4,
                min: Some(0),
                max: None,
            },
        },
        InputDescriptor {
            name: "noise_scale",
            kind: ParamKind::Float {
                default: 1e-2,
                min: 0.0,
                max: 0.5,
                step: 0.01,
            },
        },
        InputDescriptor {
            name: "exploration_state_filename",
            kind: ParamKind::String {
                default: Some(DEFAULT_STATE_FILENAME),
            },
        },
        InputDescriptor {
            name: "reseed_from_clock",
            kind: ParamKind::Boolean { default: false },
        },
    ],
    hidden_inputs: &[],
    outputs: &[
        OutputDescriptor {
            name: "pos_embeds",
            kind: ParamKind::Embeds,
        },
        OutputDescriptor {
            name: "latent_batch",
            kind: ParamKind::Latent,
        },
    ],
    output_node: false,
};

impl Node for RandomRotateEmbeds {
    type Input = RandomRotateInput;
    type Output = RandomRotateOutput;

    fn descriptor() -> &'static NodeDescriptor {
        &RANDOM_ROTATE_DESCRIPTOR
    }

    #[tracing::instrument(skip_all, fields(num_samples = input.num_samples, noise_scale = input.noise_scale))]
    fn run(&self, input: RandomRotateInput) -> NodeResult<RandomRotateOutput> {
        let RandomRotateInput {
            pos_embed,
            latent,
            num_samples,
            noise_scale,
            seed,
            exploration_state_filename,
            reseed_from_clock,
        } = input;

        let latent_batch = latent.samples.batch_len()?;
        if latent_batch != 1 {
            return Err(NodeError::precondition(format!(
                "expected a latent batch of exactly 1, got {latent_batch}"
            )));
        }

        let source = if exploration_state_filename.is_file() {
            tracing::info!(
                path = %exploration_state_filename.display(),
                "loading exploration state"
            );
            ExplorationState::load(&exploration_state_filename)?.into_sample_embed()
        } else {
            tracing::info!("no exploration state found, using the input pos_embed");
            pos_embed
        };

        let seed_source = if reseed_from_clock {
            SeedSource::Clock
        } else {
            SeedSource::Fixed(seed)
        };
        let resolved = seed_source.resolve();
        tracing::debug!(seed = resolved, "perturbation seed");
        let mut rng = SeedSource::Fixed(resolved).rng();

        let stacked = random_rotate_embeds(&source, noise_scale, num_samples, &mut rng)?;
        let pos_embeds = fold_unit_batch(stacked, &source)?;

        Ok(RandomRotateOutput {
            pos_embeds,
            latent_batch: Latent::new(latent.samples.repeat_batch(num_samples)?),
        })
    }
}

// `[N, 1, rest..]` becomes `[N, rest..]` when the source embedding already carried a unit
// batch axis, so axis 0 lines up with the latent batch.
fn fold_unit_batch(stacked: Tensor, source: &Tensor) -> NodeResult<Tensor> {
    match source.shape() {
        [1, rest @ ..] if !rest.is_empty() => {
            let mut shape = Vec::with_capacity(source.rank());
            shape.push(stacked.shape()[0]);
            shape.extend_from_slice(rest);
            stacked.reshape(shape)
        }
        _ => Ok(stacked),
    }
}

/// Inputs of [`SaveExplorationStateNode`].
#[derive(Clone, Debug)]
pub struct SaveStateInput {
    pub pos_embed: Tensor,
    pub filename: PathBuf,
}

/// Persist an embedding as the new exploration seed, replacing any previous state.
#[derive(Clone, Copy, Debug, Default)]
pub struct SaveExplorationStateNode;

static SAVE_STATE_DESCRIPTOR: NodeDescriptor = NodeDescriptor {
    name: "SaveExplorationState",
    display_name: "Save Exploration State",
    category: CATEGORY,
    inputs: &[
        InputDescriptor {
            name: "pos_embed",
            kind: ParamKind::Embeds,
        },
        InputDescriptor {
            name: "filename",
            kind: ParamKind::String {
                default: Some(DEFAULT_STATE_FILENAME),
            },
        },
    ],
    hidden_inputs: &[],
    outputs: &[OutputDescriptor {
        name: "filename",
        kind: ParamKind::String { default: None },
    }],
    output_node: false,
};

impl Node for SaveExplorationStateNode {
    type Input = SaveStateInput;
    type Output = PathBuf;

    fn descriptor() -> &'static NodeDescriptor {
        &SAVE_STATE_DESCRIPTOR
    }

    #[tracing::instrument(skip_all, fields(filename = %input.filename.display()))]
    fn run(&self, input: SaveStateInput) -> NodeResult<PathBuf> {
        ExplorationState::new(input.pos_embed).save(&input.filename)?;
        tracing::info!(path = %input.filename.display(), "saved exploration state");
        Ok(input.filename)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/exploration/nodes.rs"]
mod tests;
