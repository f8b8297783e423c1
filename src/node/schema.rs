use crate::foundation::error::NodeResult;

/// Menu category every node in this crate is listed under.
pub const CATEGORY: &str = "Eden 🌱";

/// Value types flowing along graph edges, plus the widget parameters a host renders.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamKind {
    Embeds,
    Latent,
    Image,
    Vae,
    Int {
        default: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Float {
        default: f64,
        min: f64,
        max: f64,
        step: f64,
    },
    String {
        #[serde(skip_serializing_if = "Option::is_none")]
        default: Option<&'static str>,
    },
    Boolean {
        default: bool,
    },
    Choice {
        options: &'static [&'static str],
    },
    /// Hidden input carrying the host's prompt graph.
    Prompt,
    /// Hidden input carrying extra workflow metadata.
    ExtraPngInfo,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct InputDescriptor {
    pub name: &'static str,
    pub kind: ParamKind,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct OutputDescriptor {
    pub name: &'static str,
    pub kind: ParamKind,
}

/// Static interface declaration for one node: what a host needs to wire and draw it.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct NodeDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
    pub inputs: &'static [InputDescriptor],
    pub hidden_inputs: &'static [InputDescriptor],
    pub outputs: &'static [OutputDescriptor],
    /// Output nodes produce side effects (files) and are always executed by the host.
    pub output_node: bool,
}

impl NodeDescriptor {
    pub fn input(&self, name: &str) -> Option<&InputDescriptor> {
        self.inputs
            .iter()
            .chain(self.hidden_inputs)
            .find(|i| i.name == name)
    }
}

/// A node: a typed input record in, a typed output record out.
///
/// Host bindings go through [`Node::descriptor`]; everything else is plain Rust.
pub trait Node {
    type Input;
    type Output;

    fn descriptor() -> &'static NodeDescriptor;

    fn run(&self, input: Self::Input) -> NodeResult<Self::Output>;
}
