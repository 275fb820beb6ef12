//! The synthesizer-level view of one edge of the Process Network (§3,
//! §4.4 Step 6). A `Signal` is a pair of endpoints, at most one inferred
//! data type, and a generated variable name; it borrows two ports but is
//! owned by the synthesizer's signal set, never by the graph itself.

use crate::{DataType, Endpoint};

/// One edge of the schedule: `out` is `None` when the signal is driven by
/// a model-level input, `in_` is `None` when it drives a model-level
/// output. At most one side is `None` (§3).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signal {
    pub out: Option<Endpoint>,
    pub in_: Option<Endpoint>,
}

impl Signal {
    pub fn new(out: Option<Endpoint>, in_: Option<Endpoint>) -> Self {
        debug_assert!(
            out.is_some() || in_.is_some(),
            "a signal must have at least one bound endpoint"
        );
        Signal { out, in_ }
    }

    pub fn is_model_input(&self) -> bool {
        self.out.is_none()
    }

    pub fn is_model_output(&self) -> bool {
        self.in_.is_none()
    }
}

/// A signal together with the state the synthesizer accumulates onto it:
/// inferred type, array size, and generated C variable name. Kept
/// separate from [`Signal`] itself so the deduplication key (the bare
/// endpoint pair, per §9) stays independent of the mutable annotation.
#[derive(Clone, Debug, Default)]
pub struct SignalInfo {
    pub data_type: Option<DataType>,
    pub var_name: Option<String>,
}

impl SignalInfo {
    pub fn new() -> Self {
        Self::default()
    }
}
