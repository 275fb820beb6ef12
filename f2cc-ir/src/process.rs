//! The process hierarchy (§3): Leaf and Composite as a tagged union
//! with no deep inheritance, per §9's design note.

use crate::{IOPortId, PortId};
use f2cc_utils::Id;

/// Index of a [`Process`] in [`crate::ProcessNetwork::processes`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct ProcessId(pub usize);

/// Model of computation tag. Only `Sy` (synchronous) exists today; the
/// type exists so that a future MoC addition does not require
/// revisiting every call site (§3 invariant 7 depends on comparing it).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Moc {
    Sy,
}

impl Moc {
    pub fn as_str(&self) -> &'static str {
        match self {
            Moc::Sy => "sy",
        }
    }
}

/// Fields shared by every process, leaf or composite.
#[derive(Clone, Debug)]
pub struct ProcessCommon {
    pub id: Id,
    pub parent: Option<ProcessId>,
    /// Ordered ancestor Ids from the root, most-distant first.
    pub hierarchy: Vec<Id>,
    pub moc: Moc,
}

impl ProcessCommon {
    pub fn new(id: impl Into<Id>, parent: Option<ProcessId>) -> Self {
        ProcessCommon {
            id: id.into(),
            parent,
            hierarchy: Vec::new(),
            moc: Moc::Sy,
        }
    }
}

/// A function reference used by a combinatorial leaf. Plain combs carry
/// one; `CoalescedMap`/`ParallelMap` carry an ordered list (§3).
pub type FunctionRef = Id;

/// Sub-variants of a combinatorial leaf, used by the ModelModifier and
/// Synthesizer (§3, §4.2, §4.4).
#[derive(Clone, Debug)]
pub enum CombKind {
    /// A single-input combinational function.
    Map(FunctionRef),
    /// A k>1-input combinational function (k equals the leaf's in-arity).
    ZipWithN(FunctionRef),
    /// A fused sequential chain of single-input functions, in order.
    CoalescedMap(Vec<FunctionRef>),
    /// N independent replicas of the same function chain, applied to
    /// disjoint stripes of an array input.
    ParallelMap {
        replication: u64,
        functions: Vec<FunctionRef>,
    },
}

impl CombKind {
    /// The ordered function-name list this leaf applies, in execution order.
    pub fn functions(&self) -> Vec<FunctionRef> {
        match self {
            CombKind::Map(f) | CombKind::ZipWithN(f) => vec![*f],
            CombKind::CoalescedMap(fs) => fs.clone(),
            CombKind::ParallelMap { functions, .. } => functions.clone(),
        }
    }

    pub fn replication(&self) -> Option<u64> {
        match self {
            CombKind::ParallelMap { replication, .. } => Some(*replication),
            _ => None,
        }
    }
}

/// The distinguishing behavior of a [`Leaf`] (§3).
#[derive(Clone, Debug)]
pub enum LeafVariant {
    Comb(CombKind),
    /// A one-element state register; exactly 1 in-port, 1 out-port.
    Delay { init_value: String },
    /// Converges multiple inputs into one array output.
    ZipX,
    /// Diverges one array input into multiple outputs.
    UnzipX,
    /// Duplicates its single input to all outputs.
    Fanout,
}

impl LeafVariant {
    pub fn name(&self) -> &'static str {
        match self {
            LeafVariant::Comb(CombKind::Map(_)) => "Map",
            LeafVariant::Comb(CombKind::ZipWithN(_)) => "ZipWithN",
            LeafVariant::Comb(CombKind::CoalescedMap(_)) => "CoalescedMap",
            LeafVariant::Comb(CombKind::ParallelMap { .. }) => "ParallelMap",
            LeafVariant::Delay { .. } => "delay",
            LeafVariant::ZipX => "zipx",
            LeafVariant::UnzipX => "unzipx",
            LeafVariant::Fanout => "fanout",
        }
    }
}

/// A process with no internal processes (§3).
#[derive(Clone, Debug)]
pub struct Leaf {
    pub common: ProcessCommon,
    pub in_ports: Vec<PortId>,
    pub out_ports: Vec<PortId>,
    pub variant: LeafVariant,
}

impl Leaf {
    /// §3 invariant 4: per-variant arity constraints.
    pub fn check_arity(&self) -> Result<(), String> {
        let (nin, nout) = (self.in_ports.len(), self.out_ports.len());
        match &self.variant {
            LeafVariant::Delay { .. } => {
                if nin != 1 || nout != 1 {
                    return Err(format!(
                        "delay `{}` must have exactly 1 in-port and 1 \
                         out-port, has {nin}/{nout}",
                        self.common.id
                    ));
                }
            }
            LeafVariant::Fanout => {
                if nin != 1 {
                    return Err(format!(
                        "fanout `{}` must have exactly 1 in-port, has {nin}",
                        self.common.id
                    ));
                }
            }
            LeafVariant::ZipX => {
                if nin < 1 || nout != 1 {
                    return Err(format!(
                        "zipx `{}` must have >=1 in-ports and 1 out-port",
                        self.common.id
                    ));
                }
            }
            LeafVariant::UnzipX => {
                if nin != 1 || nout < 1 {
                    return Err(format!(
                        "unzipx `{}` must have 1 in-port and >=1 out-ports",
                        self.common.id
                    ));
                }
            }
            LeafVariant::Comb(kind) => {
                let expected_in = match kind {
                    CombKind::Map(_) => 1,
                    CombKind::ZipWithN(_) => nin.max(1),
                    CombKind::CoalescedMap(_) => 1,
                    CombKind::ParallelMap { .. } => 1,
                };
                if nout != 1 {
                    return Err(format!(
                        "comb `{}` must have exactly 1 out-port",
                        self.common.id
                    ));
                }
                if matches!(kind, CombKind::Map(_) | CombKind::CoalescedMap(_) | CombKind::ParallelMap { .. })
                    && nin != expected_in
                {
                    return Err(format!(
                        "comb `{}` ({}) must have exactly {expected_in} \
                         in-port(s), has {nin}",
                        self.common.id,
                        self.variant.name()
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A [`Process`] that groups children hierarchically (§3).
#[derive(Clone, Debug)]
pub struct Composite {
    pub common: ProcessCommon,
    pub children: Vec<ProcessId>,
    pub io_ports: Vec<IOPortId>,
    /// `Some` iff this is a `ParallelComposite`.
    pub parallel: Option<ParallelInfo>,
}

/// Replication data for a `ParallelComposite` (§3): apply `contained`
/// to each of `replication` stripes of an N-wide input.
#[derive(Clone, Debug)]
pub struct ParallelInfo {
    pub replication: u64,
    pub contained: ProcessId,
}

/// A process: Leaf or Composite, a tagged union with no shared
/// supertype other than [`ProcessCommon`] (§9).
#[derive(Clone, Debug)]
pub enum Process {
    Leaf(Leaf),
    Composite(Composite),
}

impl Process {
    pub fn common(&self) -> &ProcessCommon {
        match self {
            Process::Leaf(l) => &l.common,
            Process::Composite(c) => &c.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut ProcessCommon {
        match self {
            Process::Leaf(l) => &mut l.common,
            Process::Composite(c) => &mut c.common,
        }
    }

    pub fn id(&self) -> Id {
        self.common().id
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Process::Leaf(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut Leaf> {
        match self {
            Process::Leaf(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&Composite> {
        match self {
            Process::Composite(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_composite_mut(&mut self) -> Option<&mut Composite> {
        match self {
            Process::Composite(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Process::Leaf(_))
    }
}
