//! The Process Network (§3): the root container, its arenas, and the
//! generic connect/disconnect primitives every ModelModifier pass is
//! built from.

use crate::function::FunctionRegistry;
use crate::port::{Direction, Endpoint, Face, IOPort, IOPortId, Port, PortId};
use crate::process::{Composite, Leaf, Process, ProcessCommon, ProcessId};
use f2cc_utils::{Error, F2ccResult, Id};
use std::collections::HashMap;

/// Conventional name of the root composite (§3).
pub const ROOT_NAME: &str = "f2cc0";

/// The root container (§3): a Composite, model-level input/output
/// interfaces, the function registry, and the id generators for fresh
/// processes and signals.
pub struct ProcessNetwork {
    pub name: String,
    processes: Vec<Process>,
    ports: Vec<Port>,
    io_ports: Vec<IOPort>,
    pub root: ProcessId,
    /// Model-level input interfaces, in declaration order.
    pub model_inputs: Vec<Endpoint>,
    /// Model-level output interfaces, in declaration order.
    pub model_outputs: Vec<Endpoint>,
    pub functions: FunctionRegistry,
    next_process_suffix: u64,
    next_signal_suffix: u64,
}

impl ProcessNetwork {
    /// Create a network with an empty root composite named [`ROOT_NAME`].
    pub fn new(name: impl Into<String>) -> Self {
        let mut processes = Vec::new();
        let root = ProcessId(0);
        processes.push(Process::Composite(Composite {
            common: ProcessCommon::new(ROOT_NAME, None),
            children: Vec::new(),
            io_ports: Vec::new(),
            parallel: None,
        }));
        ProcessNetwork {
            name: name.into(),
            processes,
            ports: Vec::new(),
            io_ports: Vec::new(),
            root,
            model_inputs: Vec::new(),
            model_outputs: Vec::new(),
            functions: FunctionRegistry::new(),
            next_process_suffix: 0,
            next_signal_suffix: 0,
        }
    }

    // ---------------- arena accessors ----------------

    pub fn process(&self, id: ProcessId) -> &Process {
        &self.processes[id.0]
    }

    pub fn process_mut(&mut self, id: ProcessId) -> &mut Process {
        &mut self.processes[id.0]
    }

    pub fn process_ids(&self) -> impl Iterator<Item = ProcessId> {
        (0..self.processes.len()).map(ProcessId)
    }

    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id.0]
    }

    pub fn port_mut(&mut self, id: PortId) -> &mut Port {
        &mut self.ports[id.0]
    }

    pub fn io_port(&self, id: IOPortId) -> &IOPort {
        &self.io_ports[id.0]
    }

    pub fn io_port_mut(&mut self, id: IOPortId) -> &mut IOPort {
        &mut self.io_ports[id.0]
    }

    /// The data type that an [`Endpoint`] exposes to whoever connects to it.
    pub fn endpoint_type(&self, ep: Endpoint) -> &crate::DataType {
        match ep {
            Endpoint::Leaf(p) => &self.port(p).data_type,
            Endpoint::Io(io, face) => self.io_port(io).data_type(face),
        }
    }

    pub fn endpoint_owner(&self, ep: Endpoint) -> ProcessId {
        match ep {
            Endpoint::Leaf(p) => self.port(p).owner,
            Endpoint::Io(io, _) => self.io_port(io).owner,
        }
    }

    pub fn endpoint_direction(&self, ep: Endpoint) -> Direction {
        match ep {
            Endpoint::Leaf(p) => self.port(p).direction,
            Endpoint::Io(io, _) => self.io_port(io).direction,
        }
    }

    pub fn endpoint_id(&self, ep: Endpoint) -> Id {
        match ep {
            Endpoint::Leaf(p) => self.port(p).id,
            Endpoint::Io(io, _) => self.io_port(io).id,
        }
    }

    fn peer_slot(&mut self, ep: Endpoint) -> &mut Option<Endpoint> {
        match ep {
            Endpoint::Leaf(p) => &mut self.port_mut(p).peer,
            Endpoint::Io(io, Face::Inside) => {
                &mut self.io_port_mut(io).inside_peer
            }
            Endpoint::Io(io, Face::Outside) => {
                &mut self.io_port_mut(io).outside_peer
            }
        }
    }

    pub fn peer_of(&self, ep: Endpoint) -> Option<Endpoint> {
        match ep {
            Endpoint::Leaf(p) => self.port(p).peer,
            Endpoint::Io(io, face) => self.io_port(io).peer(face),
        }
    }

    // ---------------- connection primitives ----------------

    /// Symmetrically bind two endpoints (§3 invariant 2). Either side
    /// may already be connected; the old peer, if any, is left dangling
    /// (callers that need a clean rewrite should `disconnect` first).
    pub fn connect(&mut self, a: Endpoint, b: Endpoint) {
        *self.peer_slot(a) = Some(b);
        *self.peer_slot(b) = Some(a);
    }

    /// Symmetrically clear a connection. No-op if either side was
    /// already unbound or bound to something else.
    pub fn disconnect(&mut self, a: Endpoint) {
        if let Some(b) = self.peer_of(a) {
            *self.peer_slot(a) = None;
            *self.peer_slot(b) = None;
        }
    }

    // ---------------- construction helpers ----------------

    /// Allocate a new process id slot without yet installing the
    /// process (used by constructors that need a stable id up front to
    /// cross-reference, e.g. a ParallelComposite and its contained leaf).
    pub fn reserve_process(&mut self) -> ProcessId {
        let id = ProcessId(self.processes.len());
        // placeholder composite; overwritten by `install_process`
        self.processes.push(Process::Composite(Composite {
            common: ProcessCommon::new("<reserved>", None),
            children: Vec::new(),
            io_ports: Vec::new(),
            parallel: None,
        }));
        id
    }

    pub fn install_process(&mut self, id: ProcessId, process: Process) {
        self.processes[id.0] = process;
    }

    pub fn add_process(&mut self, process: Process) -> ProcessId {
        let id = ProcessId(self.processes.len());
        self.processes.push(process);
        id
    }

    pub fn add_port(&mut self, port: Port) -> PortId {
        let id = PortId(self.ports.len());
        self.ports.push(port);
        id
    }

    pub fn add_io_port(&mut self, io_port: IOPort) -> IOPortId {
        let id = IOPortId(self.io_ports.len());
        self.io_ports.push(io_port);
        id
    }

    /// Fresh numeric suffix for synthesized process ids (e.g. a
    /// `fanout` inserted by the frontend, or a `zipx`/`unzipx` inserted
    /// by redundancy-aware passes).
    pub fn fresh_process_suffix(&mut self) -> u64 {
        self.next_process_suffix += 1;
        self.next_process_suffix
    }

    /// Fresh numeric suffix for synthesizer-generated signal names.
    pub fn fresh_signal_suffix(&mut self) -> u64 {
        self.next_signal_suffix += 1;
        self.next_signal_suffix
    }

    /// Recompute `hierarchy` for `id` from its current `parent` chain,
    /// and recurse into composite children. Call after any reparenting
    /// to restore §3 invariant 3.
    pub fn recompute_hierarchy(&mut self, id: ProcessId) {
        let mut path = Vec::new();
        let mut cur = self.process(id).common().parent;
        while let Some(p) = cur {
            path.push(self.process(p).id());
            cur = self.process(p).common().parent;
        }
        path.reverse();
        self.process_mut(id).common_mut().hierarchy = path;
        if let Some(children) =
            self.process(id).as_composite().map(|c| c.children.clone())
        {
            for child in children {
                self.recompute_hierarchy(child);
            }
        }
    }

    /// Look up a child of `parent` by Id (§3: unique within parent).
    pub fn find_child(&self, parent: ProcessId, name: Id) -> Option<ProcessId> {
        self.process(parent)
            .as_composite()?
            .children
            .iter()
            .copied()
            .find(|c| self.process(*c).id() == name)
    }

    /// All leaves reachable by descending the composite hierarchy from
    /// `root`, used by the scheduler and by §8 property 3.
    pub fn reachable_leaves(&self, root: ProcessId) -> Vec<ProcessId> {
        let mut out = Vec::new();
        self.collect_leaves(root, &mut out);
        out
    }

    fn collect_leaves(&self, id: ProcessId, out: &mut Vec<ProcessId>) {
        match self.process(id) {
            Process::Leaf(_) => out.push(id),
            Process::Composite(c) => {
                for child in c.children.clone() {
                    self.collect_leaves(child, out);
                }
            }
        }
    }

    // ---------------- invariant checking (§3, §8) ----------------

    /// Validate every §3 invariant that can be checked structurally
    /// (symmetry, containment, arity, uniqueness, MoC consistency).
    /// Called after the frontend and after every ModelModifier pass.
    pub fn check_invariants(&self) -> F2ccResult<()> {
        self.check_symmetry()?;
        self.check_containment()?;
        self.check_arity()?;
        self.check_unique_ids()?;
        self.check_moc()?;
        Ok(())
    }

    fn check_symmetry(&self) -> F2ccResult<()> {
        for (i, p) in self.ports.iter().enumerate() {
            if let Some(peer) = p.peer {
                if self.peer_of(peer) != Some(Endpoint::Leaf(PortId(i))) {
                    return Err(Error::invalid_model(format!(
                        "port `{}` peer link is not symmetric",
                        p.id
                    )));
                }
            }
        }
        for (i, io) in self.io_ports.iter().enumerate() {
            for face in [Face::Inside, Face::Outside] {
                if let Some(peer) = io.peer(face) {
                    if self.peer_of(peer) != Some(Endpoint::Io(IOPortId(i), face))
                    {
                        return Err(Error::invalid_model(format!(
                            "ioport `{}` {:?} peer link is not symmetric",
                            io.id, face
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_containment(&self) -> F2ccResult<()> {
        for id in self.process_ids() {
            if let Some(c) = self.process(id).as_composite() {
                for child in &c.children {
                    if self.process(*child).common().parent != Some(id) {
                        return Err(Error::invalid_model(format!(
                            "process `{}` is a child of `{}` but its \
                             parent field disagrees",
                            self.process(*child).id(),
                            self.process(id).id(),
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_arity(&self) -> F2ccResult<()> {
        for id in self.process_ids() {
            if let Some(leaf) = self.process(id).as_leaf() {
                leaf.check_arity().map_err(Error::invalid_process)?;
            }
        }
        Ok(())
    }

    fn check_unique_ids(&self) -> F2ccResult<()> {
        for id in self.process_ids() {
            if let Some(c) = self.process(id).as_composite() {
                let mut seen = std::collections::HashSet::new();
                for child in &c.children {
                    let name = self.process(*child).id();
                    if !seen.insert(name) {
                        return Err(Error::illegal_state(format!(
                            "duplicate process id `{name}` within `{}`",
                            self.process(id).id()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_moc(&self) -> F2ccResult<()> {
        // All processes currently carry `Moc::Sy`; once a second MoC is
        // introduced this should walk every signal and compare endpoints.
        for id in self.process_ids() {
            let _moc = self.process(id).common().moc;
        }
        Ok(())
    }

    /// Group Ids reachable under a composite, by component/function name
    /// identity, for hierarchical parallelization (§4.2.7). Returns the
    /// equivalence classes among *direct children* of `parent`.
    pub fn equivalence_classes(
        &self,
        parent: ProcessId,
    ) -> Vec<Vec<ProcessId>> {
        let mut groups: HashMap<String, Vec<ProcessId>> = HashMap::new();
        let Some(c) = self.process(parent).as_composite() else {
            return Vec::new();
        };
        for &child in &c.children {
            let key = self.equivalence_key(child);
            groups.entry(key).or_default().push(child);
        }
        groups.into_values().collect()
    }

    fn equivalence_key(&self, id: ProcessId) -> String {
        match self.process(id) {
            Process::Composite(_) => {
                format!("composite::{}", self.process(id).id())
            }
            Process::Leaf(l) => match &l.variant {
                crate::LeafVariant::Comb(kind) => {
                    format!("comb::{:?}", kind.functions())
                }
                other => format!("other::{}", other.name()),
            },
        }
    }
}
