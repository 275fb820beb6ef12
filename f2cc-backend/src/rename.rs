//! Synthesizer Steps 2–3 (§4.4): give every `comb` function a globally
//! unique name, then collapse duplicate bodies scanned in schedule order.
//! The source's "rename every Map/CoalescedMap function" is tightened
//! here to cover `ZipWithN` and `ParallelMap` too, since the same
//! global-uniqueness need applies to them; recorded in `DESIGN.md`.

use f2cc_ir::{CombKind, Function, Leaf, LeafVariant, ProcessId, ProcessNetwork};
use f2cc_utils::{Error, F2ccResult, Id};
use std::collections::HashMap;

/// Rename every function referenced by a `comb` leaf to
/// `f<leaf-id>_<original-name><index>` and, in the same schedule-order
/// pass, fold together any two references whose (original name, body
/// text) pair has already been seen (§4.4 Step 3) — functions parsed
/// from the rich XML dialect always carry an empty body (§4.1), so in
/// practice this collapses repeated references to the very same
/// external function, which is the common case the source optimizes for.
pub fn rename_and_dedup_functions(
    net: &mut ProcessNetwork,
    schedule: &[ProcessId],
) -> F2ccResult<()> {
    let mut canonical: HashMap<(Id, String), Id> = HashMap::new();

    for &id in schedule {
        let leaf_name = net.process(id).id();
        let Some(leaf) = net.process(id).as_leaf() else {
            continue;
        };
        let LeafVariant::Comb(kind) = &leaf.variant else {
            continue;
        };
        let old_functions = kind.functions();
        let mut new_functions = Vec::with_capacity(old_functions.len());

        for (idx, old_name) in old_functions.iter().enumerate() {
            let old_fn = net.functions.get(*old_name).cloned().ok_or_else(|| {
                Error::illegal_state(format!(
                    "function `{old_name}` referenced by `{leaf_name}` is not registered"
                ))
            })?;
            let key = (*old_name, old_fn.body.clone());
            let canonical_name = *canonical.entry(key).or_insert_with(|| {
                let new_name = Id::new(format!("f{leaf_name}_{old_name}{idx}"));
                let mut renamed = old_fn.clone();
                renamed.name = new_name;
                net.functions.insert(renamed);
                new_name
            });
            new_functions.push(canonical_name);
        }

        set_functions(net.process_mut(id).as_leaf_mut().unwrap(), new_functions);
    }
    Ok(())
}

fn set_functions(leaf: &mut Leaf, names: Vec<Id>) {
    if let LeafVariant::Comb(kind) = &mut leaf.variant {
        *kind = match kind {
            CombKind::Map(_) => CombKind::Map(names[0]),
            CombKind::ZipWithN(_) => CombKind::ZipWithN(names[0]),
            CombKind::CoalescedMap(_) => CombKind::CoalescedMap(names),
            CombKind::ParallelMap { replication, .. } => CombKind::ParallelMap {
                replication: *replication,
                functions: names,
            },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use f2cc_ir::{DataType, Direction, Param, Port, PrimKind, Process, ProcessCommon};

    fn scalar_fn(net: &mut ProcessNetwork, name: &str) {
        let ty = DataType::scalar(PrimKind::Int32);
        net.functions.insert(Function::new(
            name,
            vec![Param::input("x", ty.clone())],
            Some(ty),
            "",
        ));
    }

    fn map_leaf(net: &mut ProcessNetwork, name: &str, fname: &str) -> ProcessId {
        let root = net.root;
        let scalar = DataType::scalar(PrimKind::Int32);
        let id = net.reserve_process();
        let in_p = net.add_port(Port::new("in1", id, Direction::In, scalar.clone()));
        let out_p = net.add_port(Port::new("out1", id, Direction::Out, scalar));
        net.install_process(
            id,
            Process::Leaf(Leaf {
                common: ProcessCommon::new(name, Some(root)),
                in_ports: vec![in_p],
                out_ports: vec![out_p],
                variant: LeafVariant::Comb(CombKind::Map(fname.into())),
            }),
        );
        net.process_mut(root)
            .as_composite_mut()
            .unwrap()
            .children
            .push(id);
        id
    }

    #[test]
    fn two_leaves_calling_the_same_original_function_get_distinct_renamed_copies() {
        let mut net = ProcessNetwork::new("t");
        scalar_fn(&mut net, "f");
        let a = map_leaf(&mut net, "map1", "f");
        let b = map_leaf(&mut net, "map2", "f");

        rename_and_dedup_functions(&mut net, &[a, b]).unwrap();

        let name_of = |net: &ProcessNetwork, id: ProcessId| -> Id {
            let LeafVariant::Comb(CombKind::Map(n)) = &net.process(id).as_leaf().unwrap().variant
            else {
                unreachable!()
            };
            *n
        };
        let na = name_of(&net, a);
        let nb = name_of(&net, b);
        assert_ne!(na, nb);
        assert!(net.functions.contains(na));
        assert!(net.functions.contains(nb));
    }
}
