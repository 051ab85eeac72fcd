//! Merging member implementation info into the package's own.

use std::collections::{BTreeSet, HashSet};

use strata_cache::Import;
use strata_common::{Digest, ModuleName, UnitName};

use crate::info::ImplementationInfo;
use crate::member::PackMember;

/// Builds the implementation info of package `target` from its members.
///
/// Dependencies on members become internal and are dropped from both
/// import lists. When the package's own interface digest is known it heads
/// the interface imports, as for any unit.
pub fn build_package_info(
    target: &UnitName,
    members: &[PackMember],
    own_interface: Option<Digest>,
) -> ImplementationInfo {
    let internal: HashSet<&ModuleName> = members.iter().map(|m| &m.name).collect();
    let infos: Vec<&ImplementationInfo> = members.iter().filter_map(PackMember::info).collect();

    let mut defines: Vec<String> = Vec::new();
    for symbol in infos.iter().flat_map(|info| &info.defines) {
        if !defines.contains(symbol) {
            defines.push(symbol.clone());
        }
    }
    defines.push(target.symbol());

    let mut imports_intf: Vec<Import> = own_interface
        .map(|digest| Import::new(target.module.clone(), digest))
        .into_iter()
        .collect();
    union_into(
        &mut imports_intf,
        infos.iter().flat_map(|info| &info.imports_intf),
        &internal,
    );
    let mut imports_impl = Vec::new();
    union_into(
        &mut imports_impl,
        infos.iter().flat_map(|info| &info.imports_impl),
        &internal,
    );

    ImplementationInfo {
        name: target.clone(),
        defines,
        imports_intf,
        imports_impl,
        curry_fns: sorted_union(infos.iter().map(|info| &info.curry_fns)),
        apply_fns: sorted_union(infos.iter().map(|info| &info.apply_fns)),
        send_fns: sorted_union(infos.iter().map(|info| &info.send_fns)),
        force_link: infos.iter().any(|info| info.force_link),
    }
}

/// Appends each import not already present by name and not internal.
/// A later digest fills in an earlier absent one.
fn union_into<'a>(
    into: &mut Vec<Import>,
    imports: impl Iterator<Item = &'a Import>,
    internal: &HashSet<&ModuleName>,
) {
    for import in imports {
        if internal.contains(&import.name) {
            continue;
        }
        match into.iter_mut().find(|seen| seen.name == import.name) {
            Some(seen) => {
                if seen.digest.is_none() {
                    seen.digest = import.digest;
                }
            }
            None => into.push(import.clone()),
        }
    }
}

fn sorted_union<'a>(lists: impl Iterator<Item = &'a Vec<u32>>) -> Vec<u32> {
    lists.flatten().copied().collect::<BTreeSet<u32>>().into_iter().collect()
}
