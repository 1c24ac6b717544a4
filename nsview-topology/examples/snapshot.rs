//! Print a one-line summary per namespace kind of the running system
//!
//! Run with: cargo run -p nsview-topology --example snapshot [PROC_ROOT]

use nsview_topology::{NamespaceKind, ProcFs, Result, Topology};

fn main() -> Result<()> {
    let procfs = std::env::args()
        .nth(1)
        .map_or_else(ProcFs::default, ProcFs::new);

    let topology = Topology::collect(&procfs)?;
    println!("{} processes under {}", topology.processes().count(), procfs.root().display());

    for kind in NamespaceKind::ALL {
        let forest = topology.forest(kind);
        let deepest = forest
            .preorder()
            .map(|node| forest.depth(node))
            .max()
            .unwrap_or(0);
        println!(
            "{:<6} {:>4} namespaces, depth {deepest}",
            kind.as_str(),
            topology.count(kind)
        );
    }

    Ok(())
}
