//! Namespace command implementation

use anyhow::Result;

use nsview_core::NamespaceId;
use nsview_topology::ReportConfig;

use crate::render::{JsonRenderer, TextRenderer};

pub fn execute(mut config: ReportConfig, nid: NamespaceId, json: bool) -> Result<()> {
    let topology = super::collect(&mut config)?;
    let namespace = topology.namespace_by_id(nid)?;

    super::with_stdout(|out| {
        if json {
            JsonRenderer::new(&topology, &config).namespace(out, namespace)
        } else {
            TextRenderer::new(&topology, &config).namespace(out, namespace)
        }
    })
}
