//! Show command implementation

use anyhow::Result;

use nsview_topology::ReportConfig;

use crate::render::{JsonRenderer, TextRenderer};

pub fn execute(mut config: ReportConfig, json: bool) -> Result<()> {
    let topology = super::collect(&mut config)?;
    let reports = topology.report(config.kinds);

    tracing::debug!(kinds = %config.kinds, "Rendering full report");

    super::with_stdout(|out| {
        if json {
            JsonRenderer::new(&topology, &config).reports(out, &reports, false)
        } else {
            TextRenderer::new(&topology, &config).reports(out, &reports, false)
        }
    })
}
