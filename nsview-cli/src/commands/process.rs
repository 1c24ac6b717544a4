//! Process command implementation

use anyhow::Result;

use nsview_core::ProcessId;
use nsview_topology::{ProcessScope, ReportConfig};

use crate::render::{JsonRenderer, TextRenderer};

pub fn execute(mut config: ReportConfig, pid: ProcessId, json: bool) -> Result<()> {
    let topology = super::collect(&mut config)?;

    let scope = ProcessScope::from_descendants(config.descendants);
    let reports = topology.process_report(pid, scope, config.kinds)?;

    tracing::debug!(pid = %pid, scope = ?scope, "Rendering process report");

    super::with_stdout(|out| {
        if json {
            JsonRenderer::new(&topology, &config).reports(out, &reports, true)
        } else {
            TextRenderer::new(&topology, &config).reports(out, &reports, true)
        }
    })
}
