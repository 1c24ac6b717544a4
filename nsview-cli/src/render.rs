//! Text and JSON presentation of topology reports

use serde::Serialize;
use std::io::{self, Write};

use nix::unistd::{Gid, Group, Uid, User};
use nsview_core::{NamespaceId, NamespaceKind};
use nsview_topology::{ForestReport, Namespace, Process, ReportConfig, ReportEntry, Topology};

const BRANCH: &str = "     +";
const RULE: &str = "     | ";
/// Width of the longest attribute title, "Owner user namespace"
const TITLE_WIDTH: usize = 20;
const DEFAULT_COLUMNS: usize = 80;

/// Renders reports as the indented namespace tree
pub struct TextRenderer<'a> {
    topology: &'a Topology,
    show_members: bool,
    extended: bool,
    columns: usize,
}

impl<'a> TextRenderer<'a> {
    pub fn new(topology: &'a Topology, config: &ReportConfig) -> Self {
        Self {
            topology,
            show_members: config.show_members,
            extended: config.extended,
            columns: terminal_columns(),
        }
    }

    /// Override the terminal width used to wrap member lists
    #[cfg(test)]
    pub const fn with_columns(mut self, columns: usize) -> Self {
        self.columns = columns;
        self
    }

    /// Print one section per report; empty reports are skipped when
    /// `skip_empty` is set
    pub fn reports<W: Write>(
        &self,
        out: &mut W,
        reports: &[ForestReport],
        skip_empty: bool,
    ) -> io::Result<()> {
        for report in reports {
            if skip_empty && report.is_empty() {
                continue;
            }
            writeln!(out, "Namespace: {}", report.kind)?;
            for entry in report.entries() {
                self.node(out, report.kind, entry, report.relative_depth(entry))?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn node<W: Write>(
        &self,
        out: &mut W,
        kind: NamespaceKind,
        entry: &ReportEntry,
        depth: u32,
    ) -> io::Result<()> {
        writeln!(out, "{}-- [{kind}][{}]", BRANCH.repeat(depth as usize), entry.nid)?;

        let Some(namespace) = self.topology.namespace(kind, entry.nid) else {
            return Ok(());
        };

        if self.extended {
            self.attributes(out, namespace, depth as usize + 1)?;
        }

        if self.show_members {
            let inner = depth as usize + 1;
            writeln!(out, "{}", RULE.repeat(inner))?;
            for process in self.topology.members(namespace) {
                writeln!(
                    out,
                    "{}-- {} <{}>",
                    BRANCH.repeat(inner),
                    process.name(),
                    process.pid()
                )?;
            }
            writeln!(out, "{}", RULE.repeat(inner))?;
        }

        Ok(())
    }

    /// Print the full description of a single namespace
    pub fn namespace<W: Write>(&self, out: &mut W, namespace: &Namespace) -> io::Result<()> {
        writeln!(out, "{:<TITLE_WIDTH$}: {}", "Type", namespace.kind())?;
        writeln!(out, "{:<TITLE_WIDTH$}: {}", "ID", namespace.nid())?;
        self.attributes(out, namespace, 0)?;

        if self.show_members {
            let members: Vec<String> = self
                .topology
                .members(namespace)
                .map(|p| format!("{} <{}>", p.name(), p.pid()))
                .collect();
            let prefix = format!("{:<TITLE_WIDTH$}: ", "Member processes");
            for line in wrap_list(&prefix, &members, self.columns) {
                writeln!(out, "{line}")?;
            }
        }

        Ok(())
    }

    fn attributes<W: Write>(
        &self,
        out: &mut W,
        namespace: &Namespace,
        depth: usize,
    ) -> io::Result<()> {
        let rule = RULE.repeat(depth);
        let creator = self.topology.creator(namespace);

        let first_member = creator.map_or_else(
            || "Unknown".to_string(),
            |p| format!("{} <{}>", p.name(), p.pid()),
        );
        writeln!(out, "{rule}{:<TITLE_WIDTH$}: {first_member}", "First member")?;

        let (user, group) = creator.map_or_else(
            || ("Unknown [Unknown]".to_string(), "Unknown [Unknown]".to_string()),
            |p| (user_label(p), group_label(p)),
        );
        writeln!(out, "{rule}{:<TITLE_WIDTH$}: {user}", "User")?;
        writeln!(out, "{rule}{:<TITLE_WIDTH$}: {group}", "Group")?;

        let parent = if namespace.pnid().is_known() {
            namespace.pnid().to_string()
        } else {
            "-".to_string()
        };
        writeln!(out, "{rule}{:<TITLE_WIDTH$}: {parent}", "Parent namespace ID")?;

        let owner = self
            .topology
            .owner_user_namespace(namespace)
            .map_or_else(|| "Unknown".to_string(), |ns| ns.nid().to_string());
        writeln!(out, "{rule}{:<TITLE_WIDTH$}: {owner}", "Owner user namespace")?;

        writeln!(
            out,
            "{rule}{:<TITLE_WIDTH$}: {}",
            "Member Processes",
            namespace.members().len()
        )?;

        if namespace.kind() == NamespaceKind::User {
            let maps = [("UID Map", namespace.uid_map()), ("GID Map", namespace.gid_map())];
            for (title, map) in maps {
                let width = TITLE_WIDTH - title.len() - 1;
                for (slot, entry) in map.slots().iter().enumerate().filter(|(_, e)| e.is_used()) {
                    writeln!(out, "{rule}{title} {slot:<width$}: {entry}")?;
                }
            }
        }

        Ok(())
    }
}

fn user_label(process: &Process) -> String {
    let name = User::from_uid(Uid::from_raw(process.uid()))
        .ok()
        .flatten()
        .map_or_else(|| "Unknown".to_string(), |u| u.name);
    format!("{name} [{}]", process.uid())
}

fn group_label(process: &Process) -> String {
    let name = Group::from_gid(Gid::from_raw(process.gid()))
        .ok()
        .flatten()
        .map_or_else(|| "Unknown".to_string(), |g| g.name);
    format!("{name} [{}]", process.gid())
}

/// Lay out `items` as a comma separated list after `prefix`, breaking lines
/// before they would exceed `columns`
fn wrap_list(prefix: &str, items: &[String], columns: usize) -> Vec<String> {
    let indent = " ".repeat(prefix.len());
    let mut lines = Vec::new();
    let mut line = prefix.to_string();
    let mut line_has_item = false;

    for (i, item) in items.iter().enumerate() {
        let piece = if i + 1 < items.len() {
            format!("{item}, ")
        } else {
            item.clone()
        };
        if line_has_item && line.len() + piece.len() > columns {
            lines.push(line.trim_end().to_string());
            line = indent.clone();
        }
        line.push_str(&piece);
        line_has_item = true;
    }

    lines.push(line.trim_end().to_string());
    lines
}

fn terminal_columns() -> usize {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    // SAFETY: TIOCGWINSZ only fills the winsize struct it is given
    let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut size) };
    if rc == 0 && size.ws_col > 0 {
        usize::from(size.ws_col)
    } else {
        DEFAULT_COLUMNS
    }
}

/// One reported namespace in JSON output
#[derive(Serialize)]
struct JsonEntry<'a> {
    depth: u32,
    orphaned: bool,
    owner_user_namespace: Option<NamespaceId>,
    namespace: &'a Namespace,
    #[serde(skip_serializing_if = "Option::is_none")]
    processes: Option<Vec<&'a Process>>,
    /// Parented namespaces below an orphan
    #[serde(skip_serializing_if = "Option::is_none")]
    subtree: Option<Vec<JsonEntry<'a>>>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    kind: NamespaceKind,
    parented: Vec<JsonEntry<'a>>,
    orphaned: Vec<JsonEntry<'a>>,
}

/// Renders reports as JSON
pub struct JsonRenderer<'a> {
    topology: &'a Topology,
    show_members: bool,
}

impl<'a> JsonRenderer<'a> {
    pub const fn new(topology: &'a Topology, config: &ReportConfig) -> Self {
        Self {
            topology,
            show_members: config.show_members,
        }
    }

    pub fn reports<W: Write>(
        &self,
        out: &mut W,
        reports: &[ForestReport],
        skip_empty: bool,
    ) -> io::Result<()> {
        let json: Vec<JsonReport<'_>> = reports
            .iter()
            .filter(|report| !(skip_empty && report.is_empty()))
            .map(|report| JsonReport {
                kind: report.kind,
                parented: self.entries(report, report.attached()),
                orphaned: report
                    .branches()
                    .into_iter()
                    .filter_map(|(orphan, subtree)| {
                        let mut entry = self.report_entry(report, orphan)?;
                        entry.subtree = Some(self.entries(report, subtree));
                        Some(entry)
                    })
                    .collect(),
            })
            .collect();

        serde_json::to_writer_pretty(&mut *out, &json)?;
        writeln!(out)
    }

    pub fn namespace<W: Write>(&self, out: &mut W, namespace: &'a Namespace) -> io::Result<()> {
        let entry = self.entry(namespace, self.topology.depth_of(namespace).unwrap_or(0));
        serde_json::to_writer_pretty(&mut *out, &entry)?;
        writeln!(out)
    }

    fn entries<'r>(
        &self,
        report: &ForestReport,
        entries: impl IntoIterator<Item = &'r ReportEntry>,
    ) -> Vec<JsonEntry<'a>> {
        entries
            .into_iter()
            .filter_map(|e| self.report_entry(report, e))
            .collect()
    }

    fn report_entry(&self, report: &ForestReport, entry: &ReportEntry) -> Option<JsonEntry<'a>> {
        let namespace = self.topology.namespace(report.kind, entry.nid)?;
        Some(self.entry(namespace, report.relative_depth(entry)))
    }

    fn entry(&self, namespace: &'a Namespace, depth: u32) -> JsonEntry<'a> {
        JsonEntry {
            depth,
            orphaned: namespace.is_orphaned(),
            owner_user_namespace: self
                .topology
                .owner_user_namespace(namespace)
                .map(Namespace::nid),
            namespace,
            processes: self
                .show_members
                .then(|| self.topology.members(namespace).collect()),
            subtree: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsview_core::ProcessId;
    use nsview_topology::{KindSet, MockSource, ProcessScope};

    fn topology() -> Topology {
        let source = MockSource::new()
            .with_process(1, 0, "systemd")
            .with_process(300, 1, "unshare")
            .with_process(301, 300, "bash")
            .with_process(900, 899, "stray")
            .with_shared_namespaces(1, 4_026_531_836)
            .with_shared_namespaces(300, 4_026_531_836)
            .with_namespace(300, NamespaceKind::Net, 4_026_532_200)
            .with_namespace(301, NamespaceKind::Net, 4_026_532_200)
            .with_namespace(300, NamespaceKind::User, 4_026_532_100)
            .with_uid_map(300, &[(0, 1000, 1)])
            .with_namespace(900, NamespaceKind::Net, 4_026_532_900);
        Topology::collect(&source).unwrap()
    }

    fn render_text(topology: &Topology, config: &ReportConfig, reports: &[ForestReport]) -> String {
        let mut out = Vec::new();
        TextRenderer::new(topology, config)
            .reports(&mut out, reports, false)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_tree_lines() {
        let topology = topology();
        let config = ReportConfig::new();
        let reports = topology.report(KindSet::only(NamespaceKind::Net));

        let text = render_text(&topology, &config, &reports);

        assert_eq!(
            text,
            "Namespace: NET\n\
             -- [NET][4026531836]\n     \
             +-- [NET][4026532200]\n     \
             +-- [NET][4026532900]\n\
             \n"
        );
    }

    #[test]
    fn test_member_lines() {
        let topology = topology();
        let config = ReportConfig::new().with_members(true);
        let reports = topology
            .process_report(ProcessId::from_raw(301), ProcessScope::Own, NamespaceKind::Net.into())
            .unwrap();

        let text = render_text(&topology, &config, &reports);

        assert!(text.starts_with("Namespace: NET\n-- [NET][4026532200]\n"));
        assert!(text.contains("     +-- unshare <300>\n"));
        assert!(text.contains("     +-- bash <301>\n"));
    }

    #[test]
    fn test_extended_lines() {
        let topology = topology();
        let config = ReportConfig::new().with_extended(true);
        let reports = topology.report(KindSet::only(NamespaceKind::User));

        let text = render_text(&topology, &config, &reports);

        assert!(text.contains("     | First member        : systemd <1>\n"));
        assert!(text.contains("     | Parent namespace ID : -\n"));
        assert!(text.contains("     |      | Parent namespace ID : 4026531836\n"));
        assert!(text.contains("     |      | UID Map 0           : [0, 1000, 1]\n"));
        assert!(!text.contains("GID Map"));
    }

    #[test]
    fn test_namespace_description() {
        let topology = topology();
        let config = ReportConfig::new().with_members(true);
        let ns = topology
            .namespace(NamespaceKind::Net, NamespaceId::from_raw(4_026_532_200))
            .unwrap();

        let mut out = Vec::new();
        TextRenderer::new(&topology, &config)
            .with_columns(80)
            .namespace(&mut out, ns)
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Type                : NET\nID                  : 4026532200\n"));
        assert!(text.contains("Owner user namespace: 4026532100\n"));
        assert!(text.contains("Member Processes    : 2\n"));
        assert!(text.ends_with("Member processes    : unshare <300>, bash <301>\n"));
    }

    /// stray (50) lost its parent and unshared NET; its child (51) did too
    fn orphan_with_child() -> Topology {
        let source = MockSource::new()
            .with_process(1, 0, "init")
            .with_process(20, 1, "sshd")
            .with_process(50, 49, "stray")
            .with_process(51, 50, "child")
            .with_namespace(1, NamespaceKind::Net, 10)
            .with_namespace(20, NamespaceKind::Net, 20)
            .with_namespace(50, NamespaceKind::Net, 90)
            .with_namespace(51, NamespaceKind::Net, 91);
        Topology::collect(&source).unwrap()
    }

    #[test]
    fn test_orphan_subtree_follows_orphan() {
        let topology = orphan_with_child();
        let config = ReportConfig::new();
        let reports = topology.report(KindSet::only(NamespaceKind::Net));

        let text = render_text(&topology, &config, &reports);

        assert_eq!(
            text,
            "Namespace: NET\n\
             -- [NET][10]\n     \
             +-- [NET][20]\n     \
             +-- [NET][90]\n     \
             +     +-- [NET][91]\n\
             \n"
        );
    }

    #[test]
    fn test_json_orphan_subtree() {
        let topology = orphan_with_child();
        let config = ReportConfig::new();
        let reports = topology.report(KindSet::only(NamespaceKind::Net));

        let mut out = Vec::new();
        JsonRenderer::new(&topology, &config)
            .reports(&mut out, &reports, false)
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();

        let parented: Vec<u64> = json[0]["parented"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["namespace"]["nid"].as_u64().unwrap())
            .collect();
        assert_eq!(parented, vec![10, 20]);

        let orphan = &json[0]["orphaned"][0];
        assert_eq!(orphan["namespace"]["nid"], 90);
        assert_eq!(orphan["subtree"][0]["namespace"]["nid"], 91);
        assert_eq!(orphan["subtree"][0]["depth"], 2);
        assert!(json[0]["parented"][0].get("subtree").is_none());
    }

    #[test]
    fn test_wrap_list() {
        let items: Vec<String> = ["alpha <1>", "beta <2>", "gamma <3>"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let lines = wrap_list("Members: ", &items, 30);
        assert_eq!(lines, vec!["Members: alpha <1>, beta <2>,", "         gamma <3>"]);

        let lines = wrap_list("Members: ", &items, 200);
        assert_eq!(lines, vec!["Members: alpha <1>, beta <2>, gamma <3>"]);

        assert_eq!(wrap_list("Members: ", &[], 80), vec!["Members:"]);
    }

    #[test]
    fn test_json_report() {
        let topology = topology();
        let config = ReportConfig::new().with_members(true);
        let reports = topology.report(KindSet::only(NamespaceKind::Net));

        let mut out = Vec::new();
        JsonRenderer::new(&topology, &config)
            .reports(&mut out, &reports, false)
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(json[0]["kind"], "NET");
        assert_eq!(json[0]["parented"].as_array().unwrap().len(), 2);
        assert_eq!(json[0]["orphaned"][0]["namespace"]["nid"], 4_026_532_900_u64);
        assert_eq!(json[0]["orphaned"][0]["orphaned"], true);
        assert_eq!(json[0]["orphaned"][0]["subtree"], serde_json::json!([]));
        assert_eq!(json[0]["parented"][1]["processes"][1]["name"], "bash");
    }
}
