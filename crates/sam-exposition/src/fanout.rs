//! Per-entity fan-out.
//!
//! When one metric is rendered once per entity, the exposition format
//! requires all samples of that metric in one contiguous block under a
//! single `HELP`/`TYPE` pair. [`FanOut`] buffers lines per metric name and
//! concatenates the groups in first-seen order.

use sam_store::ValueStore;

use crate::gauge::Gauge;

#[derive(Debug)]
struct Group {
    name: String,
    headed: bool,
    lines: Vec<String>,
}

/// Buffer of per-metric line groups.
#[derive(Debug, Default)]
pub struct FanOut {
    groups: Vec<Group>,
}

impl FanOut {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `gauge` into the group of its metric name.
    ///
    /// Help is kept only until the group has produced its header, so the
    /// first entity with output heads the block.
    pub fn add(&mut self, store: &ValueStore, mut gauge: Gauge<'_>) {
        let index = match self.groups.iter().position(|g| g.name == gauge.name()) {
            Some(index) => index,
            None => {
                self.groups.push(Group {
                    name: gauge.name().to_string(),
                    headed: false,
                    lines: Vec::new(),
                });
                self.groups.len() - 1
            }
        };

        let group = &mut self.groups[index];
        if group.headed {
            gauge.strip_help();
        }
        let lines = gauge.render(store);
        if lines.is_empty() {
            return;
        }
        if gauge.has_help() {
            group.headed = true;
        }
        group.lines.extend(lines);
    }

    /// Concatenate all groups.
    pub fn into_lines(self) -> Vec<String> {
        self.groups.into_iter().flat_map(|g| g.lines).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use sam_store::{PathToken, path};
    use serde_json::json;

    use super::*;

    fn store() -> ValueStore {
        let store = ValueStore::new();
        for (iid, rpm, power) in [(1, 1500, 30_000), (2, 0, 0), (3, 2900, 55_000)] {
            store.set(
                format!("dr_ng/values:{iid}"),
                json!({"values": [{"id": "motorSpeed", "value": rpm}, {"id": "power", "value": power}]}),
            );
        }
        store
    }

    fn value_path(iid: u32, id: &str) -> Vec<PathToken> {
        let mut path = path![format!("dr_ng/values:{iid}"), "values"];
        path.push(PathToken::find("id", id));
        path.push("value".into());
        path
    }

    #[test]
    fn interleaved_entities_render_contiguous_blocks() {
        let store = store();
        let mut fan = FanOut::new();
        for iid in 1..=3 {
            fan.add(
                &store,
                Gauge::new("compressor_rpm", value_path(iid, "motorSpeed"))
                    .help("Motor speed")
                    .label("iid", iid.to_string()),
            );
            fan.add(
                &store,
                Gauge::new("compressor_power_watts", value_path(iid, "power"))
                    .help("Power")
                    .label("iid", iid.to_string()),
            );
        }

        assert_eq!(
            fan.into_lines(),
            vec![
                "# HELP compressor_rpm Motor speed",
                "# TYPE compressor_rpm gauge",
                "compressor_rpm{iid=\"1\"} 1500",
                "compressor_rpm{iid=\"2\"} 0",
                "compressor_rpm{iid=\"3\"} 2900",
                "# HELP compressor_power_watts Power",
                "# TYPE compressor_power_watts gauge",
                "compressor_power_watts{iid=\"1\"} 30000",
                "compressor_power_watts{iid=\"2\"} 0",
                "compressor_power_watts{iid=\"3\"} 55000",
            ]
        );
    }

    #[test]
    fn absent_first_entity_does_not_lose_header() {
        let store = store();
        let mut fan = FanOut::new();
        for iid in [9, 1] {
            fan.add(
                &store,
                Gauge::new("compressor_rpm", value_path(iid, "motorSpeed"))
                    .help("Motor speed")
                    .label("iid", iid.to_string()),
            );
        }
        assert_eq!(
            fan.into_lines(),
            vec![
                "# HELP compressor_rpm Motor speed",
                "# TYPE compressor_rpm gauge",
                "compressor_rpm{iid=\"1\"} 1500",
            ]
        );
    }

    #[test]
    fn all_absent_renders_nothing() {
        let mut fan = FanOut::new();
        fan.add(&ValueStore::new(), Gauge::new("x", path!["missing"]).help("x"));
        assert!(fan.into_lines().is_empty());
    }
}
