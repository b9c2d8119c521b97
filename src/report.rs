use std::io::{self, Write};

use crate::{
    cache::Cache,
    experiments::{Hierarchy, ScenarioResult, Scheme, TraceResult},
    partitioning::SharedCache,
};

/// Writes numbered result sections.
pub struct Report<W> {
    out: W,
    section: u32,
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Self {
        Self { out, section: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn header(&mut self, title: &str) -> io::Result<()> {
        self.section += 1;
        writeln!(self.out, "\n[{}] {title}", self.section)
    }

    pub fn section(&mut self, title: &str, results: &[ScenarioResult]) -> io::Result<()> {
        self.header(title)?;
        for scenario in results {
            writeln!(self.out, "  {}", scenario.label)?;
            for trace in &scenario.trace_results {
                self.trace_result(trace)?;
            }
        }
        Ok(())
    }

    fn trace_result(&mut self, trace: &TraceResult) -> io::Result<()> {
        let mut line = format!("    {:<14} accesses {}", trace.trace_name, trace.accesses);
        if trace.rejected > 0 {
            line.push_str(&format!(" rejected {}", trace.rejected));
        }
        writeln!(self.out, "{line}")?;

        match &trace.hierarchy {
            Hierarchy::Flat(scheme) => self.scheme(scheme, trace.clients_seen),
            Hierarchy::TwoLevel(mlc) => {
                for core in 0..mlc.cores() {
                    if let (Ok(misses), Ok(hits)) = (mlc.misses(core), mlc.hits(core)) {
                        self.counters(&format!("core {core}"), misses, hits)?;
                    }
                    if let Ok(l1) = mlc.private_cache(core) {
                        self.cache(&format!("  L1 {core}"), l1)?;
                    }
                }
                writeln!(self.out, "      shared level:")?;
                self.scheme(mlc.shared(), trace.clients_seen)
            }
        }
    }

    fn scheme(&mut self, scheme: &Scheme, clients_seen: usize) -> io::Result<()> {
        let Some(clients) = scheme.clients() else {
            if let Scheme::Plain(cache) = scheme {
                self.cache("all", cache)?;
            }
            return Ok(());
        };
        for client in 0..clients.min(clients_seen.max(1)) {
            if let (Ok(misses), Ok(hits)) = (scheme.misses(client), scheme.hits(client)) {
                self.counters(&format!("client {client}"), misses, hits)?;
            }
        }
        match scheme {
            Scheme::Plain(_) | Scheme::Way(_) | Scheme::IntraNode(_) => {}
            Scheme::InterNode(inp) => {
                for client in 0..clients {
                    let Ok(nodes) = inp.memory_nodes(client) else {
                        continue;
                    };
                    for (slice, cache) in nodes.iter().enumerate() {
                        self.cache(&format!("  c{client} slice {slice}"), cache)?;
                    }
                }
            }
            Scheme::ClusterWay(cwp) => {
                for (idx, cluster) in cwp.clusters().iter().enumerate() {
                    for (client, cache) in cluster.partitions().iter().enumerate() {
                        self.cache(&format!("  cluster {idx} c{client}"), cache)?;
                    }
                }
            }
            Scheme::InterIntra(iinp) => {
                for cluster in 0..iinp.clusters() {
                    for client in 0..clients {
                        if let Some(cache) = iinp.get_cache_slice(cluster, client) {
                            self.cache(&format!("  cluster {cluster} c{client}"), cache)?;
                        }
                    }
                }
                for client in 0..clients {
                    match iinp.unserved(client) {
                        Ok(n) if n > 0 => {
                            writeln!(self.out, "      c{client} unserved {n}")?;
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    fn cache(&mut self, name: &str, cache: &Cache) -> io::Result<()> {
        self.line(name, cache.misses(), cache.hits(), cache.hit_rate())
    }

    fn counters(&mut self, name: &str, misses: u64, hits: u64) -> io::Result<()> {
        let total = misses + hits;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        self.line(name, misses, hits, hit_rate)
    }

    fn line(&mut self, name: &str, misses: u64, hits: u64, hit_rate: f64) -> io::Result<()> {
        let accesses = misses + hits;
        writeln!(
            self.out,
            "      {:<18} accesses {:>9} hit {:>6.2}% miss {:>6.2}% (misses {misses}, hits {hits})",
            name,
            accesses,
            hit_rate * 100.0,
            if accesses == 0 { 0.0 } else { (1.0 - hit_rate) * 100.0 }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        experiments::{ScenarioConfig, SchemeConfig, run_trace},
        trace::{AccessKind, TraceFile, TraceRecord},
    };

    fn result(scheme: SchemeConfig) -> ScenarioResult {
        let trace = TraceFile {
            name: "t".to_string(),
            entries: [0x00u64, 0x10, 0x00, 0x10]
                .iter()
                .map(|&address| TraceRecord {
                    address,
                    client_id: 0,
                    kind: AccessKind::Read,
                })
                .collect(),
        };
        let scenario = ScenarioConfig {
            label: "scenario".to_string(),
            scheme,
            private: None,
        };
        ScenarioResult {
            label: scenario.label.clone(),
            trace_results: vec![run_trace(&scenario, &trace).unwrap()],
        }
    }

    #[test]
    fn sections_are_numbered_per_report() {
        let mut report = Report::new(Vec::new());
        report.header("first").unwrap();
        report.header("second").unwrap();
        let text = String::from_utf8(report.into_inner()).unwrap();
        assert!(text.contains("[1] first"));
        assert!(text.contains("[2] second"));

        let mut fresh = Report::new(Vec::new());
        fresh.header("again").unwrap();
        assert!(String::from_utf8(fresh.into_inner()).unwrap().contains("[1] again"));
    }

    #[test]
    fn prints_slice_breakdown() {
        let scenario = result(SchemeConfig::InterNode {
            slices: vec![2, 1],
            slice_size: 32,
            associativity: 2,
            block_size: 16,
        });
        let mut report = Report::new(Vec::new());
        report.section("inter-node", &[scenario]).unwrap();
        let text = String::from_utf8(report.into_inner()).unwrap();
        assert!(text.contains("accesses 4"));
        assert!(text.contains("client 0"));
        assert!(text.contains("c0 slice 1"));
        assert!(text.contains("(misses 2, hits 2)"));
        // Two blocks, one per owned slice.
        let client = text.lines().find(|l| l.contains("client 0")).unwrap();
        assert!(client.contains("accesses         4"));
        let slice = text.lines().find(|l| l.contains("c0 slice 1")).unwrap();
        assert!(slice.contains("accesses         2"));
    }

    #[test]
    fn plain_cache_prints_totals() {
        let scenario = result(SchemeConfig::Plain {
            cache_size: 64,
            associativity: 1,
            block_size: 16,
        });
        let mut report = Report::new(Vec::new());
        report.section("plain", &[scenario]).unwrap();
        let text = String::from_utf8(report.into_inner()).unwrap();
        assert!(text.contains("all"));
        assert!(text.contains("hit  50.00% miss  50.00%"));
    }
}
