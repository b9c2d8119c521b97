use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use log::{info, warn};
use serde::Deserialize;

use crate::{
    cache::{Cache, CacheConfig},
    error::CacheError,
    multi_level::MultiLevelCache,
    partitioning::{
        ClusterWayPartitioning, FixedBits, InterIntraAuxTable, InterIntraNodePartitioning,
        InterNodePartitioning, IntraNodePartitioning, SharedCache, WayPartitioning,
    },
    trace::{AccessKind, TraceFile},
};

/// Experiment file: a list of `[[scenario]]` tables.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentFile {
    #[serde(rename = "scenario", default)]
    pub scenarios: Vec<ScenarioConfig>,
}

impl ExperimentFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Unable to read experiment file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid experiment file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let file: Self = toml::from_str(text)?;
        if file.scenarios.is_empty() {
            bail!("no [[scenario]] defined");
        }
        Ok(file)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub label: String, // Label to be printed for the Result
    #[serde(flatten)]
    pub scheme: SchemeConfig,
    /// Private per-core level in front of the scheme.
    #[serde(default)]
    pub private: Option<PrivateConfig>,
}

#[derive(Debug, Clone, Deserialize)]
// Keys the scenario itself does not consume end up here, so misspelled ones
// are rejected by the scheme.
#[serde(tag = "scheme", rename_all = "snake_case", deny_unknown_fields)]
pub enum SchemeConfig {
    Plain {
        cache_size: u64,
        associativity: usize,
        block_size: u64,
    },
    Way {
        ways: Vec<usize>,
        cache_size: u64,
        block_size: u64,
    },
    InterNode {
        slices: Vec<usize>,
        slice_size: u64,
        associativity: usize,
        block_size: u64,
    },
    IntraNode {
        cache_size: u64,
        associativity: usize,
        block_size: u64,
        fixed_bits: Vec<FixedBitsConfig>,
    },
    ClusterWay {
        clusters: usize,
        ways: Vec<usize>,
        cluster_size: u64,
        block_size: u64,
    },
    InterIntra {
        /// Bytes per `[cluster][client]`, 0 where the client owns nothing.
        cells: Vec<Vec<u64>>,
        /// Cores per `[client][cluster]`.
        cores: Vec<Vec<u32>>,
        associativity: usize,
        block_size: u64,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixedBitsConfig {
    pub bits: u64,
    pub n_bits: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrivateConfig {
    pub cores: usize,
    pub cache_size: u64,
    pub associativity: usize,
    pub block_size: u64,
}

/// A concrete shared cache built from a [`SchemeConfig`].
#[derive(Debug, Clone)]
pub enum Scheme {
    Plain(Cache),
    Way(WayPartitioning),
    InterNode(InterNodePartitioning),
    IntraNode(IntraNodePartitioning),
    ClusterWay(ClusterWayPartitioning),
    InterIntra(InterIntraNodePartitioning),
}

impl Scheme {
    pub fn build(config: &SchemeConfig) -> Result<Self, CacheError> {
        Ok(match config {
            SchemeConfig::Plain {
                cache_size,
                associativity,
                block_size,
            } => Scheme::Plain(Cache::with_geometry(*cache_size, *associativity, *block_size)?),
            SchemeConfig::Way {
                ways,
                cache_size,
                block_size,
            } => Scheme::Way(WayPartitioning::new(ways, *cache_size, *block_size)?),
            SchemeConfig::InterNode {
                slices,
                slice_size,
                associativity,
                block_size,
            } => Scheme::InterNode(InterNodePartitioning::new(
                slices.len(),
                slices,
                *slice_size,
                *associativity,
                *block_size,
            )?),
            SchemeConfig::IntraNode {
                cache_size,
                associativity,
                block_size,
                fixed_bits,
            } => Scheme::IntraNode(IntraNodePartitioning::new(
                fixed_bits.len(),
                *cache_size,
                *associativity,
                *block_size,
                fixed_bits
                    .iter()
                    .map(|f| FixedBits::new(f.bits, f.n_bits))
                    .collect(),
            )?),
            SchemeConfig::ClusterWay {
                clusters,
                ways,
                cluster_size,
                block_size,
            } => Scheme::ClusterWay(ClusterWayPartitioning::new(
                *clusters,
                ways,
                *cluster_size,
                *block_size,
            )?),
            SchemeConfig::InterIntra {
                cells,
                cores,
                associativity,
                block_size,
            } => Scheme::InterIntra(InterIntraNodePartitioning::new(
                cores.len(),
                cells,
                *associativity,
                *block_size,
                cores
                    .iter()
                    .map(|per_cluster| InterIntraAuxTable::from_core_counts(per_cluster))
                    .collect(),
            )?),
        })
    }

    /// Number of clients with their own counters; `None` for a plain cache,
    /// which accepts any client id.
    pub fn clients(&self) -> Option<usize> {
        match self {
            Scheme::Plain(_) => None,
            Scheme::Way(s) => Some(s.clients()),
            Scheme::InterNode(s) => Some(s.clients()),
            Scheme::IntraNode(s) => Some(s.clients()),
            Scheme::ClusterWay(s) => Some(s.clients()),
            Scheme::InterIntra(s) => Some(s.clients()),
        }
    }

    fn as_shared(&self) -> &dyn SharedCache {
        match self {
            Scheme::Plain(s) => s,
            Scheme::Way(s) => s,
            Scheme::InterNode(s) => s,
            Scheme::IntraNode(s) => s,
            Scheme::ClusterWay(s) => s,
            Scheme::InterIntra(s) => s,
        }
    }

    fn as_shared_mut(&mut self) -> &mut dyn SharedCache {
        match self {
            Scheme::Plain(s) => s,
            Scheme::Way(s) => s,
            Scheme::InterNode(s) => s,
            Scheme::IntraNode(s) => s,
            Scheme::ClusterWay(s) => s,
            Scheme::InterIntra(s) => s,
        }
    }
}

impl SharedCache for Scheme {
    fn check_client(&self, client_id: usize) -> Result<(), CacheError> {
        self.as_shared().check_client(client_id)
    }

    fn access(&mut self, client_id: usize, addr: u64, kind: AccessKind) -> Result<bool, CacheError> {
        self.as_shared_mut().access(client_id, addr, kind)
    }

    fn misses(&self, client_id: usize) -> Result<u64, CacheError> {
        self.as_shared().misses(client_id)
    }

    fn hits(&self, client_id: usize) -> Result<u64, CacheError> {
        self.as_shared().hits(client_id)
    }
}

/// What a scenario replays the trace against.
#[derive(Debug, Clone)]
pub enum Hierarchy {
    Flat(Scheme),
    TwoLevel(MultiLevelCache<Scheme>),
}

impl Hierarchy {
    pub fn build(scenario: &ScenarioConfig) -> Result<Self, CacheError> {
        let scheme = Scheme::build(&scenario.scheme)?;
        Ok(match &scenario.private {
            None => Hierarchy::Flat(scheme),
            Some(private) => {
                let template = Cache::new(CacheConfig::new(
                    private.cache_size,
                    private.associativity,
                    private.block_size,
                ))?;
                Hierarchy::TwoLevel(MultiLevelCache::new(private.cores, &template, scheme)?)
            }
        })
    }

    pub fn scheme(&self) -> &Scheme {
        match self {
            Hierarchy::Flat(scheme) => scheme,
            Hierarchy::TwoLevel(mlc) => mlc.shared(),
        }
    }

    fn as_shared_mut(&mut self) -> &mut dyn SharedCache {
        match self {
            Hierarchy::Flat(scheme) => scheme,
            Hierarchy::TwoLevel(mlc) => mlc,
        }
    }
}

pub struct ScenarioResult {
    pub label: String, // Label to be printed for the Result
    pub trace_results: Vec<TraceResult>,
}

pub struct TraceResult {
    pub trace_name: String,
    pub accesses: u64,
    /// Records whose cpu index the hierarchy does not serve.
    pub rejected: u64,
    /// Highest cpu index seen plus one.
    pub clients_seen: usize,
    pub hierarchy: Hierarchy,
}

/// Replays `trace` in order against a freshly built hierarchy.
pub fn run_trace(scenario: &ScenarioConfig, trace: &TraceFile) -> Result<TraceResult> {
    let mut hierarchy = Hierarchy::build(scenario)
        .with_context(|| format!("Unable to build scenario '{}'", scenario.label))?;
    let cache = hierarchy.as_shared_mut();
    let mut accesses = 0;
    let mut rejected = 0;
    let mut clients_seen = 0;
    for record in &trace.entries {
        clients_seen = clients_seen.max(record.client_id + 1);
        match cache.access(record.client_id, record.address, record.kind) {
            Ok(_) => accesses += 1,
            Err(CacheError::InvalidClientId { .. }) => rejected += 1,
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "Scenario '{}' failed on {} {:#x} from cpu {}",
                        scenario.label, record.kind, record.address, record.client_id
                    )
                });
            }
        }
    }
    if rejected > 0 {
        warn!(
            "{}: {rejected} of {} records from {} skipped, cpu index out of range",
            scenario.label,
            trace.len(),
            trace.name
        );
    }
    Ok(TraceResult {
        trace_name: trace.name.clone(),
        accesses,
        rejected,
        clients_seen,
        hierarchy,
    })
}

pub fn run_scenarios(
    traces: &[TraceFile],
    scenarios: &[ScenarioConfig],
) -> Result<Vec<ScenarioResult>> {
    let mut results = Vec::new();
    for scenario in scenarios {
        info!("running scenario '{}'", scenario.label);
        let mut per_trace = Vec::new();
        for trace in traces {
            per_trace.push(run_trace(scenario, trace)?);
        }
        results.push(ScenarioResult {
            label: scenario.label.clone(),
            trace_results: per_trace,
        });
    }
    Ok(results)
}

pub fn private_cache_sizes(base: &CacheConfig, sizes: &[u64]) -> Vec<ScenarioConfig> {
    sizes
        .iter()
        .map(|&size| {
            scenario(
                format!("{}KB {}-way", size / 1024, base.associativity),
                SchemeConfig::Plain {
                    cache_size: size,
                    associativity: base.associativity,
                    block_size: base.block_size,
                },
            )
        })
        .collect()
}

fn scenario(label: String, scheme: SchemeConfig) -> ScenarioConfig {
    ScenarioConfig {
        label,
        scheme,
        private: None,
    }
}

fn shared_scenario(llc: &CacheConfig) -> ScenarioConfig {
    scenario(
        format!("Shared {}KB {}-way", llc.cache_size / 1024, llc.associativity),
        SchemeConfig::Plain {
            cache_size: llc.cache_size,
            associativity: llc.associativity,
            block_size: llc.block_size,
        },
    )
}

fn way_scenario(llc: &CacheConfig, cores: usize) -> ScenarioConfig {
    let ways_each = (llc.associativity / cores).max(1);
    scenario(
        format!("Way partitioning {ways_each} ways/core"),
        SchemeConfig::Way {
            ways: vec![ways_each; cores],
            cache_size: llc.cache_size,
            block_size: llc.block_size,
        },
    )
}

// `slices_each` slices of `slice_size` bytes per core.
fn inter_node_scenario(
    llc: &CacheConfig,
    cores: usize,
    slices_each: usize,
    slice_size: u64,
) -> ScenarioConfig {
    scenario(
        format!("Inter-node partitioning {slices_each} slice/core"),
        SchemeConfig::InterNode {
            slices: vec![slices_each; cores],
            slice_size,
            associativity: llc.associativity,
            block_size: llc.block_size,
        },
    )
}

fn intra_node_scenario(llc: &CacheConfig, cores: usize) -> ScenarioConfig {
    let fixed_bits = cores.max(1).ilog2();
    scenario(
        format!("Intra-node partitioning {fixed_bits} fixed bits"),
        SchemeConfig::IntraNode {
            cache_size: llc.cache_size,
            associativity: llc.associativity,
            block_size: llc.block_size,
            fixed_bits: (0..cores as u64)
                .map(|bits| FixedBitsConfig {
                    bits,
                    n_bits: fixed_bits,
                })
                .collect(),
        },
    )
}

// `clusters` clusters of `cluster_size` bytes, ways split evenly inside each.
fn cluster_way_scenario(
    llc: &CacheConfig,
    cores: usize,
    clusters: usize,
    cluster_size: u64,
) -> ScenarioConfig {
    let ways_each = (llc.associativity / cores).max(1);
    scenario(
        format!("Cluster way partitioning {clusters} clusters"),
        SchemeConfig::ClusterWay {
            clusters,
            ways: vec![ways_each; cores],
            cluster_size,
            block_size: llc.block_size,
        },
    )
}

// Every core owns a `cell_size` cell in each of `clusters` clusters, one core
// per cluster.
fn inter_intra_scenario(
    llc: &CacheConfig,
    cores: usize,
    clusters: usize,
    cell_size: u64,
) -> ScenarioConfig {
    scenario(
        format!("Inter/intra partitioning {clusters} clusters"),
        SchemeConfig::InterIntra {
            cells: vec![vec![cell_size; cores]; clusters],
            cores: vec![vec![1; clusters]; cores],
            associativity: llc.associativity,
            block_size: llc.block_size,
        },
    )
}

fn sized(llc: &CacheConfig, cache_size: u64) -> CacheConfig {
    CacheConfig {
        cache_size,
        ..llc.clone()
    }
}

fn with_size_prefix(size: u64, mut scenario: ScenarioConfig) -> ScenarioConfig {
    scenario.label = format!("{}KB: {}", size / 1024, scenario.label);
    scenario
}

/// Every partitioning scheme over the same LLC budget, split evenly between
/// `cores` clients. `cores` must be a power of two no larger than the LLC's
/// associativity.
pub fn llc_schemes(llc: &CacheConfig, cores: usize) -> Vec<ScenarioConfig> {
    let half = llc.cache_size / 2;
    vec![
        shared_scenario(llc),
        way_scenario(llc, cores),
        inter_node_scenario(llc, cores, 1, llc.cache_size / cores as u64),
        intra_node_scenario(llc, cores),
        cluster_way_scenario(llc, cores, 2, half),
        inter_intra_scenario(llc, cores, 2, half / cores as u64),
    ]
}

/// Way partitioning against intra-node and against inter/intra partitioning
/// for each LLC slice size in `sizes`, all clients sharing the one slice.
pub fn llc_size_sweep(llc: &CacheConfig, cores: usize, sizes: &[u64]) -> Vec<ScenarioConfig> {
    sizes
        .iter()
        .flat_map(|&size| {
            let llc = sized(llc, size);
            let half = size / 2;
            [
                way_scenario(&llc, cores),
                intra_node_scenario(&llc, cores),
                inter_intra_scenario(&llc, cores, 2, half / cores as u64),
            ]
            .map(|s| with_size_prefix(size, s))
        })
        .collect()
}

/// Inter-node, cluster way and inter/intra partitioning when every client owns
/// `owned` slices of each size in `slice_sizes`. All three give a client the
/// same capacity, `owned * slice_size`; `owned` must be a power of two.
pub fn clusters_owned_sweep(
    llc: &CacheConfig,
    cores: usize,
    owned: usize,
    slice_sizes: &[u64],
) -> Vec<ScenarioConfig> {
    slice_sizes
        .iter()
        .flat_map(|&size| {
            [
                inter_node_scenario(llc, cores, owned, size),
                cluster_way_scenario(llc, cores, owned, size * cores as u64),
                inter_intra_scenario(llc, cores, owned, size),
            ]
            .map(|s| with_size_prefix(size, s))
        })
        .collect()
}

/// The same schemes behind a private cache per core.
pub fn with_private(scenarios: Vec<ScenarioConfig>, private: &PrivateConfig) -> Vec<ScenarioConfig> {
    scenarios
        .into_iter()
        .map(|mut scenario| {
            scenario.label = format!(
                "{} + L1 {}KB",
                scenario.label,
                private.cache_size / 1024
            );
            scenario.private = Some(private.clone());
            scenario
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceRecord;

    fn trace(records: &[(u64, usize, bool)]) -> TraceFile {
        TraceFile {
            name: "synthetic".to_string(),
            entries: records
                .iter()
                .map(|&(address, client_id, store)| TraceRecord {
                    address,
                    client_id,
                    kind: AccessKind::from_store_flag(store),
                })
                .collect(),
        }
    }

    const EXPERIMENTS: &str = r#"
        [[scenario]]
        label = "plain"
        scheme = "plain"
        cache_size = 256
        associativity = 2
        block_size = 16

        [[scenario]]
        label = "way"
        scheme = "way"
        ways = [1, 2, 1]
        cache_size = 256
        block_size = 16

        [[scenario]]
        label = "intra"
        scheme = "intra_node"
        cache_size = 256
        associativity = 2
        block_size = 16
        fixed_bits = [{ bits = 0, n_bits = 1 }, { bits = 2, n_bits = 2 }, { bits = 3, n_bits = 2 }]

        [[scenario]]
        label = "inter/intra"
        scheme = "inter_intra"
        cells = [[64, 64], [64, 0]]
        cores = [[1, 3], [1, 1]]
        associativity = 2
        block_size = 16

        [[scenario]]
        label = "two level"
        scheme = "inter_node"
        slices = [2, 1, 1]
        slice_size = 32
        associativity = 2
        block_size = 16

        [scenario.private]
        cores = 3
        cache_size = 64
        associativity = 1
        block_size = 16
    "#;

    #[test]
    fn parses_experiment_file() {
        let file = ExperimentFile::parse(EXPERIMENTS).unwrap();
        assert_eq!(file.scenarios.len(), 5);
        assert!(matches!(
            file.scenarios[1].scheme,
            SchemeConfig::Way { ref ways, .. } if ways == &[1, 2, 1]
        ));
        assert!(file.scenarios[0].private.is_none());
        assert_eq!(file.scenarios[4].private.as_ref().unwrap().cores, 3);
        for scenario in &file.scenarios {
            Hierarchy::build(scenario).unwrap();
        }
    }

    #[test]
    fn rejects_empty_or_unknown_schemes() {
        assert!(ExperimentFile::parse("").is_err());
        let unknown = "[[scenario]]\nlabel = \"x\"\nscheme = \"victim\"\n";
        assert!(ExperimentFile::parse(unknown).is_err());
    }

    #[test]
    fn misspelled_keys_are_rejected() {
        let base = r#"
            [[scenario]]
            label = "x"
            scheme = "plain"
            cache_size = 256
            associativity = 2
            block_size = 16
        "#;
        let private = r#"
            cores = 2
            cache_size = 64
            associativity = 1
            block_size = 16
        "#;
        assert!(ExperimentFile::parse(base).is_ok());
        assert!(ExperimentFile::parse(&format!("{base}[scenario.private]{private}")).is_ok());

        // A key the plain scheme does not take.
        assert!(ExperimentFile::parse(&format!("{base}ways = [1, 1]\n")).is_err());
        // Misspelled private level.
        assert!(ExperimentFile::parse(&format!("{base}[scenario.privat]{private}")).is_err());
        assert!(
            ExperimentFile::parse(&format!("{base}[scenario.private]{private}sets = 4\n")).is_err()
        );
        assert!(ExperimentFile::parse(&format!("{base}[[scenarios]]\nlabel = \"y\"\n")).is_err());
    }

    #[test]
    fn invalid_geometry_fails_the_scenario() {
        let scenario = ScenarioConfig {
            label: "broken".to_string(),
            scheme: SchemeConfig::Way {
                ways: vec![1, 2, 1],
                cache_size: 32,
                block_size: 16,
            },
            private: None,
        };
        assert!(run_trace(&scenario, &trace(&[(0, 0, false)])).is_err());
    }

    #[test]
    fn out_of_range_cpus_are_skipped() {
        let file = ExperimentFile::parse(EXPERIMENTS).unwrap();
        let way = &file.scenarios[1];
        let result = run_trace(way, &trace(&[(0x30, 0, false), (0x30, 5, false), (0x30, 0, true)])).unwrap();
        assert_eq!(result.accesses, 2);
        assert_eq!(result.rejected, 1);
        assert_eq!(result.clients_seen, 6);
        let scheme = result.hierarchy.scheme();
        assert_eq!(scheme.misses(0).unwrap(), 1);
        assert_eq!(scheme.hits(0).unwrap(), 1);
    }

    #[test]
    fn two_level_filters_shared_traffic() {
        let file = ExperimentFile::parse(EXPERIMENTS).unwrap();
        let records = [(0x70, 0, false), (0x70, 0, false), (0x70, 0, true)];
        let result = run_trace(&file.scenarios[4], &trace(&records)).unwrap();
        let Hierarchy::TwoLevel(mlc) = &result.hierarchy else {
            panic!("expected a two-level hierarchy");
        };
        assert_eq!(mlc.private_cache(0).unwrap().hits(), 2);
        assert_eq!(mlc.shared().misses(0).unwrap(), 1);
        assert_eq!(mlc.shared().hits(0).unwrap(), 0);
    }

    #[test]
    fn replays_are_identical() {
        let records: Vec<_> = (0..500u64)
            .map(|i| ((i * 2654435761) % 8192, (i % 3) as usize, i % 5 == 0))
            .collect();
        let trace = trace(&records);
        let file = ExperimentFile::parse(EXPERIMENTS).unwrap();
        for scenario in &file.scenarios {
            let first = run_trace(scenario, &trace).unwrap();
            let second = run_trace(scenario, &trace).unwrap();
            for client in 0..3 {
                let (a, b) = (first.hierarchy.scheme(), second.hierarchy.scheme());
                assert_eq!(a.misses(client), b.misses(client));
                assert_eq!(a.hits(client), b.hits(client));
            }
        }
    }

    #[test]
    fn size_sweep_covers_every_size() {
        let llc = CacheConfig::new(1024 * 1024, 16, 64);
        let sizes = [512 * 1024, 1024 * 1024, 2048 * 1024];
        let scenarios = llc_size_sweep(&llc, 4, &sizes);
        assert_eq!(scenarios.len(), 9);
        assert!(scenarios[0].label.starts_with("512KB: Way partitioning"));
        assert!(scenarios[8].label.starts_with("2048KB: Inter/intra partitioning"));
        assert!(matches!(
            scenarios[4].scheme,
            SchemeConfig::IntraNode { cache_size, .. } if cache_size == 1024 * 1024
        ));
        for scenario in &scenarios {
            let hierarchy = Hierarchy::build(scenario).unwrap();
            assert_eq!(hierarchy.scheme().clients(), Some(4));
        }
    }

    #[test]
    fn owned_clusters_give_equal_capacity() {
        let llc = CacheConfig::new(1024 * 1024, 16, 64);
        let slice = 256 * 1024;
        for owned in [1, 2, 4, 8] {
            let scenarios = clusters_owned_sweep(&llc, 4, owned, &[slice]);
            assert_eq!(scenarios.len(), 3);
            for scenario in &scenarios {
                let hierarchy = Hierarchy::build(scenario).unwrap();
                let capacity: u64 = match hierarchy.scheme() {
                    Scheme::InterNode(s) => s.memory_nodes(0).unwrap().iter().map(Cache::cache_size).sum(),
                    Scheme::ClusterWay(s) => s
                        .clusters()
                        .iter()
                        .map(|c| c.partitions()[0].cache_size())
                        .sum(),
                    Scheme::InterIntra(s) => (0..s.clusters())
                        .filter_map(|cluster| s.get_cache_slice(cluster, 0))
                        .map(Cache::cache_size)
                        .sum(),
                    other => panic!("unexpected scheme {other:?}"),
                };
                assert_eq!(capacity, owned as u64 * slice, "{}", scenario.label);
            }
        }
        assert!(
            Hierarchy::build(&clusters_owned_sweep(&llc, 4, 3, &[slice])[1]).is_err()
        );
    }

    #[test]
    fn builtin_schemes_build() {
        let llc = CacheConfig::new(1024 * 1024, 16, 64);
        for cores in [1, 2, 4, 8] {
            let private = PrivateConfig {
                cores,
                cache_size: 32 * 1024,
                associativity: 4,
                block_size: 64,
            };
            let scenarios = with_private(llc_schemes(&llc, cores), &private);
            for scenario in scenarios.iter().chain(&llc_schemes(&llc, cores)) {
                let hierarchy = Hierarchy::build(scenario)
                    .unwrap_or_else(|e| panic!("{} ({cores} cores): {e}", scenario.label));
                if let Some(clients) = hierarchy.scheme().clients() {
                    assert_eq!(clients, cores);
                }
            }
        }
        for scenario in private_cache_sizes(&CacheConfig::default(), &[16 * 1024, 128 * 1024]) {
            Hierarchy::build(&scenario).unwrap();
        }
    }
}
