//! Year × value-bucket contingency table and the bipartite graph built from it.

use crate::data::{DataProcessor, Observation, ValueBucket};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::BTreeMap;
use std::fmt;

/// Counts of observations by year and value bucket.
///
/// Observations without a bucket are not counted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContingencyTable {
    counts: BTreeMap<(i32, ValueBucket), usize>,
}

impl ContingencyTable {
    pub fn from_observations(observations: &[Observation]) -> Self {
        let mut counts = BTreeMap::new();
        for obs in observations {
            if let Some(bucket) = obs.value_bucket {
                *counts.entry((obs.year, bucket)).or_insert(0) += 1;
            }
        }
        Self { counts }
    }

    /// Buckets with at least one observation, in range order.
    pub fn buckets(&self) -> Vec<ValueBucket> {
        let mut buckets: Vec<ValueBucket> = self.counts.keys().map(|&(_, b)| b).collect();
        buckets.sort();
        buckets.dedup();
        buckets
    }

    /// Nonzero cells ordered by year, then bucket.
    pub fn cells(&self) -> impl Iterator<Item = (i32, ValueBucket, usize)> + '_ {
        self.counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(&(year, bucket), &count)| (year, bucket, count))
    }
}

/// Which side of the bipartite graph a node sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Year(i32),
    Bucket(ValueBucket),
}

impl NodeKind {
    pub fn is_year(&self) -> bool {
        matches!(self, NodeKind::Year(_))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Year(year) => write!(f, "{}", year),
            NodeKind::Bucket(bucket) => write!(f, "{}", bucket),
        }
    }
}

/// Years on one side, value buckets on the other, edge weights are counts.
///
/// Edges only join a year to a bucket and always carry a positive weight.
/// Year nodes are added first, so their indices come before every bucket's.
#[derive(Debug, Clone, Default)]
pub struct BipartiteGraph {
    graph: UnGraph<NodeKind, usize>,
}

impl BipartiteGraph {
    /// One node per distinct year, one per bucket that occurs, one edge per
    /// nonzero contingency cell.
    pub fn from_observations(observations: &[Observation]) -> Self {
        let table = ContingencyTable::from_observations(observations);
        Self::from_table(DataProcessor::get_years(observations), &table)
    }

    pub fn from_table(years: Vec<i32>, table: &ContingencyTable) -> Self {
        let mut graph = UnGraph::default();

        let year_index: BTreeMap<i32, NodeIndex> = years
            .into_iter()
            .map(|year| (year, graph.add_node(NodeKind::Year(year))))
            .collect();
        let bucket_index: BTreeMap<ValueBucket, NodeIndex> = table
            .buckets()
            .into_iter()
            .map(|bucket| (bucket, graph.add_node(NodeKind::Bucket(bucket))))
            .collect();

        for (year, bucket, weight) in table.cells() {
            if let (Some(&y), Some(&b)) = (year_index.get(&year), bucket_index.get(&bucket)) {
                graph.add_edge(y, b, weight);
            }
        }

        Self { graph }
    }

    pub fn graph(&self) -> &UnGraph<NodeKind, usize> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn kind(&self, index: NodeIndex) -> NodeKind {
        self.graph[index]
    }

    /// Year node indices, ascending by year.
    pub fn year_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .node_indices()
            .filter(move |&i| self.graph[i].is_year())
    }

    /// Bucket node indices, in range order.
    pub fn bucket_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .node_indices()
            .filter(move |&i| !self.graph[i].is_year())
    }

    pub fn total_weight(&self) -> usize {
        self.graph.edge_references().map(|e| *e.weight()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawRecord;
    use chrono::NaiveDate;

    fn observations(rows: &[(i32, u32, f64)]) -> Vec<Observation> {
        DataProcessor::prepare(
            rows.iter()
                .enumerate()
                .map(|(i, &(year, month, rate))| RawRecord {
                    date: NaiveDate::from_ymd_opt(year, month, 1 + (i % 28) as u32).unwrap(),
                    exchange_rate: rate,
                    year: None,
                    month: None,
                })
                .collect(),
        )
    }

    #[test]
    fn test_contingency_counts() {
        let obs = observations(&[(2010, 1, 1.7), (2010, 2, 1.8), (2010, 3, 2.0), (2011, 1, 5.0)]);
        let table = ContingencyTable::from_observations(&obs);

        let cells: Vec<(i32, ValueBucket, usize)> = table.cells().collect();
        assert_eq!(
            cells,
            vec![
                (2010, ValueBucket::From1_5To2_0, 2),
                (2010, ValueBucket::From2_0To2_5, 1),
            ]
        );
    }

    #[test]
    fn test_graph_is_sparse_and_weights_sum_to_bucketed_count() {
        let obs = observations(&[
            (2010, 1, 1.7),
            (2010, 2, 1.8),
            (2011, 5, 3.1),
            (2011, 6, 4.5),
            (2012, 1, 0.9),
            (2012, 2, 3.2),
        ]);
        let graph = BipartiteGraph::from_observations(&obs);

        let bucketed = obs.iter().filter(|o| o.value_bucket.is_some()).count();
        assert_eq!(graph.total_weight(), bucketed);
        assert!(graph.graph().edge_references().all(|e| *e.weight() > 0));
        assert_eq!(graph.edge_count(), 4);

        assert_eq!(graph.year_indices().count(), 3);
        let buckets: Vec<String> = graph
            .bucket_indices()
            .map(|i| graph.kind(i).to_string())
            .collect();
        assert_eq!(buckets, vec!["1.5-2.0", "3.0-3.5", "4.0-4.5"]);
    }

    #[test]
    fn test_edges_only_cross_sides() {
        let obs = observations(&[(2015, 1, 3.9), (2016, 1, 3.4), (2016, 2, 3.6)]);
        let graph = BipartiteGraph::from_observations(&obs);

        for edge in graph.graph().edge_references() {
            let (a, b) = (graph.kind(edge.source()), graph.kind(edge.target()));
            assert_ne!(a.is_year(), b.is_year());
        }
    }

    #[test]
    fn test_year_nodes_precede_bucket_nodes() {
        let obs = observations(&[(2014, 1, 2.4), (2013, 1, 2.1), (2014, 2, 2.6)]);
        let graph = BipartiteGraph::from_observations(&obs);

        let kinds: Vec<String> = graph
            .graph()
            .node_indices()
            .map(|i| graph.kind(i).to_string())
            .collect();
        assert_eq!(kinds, vec!["2013", "2014", "2.0-2.5", "2.5-3.0"]);
    }

    #[test]
    fn test_year_without_bucket_is_isolated_node() {
        let obs = observations(&[(2010, 1, 1.7), (2011, 1, 6.0)]);
        let graph = BipartiteGraph::from_observations(&obs);

        assert_eq!(graph.year_indices().count(), 2);
        assert_eq!(graph.edge_count(), 1);
        let isolated = graph
            .year_indices()
            .find(|&i| graph.kind(i) == NodeKind::Year(2011))
            .unwrap();
        assert_eq!(graph.graph().neighbors(isolated).count(), 0);
    }
}
