//! Deployment-order resolution over declared service dependencies.
//!
//! One edge per declared dependency, pointing dependency -> dependent, so a
//! topological order of the graph is exactly an install order. The graph is
//! built fresh per call and discarded after ordering; nothing is shared
//! across resolutions.
//!
//! Tie-breaks between independent services preserve declaration order, so
//! resolution is deterministic for a given input. Callers must rely only on
//! the ordering invariant, not on the tie-break.

use std::collections::{HashMap, VecDeque};

use berth_types::ServiceSpec;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{GraphError, Result};

/// Resolve the install order for `services`.
///
/// Returns the services cloned into an order in which every declared
/// dependency appears strictly before its dependents. Fails with
/// [`GraphError::UnknownDependency`] when a `depends_on` entry names no
/// service in the input, and with [`GraphError::DependencyCycle`] when the
/// declarations loop. The cycle report is the union of all
/// cycle-participating services across all cycles.
pub fn resolve_install_order(services: &[ServiceSpec]) -> Result<Vec<ServiceSpec>> {
    // Node weights are input positions; insertion order equals input order.
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(services.len(), services.len());
    let mut index_of: HashMap<&str, NodeIndex> = HashMap::with_capacity(services.len());

    for (position, service) in services.iter().enumerate() {
        let node = graph.add_node(position);
        index_of.entry(service.name.as_str()).or_insert(node);
    }

    for service in services {
        let dependent = index_of[service.name.as_str()];
        for dependency in &service.depends_on {
            let provider = match index_of.get(dependency.as_str()) {
                Some(node) => *node,
                None => {
                    return Err(GraphError::UnknownDependency {
                        service: service.name.clone(),
                        dependency: dependency.clone(),
                    })
                }
            };
            // update_edge keeps repeated declarations from skewing degrees.
            graph.update_edge(provider, dependent, ());
        }
    }

    detect_cycles(&graph, services)?;
    Ok(kahn_order(&graph)
        .into_iter()
        .map(|node| services[graph[node]].clone())
        .collect())
}

/// Reject the graph when any cycle exists.
///
/// A strongly connected component with more than one node is a cycle, as is
/// a self-edge. The error carries the union of all such vertices.
fn detect_cycles(graph: &DiGraph<usize, ()>, services: &[ServiceSpec]) -> Result<()> {
    let mut involved: Vec<String> = Vec::new();

    for component in tarjan_scc(graph) {
        if component.len() > 1 {
            involved.extend(
                component
                    .iter()
                    .map(|&node| services[graph[node]].name.clone()),
            );
        }
    }
    for node in graph.node_indices() {
        if graph.find_edge(node, node).is_some() {
            involved.push(services[graph[node]].name.clone());
        }
    }

    if involved.is_empty() {
        return Ok(());
    }
    involved.sort();
    involved.dedup();
    Err(GraphError::DependencyCycle { involved })
}

/// Topological order via Kahn's algorithm.
///
/// The ready queue is seeded in insertion order and nodes released together
/// are enqueued sorted by insertion position, so independent services come
/// out in declaration order. Assumes the graph is already known acyclic.
fn kahn_order(graph: &DiGraph<usize, ()>) -> Vec<NodeIndex> {
    let mut in_degree: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|node| {
            (
                node,
                graph.neighbors_directed(node, Direction::Incoming).count(),
            )
        })
        .collect();

    let mut queue: VecDeque<NodeIndex> = graph
        .node_indices()
        .filter(|node| in_degree[node] == 0)
        .collect();
    let mut order: Vec<NodeIndex> = Vec::with_capacity(graph.node_count());

    while let Some(node) = queue.pop_front() {
        order.push(node);

        let mut released: Vec<NodeIndex> = Vec::new();
        for successor in graph.neighbors_directed(node, Direction::Outgoing) {
            if let Some(degree) = in_degree.get_mut(&successor) {
                *degree -= 1;
                if *degree == 0 {
                    released.push(successor);
                }
            }
        }
        released.sort_by_key(|&node| graph[node]);
        queue.extend(released);
    }

    order
}
