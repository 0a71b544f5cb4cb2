use std::collections::{HashMap, VecDeque};

use crate::error::WorkflowError;
use crate::node::{Connection, Node};

/// Dependency graph derived from a workflow's connections.
///
/// Nodes live in an arena addressed by their declaration index; edges are
/// index lists, so traversal never holds references between nodes.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Node ids in declaration order.
  ids: Vec<String>,
  /// node_id -> arena index.
  index: HashMap<String, usize>,
  /// Adjacency list: index -> distinct downstream indices.
  downstream: Vec<Vec<usize>>,
  /// Reverse adjacency: index -> distinct upstream (producer) indices.
  upstream: Vec<Vec<usize>>,
  /// Nodes with no incoming connections.
  entry_points: Vec<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
  Unvisited,
  InProgress,
  Done,
}

impl Graph {
  /// Build a graph from nodes and connections.
  ///
  /// Fails if a connection references a node id that is not declared.
  /// Duplicate connections between the same pair of nodes collapse into one
  /// dependency.
  pub fn new(nodes: &[Node], connections: &[Connection]) -> Result<Self, WorkflowError> {
    let ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let mut index = HashMap::with_capacity(ids.len());
    for (i, id) in ids.iter().enumerate() {
      if index.insert(id.clone(), i).is_some() {
        return Err(WorkflowError::DuplicateNode(id.clone()));
      }
    }

    let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    let mut upstream: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];

    for conn in connections {
      let from = *index
        .get(&conn.source)
        .ok_or_else(|| WorkflowError::UnknownNode(conn.source.clone()))?;
      let to = *index
        .get(&conn.target)
        .ok_or_else(|| WorkflowError::UnknownNode(conn.target.clone()))?;

      if !downstream[from].contains(&to) {
        downstream[from].push(to);
      }
      if !upstream[to].contains(&from) {
        upstream[to].push(from);
      }
    }

    let entry_points = (0..ids.len()).filter(|&i| upstream[i].is_empty()).collect();

    Ok(Self {
      ids,
      index,
      downstream,
      upstream,
      entry_points,
    })
  }

  pub fn len(&self) -> usize {
    self.ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ids.is_empty()
  }

  /// Node id stored at an arena index.
  pub fn node_id(&self, idx: usize) -> &str {
    &self.ids[idx]
  }

  /// Arena index of a node id.
  pub fn index_of(&self, node_id: &str) -> Option<usize> {
    self.index.get(node_id).copied()
  }

  /// Producer indices of a node.
  pub fn producers(&self, idx: usize) -> &[usize] {
    &self.upstream[idx]
  }

  /// Consumer indices of a node.
  pub fn consumers(&self, idx: usize) -> &[usize] {
    &self.downstream[idx]
  }

  /// Get upstream node ids for a given node.
  pub fn upstream(&self, node_id: &str) -> Vec<&str> {
    self
      .index_of(node_id)
      .map(|i| self.upstream[i].iter().map(|&u| self.node_id(u)).collect())
      .unwrap_or_default()
  }

  /// Get downstream node ids for a given node.
  pub fn downstream(&self, node_id: &str) -> Vec<&str> {
    self
      .index_of(node_id)
      .map(|i| self.downstream[i].iter().map(|&d| self.node_id(d)).collect())
      .unwrap_or_default()
  }

  /// Indices of nodes with no incoming connections.
  pub fn entry_points(&self) -> &[usize] {
    &self.entry_points
  }

  /// Find a cycle using depth-first search with back-edge detection.
  ///
  /// Returns the id of a node on the cycle, or `None` if the graph is acyclic.
  pub fn find_cycle(&self) -> Option<&str> {
    let mut marks = vec![Mark::Unvisited; self.len()];

    for start in 0..self.len() {
      if marks[start] != Mark::Unvisited {
        continue;
      }

      // (node, next child cursor)
      let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
      marks[start] = Mark::InProgress;

      while let Some(frame) = stack.last_mut() {
        let node = frame.0;
        match self.downstream[node].get(frame.1) {
          Some(&child) => {
            frame.1 += 1;
            match marks[child] {
              Mark::InProgress => return Some(self.node_id(child)),
              Mark::Unvisited => {
                marks[child] = Mark::InProgress;
                stack.push((child, 0));
              }
              Mark::Done => {}
            }
          }
          None => {
            marks[node] = Mark::Done;
            stack.pop();
          }
        }
      }
    }

    None
  }

  /// Topological order of arena indices.
  ///
  /// Ties are broken by declaration order. Fails with
  /// [`WorkflowError::CircularDependency`] if the graph has a cycle.
  pub fn topological_order(&self) -> Result<Vec<usize>, WorkflowError> {
    if let Some(node_id) = self.find_cycle() {
      return Err(WorkflowError::CircularDependency(node_id.to_string()));
    }

    let mut pending: Vec<usize> = self.upstream.iter().map(Vec::len).collect();
    let mut queue: VecDeque<usize> = self.entry_points.iter().copied().collect();
    let mut order = Vec::with_capacity(self.len());

    while let Some(idx) = queue.pop_front() {
      order.push(idx);
      for &next in &self.downstream[idx] {
        pending[next] -= 1;
        if pending[next] == 0 {
          queue.push_back(next);
        }
      }
    }

    Ok(order)
  }
}
