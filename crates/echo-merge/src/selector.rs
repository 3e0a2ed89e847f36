// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read selectors: which ports a merge state is willing to read from.

use crate::error::MergeError;
use crate::port::PortId;

/// Declares the port(s) the active state accepts input from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadSelector {
    /// Only this port satisfies the state.
    One(PortId),
    /// Any listed port satisfies the state. When several are ready the
    /// driver rotates its preference so none of them starves.
    Any(Vec<PortId>),
    /// Like [`ReadSelector::Any`], but `preferred` always wins when it is
    /// ready; the rotating tie-break applies among `secondaries`.
    Preferred {
        /// Port served first whenever it has an element.
        preferred: PortId,
        /// Ports served when `preferred` has nothing available.
        secondaries: Vec<PortId>,
    },
}

/// Selector satisfied only by `port`.
#[inline]
pub fn read(port: PortId) -> ReadSelector {
    ReadSelector::One(port)
}

/// Selector satisfied by any of `ports`.
pub fn read_any(ports: impl IntoIterator<Item = PortId>) -> ReadSelector {
    ReadSelector::Any(ports.into_iter().collect())
}

/// Selector favouring `preferred` over `secondaries`.
pub fn read_preferred(
    preferred: PortId,
    secondaries: impl IntoIterator<Item = PortId>,
) -> ReadSelector {
    ReadSelector::Preferred {
        preferred,
        secondaries: secondaries.into_iter().collect(),
    }
}

impl ReadSelector {
    /// Iterates every port named by the selector.
    pub fn ports(&self) -> impl Iterator<Item = PortId> + '_ {
        let (head, tail) = match self {
            Self::One(port) => (Some(*port), &[] as &[PortId]),
            Self::Any(ports) => (None, ports.as_slice()),
            Self::Preferred {
                preferred,
                secondaries,
            } => (Some(*preferred), secondaries.as_slice()),
        };
        head.into_iter().chain(tail.iter().copied())
    }

    /// Rejects selectors that name no port or a port outside `0..port_count`.
    pub fn validate(&self, port_count: usize) -> Result<(), MergeError> {
        if self.ports().next().is_none() {
            return Err(MergeError::Protocol(
                "read selector names no ports".to_owned(),
            ));
        }
        if let Some(port) = self.ports().find(|p| p.index() >= port_count) {
            return Err(MergeError::Protocol(format!(
                "read selector names unregistered port {port} (merge has {port_count} inputs)"
            )));
        }
        Ok(())
    }

    /// Orders the ports of `self` that pass `is_open` for one read attempt.
    ///
    /// `cursor` is the rotating preference used by `Any` and by the secondary
    /// ports of `Preferred`: ports at or after `cursor` come first, the rest
    /// wrap around. Duplicates are dropped.
    pub(crate) fn candidates(&self, cursor: usize, is_open: impl Fn(PortId) -> bool) -> Vec<PortId> {
        let rotate = |ports: &[PortId]| {
            let mut sorted: Vec<PortId> = ports.iter().copied().filter(|p| is_open(*p)).collect();
            sorted.sort_unstable();
            sorted.dedup();
            let split = sorted.partition_point(|p| p.index() < cursor);
            sorted.rotate_left(split);
            sorted
        };
        match self {
            Self::One(port) => {
                if is_open(*port) {
                    vec![*port]
                } else {
                    Vec::new()
                }
            }
            Self::Any(ports) => rotate(ports),
            Self::Preferred {
                preferred,
                secondaries,
            } => {
                let mut ordered = Vec::with_capacity(secondaries.len() + 1);
                if is_open(*preferred) {
                    ordered.push(*preferred);
                }
                ordered.extend(rotate(secondaries).into_iter().filter(|p| p != preferred));
                ordered
            }
        }
    }
}
