/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The center graph: the translation part of reference frames.
//!
//! A center may be a celestial body, a ground station or an arbitrary
//! moving point. Each edge to a parent center carries an offset (a static
//! 6-vector or a propagatable source) together with the orientation that
//! offset is expressed in.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use snafu::prelude::*;

use crate::bodies::Body;
use crate::errors::{CenterPathSnafu, FrameError, UnknownCenterSnafu};
use crate::frames::orient::Orientation;
use crate::math::Vector6;
use crate::orbits::forms::Form;
use crate::propagators::StateSource;
use crate::time::Date;

/// Offset of a center relative to its parent.
#[derive(Clone)]
pub enum Offset {
    /// Static position and velocity.
    Fixed(Vector6),
    /// Moving offset, evaluated at each date.
    Moving(Arc<dyn StateSource>),
}

#[derive(Clone)]
struct CenterLink {
    offset: Offset,
    /// Orientation the offset is expressed in.
    orientation: Orientation,
}

struct CenterGraph {
    graph: crate::graph::Graph,
    links: HashMap<(usize, usize), CenterLink>,
    bodies: HashMap<usize, Body>,
}

fn registry() -> &'static RwLock<CenterGraph> {
    static REGISTRY: OnceLock<RwLock<CenterGraph>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut graph = crate::graph::Graph::new();
        let earth = graph.add_node("Earth");
        let mut bodies = HashMap::new();
        bodies.insert(earth, Body::earth());
        RwLock::new(CenterGraph {
            graph,
            links: HashMap::new(),
            bodies,
        })
    })
}

/// A node of the center graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Center(pub(crate) usize);

/// The default center.
pub const EARTH: Center = Center(0);

impl Center {
    pub fn from_name(name: &str) -> Result<Self, FrameError> {
        let reg = registry().read().unwrap();
        reg.graph
            .index_of(name)
            .map(Center)
            .context(UnknownCenterSnafu { name })
    }

    pub fn name(&self) -> String {
        registry().read().unwrap().graph.name(self.0).to_owned()
    }

    /// The body sitting at this center, if any.
    pub fn body(&self) -> Option<Body> {
        registry().read().unwrap().bodies.get(&self.0).cloned()
    }

    /// Registers a center attached to an already defined one.
    ///
    /// For example an Earth ground station attaches to the Earth center
    /// with a fixed offset in the ITRF orientation.
    pub fn attach(
        name: &str,
        parent: Center,
        orientation: Orientation,
        offset: Offset,
        body: Option<Body>,
    ) -> Center {
        let mut reg = registry().write().unwrap();
        let node = reg.graph.add_node(name);
        reg.graph.add_edge(node, parent.0);
        reg.links.insert(
            (node, parent.0),
            CenterLink {
                offset,
                orientation,
            },
        );
        if let Some(body) = body {
            reg.bodies.insert(node, body);
        }
        Center(node)
    }

    /// Cartesian offset of this center relative to `target`, expressed in
    /// `orientation`, at the given date.
    ///
    /// Traverses the center graph, evaluating and rotating each leg, with
    /// the sign flipped on legs walked from parent to child.
    pub fn convert_to(
        &self,
        date: &Date,
        target: Center,
        orientation: Orientation,
    ) -> Result<Vector6, FrameError> {
        if self == &target {
            return Ok(Vector6::zeros());
        }

        // Links are cloned out of the registry before evaluation, since a
        // moving offset may itself trigger frame conversions.
        let legs: Vec<(CenterLink, bool)> = {
            let reg = registry().read().unwrap();
            let steps = reg.graph.steps(self.0, target.0).context(CenterPathSnafu)?;
            steps
                .into_iter()
                .map(|(a, b)| {
                    if let Some(link) = reg.links.get(&(a, b)) {
                        ((*link).clone(), false)
                    } else {
                        ((*reg.links.get(&(b, a)).expect("center edge without link")).clone(), true)
                    }
                })
                .collect()
        };

        let mut out = Vector6::zeros();
        for (link, reversed) in legs {
            let raw = match &link.offset {
                Offset::Fixed(v) => *v,
                Offset::Moving(source) => {
                    let sv = source
                        .state_at(date)
                        .map_err(|source| FrameError::DynamicOffset {
                            source: Box::new(source),
                        })?;
                    let sv = sv.with_form(Form::Cartesian).map_err(|source| {
                        FrameError::FrameForm {
                            source: Box::new(source),
                        }
                    })?;
                    *sv.coord()
                }
            };

            let rotated = link.orientation.convert_to(date, orientation)? * raw;
            out += if reversed { -rotated } else { rotated };
        }
        Ok(out)
    }
}
