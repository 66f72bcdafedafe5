/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Two-body analytical propagator.

use snafu::prelude::*;

use crate::errors::{PropagationError, PropFormSnafu, UninitializedSnafu};
use crate::math::norm_2pi;
use crate::orbits::forms::Form;
use crate::orbits::statevector::StateVector;
use crate::propagators::{analytic_iter, IterOpts, Propagator, StateStream};
use crate::time::Date;

/// Analytical propagator only taking the evolution of the mean anomaly into
/// account.
#[derive(Default)]
pub struct Kepler {
    orbit: Option<StateVector>,
}

impl Kepler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Propagator for Kepler {
    fn set_orbit(&mut self, state: &StateVector) -> Result<(), PropagationError> {
        let orbit = state
            .clone()
            .with_form(Form::KeplerianMean)
            .context(PropFormSnafu)?;
        self.orbit = Some(orbit);
        Ok(())
    }

    fn orbit(&self) -> Option<&StateVector> {
        self.orbit.as_ref()
    }

    fn propagate(&self, date: &Date) -> Result<StateVector, PropagationError> {
        let orbit = self.orbit.as_ref().context(UninitializedSnafu)?;
        let delta_t = (*date - orbit.date()).total_seconds();
        let n = orbit.infos()?.n();

        let mut new = orbit.clone();
        new.set_date(*date);
        let mut coord = *new.coord();
        coord[5] = norm_2pi(coord[5] + n * delta_t);
        new.set_coord(coord);

        new.with_form(Form::Cartesian).context(PropFormSnafu)
    }

    fn iter(&self, opts: IterOpts) -> Result<StateStream<'_>, PropagationError> {
        analytic_iter(self, opts)
    }

    fn fresh(&self) -> Box<dyn Propagator> {
        Box::new(Self::new())
    }

    fn boxed(&self) -> Box<dyn Propagator> {
        Box::new(Self {
            orbit: self.orbit.clone(),
        })
    }
}
