//! Observation encoding.
//!
//! Layout of every party's vector:
//!
//! | Slice | Length | Content |
//! |---|---|---|
//! | current bundle | `n` | `current_bundle / max_price` |
//! | own valuations | `n` | `valuation / max_price`, the observer's only |
//! | time | 1 | `round / max_rounds` |
//! | turn | 1 | 1.0 when the observer is the proposer |
//! | history | `n * lag` | normalized past offers, most recent first |

use crate::types::Party;

use super::session::Session;
use super::types::Observation;

/// Shape of an observation, shared by the encoder and by policies decoding it
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObservationLayout {
    pub num_items: usize,
    pub history_lag: usize,
    pub max_price: f64,
}

impl ObservationLayout {
    pub fn new(num_items: usize, history_lag: usize, max_price: f64) -> Self {
        Self {
            num_items,
            history_lag,
            max_price,
        }
    }

    pub fn of(session: &Session) -> Self {
        Self::new(
            session.num_items(),
            session.price_history().lag(),
            session.max_price(),
        )
    }

    /// `2n + 2 + n * lag`
    pub fn len(&self) -> usize {
        2 * self.num_items + 2 + self.num_items * self.history_lag
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn current_bundle<'a>(&self, obs: &'a Observation) -> &'a [f32] {
        &obs.as_slice()[..self.num_items]
    }

    pub fn own_valuations<'a>(&self, obs: &'a Observation) -> &'a [f32] {
        &obs.as_slice()[self.num_items..2 * self.num_items]
    }

    /// Fraction of the round budget already spent
    pub fn elapsed(&self, obs: &Observation) -> f32 {
        obs.as_slice()[2 * self.num_items]
    }

    pub fn is_my_turn(&self, obs: &Observation) -> bool {
        obs.as_slice()[2 * self.num_items + 1] > 0.5
    }

    /// History slot `index`, 0 being the latest offer
    pub fn history<'a>(&self, obs: &'a Observation, index: usize) -> Option<&'a [f32]> {
        if index >= self.history_lag {
            return None;
        }
        let start = 2 * self.num_items + 2 + index * self.num_items;
        Some(&obs.as_slice()[start..start + self.num_items])
    }
}

/// Encode the session as seen by `observer`
pub fn encode(session: &Session, observer: &Party) -> Observation {
    let layout = ObservationLayout::of(session);
    let max_price = session.max_price();
    let mut values: Vec<f64> = Vec::with_capacity(layout.len());

    values.extend(session.current_bundle().normalized(max_price));
    values.extend(
        session
            .valuation_slice(&observer.id)
            .iter()
            .map(|v| v / max_price),
    );
    values.push(f64::from(session.round()) / f64::from(session.max_rounds()));
    values.push(if session.current_proposer().id == observer.id {
        1.0
    } else {
        0.0
    });
    values.extend(session.price_history().flatten());

    debug_assert_eq!(values.len(), layout.len());
    Observation(values.into_iter().map(|v| v.clamp(0.0, 1.0) as f32).collect())
}
