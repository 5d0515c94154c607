//! Expanding-radius landmark search around a point.

use geo::{Distance, Haversine, Point};
use itertools::Itertools;

use crate::{
    config::SearchPolicy,
    error::{ResolveError, Result},
    question::{Landmark, LandmarkCategory, QuestionContext},
    units::Meters,
};

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Every instance within `radius`, closest first.
    pub landmarks: Vec<Landmark>,
    pub radius: Meters,
    pub iterations: u32,
}

impl SearchOutcome {
    pub fn closest(&self) -> Option<&Landmark> {
        self.landmarks.first()
    }
}

/// Grow the search radius around `center` until the found set is stable.
///
/// The set is stable once `closest + 2 × slack` fits inside the radius: no
/// point within `slack` of `center` can then have a nearest instance outside
/// the set. The radius doubles each round, capped by the policy; running out
/// of rounds or radius yields [`ResolveError::SearchExhausted`].
pub async fn expanding_search(
    ctx: &dyn QuestionContext,
    category: LandmarkCategory,
    center: Point,
    slack: Meters,
    policy: &SearchPolicy,
) -> Result<SearchOutcome> {
    let max_radius = policy.max_radius.meters().get();
    let mut radius = policy.initial_radius.meters().get().min(max_radius);
    let mut iterations = 0;

    while iterations < policy.max_iterations {
        iterations += 1;

        let found: Vec<(f64, Landmark)> = ctx
            .landmarks_near(category, center, radius)
            .await?
            .into_iter()
            .unique_by(|l| l.id.clone())
            .map(|l| (Haversine.distance(center, l.position()), l))
            .filter(|(d, _)| *d <= radius)
            .sorted_by(|a, b| a.0.total_cmp(&b.0))
            .collect();

        if let Some((closest, _)) = found.first() {
            if closest + 2.0 * slack.get() <= radius {
                tracing::debug!(%category, radius, iterations, count = found.len(), "search settled");
                return Ok(SearchOutcome {
                    landmarks: found.into_iter().map(|(_, l)| l).collect(),
                    radius: Meters(radius),
                    iterations,
                });
            }
        }

        if radius >= max_radius {
            break;
        }
        radius = (radius * 2.0).min(max_radius);
    }

    tracing::warn!(%category, max_radius, iterations, "landmark search exhausted");
    Err(ResolveError::SearchExhausted {
        category,
        max_radius_m: max_radius,
        iterations,
    })
}
