//! Narrowing hiding zones with comparison questions.

use geo::{Distance, Haversine, MultiPolygon, Point, Rect};
use zone_transit::{StationIdentifier, TransitProvider, TransitStation};

use super::{Candidate, search::expanding_search};
use crate::{
    error::{ResolveError, Result},
    geometry::{self, Circle},
    question::{
        LandmarkCategory, MatchingQuestion, MatchingType, MeasuringQuestion, MeasuringType,
        Question, QuestionContext, QuestionKind, StationComparator,
        context::lookup_area,
        matching::{first_letter, name_length, nearest_cell},
    },
    units::Meters,
};

fn same_station_attribute(
    comparator: StationComparator,
    a: &dyn TransitStation,
    b: &dyn TransitStation,
) -> bool {
    match comparator {
        StationComparator::FirstLetter => {
            first_letter(a.name()).is_some() && first_letter(a.name()) == first_letter(b.name())
        }
        StationComparator::NameLength => name_length(a.name()) == name_length(b.name()),
        StationComparator::SharedLine => a.shares_line_with(b),
    }
}

fn nearest_distance(points: &[Point], to: Point) -> Option<f64> {
    points
        .iter()
        .map(|p| Haversine.distance(*p, to))
        .min_by(|a, b| a.total_cmp(b))
}

/// Drop candidates that contradict a station-comparison answer.
fn filter_by_station(
    candidates: Vec<Candidate>,
    question: &MatchingQuestion,
    comparator: StationComparator,
    key: crate::question::QuestionKey,
    transit: &dyn TransitProvider,
) -> Result<Vec<Candidate>> {
    let reference = transit
        .nearest_station(question.anchor())
        .ok_or_else(|| ResolveError::missing(key, "no station near the anchor"))?;

    tracing::debug!(
        key = %key,
        reference = reference.name(),
        ?comparator,
        "station comparison"
    );

    Ok(candidates
        .into_iter()
        .filter(|c| {
            same_station_attribute(comparator, c.station.as_ref(), reference.as_ref())
                == question.same
        })
        .collect())
}

/// Drop candidates whose whole circle is on the wrong side of the anchor's
/// distance to the nearest instance of `category`.
async fn filter_by_proximity(
    candidates: Vec<Candidate>,
    question: &MeasuringQuestion,
    category: LandmarkCategory,
    key: crate::question::QuestionKey,
    ctx: &dyn QuestionContext,
) -> Result<Vec<Candidate>> {
    let instances: Vec<Point> = ctx
        .landmarks(category, lookup_area(ctx))
        .await?
        .iter()
        .map(|l| l.position())
        .collect();

    let reference = nearest_distance(&instances, question.anchor())
        .ok_or_else(|| ResolveError::missing(key, format!("no {category} found")))?;

    Ok(candidates
        .into_iter()
        .filter(|c| {
            let Some(d) = nearest_distance(&instances, c.circle.center) else {
                return false;
            };
            let slack = c.circle.radius.get();
            if question.hider_closer {
                d - slack < reference
            } else {
                d + slack > reference
            }
        })
        .collect())
}

/// Global pass over every candidate.
///
/// Applies station comparators and landmark-distance measuring questions;
/// every other question kind already shaped the feasible region.
pub async fn eliminate<'q>(
    mut candidates: Vec<Candidate>,
    questions: impl IntoIterator<Item = &'q Question>,
    transit: &dyn TransitProvider,
    ctx: &dyn QuestionContext,
) -> Result<Vec<Candidate>> {
    let before = candidates.len();

    for question in questions {
        candidates = match &question.kind {
            QuestionKind::Matching(m) => match m.station_comparator() {
                Some(comparator) => {
                    filter_by_station(candidates, m, comparator, question.key, transit)?
                }
                None => candidates,
            },
            QuestionKind::Measuring(m) => match m.kind {
                MeasuringType::Landmark { category, .. } => {
                    filter_by_proximity(candidates, m, category, question.key, ctx).await?
                }
                _ => candidates,
            },
            _ => candidates,
        };
    }

    tracing::info!(before, after = candidates.len(), "hiding zones eliminated");
    Ok(candidates)
}

/// A sharper region for one selected station.
#[derive(Debug, Clone)]
pub struct Refinement {
    pub station: StationIdentifier,
    pub region: MultiPolygon,
    /// Bounds to fit the map to; `None` when nothing remains.
    pub viewport: Option<Rect>,
}

/// The instance nearest the question's anchor.
async fn seeker_nearest(
    ctx: &dyn QuestionContext,
    category: LandmarkCategory,
    anchor: Point,
) -> Result<Point> {
    let policy = &ctx.config().search;
    let outcome = expanding_search(ctx, category, anchor, Meters(0.0), policy).await?;
    outcome
        .closest()
        .map(|l| l.position())
        .ok_or(ResolveError::SearchExhausted {
            category,
            max_radius_m: outcome.radius.get(),
            iterations: outcome.iterations,
        })
}

/// Refine one candidate with every active full-category question.
///
/// `feasible` is the resolved region in direct form. Matching questions keep
/// or cut the Voronoi cell of the seeker's nearest instance; measuring
/// questions keep the circles at the seeker's distance or the hole-punched
/// mask around them.
pub async fn refine_station<'q>(
    candidate: &Candidate,
    feasible: &MultiPolygon,
    questions: impl IntoIterator<Item = &'q Question>,
    ctx: &dyn QuestionContext,
) -> Result<Refinement> {
    let config = ctx.config();
    let steps = config.circle_steps;
    let slack = candidate.circle.radius;
    let zone = geometry::single(candidate.zone.clone());
    let mut region = geometry::intersection(feasible, &zone)?;

    for question in questions {
        if geometry::is_negligible(&region) {
            break;
        }

        match &question.kind {
            QuestionKind::Matching(m) => {
                let MatchingType::Landmark {
                    category,
                    full: true,
                } = m.kind
                else {
                    continue;
                };

                let center = candidate.circle.center;
                let around = expanding_search(ctx, category, center, slack, &config.search).await?;
                let target = seeker_nearest(ctx, category, m.anchor()).await?;

                let mut generators: Vec<Point> =
                    around.landmarks.iter().map(|l| l.position()).collect();
                if !generators.contains(&target) {
                    generators.push(target);
                }

                let Some(zone_bounds) = geometry::bounds(&zone) else {
                    continue;
                };
                let mut bounds = zone_bounds;
                for g in &generators {
                    bounds = geometry::extend_rect(bounds, *g);
                }

                let cell = nearest_cell(&generators, target, bounds)?;
                region = if m.same {
                    geometry::intersection(&region, &cell)?
                } else {
                    geometry::difference(&region, &cell)?
                };
            }

            QuestionKind::Measuring(m) => {
                let MeasuringType::Landmark {
                    category,
                    full: true,
                } = m.kind
                else {
                    continue;
                };

                let center = candidate.circle.center;
                let around = expanding_search(ctx, category, center, slack, &config.search).await?;
                let target = seeker_nearest(ctx, category, m.anchor()).await?;
                let distance = Meters(Haversine.distance(target, m.anchor()));

                let circles = geometry::union_all(
                    around
                        .landmarks
                        .iter()
                        .filter_map(|l| Circle::new(l.position(), distance).to_polygon(steps))
                        .collect(),
                )?;

                region = if m.hider_closer {
                    geometry::intersection(&region, &circles)?
                } else {
                    let Some(bounds) = geometry::bounds(&zone) else {
                        continue;
                    };
                    let mask = geometry::difference(&geometry::single(bounds.to_polygon()), &circles)?;
                    geometry::intersection(&region, &mask)?
                };
            }

            _ => {}
        }

        tracing::debug!(key = %question.key, parts = region.0.len(), "refined");
    }

    let viewport = geometry::bounds(&region);
    Ok(Refinement {
        station: candidate.station.id().clone(),
        region,
        viewport,
    })
}
