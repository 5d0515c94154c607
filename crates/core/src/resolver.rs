//! Folds answered questions into the feasible region.
//!
//! Retaining shapes are intersected into the direct region first. The result
//! is complemented against the world once, and excluding shapes are then
//! unioned into that mask, so `A − B` is computed as `¬(¬A ∪ B)` without a
//! direct polygon difference.

use geo::MultiPolygon;

use crate::{
    error::Result,
    geometry,
    question::{Landmark, QuestionContext, QuestionKey},
    region::{Constraint, ConstraintClass, FeasibleRegion},
    store::QuestionStore,
};

#[derive(Debug, Clone)]
pub struct Resolution {
    /// Complement form for display, or the untouched boundary when no
    /// question applied.
    pub region: FeasibleRegion,
    /// The lowered constraints, in question order.
    pub constraints: Vec<Constraint>,
    /// Derived landmark lists to write back onto tentacle questions.
    pub derived: Vec<(QuestionKey, Vec<Landmark>)>,
}

impl Resolution {
    /// The questions admit no hiding spot. A valid outcome, not a failure.
    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }
}

/// Fold constraints into `boundary`.
///
/// With no constraints the boundary comes back as-is, in direct form.
/// Otherwise the result is in complement form.
pub fn fold(boundary: &MultiPolygon, constraints: &[Constraint]) -> Result<FeasibleRegion> {
    if constraints.is_empty() {
        return Ok(FeasibleRegion::Direct(boundary.clone()));
    }

    let (retaining, excluding): (Vec<&Constraint>, Vec<&Constraint>) = constraints
        .iter()
        .partition(|c| c.class == ConstraintClass::Retain);

    let mut region = FeasibleRegion::Direct(geometry::normalize(boundary.clone())?);
    for constraint in retaining {
        region = region.apply(constraint)?;
        tracing::debug!(key = %constraint.key, parts = region.polygons().0.len(), "intersected");
    }

    region = region.into_complement()?;

    for constraint in excluding {
        region = region.apply(constraint)?;
        tracing::debug!(key = %constraint.key, parts = region.polygons().0.len(), "excluded");
    }

    Ok(region)
}

/// Lower every active question and fold the result into the store's boundary.
pub async fn resolve(store: &QuestionStore, ctx: &dyn QuestionContext) -> Result<Resolution> {
    let mut constraints = Vec::new();
    let mut derived = Vec::new();

    for question in store.active_questions() {
        let shape = question.lower(ctx).await?;
        if let Some(places) = shape.places {
            derived.push((question.key, places));
        }
        constraints.extend(shape.constraint);
    }

    let region = fold(store.boundary(), &constraints)?;
    tracing::info!(
        questions = store.questions().len(),
        constraints = constraints.len(),
        empty = region.is_empty(),
        "region resolved"
    );

    Ok(Resolution {
        region,
        constraints,
        derived,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::testing::square_mp;
    use geo::{Area, Contains, Point};

    fn retain(k: f64, shape: MultiPolygon) -> Constraint {
        Constraint::retain(QuestionKey(k), shape)
    }

    fn exclude(k: f64, shape: MultiPolygon) -> Constraint {
        Constraint::exclude(QuestionKey(k), shape)
    }

    #[test]
    fn no_constraints_is_the_boundary() {
        let boundary = square_mp(0.0, 0.0, 10.0);
        assert_eq!(fold(&boundary, &[]).unwrap(), FeasibleRegion::Direct(boundary));
    }

    #[test]
    fn interleaved_classes_are_partitioned() {
        let boundary = square_mp(0.0, 0.0, 10.0);
        let region = fold(
            &boundary,
            &[
                exclude(1.0, square_mp(0.0, 0.0, 2.0)),
                retain(2.0, square_mp(0.0, 0.0, 5.0)),
                exclude(3.0, square_mp(4.0, 4.0, 2.0)),
            ],
        )
        .unwrap();

        assert_eq!(region.representation(), crate::region::Representation::Complement);
        let direct = region.direct_polygons().unwrap();
        assert!((direct.unsigned_area() - (25.0 - 4.0 - 1.0)).abs() < 1e-6);
        assert!(direct.contains(&Point::new(3.0, 3.0)));
        assert!(!direct.contains(&Point::new(1.0, 1.0)));
    }

    #[test]
    fn disjoint_retains_empty_the_region() {
        let region = fold(
            &square_mp(0.0, 0.0, 10.0),
            &[retain(1.0, square_mp(0.0, 0.0, 1.0)), retain(2.0, square_mp(5.0, 5.0, 1.0))],
        )
        .unwrap();
        assert!(region.is_empty());
    }

    #[test]
    fn excluding_everything_empties_the_region() {
        let region = fold(
            &square_mp(0.0, 0.0, 10.0),
            &[exclude(1.0, square_mp(-1.0, -1.0, 12.0))],
        )
        .unwrap();
        assert!(region.is_empty());
    }
}
