//! End-to-end folding of answered questions into the feasible region.

use std::sync::Arc;

use approx::assert_relative_eq;
use geo::{Coord, Destination, Haversine, MultiPolygon, Point, Rect};
use serde_json::json;
use zone_core::{
    Engine, FeasibleRegion, Question, QuestionStore, RecomputeOutcome, Representation,
    gateway::MemoryContext,
    geometry::{self, area_sq_meters},
    resolver,
};

const MILE: f64 = 1609.344;
const SQ_MILE: f64 = MILE * MILE;

fn question(value: serde_json::Value) -> Question {
    serde_json::from_value(value).unwrap()
}

fn radius(key: f64, lat: f64, lng: f64, miles: f64, within: bool) -> Question {
    question(json!({
        "id": "radius",
        "key": key,
        "data": { "lat": lat, "lng": lng, "radius": miles, "unit": "miles", "within": within }
    }))
}

fn thermometer(key: f64, a: (f64, f64), b: (f64, f64), warmer: bool) -> Question {
    question(json!({
        "id": "thermometer",
        "key": key,
        "data": { "latA": a.0, "lngA": a.1, "latB": b.0, "lngB": b.1, "warmer": warmer }
    }))
}

fn rect(min: (f64, f64), max: (f64, f64)) -> Rect {
    Rect::new(Coord { x: min.0, y: min.1 }, Coord { x: max.0, y: max.1 })
}

/// A square roughly `miles` on a side, centred on the equator at the meridian.
fn square_miles(miles: f64) -> MultiPolygon {
    let half = miles * MILE / 2.0;
    let origin = Point::new(0.0, 0.0);
    let north = Haversine.destination(origin, 0.0, half).y();
    let east = Haversine.destination(origin, 90.0, half).x();
    geometry::single(rect((-east, -north), (east, north)).to_polygon())
}

async fn resolve(boundary: &MultiPolygon, questions: Vec<Question>) -> FeasibleRegion {
    let ctx = MemoryContext::new(geometry::bounds(boundary).unwrap());
    let store = QuestionStore::new(boundary.clone(), questions);
    resolver::resolve(&store, &ctx).await.unwrap().region
}

#[tokio::test]
async fn radius_disc_inside_a_square() {
    let boundary = square_miles(100.0);
    let region = resolve(&boundary, vec![radius(1.0, 0.0, 0.0, 10.0, true)]).await;

    assert_eq!(region.representation(), Representation::Complement);
    let feasible = region.direct_polygons().unwrap();
    assert_relative_eq!(
        area_sq_meters(&feasible) / SQ_MILE,
        std::f64::consts::PI * 100.0,
        max_relative = 0.01
    );

    let center = Point::new(0.0, 0.0);
    for bearing in [0.0, 45.0, 90.0, 200.0, 315.0] {
        let inside = Haversine.destination(center, bearing, 9.999 * MILE);
        let outside = Haversine.destination(center, bearing, 10.001 * MILE);
        assert!(region.contains_point(&inside), "bearing {bearing} inside");
        assert!(!region.contains_point(&outside), "bearing {bearing} outside");
    }
}

#[tokio::test]
async fn within_then_outside_leaves_nothing() {
    let boundary = square_miles(100.0);
    let region = resolve(
        &boundary,
        vec![
            radius(1.0, 0.0, 0.0, 10.0, true),
            radius(2.0, 0.0, 0.0, 10.0, false),
        ],
    )
    .await;

    assert!(region.is_empty());
}

#[tokio::test]
async fn question_order_does_not_matter() {
    let boundary = square_miles(100.0);
    let questions = vec![
        radius(1.0, 0.1, 0.1, 30.0, true),
        thermometer(2.0, (0.0, -0.3), (0.0, 0.3), true),
        radius(3.0, 0.2, 0.3, 5.0, false),
    ];

    let forward = resolve(&boundary, questions.clone()).await;
    let mut reversed = questions.clone();
    reversed.reverse();
    let backward = resolve(&boundary, reversed).await;
    let shuffled = resolve(
        &boundary,
        vec![questions[2].clone(), questions[0].clone(), questions[1].clone()],
    )
    .await;

    let area = area_sq_meters(&forward.direct_polygons().unwrap());
    assert!(area > 0.0);
    let samples = [
        Point::new(0.2, 0.1),
        Point::new(-0.2, 0.1),
        Point::new(0.3, 0.2),
        Point::new(0.45, 0.1),
    ];

    for other in [backward, shuffled] {
        assert_relative_eq!(
            area_sq_meters(&other.direct_polygons().unwrap()),
            area,
            max_relative = 1e-6
        );
        for point in &samples {
            assert_eq!(other.contains_point(point), forward.contains_point(point));
        }
    }
}

#[tokio::test]
async fn exclusions_match_a_direct_difference() {
    let boundary = square_miles(100.0);
    let region = resolve(
        &boundary,
        vec![
            radius(1.0, 0.0, 0.0, 30.0, true),
            radius(2.0, 0.1, 0.1, 8.0, false),
        ],
    )
    .await;

    let steps = zone_core::EngineConfig::default().circle_steps;
    let keep = geometry::Circle::new(Point::new(0.0, 0.0), zone_core::units::Meters(30.0 * MILE))
        .to_multi_polygon(steps);
    let cut = geometry::Circle::new(Point::new(0.1, 0.1), zone_core::units::Meters(8.0 * MILE))
        .to_multi_polygon(steps);
    let expected = geometry::difference(&geometry::intersection(&boundary, &keep).unwrap(), &cut)
        .unwrap();

    assert_relative_eq!(
        area_sq_meters(&region.direct_polygons().unwrap()),
        area_sq_meters(&expected),
        max_relative = 1e-4
    );
}

#[tokio::test]
async fn swapped_thermometer_is_the_same_question() {
    let boundary = square_miles(100.0);
    let a = (0.1, -0.2);
    let b = (-0.1, 0.25);

    let warmer = resolve(&boundary, vec![thermometer(1.0, a, b, true)]).await;
    let colder_reversed = resolve(&boundary, vec![thermometer(1.0, b, a, false)]).await;

    assert_relative_eq!(
        area_sq_meters(&warmer.direct_polygons().unwrap()),
        area_sq_meters(&colder_reversed.direct_polygons().unwrap()),
        max_relative = 1e-9
    );
    // Nearer to b.
    assert!(warmer.contains_point(&Point::new(0.25, -0.1)));
    assert!(!warmer.contains_point(&Point::new(-0.2, 0.1)));
}

#[tokio::test]
async fn no_questions_is_the_boundary() {
    let boundary = square_miles(10.0);
    let region = resolve(&boundary, vec![]).await;
    assert_eq!(region, FeasibleRegion::Direct(boundary));
}

#[tokio::test]
async fn engine_commits_through_the_same_pipeline() {
    let boundary = square_miles(100.0);
    let ctx = MemoryContext::new(geometry::bounds(&boundary).unwrap());
    let store = QuestionStore::new(boundary, vec![radius(1.0, 0.0, 0.0, 10.0, true)]);
    let engine = Engine::new(Arc::new(ctx), store);

    let outcome = engine.recompute().await;
    assert!(matches!(outcome, RecomputeOutcome::Committed { generation: 1, empty: false }));

    let state = engine.state().await;
    let region = state.region().unwrap();
    assert!(region.contains_point(&Point::new(0.0, 0.0)));
    assert!(state.candidates.is_empty());
}
