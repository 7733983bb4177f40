//! End-to-end behavior of the recommendation service: the four query
//! shapes, signal defaulting, and batch failure semantics.

mod fixtures;

use std::sync::Arc;

use fixtures::{
    CITY, date, memory_cached_service, optimizer_with_signals, uncached_service,
};
use shift_scout::cache::CacheStack;
use shift_scout::data::{GraphStore, InMemorySource};
use shift_scout::domain::StartZone;
use shift_scout::engine::{CachedSolver, RecommendationService, SolveRequest};
use shift_scout::signals::{SurgeRecord, SurgeTable, WeatherModel};

#[tokio::test]
async fn optimal_start_time_picks_the_top_ranked_hour() {
    let service = memory_cached_service();

    let scores = service
        .all_time_scores(CITY, StartZone::Best, 6, 12, 4, date(), None)
        .await
        .unwrap();
    assert_eq!(scores.len(), 7); // 06:00 through 12:00 inclusive
    assert!(scores.windows(2).all(|w| w[0].score >= w[1].score));

    let best = service
        .optimal_start_time(CITY, StartZone::Best, 6, 12, 4, date(), None)
        .await
        .unwrap()
        .expect("a recommendation");
    assert_eq!(best.optimal_time, scores[0].time);
    assert_eq!(best.score, scores[0].score);
}

#[tokio::test]
async fn remaining_hours_reflect_the_unused_window() {
    let service = memory_cached_service();

    let scores = service
        .all_time_scores(CITY, StartZone::Best, 6, 12, 2, date(), None)
        .await
        .unwrap();

    for s in &scores {
        // Window is 6h wide; starting at offset o and working 2h leaves
        // max(0, 6 - o - 2).
        let offset = s.time - 6;
        assert_eq!(s.remaining_hours, (6 - offset).saturating_sub(2));
    }
}

#[tokio::test]
async fn best_zone_carries_map_geometry() {
    let service = memory_cached_service();

    let best = service
        .best_zone_for_time(CITY, 8, 4, date())
        .await
        .unwrap()
        .expect("a recommendation");

    assert!(!best.zone_id.is_empty());
    assert!(best.path_length >= 1);
    assert_eq!(best.optimal_path.len(), best.path_length);
    assert_eq!(best.optimal_path[0], best.zone_id);
    assert!(best.bounds.lat_min < best.bounds.lat_max);
    assert!(best.bounds.lon_min < best.bounds.lon_max);
    assert!((best.expected_hourly_rate - best.expected_earnings / 4.0).abs() < 1e-9);
}

#[tokio::test]
async fn all_zone_scores_rank_every_zone() {
    let service = memory_cached_service();

    let scores = service
        .all_zone_scores(CITY, 8, 4, date(), None)
        .await
        .unwrap();
    assert_eq!(scores.len(), 3);
    assert!(scores.windows(2).all(|w| w[0].score >= w[1].score));

    // Morning airport flow should make the center the best launch point.
    assert_eq!(scores[0].zone_id, "c_3_center");
}

#[tokio::test]
async fn explicit_neutral_signals_match_omitted_signals() {
    // Surge pinned to 1.0 for every hour, weather history all Clear.
    let surge = SurgeTable::from_records(
        (0..24)
            .map(|hour| SurgeRecord {
                city_id: CITY,
                hour,
                surge_multiplier: 1.0,
            })
            .collect(),
    );
    let weather = WeatherModel::from_records(
        (1..=14)
            .map(|d| shift_scout::signals::WeatherRecord {
                city_id: CITY,
                date: chrono::NaiveDate::from_ymd_opt(2023, 1, d).unwrap(),
                condition: shift_scout::signals::WeatherCondition::Clear,
            })
            .collect(),
    );

    let explicit = RecommendationService::new(CachedSolver::new(
        optimizer_with_signals(Arc::new(surge), Arc::new(weather)),
        CacheStack::disabled(),
    ));
    let omitted = uncached_service();

    for hour in [6, 8, 17] {
        let req = SolveRequest {
            city_id: CITY,
            start: StartZone::Best,
            start_hour: hour,
            duration_hours: 4,
            date: date(),
        };
        let a = explicit.solver().solve(&req).await.unwrap();
        let b = omitted.solver().solve(&req).await.unwrap();
        assert_eq!(a, b);
    }
}

#[tokio::test]
async fn empty_city_yields_no_recommendation_not_an_error() {
    let source = InMemorySource::new().with_city(9, shift_scout::data::CityTables::default());
    let store = Arc::new(GraphStore::new(Box::new(source), "unused").without_snapshots());
    let rates = shift_scout::engine::RateModel::new(
        shift_scout::config::OPTIMIZER.rate,
        Arc::new(shift_scout::signals::NeutralSurge),
        Arc::new(shift_scout::signals::NeutralWeather),
    );
    let optimizer =
        shift_scout::engine::MobilityOptimizer::new(store, rates, shift_scout::config::OPTIMIZER.dp);
    let service =
        RecommendationService::new(CachedSolver::new(optimizer, CacheStack::disabled()));

    assert!(
        service
            .best_zone_for_time(9, 8, 4, date())
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        service
            .all_zone_scores(9, 8, 4, date(), None)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        service
            .optimal_start_time(9, StartZone::Best, 6, 12, 4, date(), None)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn unknown_city_is_a_request_error() {
    let service = memory_cached_service();
    let err = service
        .best_zone_for_time(404, 8, 4, date())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        shift_scout::error::EngineError::DataUnavailable { city: 404 }
    );
}

#[tokio::test]
async fn weekly_outlook_covers_seven_days() {
    let service = memory_cached_service();
    let days = service
        .weekly_outlook(CITY, StartZone::Zone("c_3_center".into()), 8, 4, date())
        .await
        .unwrap();

    assert_eq!(days.len(), 7);
    assert_eq!(days[0].day_of_week, "Sunday"); // 2023-01-15
    assert!(days.iter().all(|d| d.expected_earnings >= 0.0));
    // Neutral weather means every day solves identically.
    assert!(
        days.windows(2)
            .all(|w| w[0].expected_earnings == w[1].expected_earnings)
    );
}
