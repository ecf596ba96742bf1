//! Aggregation pipeline: per-sensor rounded PM2.5 means.
//!
//! The dashboard's table, scatter plot, and map all consume the same
//! derived rows, recomputed from scratch on every request:
//!
//! 1. fetch the readings joined to sensor metadata in one read-only query,
//! 2. parse the fixed-pattern text timestamps,
//! 3. order the readings chronologically across *all* sensors combined,
//! 4. drop the first [`WARMUP_OFFSET`] readings of that global sequence
//!    (calibration burn-in; the skip is global, never per-sensor),
//! 5. drop non-positive readings (sensor noise),
//! 6. group by sensor and round the mean, with sensors ordered by their
//!    earliest qualifying reading.
//!
//! Nothing is cached or persisted: the rows live for one response.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use sqlx::PgPool;
use tracing::debug;

use crate::error::AppError;
use crate::models::{ReadingRow, SensorAverage};
use crate::quality::AirQuality;

// ---

/// Number of earliest readings, counted over the combined chronological
/// sequence, excluded from every aggregation as calibration burn-in.
pub const WARMUP_OFFSET: usize = 714;

/// Storage pattern for `sensor_readings.measured_at`. Readings that do not
/// parse with this pattern abort the request with a timestamp error.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Knobs for [`aggregate`]. The defaults are what the HTTP endpoints use;
/// tests exercise other combinations.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Count of earliest global readings to discard.
    pub warmup_offset: usize,
    /// Discard readings with `pm25 <= 0` (after the warm-up skip).
    pub positive_only: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            warmup_offset: WARMUP_OFFSET,
            positive_only: true,
        }
    }
}

// ---

/// The single read against the store: every reading joined to its sensor's
/// display metadata. Readings for sensors missing from the metadata table
/// drop out here (inner join), before any aggregation.
///
/// Ordered by insertion id so that equal timestamps later resolve to a
/// deterministic order.
pub async fn fetch_reading_rows(pool: &PgPool) -> Result<Vec<ReadingRow>, AppError> {
    // ---
    let rows = sqlx::query_as::<_, ReadingRow>(
        r#"
        SELECT r.sensor_id, s.name, s.municipio, r.measured_at, r.pm25
        FROM sensor_readings r
        JOIN sensors s ON s.sensor_id = r.sensor_id
        ORDER BY r.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetch and aggregate with the production options. Recomputed on every
/// call; there is deliberately no caching layer in front of this.
pub async fn load_sensor_averages(pool: &PgPool) -> Result<Vec<SensorAverage>, AppError> {
    // ---
    let rows = fetch_reading_rows(pool).await?;
    debug!("fetched {} joined readings", rows.len());

    let averages = aggregate(rows, &AggregateOptions::default())?;
    debug!("aggregated {} sensors", averages.len());

    Ok(averages)
}

/// Reduce joined reading rows to one [`SensorAverage`] per sensor.
///
/// Errors: a `measured_at` that does not match [`TIMESTAMP_FORMAT`] aborts
/// with [`AppError::Timestamp`]; an aggregation with no surviving readings
/// is [`AppError::NoData`]; a mean outside the quality scale (possible only
/// with `positive_only` off) is [`AppError::Unclassifiable`].
pub fn aggregate(
    rows: Vec<ReadingRow>,
    opts: &AggregateOptions,
) -> Result<Vec<SensorAverage>, AppError> {
    // ---

    // Parse every timestamp up front; the fixed pattern is a hard contract
    // with the ingestion job.
    let mut parsed = Vec::with_capacity(rows.len());
    for row in rows {
        let measured_at = NaiveDateTime::parse_from_str(&row.measured_at, TIMESTAMP_FORMAT)
            .map_err(|source| AppError::Timestamp {
                raw: row.measured_at.clone(),
                source,
            })?;
        parsed.push((measured_at, row));
    }

    // Global chronological order. The sort is stable, so readings sharing a
    // timestamp keep their fetch (insertion) order.
    parsed.sort_by_key(|(measured_at, _)| *measured_at);

    // The burn-in skip applies to the raw global sequence; the positivity
    // filter only to what survives it.
    let qualifying = parsed
        .into_iter()
        .skip(opts.warmup_offset)
        .filter(|(_, row)| !opts.positive_only || row.pm25 > 0.0);

    // Group in order of first qualifying reading, which with the
    // chronological iteration is exactly "earliest qualifying timestamp".
    struct Accumulator {
        name: String,
        municipio: String,
        sum: f64,
        count: u32,
    }

    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut groups: Vec<(i64, Accumulator)> = Vec::new();

    for (_, row) in qualifying {
        match index.get(&row.sensor_id) {
            Some(&slot) => {
                let acc = &mut groups[slot].1;
                acc.sum += row.pm25;
                acc.count += 1;
            }
            None => {
                index.insert(row.sensor_id, groups.len());
                groups.push((
                    row.sensor_id,
                    Accumulator {
                        name: row.name,
                        municipio: row.municipio,
                        sum: row.pm25,
                        count: 1,
                    },
                ));
            }
        }
    }

    if groups.is_empty() {
        return Err(AppError::NoData);
    }

    let mut averages = Vec::with_capacity(groups.len());
    for (sensor_id, acc) in groups {
        let avg_pm25 = (acc.sum / f64::from(acc.count)).round() as i64;
        let quality = AirQuality::from_avg(avg_pm25).ok_or(AppError::Unclassifiable {
            sensor_id,
            avg_pm25,
        })?;

        averages.push(SensorAverage {
            sensor_id,
            name: acc.name,
            municipio: acc.municipio,
            avg_pm25,
            quality,
            color: quality.color(),
        });
    }

    Ok(averages)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn reading(sensor_id: i64, pm25: f64, measured_at: &str) -> ReadingRow {
        // ---
        ReadingRow {
            sensor_id,
            name: format!("Sensor {sensor_id}"),
            municipio: "Monterrey".to_string(),
            measured_at: measured_at.to_string(),
            pm25,
        }
    }

    fn opts(warmup_offset: usize) -> AggregateOptions {
        // ---
        AggregateOptions {
            warmup_offset,
            positive_only: true,
        }
    }

    #[test]
    fn test_two_sensor_scenario_with_zero_offset() {
        // ---
        let rows = vec![
            reading(1, 10.0, "2023-05-01 00:00:00"),
            reading(1, 80.0, "2023-05-01 01:00:00"),
            reading(2, 30.0, "2023-05-01 02:00:00"),
        ];

        let averages = aggregate(rows, &opts(0)).expect("aggregate");
        assert_eq!(averages.len(), 2);

        assert_eq!(averages[0].sensor_id, 1);
        assert_eq!(averages[0].avg_pm25, 45);
        assert_eq!(averages[0].quality.label(), "Aceptable");

        assert_eq!(averages[1].sensor_id, 2);
        assert_eq!(averages[1].avg_pm25, 30);
        assert_eq!(averages[1].quality.label(), "Aceptable");
    }

    #[test]
    fn test_mean_rounds_half_up() {
        // ---
        let rows = vec![
            reading(1, 1.0, "2023-05-01 00:00:00"),
            reading(1, 2.0, "2023-05-01 01:00:00"),
        ];
        let averages = aggregate(rows, &opts(0)).expect("aggregate");
        assert_eq!(averages[0].avg_pm25, 2); // 1.5 rounds up

        let rows = vec![
            reading(2, 2.0, "2023-05-01 00:00:00"),
            reading(2, 3.0, "2023-05-01 01:00:00"),
            reading(2, 4.0, "2023-05-01 02:00:00"),
            reading(2, 6.0, "2023-05-01 03:00:00"),
        ];
        let averages = aggregate(rows, &opts(0)).expect("aggregate");
        assert_eq!(averages[0].avg_pm25, 4); // 3.75

        let rows = vec![reading(3, 0.4, "2023-05-01 00:00:00")];
        let averages = aggregate(rows, &opts(0)).expect("aggregate");
        assert_eq!(averages[0].avg_pm25, 0);
        assert_eq!(averages[0].quality.label(), "Buena");
    }

    #[test]
    fn test_offset_skips_earliest_readings_globally() {
        // ---
        // The two earliest readings belong to different sensors; a global
        // skip of 2 must drop both, not two per sensor.
        let rows = vec![
            reading(1, 10.0, "2023-05-01 00:00:00"),
            reading(2, 20.0, "2023-05-01 01:00:00"),
            reading(1, 30.0, "2023-05-01 02:00:00"),
            reading(2, 40.0, "2023-05-01 03:00:00"),
        ];

        let averages = aggregate(rows, &opts(2)).expect("aggregate");
        assert_eq!(averages.len(), 2);
        assert_eq!(averages[0].sensor_id, 1);
        assert_eq!(averages[0].avg_pm25, 30);
        assert_eq!(averages[1].sensor_id, 2);
        assert_eq!(averages[1].avg_pm25, 40);
    }

    #[test]
    fn test_offset_applies_before_positive_filter() {
        // ---
        // The non-positive reading sits inside the burn-in window, so it is
        // consumed by the offset; the filter must not shift the skip onto a
        // later, valid reading.
        let rows = vec![
            reading(1, -5.0, "2023-05-01 00:00:00"),
            reading(1, 10.0, "2023-05-01 01:00:00"),
            reading(1, 20.0, "2023-05-01 02:00:00"),
        ];

        let averages = aggregate(rows, &opts(1)).expect("aggregate");
        assert_eq!(averages[0].avg_pm25, 15);
    }

    #[test]
    fn test_sensor_swallowed_by_burn_in_is_absent() {
        // ---
        let rows = vec![
            reading(1, 10.0, "2023-05-01 00:00:00"),
            reading(1, 12.0, "2023-05-01 01:00:00"),
            reading(2, 50.0, "2023-05-01 02:00:00"),
        ];

        let averages = aggregate(rows, &opts(2)).expect("aggregate");
        // Sensor 1 is gone entirely, not present with a null average.
        assert_eq!(averages.len(), 1);
        assert_eq!(averages[0].sensor_id, 2);
        assert_eq!(averages[0].avg_pm25, 50);
    }

    #[test]
    fn test_result_ordered_by_earliest_qualifying_reading() {
        // ---
        // Sensor 2 holds the earliest reading overall, but it falls inside
        // the burn-in window; ordering goes by the earliest reading that
        // actually qualifies.
        let rows = vec![
            reading(2, 10.0, "2023-05-01 00:00:00"),
            reading(1, 20.0, "2023-05-01 01:00:00"),
            reading(2, 30.0, "2023-05-01 02:00:00"),
        ];

        let averages = aggregate(rows, &opts(1)).expect("aggregate");
        let order: Vec<i64> = averages.iter().map(|a| a.sensor_id).collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn test_default_burn_in_is_714_readings() {
        // ---
        let stamp = |i: usize| format!("2023-01-01 {:02}:{:02}:00", i / 60, i % 60);

        let rows: Vec<ReadingRow> = (0..714)
            .map(|i| reading(1, (i + 1) as f64, &stamp(i)))
            .collect();
        let err = aggregate(rows, &AggregateOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::NoData));

        // One more reading and exactly that chronologically-last one
        // participates.
        let rows: Vec<ReadingRow> = (0..715)
            .map(|i| reading(1, (i + 1) as f64, &stamp(i)))
            .collect();
        let averages = aggregate(rows, &AggregateOptions::default()).expect("aggregate");
        assert_eq!(averages.len(), 1);
        assert_eq!(averages[0].avg_pm25, 715);
        assert_eq!(averages[0].quality.label(), "Extremadamente Mala");
    }

    #[test]
    fn test_empty_input_is_no_data() {
        // ---
        let err = aggregate(Vec::new(), &opts(0)).unwrap_err();
        assert!(matches!(err, AppError::NoData));
    }

    #[test]
    fn test_malformed_timestamp_is_an_error() {
        // ---
        let rows = vec![reading(1, 10.0, "14/05/2023 17:00")];
        match aggregate(rows, &opts(0)).unwrap_err() {
            AppError::Timestamp { raw, .. } => assert_eq!(raw, "14/05/2023 17:00"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_positive_only_drops_nonpositive_readings() {
        // ---
        let rows = vec![
            reading(1, 0.0, "2023-05-01 00:00:00"),
            reading(1, -4.0, "2023-05-01 01:00:00"),
            reading(1, 10.0, "2023-05-01 02:00:00"),
        ];

        let averages = aggregate(rows.clone(), &opts(0)).expect("aggregate");
        assert_eq!(averages[0].avg_pm25, 10);

        let lenient = AggregateOptions {
            warmup_offset: 0,
            positive_only: false,
        };
        let averages = aggregate(rows, &lenient).expect("aggregate");
        assert_eq!(averages[0].avg_pm25, 2); // (0 - 4 + 10) / 3
    }

    #[test]
    fn test_lenient_negative_average_is_unclassifiable() {
        // ---
        let lenient = AggregateOptions {
            warmup_offset: 0,
            positive_only: false,
        };
        let rows = vec![reading(7, -30.0, "2023-05-01 00:00:00")];
        match aggregate(rows, &lenient).unwrap_err() {
            AppError::Unclassifiable { sensor_id, avg_pm25 } => {
                assert_eq!(sensor_id, 7);
                assert_eq!(avg_pm25, -30);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_equal_timestamps_keep_fetch_order() {
        // ---
        let rows = vec![
            reading(5, 10.0, "2023-05-01 00:00:00"),
            reading(3, 20.0, "2023-05-01 00:00:00"),
        ];

        let averages = aggregate(rows, &opts(0)).expect("aggregate");
        let order: Vec<i64> = averages.iter().map(|a| a.sensor_id).collect();
        assert_eq!(order, vec![5, 3]);
    }
}
