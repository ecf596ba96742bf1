//! Air-quality classification for rounded PM2.5 averages.
//!
//! The dashboard buckets each sensor's average into one of five ordered
//! categories, from "Buena" (good) up to "Extremadamente Mala" (extremely
//! bad). The same mapping drives the data table, the scatter-plot marker
//! colors, and the map marker colors, so it lives here as a single pure
//! function over the already-rounded integer average.

use std::fmt;

use serde::Serialize;

// ---

/// Ordered air-quality category for a rounded PM2.5 average (µg/m³).
///
/// Serializes as its display label ("Buena", "Muy Mala", ...), which is the
/// form the grid and plot components consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum AirQuality {
    Buena,
    Aceptable,
    Mala,
    #[serde(rename = "Muy Mala")]
    MuyMala,
    #[serde(rename = "Extremadamente Mala")]
    ExtremadamenteMala,
}

impl AirQuality {
    // ---

    /// Classify a rounded average into its category.
    ///
    /// Total over all non-negative integers. Negative averages have no
    /// defined category (they cannot occur while the pipeline discards
    /// non-positive readings) and yield `None` instead of a made-up label.
    pub fn from_avg(avg_pm25: i64) -> Option<Self> {
        // ---
        if avg_pm25 < 0 {
            return None;
        }

        Some(match avg_pm25 {
            0..=25 => Self::Buena,
            26..=45 => Self::Aceptable,
            46..=79 => Self::Mala,
            80..=147 => Self::MuyMala,
            _ => Self::ExtremadamenteMala,
        })
    }

    /// Display label, identical to the serialized form.
    pub fn label(self) -> &'static str {
        // ---
        match self {
            Self::Buena => "Buena",
            Self::Aceptable => "Aceptable",
            Self::Mala => "Mala",
            Self::MuyMala => "Muy Mala",
            Self::ExtremadamenteMala => "Extremadamente Mala",
        }
    }

    /// Representative display color shared by the table, scatter plot, and
    /// map markers.
    pub fn color(self) -> &'static str {
        // ---
        match self {
            Self::Buena => "green",
            Self::Aceptable => "yellow",
            Self::Mala => "orange",
            Self::MuyMala => "red",
            Self::ExtremadamenteMala => "purple",
        }
    }
}

impl fmt::Display for AirQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn label_for(avg: i64) -> &'static str {
        // ---
        AirQuality::from_avg(avg)
            .expect("non-negative average must classify")
            .label()
    }

    #[test]
    fn test_threshold_boundaries() {
        // ---
        // Exact edges of every bucket.
        assert_eq!(label_for(25), "Buena");
        assert_eq!(label_for(26), "Aceptable");
        assert_eq!(label_for(45), "Aceptable");
        assert_eq!(label_for(46), "Mala");
        assert_eq!(label_for(79), "Mala");
        assert_eq!(label_for(80), "Muy Mala");
        assert_eq!(label_for(147), "Muy Mala");
        assert_eq!(label_for(148), "Extremadamente Mala");
    }

    #[test]
    fn test_scale_endpoints() {
        // ---
        assert_eq!(label_for(0), "Buena");
        assert_eq!(label_for(10_000), "Extremadamente Mala");
    }

    #[test]
    fn test_negative_average_has_no_category() {
        // ---
        assert!(AirQuality::from_avg(-1).is_none());
        assert!(AirQuality::from_avg(i64::MIN).is_none());
    }

    #[test]
    fn test_colors() {
        // ---
        assert_eq!(AirQuality::Buena.color(), "green");
        assert_eq!(AirQuality::Aceptable.color(), "yellow");
        assert_eq!(AirQuality::Mala.color(), "orange");
        assert_eq!(AirQuality::MuyMala.color(), "red");
        assert_eq!(AirQuality::ExtremadamenteMala.color(), "purple");
    }

    #[test]
    fn test_serialized_form_matches_label() {
        // ---
        for quality in [
            AirQuality::Buena,
            AirQuality::Aceptable,
            AirQuality::Mala,
            AirQuality::MuyMala,
            AirQuality::ExtremadamenteMala,
        ] {
            let json = serde_json::to_string(&quality).expect("serialize");
            assert_eq!(json, format!("{:?}", quality.label()));
        }
    }

    #[test]
    fn test_categories_are_ordered() {
        // ---
        assert!(AirQuality::Buena < AirQuality::Aceptable);
        assert!(AirQuality::MuyMala < AirQuality::ExtremadamenteMala);
    }
}
