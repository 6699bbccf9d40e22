//! Per-station profile classification along corridor lines.

use log::{debug, info};

use crate::boundary::{deblai_attributes, remblai_attributes, StructureAttributes};
use crate::config::{AnalysisConfig, OffsetBands};
use crate::error::StationFailure;
use crate::geometry::{Point, Polyline};
use crate::raster::ElevationSource;
use crate::section::CrossSection;
use crate::terrain::TerrainModel;

/// Profile classification of one corridor station.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Classification {
    /// Embankment: roadway raised above natural terrain.
    Remblai,
    /// Cut: roadway lowered below natural terrain.
    Deblai,
    /// At grade: roadway close to natural terrain.
    Rasant,
    /// Required elevation undefined.
    Unknown,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Classification::Remblai => "remblai",
            Classification::Deblai => "deblai",
            Classification::Rasant => "rasant",
            Classification::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One source line of the corridor with its roadway attributes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CorridorLine {
    pub geometry: Polyline,
    pub lane_count: u32,
    pub pavement_width: f64,
    pub route: String,
}

/// Classification record produced every metre along a corridor line.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClassifiedStation {
    pub position: Point,
    pub classification: Classification,
    /// Mean elevation over the roadway band.
    pub roadway_elevation: Option<f64>,
    /// Modelled natural elevation under the roadway centre.
    pub natural_elevation: Option<f64>,
    /// `roadway_elevation - natural_elevation`.
    pub height_difference: Option<f64>,
    /// Goodness of fit of the terrain model that classified this station.
    pub model_r_squared: Option<f64>,
    /// Structure extent attributes, populated for remblai/deblai stations.
    pub structure: StructureAttributes,
    pub lane_count: u32,
    pub road_width: f64,
    pub route: String,
}

/// Classifies a height difference against the configured thresholds.
///
/// Pure function of its inputs; `None` maps to [`Classification::Unknown`].
pub fn classify_height_difference(
    height_difference: Option<f64>,
    cfg: &AnalysisConfig,
) -> Classification {
    match height_difference {
        None => Classification::Unknown,
        Some(hd) if hd >= cfg.threshold_remblai => Classification::Remblai,
        Some(hd) if hd <= cfg.threshold_deblai => Classification::Deblai,
        Some(_) => Classification::Rasant,
    }
}

/// Classifies every station of `line` at the configured step.
pub fn classify_line(
    line: &CorridorLine,
    sampler: &dyn ElevationSource,
    cfg: &AnalysisConfig,
) -> Vec<ClassifiedStation> {
    let bands = OffsetBands::for_lane_count(line.lane_count);
    let length = line.geometry.length();
    let mut stations = Vec::new();
    let mut station = 0.0;
    info!(
        "classifying line of {:.0} m on route {} ({} lanes)",
        length, line.route, line.lane_count
    );
    while station <= length {
        let Some(position) = line.geometry.point_at(station) else {
            break;
        };
        stations.push(classify_station(line, sampler, cfg, &bands, station, position));
        if station as u64 % 100 == 0 {
            debug!("station {:.0}/{:.0}", station, length);
        }
        station += cfg.station_step;
    }
    stations
}

/// Classifies all selected corridor lines in order.
pub fn classify_lines(
    lines: &[CorridorLine],
    sampler: &dyn ElevationSource,
    cfg: &AnalysisConfig,
) -> Vec<ClassifiedStation> {
    lines
        .iter()
        .flat_map(|line| classify_line(line, sampler, cfg))
        .collect()
}

fn classify_station(
    line: &CorridorLine,
    sampler: &dyn ElevationSource,
    cfg: &AnalysisConfig,
    bands: &OffsetBands,
    station: f64,
    position: Point,
) -> ClassifiedStation {
    let unknown = |failure: StationFailure| ClassifiedStation {
        position,
        classification: Classification::Unknown,
        roadway_elevation: None,
        natural_elevation: None,
        height_difference: None,
        model_r_squared: None,
        structure: StructureAttributes::failed(failure),
        lane_count: line.lane_count,
        road_width: line.pavement_width,
        route: line.route.clone(),
    };

    let Some(section) =
        CrossSection::at_station(&line.geometry, station, cfg.cross_section_half_length)
    else {
        return unknown(StationFailure::NoData);
    };

    let roadway =
        section.mean_elevation(sampler, bands.roadway.start, bands.roadway.end);
    let model = match TerrainModel::from_section(&section, sampler, bands) {
        Ok(m) => m,
        Err(failure) => return unknown(failure),
    };
    let natural = model.predict(cfg.cross_section_half_length);

    let Some(roadway) = roadway else {
        let mut st = unknown(StationFailure::NoData);
        st.natural_elevation = Some(natural);
        st.model_r_squared = Some(model.r_squared);
        return st;
    };

    let height_difference = roadway - natural;
    let classification = classify_height_difference(Some(height_difference), cfg);

    let structure = match classification {
        Classification::Remblai => {
            remblai_attributes(&section, sampler, &model, cfg.boundary_scan_step)
        }
        Classification::Deblai => {
            deblai_attributes(&section, sampler, &model, cfg.boundary_scan_step)
        }
        _ => StructureAttributes::default(),
    };

    ClassifiedStation {
        position,
        classification,
        roadway_elevation: Some(roadway),
        natural_elevation: Some(natural),
        height_difference: Some(height_difference),
        model_r_squared: Some(model.r_squared),
        structure,
        lane_count: line.lane_count,
        road_width: line.pavement_width,
        route: line.route.clone(),
    }
}
