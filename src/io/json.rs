//! JSON persistence for classification and segment results.

use serde::{Deserialize, Serialize};

use crate::detector::DetectionOutput;
use crate::profile::ClassifiedStation;
use crate::segments::StructureSegment;

/// On-disk envelope for one analysis run.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisDocument {
    pub stations: Vec<ClassifiedStation>,
    pub segments: Vec<StructureSegment>,
}

impl From<DetectionOutput> for AnalysisDocument {
    fn from(output: DetectionOutput) -> Self {
        Self {
            stations: output.stations,
            segments: output.segments,
        }
    }
}

pub fn read_analysis_json(path: &str) -> std::io::Result<AnalysisDocument> {
    let contents = crate::io::read_to_string(path)?;
    let doc: AnalysisDocument = serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(doc)
}

pub fn write_analysis_json(path: &str, doc: &AnalysisDocument) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(doc).map_err(std::io::Error::other)?;
    crate::io::write_string(path, &json)
}

pub fn read_segments_json(path: &str) -> std::io::Result<Vec<StructureSegment>> {
    let contents = crate::io::read_to_string(path)?;
    let segments: Vec<StructureSegment> = serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(segments)
}

pub fn write_segments_json(path: &str, segments: &[StructureSegment]) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(segments).map_err(std::io::Error::other)?;
    crate::io::write_string(path, &json)
}
