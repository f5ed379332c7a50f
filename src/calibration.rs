//! Per-display lenticular calibration.
//!
//! A profile is constructed with compiled-in defaults and optionally
//! overwritten by a successful load from a JSON file or from device memory.
//! The render loop never mutates it; replacement happens wholesale through an
//! explicit reload.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Error;

/// Schema version this reader understands. Device-memory profiles must match
/// it exactly.
pub const SCHEMA_VERSION: f32 = 0.4;

/// Range and rounding rules for one calibration field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub default: f32,
    pub min: f32,
    pub max: f32,
    pub integer: bool,
}

const fn field(name: &'static str, default: f32, min: f32, max: f32) -> FieldSpec {
    FieldSpec {
        name,
        default,
        min,
        max,
        integer: false,
    }
}

const fn int_field(name: &'static str, default: f32, min: f32, max: f32) -> FieldSpec {
    FieldSpec {
        name,
        default,
        min,
        max,
        integer: true,
    }
}

/// Ordered descriptor table for every clamped field, in wire order. This is
/// the single source of truth for defaults and ranges.
pub const FIELDS: [FieldSpec; 12] = [
    field("Pitch", 49.91, 1.0, 200.0),
    field("Slope", 5.8, -30.0, 30.0),
    field("Center", 0.0, -1.0, 1.0),
    field("View Cone", 40.0, 0.0, 180.0),
    int_field("View Inversion", 0.0, 0.0, 1.0),
    field("Vert Angle", 0.0, -20.0, 20.0),
    int_field("DPI", 338.0, 1.0, 1000.0),
    int_field("Screen Width", 2560.0, 640.0, 6400.0),
    int_field("Screen Height", 1600.0, 480.0, 4800.0),
    int_field("Flip Image X", 0.0, 0.0, 1.0),
    int_field("Flip Image Y", 0.0, 0.0, 1.0),
    int_field("Flip Subpixels", 0.0, 0.0, 1.0),
];

/// Where the in-memory profile came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Provenance {
    /// Nothing loaded; compiled-in defaults in effect.
    #[default]
    Defaults,
    File(PathBuf),
    DeviceMemory,
}

/// Loaded per-display parameters. Field names mirror the JSON the display's
/// calibration tooling writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationProfile {
    #[serde(rename = "configVersion", deserialize_with = "de_scalar")]
    pub version: f32,
    #[serde(deserialize_with = "de_scalar")]
    pub pitch: f32,
    #[serde(deserialize_with = "de_scalar")]
    pub slope: f32,
    #[serde(deserialize_with = "de_scalar")]
    pub center: f32,
    #[serde(rename = "viewCone", deserialize_with = "de_scalar")]
    pub view_cone: f32,
    #[serde(rename = "invView", deserialize_with = "de_scalar")]
    pub invert_view: f32,
    #[serde(rename = "verticalAngle", deserialize_with = "de_scalar")]
    pub vertical_angle: f32,
    #[serde(rename = "DPI", deserialize_with = "de_scalar")]
    pub dpi: f32,
    #[serde(rename = "screenW", deserialize_with = "de_scalar")]
    pub screen_w: f32,
    #[serde(rename = "screenH", deserialize_with = "de_scalar")]
    pub screen_h: f32,
    #[serde(rename = "flipImageX", deserialize_with = "de_scalar")]
    pub flip_x: f32,
    #[serde(rename = "flipImageY", deserialize_with = "de_scalar")]
    pub flip_y: f32,
    #[serde(rename = "flipSubp", deserialize_with = "de_scalar")]
    pub flip_subpixels: f32,
    #[serde(skip)]
    pub provenance: Provenance,
}

/// Calibration files written by the device wrap each number as
/// `{"value": n}`; hand-edited files use bare numbers. Accept both.
fn de_scalar<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bare(f32),
        Wrapped { value: f32 },
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Bare(v) => v,
        Raw::Wrapped { value } => value,
    })
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            pitch: FIELDS[0].default,
            slope: FIELDS[1].default,
            center: FIELDS[2].default,
            view_cone: FIELDS[3].default,
            invert_view: FIELDS[4].default,
            vertical_angle: FIELDS[5].default,
            dpi: FIELDS[6].default,
            screen_w: FIELDS[7].default,
            screen_h: FIELDS[8].default,
            flip_x: FIELDS[9].default,
            flip_y: FIELDS[10].default,
            flip_subpixels: FIELDS[11].default,
            provenance: Provenance::Defaults,
        }
    }
}

impl CalibrationProfile {
    /// Every clamped field paired with its descriptor, in `FIELDS` order.
    fn values_mut(&mut self) -> [(&mut f32, &'static FieldSpec); 12] {
        [
            (&mut self.pitch, &FIELDS[0]),
            (&mut self.slope, &FIELDS[1]),
            (&mut self.center, &FIELDS[2]),
            (&mut self.view_cone, &FIELDS[3]),
            (&mut self.invert_view, &FIELDS[4]),
            (&mut self.vertical_angle, &FIELDS[5]),
            (&mut self.dpi, &FIELDS[6]),
            (&mut self.screen_w, &FIELDS[7]),
            (&mut self.screen_h, &FIELDS[8]),
            (&mut self.flip_x, &FIELDS[9]),
            (&mut self.flip_y, &FIELDS[10]),
            (&mut self.flip_subpixels, &FIELDS[11]),
        ]
    }

    /// Clamp every field to its documented range; integer fields are rounded
    /// first.
    pub fn clamp_to_ranges(&mut self) {
        for (value, spec) in self.values_mut() {
            let mut v = *value;
            if spec.integer {
                v = v.round();
            }
            *value = v.clamp(spec.min, spec.max);
        }
    }

    /// Post-load normalization: the view cone is stored non-negative (sign is
    /// carried by the inversion flag), then everything is clamped.
    fn normalize(&mut self) {
        self.view_cone = self.view_cone.abs();
        self.clamp_to_ranges();
    }

    /// Load a profile from a JSON calibration file.
    ///
    /// # Errors
    /// Fails if the file is absent, unreadable, structurally empty (no
    /// `{`/`}` pair) or not valid JSON. Callers fall back to defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)
            .map_err(|_| Error::MissingCalibration(path.to_path_buf()))?;
        // An existing but unpopulated file is not a parse candidate.
        if !text.contains('{') || !text.contains('}') {
            return Err(Error::EmptyCalibration(path.to_path_buf()));
        }
        let mut profile: Self = serde_json::from_str(&text)?;
        profile.normalize();
        profile.provenance = Provenance::File(path.to_path_buf());
        Ok(profile)
    }

    /// Load from a file, substituting compiled-in defaults on any failure.
    /// Never fatal; the failure is surfaced as a diagnostic only.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from_file(path) {
            Ok(profile) => {
                info!(path = %path.display(), "calibration loaded");
                profile
            }
            Err(err) => {
                warn!(%err, "calibration unavailable, using defaults");
                Self::default()
            }
        }
    }

    /// Adopt a profile read out of device memory by the byte-protocol
    /// collaborator. The schema version must match exactly.
    ///
    /// # Errors
    /// Returns [`Error::VersionMismatch`] when the versions differ; the
    /// caller keeps its defaults in that case.
    pub fn from_device_memory(profile: Self) -> Result<Self, Error> {
        if profile.version != SCHEMA_VERSION {
            return Err(Error::VersionMismatch {
                found: profile.version,
                expected: SCHEMA_VERSION,
            });
        }
        let mut profile = profile;
        profile.normalize();
        profile.provenance = Provenance::DeviceMemory;
        Ok(profile)
    }

    /// Write the profile back out as pretty JSON.
    ///
    /// # Errors
    /// Propagates serialization and filesystem errors.
    pub fn save_to_file(&self, path: &Path) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Display aspect ratio.
    pub fn aspect(&self) -> f32 {
        self.screen_w / self.screen_h
    }
}
