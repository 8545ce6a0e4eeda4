//! Parasite class labels and the ordered class set a model's outputs map to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, Result};

/// Number of output classes every model and the simulator work with.
pub const CLASS_COUNT: usize = 5;

/// Every label the detector knows how to describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLabel {
    Ascaris,
    Giardia,
    Hookworm,
    Entamoeba,
    Hymenolepis,
    Trichuris,
    Negative,
}

/// Static educational text shown next to a result.
#[derive(Debug, Clone, Copy)]
pub struct ClassInfo {
    pub title: &'static str,
    pub description: &'static str,
    pub transmission: &'static str,
    pub recommendation: &'static str,
}

impl ClassLabel {
    pub const ALL: [ClassLabel; 7] = [
        ClassLabel::Ascaris,
        ClassLabel::Giardia,
        ClassLabel::Hookworm,
        ClassLabel::Entamoeba,
        ClassLabel::Hymenolepis,
        ClassLabel::Trichuris,
        ClassLabel::Negative,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ClassLabel::Ascaris => "Ascaris",
            ClassLabel::Giardia => "Giardia",
            ClassLabel::Hookworm => "Hookworm",
            ClassLabel::Entamoeba => "Entamoeba",
            ClassLabel::Hymenolepis => "Hymenolepis",
            ClassLabel::Trichuris => "Trichuris",
            ClassLabel::Negative => "Negative",
        }
    }

    pub fn is_parasite(self) -> bool {
        self != ClassLabel::Negative
    }

    pub fn info(self) -> ClassInfo {
        match self {
            ClassLabel::Ascaris => ClassInfo {
                title: "Ascaris lumbricoides (roundworm)",
                description: "Large intestinal roundworm. Eggs are oval with a thick, mammillated shell.",
                transmission: "Ingestion of eggs from soil-contaminated food, water or hands.",
                recommendation: "Consult a physician. Usually treated with albendazole or mebendazole.",
            },
            ClassLabel::Giardia => ClassInfo {
                title: "Giardia lamblia (intestinal protozoan)",
                description: "Flagellated protozoan. Cysts are oval with two to four nuclei.",
                transmission: "Cysts in contaminated drinking water or food, and person-to-person contact.",
                recommendation: "Consult a physician. Usually treated with metronidazole or tinidazole.",
            },
            ClassLabel::Hookworm => ClassInfo {
                title: "Hookworm (Ancylostoma / Necator)",
                description: "Blood-feeding intestinal nematode. Eggs are thin-shelled with a segmented embryo.",
                transmission: "Larvae in contaminated soil penetrate the skin, usually of bare feet.",
                recommendation: "Consult a physician. Treatment with albendazole; check for anaemia.",
            },
            ClassLabel::Entamoeba => ClassInfo {
                title: "Entamoeba histolytica (amoeba)",
                description: "Intestinal amoeba. Mature cysts are spherical with up to four nuclei.",
                transmission: "Fecal-oral route through contaminated water or food.",
                recommendation: "Consult a physician. Treatment with metronidazole followed by a luminal agent.",
            },
            ClassLabel::Hymenolepis => ClassInfo {
                title: "Hymenolepis nana (dwarf tapeworm)",
                description: "Small cestode. Eggs are round with an inner membrane bearing polar filaments.",
                transmission: "Ingestion of eggs from contaminated hands, food or water.",
                recommendation: "Consult a physician. Usually treated with praziquantel.",
            },
            ClassLabel::Trichuris => ClassInfo {
                title: "Trichuris trichiura (whipworm)",
                description: "Intestinal nematode. Eggs are barrel-shaped with two polar plugs.",
                transmission: "Ingestion of embryonated eggs from contaminated soil.",
                recommendation: "Consult a physician. Usually treated with albendazole or mebendazole.",
            },
            ClassLabel::Negative => ClassInfo {
                title: "No parasites detected",
                description: "No parasitic structures were recognised in the sample image.",
                transmission: "Not applicable.",
                recommendation: "Keep up hygiene habits. Repeat the test if symptoms persist.",
            },
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClassLabel {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        ClassLabel::ALL
            .into_iter()
            .find(|label| label.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DetectorError::InvalidClassSet(format!("unknown class label '{s}'")))
    }
}

/// The ordered labels a model's output indices map to. Fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSet {
    labels: [ClassLabel; CLASS_COUNT],
}

impl Default for ClassSet {
    fn default() -> Self {
        Self {
            labels: [
                ClassLabel::Ascaris,
                ClassLabel::Giardia,
                ClassLabel::Hookworm,
                ClassLabel::Trichuris,
                ClassLabel::Negative,
            ],
        }
    }
}

impl ClassSet {
    pub fn new(labels: &[ClassLabel]) -> Result<Self> {
        let labels: [ClassLabel; CLASS_COUNT] = labels.try_into().map_err(|_| {
            DetectorError::InvalidClassSet(format!(
                "expected {CLASS_COUNT} labels, got {}",
                labels.len()
            ))
        })?;
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(DetectorError::InvalidClassSet(format!(
                    "duplicate label '{label}'"
                )));
            }
        }
        Ok(Self { labels })
    }

    /// Parse a class set from label names, e.g. from configuration.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let labels = names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<ClassLabel>>>()?;
        Self::new(&labels)
    }

    pub fn label(&self, index: usize) -> Option<ClassLabel> {
        self.labels.get(index).copied()
    }

    pub fn labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn names(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.name().to_string()).collect()
    }
}
