//! Decoded search-engine output and the merged, normalized PSM collection.
//!
//! The structures prefixed with nothing but plain names (`RunSummary`,
//! `SpectrumQuery`, `SearchHit`, ...) mirror the already-decoded pepXML
//! document. [`PepXml`] is the normalized form used by the rest of the
//! pipeline.

use crate::modification::{Modification, ModificationIndex, Site};
use crate::psm::{promote_protein_ids, PeptideSpectrumMatch};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AminoAcidModification {
    pub aminoacid: String,
    pub mass: f64,
    pub massdiff: f64,
    /// "Y" for variable modifications
    pub variable: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct TerminalModification {
    /// "n" or "c"
    pub terminus: String,
    pub mass: f64,
    pub massdiff: f64,
    pub variable: String,
    pub protein_terminus: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SearchSummary {
    pub search_engine: String,
    pub search_engine_version: String,
    pub search_database: String,
    pub amino_acid_modifications: Vec<AminoAcidModification>,
    pub terminal_modifications: Vec<TerminalModification>,
    pub parameters: Vec<Parameter>,
}

/// One decoded pepXML document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct RunSummary {
    pub base_name: String,
    pub raw_data: String,
    /// Name of the last analysis applied ("peptideprophet", "interprophet")
    pub analysis: String,
    pub search_summary: SearchSummary,
    pub spectrum_queries: Vec<SpectrumQuery>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SpectrumQuery {
    pub index: u32,
    pub spectrum: String,
    pub start_scan: u32,
    pub assumed_charge: u8,
    pub retention_time_sec: f64,
    pub ion_mobility: f64,
    pub compensation_voltage: String,
    pub precursor_neutral_mass: f64,
    pub uncalibrated_precursor_neutral_mass: f64,
    pub precursor_intensity: f64,
    /// Precursor isolation purity, 0 when not measured
    pub purity: f64,
    /// Reporter ion intensities in channel order of the labeling kit
    pub reporter_intensities: Vec<f64>,
    pub search_hits: Vec<SearchHit>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SearchHit {
    pub hit_rank: u8,
    pub peptide: String,
    pub prev_aa: String,
    pub next_aa: String,
    pub protein: String,
    pub alternative_proteins: Vec<String>,
    pub calc_neutral_pep_mass: f64,
    pub massdiff: f64,
    pub num_tol_term: u8,
    pub num_missed_cleavages: u8,
    pub num_tot_proteins: u16,
    pub tot_num_ions: u16,
    pub num_matched_ions: u16,
    pub is_rejected: u8,
    pub scores: Vec<Parameter>,
    pub modification_info: Option<ModificationInfo>,
    pub analysis_results: Vec<AnalysisResult>,
    pub ptm_result: Option<PtmResult>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ModificationInfo {
    pub modified_peptide: String,
    /// 0 when the N-terminus is unmodified
    pub mod_nterm_mass: f64,
    pub mod_cterm_mass: f64,
    pub mod_aminoacid_mass: Vec<ModAminoacidMass>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ModAminoacidMass {
    /// 1-based residue position
    pub position: u16,
    pub mass: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "analysis", rename_all = "lowercase")]
pub enum AnalysisResult {
    PeptideProphet {
        probability: f64,
        #[serde(default)]
        parameters: Vec<Parameter>,
    },
    InterProphet {
        probability: f64,
    },
    PtmProphet {
        #[serde(default)]
        results: Vec<PtmProphetResult>,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct PtmProphetResult {
    pub ptm: String,
    pub ptm_peptide: String,
    pub mod_aminoacid_probabilities: Vec<ModAminoacidProbability>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ModAminoacidProbability {
    pub position: u16,
    pub probability: f64,
}

/// MSFragger localization output
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct PtmResult {
    pub localization_peptide: String,
    pub best_score_with_ptm: String,
    pub score_without_ptm: String,
}

/// Normalized, merged view over one or more decoded pepXML documents
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PepXml {
    pub file_name: String,
    pub spectra_file: String,
    pub database: String,
    pub search_engine: String,
    pub prophet: String,
    pub decoy_tag: String,
    pub parameters: Vec<Parameter>,
    pub modifications: ModificationIndex,
    pub psms: Vec<PeptideSpectrumMatch>,
}

/// Build the modification catalog declared by a search summary
pub fn catalog(summary: &SearchSummary) -> Result<ModificationIndex, Error> {
    let mut index = ModificationIndex::default();
    for m in &summary.amino_acid_modifications {
        let site = m.aminoacid.parse::<Site>()?;
        index.insert(Modification::catalog(
            site,
            m.mass,
            m.massdiff,
            m.variable.eq_ignore_ascii_case("y"),
            false,
        ));
    }
    for m in &summary.terminal_modifications {
        let site = Site::terminus(&m.terminus)?;
        index.insert(Modification::catalog(
            site,
            m.mass,
            m.massdiff,
            m.variable.eq_ignore_ascii_case("y"),
            m.protein_terminus.eq_ignore_ascii_case("y"),
        ));
    }
    Ok(index)
}

impl PepXml {
    /// Normalize a single decoded document. `file_name` scopes the spectrum
    /// identifiers of this document.
    pub fn from_run(file_name: &str, run: RunSummary, decoy_tag: &str) -> Result<Self, Error> {
        let summary = run.search_summary;
        let modifications = catalog(&summary)?;

        let search_engine = if summary.search_engine_version.contains("MSFragger") {
            "MSFragger".to_string()
        } else {
            summary.search_engine.clone()
        };

        let psms = run
            .spectrum_queries
            .iter()
            .filter_map(|query| PeptideSpectrumMatch::from_query(query, &modifications, file_name))
            .collect::<Vec<_>>();

        if psms.is_empty() {
            log::warn!("{}: no PSMs found", file_name);
        } else {
            log::info!("{}: read {} PSMs", file_name, psms.len());
        }

        Ok(PepXml {
            file_name: file_name.into(),
            spectra_file: format!("{}{}", run.base_name, run.raw_data),
            database: summary.search_database,
            search_engine,
            prophet: run.analysis,
            decoy_tag: decoy_tag.into(),
            parameters: summary.parameters,
            modifications,
            psms,
        })
    }

    /// Read and normalize one decoded document from disk
    pub fn read<P: AsRef<Path>>(path: P, decoy_tag: &str) -> Result<Self, Error> {
        let path = path.as_ref();
        let run: RunSummary = crate::read_json(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_run(&file_name, run, decoy_tag)
    }

    /// Combine normalized documents into one collection: modification
    /// catalogs are unioned, decoy PSMs with target alternatives are
    /// promoted, and PSMs are ordered by descending probability.
    pub fn merge(files: Vec<PepXml>, decoy_tag: &str) -> Result<Self, Error> {
        let names = files
            .iter()
            .map(|f| f.file_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let mut merged = PepXml {
            decoy_tag: decoy_tag.into(),
            ..Default::default()
        };

        for file in files {
            merged.modifications.merge(&file.modifications);
            merged.parameters = file.parameters;
            merged.search_engine = file.search_engine;
            merged.prophet = file.prophet;
            merged.database = file.database;
            merged.spectra_file = file.spectra_file;
            merged.file_name = file.file_name;
            merged.psms.extend(file.psms);
        }

        if merged.psms.is_empty() {
            return Err(Error::NoPsms(names));
        }

        let promoted = promote_protein_ids(&mut merged.psms, decoy_tag);
        log::info!("promoted {} decoy PSMs to target proteins", promoted);

        merged
            .psms
            .sort_by(|a, b| b.probability.total_cmp(&a.probability));
        Ok(merged)
    }

    /// Read every selected input and merge them
    pub fn read_all(paths: &[PathBuf], decoy_tag: &str) -> Result<Self, Error> {
        let files = select_inputs(paths)?
            .iter()
            .map(|path| PepXml::read(path, decoy_tag))
            .collect::<Result<Vec<_>, _>>()?;
        Self::merge(files, decoy_tag)
    }

    pub fn is_comet(&self) -> bool {
        self.search_engine.eq_ignore_ascii_case("comet")
    }
}

fn is_pepxml_name(name: &str) -> bool {
    name.contains("pep.xml") || name.contains("pepXML")
}

/// Expand the configured pepXML inputs. Files are taken as given;
/// directories contribute every pepXML document they contain, restricted to
/// PTM-localization output (`.mod.`) whenever any is present.
pub fn select_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, Error> {
    let mut selected = Vec::new();
    for path in paths {
        if !path.is_dir() {
            selected.push(path.clone());
            continue;
        }

        let mut found = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_file() && is_pepxml_name(&name) {
                found.push((name, entry.path()));
            }
        }

        if found.is_empty() {
            return Err(Error::MissingInput(format!(
                "no pepXML files in {}",
                path.display()
            )));
        }

        let localized = found.iter().any(|(name, _)| name.contains(".mod."));
        let mut found = found
            .into_iter()
            .filter(|(name, _)| !localized || name.contains(".mod."))
            .map(|(_, path)| path)
            .collect::<Vec<_>>();
        found.sort();
        selected.extend(found);
    }

    if selected.is_empty() {
        return Err(Error::MissingInput("pepXML paths".into()));
    }
    Ok(selected)
}
