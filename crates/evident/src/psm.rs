use crate::mass::{mz, round_to, MassKey};
use crate::modification::{Modification, ModificationIndex, Site};
use crate::pepxml::{AnalysisResult, SearchHit, SpectrumQuery};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier prefix of reviewed (Swiss-Prot) database entries
pub const REVIEWED_PREFIX: &str = "sp|";

/// Spectrum identifier scoped by the file it was read from, so that
/// identically named spectra from different inputs stay distinct
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpectrumKey {
    pub name: String,
    pub file: String,
}

impl SpectrumKey {
    pub fn new<S: Into<String>, F: Into<String>>(name: S, file: F) -> Self {
        SpectrumKey {
            name: name.into(),
            file: file.into(),
        }
    }

    /// Run name: the spectrum name up to the first '.'
    pub fn run(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }
}

impl std::fmt::Display for SpectrumKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name, self.file)
    }
}

/// One precursor species: peptide sequence, charge and calculated mass
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IonKey {
    pub peptide: String,
    pub charge: u8,
    pub mass: MassKey,
}

impl std::fmt::Display for IonKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}#{}", self.peptide, self.charge, self.mass)
    }
}

/// Search scores. Only the subset produced by the originating search
/// engine is populated, the rest stay at zero.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq)]
pub struct Scores {
    pub expectation: f64,
    pub xcorr: f64,
    pub deltacn: f64,
    pub deltacn_star: f64,
    pub spscore: f64,
    pub sprank: f64,
    pub hyperscore: f64,
    pub nextscore: f64,
}

impl Scores {
    fn set(&mut self, name: &str, value: &str) {
        let value = value.trim().parse::<f64>().unwrap_or_default();
        match name {
            "expect" => self.expectation = value,
            "xcorr" => self.xcorr = value,
            "deltacn" => self.deltacn = value,
            "deltacnstar" => self.deltacn_star = value,
            "spscore" => self.spscore = value,
            "sprank" => self.sprank = value,
            "hyperscore" => self.hyperscore = value,
            "nextscore" => self.nextscore = value,
            _ => log::trace!("ignoring score {}", name),
        }
    }
}

/// MSFragger delta-mass localization
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Localization {
    pub peptide: String,
    pub score_with_ptm: String,
    pub score_without_ptm: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PeptideSpectrumMatch {
    pub index: u32,
    pub spectrum: SpectrumKey,
    pub scan: u32,
    pub peptide: String,
    pub modified_peptide: String,
    pub protein: String,
    /// Alternative protein assignments and how often each was reported
    pub alternative_proteins: BTreeMap<String, u32>,
    pub prev_aa: String,
    pub next_aa: String,
    pub assumed_charge: u8,
    pub hit_rank: u8,
    pub missed_cleavages: u8,
    pub enzymatic_termini: u8,
    pub total_proteins: u16,
    pub total_ions: u16,
    pub matched_ions: u16,
    pub precursor_neutral_mass: f64,
    pub uncalibrated_precursor_neutral_mass: f64,
    pub calc_neutral_pep_mass: f64,
    pub massdiff: f64,
    pub retention_time: f64,
    pub ion_mobility: f64,
    pub compensation_voltage: String,
    pub probability: f64,
    pub iso_mass_d: i32,
    pub scores: Scores,
    /// PTMProphet: modification name -> number of candidate sites
    pub localized_ptm_sites: BTreeMap<String, usize>,
    /// PTMProphet: modification name -> peptide annotated with site probabilities
    pub localized_ptm_mass_diff: BTreeMap<String, String>,
    pub localization: Localization,
    pub intensity: f64,
    pub purity: f64,
    pub reporter_intensities: Vec<f64>,
    pub is_rejected: bool,
    pub modifications: ModificationIndex,
}

impl PeptideSpectrumMatch {
    /// Normalize the top-ranked hit of a decoded spectrum query. Returns
    /// `None` for queries without hits.
    pub fn from_query(
        query: &SpectrumQuery,
        catalog: &ModificationIndex,
        file_name: &str,
    ) -> Option<Self> {
        let hit = query.search_hits.iter().min_by_key(|hit| hit.hit_rank)?;

        let uncalibrated = if query.uncalibrated_precursor_neutral_mass > 0.0 {
            query.uncalibrated_precursor_neutral_mass
        } else {
            query.precursor_neutral_mass
        };

        let mut psm = PeptideSpectrumMatch {
            index: query.index,
            spectrum: SpectrumKey::new(query.spectrum.as_str(), file_name),
            scan: query.start_scan,
            peptide: hit.peptide.clone(),
            protein: hit.protein.clone(),
            prev_aa: hit.prev_aa.clone(),
            next_aa: hit.next_aa.clone(),
            assumed_charge: query.assumed_charge,
            hit_rank: hit.hit_rank,
            missed_cleavages: hit.num_missed_cleavages,
            enzymatic_termini: hit.num_tol_term,
            total_proteins: hit.num_tot_proteins,
            total_ions: hit.tot_num_ions,
            matched_ions: hit.num_matched_ions,
            precursor_neutral_mass: query.precursor_neutral_mass,
            uncalibrated_precursor_neutral_mass: uncalibrated,
            calc_neutral_pep_mass: hit.calc_neutral_pep_mass,
            massdiff: round_to(hit.massdiff, 4),
            retention_time: query.retention_time_sec,
            ion_mobility: query.ion_mobility,
            compensation_voltage: query.compensation_voltage.clone(),
            intensity: query.precursor_intensity,
            purity: query.purity,
            reporter_intensities: query.reporter_intensities.clone(),
            is_rejected: hit.is_rejected != 0,
            ..Default::default()
        };

        for protein in &hit.alternative_proteins {
            *psm.alternative_proteins.entry(protein.clone()).or_insert(0) += 1;
        }

        for score in &hit.scores {
            psm.scores.set(&score.name, &score.value);
        }

        psm.apply_analysis(&hit.analysis_results);

        if let Some(ptm) = &hit.ptm_result {
            psm.localization = Localization {
                peptide: ptm.localization_peptide.clone(),
                score_with_ptm: ptm.best_score_with_ptm.clone(),
                score_without_ptm: ptm.score_without_ptm.clone(),
            };
        }

        psm.map_modifications(hit, catalog);
        Some(psm)
    }

    fn apply_analysis(&mut self, results: &[AnalysisResult]) {
        let mut interprophet = None;
        for result in results {
            match result {
                AnalysisResult::PeptideProphet {
                    probability,
                    parameters,
                } => {
                    self.probability = *probability;
                    if let Some(massd) = parameters.iter().find(|p| p.name == "massd") {
                        self.iso_mass_d = massd.value.trim().parse().unwrap_or_default();
                    }
                }
                AnalysisResult::InterProphet { probability } => interprophet = Some(*probability),
                AnalysisResult::PtmProphet { results } => {
                    self.localized_ptm_sites.clear();
                    self.localized_ptm_mass_diff.clear();
                    for r in results {
                        self.localized_ptm_sites
                            .insert(r.ptm.clone(), r.mod_aminoacid_probabilities.len());
                        self.localized_ptm_mass_diff
                            .insert(r.ptm.clone(), r.ptm_peptide.clone());
                    }
                }
            }
        }
        if let Some(probability) = interprophet {
            self.probability = probability;
        }
    }

    fn map_modifications(&mut self, hit: &SearchHit, catalog: &ModificationIndex) {
        if let Some(info) = &hit.modification_info {
            self.modified_peptide = info.modified_peptide.clone();

            for m in &info.mod_aminoacid_mass {
                let residue = match m.position {
                    0 => None,
                    pos => self.peptide.as_bytes().get(pos as usize - 1).copied(),
                };
                match residue {
                    Some(aa) => {
                        self.modifications
                            .insert(catalog.resolve_residue(aa, m.position, m.mass));
                    }
                    None => log::warn!(
                        "{}: modification position {} outside of {}",
                        self.spectrum,
                        m.position,
                        self.peptide
                    ),
                }
            }

            if info.mod_nterm_mass != 0.0 {
                self.modifications
                    .insert(catalog.resolve_terminal(Site::NTerm, info.mod_nterm_mass));
            }
            if info.mod_cterm_mass != 0.0 {
                self.modifications
                    .insert(catalog.resolve_terminal(Site::CTerm, info.mod_cterm_mass));
            }
        }

        self.modifications
            .insert(Modification::observed(self.massdiff));
    }

    pub fn ion_key(&self) -> IonKey {
        IonKey {
            peptide: self.peptide.clone(),
            charge: self.assumed_charge,
            mass: MassKey::new(self.calc_neutral_pep_mass),
        }
    }

    /// A PSM is a decoy only if its primary protein and every alternative
    /// protein carry the decoy prefix
    pub fn is_decoy(&self, decoy_tag: &str) -> bool {
        !decoy_tag.is_empty()
            && self.protein.starts_with(decoy_tag)
            && self
                .alternative_proteins
                .keys()
                .all(|p| p.starts_with(decoy_tag))
    }

    /// A PSM is unique when it maps to one protein only. Alternatives that
    /// repeat the primary protein don't count.
    pub fn is_unique(&self) -> bool {
        self.alternative_proteins.keys().all(|p| *p == self.protein)
    }

    /// Alternative proteins other than the primary assignment, sorted
    pub fn mapped_proteins(&self) -> impl Iterator<Item = &str> {
        self.alternative_proteins
            .keys()
            .filter(move |p| **p != self.protein)
            .map(String::as_str)
    }

    /// Primary protein followed by every mapped protein
    pub fn proteins(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.protein.as_str()).chain(self.mapped_proteins())
    }

    pub fn calc_mz(&self) -> f64 {
        mz(self.calc_neutral_pep_mass, self.assumed_charge)
    }

    pub fn observed_mz(&self) -> f64 {
        mz(self.uncalibrated_precursor_neutral_mass, self.assumed_charge)
    }

    pub fn calibrated_mz(&self) -> f64 {
        mz(self.precursor_neutral_mass, self.assumed_charge)
    }

    pub fn has_localization(&self) -> bool {
        !self.localization.peptide.is_empty()
    }
}

/// Rewrite decoy primary assignments to a target protein whenever a target
/// alternative exists. Candidates are visited in lexicographic order; the
/// first reviewed entry wins, otherwise the first candidate. The displaced
/// decoy is kept among the alternatives. Returns the number of PSMs changed.
pub fn promote_protein_ids(psms: &mut [PeptideSpectrumMatch], decoy_tag: &str) -> usize {
    let mut promoted = 0;
    for psm in psms.iter_mut() {
        if decoy_tag.is_empty() || !psm.protein.starts_with(decoy_tag) {
            continue;
        }

        let candidates = psm
            .alternative_proteins
            .keys()
            .filter(|p| !p.starts_with(decoy_tag))
            .collect::<Vec<_>>();

        let chosen = candidates
            .iter()
            .find(|p| p.starts_with(REVIEWED_PREFIX))
            .or_else(|| candidates.first())
            .map(|p| p.to_string());

        if let Some(target) = chosen {
            let displaced = std::mem::replace(&mut psm.protein, target);
            *psm.alternative_proteins.entry(displaced).or_insert(0) += 1;
            promoted += 1;
        }
    }
    promoted
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::modification::ModificationKind;
    use crate::pepxml::{ModAminoacidMass, ModificationInfo, Parameter, PtmProphetResult};
    use quickcheck_macros::quickcheck;

    fn psm(protein: &str, alternatives: &[&str]) -> PeptideSpectrumMatch {
        PeptideSpectrumMatch {
            peptide: "AACLLPK".into(),
            protein: protein.into(),
            alternative_proteins: alternatives.iter().map(|p| (p.to_string(), 1)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn keys() {
        let key = SpectrumKey::new("run_1.01234.01234.2", "run_1.pep.xml");
        assert_eq!(key.to_string(), "run_1.01234.01234.2#run_1.pep.xml");
        assert_eq!(key.run(), "run_1");

        let mut a = psm("sp|P1|A", &[]);
        a.assumed_charge = 2;
        a.calc_neutral_pep_mass = 814.48724;
        let mut b = a.clone();
        b.calc_neutral_pep_mass = 814.48716;
        assert_eq!(a.ion_key(), b.ion_key());
        assert_eq!(a.ion_key().to_string(), "AACLLPK#2#814.4872");
    }

    #[test]
    fn decoy_and_unique() {
        let tag = "rev_";
        assert!(psm("rev_sp|P1|A", &[]).is_decoy(tag));
        assert!(psm("rev_sp|P1|A", &["rev_sp|P2|B"]).is_decoy(tag));
        assert!(!psm("rev_sp|P1|A", &["sp|P2|B"]).is_decoy(tag));
        assert!(!psm("sp|P1|A", &[]).is_decoy(tag));

        assert!(psm("sp|P1|A", &[]).is_unique());
        assert!(psm("sp|P1|A", &["sp|P1|A"]).is_unique());
        assert!(!psm("sp|P1|A", &["sp|P2|B"]).is_unique());
    }

    #[test]
    fn promotion_prefers_reviewed() {
        let mut psms = vec![
            psm("rev_sp|P1|A", &["tr|Q1|C", "sp|P2|B", "rev_tr|Q2|D"]),
            psm("rev_sp|P1|A", &["tr|Q3|E", "tr|Q1|C"]),
            psm("rev_sp|P1|A", &["rev_tr|Q2|D"]),
            psm("sp|P9|Z", &["tr|Q1|C"]),
        ];
        assert_eq!(promote_protein_ids(&mut psms, "rev_"), 2);
        assert_eq!(psms[0].protein, "sp|P2|B");
        assert!(psms[0].alternative_proteins.contains_key("rev_sp|P1|A"));
        assert_eq!(psms[1].protein, "tr|Q1|C");
        assert_eq!(psms[2].protein, "rev_sp|P1|A");
        assert_eq!(psms[3].protein, "sp|P9|Z");

        // a second pass changes nothing
        let before = psms.clone();
        assert_eq!(promote_protein_ids(&mut psms, "rev_"), 0);
        assert_eq!(before, psms);
    }

    #[quickcheck]
    fn promotion_keeps_decoy(targets: Vec<u8>, decoys: Vec<u8>) -> bool {
        let mut alternatives = targets
            .iter()
            .map(|t| format!("tr|T{}|X", t))
            .chain(decoys.iter().map(|d| format!("rev_tr|D{}|X", d)))
            .collect::<Vec<_>>();
        alternatives.dedup();
        let refs = alternatives.iter().map(String::as_str).collect::<Vec<_>>();

        let mut psms = vec![psm("rev_sp|P0|X", &refs)];
        promote_protein_ids(&mut psms, "rev_");
        let p = &psms[0];

        if targets.is_empty() {
            p.protein == "rev_sp|P0|X"
        } else {
            !p.protein.starts_with("rev_")
                && !p.is_decoy("rev_")
                && p.alternative_proteins.contains_key("rev_sp|P0|X")
        }
    }

    #[test]
    fn normalize_query() {
        let mut catalog = ModificationIndex::default();
        catalog.insert(Modification::catalog(
            Site::Residue(b'C'),
            160.0307,
            57.0215,
            false,
            false,
        ));

        let query = SpectrumQuery {
            index: 7,
            spectrum: "run_1.00100.00100.2".into(),
            start_scan: 100,
            assumed_charge: 2,
            precursor_neutral_mass: 815.4711,
            search_hits: vec![
                SearchHit {
                    hit_rank: 2,
                    peptide: "PEPTIDE".into(),
                    ..Default::default()
                },
                SearchHit {
                    hit_rank: 1,
                    peptide: "AACLLPK".into(),
                    protein: "sp|P1|A".into(),
                    alternative_proteins: vec!["sp|P2|B".into(), "sp|P2|B".into()],
                    calc_neutral_pep_mass: 814.4872,
                    massdiff: 0.98391,
                    scores: vec![
                        Parameter {
                            name: "expect".into(),
                            value: "1.5e-3".into(),
                        },
                        Parameter {
                            name: "hyperscore".into(),
                            value: "not a number".into(),
                        },
                    ],
                    modification_info: Some(ModificationInfo {
                        modified_peptide: "AAC[160]LLPK".into(),
                        mod_aminoacid_mass: vec![
                            ModAminoacidMass {
                                position: 3,
                                mass: 160.0307,
                            },
                            ModAminoacidMass {
                                position: 40,
                                mass: 160.0307,
                            },
                        ],
                        ..Default::default()
                    }),
                    analysis_results: vec![
                        AnalysisResult::InterProphet { probability: 0.97 },
                        AnalysisResult::PeptideProphet {
                            probability: 0.9,
                            parameters: vec![Parameter {
                                name: "massd".into(),
                                value: "1".into(),
                            }],
                        },
                        AnalysisResult::PtmProphet {
                            results: vec![PtmProphetResult {
                                ptm: "STY:79.966331".into(),
                                ptm_peptide: "AAC(0.000)LLPK".into(),
                                mod_aminoacid_probabilities: vec![Default::default(); 2],
                            }],
                        },
                    ],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let psm = PeptideSpectrumMatch::from_query(&query, &catalog, "run_1.pep.xml").unwrap();
        assert_eq!(psm.peptide, "AACLLPK");
        assert_eq!(psm.spectrum.file, "run_1.pep.xml");
        assert_eq!(psm.uncalibrated_precursor_neutral_mass, 815.4711);
        assert_eq!(psm.massdiff, 0.9839);
        assert_eq!(psm.probability, 0.97);
        assert_eq!(psm.iso_mass_d, 1);
        assert_eq!(psm.scores.expectation, 1.5e-3);
        assert_eq!(psm.scores.hyperscore, 0.0);
        assert_eq!(psm.alternative_proteins.get("sp|P2|B"), Some(&2));
        assert_eq!(psm.localized_ptm_sites.get("STY:79.966331"), Some(&2));
        assert_eq!(psm.modified_peptide, "AAC[160]LLPK");

        // localized cysteine plus the precursor mass difference
        assert_eq!(psm.modifications.len(), 2);
        let (assigned, observed) = psm.modifications.labels();
        assert_eq!(assigned, vec!["3C(57.0215)"]);
        assert_eq!(observed, vec!["0.9839"]);
        assert!(psm
            .modifications
            .iter()
            .any(|m| m.kind == ModificationKind::Observed));
    }

    #[test]
    fn query_without_hits() {
        let query = SpectrumQuery::default();
        assert!(PeptideSpectrumMatch::from_query(&query, &Default::default(), "x").is_none());
    }
}
