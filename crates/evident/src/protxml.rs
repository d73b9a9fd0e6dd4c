//! Protein inference groups

use crate::pepxml::Parameter;
use crate::psm::REVIEWED_PREFIX;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One decoded protXML document
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ProteinSummary {
    pub run_options: String,
    pub protein_groups: Vec<ProteinGroupRecord>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ProteinGroupRecord {
    pub group_number: u32,
    pub probability: f64,
    pub proteins: Vec<ProteinRecord>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ProteinRecord {
    pub protein_name: String,
    pub group_sibling_id: String,
    pub description: String,
    pub probability: f64,
    pub percent_coverage: f32,
    pub pct_spectrum_ids: f32,
    pub total_number_peptides: u32,
    /// '+'-separated stripped sequences
    pub unique_stripped_peptides: String,
    pub parameters: Vec<Parameter>,
    pub indistinguishable_proteins: Vec<String>,
    pub peptides: Vec<PeptideRecord>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct PeptideRecord {
    pub peptide_sequence: String,
    pub modified_peptide: String,
    pub charge: u8,
    pub initial_probability: f64,
    pub weight: f64,
    pub group_weight: f64,
    pub calc_neutral_pep_mass: f64,
    pub n_enzymatic_termini: u8,
    pub n_instances: u32,
    /// "Y" when the peptide maps to this protein only
    pub is_nondegenerate_evidence: String,
    pub peptide_parent_proteins: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PeptideIon {
    pub peptide_sequence: String,
    pub modified_peptide: String,
    pub charge: u8,
    pub initial_probability: f64,
    pub weight: f64,
    pub group_weight: f64,
    pub calc_neutral_pep_mass: f64,
    pub enzymatic_termini: u8,
    pub instances: u32,
    pub shared_parent_proteins: usize,
    pub is_nondegenerate_evidence: bool,
    pub is_unique: bool,
    pub parent_proteins: Vec<String>,
}

impl From<&PeptideRecord> for PeptideIon {
    fn from(r: &PeptideRecord) -> Self {
        let nondegenerate = r.is_nondegenerate_evidence.eq_ignore_ascii_case("y");
        PeptideIon {
            peptide_sequence: r.peptide_sequence.clone(),
            modified_peptide: r.modified_peptide.clone(),
            charge: r.charge,
            initial_probability: r.initial_probability,
            weight: r.weight,
            group_weight: r.group_weight,
            calc_neutral_pep_mass: r.calc_neutral_pep_mass,
            enzymatic_termini: r.n_enzymatic_termini,
            instances: r.n_instances,
            shared_parent_proteins: r.peptide_parent_proteins.len(),
            is_nondegenerate_evidence: nondegenerate,
            is_unique: nondegenerate,
            parent_proteins: r.peptide_parent_proteins.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Protein {
    pub group_number: u32,
    pub group_sibling_id: String,
    pub protein_name: String,
    pub description: String,
    pub length: usize,
    pub percent_coverage: f32,
    pub pct_spectrum_ids: f32,
    pub group_probability: f64,
    pub probability: f64,
    /// Highest initial probability among the peptide ions
    pub top_peptide_probability: f64,
    pub total_number_peptides: u32,
    pub unique_stripped_peptides: Vec<String>,
    pub indistinguishable_proteins: Vec<String>,
    pub peptide_ions: Vec<PeptideIon>,
}

impl Protein {
    fn from_record(group: &ProteinGroupRecord, record: &ProteinRecord, probability: f64) -> Self {
        let peptide_ions = record.peptides.iter().map(PeptideIon::from).collect::<Vec<_>>();
        let top_peptide_probability = peptide_ions
            .iter()
            .map(|p| p.initial_probability)
            .fold(0.0, f64::max);

        let length = record
            .parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case("prot_length"))
            .and_then(|p| p.value.trim().parse().ok())
            .unwrap_or_default();

        Protein {
            group_number: group.group_number,
            group_sibling_id: record.group_sibling_id.clone(),
            protein_name: record.protein_name.clone(),
            description: record.description.clone(),
            length,
            percent_coverage: record.percent_coverage,
            pct_spectrum_ids: record.pct_spectrum_ids,
            group_probability: group.probability,
            probability,
            top_peptide_probability,
            total_number_peptides: record.total_number_peptides,
            unique_stripped_peptides: record
                .unique_stripped_peptides
                .split('+')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            indistinguishable_proteins: record.indistinguishable_proteins.clone(),
            peptide_ions,
        }
    }

    pub fn is_decoy(&self, decoy_tag: &str) -> bool {
        !decoy_tag.is_empty() && self.protein_name.starts_with(decoy_tag)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ProteinGroup {
    pub group_number: u32,
    pub probability: f64,
    pub proteins: Vec<Protein>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ProtXml {
    pub file_name: String,
    pub decoy_tag: String,
    pub run_options: String,
    pub groups: Vec<ProteinGroup>,
}

impl ProtXml {
    /// Normalize a decoded document. A document without protein groups is
    /// an error.
    pub fn from_summary(
        file_name: &str,
        summary: ProteinSummary,
        decoy_tag: &str,
    ) -> Result<Self, Error> {
        if summary.protein_groups.is_empty() {
            return Err(Error::NoProteinGroups(file_name.into()));
        }

        let groups = summary
            .protein_groups
            .iter()
            .map(|group| {
                let proteins = group
                    .proteins
                    .iter()
                    .enumerate()
                    .map(|(ix, record)| {
                        // A fully confident group reports its leading member as 0
                        let probability =
                            if ix == 0 && group.probability == 1.0 && record.probability == 0.0 {
                                group.probability
                            } else {
                                record.probability
                            };
                        Protein::from_record(group, record, probability)
                    })
                    .collect();
                ProteinGroup {
                    group_number: group.group_number,
                    probability: group.probability,
                    proteins,
                }
            })
            .collect::<Vec<_>>();

        log::info!("{}: read {} protein groups", file_name, groups.len());
        Ok(ProtXml {
            file_name: file_name.into(),
            decoy_tag: decoy_tag.into(),
            run_options: summary.run_options,
            groups,
        })
    }

    pub fn read<P: AsRef<Path>>(path: P, decoy_tag: &str) -> Result<Self, Error> {
        let path = path.as_ref();
        let summary: ProteinSummary = crate::read_json(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_summary(&file_name, summary, decoy_tag)
    }

    /// Replace decoy protein names with a target indistinguishable protein,
    /// preferring reviewed entries. The displaced name joins the
    /// indistinguishable list. Returns the number of renamed proteins.
    pub fn promote_protein_ids(&mut self) -> usize {
        let tag = self.decoy_tag.as_str();
        if tag.is_empty() {
            return 0;
        }

        let mut promoted = 0;
        for protein in self.groups.iter_mut().flat_map(|g| g.proteins.iter_mut()) {
            if !protein.protein_name.starts_with(tag) {
                continue;
            }
            let candidates = protein
                .indistinguishable_proteins
                .iter()
                .filter(|p| !p.starts_with(tag));
            let chosen = candidates
                .clone()
                .find(|p| p.starts_with(REVIEWED_PREFIX))
                .or_else(|| candidates.clone().next())
                .cloned();

            if let Some(target) = chosen {
                protein.indistinguishable_proteins.retain(|p| *p != target);
                let displaced = std::mem::replace(&mut protein.protein_name, target);
                protein.indistinguishable_proteins.push(displaced);
                promoted += 1;
            }
        }

        log::info!("promoted {} decoy proteins to target identifiers", promoted);
        promoted
    }

    /// Mark peptide ions whose parsimony weight reaches `weight` as unique
    pub fn mark_unique_peptides(&mut self, weight: f64) {
        for ion in self
            .groups
            .iter_mut()
            .flat_map(|g| g.proteins.iter_mut())
            .flat_map(|p| p.peptide_ions.iter_mut())
        {
            if ion.weight >= weight {
                ion.is_unique = true;
            }
        }
    }

    pub fn proteins(&self) -> impl Iterator<Item = &Protein> {
        self.groups.iter().flat_map(|g| g.proteins.iter())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn peptide(seq: &str, prob: f64, weight: f64, nondegenerate: &str) -> PeptideRecord {
        PeptideRecord {
            peptide_sequence: seq.into(),
            charge: 2,
            initial_probability: prob,
            weight,
            is_nondegenerate_evidence: nondegenerate.into(),
            ..Default::default()
        }
    }

    fn summary() -> ProteinSummary {
        ProteinSummary {
            run_options: "--minprob 0.05".into(),
            protein_groups: vec![
                ProteinGroupRecord {
                    group_number: 1,
                    probability: 1.0,
                    proteins: vec![
                        ProteinRecord {
                            protein_name: "rev_sp|P12345|FOO_HUMAN".into(),
                            probability: 0.0,
                            unique_stripped_peptides: "AACLLPK+PEPTIDE".into(),
                            parameters: vec![Parameter {
                                name: "prot_length".into(),
                                value: "412".into(),
                            }],
                            indistinguishable_proteins: vec![
                                "sp|P67890|BAR_HUMAN".into(),
                                "tr|Q11111|BAZ_HUMAN".into(),
                            ],
                            peptides: vec![
                                peptide("AACLLPK", 0.95, 1.0, "Y"),
                                peptide("PEPTIDE", 0.99, 0.3, "n"),
                            ],
                            ..Default::default()
                        },
                        ProteinRecord {
                            protein_name: "sp|P22222|SIB_HUMAN".into(),
                            probability: 0.0,
                            peptides: vec![peptide("PEPTIDE", 0.99, 0.5, "N")],
                            ..Default::default()
                        },
                    ],
                },
                ProteinGroupRecord {
                    group_number: 2,
                    probability: 0.8,
                    proteins: vec![ProteinRecord {
                        protein_name: "rev_tr|Q33333|DEC_HUMAN".into(),
                        probability: 0.0,
                        indistinguishable_proteins: vec!["rev_tr|Q44444|DEC2_HUMAN".into()],
                        ..Default::default()
                    }],
                },
            ],
        }
    }

    #[test]
    fn group_probability_correction() {
        let prot = ProtXml::from_summary("interact.prot.xml", summary(), "rev_").unwrap();
        let first = &prot.groups[0];
        assert_eq!(first.proteins.len(), 2);
        assert_eq!(first.proteins[0].probability, 1.0);
        // only the leading member is corrected
        assert_eq!(first.proteins[1].probability, 0.0);
        assert_eq!(prot.groups[1].proteins[0].probability, 0.0);
    }

    #[test]
    fn flatten_members() {
        let prot = ProtXml::from_summary("interact.prot.xml", summary(), "rev_").unwrap();
        let p = &prot.groups[0].proteins[0];
        assert_eq!(p.length, 412);
        assert_eq!(p.top_peptide_probability, 0.99);
        assert_eq!(p.unique_stripped_peptides, vec!["AACLLPK", "PEPTIDE"]);
        assert!(p.peptide_ions[0].is_unique);
        assert!(!p.peptide_ions[1].is_unique);
        assert_eq!(prot.proteins().count(), 3);
    }

    #[test]
    fn promotion_prefers_reviewed() {
        let mut prot = ProtXml::from_summary("interact.prot.xml", summary(), "rev_").unwrap();
        assert_eq!(prot.promote_protein_ids(), 1);

        let p = &prot.groups[0].proteins[0];
        assert_eq!(p.protein_name, "sp|P67890|BAR_HUMAN");
        assert_eq!(
            p.indistinguishable_proteins,
            vec!["tr|Q11111|BAZ_HUMAN", "rev_sp|P12345|FOO_HUMAN"]
        );
        assert!(!p.is_decoy("rev_"));

        // nothing but decoys to choose from
        assert_eq!(
            prot.groups[1].proteins[0].protein_name,
            "rev_tr|Q33333|DEC_HUMAN"
        );
        assert_eq!(prot.promote_protein_ids(), 0);
    }

    #[test]
    fn unique_by_weight() {
        let mut prot = ProtXml::from_summary("interact.prot.xml", summary(), "rev_").unwrap();
        prot.mark_unique_peptides(0.5);
        let uniques = prot
            .proteins()
            .flat_map(|p| p.peptide_ions.iter())
            .map(|ion| ion.is_unique)
            .collect::<Vec<_>>();
        assert_eq!(uniques, vec![true, false, true]);
    }

    #[test]
    fn no_groups() {
        let err = ProtXml::from_summary("empty.prot.xml", ProteinSummary::default(), "rev_");
        assert!(matches!(err, Err(Error::NoProteinGroups(_))));
    }
}
