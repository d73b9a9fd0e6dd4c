//! Evidence aggregation: PSM, ion, peptide and protein level tables.
//!
//! Every aggregation is a pure function from an immutable input list to a
//! new evidence list. Grouping keys are [`IonKey`], peptide sequence and
//! protein name; within a group spectra and mapped identifiers are unioned,
//! modifications are merged with first-entry-wins semantics, and the best
//! probability and intensity are kept.

use crate::database::Annotations;
use crate::labels::{ChannelLayout, IsobaricLabels};
use crate::mass::mz;
use crate::modification::ModificationIndex;
use crate::protxml::{PeptideIon, ProtXml};
use crate::psm::{IonKey, PeptideSpectrumMatch, SpectrumKey};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Shared inputs of the aggregation passes
pub struct Context<'a> {
    pub decoy_tag: &'a str,
    pub annotations: &'a Annotations<'a>,
    pub layout: Option<&'a ChannelLayout>,
    /// Minimum precursor purity for a PSM's reporter ions to be used
    pub min_purity: f64,
}

/// Protein annotation columns shared by every report
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ProteinAnnotation {
    pub protein: String,
    pub protein_id: String,
    pub entry_name: String,
    pub gene: String,
    pub description: String,
}

impl ProteinAnnotation {
    fn new(protein: &str, annotations: &Annotations) -> Self {
        ProteinAnnotation {
            protein: protein.into(),
            protein_id: annotations.protein_id(protein).into(),
            entry_name: annotations.entry_name(protein).into(),
            gene: annotations.gene(protein).into(),
            description: annotations.description(protein).into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PsmEvidence {
    pub psm: PeptideSpectrumMatch,
    pub annotation: ProteinAnnotation,
    pub protein_start: usize,
    pub protein_end: usize,
    /// Primary and alternative proteins
    pub mapped_proteins: BTreeSet<String>,
    pub mapped_genes: BTreeSet<String>,
    pub labels: Option<IsobaricLabels>,
    pub is_decoy: bool,
    pub is_unique: bool,
}

impl PsmEvidence {
    pub fn ion_key(&self) -> IonKey {
        self.psm.ion_key()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct IonEvidence {
    pub key: IonKey,
    pub modified_sequence: String,
    pub prev_aa: String,
    pub next_aa: String,
    pub mz: f64,
    pub probability: f64,
    pub expectation: f64,
    pub enzymatic_termini: u8,
    pub intensity: f64,
    pub spectra: BTreeSet<SpectrumKey>,
    pub annotation: ProteinAnnotation,
    pub mapped_proteins: BTreeSet<String>,
    pub mapped_genes: BTreeSet<String>,
    pub modifications: ModificationIndex,
    pub labels: Option<IsobaricLabels>,
    pub is_decoy: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PeptideEvidence {
    pub sequence: String,
    pub prev_aa: String,
    pub next_aa: String,
    pub charges: BTreeSet<u8>,
    pub probability: f64,
    pub intensity: f64,
    pub spectra: BTreeSet<SpectrumKey>,
    pub annotation: ProteinAnnotation,
    pub mapped_proteins: BTreeSet<String>,
    pub mapped_genes: BTreeSet<String>,
    pub modifications: ModificationIndex,
    pub labels: Option<IsobaricLabels>,
    /// Classification from the decoy reference
    pub is_decoy: bool,
    /// Whether any contributing PSM is itself a decoy
    pub has_decoy_psm: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ProteinEvidence {
    pub group_number: u32,
    pub group_sibling_id: String,
    pub annotation: ProteinAnnotation,
    pub length: usize,
    pub percent_coverage: f32,
    pub probability: f64,
    pub top_peptide_probability: f64,
    pub indistinguishable_proteins: Vec<String>,
    pub peptide_ions: Vec<PeptideIon>,
    pub total_spectra: BTreeSet<SpectrumKey>,
    pub unique_spectra: BTreeSet<SpectrumKey>,
    pub intensity: f64,
    pub modifications: ModificationIndex,
    pub labels: Option<IsobaricLabels>,
    pub is_decoy: bool,
}

impl ProteinEvidence {
    /// Distinct peptide sequences supporting the protein
    pub fn total_peptides(&self) -> BTreeSet<&str> {
        self.peptide_ions
            .iter()
            .map(|ion| ion.peptide_sequence.as_str())
            .collect()
    }

    /// Distinct peptide sequences marked unique to the protein
    pub fn unique_peptides(&self) -> BTreeSet<&str> {
        self.peptide_ions
            .iter()
            .filter(|ion| ion.is_unique)
            .map(|ion| ion.peptide_sequence.as_str())
            .collect()
    }
}

/// Peptide sequence to decoy classification, derived once from a reference
/// identification list
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DecoyReference {
    peptides: BTreeMap<String, bool>,
}

impl DecoyReference {
    /// A peptide is classified as decoy only if every reference PSM carrying
    /// it is a decoy
    pub fn from_psms(psms: &[PeptideSpectrumMatch], decoy_tag: &str) -> Self {
        let mut peptides = BTreeMap::new();
        for psm in psms {
            let is_decoy = psm.is_decoy(decoy_tag);
            peptides
                .entry(psm.peptide.clone())
                .and_modify(|d: &mut bool| *d &= is_decoy)
                .or_insert(is_decoy);
        }
        DecoyReference { peptides }
    }

    pub fn is_decoy(&self, peptide: &str) -> Option<bool> {
        self.peptides.get(peptide).copied()
    }

    pub fn len(&self) -> usize {
        self.peptides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peptides.is_empty()
    }
}

impl FromIterator<(String, bool)> for DecoyReference {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        DecoyReference {
            peptides: iter.into_iter().collect(),
        }
    }
}

fn max(a: f64, b: f64) -> f64 {
    if b > a {
        b
    } else {
        a
    }
}

fn sum_labels<'a, I>(evidence: I, layout: bool) -> Option<IsobaricLabels>
where
    I: IntoIterator<Item = &'a PsmEvidence>,
{
    if !layout {
        return None;
    }
    let summed = IsobaricLabels::sum_used(evidence.into_iter().filter_map(|e| e.labels.as_ref()));
    Some(summed.unwrap_or_default())
}

/// Annotate PSMs and attach decoy, uniqueness and label information.
/// Output is ordered by spectrum.
pub fn assemble_psms(psms: &[PeptideSpectrumMatch], ctx: &Context) -> Vec<PsmEvidence> {
    let mut evidence = psms
        .iter()
        .map(|psm| {
            let is_decoy = psm.is_decoy(ctx.decoy_tag);
            let (protein_start, protein_end) =
                ctx.annotations.protein_range(&psm.protein, &psm.peptide);
            let mapped_proteins = psm.proteins().map(String::from).collect::<BTreeSet<_>>();
            let mapped_genes = mapped_proteins
                .iter()
                .map(|p| ctx.annotations.gene(p))
                .filter(|g| !g.is_empty())
                .map(String::from)
                .collect();
            let labels = ctx.layout.map(|layout| {
                let used = !is_decoy && psm.purity >= ctx.min_purity;
                layout.labels(&psm.reporter_intensities, used)
            });

            PsmEvidence {
                annotation: ProteinAnnotation::new(&psm.protein, ctx.annotations),
                protein_start,
                protein_end,
                mapped_proteins,
                mapped_genes,
                labels,
                is_decoy,
                is_unique: psm.is_unique(),
                psm: psm.clone(),
            }
        })
        .collect::<Vec<_>>();

    evidence.sort_by(|a, b| a.psm.spectrum.cmp(&b.psm.spectrum));
    evidence
}

/// Index of the best-probability entry; the earliest one wins ties
fn best(group: &[&PsmEvidence]) -> usize {
    let mut ix = 0;
    for (i, e) in group.iter().enumerate() {
        if e.psm.probability > group[ix].psm.probability {
            ix = i;
        }
    }
    ix
}

/// Collapse PSMs sharing peptide, charge and calculated mass into ions.
/// Ion decoy status follows the best PSM of the ion.
pub fn assemble_ions(psms: &[PsmEvidence]) -> Vec<IonEvidence> {
    let labeled = psms.iter().any(|e| e.labels.is_some());
    let mut groups: BTreeMap<IonKey, Vec<&PsmEvidence>> = BTreeMap::new();
    for e in psms {
        groups.entry(e.ion_key()).or_default().push(e);
    }

    groups
        .into_iter()
        .map(|(key, group)| {
            let rep = group[best(&group)];
            let mut ion = IonEvidence {
                mz: mz(rep.psm.calc_neutral_pep_mass, key.charge),
                key,
                modified_sequence: rep.psm.modified_peptide.clone(),
                prev_aa: rep.psm.prev_aa.clone(),
                next_aa: rep.psm.next_aa.clone(),
                expectation: rep.psm.scores.expectation,
                enzymatic_termini: rep.psm.enzymatic_termini,
                annotation: rep.annotation.clone(),
                is_decoy: rep.is_decoy,
                labels: sum_labels(group.iter().copied(), labeled),
                ..Default::default()
            };
            for e in &group {
                ion.probability = max(ion.probability, e.psm.probability);
                ion.intensity = max(ion.intensity, e.psm.intensity);
                ion.spectra.insert(e.psm.spectrum.clone());
                ion.mapped_proteins.extend(e.mapped_proteins.iter().cloned());
                ion.mapped_genes.extend(e.mapped_genes.iter().cloned());
                ion.modifications.merge(&e.psm.modifications);
            }
            ion
        })
        .collect()
}

/// Collapse PSMs into peptides. One row is produced for every peptide of
/// the decoy reference; its decoy flag is the reference classification.
pub fn assemble_peptides(psms: &[PsmEvidence], reference: &DecoyReference) -> Vec<PeptideEvidence> {
    let labeled = psms.iter().any(|e| e.labels.is_some());
    let mut groups: FnvHashMap<&str, Vec<&PsmEvidence>> = FnvHashMap::default();
    for e in psms {
        groups.entry(e.psm.peptide.as_str()).or_default().push(e);
    }

    reference
        .peptides
        .iter()
        .map(|(sequence, &is_decoy)| {
            let group = groups.get(sequence.as_str()).cloned().unwrap_or_default();
            let mut peptide = PeptideEvidence {
                sequence: sequence.clone(),
                is_decoy,
                labels: sum_labels(group.iter().copied(), labeled),
                ..Default::default()
            };

            if let Some(rep) = group.get(best(&group)) {
                peptide.prev_aa = rep.psm.prev_aa.clone();
                peptide.next_aa = rep.psm.next_aa.clone();
                peptide.annotation = rep.annotation.clone();
            }

            for e in &group {
                peptide.charges.insert(e.psm.assumed_charge);
                peptide.probability = max(peptide.probability, e.psm.probability);
                peptide.intensity = max(peptide.intensity, e.psm.intensity);
                peptide.spectra.insert(e.psm.spectrum.clone());
                peptide
                    .mapped_proteins
                    .extend(e.mapped_proteins.iter().cloned());
                peptide.mapped_genes.extend(e.mapped_genes.iter().cloned());
                peptide.modifications.merge(&e.psm.modifications);
                peptide.has_decoy_psm |= e.is_decoy;
            }
            peptide
        })
        .collect()
}

/// Build protein-level evidence from the normalized protein groups. The
/// first occurrence of a protein name wins.
pub fn assemble_proteins(
    protxml: &ProtXml,
    psms: &[PsmEvidence],
    ctx: &Context,
) -> Vec<ProteinEvidence> {
    let mut by_protein: FnvHashMap<&str, Vec<&PsmEvidence>> = FnvHashMap::default();
    for e in psms {
        for protein in &e.mapped_proteins {
            by_protein.entry(protein.as_str()).or_default().push(e);
        }
    }

    let mut seen = BTreeSet::new();
    let mut evidence = Vec::new();
    for protein in protxml.proteins() {
        if !seen.insert(protein.protein_name.as_str()) {
            continue;
        }
        let name = protein.protein_name.as_str();
        let group = by_protein.get(name).cloned().unwrap_or_default();

        let length = match protein.length {
            0 => ctx.annotations.length(name),
            n => n,
        };

        let mut entry = ProteinEvidence {
            group_number: protein.group_number,
            group_sibling_id: protein.group_sibling_id.clone(),
            annotation: ProteinAnnotation::new(name, ctx.annotations),
            length,
            percent_coverage: protein.percent_coverage,
            probability: protein.probability,
            top_peptide_probability: protein.top_peptide_probability,
            indistinguishable_proteins: protein.indistinguishable_proteins.clone(),
            peptide_ions: protein.peptide_ions.clone(),
            is_decoy: protein.is_decoy(ctx.decoy_tag),
            labels: sum_labels(
                group
                    .iter()
                    .copied()
                    .filter(|e| e.is_unique && e.psm.protein == name),
                ctx.layout.is_some(),
            ),
            ..Default::default()
        };
        if entry.annotation.description.is_empty() {
            entry.annotation.description = protein.description.clone();
        }

        for e in &group {
            entry.total_spectra.insert(e.psm.spectrum.clone());
            if e.is_unique && e.psm.protein == name {
                entry.unique_spectra.insert(e.psm.spectrum.clone());
            }
            entry.intensity = max(entry.intensity, e.psm.intensity);
            entry.modifications.merge(&e.psm.modifications);
        }
        evidence.push(entry);
    }
    evidence
}
