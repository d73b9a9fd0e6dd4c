//! Tab-separated report emitters.
//!
//! Column sets depend on the data: search engine, PTM localization,
//! ion mobility, compensation voltage, purity and the isobaric channel layout.
//! Column order is fixed for each combination.

use crate::evidence::{IonEvidence, PeptideEvidence, ProteinEvidence, PsmEvidence};
use crate::labels::ChannelLayout;
use crate::Error;
use itertools::Itertools;
use rayon::prelude::*;
use regex::Regex;
use std::collections::BTreeSet;
use std::io::Write;

/// Caller-controlled report switches
#[derive(Copy, Clone, Debug, Default)]
pub struct ReportOptions<'a> {
    pub include_decoys: bool,
    /// Emit Comet-specific score columns
    pub is_comet: bool,
    pub layout: Option<&'a ChannelLayout>,
}

#[derive(Default)]
struct Row(csv::ByteRecord);

impl Row {
    fn text(&mut self, s: &str) -> &mut Self {
        self.0.push_field(s.as_bytes());
        self
    }

    fn fixed(&mut self, value: f64, places: usize) -> &mut Self {
        self.0.push_field(format!("{:.*}", places, value).as_bytes());
        self
    }

    fn int<I: itoa::Integer>(&mut self, value: I) -> &mut Self {
        self.0.push_field(itoa::Buffer::new().format(value).as_bytes());
        self
    }

    fn flag(&mut self, value: bool) -> &mut Self {
        self.text(if value { "true" } else { "false" })
    }

    fn channels(&mut self, values: impl Iterator<Item = f64>) -> &mut Self {
        for v in values {
            self.fixed(v, 4);
        }
        self
    }

    fn finish(&mut self) -> csv::ByteRecord {
        std::mem::take(&mut self.0)
    }
}

fn writer<W: Write>(w: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(w)
}

fn write_all<W: Write>(
    w: W,
    headers: Vec<String>,
    records: Vec<csv::ByteRecord>,
) -> Result<usize, Error> {
    let mut wtr = writer(w);
    wtr.write_record(&headers)?;
    let n = records.len();
    for record in records {
        wtr.write_byte_record(&record)?;
    }
    wtr.flush()?;
    Ok(n)
}

fn headers(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|s| s.to_string()).collect()
}

/// Join a mapped-identifier set, leaving out `exclude` and empty entries
fn mapped(set: &BTreeSet<String>, exclude: &str, sep: &str) -> String {
    set.iter()
        .filter(|s| !s.is_empty() && s.as_str() != exclude)
        .join(sep)
}

/// Display form of a PTMProphet modification name: the mass is shortened
/// to 4 decimals ("STY:79.966331" becomes "STY:79.9663")
fn localized_header(key: &str) -> String {
    match key.rsplit_once(':') {
        Some((residues, mass)) => match mass.trim().parse::<f64>() {
            Ok(m) => format!("{}:{:.4}", residues, m),
            Err(_) => key.into(),
        },
        None => key.into(),
    }
}

/// Highest site probability annotated in a localization string
fn best_localization(re: &Regex, annotated: &str) -> String {
    re.find_iter(annotated)
        .map(|m| m.as_str())
        .max_by(|a, b| {
            let a = a.parse::<f64>().unwrap_or_default();
            let b = b.parse::<f64>().unwrap_or_default();
            a.total_cmp(&b)
        })
        .unwrap_or_default()
        .to_string()
}

/// Data-dependent column switches of the PSM report
#[derive(Clone, Debug, Default, PartialEq)]
struct PsmColumns {
    localized: Vec<String>,
    localization: bool,
    ion_mobility: bool,
    compensation_voltage: bool,
    purity: bool,
}

impl PsmColumns {
    fn detect(psms: &[PsmEvidence]) -> Self {
        let mut localized = BTreeSet::new();
        let mut columns = PsmColumns::default();
        for e in psms {
            localized.extend(e.psm.localized_ptm_mass_diff.keys().cloned());
            columns.localization |= e.psm.has_localization();
            columns.ion_mobility |= e.psm.ion_mobility > 0.0;
            columns.compensation_voltage |= !e.psm.compensation_voltage.is_empty();
            columns.purity |= e.psm.purity > 0.0;
        }
        columns.localized = localized.into_iter().collect();
        columns
    }
}

pub fn write_psms<W: Write>(
    w: W,
    psms: &[PsmEvidence],
    opts: &ReportOptions,
) -> Result<usize, Error> {
    let columns = PsmColumns::detect(psms);

    let mut headers = headers(&[
        "Spectrum",
        "Spectrum File",
        "Peptide",
        "Modified Peptide",
        "Prev AA",
        "Next AA",
        "Peptide Length",
        "Charge",
        "Retention",
        "Observed Mass",
        "Calibrated Observed Mass",
        "Observed M/Z",
        "Calibrated Observed M/Z",
        "Calculated Peptide Mass",
        "Calculated M/Z",
        "Delta Mass",
    ]);
    if opts.is_comet {
        headers.extend(self::headers(&[
            "XCorr",
            "DeltaCN",
            "DeltaCNStar",
            "SPScore",
            "SPRank",
        ]));
    }
    headers.extend(self::headers(&[
        "Expectation",
        "Hyperscore",
        "Nextscore",
        "PeptideProphet Probability",
        "Number of Enzymatic Termini",
        "Number of Missed Cleavages",
        "Protein Start",
        "Protein End",
        "Intensity",
        "Assigned Modifications",
        "Observed Modifications",
    ]));
    for key in &columns.localized {
        let h = localized_header(key);
        headers.push(format!("{} Best Localization", h));
        headers.insert(headers.len() - 1, h);
    }
    if columns.localization {
        headers.extend(self::headers(&[
            "MSFragger Localization",
            "Best Score with Delta Mass",
            "Best Score without Delta Mass",
        ]));
    }
    if columns.ion_mobility {
        headers.push("Ion Mobility".into());
    }
    if columns.compensation_voltage {
        headers.push("Compensation Voltage".into());
    }
    if columns.purity {
        headers.push("Purity".into());
    }
    headers.extend(self::headers(&[
        "Is Unique",
        "Protein",
        "Protein ID",
        "Entry Name",
        "Gene",
        "Protein Description",
        "Mapped Genes",
        "Mapped Proteins",
    ]));
    if let Some(layout) = opts.layout {
        headers.push("Quan Usage".into());
        headers.extend(layout.headers().map(String::from));
    }

    let re = Regex::new(r"\d\.\d{3}").expect("This is valid regex");

    let records = psms
        .par_iter()
        .filter(|e| opts.include_decoys || !e.is_decoy)
        .map(|e| {
            let p = &e.psm;
            let (assigned, observed) = p.modifications.labels();
            let mut row = Row::default();
            row.text(&p.spectrum.name)
                .text(&p.spectrum.file)
                .text(&p.peptide)
                .text(&p.modified_peptide)
                .text(&p.prev_aa)
                .text(&p.next_aa)
                .int(p.peptide.len())
                .int(p.assumed_charge)
                .fixed(p.retention_time, 4)
                .fixed(p.uncalibrated_precursor_neutral_mass, 4)
                .fixed(p.precursor_neutral_mass, 4)
                .fixed(p.observed_mz(), 4)
                .fixed(p.calibrated_mz(), 4)
                .fixed(p.calc_neutral_pep_mass, 4)
                .fixed(p.calc_mz(), 4)
                .fixed(p.massdiff, 4);

            if opts.is_comet {
                row.fixed(p.scores.xcorr, 4)
                    .fixed(p.scores.deltacn, 4)
                    .fixed(p.scores.deltacn_star, 4)
                    .fixed(p.scores.spscore, 4)
                    .fixed(p.scores.sprank, 4);
            }

            row.fixed(p.scores.expectation, 14)
                .fixed(p.scores.hyperscore, 4)
                .fixed(p.scores.nextscore, 4)
                .fixed(p.probability, 4)
                .int(p.enzymatic_termini)
                .int(p.missed_cleavages)
                .int(e.protein_start)
                .int(e.protein_end)
                .fixed(p.intensity, 4)
                .text(&assigned.join(", "))
                .text(&observed.join(", "));

            for key in &columns.localized {
                let annotated = p
                    .localized_ptm_mass_diff
                    .get(key)
                    .map(String::as_str)
                    .unwrap_or_default();
                row.text(annotated).text(&best_localization(&re, annotated));
            }

            if columns.localization {
                row.text(&p.localization.peptide)
                    .text(&p.localization.score_with_ptm)
                    .text(&p.localization.score_without_ptm);
            }
            if columns.ion_mobility {
                row.fixed(p.ion_mobility, 4);
            }
            if columns.compensation_voltage {
                row.text(&p.compensation_voltage);
            }
            if columns.purity {
                row.fixed(p.purity, 2);
            }

            row.flag(e.is_unique)
                .text(&e.annotation.protein)
                .text(&e.annotation.protein_id)
                .text(&e.annotation.entry_name)
                .text(&e.annotation.gene)
                .text(&e.annotation.description)
                .text(&mapped(&e.mapped_genes, &e.annotation.gene, ", "))
                .text(&mapped(&e.mapped_proteins, &p.protein, ", "));

            if let Some(layout) = opts.layout {
                row.flag(e.labels.as_ref().map(|l| l.is_used).unwrap_or_default())
                    .channels(layout.values(e.labels.as_ref()));
            }
            row.finish()
        })
        .collect::<Vec<_>>();

    let n = write_all(w, headers, records)?;
    log::info!("wrote {} PSMs", n);
    Ok(n)
}

/// Ions without probability are not reported
pub fn write_ions<W: Write>(
    w: W,
    ions: &[IonEvidence],
    opts: &ReportOptions,
) -> Result<usize, Error> {
    let mut headers = headers(&[
        "Peptide Sequence",
        "Modified Sequence",
        "Prev AA",
        "Next AA",
        "Peptide Length",
        "M/Z",
        "Charge",
        "Observed Mass",
        "Probability",
        "Expectation",
        "Spectral Count",
        "Intensity",
        "Assigned Modifications",
        "Observed Modifications",
        "Protein",
        "Protein ID",
        "Entry Name",
        "Gene",
        "Protein Description",
        "Mapped Genes",
        "Mapped Proteins",
    ]);
    if let Some(layout) = opts.layout {
        headers.extend(layout.headers().map(String::from));
    }

    let records = ions
        .par_iter()
        .filter(|ion| ion.probability > 0.0)
        .filter(|ion| opts.include_decoys || !ion.is_decoy)
        .map(|ion| {
            let (assigned, observed) = ion.modifications.labels();
            let mut row = Row::default();
            row.text(&ion.key.peptide)
                .text(&ion.modified_sequence)
                .text(&ion.prev_aa)
                .text(&ion.next_aa)
                .int(ion.key.peptide.len())
                .fixed(ion.mz, 4)
                .int(ion.key.charge)
                .fixed(ion.key.mass.value(), 4)
                .fixed(ion.probability, 4)
                .fixed(ion.expectation, 14)
                .int(ion.spectra.len())
                .fixed(ion.intensity, 4)
                .text(&assigned.join(", "))
                .text(&observed.join(", "))
                .text(&ion.annotation.protein)
                .text(&ion.annotation.protein_id)
                .text(&ion.annotation.entry_name)
                .text(&ion.annotation.gene)
                .text(&ion.annotation.description)
                .text(&mapped(&ion.mapped_genes, &ion.annotation.gene, ","))
                .text(&mapped(&ion.mapped_proteins, &ion.annotation.protein, ","));
            if let Some(layout) = opts.layout {
                row.channels(layout.values(ion.labels.as_ref()));
            }
            row.finish()
        })
        .collect::<Vec<_>>();

    let n = write_all(w, headers, records)?;
    log::info!("wrote {} ions", n);
    Ok(n)
}

pub fn write_peptides<W: Write>(
    w: W,
    peptides: &[PeptideEvidence],
    opts: &ReportOptions,
) -> Result<usize, Error> {
    let mut headers = headers(&[
        "Peptide",
        "Prev AA",
        "Next AA",
        "Peptide Length",
        "Charges",
        "Probability",
        "Spectral Count",
        "Intensity",
        "Assigned Modifications",
        "Observed Modifications",
        "Protein",
        "Protein ID",
        "Entry Name",
        "Gene",
        "Protein Description",
        "Mapped Genes",
        "Mapped Proteins",
    ]);
    if let Some(layout) = opts.layout {
        headers.extend(layout.headers().map(String::from));
    }

    let records = peptides
        .par_iter()
        .filter(|pep| opts.include_decoys || !pep.is_decoy)
        .map(|pep| {
            let (assigned, observed) = pep.modifications.labels();
            let mut row = Row::default();
            row.text(&pep.sequence)
                .text(&pep.prev_aa)
                .text(&pep.next_aa)
                .int(pep.sequence.len())
                .text(&pep.charges.iter().join(", "))
                .fixed(pep.probability, 4)
                .int(pep.spectra.len())
                .fixed(pep.intensity, 6)
                .text(&assigned.join(", "))
                .text(&observed.join(", "))
                .text(&pep.annotation.protein)
                .text(&pep.annotation.protein_id)
                .text(&pep.annotation.entry_name)
                .text(&pep.annotation.gene)
                .text(&pep.annotation.description)
                .text(&mapped(&pep.mapped_genes, &pep.annotation.gene, ", "))
                .text(&mapped(&pep.mapped_proteins, &pep.annotation.protein, ", "));
            if let Some(layout) = opts.layout {
                row.channels(layout.values(pep.labels.as_ref()));
            }
            row.finish()
        })
        .collect::<Vec<_>>();

    let n = write_all(w, headers, records)?;
    log::info!("wrote {} peptides", n);
    Ok(n)
}

/// One row per PSM and PTMProphet modification
pub fn write_localization<W: Write>(
    w: W,
    psms: &[PsmEvidence],
    opts: &ReportOptions,
) -> Result<usize, Error> {
    let headers = headers(&[
        "Spectrum",
        "Peptide",
        "Modified Peptide",
        "Charge",
        "Retention",
        "Modification",
        "Number of Sites",
        "Observed Mass Localization",
    ]);

    let records = psms
        .iter()
        .filter(|e| opts.include_decoys || !e.is_decoy)
        .flat_map(|e| {
            let p = &e.psm;
            p.localized_ptm_mass_diff.iter().map(move |(ptm, annotated)| {
                let mut row = Row::default();
                row.text(&p.spectrum.name)
                    .text(&p.peptide)
                    .text(&p.modified_peptide)
                    .int(p.assumed_charge)
                    .fixed(p.retention_time, 4)
                    .text(ptm)
                    .int(p.localized_ptm_sites.get(ptm).copied().unwrap_or_default())
                    .text(annotated);
                row.finish()
            })
        })
        .collect::<Vec<_>>();

    let n = write_all(w, headers, records)?;
    log::info!("wrote {} localization rows", n);
    Ok(n)
}

pub fn write_proteins<W: Write>(
    w: W,
    proteins: &[ProteinEvidence],
    opts: &ReportOptions,
) -> Result<usize, Error> {
    let mut headers = headers(&[
        "Group",
        "SubGroup",
        "Protein",
        "Protein ID",
        "Entry Name",
        "Gene",
        "Length",
        "Percent Coverage",
        "Protein Description",
        "Protein Probability",
        "Top Peptide Probability",
        "Total Peptides",
        "Unique Peptides",
        "Total Spectral Count",
        "Unique Spectral Count",
        "Intensity",
        "Assigned Modifications",
        "Observed Modifications",
        "Indistinguishable Proteins",
    ]);
    if let Some(layout) = opts.layout {
        headers.extend(layout.headers().map(String::from));
    }

    let records = proteins
        .par_iter()
        .filter(|p| opts.include_decoys || !p.is_decoy)
        .map(|p| {
            let (assigned, observed) = p.modifications.labels();
            let mut row = Row::default();
            row.int(p.group_number)
                .text(&p.group_sibling_id)
                .text(&p.annotation.protein)
                .text(&p.annotation.protein_id)
                .text(&p.annotation.entry_name)
                .text(&p.annotation.gene)
                .int(p.length)
                .fixed(p.percent_coverage as f64, 2)
                .text(&p.annotation.description)
                .fixed(p.probability, 4)
                .fixed(p.top_peptide_probability, 4)
                .int(p.total_peptides().len())
                .int(p.unique_peptides().len())
                .int(p.total_spectra.len())
                .int(p.unique_spectra.len())
                .fixed(p.intensity, 4)
                .text(&assigned.join(", "))
                .text(&observed.join(", "))
                .text(&p.indistinguishable_proteins.join(", "));
            if let Some(layout) = opts.layout {
                row.channels(layout.values(p.labels.as_ref()));
            }
            row.finish()
        })
        .collect::<Vec<_>>();

    let n = write_all(w, headers, records)?;
    log::info!("wrote {} proteins", n);
    Ok(n)
}
