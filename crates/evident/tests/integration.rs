use evident_core::evidence::{self, Context, DecoyReference};
use evident_core::pepxml::PepXml;
use evident_core::protxml::ProtXml;
use evident_core::report::{self, ReportOptions};
use evident_core::{snapshot, Error};
use std::path::PathBuf;

fn table(buf: Vec<u8>) -> Vec<Vec<String>> {
    String::from_utf8(buf)
        .unwrap()
        .lines()
        .map(|l| l.split('\t').map(String::from).collect())
        .collect()
}

fn column<'a>(rows: &'a [Vec<String>], name: &str) -> Vec<&'a str> {
    let ix = rows[0].iter().position(|h| h == name).unwrap();
    rows[1..].iter().map(|r| r[ix].as_str()).collect()
}

#[test]
fn integration() -> Result<(), Error> {
    let pepxml = PepXml::read_all(&[PathBuf::from("../../tests/run.pep.xml.json")], "rev_")?;
    assert_eq!(pepxml.psms.len(), 3);
    assert!(pepxml.is_comet());
    assert_eq!(pepxml.spectra_file, "/data/run.mzML");
    // sorted by descending probability, decoy promoted to its target alternative
    assert_eq!(pepxml.psms[1].spectrum.name, "run.00200.00200.2");
    assert_eq!(pepxml.psms[1].protein, "sp|P11111|ALPHA_HUMAN");

    let database = evident_core::read_fasta("../../tests/ALPHA.fasta", "rev_")?;
    let annotations = database.annotations();
    let ctx = Context {
        decoy_tag: "rev_",
        annotations: &annotations,
        layout: None,
        min_purity: 0.0,
    };

    let psms = evidence::assemble_psms(&pepxml.psms, &ctx);
    let opts = ReportOptions {
        include_decoys: false,
        is_comet: pepxml.is_comet(),
        layout: None,
    };

    let mut buf = Vec::new();
    assert_eq!(report::write_psms(&mut buf, &psms, &opts)?, 2);
    let rows = table(buf);
    assert_eq!(column(&rows, "Spectrum"), vec!["run.00100.00100.2", "run.00200.00200.2"]);
    assert_eq!(column(&rows, "XCorr"), vec!["3.2150", "2.9000"]);
    assert_eq!(column(&rows, "Protein Start"), vec!["3", "3"]);
    assert_eq!(column(&rows, "Gene"), vec!["ALPHA", "ALPHA"]);
    assert_eq!(column(&rows, "Mapped Genes"), vec!["BETA", ""]);
    assert_eq!(
        column(&rows, "Assigned Modifications"),
        vec!["3C(57.0215)", "3C(57.0215)"]
    );
    assert_eq!(column(&rows, "Observed Modifications"), vec!["0.0010", "-0.0002"]);

    // two spectra with the same peptide, charge and mass collapse into one ion
    let ions = evidence::assemble_ions(&psms);
    let mut buf = Vec::new();
    assert_eq!(report::write_ions(&mut buf, &ions, &opts)?, 1);
    let rows = table(buf);
    assert_eq!(column(&rows, "Peptide Sequence"), vec!["AACLLPK"]);
    assert_eq!(column(&rows, "Spectral Count"), vec!["2"]);
    assert_eq!(column(&rows, "Observed Mass"), vec!["814.4872"]);
    assert_eq!(
        column(&rows, "Mapped Proteins"),
        vec!["rev_sp|P11111|ALPHA_HUMAN,tr|Q22222|Q22222_HUMAN"]
    );

    let reference = DecoyReference::from_psms(&pepxml.psms, "rev_");
    let peptides = evidence::assemble_peptides(&psms, &reference);
    assert_eq!(peptides.len(), 2);
    let mut buf = Vec::new();
    assert_eq!(report::write_peptides(&mut buf, &peptides, &opts)?, 1);
    let with_decoys = ReportOptions {
        include_decoys: true,
        ..opts
    };
    let mut buf = Vec::new();
    assert_eq!(report::write_peptides(&mut buf, &peptides, &with_decoys)?, 2);

    let mut protxml = ProtXml::read("../../tests/run.prot.xml.json", "rev_")?;
    assert_eq!(protxml.promote_protein_ids(), 1);
    protxml.mark_unique_peptides(0.5);
    let proteins = evidence::assemble_proteins(&protxml, &psms, &ctx);
    let mut buf = Vec::new();
    assert_eq!(report::write_proteins(&mut buf, &proteins, &opts)?, 2);
    let rows = table(buf);
    assert_eq!(
        column(&rows, "Protein"),
        vec!["sp|P11111|ALPHA_HUMAN", "tr|Q22222|Q22222_HUMAN"]
    );
    assert_eq!(column(&rows, "Protein Probability"), vec!["1.0000", "0.4000"]);
    assert_eq!(column(&rows, "Length"), vec!["23", "14"]);
    assert_eq!(column(&rows, "Total Spectral Count"), vec!["2", "1"]);
    assert_eq!(column(&rows, "Unique Spectral Count"), vec!["0", "0"]);
    assert_eq!(column(&rows, "Unique Peptides"), vec!["1", "0"]);
    assert_eq!(
        column(&rows, "Indistinguishable Proteins"),
        vec!["", "rev_sp|P33333|DELTA_HUMAN"]
    );

    Ok(())
}

#[test]
fn snapshots_roundtrip() -> Result<(), Error> {
    let pepxml = PepXml::read("../../tests/run.pep.xml.json", "rev_")?;
    let protxml = ProtXml::read("../../tests/run.prot.xml.json", "rev_")?;
    let database = evident_core::read_fasta("../../tests/ALPHA.fasta", "rev_")?;

    assert_eq!(snapshot::decode::<PepXml>(&snapshot::encode(&pepxml)?)?, pepxml);
    assert_eq!(snapshot::decode::<ProtXml>(&snapshot::encode(&protxml)?)?, protxml);

    let path = std::env::temp_dir().join(format!("evident-{}-{}", std::process::id(), snapshot::DATABASE));
    snapshot::store(&path, &database)?;
    let restored = snapshot::restore(&path)?;
    std::fs::remove_file(&path)?;
    assert_eq!(database, restored);
    Ok(())
}

#[test]
fn empty_inputs_are_fatal() {
    let err = PepXml::read_all(&[PathBuf::from("../../tests/missing.pep.xml.json")], "rev_")
        .unwrap_err();
    assert!(matches!(err, Error::MissingInput(_)));
}
