use evident_cli::input::Input;
use evident_cli::runner::Runner;
use std::path::PathBuf;

fn output_directory(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("evident-cli-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&path);
    path
}

fn header(path: &std::path::Path) -> anyhow::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .next()
        .unwrap_or_default()
        .split('\t')
        .map(String::from)
        .collect())
}

#[test]
fn integration() -> anyhow::Result<()> {
    let out = output_directory("run");
    let parameters = out.with_extension("json");
    std::fs::write(
        &parameters,
        serde_json::json!({
            "pepxml_paths": ["../../tests"],
            "protxml_path": "../../tests/run.prot.xml.json",
            "fasta": "../../tests/ALPHA.fasta",
            "output_directory": out.display().to_string(),
            "isobaric": {
                "kind": "itraq4",
                "channel_names": ["ctrl", "NA", "t1", "t2"],
                "min_purity": 0.0
            },
            "write_snapshots": true
        })
        .to_string(),
    )?;

    let settings = Input::load(parameters.display().to_string())?.build()?;
    let settings = Runner::new(settings).run()?;

    for name in [
        "psm.tsv",
        "ion.tsv",
        "peptide.tsv",
        "protein.tsv",
        "db.bin",
        "pepxml.bin",
        "protxml.bin",
        "results.json",
    ] {
        assert!(out.join(name).exists(), "{} was not written", name);
    }
    // no PTM localization in the input
    assert!(!out.join("localization.tsv").exists());
    assert_eq!(settings.output_paths.len(), 8);

    let psm = header(&out.join("psm.tsv"))?;
    assert_eq!(&psm[psm.len() - 4..], ["Quan Usage", "ctrl", "t1", "t2"]);
    let ion = header(&out.join("ion.tsv"))?;
    assert_eq!(&ion[ion.len() - 3..], ["ctrl", "t1", "t2"]);
    let peptide = header(&out.join("peptide.tsv"))?;
    assert!(!peptide.iter().any(|h| h == "NA" || h == "Channel 115"));

    let ions = std::fs::read_to_string(out.join("ion.tsv"))?;
    assert_eq!(ions.lines().count(), 2);

    let results: serde_json::Value =
        serde_json::from_slice(&std::fs::read(out.join("results.json"))?)?;
    assert_eq!(results["decoy_tag"], "rev_");
    assert_eq!(results["isobaric"]["kind"], "itraq4");
    assert_eq!(results["output_paths"].as_array().map(Vec::len), Some(8));

    let _ = std::fs::remove_dir_all(&out);
    let _ = std::fs::remove_file(&parameters);
    Ok(())
}

#[test]
fn missing_pepxml() -> anyhow::Result<()> {
    let out = output_directory("missing");
    let parameters = out.with_extension("json");
    std::fs::write(
        &parameters,
        serde_json::json!({
            "pepxml_paths": ["../../tests/does-not-exist.pep.xml"],
            "output_directory": out.display().to_string(),
        })
        .to_string(),
    )?;

    let settings = Input::load(parameters.display().to_string())?.build()?;
    let err = Runner::new(settings).run().unwrap_err();
    assert!(format!("{:#}", err).contains("missing input"));

    let _ = std::fs::remove_dir_all(&out);
    let _ = std::fs::remove_file(&parameters);
    Ok(())
}
