use crate::runner::Runner;
use anyhow::Context;
use evident_core::evidence::{IonEvidence, PeptideEvidence, ProteinEvidence, PsmEvidence};
use evident_core::report::{self, ReportOptions};
use evident_core::snapshot;
use serde::Serialize;
use std::io::BufWriter;
use std::path::Path;

fn create(path: &Path) -> anyhow::Result<BufWriter<std::fs::File>> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create `{}`", path.display()))?;
    Ok(BufWriter::new(file))
}

impl Runner {
    pub fn write_psms(&self, psms: &[PsmEvidence], opts: &ReportOptions) -> anyhow::Result<String> {
        let path = self.make_path("psm.tsv");
        report::write_psms(create(&path)?, psms, opts)?;
        Ok(path.display().to_string())
    }

    pub fn write_ions(&self, ions: &[IonEvidence], opts: &ReportOptions) -> anyhow::Result<String> {
        let path = self.make_path("ion.tsv");
        report::write_ions(create(&path)?, ions, opts)?;
        Ok(path.display().to_string())
    }

    pub fn write_peptides(
        &self,
        peptides: &[PeptideEvidence],
        opts: &ReportOptions,
    ) -> anyhow::Result<String> {
        let path = self.make_path("peptide.tsv");
        report::write_peptides(create(&path)?, peptides, opts)?;
        Ok(path.display().to_string())
    }

    pub fn write_localization(
        &self,
        psms: &[PsmEvidence],
        opts: &ReportOptions,
    ) -> anyhow::Result<String> {
        let path = self.make_path("localization.tsv");
        report::write_localization(create(&path)?, psms, opts)?;
        Ok(path.display().to_string())
    }

    pub fn write_proteins(
        &self,
        proteins: &[ProteinEvidence],
        opts: &ReportOptions,
    ) -> anyhow::Result<String> {
        let path = self.make_path("protein.tsv");
        report::write_proteins(create(&path)?, proteins, opts)?;
        Ok(path.display().to_string())
    }

    pub fn write_snapshot<T: Serialize>(&self, file_name: &str, value: &T) -> anyhow::Result<String> {
        let path = self.make_path(file_name);
        snapshot::store(&path, value)
            .with_context(|| format!("Failed to write snapshot `{}`", path.display()))?;
        Ok(path.display().to_string())
    }

    pub fn write_results(&mut self) -> anyhow::Result<String> {
        let path = self.make_path("results.json");
        self.parameters.output_paths.push(path.display().to_string());
        let bytes = serde_json::to_vec_pretty(&self.parameters)?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;
        Ok(path.display().to_string())
    }
}
