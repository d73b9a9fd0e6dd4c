use crate::input::Settings;
use anyhow::Context;
use evident_core::database::Database;
use evident_core::evidence::{self, DecoyReference};
use evident_core::pepxml::PepXml;
use evident_core::protxml::ProtXml;
use evident_core::report::ReportOptions;
use evident_core::snapshot;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

pub struct Runner {
    pub parameters: Settings,
    start: Instant,
}

impl Runner {
    pub fn new(parameters: Settings) -> Self {
        Runner {
            parameters,
            start: Instant::now(),
        }
    }

    // Create a path for `file_name` in the output directory
    pub(crate) fn make_path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        self.parameters.output_directory.join(file_name.as_ref())
    }

    fn read_database(&self) -> anyhow::Result<Database> {
        match &self.parameters.fasta {
            Some(path) => evident_core::read_fasta(path, &self.parameters.decoy_tag)
                .with_context(|| format!("Failed to read FASTA from `{}`", path)),
            None => {
                log::warn!("no protein database given, annotation columns will be empty");
                Ok(Database::default())
            }
        }
    }

    pub fn run(mut self) -> anyhow::Result<Settings> {
        let decoy_tag = self.parameters.decoy_tag.clone();

        let paths = self
            .parameters
            .pepxml_paths
            .iter()
            .map(PathBuf::from)
            .collect::<Vec<_>>();
        let pepxml = PepXml::read_all(&paths, &decoy_tag).context("Failed to read pepXML input")?;
        info!(
            "read {} PSMs from {} ({})",
            pepxml.psms.len(),
            pepxml.search_engine,
            pepxml.prophet
        );

        let database = self.read_database()?;
        let annotations = database.annotations();

        let layout = self
            .parameters
            .isobaric
            .as_ref()
            .map(|isobaric| isobaric.layout())
            .transpose()?;

        let ctx = evidence::Context {
            decoy_tag: &decoy_tag,
            annotations: &annotations,
            layout: layout.as_ref(),
            min_purity: self
                .parameters
                .isobaric
                .as_ref()
                .map(|i| i.min_purity)
                .unwrap_or_default(),
        };
        let opts = ReportOptions {
            include_decoys: self.parameters.include_decoys,
            is_comet: pepxml.is_comet(),
            layout: layout.as_ref(),
        };

        let psms = evidence::assemble_psms(&pepxml.psms, &ctx);
        let ions = evidence::assemble_ions(&psms);
        let reference = DecoyReference::from_psms(&pepxml.psms, &decoy_tag);
        let peptides = evidence::assemble_peptides(&psms, &reference);
        info!(
            "assembled {} ions and {} peptides",
            ions.len(),
            peptides.len()
        );

        let mut outputs = vec![
            self.write_psms(&psms, &opts)?,
            self.write_ions(&ions, &opts)?,
            self.write_peptides(&peptides, &opts)?,
        ];

        if psms.iter().any(|e| !e.psm.localized_ptm_mass_diff.is_empty()) {
            outputs.push(self.write_localization(&psms, &opts)?);
        }

        let protxml = match &self.parameters.protxml_path {
            Some(path) => {
                let mut protxml = ProtXml::read(path, &decoy_tag)
                    .with_context(|| format!("Failed to read protXML from `{}`", path))?;
                protxml.promote_protein_ids();
                protxml.mark_unique_peptides(self.parameters.peptide_weight);
                let proteins = evidence::assemble_proteins(&protxml, &psms, &ctx);
                outputs.push(self.write_proteins(&proteins, &opts)?);
                Some(protxml)
            }
            None => None,
        };

        if self.parameters.write_snapshots {
            log::trace!("writing snapshots");
            outputs.push(self.write_snapshot(snapshot::DATABASE, &database)?);
            outputs.push(self.write_snapshot(snapshot::PEPXML, &pepxml)?);
            if let Some(protxml) = &protxml {
                outputs.push(self.write_snapshot(snapshot::PROTXML, protxml)?);
            }
        }

        self.parameters.output_paths.extend(outputs);
        self.write_results()?;

        let run_time = (Instant::now() - self.start).as_secs_f32();
        info!("finished in {:.2}s", run_time);
        Ok(self.parameters)
    }
}
