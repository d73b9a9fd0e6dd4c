use anyhow::{ensure, Context};
use clap::ArgMatches;
use evident_core::labels::{ChannelLayout, Isobaric};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Serialize, Clone, Debug)]
/// Actual run parameters - may include overrides or default values not set by user
pub struct Settings {
    pub version: String,
    pub decoy_tag: String,
    pub pepxml_paths: Vec<String>,
    pub protxml_path: Option<String>,
    pub fasta: Option<String>,
    pub include_decoys: bool,
    pub peptide_weight: f64,
    pub isobaric: Option<IsobaricSettings>,
    pub write_snapshots: bool,
    pub output_paths: Vec<String>,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,
}

#[derive(Deserialize, Default, Debug)]
/// Input parameters deserialized from JSON file
pub struct Input {
    decoy_tag: Option<String>,
    pepxml_paths: Option<Vec<String>>,
    protxml_path: Option<String>,
    fasta: Option<String>,
    output_directory: Option<String>,
    include_decoys: Option<bool>,
    peptide_weight: Option<f64>,
    isobaric: Option<IsobaricOptions>,
    write_snapshots: Option<bool>,
}

#[derive(Serialize, Deserialize, Default, Debug)]
pub struct IsobaricOptions {
    kind: Option<Isobaric>,
    channel_names: Option<Vec<String>>,
    min_purity: Option<f64>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct IsobaricSettings {
    pub kind: Isobaric,
    pub channel_names: Vec<String>,
    pub min_purity: f64,
}

impl IsobaricSettings {
    pub fn layout(&self) -> anyhow::Result<ChannelLayout> {
        ChannelLayout::new(self.kind, &self.channel_names).map_err(anyhow::Error::from)
    }
}

impl TryFrom<IsobaricOptions> for IsobaricSettings {
    type Error = anyhow::Error;

    fn try_from(value: IsobaricOptions) -> anyhow::Result<Self> {
        let kind = value
            .kind
            .context("`isobaric.kind` must be set when `isobaric` is present")?;
        let settings = IsobaricSettings {
            kind,
            channel_names: value.channel_names.unwrap_or_default(),
            min_purity: value.min_purity.unwrap_or(0.5),
        };
        if !(0.0..=1.0).contains(&settings.min_purity) {
            log::warn!(
                "isobaric.min_purity is expected to be between 0 and 1: {}",
                settings.min_purity
            );
        }
        // reject bad channel name lists before any input is read
        settings.layout()?;
        Ok(settings)
    }
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let path = matches
            .get_one::<String>("parameters")
            .expect("required parameters");
        let mut input = Input::load(path)
            .with_context(|| format!("Failed to read parameters from `{path}`"))?;

        // Handle JSON configuration overrides
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }
        if let Some(fasta) = matches.get_one::<String>("fasta") {
            log::trace!("overriding `fasta` parameter.");
            input.fasta = Some(fasta.into());
        }
        if let Some(protxml) = matches.get_one::<String>("protxml") {
            log::trace!("overriding `protxml_path` parameter.");
            input.protxml_path = Some(protxml.into());
        }
        if let Some(pepxml_paths) = matches.get_many::<String>("pepxml") {
            log::trace!("overriding `pepxml_paths` parameter.");
            input.pepxml_paths = Some(pepxml_paths.into_iter().map(|p| p.into()).collect());
        }
        if matches.get_flag("include-decoys") {
            input.include_decoys = Some(true);
        }
        if matches.get_flag("write-snapshots") {
            input.write_snapshots = Some(true);
        }

        ensure!(
            input.pepxml_paths.as_ref().map_or(false, |p| !p.is_empty()),
            "`pepxml_paths` must be set. For more information try '--help'"
        );

        Ok(input)
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        evident_core::read_json(path.as_ref()).map_err(anyhow::Error::from)
    }

    pub fn build(self) -> anyhow::Result<Settings> {
        let pepxml_paths = self.pepxml_paths.unwrap_or_default();
        ensure!(
            !pepxml_paths.is_empty(),
            "`pepxml_paths` must contain at least one file or directory"
        );

        let decoy_tag = self.decoy_tag.unwrap_or_else(|| "rev_".into());
        if decoy_tag.is_empty() {
            log::warn!("`decoy_tag` is empty, no decoy identifications will be recognized");
        }

        let peptide_weight = self.peptide_weight.unwrap_or(0.5);
        if !(0.0..=1.0).contains(&peptide_weight) {
            log::warn!(
                "peptide_weight is expected to be between 0 and 1: {}",
                peptide_weight
            );
        }

        let isobaric = self.isobaric.map(IsobaricSettings::try_from).transpose()?;

        let output_directory = match self.output_directory {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::create_dir_all(&path).with_context(|| {
                    format!("Failed to create output directory `{}`", path.display())
                })?;
                path
            }
            None => std::env::current_dir()?,
        };

        Ok(Settings {
            version: clap::crate_version!().into(),
            decoy_tag,
            pepxml_paths,
            protxml_path: self.protxml_path,
            fasta: self.fasta,
            include_decoys: self.include_decoys.unwrap_or(false),
            peptide_weight,
            isobaric,
            write_snapshots: self.write_snapshots.unwrap_or(false),
            output_paths: Vec::new(),
            output_directory,
        })
    }
}
