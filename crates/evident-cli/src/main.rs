use clap::{Arg, Command, ValueHint};
use evident_cli::input::Input;
use evident_cli::runner::Runner;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("EVIDENT_LOG", "error,evident=info"))
        .init();

    let matches = Command::new("evident")
        .version(clap::crate_version!())
        .about("Assemble PSM, ion, peptide and protein reports from search engine output")
        .arg(
            Arg::new("parameters")
                .required(true)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to configuration parameters (JSON file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("pepxml")
                .long("pepxml")
                .num_args(1..)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Paths to decoded pepXML files or directories. Overrides the \
                     inputs listed in the configuration file.",
                )
                .value_hint(ValueHint::AnyPath),
        )
        .arg(
            Arg::new("protxml")
                .long("protxml")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to a decoded protXML file. Overrides the configuration file.")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("fasta")
                .short('f')
                .long("fasta")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path to FASTA database used for protein annotation. Overrides the \
                     FASTA file specified in the configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("output_directory")
                .short('o')
                .long("output_directory")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path where reports will be written. Overrides the directory \
                     specified in the configuration file.",
                )
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("include-decoys")
                .long("include-decoys")
                .action(clap::ArgAction::SetTrue)
                .help("Write decoy identifications to every report"),
        )
        .arg(
            Arg::new("write-snapshots")
                .long("write-snapshots")
                .action(clap::ArgAction::SetTrue)
                .help("Persist database, pepXML and protXML snapshots next to the reports"),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let input = Input::from_arguments(matches)?;

    let settings = input.build().map(Runner::new)?.run()?;
    println!("{}", serde_json::to_string_pretty(&settings)?);

    Ok(())
}
