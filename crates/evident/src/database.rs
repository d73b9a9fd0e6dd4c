use fnv::FnvHashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Prefix marking contaminant entries
pub const CONTAMINANT_TAG: &str = "contam_";

/// Header convention of a FASTA entry
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Source {
    UniProt,
    UniRef,
    Ensembl,
    Ncbi,
    #[default]
    Generic,
}

impl Source {
    /// Classify a header, ignoring any decoy or contaminant prefix
    pub fn classify(header: &str, decoy_tag: &str) -> Source {
        let mut h = header;
        if !decoy_tag.is_empty() {
            h = h.strip_prefix(decoy_tag).unwrap_or(h);
        }
        h = h.strip_prefix(CONTAMINANT_TAG).unwrap_or(h);

        if h.starts_with("sp|") || h.starts_with("tr|") {
            Source::UniProt
        } else if h.starts_with("UniRef") {
            Source::UniRef
        } else if h.starts_with("ENS") {
            Source::Ensembl
        } else if h.starts_with("gi|")
            || ["NP_", "XP_", "YP_", "WP_", "AP_"]
                .iter()
                .any(|p| h.starts_with(p))
        {
            Source::Ncbi
        } else {
            Source::Generic
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Record {
    /// First whitespace-delimited token of the header; the identifier used
    /// by search engines
    pub part_header: String,
    pub original_header: String,
    pub id: String,
    pub entry_name: String,
    pub genes: String,
    pub description: String,
    pub organism: String,
    pub sequence: String,
    pub length: usize,
    pub is_decoy: bool,
    pub is_contaminant: bool,
    pub source: Source,
}

/// Regular expressions for the key=value fields of UniProt-style headers
struct Fields {
    os: Regex,
    gn: Regex,
    tax: Regex,
    rep_id: Regex,
    gene_symbol: Regex,
    ncbi_organism: Regex,
}

impl Fields {
    fn new() -> Self {
        let re = |s: &str| Regex::new(s).expect("This is valid regex");
        Fields {
            os: re(r"OS=(.+?)(?: OX=| GN=| PE=| SV=|$)"),
            gn: re(r"GN=(\S+)"),
            tax: re(r"Tax=(.+?)(?: TaxID=| RepID=|$)"),
            rep_id: re(r"RepID=(\S+)"),
            gene_symbol: re(r"gene_symbol:(\S+)"),
            ncbi_organism: re(r"\[([^\]]+)\]\s*$"),
        }
    }

    fn capture(re: &Regex, s: &str) -> String {
        re.captures(s)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    }
}

impl Record {
    fn parse(header: &str, sequence: String, decoy_tag: &str, fields: &Fields) -> Record {
        let header = header.trim();
        let (part_header, rest) = match header.split_once(char::is_whitespace) {
            Some((part, rest)) => (part, rest.trim()),
            None => (header, ""),
        };

        let is_decoy = !decoy_tag.is_empty() && part_header.starts_with(decoy_tag);
        let bare = if is_decoy {
            &part_header[decoy_tag.len()..]
        } else {
            part_header
        };
        let is_contaminant = bare.starts_with(CONTAMINANT_TAG);
        let bare = bare.strip_prefix(CONTAMINANT_TAG).unwrap_or(bare);

        let source = Source::classify(part_header, decoy_tag);
        let mut record = Record {
            part_header: part_header.into(),
            original_header: header.into(),
            length: sequence.len(),
            sequence,
            is_decoy,
            is_contaminant,
            source,
            ..Default::default()
        };

        match source {
            Source::UniProt => {
                let mut parts = bare.split('|').skip(1);
                record.id = parts.next().unwrap_or_default().into();
                record.entry_name = parts.next().unwrap_or_default().into();
                record.description = rest
                    .split(" OS=")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .into();
                record.organism = Fields::capture(&fields.os, rest);
                record.genes = Fields::capture(&fields.gn, rest);
            }
            Source::UniRef => {
                record.id = bare
                    .split_once('_')
                    .map(|(_, id)| id)
                    .unwrap_or(bare)
                    .into();
                record.entry_name = Fields::capture(&fields.rep_id, rest);
                record.description = rest.split(" n=").next().unwrap_or_default().trim().into();
                record.organism = Fields::capture(&fields.tax, rest);
            }
            Source::Ensembl => {
                record.id = bare.into();
                record.genes = Fields::capture(&fields.gene_symbol, rest);
                record.description = rest
                    .split_once("description:")
                    .map(|(_, d)| d.trim())
                    .unwrap_or_default()
                    .into();
            }
            Source::Ncbi => {
                record.id = match bare.strip_prefix("gi|") {
                    Some(gi) => gi.split('|').nth(2).unwrap_or(gi).into(),
                    None => bare.into(),
                };
                record.organism = Fields::capture(&fields.ncbi_organism, rest);
                record.description = rest.split(" [").next().unwrap_or_default().trim().into();
            }
            Source::Generic => {
                record.id = bare.into();
                record.description = rest.into();
            }
        }
        record
    }
}

/// Annotated protein database
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Database {
    pub decoy_tag: String,
    pub records: Vec<Record>,
}

impl Database {
    /// Parse FASTA text. Entries without a sequence are kept, since they can
    /// still supply annotations.
    pub fn parse(contents: &str, decoy_tag: &str) -> Database {
        let fields = Fields::new();
        let mut records = Vec::new();
        let mut header: Option<&str> = None;
        let mut s = String::new();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(h) = line.strip_prefix('>') {
                if let Some(last) = header.take() {
                    let seq = std::mem::take(&mut s);
                    records.push(Record::parse(last, seq, decoy_tag, &fields));
                }
                header = Some(h);
            } else {
                s.push_str(line);
            }
        }

        if let Some(last) = header {
            records.push(Record::parse(last, s, decoy_tag, &fields));
        }

        log::info!("parsed {} protein database entries", records.len());
        Database {
            decoy_tag: decoy_tag.into(),
            records,
        }
    }

    pub fn annotations(&self) -> Annotations<'_> {
        Annotations::new(self)
    }
}

/// Read-only lookup from protein identifiers (part headers) to database
/// records. Misses yield empty strings.
#[derive(Default)]
pub struct Annotations<'db> {
    records: FnvHashMap<&'db str, &'db Record>,
}

impl<'db> Annotations<'db> {
    pub fn new(db: &'db Database) -> Self {
        let mut records = FnvHashMap::default();
        for record in &db.records {
            records.entry(record.part_header.as_str()).or_insert(record);
        }
        Annotations { records }
    }

    pub fn get(&self, protein: &str) -> Option<&'db Record> {
        self.records.get(protein).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn protein_id(&self, protein: &str) -> &'db str {
        self.get(protein).map(|r| r.id.as_str()).unwrap_or_default()
    }

    pub fn entry_name(&self, protein: &str) -> &'db str {
        self.get(protein)
            .map(|r| r.entry_name.as_str())
            .unwrap_or_default()
    }

    pub fn gene(&self, protein: &str) -> &'db str {
        self.get(protein).map(|r| r.genes.as_str()).unwrap_or_default()
    }

    pub fn description(&self, protein: &str) -> &'db str {
        self.get(protein)
            .map(|r| r.description.as_str())
            .unwrap_or_default()
    }

    pub fn length(&self, protein: &str) -> usize {
        self.get(protein).map(|r| r.length).unwrap_or_default()
    }

    /// 1-based start and end of `peptide` within the protein sequence,
    /// (0, 0) when the protein or peptide can't be found
    pub fn protein_range(&self, protein: &str, peptide: &str) -> (usize, usize) {
        if peptide.is_empty() {
            return (0, 0);
        }
        self.get(protein)
            .and_then(|r| r.sequence.find(peptide))
            .map(|start| (start + 1, start + peptide.len()))
            .unwrap_or((0, 0))
    }
}
