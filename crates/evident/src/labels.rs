//! Isobaric labeling kits and reporter-channel quantities

use crate::Error;
use serde::{Deserialize, Serialize};

/// Number of channel slots in every label set
pub const SLOTS: usize = 18;

/// Custom channel name that removes a channel from every report
pub const MASKED: &str = "NA";

const TMT: [&str; SLOTS] = [
    "126", "127N", "127C", "128N", "128C", "129N", "129C", "130N", "130C", "131N", "131C", "132N",
    "132C", "133N", "133C", "134N", "134C", "135N",
];

const TMT6: [usize; 6] = [0, 1, 4, 5, 8, 9];

const ITRAQ4: [&str; 4] = ["114", "115", "116", "117"];

const ITRAQ8: [&str; 8] = ["113", "114", "115", "116", "117", "118", "119", "121"];

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Brand {
    Tmt,
    Itraq,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Isobaric {
    Tmt6,
    Tmt10,
    Tmt11,
    Tmt16,
    Tmt18,
    Itraq4,
    Itraq8,
}

impl Isobaric {
    pub fn brand(&self) -> Brand {
        match self {
            Isobaric::Itraq4 | Isobaric::Itraq8 => Brand::Itraq,
            _ => Brand::Tmt,
        }
    }

    pub fn channel_count(&self) -> usize {
        match self {
            Isobaric::Tmt6 => 6,
            Isobaric::Tmt10 => 10,
            Isobaric::Tmt11 => 11,
            Isobaric::Tmt16 => 16,
            Isobaric::Tmt18 => 18,
            Isobaric::Itraq4 => 4,
            Isobaric::Itraq8 => 8,
        }
    }

    /// Slot positions occupied by the kit, in reporter order
    pub fn slots(&self) -> Vec<usize> {
        match self {
            Isobaric::Tmt6 => TMT6.to_vec(),
            _ => (0..self.channel_count()).collect(),
        }
    }

    /// Reporter name stored in a slot, empty for slots the kit doesn't use
    pub fn slot_name(&self, slot: usize) -> &'static str {
        match self.brand() {
            Brand::Tmt => TMT.get(slot).copied().unwrap_or_default(),
            Brand::Itraq => {
                let names: &[&'static str] = match self {
                    Isobaric::Itraq4 => &ITRAQ4,
                    _ => &ITRAQ8,
                };
                names.get(slot).copied().unwrap_or_default()
            }
        }
    }
}

impl std::fmt::Display for Isobaric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Isobaric::Tmt6 => "tmt6",
            Isobaric::Tmt10 => "tmt10",
            Isobaric::Tmt11 => "tmt11",
            Isobaric::Tmt16 => "tmt16",
            Isobaric::Tmt18 => "tmt18",
            Isobaric::Itraq4 => "itraq4",
            Isobaric::Itraq8 => "itraq8",
        };
        f.write_str(s)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Channel {
    pub name: String,
    pub custom_name: String,
    pub intensity: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct IsobaricLabels {
    pub channels: [Channel; SLOTS],
    /// Whether these quantities contribute to aggregated evidence
    pub is_used: bool,
}

impl IsobaricLabels {
    /// Add the channel intensities of `other` to these labels
    pub fn add(&mut self, other: &IsobaricLabels) {
        for (lhs, rhs) in self.channels.iter_mut().zip(other.channels.iter()) {
            lhs.intensity += rhs.intensity;
        }
    }

    /// Sum the used label sets of an iterator. Returns `None` when no set is used.
    pub fn sum_used<'a, I>(labels: I) -> Option<IsobaricLabels>
    where
        I: IntoIterator<Item = &'a IsobaricLabels>,
    {
        let mut total: Option<IsobaricLabels> = None;
        for l in labels.into_iter().filter(|l| l.is_used) {
            match total.as_mut() {
                Some(t) => t.add(l),
                None => total = Some(l.clone()),
            }
        }
        total
    }
}

/// One reported channel
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ActiveChannel {
    pub slot: usize,
    pub header: String,
}

/// Ordered set of reported channels of a labeling kit. Channels whose custom
/// name is `NA` are not part of the layout.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChannelLayout {
    pub kind: Isobaric,
    custom_names: Vec<String>,
    active: Vec<ActiveChannel>,
}

impl ChannelLayout {
    pub fn new(kind: Isobaric, custom_names: &[String]) -> Result<Self, Error> {
        if !custom_names.is_empty() && custom_names.len() != kind.channel_count() {
            return Err(Error::InvalidLayout(format!(
                "{} has {} channels, {} names given",
                kind,
                kind.channel_count(),
                custom_names.len()
            )));
        }

        let active = kind
            .slots()
            .into_iter()
            .enumerate()
            .filter_map(|(ix, slot)| {
                let header = match custom_names.get(ix).map(|s| s.trim()) {
                    Some(MASKED) => return None,
                    Some(name) if !name.is_empty() => name.to_string(),
                    _ => format!("Channel {}", kind.slot_name(slot)),
                };
                Some(ActiveChannel { slot, header })
            })
            .collect::<Vec<_>>();

        Ok(ChannelLayout {
            kind,
            custom_names: custom_names.to_vec(),
            active,
        })
    }

    pub fn active(&self) -> &[ActiveChannel] {
        &self.active
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(|c| c.header.as_str())
    }

    /// Place reporter intensities (in kit order) into their slots
    pub fn labels(&self, intensities: &[f64], is_used: bool) -> IsobaricLabels {
        let mut labels = IsobaricLabels {
            is_used,
            ..Default::default()
        };
        for (slot, channel) in labels.channels.iter_mut().enumerate() {
            channel.name = self.kind.slot_name(slot).to_string();
        }
        for (ix, slot) in self.kind.slots().into_iter().enumerate() {
            let channel = &mut labels.channels[slot];
            channel.intensity = intensities.get(ix).copied().unwrap_or_default();
            channel.custom_name = self.custom_names.get(ix).cloned().unwrap_or_default();
        }
        labels
    }

    /// Intensities of the active channels in header order; zero when no
    /// labels are present
    pub fn values<'a>(
        &'a self,
        labels: Option<&'a IsobaricLabels>,
    ) -> impl Iterator<Item = f64> + 'a {
        self.active.iter().map(move |c| {
            labels
                .map(|l| l.channels[c.slot].intensity)
                .unwrap_or_default()
        })
    }
}
