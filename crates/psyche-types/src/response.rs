//! Response events and the closed vocabularies they are built from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Identifier of a single assessment item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Thematic grouping of assessment items, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Foundation,
    Agency,
    Resource,
    Connection,
    Shadow,
}

impl Domain {
    /// All domains in their fixed order.
    pub const ALL: [Domain; 5] = [
        Domain::Foundation,
        Domain::Agency,
        Domain::Resource,
        Domain::Connection,
        Domain::Shadow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Foundation => "foundation",
            Domain::Agency => "agency",
            Domain::Resource => "resource",
            Domain::Connection => "connection",
            Domain::Shadow => "shadow",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| TypesError::UnknownDomain(s.to_string()))
    }
}

/// Semantic tag of a chosen response.
///
/// The vocabulary is closed. Anything that does not match a known key,
/// including explicit skips, collapses to [`BeliefKey::Default`], so parsing
/// never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BeliefKey {
    // self-affirming
    SelfWorth,
    AbundanceMindset,
    InnerSafety,
    SelfTrust,
    GrowthOrientation,
    SecureConnection,
    // limiting
    ScarcityMindset,
    Hypervigilance,
    LearnedHelplessness,
    PeoplePleasing,
    Perfectionism,
    AbandonmentFear,
    ImpostorFeeling,
    ControlNeed,
    /// Skip / unrecognised key.
    Default,
}

impl BeliefKey {
    pub const ALL: [BeliefKey; 15] = [
        BeliefKey::SelfWorth,
        BeliefKey::AbundanceMindset,
        BeliefKey::InnerSafety,
        BeliefKey::SelfTrust,
        BeliefKey::GrowthOrientation,
        BeliefKey::SecureConnection,
        BeliefKey::ScarcityMindset,
        BeliefKey::Hypervigilance,
        BeliefKey::LearnedHelplessness,
        BeliefKey::PeoplePleasing,
        BeliefKey::Perfectionism,
        BeliefKey::AbandonmentFear,
        BeliefKey::ImpostorFeeling,
        BeliefKey::ControlNeed,
        BeliefKey::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BeliefKey::SelfWorth => "self_worth",
            BeliefKey::AbundanceMindset => "abundance_mindset",
            BeliefKey::InnerSafety => "inner_safety",
            BeliefKey::SelfTrust => "self_trust",
            BeliefKey::GrowthOrientation => "growth_orientation",
            BeliefKey::SecureConnection => "secure_connection",
            BeliefKey::ScarcityMindset => "scarcity_mindset",
            BeliefKey::Hypervigilance => "hypervigilance",
            BeliefKey::LearnedHelplessness => "learned_helplessness",
            BeliefKey::PeoplePleasing => "people_pleasing",
            BeliefKey::Perfectionism => "perfectionism",
            BeliefKey::AbandonmentFear => "abandonment_fear",
            BeliefKey::ImpostorFeeling => "impostor_feeling",
            BeliefKey::ControlNeed => "control_need",
            BeliefKey::Default => "default",
        }
    }

    /// Lenient parse: unknown input maps to [`BeliefKey::Default`].
    pub fn parse(s: &str) -> Self {
        BeliefKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .unwrap_or(BeliefKey::Default)
    }

    /// Whether the key declares a positive, self-affirming belief.
    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            BeliefKey::SelfWorth
                | BeliefKey::AbundanceMindset
                | BeliefKey::InnerSafety
                | BeliefKey::SelfTrust
                | BeliefKey::GrowthOrientation
                | BeliefKey::SecureConnection
        )
    }

    pub fn is_default(&self) -> bool {
        matches!(self, BeliefKey::Default)
    }
}

impl fmt::Display for BeliefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for BeliefKey {
    fn from(s: String) -> Self {
        BeliefKey::parse(&s)
    }
}

impl From<&str> for BeliefKey {
    fn from(s: &str) -> Self {
        BeliefKey::parse(s)
    }
}

impl From<BeliefKey> for String {
    fn from(key: BeliefKey) -> Self {
        key.as_str().to_string()
    }
}

/// Somatic marker reported alongside a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sensation {
    /// Neutral / nothing noticed.
    #[serde(rename = "s0")]
    S0,
    /// Tension.
    #[serde(rename = "s1")]
    S1,
    /// Warmth.
    #[serde(rename = "s2")]
    S2,
    /// Numbness.
    #[serde(rename = "s3")]
    S3,
    /// Fear.
    #[serde(rename = "s4")]
    S4,
}

impl Sensation {
    pub const NEUTRAL: Sensation = Sensation::S0;

    pub fn is_neutral(&self) -> bool {
        *self == Sensation::NEUTRAL
    }

    /// Tension and fear are the markers that contradict a positive choice.
    pub fn is_distress_marker(&self) -> bool {
        matches!(self, Sensation::S1 | Sensation::S4)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sensation::S0 => "s0",
            Sensation::S1 => "s1",
            Sensation::S2 => "s2",
            Sensation::S3 => "s3",
            Sensation::S4 => "s4",
        }
    }
}

impl fmt::Display for Sensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sensation {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "s0" => Ok(Sensation::S0),
            "s1" => Ok(Sensation::S1),
            "s2" => Ok(Sensation::S2),
            "s3" => Ok(Sensation::S3),
            "s4" => Ok(Sensation::S4),
            other => Err(TypesError::UnknownSensation(other.to_string())),
        }
    }
}

/// Position of the chosen option, `-1` for a skipped item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i8")]
pub struct ChoicePosition(i8);

impl ChoicePosition {
    pub const SKIP: ChoicePosition = ChoicePosition(-1);

    pub fn new(position: i8) -> Result<Self, TypesError> {
        Self::try_from(i64::from(position))
    }

    pub fn get(self) -> i8 {
        self.0
    }

    pub fn is_skip(self) -> bool {
        self.0 < 0
    }

    /// Index of a real (non-skip) choice.
    pub fn slot(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl TryFrom<i64> for ChoicePosition {
    type Error = TypesError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1..=2 => Ok(ChoicePosition(value as i8)),
            other => Err(TypesError::InvalidChoicePosition(other)),
        }
    }
}

impl From<ChoicePosition> for i8 {
    fn from(position: ChoicePosition) -> Self {
        position.0
    }
}

impl fmt::Display for ChoicePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One answered item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEvent {
    pub node_id: NodeId,
    pub domain: Domain,
    pub belief_key: BeliefKey,
    pub latency_ms: u64,
    pub sensation: Sensation,
    pub choice_position: ChoicePosition,
}

impl ResponseEvent {
    pub fn new(
        node_id: impl Into<NodeId>,
        domain: Domain,
        belief_key: BeliefKey,
        latency_ms: u64,
        sensation: Sensation,
        choice_position: ChoicePosition,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            domain,
            belief_key,
            latency_ms,
            sensation,
            choice_position,
        }
    }

    pub fn is_skip(&self) -> bool {
        self.belief_key.is_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_belief_key_falls_back_to_default() {
        assert_eq!(BeliefKey::parse("scarcity_mindset"), BeliefKey::ScarcityMindset);
        assert_eq!(BeliefKey::parse("no_such_key"), BeliefKey::Default);
        assert_eq!(BeliefKey::parse(""), BeliefKey::Default);
    }

    #[test]
    fn belief_key_round_trips_through_json() {
        let json = serde_json::to_string(&BeliefKey::InnerSafety).unwrap();
        assert_eq!(json, "\"inner_safety\"");
        let unknown: BeliefKey = serde_json::from_str("\"mystery\"").unwrap();
        assert_eq!(unknown, BeliefKey::Default);
    }

    #[test]
    fn choice_position_bounds() {
        assert!(ChoicePosition::new(-1).unwrap().is_skip());
        assert_eq!(ChoicePosition::new(2).unwrap().slot(), Some(2));
        assert_eq!(
            ChoicePosition::new(3),
            Err(TypesError::InvalidChoicePosition(3))
        );
        assert!(serde_json::from_str::<ChoicePosition>("-2").is_err());
    }

    #[test]
    fn event_wire_format_is_camel_case() {
        let json = r#"{
            "nodeId": 0,
            "domain": "foundation",
            "beliefKey": "scarcity_mindset",
            "latencyMs": 2000,
            "sensation": "s0",
            "choicePosition": 0
        }"#;
        let event: ResponseEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.node_id, NodeId(0));
        assert_eq!(event.domain, Domain::Foundation);
        assert_eq!(event.belief_key, BeliefKey::ScarcityMindset);
        assert_eq!(event.sensation, Sensation::S0);
        assert!(!event.is_skip());
    }

    #[test]
    fn positive_set_excludes_default() {
        let positives = BeliefKey::ALL.iter().filter(|k| k.is_positive()).count();
        assert_eq!(positives, 6);
        assert!(!BeliefKey::Default.is_positive());
    }

    #[test]
    fn distress_markers() {
        assert!(Sensation::S1.is_distress_marker());
        assert!(Sensation::S4.is_distress_marker());
        assert!(!Sensation::S2.is_distress_marker());
        assert_eq!("s3".parse::<Sensation>().unwrap(), Sensation::S3);
    }
}
