//! Strategies and Strategy Profiles
//!
//! Each player picks one of four reactive strategies. A strategy maps the
//! opponent's disposition in the previous period to this player's action:
//!
//! | Strategy | Opponent was disciplined | Opponent was careless |
//! |----------|--------------------------|-----------------------|
//! | `SS`     | S                        | S                     |
//! | `SC`     | S                        | C                     |
//! | `CS`     | C                        | S                     |
//! | `CC`     | C                        | C                     |
//!
//! The sixteen ordered pairs fall into four payoff classes. Profiles in the
//! same class always share a payoff, whatever the parameter point.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Disposition {
    Disciplined,
    Careless,
}

impl Disposition {
    pub fn tag(&self) -> char {
        match self {
            Self::Disciplined => 'S',
            Self::Careless => 'C',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Strategy {
    SS,
    SC,
    CS,
    CC,
}

impl Strategy {
    pub fn all() -> [Self; 4] {
        [Self::SS, Self::SC, Self::CS, Self::CC]
    }

    /// Action taken after observing the opponent's previous disposition.
    pub fn respond(&self, opponent_last: Disposition) -> Disposition {
        use Disposition::{Careless, Disciplined};
        match (self, opponent_last) {
            (Self::SS, _) => Disciplined,
            (Self::CC, _) => Careless,
            (Self::SC, Disciplined) | (Self::CS, Careless) => Disciplined,
            (Self::SC, Careless) | (Self::CS, Disciplined) => Careless,
        }
    }
}

/// Written as the responses to a disciplined and a careless opponent.
impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;
        f.write_char(self.respond(Disposition::Disciplined).tag())?;
        f.write_char(self.respond(Disposition::Careless).tag())
    }
}

impl FromStr for Strategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        Self::all()
            .into_iter()
            .find(|strategy| strategy.to_string() == tag)
            .ok_or_else(|| DomainError::UnknownStrategy(tag.to_string()))
    }
}

/// Ordered pair (player 1, player 2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StrategyProfile {
    pub player1: Strategy,
    pub player2: Strategy,
}

impl StrategyProfile {
    pub const fn new(player1: Strategy, player2: Strategy) -> Self {
        Self { player1, player2 }
    }

    /// All sixteen profiles, player 1 major.
    pub fn all() -> Vec<Self> {
        Strategy::all()
            .into_iter()
            .flat_map(|p1| Strategy::all().into_iter().map(move |p2| Self::new(p1, p2)))
            .collect()
    }

    pub fn with_player1(&self, strategy: Strategy) -> Self {
        Self::new(strategy, self.player2)
    }

    pub fn with_player2(&self, strategy: Strategy) -> Self {
        Self::new(self.player1, strategy)
    }

    pub fn class(&self) -> PayoffClass {
        PayoffClass::of(*self)
    }
}

impl fmt::Display for StrategyProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.player1, self.player2)
    }
}

/// Accepts `CC,SS`, `CC SS` or `(CC, SS)`.
impl FromStr for StrategyProfile {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
        let parts: Vec<&str> = inner
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        match parts.as_slice() {
            [p1, p2] => Ok(Self::new(p1.parse()?, p2.parse()?)),
            _ => Err(DomainError::MalformedProfile(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PayoffClass {
    A,
    B,
    C,
    D,
}

impl PayoffClass {
    pub fn all() -> [Self; 4] {
        [Self::A, Self::B, Self::C, Self::D]
    }

    pub fn index(&self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }

    pub fn of(profile: StrategyProfile) -> Self {
        use Strategy::{CC, CS, SC, SS};
        match (profile.player1, profile.player2) {
            (SS, SS) | (SS, SC) | (SC, SS) | (SC, SC) => Self::A,
            (CC, CC) | (SC, CC) | (CC, SC) => Self::B,
            (SS, CC) | (SS, CS) | (CS, CC) | (CS, SC) => Self::C,
            (CC, SS) | (CS, SS) | (CC, CS) | (SC, CS) | (CS, CS) => Self::D,
        }
    }

    /// One fixed member, standing in for the whole class.
    pub const fn representative(&self) -> StrategyProfile {
        use Strategy::{CC, CS, SC, SS};
        match self {
            Self::A => StrategyProfile::new(SS, SS),
            Self::B => StrategyProfile::new(SC, CC),
            Self::C => StrategyProfile::new(SS, CS),
            Self::D => StrategyProfile::new(SC, CS),
        }
    }

    pub fn members(&self) -> Vec<StrategyProfile> {
        StrategyProfile::all()
            .into_iter()
            .filter(|p| p.class() == *self)
            .collect()
    }

    /// (state, report) selecting the detection parameter `b*`.
    pub fn detection_key(&self) -> (Disposition, Disposition) {
        use Disposition::{Careless, Disciplined};
        match self {
            Self::A => (Disciplined, Disciplined),
            Self::B => (Careless, Careless),
            Self::C => (Disciplined, Careless),
            Self::D => (Careless, Disciplined),
        }
    }

    /// (state, report) fed to the continuation term `F`.
    ///
    /// The mixed classes cross over: class C is detected through `b_Sc` but
    /// continues through `b_Cs`, and class D the other way round.
    pub fn continuation_key(&self) -> (Disposition, Disposition) {
        use Disposition::{Careless, Disciplined};
        match self {
            Self::A => (Disciplined, Disciplined),
            Self::B => (Careless, Careless),
            Self::C => (Careless, Disciplined),
            Self::D => (Disciplined, Careless),
        }
    }
}

impl fmt::Display for PayoffClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PayoffClass {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            "C" | "c" => Ok(Self::C),
            "D" | "d" => Ok(Self::D),
            other => Err(DomainError::UnknownClass(other.to_string())),
        }
    }
}

/// Profiles whose witnesses are kept for export, in report order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetSet {
    profiles: Vec<StrategyProfile>,
}

impl TargetSet {
    pub fn new(profiles: impl IntoIterator<Item = StrategyProfile>) -> Self {
        let mut out: Vec<StrategyProfile> = Vec::new();
        for p in profiles {
            if !out.contains(&p) {
                out.push(p);
            }
        }
        Self { profiles: out }
    }

    pub fn parse<S: AsRef<str>>(specs: &[S]) -> Result<Self, DomainError> {
        let profiles = specs
            .iter()
            .map(|s| s.as_ref().parse())
            .collect::<Result<Vec<StrategyProfile>, _>>()?;
        Ok(Self::new(profiles))
    }

    /// Every profile of one payoff class.
    pub fn class(class: PayoffClass) -> Self {
        Self::new(class.members())
    }

    /// The (CC, SS)-equivalent set studied by default.
    pub fn default_targets() -> Self {
        use Strategy::{CC, CS, SC, SS};
        Self::new([
            StrategyProfile::new(CC, SS),
            StrategyProfile::new(CS, SS),
            StrategyProfile::new(CC, CS),
            StrategyProfile::new(SC, CS),
            StrategyProfile::new(CS, CS),
        ])
    }

    pub fn contains(&self, profile: &StrategyProfile) -> bool {
        self.profiles.contains(profile)
    }

    pub fn position(&self, profile: &StrategyProfile) -> Option<usize> {
        self.profiles.iter().position(|p| p == profile)
    }

    pub fn profiles(&self) -> &[StrategyProfile] {
        &self.profiles
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sixteen_profiles_in_four_classes() {
        let all = StrategyProfile::all();
        assert_eq!(all.len(), 16);

        let sizes: Vec<usize> = PayoffClass::all().iter().map(|c| c.members().len()).collect();
        assert_eq!(sizes, vec![4, 3, 4, 5]);
        assert_eq!(sizes.iter().sum::<usize>(), 16);
    }

    #[test]
    fn test_representative_belongs_to_its_class() {
        for class in PayoffClass::all() {
            let rep = class.representative();
            assert_eq!(rep.class(), class);
            assert!(class.members().contains(&rep));
        }
    }

    #[test]
    fn test_class_membership_matches_table() {
        use Strategy::*;
        assert_eq!(StrategyProfile::new(SC, SS).class(), PayoffClass::A);
        assert_eq!(StrategyProfile::new(CC, SC).class(), PayoffClass::B);
        assert_eq!(StrategyProfile::new(CS, SC).class(), PayoffClass::C);
        assert_eq!(StrategyProfile::new(SC, CS).class(), PayoffClass::D);
        assert_eq!(StrategyProfile::new(CS, CS).class(), PayoffClass::D);
    }

    #[test]
    fn test_respond_reads_opponent_disposition() {
        assert_eq!(Strategy::SC.respond(Disposition::Disciplined), Disposition::Disciplined);
        assert_eq!(Strategy::SC.respond(Disposition::Careless), Disposition::Careless);
        assert_eq!(Strategy::CS.respond(Disposition::Disciplined), Disposition::Careless);
        assert_eq!(Strategy::CS.respond(Disposition::Careless), Disposition::Disciplined);

        let names: Vec<String> = Strategy::all().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["SS", "SC", "CS", "CC"]);
    }

    #[test]
    fn test_strategy_tags_round_trip() {
        for s in Strategy::all() {
            assert_eq!(s.to_string().parse::<Strategy>().unwrap(), s);
        }
        assert_eq!(" CS ".parse::<Strategy>().unwrap(), Strategy::CS);
        assert_eq!(
            "sc".parse::<Strategy>().unwrap_err(),
            DomainError::UnknownStrategy("sc".to_string())
        );
    }

    #[test]
    fn test_profile_parsing() {
        let expected = StrategyProfile::new(Strategy::CC, Strategy::SS);
        assert_eq!("CC,SS".parse::<StrategyProfile>().unwrap(), expected);
        assert_eq!("(CC, SS)".parse::<StrategyProfile>().unwrap(), expected);
        assert_eq!("CC SS".parse::<StrategyProfile>().unwrap(), expected);
        assert_eq!(expected.to_string(), "(CC, SS)");
    }

    #[test]
    fn test_unknown_tags_are_domain_errors() {
        assert_eq!(
            "SX".parse::<Strategy>(),
            Err(DomainError::UnknownStrategy("SX".to_string()))
        );
        assert!(matches!(
            "CC".parse::<StrategyProfile>(),
            Err(DomainError::MalformedProfile(_))
        ));
        assert!(matches!("E".parse::<PayoffClass>(), Err(DomainError::UnknownClass(_))));
    }

    #[test]
    fn test_target_set_dedups_in_order() {
        let targets = TargetSet::parse(&["CC,SS", "CS,SS", "CC,SS"]).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets.position(&"CS,SS".parse().unwrap()), Some(1));
        let mut default: Vec<_> = TargetSet::default_targets().profiles().to_vec();
        let mut class_d = PayoffClass::D.members();
        default.sort();
        class_d.sort();
        assert_eq!(default, class_d);
    }
}
