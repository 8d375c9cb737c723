use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Chosen option per agenda. At most one choice per agenda.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteChoices(BTreeMap<String, String>);

impl VoteChoices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the choice for an agenda, replacing any previous one.
    pub fn set(&mut self, agenda: impl Into<String>, choice: impl Into<String>) -> &mut Self {
        self.0.insert(agenda.into(), choice.into());
        self
    }

    pub fn get(&self, agenda: &str) -> Option<&str> {
        self.0.get(agenda).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<A: Into<String>, C: Into<String>> FromIterator<(A, C)> for VoteChoices {
    fn from_iter<I: IntoIterator<Item = (A, C)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(agenda, choice)| (agenda.into(), choice.into()))
                .collect(),
        )
    }
}

impl Display for VoteChoices {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (agenda, choice) in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{agenda}={choice}")?;
            first = false;
        }
        Ok(())
    }
}

/// The choices submitted with the fee, and the update applied afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotePlan {
    pub initial: VoteChoices,
    pub update: VoteChoices,
}
