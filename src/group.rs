//! Constraint groups spanning several arguments.

use crate::arg::ArgId;
use crate::parser::ParseError;
use std::fmt;

/// Cardinality rule applied to the members of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupPolicy {
    /// Exactly one member must be given.
    ExactlyOne,
    /// One or more members must be given.
    AtLeastOne,
    /// Either no member or every member must be given.
    AllOrNone,
}

impl GroupPolicy {
    /// Whether `present` out of `total` members satisfies the policy.
    pub fn is_satisfied(self, present: usize, total: usize) -> bool {
        match self {
            GroupPolicy::ExactlyOne => present == 1,
            GroupPolicy::AtLeastOne => present >= 1,
            GroupPolicy::AllOrNone => present == 0 || present == total,
        }
    }
}

impl fmt::Display for GroupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GroupPolicy::ExactlyOne => "exactly one of",
            GroupPolicy::AtLeastOne => "at least one of",
            GroupPolicy::AllOrNone => "all or none of",
        })
    }
}

/// A validation rule over the occurrence counts of a set of arguments.
///
/// Members are held as [`ArgId`]s; the group never owns the arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub(crate) policy: GroupPolicy,
    pub(crate) members: Vec<ArgId>,
}

impl Group {
    pub fn policy(&self) -> GroupPolicy {
        self.policy
    }

    pub fn members(&self) -> &[ArgId] {
        &self.members
    }

    pub fn contains(&self, id: ArgId) -> bool {
        self.members.contains(&id)
    }

    /// Check the group against observed occurrence counts.
    ///
    /// `occurrences` maps a member to how often it was given, `display`
    /// maps it to the name used in the diagnostic.
    pub fn check<O, D>(&self, occurrences: O, display: D) -> Result<(), ParseError>
    where
        O: Fn(ArgId) -> usize,
        D: Fn(ArgId) -> String,
    {
        let present = self
            .members
            .iter()
            .filter(|id| occurrences(**id) > 0)
            .count();
        if self.policy.is_satisfied(present, self.members.len()) {
            return Ok(());
        }

        Err(ParseError::Group {
            policy: self.policy,
            members: self.members.iter().map(|id| display(*id)).collect(),
            present,
        })
    }
}
