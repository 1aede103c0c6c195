use std::fmt;

use ironfront_protocol::DataId;

const NEGATION: char = '!';
const HIDDEN: char = '~';

/// A parsed prerequisite expression.
///
/// `!` inverts the requirement (satisfied while the key is absent) and `~`
/// hides the item unless the key is present. Markers are recognised anywhere
/// in the raw string and stripped from the base key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PrerequisiteToken {
    pub base_key: DataId,
    pub negated: bool,
    pub hidden_marker: bool,
}

impl PrerequisiteToken {
    pub fn parse(raw: &str) -> Self {
        Self {
            base_key: raw.replace([NEGATION, HIDDEN], ""),
            negated: raw.contains(NEGATION),
            hidden_marker: raw.contains(HIDDEN),
        }
    }

    pub fn plain(key: impl Into<DataId>) -> Self {
        Self {
            base_key: key.into(),
            negated: false,
            hidden_marker: false,
        }
    }

    /// A token that can never match a provided key.
    pub fn is_malformed(&self) -> bool {
        self.base_key.is_empty()
    }
}

impl fmt::Display for PrerequisiteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "{NEGATION}")?;
        }
        if self.hidden_marker {
            write!(f, "{HIDDEN}")?;
        }
        write!(f, "{}", self.base_key)
    }
}
