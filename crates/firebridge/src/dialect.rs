// Dialect selection.
//
// The backend family has two incompatible parameter/response shapes. The
// selector is a pure lookup from the session's provider mode; every
// operation consults it per call and threads the resulting dialect into
// the codec explicitly, so encoder and decoder stay symmetric and each
// shape is testable on its own.

use serde::{Deserialize, Serialize};

/// Which member of the backend family the session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Legacy dialect: groups identified by name, flat rule parameters.
    Classic,
    /// VPC-capable dialect: assigned `sg-…` ids, nested rule parameters.
    Modern,
}

/// The parameter-naming scheme and response shape to use for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireDialect {
    Classic,
    Modern,
}

impl WireDialect {
    /// Select the dialect for a provider mode. No error cases.
    pub fn for_mode(mode: ProviderMode) -> Self {
        match mode {
            ProviderMode::Classic => Self::Classic,
            ProviderMode::Modern => Self::Modern,
        }
    }

    /// Parameter key identifying a group on mutation calls.
    pub(crate) fn group_key(self) -> &'static str {
        match self {
            Self::Classic => "GroupName",
            Self::Modern => "GroupId",
        }
    }

    /// Parameter key identifying a group on describe calls, which take a
    /// numbered filter list.
    pub(crate) fn group_filter_key(self) -> &'static str {
        match self {
            Self::Classic => "GroupName.1",
            Self::Modern => "GroupId.1",
        }
    }
}
