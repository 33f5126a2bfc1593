//! Per-resource configuration

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::Sort;

/// Operations a resource can allow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// `GET /res/{id}`
    Read,
    /// `GET /res`
    List,
    /// `POST /res`, or `PUT /res/{id}` on a missing item
    Create,
    /// `PATCH /res/{id}`
    Update,
    /// `PUT /res/{id}` on an existing item
    Replace,
    /// `DELETE /res/{id}`
    Delete,
    /// `DELETE /res`
    Clear,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::Read,
        Mode::List,
        Mode::Create,
        Mode::Update,
        Mode::Replace,
        Mode::Delete,
        Mode::Clear,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Read => "read",
            Mode::List => "list",
            Mode::Create => "create",
            Mode::Update => "update",
            Mode::Replace => "replace",
            Mode::Delete => "delete",
            Mode::Clear => "clear",
        };
        f.write_str(name)
    }
}

/// Set of allowed [`Mode`]s
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Mode>", into = "Vec<Mode>")]
pub struct Modes(u8);

impl Modes {
    pub const NONE: Modes = Modes(0);
    /// Read and List
    pub const READ_ONLY: Modes = Modes(0b000_0011);
    /// Create, Update, Replace, Delete and Clear
    pub const WRITE_ONLY: Modes = Modes(0b111_1100);
    pub const READ_WRITE: Modes = Modes(0b111_1111);

    pub fn with(self, mode: Mode) -> Self {
        Modes(self.0 | mode.bit())
    }

    pub fn contains(self, mode: Mode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub fn iter(self) -> impl Iterator<Item = Mode> {
        Mode::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl fmt::Debug for Modes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Mode> for Modes {
    fn from_iter<I: IntoIterator<Item = Mode>>(iter: I) -> Self {
        iter.into_iter().fold(Modes::NONE, Modes::with)
    }
}

impl From<Vec<Mode>> for Modes {
    fn from(modes: Vec<Mode>) -> Self {
        modes.into_iter().collect()
    }
}

impl From<Modes> for Vec<Mode> {
    fn from(modes: Modes) -> Self {
        modes.iter().collect()
    }
}

fn default_limit() -> Option<usize> {
    Some(20)
}

/// Resource configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conf {
    /// Operations clients may perform
    #[serde(default = "Conf::default_modes")]
    pub allowed_modes: Modes,
    /// Page size used when a list request gives no `limit`.
    /// `None` lists everything.
    #[serde(default = "default_limit")]
    pub pagination_default_limit: Option<usize>,
    /// Order used when a request gives no `sort`
    #[serde(default)]
    pub default_sort: Sort,
}

impl Conf {
    fn default_modes() -> Modes {
        Modes::READ_WRITE
    }

    /// Configuration allowing exactly `modes`
    pub fn with_modes(modes: Modes) -> Self {
        Self {
            allowed_modes: modes,
            ..Self::default()
        }
    }

    pub fn with_default_limit(mut self, limit: Option<usize>) -> Self {
        self.pagination_default_limit = limit;
        self
    }

    pub fn with_default_sort(mut self, sort: Sort) -> Self {
        self.default_sort = sort;
        self
    }

    pub fn is_mode_allowed(&self, mode: Mode) -> bool {
        self.allowed_modes.contains(mode)
    }
}

impl Default for Conf {
    fn default() -> Self {
        Self {
            allowed_modes: Self::default_modes(),
            pagination_default_limit: default_limit(),
            default_sort: Sort::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_presets() {
        assert!(Modes::READ_ONLY.contains(Mode::List));
        assert!(!Modes::READ_ONLY.contains(Mode::Clear));
        assert!(Modes::WRITE_ONLY.contains(Mode::Clear));
        assert!(!Modes::WRITE_ONLY.contains(Mode::Read));
        assert!(Mode::ALL.iter().all(|m| Modes::READ_WRITE.contains(*m)));
        assert_eq!(Modes::READ_ONLY.iter().count() + Modes::WRITE_ONLY.iter().count(), 7);
    }

    #[test]
    fn test_modes_from_names() {
        let modes: Modes = serde_json::from_value(json!(["read", "clear"])).unwrap();
        assert_eq!(modes, Modes::NONE.with(Mode::Read).with(Mode::Clear));
        assert_eq!(serde_json::to_value(modes).unwrap(), json!(["read", "clear"]));
        assert!(serde_json::from_value::<Modes>(json!(["drop"])).is_err());
    }

    #[test]
    fn test_conf_defaults() {
        let conf: Conf = serde_json::from_value(json!({})).unwrap();
        assert_eq!(conf, Conf::default());
        assert_eq!(conf.pagination_default_limit, Some(20));

        let conf: Conf = serde_json::from_value(json!({
            "allowed_modes": ["list"],
            "pagination_default_limit": null,
            "default_sort": "-id"
        }))
        .unwrap();
        assert!(conf.is_mode_allowed(Mode::List));
        assert!(!conf.is_mode_allowed(Mode::Read));
        assert_eq!(conf.pagination_default_limit, None);
        assert_eq!(conf.default_sort.to_string(), "-id");
    }
}
