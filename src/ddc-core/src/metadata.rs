// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Control metadata tree (monitor -> group -> subgroup -> control).
//!
//! Only the per-control write delay is consumed here; labels are carried for
//! logging and configuration readability.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::control::ControlId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorDb {
    pub name: Option<String>,
    pub groups: Vec<GroupDb>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupDb {
    pub name: String,
    pub subgroups: Vec<SubgroupDb>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubgroupDb {
    pub name: String,
    pub controls: Vec<ControlDb>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlDb {
    pub name: String,
    pub address: u8,
    /// Settle time after a write, in milliseconds. Absent when unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

impl MonitorDb {
    /// First control declared with this address, in tree order.
    pub fn find_control(&self, control: ControlId) -> Option<&ControlDb> {
        self.groups
            .iter()
            .flat_map(|group| group.subgroups.iter())
            .flat_map(|subgroup| subgroup.controls.iter())
            .find(|ctrl| ctrl.address == control.0)
    }

    /// Write delay of the first matching control.
    ///
    /// `None` means no delay is known, which is not the same as a declared
    /// delay of zero.
    pub fn write_delay(&self, control: ControlId) -> Option<Duration> {
        self.find_control(control)
            .and_then(|ctrl| ctrl.delay_ms)
            .map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(address: u8, delay_ms: Option<u64>) -> ControlDb {
        ControlDb {
            name: format!("ctrl-{:02x}", address),
            address,
            delay_ms,
        }
    }

    fn sample_db() -> MonitorDb {
        MonitorDb {
            name: Some("VESA standard monitor".into()),
            groups: vec![
                GroupDb {
                    name: "Image".into(),
                    subgroups: vec![SubgroupDb {
                        name: "Brightness and Contrast".into(),
                        controls: vec![control(0x10, None), control(0x12, Some(0))],
                    }],
                },
                GroupDb {
                    name: "Miscellaneous".into(),
                    subgroups: vec![
                        SubgroupDb {
                            name: "Empty".into(),
                            controls: Vec::new(),
                        },
                        SubgroupDb {
                            name: "Input settings".into(),
                            controls: vec![control(0x60, Some(200)), control(0x60, Some(900))],
                        },
                    ],
                },
            ],
        }
    }

    #[test]
    fn test_nested_delay_found() {
        let db = sample_db();
        assert_eq!(
            db.write_delay(ControlId(0x60)),
            Some(Duration::from_millis(200))
        );
    }

    #[test]
    fn test_absent_control_has_no_delay() {
        assert_eq!(sample_db().write_delay(ControlId(0x99)), None);
    }

    #[test]
    fn test_declared_zero_is_distinct_from_absent() {
        let db = sample_db();
        assert_eq!(db.write_delay(ControlId(0x12)), Some(Duration::ZERO));
        assert_ne!(db.write_delay(ControlId(0x12)), db.write_delay(ControlId(0x99)));
    }

    #[test]
    fn test_control_without_delay_stops_search() {
        assert_eq!(sample_db().write_delay(ControlId(0x10)), None);
        assert!(sample_db().find_control(ControlId(0x10)).is_some());
    }

    #[test]
    fn test_empty_db() {
        assert_eq!(MonitorDb::default().write_delay(ControlId(0x60)), None);
    }

    #[test]
    fn test_parse_from_toml() {
        let db: MonitorDb = toml::from_str(
            r#"
name = "Dell U2415"

[[groups]]
name = "Miscellaneous"

[[groups.subgroups]]
name = "Input settings"

[[groups.subgroups.controls]]
name = "Input source"
address = 0x60
delay_ms = 200
"#,
        )
        .unwrap();
        assert_eq!(db.write_delay(ControlId(0x60)), Some(Duration::from_millis(200)));
    }
}
