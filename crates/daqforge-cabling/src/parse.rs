//! Line parsers for the two inventory formats.
//!
//! Pure string handling: every function takes a line and returns a record,
//! `None` for blank/comment lines, or a [`CablingError::MalformedInventory`]
//! carrying the offending line. Role classification happens here too, so the
//! graph builder only ever sees ready-made entries.

use crate::device::{CONTROLLER_PREFIXES, HostRole, classify_host};
use crate::error::{CablingError, InventoryKind};

/// A parsed front-end controller record
/// (`name,crate,slot[,fed1[,fed2]],controllerHost`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ControllerRecord {
    pub tag: String,
    pub crate_no: u32,
    pub slot: u32,
    pub fed1: Option<u32>,
    pub fed2: Option<u32>,
    pub host: String,
}

/// One device entry on the front-end fabric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FrontEndEntry {
    /// A controller record with a recognized tag prefix.
    Controller(ControllerRecord),
    /// A bare readout-host name.
    ReadoutHost(String),
    /// Syntactically valid but no recognizable role; becomes a
    /// `MissingMapping` diagnostic upstream.
    Unrecognized(String),
}

/// A parsed builder-fabric port record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BuilderRecord {
    pub switch: String,
    pub port: String,
    pub peer: String,
    pub peer_port: String,
    pub blacklisted: bool,
    pub comment: String,
}

/// Whether a line is skippable (blank or `#` comment).
fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Parse one front-end inventory line (`switch;device`).
pub(crate) fn parse_frontend_line(
    line_no: usize,
    line: &str,
) -> Result<Option<(String, FrontEndEntry)>, CablingError> {
    if is_skippable(line) {
        return Ok(None);
    }
    let trimmed = line.trim();

    let Some((switch, device)) = trimmed.split_once(';') else {
        return Err(CablingError::malformed(
            InventoryKind::FrontEnd,
            line_no,
            trimmed,
            "expected 'switch;device'",
        ));
    };
    let switch = switch.trim();
    let device = device.trim();
    if switch.is_empty() || device.is_empty() {
        return Err(CablingError::malformed(
            InventoryKind::FrontEnd,
            line_no,
            trimmed,
            "empty switch or device field",
        ));
    }

    let entry = if device.contains(',') {
        parse_controller_record(line_no, trimmed, device)?
    } else if classify_host(device) == HostRole::Readout {
        FrontEndEntry::ReadoutHost(device.to_string())
    } else {
        FrontEndEntry::Unrecognized(device.to_string())
    };

    Ok(Some((switch.to_string(), entry)))
}

/// Parse the comma-joined controller record inside a front-end line.
fn parse_controller_record(
    line_no: usize,
    line: &str,
    device: &str,
) -> Result<FrontEndEntry, CablingError> {
    let fields: Vec<&str> = device.split(',').map(str::trim).collect();
    if !(4..=6).contains(&fields.len()) {
        return Err(CablingError::malformed(
            InventoryKind::FrontEnd,
            line_no,
            line,
            format!(
                "controller record has {} fields, expected 4-6 (name,crate,slot[,fed1[,fed2]],host)",
                fields.len()
            ),
        ));
    }

    let tag = fields[0];
    let host = fields[fields.len() - 1];
    if host.is_empty() {
        return Err(CablingError::malformed(
            InventoryKind::FrontEnd,
            line_no,
            line,
            "empty controller host field",
        ));
    }

    let number = |field: &str, what: &str| -> Result<u32, CablingError> {
        field.parse::<u32>().map_err(|_| {
            CablingError::malformed(
                InventoryKind::FrontEnd,
                line_no,
                line,
                format!("non-numeric {what} '{field}'"),
            )
        })
    };

    let crate_no = number(fields[1], "crate")?;
    let slot = number(fields[2], "slot")?;
    let fed1 = match fields.len() {
        5 | 6 => Some(number(fields[3], "fed id")?),
        _ => None,
    };
    let fed2 = match fields.len() {
        6 => Some(number(fields[4], "fed id")?),
        _ => None,
    };

    if !CONTROLLER_PREFIXES.iter().any(|p| tag.starts_with(p)) {
        return Ok(FrontEndEntry::Unrecognized(device.to_string()));
    }

    Ok(FrontEndEntry::Controller(ControllerRecord {
        tag: tag.to_string(),
        crate_no,
        slot,
        fed1,
        fed2,
        host: host.to_string(),
    }))
}

/// Parse one builder inventory line
/// (`switch,port,peerDevice,peerPort,blacklistFlag,comment`).
///
/// The comment is the sixth field and may itself contain commas.
pub(crate) fn parse_builder_line(
    line_no: usize,
    line: &str,
) -> Result<Option<BuilderRecord>, CablingError> {
    if is_skippable(line) {
        return Ok(None);
    }
    let trimmed = line.trim();

    let fields: Vec<&str> = trimmed.splitn(6, ',').map(str::trim).collect();
    if fields.len() != 6 {
        return Err(CablingError::malformed(
            InventoryKind::Builder,
            line_no,
            trimmed,
            format!(
                "expected 6 fields (switch,port,peer,peerPort,blacklist,comment), got {}",
                fields.len()
            ),
        ));
    }

    for (i, what) in [(0usize, "switch"), (1, "port"), (2, "peer"), (3, "peer port")] {
        if fields[i].is_empty() {
            return Err(CablingError::malformed(
                InventoryKind::Builder,
                line_no,
                trimmed,
                format!("empty {what} field"),
            ));
        }
    }

    let blacklisted = match fields[4] {
        "0" => false,
        "1" => true,
        other => {
            return Err(CablingError::malformed(
                InventoryKind::Builder,
                line_no,
                trimmed,
                format!("blacklist flag must be 0 or 1, got '{other}'"),
            ));
        }
    };

    Ok(Some(BuilderRecord {
        switch: fields[0].to_string(),
        port: fields[1].to_string(),
        peer: fields[2].to_string(),
        peer_port: fields[3].to_string(),
        blacklisted,
        comment: fields[5].to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(parse_frontend_line(1, "").unwrap(), None);
        assert_eq!(parse_frontend_line(2, "   ").unwrap(), None);
        assert_eq!(parse_frontend_line(3, "# data switches").unwrap(), None);
        assert_eq!(parse_builder_line(4, "# uplinks").unwrap(), None);
    }

    #[test]
    fn bare_readout_host_parses() {
        let (switch, entry) = parse_frontend_line(1, "sw-fe-01;ru-c2e12-11")
            .unwrap()
            .unwrap();
        assert_eq!(switch, "sw-fe-01");
        assert_eq!(entry, FrontEndEntry::ReadoutHost("ru-c2e12-11".to_string()));
    }

    #[test]
    fn full_controller_record_parses() {
        let (_, entry) = parse_frontend_line(1, "sw-fe-01;frl-c1-05,1,5,1012,1013,frlpc-c1-05")
            .unwrap()
            .unwrap();
        let FrontEndEntry::Controller(record) = entry else {
            panic!("expected controller, got {entry:?}");
        };
        assert_eq!(record.tag, "frl-c1-05");
        assert_eq!(record.crate_no, 1);
        assert_eq!(record.slot, 5);
        assert_eq!(record.fed1, Some(1012));
        assert_eq!(record.fed2, Some(1013));
        assert_eq!(record.host, "frlpc-c1-05");
    }

    #[test]
    fn controller_record_with_one_fed() {
        let (_, entry) = parse_frontend_line(1, "sw-fe-01;frl-c1-06,1,6,1014,frlpc-c1-06")
            .unwrap()
            .unwrap();
        let FrontEndEntry::Controller(record) = entry else {
            panic!("expected controller");
        };
        assert_eq!(record.fed1, Some(1014));
        assert_eq!(record.fed2, None);
    }

    #[test]
    fn controller_record_without_feds() {
        let (_, entry) = parse_frontend_line(1, "sw-fe-01;frl-c1-07,1,7,frlpc-c1-07")
            .unwrap()
            .unwrap();
        let FrontEndEntry::Controller(record) = entry else {
            panic!("expected controller");
        };
        assert_eq!(record.fed1, None);
        assert_eq!(record.fed2, None);
        assert_eq!(record.host, "frlpc-c1-07");
    }

    #[test]
    fn unrecognized_prefix_is_not_fatal() {
        let (_, entry) = parse_frontend_line(1, "sw-fe-01;fileserver-01")
            .unwrap()
            .unwrap();
        assert_eq!(entry, FrontEndEntry::Unrecognized("fileserver-01".to_string()));

        // Controller-shaped record with a foreign tag is also just unmapped.
        let (_, entry) = parse_frontend_line(2, "sw-fe-01;xyz-c1-05,1,5,1012,frlpc-c1-05")
            .unwrap()
            .unwrap();
        assert!(matches!(entry, FrontEndEntry::Unrecognized(_)));
    }

    #[test]
    fn missing_semicolon_is_malformed() {
        let err = parse_frontend_line(9, "sw-fe-01 ru-c2e12-11").unwrap_err();
        assert!(matches!(
            err,
            CablingError::MalformedInventory { line_no: 9, .. }
        ));
    }

    #[test]
    fn non_numeric_crate_is_malformed() {
        let err = parse_frontend_line(3, "sw-fe-01;frl-c1-05,one,5,1012,frlpc-c1-05").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("non-numeric crate"), "got: {msg}");
    }

    #[test]
    fn controller_field_count_is_checked() {
        let err = parse_frontend_line(3, "sw-fe-01;frl-c1-05,1").unwrap_err();
        assert!(err.to_string().contains("expected 4-6"));
    }

    #[test]
    fn builder_line_parses() {
        let record = parse_builder_line(1, "sw-ib-01,Eth1/7,ru-c2e12-11,mlx0,0,uplink ok")
            .unwrap()
            .unwrap();
        assert_eq!(record.switch, "sw-ib-01");
        assert_eq!(record.port, "Eth1/7");
        assert_eq!(record.peer, "ru-c2e12-11");
        assert_eq!(record.peer_port, "mlx0");
        assert!(!record.blacklisted);
        assert_eq!(record.comment, "uplink ok");
    }

    #[test]
    fn builder_comment_keeps_embedded_commas() {
        let record = parse_builder_line(1, "sw-ib-01,Eth1/9,bu-c2e18-01,mlx0,1,flaky, replace asap")
            .unwrap()
            .unwrap();
        assert!(record.blacklisted);
        assert_eq!(record.comment, "flaky, replace asap");
    }

    #[test]
    fn builder_empty_comment_is_allowed() {
        let record = parse_builder_line(1, "sw-ib-01,Eth1/7,ru-c2e12-11,mlx0,0,")
            .unwrap()
            .unwrap();
        assert_eq!(record.comment, "");
    }

    #[test]
    fn builder_bad_field_count_is_malformed() {
        let err = parse_builder_line(4, "sw-ib-01,Eth1/7,ru-c2e12-11").unwrap_err();
        assert!(matches!(
            err,
            CablingError::MalformedInventory { line_no: 4, .. }
        ));
    }

    #[test]
    fn builder_bad_blacklist_flag_is_malformed() {
        let err = parse_builder_line(2, "sw-ib-01,Eth1/7,ru-c2e12-11,mlx0,yes,").unwrap_err();
        assert!(err.to_string().contains("blacklist flag"));
    }
}
