//! Node topology option parsing (geometry and connection type).
//!
//! These options came from the Blue Gene era; the grammar survives
//! because the environment variables still carry it.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Node connection topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnType {
    Mesh,
    Torus,
    /// Let the system choose.
    Nav,
}

impl fmt::Display for ConnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnType::Mesh => "mesh",
            ConnType::Torus => "torus",
            ConnType::Nav => "nav",
        };
        f.write_str(s)
    }
}

/// Parse a `--conn-type` value, accepting any unique prefix of
/// `mesh`, `torus` or `nav`, case-insensitive.
pub fn parse_conn_type(s: &str) -> Result<ConnType, ParseError> {
    let err = || ParseError::new("connection type", s);
    let lower = s.trim().to_ascii_lowercase();
    if lower.is_empty() {
        return Err(err());
    }
    if "mesh".starts_with(&lower) {
        Ok(ConnType::Mesh)
    } else if "torus".starts_with(&lower) {
        Ok(ConnType::Torus)
    } else if "nav".starts_with(&lower) {
        Ok(ConnType::Nav)
    } else {
        Err(err())
    }
}

/// Parse a `--geometry` value of the form `XxYxZ` or `X,Y,Z`.
///
/// Up to three dimensions; omitted trailing dimensions default to 1.
/// A zero dimension is rejected.
pub fn parse_geometry(s: &str) -> Result<[u16; 3], ParseError> {
    let err = || ParseError::new("geometry", s);
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(err());
    }

    let sep = if trimmed.contains(',') { ',' } else { 'x' };
    let mut dims = [1u16; 3];
    let mut count = 0;
    for part in trimmed.split(|c: char| c == sep || c == 'X') {
        if count >= dims.len() {
            return Err(err());
        }
        let dim: u16 = part.trim().parse().map_err(|_| err())?;
        if dim == 0 {
            return Err(err());
        }
        dims[count] = dim;
        count += 1;
    }
    Ok(dims)
}

/// Render a geometry in the canonical `XxYxZ` form.
pub fn geometry_string(geometry: &[u16; 3]) -> String {
    format!("{}x{}x{}", geometry[0], geometry[1], geometry[2])
}
