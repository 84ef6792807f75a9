//! Identifier-to-path derivation.
//!
//! Every identifier maps to a fixed-length vector of child indices in
//! \[0, fanout). Sparse trees take hexadecimal identifiers (re-hashed until
//! their radix-F digit count matches the fanout's fixed path length); dense
//! trees take decimal identifiers reduced into a bounded space.

use crate::error::SolvencyError;
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

/// Tree addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeType {
    /// Hexadecimal identifiers over the full hash space.
    Sparse,
    /// Decimal identifiers reduced modulo `space`.
    Dense { space: u64 },
}

/// Fixed sparse path length per supported fanout.
fn expected_hex_path_len(fanout: u16) -> Option<usize> {
    Some(match fanout {
        3 => 162,
        7 => 91,
        15 => 66,
        31 => 52,
        63 => 43,
        127 => 37,
        255 => 32,
        511 => 29,
        1023 => 26,
        2047 => 24,
        4095 => 22,
        8191 => 20,
        16383 => 19,
        _ => return None,
    })
}

/// Smallest L with fanout^L > space.
pub fn digit_path_len(fanout: u16, space: u64) -> usize {
    let fanout = BigUint::from(fanout);
    let space = BigUint::from(space);
    let mut len = 1usize;
    let mut bound = fanout.clone();
    while bound <= space {
        bound *= &fanout;
        len += 1;
    }
    len
}

/// Little-endian radix-`fanout` digits of `n`.
fn radix_digits(mut n: BigUint, fanout: u16) -> Vec<u16> {
    let fanout = BigUint::from(fanout);
    let mut digits = Vec::new();
    while n.bits() != 0 {
        let digit = &n % &fanout;
        digits.push(digit.iter_u64_digits().next().unwrap_or(0) as u16);
        n /= &fanout;
    }
    digits
}

fn hex_digest(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Maps identifiers to fixed-length paths for one tree instance.
#[derive(Debug, Clone)]
pub struct PathMapper {
    fanout: u16,
    depth: usize,
    tree_type: TreeType,
}

impl PathMapper {
    pub fn new(fanout: u16, tree_type: TreeType) -> Result<Self, SolvencyError> {
        if fanout == 0 || !(fanout + 1).is_power_of_two() {
            return Err(SolvencyError::MalformedInput(format!(
                "fanout {fanout}+1 is not a power of two"
            )));
        }
        let depth = match tree_type {
            TreeType::Sparse => expected_hex_path_len(fanout).ok_or_else(|| {
                SolvencyError::MalformedInput(format!("a fanout of {fanout} is not supported"))
            })?,
            TreeType::Dense { space } => digit_path_len(fanout, space),
        };
        Ok(Self {
            fanout,
            depth,
            tree_type,
        })
    }

    /// The fixed path length of this tree.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn fanout(&self) -> u16 {
        self.fanout
    }

    /// Resolves an identifier to its path of child indices.
    pub fn id_to_path(&self, id: &str) -> Result<Vec<u16>, SolvencyError> {
        match self.tree_type {
            TreeType::Sparse => self.hex_path(id),
            TreeType::Dense { space } => self.decimal_path(id, space),
        }
    }

    fn hex_path(&self, id: &str) -> Result<Vec<u16>, SolvencyError> {
        let mut s = id.to_string();
        loop {
            let n = BigUint::parse_bytes(s.as_bytes(), 16).ok_or_else(|| {
                SolvencyError::MalformedInput(format!(
                    "failed parsing {s} as a hexadecimal number"
                ))
            })?;
            let path = radix_digits(n, self.fanout);
            if path.len() == self.depth {
                return Ok(path);
            }
            s = hex_digest(&s);
        }
    }

    fn decimal_path(&self, id: &str, space: u64) -> Result<Vec<u16>, SolvencyError> {
        let n = BigUint::parse_bytes(id.as_bytes(), 10).ok_or_else(|| {
            SolvencyError::MalformedInput(format!("{id} is not a decimal string"))
        })?;
        let mut path = radix_digits(n % BigUint::from(space), self.fanout);
        assert!(
            path.len() <= self.depth,
            "path of length {} exceeds the configured depth {}",
            path.len(),
            self.depth
        );
        path.resize(self.depth, 0);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_paths_are_fixed_length_digits() {
        let mapper = PathMapper::new(7, TreeType::Dense { space: 1_000_000_000 }).unwrap();
        assert_eq!(mapper.depth(), digit_path_len(7, 1_000_000_000));

        let path = mapper.id_to_path("987654321").unwrap();
        assert_eq!(path.len(), mapper.depth());
        assert!(path.iter().all(|d| *d < 7));

        // Little-endian digits reconstruct the identifier.
        let mut n = 0u64;
        for d in path.iter().rev() {
            n = n * 7 + *d as u64;
        }
        assert_eq!(n, 987_654_321 % 1_000_000_000);
    }

    #[test]
    fn sparse_paths_have_the_expected_length() {
        let mapper = PathMapper::new(7, TreeType::Sparse).unwrap();
        let path = mapper.id_to_path(&hex_digest("some account")).unwrap();
        assert_eq!(path.len(), 91);
        assert!(path.iter().all(|d| *d < 7));
    }

    #[test]
    fn sparse_mapping_is_deterministic() {
        let mapper = PathMapper::new(7, TreeType::Sparse).unwrap();
        let id = hex_digest("account 1");
        assert_eq!(mapper.id_to_path(&id).unwrap(), mapper.id_to_path(&id).unwrap());
    }

    #[test]
    fn rejects_unsupported_fanout() {
        assert!(PathMapper::new(8, TreeType::Sparse).is_err());
        assert!(PathMapper::new(5, TreeType::Dense { space: 100 }).is_err());
        assert!(PathMapper::new(0, TreeType::Dense { space: 100 }).is_err());
        // The lookup-table floor binds sparse trees only.
        assert!(PathMapper::new(3, TreeType::Dense { space: 100 }).is_ok());
    }

    #[test]
    fn digit_path_len_bounds_the_space() {
        assert_eq!(digit_path_len(7, 1000), 4); // 7^4 = 2401 > 1000
        assert_eq!(digit_path_len(7, 7), 2);
        assert_eq!(digit_path_len(3, 2), 1);
    }
}
