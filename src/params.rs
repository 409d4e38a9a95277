//! String-keyed index parameters.
//!
//! Indices are configured through a flat `key=value` map so that one
//! parameter surface serves programmatic callers, config files, and the
//! auto-tuner's output strings. Extraction is strict: every key must be
//! claimed by some component, and leftovers are reported as
//! [`IndexError::UnknownParameter`] instead of being silently ignored.

use std::str::FromStr;

use crate::error::{IndexError, Result};

/// An ordered set of `key=value` parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnyParams {
    entries: Vec<(String, String)>,
}

impl AnyParams {
    /// An empty parameter set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs.
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            entries: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Parse a comma-separated `key=value,key=value` list, the same format
    /// the tuner emits.
    pub fn parse(s: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part.split_once('=').ok_or_else(|| {
                IndexError::InvalidConfiguration(format!("expected key=value, got '{part}'"))
            })?;
            entries.push((key.trim().to_string(), value.trim().to_string()));
        }
        Ok(Self { entries })
    }

    /// Whether no parameters are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

/// Hands out typed parameter values and tracks which keys were consumed.
#[derive(Debug)]
pub struct ParamManager {
    entries: Vec<(String, String)>,
    claimed: Vec<bool>,
}

impl ParamManager {
    pub fn new(params: &AnyParams) -> Self {
        Self {
            entries: params.entries().to_vec(),
            claimed: vec![false; params.entries().len()],
        }
    }

    /// Whether `key` is present (claimed or not).
    pub fn has(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Typed value for `key` if present, marking it claimed.
    pub fn get_opt<T: FromStr>(&mut self, key: &str) -> Result<Option<T>> {
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if k == key {
                self.claimed[i] = true;
                let parsed = v.parse::<T>().map_err(|_| {
                    IndexError::InvalidConfiguration(format!(
                        "cannot parse value '{v}' for parameter {key}"
                    ))
                })?;
                return Ok(Some(parsed));
            }
        }
        Ok(None)
    }

    /// Typed value for `key`, or `default` when absent.
    pub fn get_or<T: FromStr>(&mut self, key: &str, default: T) -> Result<T> {
        Ok(self.get_opt(key)?.unwrap_or(default))
    }

    /// Typed value for `key`; missing keys are a configuration error.
    pub fn get_req<T: FromStr>(&mut self, key: &str) -> Result<T> {
        self.get_opt(key)?.ok_or_else(|| {
            IndexError::InvalidConfiguration(format!("required parameter {key} is missing"))
        })
    }

    /// Fail if any parameter was never claimed by a component.
    pub fn check_unclaimed(&self) -> Result<()> {
        for (i, (k, _)) in self.entries.iter().enumerate() {
            if !self.claimed[i] {
                return Err(IndexError::UnknownParameter(k.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_extract() {
        let params = AnyParams::parse("bucketSize=10,alphaLeft=2.5,chunkBucket=false").unwrap();
        let mut pm = ParamManager::new(&params);
        assert_eq!(pm.get_or::<usize>("bucketSize", 50).unwrap(), 10);
        assert_eq!(pm.get_or::<f64>("alphaLeft", 1.0).unwrap(), 2.5);
        assert!(!pm.get_or::<bool>("chunkBucket", true).unwrap());
        assert!(pm.check_unclaimed().is_ok());
    }

    #[test]
    fn unclaimed_keys_are_reported() {
        let params = AnyParams::new(&[("bucketSize", "10"), ("bogus", "1")]);
        let mut pm = ParamManager::new(&params);
        pm.get_or::<usize>("bucketSize", 50).unwrap();
        match pm.check_unclaimed() {
            Err(IndexError::UnknownParameter(k)) => assert_eq!(k, "bogus"),
            other => panic!("expected UnknownParameter, got {other:?}"),
        }
    }

    #[test]
    fn bad_value_is_a_configuration_error() {
        let params = AnyParams::new(&[("expLeft", "two")]);
        let mut pm = ParamManager::new(&params);
        assert!(matches!(
            pm.get_opt::<u32>("expLeft"),
            Err(IndexError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn required_keys_must_be_present() {
        let params = AnyParams::empty();
        let mut pm = ParamManager::new(&params);
        assert!(pm.get_req::<usize>("projDim").is_err());
    }

    #[test]
    fn malformed_pair_is_rejected() {
        assert!(AnyParams::parse("novalue").is_err());
    }
}
