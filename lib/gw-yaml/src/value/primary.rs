/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

pub fn as_bool(v: &Yaml) -> anyhow::Result<bool> {
    match v {
        Yaml::String(s) => match s.to_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Ok(true),
            "off" | "false" | "no" | "0" => Ok(false),
            _ => Err(anyhow!("invalid yaml string value for 'bool': {s}")),
        },
        Yaml::Boolean(value) => Ok(*value),
        Yaml::Integer(i) => Ok(*i != 0),
        _ => Err(anyhow!(
            "yaml value type for 'bool' should be 'boolean' / 'string' / 'integer'"
        )),
    }
}

pub fn as_string(v: &Yaml) -> anyhow::Result<String> {
    match v {
        Yaml::String(s) => Ok(s.to_string()),
        Yaml::Integer(i) => Ok(i.to_string()),
        Yaml::Real(s) => Ok(s.to_string()),
        _ => Err(anyhow!(
            "yaml value type for string should be 'string' / 'integer' / 'real'"
        )),
    }
}

/// A single value is accepted as a list of one element.
pub fn as_list<T, F>(v: &Yaml, convert: F) -> anyhow::Result<Vec<T>>
where
    F: Fn(&Yaml) -> anyhow::Result<T>,
{
    match v {
        Yaml::Array(seq) => {
            let mut vec = Vec::with_capacity(seq.len());
            for (i, v) in seq.iter().enumerate() {
                let node = convert(v).context(format!("invalid value for list element #{i}"))?;
                vec.push(node);
            }
            Ok(vec)
        }
        _ => {
            let node = convert(v).context("invalid single value for the list")?;
            Ok(vec![node])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yaml_rust::YamlLoader;

    #[test]
    fn bool_values() {
        assert!(as_bool(&yaml_str!("on")).unwrap());
        assert!(as_bool(&yaml_str!("Yes")).unwrap());
        assert!(!as_bool(&yaml_str!("off")).unwrap());
        assert!(as_bool(&Yaml::Boolean(true)).unwrap());
        assert!(!as_bool(&Yaml::Integer(0)).unwrap());

        assert!(as_bool(&yaml_str!("maybe")).is_err());
        assert!(as_bool(&Yaml::Null).is_err());
    }

    #[test]
    fn string_values() {
        assert_eq!(as_string(&yaml_str!("h2,http/1.1")).unwrap(), "h2,http/1.1");
        assert_eq!(as_string(&Yaml::Integer(443)).unwrap(), "443");
        assert!(as_string(&Yaml::Array(vec![])).is_err());
    }

    #[test]
    fn list_values() {
        let v = yaml_doc!("- a.example.com\n- b.example.com");
        assert_eq!(
            as_list(&v, as_string).unwrap(),
            vec!["a.example.com".to_string(), "b.example.com".to_string()]
        );

        let v = yaml_str!("a.example.com");
        assert_eq!(
            as_list(&v, as_string).unwrap(),
            vec!["a.example.com".to_string()]
        );

        let v = yaml_doc!("- a.example.com\n- [1, 2]");
        assert!(as_list(&v, as_string).is_err());
    }
}
