use std::collections::BTreeMap;

use k8s_openapi::{api::core::v1::ResourceRequirements, apimachinery::pkg::api::resource::Quantity};

use crate::crd::Resources;

pub const DEFAULT_REQUEST_CPU: &str = "50m";
pub const DEFAULT_REQUEST_MEMORY: &str = "64Mi";
pub const DEFAULT_LIMIT_CPU: &str = "500m";
pub const DEFAULT_LIMIT_MEMORY: &str = "512Mi";

/// Resolved cpu/memory requests and limits for one container.
///
/// Every unset or malformed field falls back to its built-in default, so a
/// spec that leaves all four fields empty gets the full default set.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceQuantity {
    pub request_cpu: Quantity,
    pub request_memory: Quantity,
    pub limit_cpu: Quantity,
    pub limit_memory: Quantity,
}

impl Default for ResourceQuantity {
    fn default() -> Self {
        Self {
            request_cpu: Quantity(DEFAULT_REQUEST_CPU.to_string()),
            request_memory: Quantity(DEFAULT_REQUEST_MEMORY.to_string()),
            limit_cpu: Quantity(DEFAULT_LIMIT_CPU.to_string()),
            limit_memory: Quantity(DEFAULT_LIMIT_MEMORY.to_string()),
        }
    }
}

impl ResourceQuantity {
    pub fn from_spec(res: &Resources) -> Self {
        let defaults = Self::default();
        Self {
            request_cpu: parse_or(&res.requests.cpu, defaults.request_cpu),
            request_memory: parse_or(&res.requests.memory, defaults.request_memory),
            limit_cpu: parse_or(&res.limits.cpu, defaults.limit_cpu),
            limit_memory: parse_or(&res.limits.memory, defaults.limit_memory),
        }
    }

    pub fn to_requirements(&self) -> ResourceRequirements {
        ResourceRequirements {
            requests: Some(BTreeMap::from([
                ("cpu".to_string(), self.request_cpu.clone()),
                ("memory".to_string(), self.request_memory.clone()),
            ])),
            limits: Some(BTreeMap::from([
                ("cpu".to_string(), self.limit_cpu.clone()),
                ("memory".to_string(), self.limit_memory.clone()),
            ])),
            ..ResourceRequirements::default()
        }
    }
}

/// Shorthand for `ResourceQuantity::from_spec(res).to_requirements()`
pub fn requirements(res: &Resources) -> ResourceRequirements {
    ResourceQuantity::from_spec(res).to_requirements()
}

fn parse_or(raw: &str, default: Quantity) -> Quantity {
    match parse_quantity(raw) {
        Some(q) => q,
        None => {
            if !raw.trim().is_empty() {
                tracing::debug!("ignoring malformed quantity {raw:?}, using {}", default.0);
            }
            default
        }
    }
}

/// Validate a Kubernetes quantity string (`<number><suffix>`).
///
/// Accepts an optionally signed decimal number followed by a binary SI
/// suffix (`Ki`..`Ei`), a decimal SI suffix (`n u m k M G T P E`) or a
/// decimal exponent (`e3`, `E-2`). Returns `None` for anything else,
/// including the empty string and surrounding whitespace.
pub fn parse_quantity(s: &str) -> Option<Quantity> {
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return None;
    }
    let valid_suffix = match &s[i..] {
        "" | "n" | "u" | "m" | "k" | "M" | "G" | "T" | "P" | "E" => true,
        "Ki" | "Mi" | "Gi" | "Ti" | "Pi" | "Ei" => true,
        exp => is_exponent(exp),
    };
    valid_suffix.then(|| Quantity(s.to_string()))
}

fn is_exponent(s: &str) -> bool {
    let Some(rest) = s.strip_prefix(['e', 'E']) else {
        return false;
    };
    let rest = rest.strip_prefix(['+', '-']).unwrap_or(rest);
    !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ResourceSpec;

    fn q(s: &str) -> Quantity {
        Quantity(s.to_string())
    }

    #[test]
    fn all_unset_uses_full_default_set() {
        let rq = ResourceQuantity::from_spec(&Resources::default());
        assert_eq!(rq.request_cpu, q("50m"));
        assert_eq!(rq.request_memory, q("64Mi"));
        assert_eq!(rq.limit_cpu, q("500m"));
        assert_eq!(rq.limit_memory, q("512Mi"));
    }

    #[test]
    fn single_override_keeps_other_defaults() {
        let res = Resources {
            requests: ResourceSpec {
                cpu: "100m".into(),
                memory: String::new(),
            },
            ..Resources::default()
        };
        let rq = ResourceQuantity::from_spec(&res);
        assert_eq!(rq.request_cpu, q("100m"));
        assert_eq!(rq.request_memory, q("64Mi"));
        assert_eq!(rq.limit_cpu, q("500m"));
        assert_eq!(rq.limit_memory, q("512Mi"));
    }

    #[test]
    fn malformed_value_falls_back_to_default() {
        let res = Resources {
            limits: ResourceSpec {
                cpu: "lots".into(),
                memory: "1Gi".into(),
            },
            ..Resources::default()
        };
        let rq = ResourceQuantity::from_spec(&res);
        assert_eq!(rq.limit_cpu, q("500m"));
        assert_eq!(rq.limit_memory, q("1Gi"));
    }

    #[test]
    fn padded_value_falls_back_to_default() {
        let res = Resources {
            requests: ResourceSpec {
                cpu: " 250m ".into(),
                memory: String::new(),
            },
            ..Resources::default()
        };
        assert_eq!(ResourceQuantity::from_spec(&res).request_cpu, q("50m"));
    }

    #[test]
    fn requirements_carry_both_maps() {
        let req = requirements(&Resources::default());
        let requests = req.requests.unwrap();
        let limits = req.limits.unwrap();
        assert_eq!(requests.get("cpu"), Some(&q("50m")));
        assert_eq!(limits.get("memory"), Some(&q("512Mi")));
    }

    #[test]
    fn quantity_grammar() {
        for ok in ["1", "0.5", ".5", "100m", "64Mi", "2Gi", "1e3", "1E-2", "+3k"] {
            assert!(parse_quantity(ok).is_some(), "{ok} should parse");
        }
        for bad in ["", "m", "Mi", "1.2.3", "12MB", "1e", "abc", "5 Mi", " 250m ", "250m\n"] {
            assert!(parse_quantity(bad).is_none(), "{bad:?} should not parse");
        }
        assert_eq!(parse_quantity("250m"), Some(q("250m")));
    }
}
