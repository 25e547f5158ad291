use serde::Serialize;

use crate::error::{AppError, Result};

/// CPU limit applied to the transcode pod when `LIMIT_CPU` is unset.
pub const DEFAULT_LIMIT_CPU: &str = "100m";

/// Numeric identity the remote container runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunAsIdentity {
    pub uid: i64,
    pub gid: i64,
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogFormat {
    Compact,
    Json,
    Pretty,
}

impl LogFormat {
    /// Resolve the format on its own so logging can start before the rest of
    /// the configuration is validated. Invalid values fall back to compact;
    /// `TranscoderConfig::from_lookup` still rejects them.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::parse(&lookup("LOG_FORMAT").unwrap_or_default()).unwrap_or(LogFormat::Compact)
    }

    fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "" | "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(AppError::ConfigError(format!(
                "LOG_FORMAT must be one of compact, json, pretty (got {:?})",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscoderConfig {
    pub data_pvc: String,
    pub config_pvc: String,
    pub transcode_pvc: String,
    pub namespace: String,

    /// Image containing the transcoder. Should match the image of the media
    /// server that spawned us.
    pub image: String,
    pub internal_address: String,

    pub limit_cpu: String,
    pub identity: RunAsIdentity,

    pub log_format: LogFormat,
}

impl TranscoderConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::ConfigError(format!("{} must be set", key)))
        };

        let data_pvc = required("DATA_PVC")?;
        let config_pvc = required("CONFIG_PVC")?;
        let transcode_pvc = required("TRANSCODE_PVC")?;
        let namespace = required("KUBE_NAMESPACE")?;
        let image = required("PMS_IMAGE")?;
        let internal_address = required("PMS_INTERNAL_ADDRESS")?;

        let limit_cpu = lookup("LIMIT_CPU")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LIMIT_CPU.to_owned());
        validate_quantity(&limit_cpu)
            .map_err(|reason| AppError::ConfigError(format!("LIMIT_CPU {}", reason)))?;

        let uid = parse_id("PLEX_UID", &required("PLEX_UID")?)?;
        let gid = parse_id("PLEX_GID", &required("PLEX_GID")?)?;

        let log_format = LogFormat::parse(&lookup("LOG_FORMAT").unwrap_or_default())?;

        Ok(TranscoderConfig {
            data_pvc,
            config_pvc,
            transcode_pvc,
            namespace,
            image,
            internal_address,
            limit_cpu,
            identity: RunAsIdentity { uid, gid },
            log_format,
        })
    }
}

fn parse_id(key: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|e| AppError::ConfigError(format!("{} must be a number: {}", key, e)))
}

/// Checks the Kubernetes quantity grammar: a signed decimal number followed
/// by an optional binary-SI, decimal-SI or decimal-exponent suffix.
fn validate_quantity(value: &str) -> std::result::Result<(), String> {
    let digits_end = value
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '+' || *c == '-'))))
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    let (number, suffix) = value.split_at(digits_end);

    let unsigned = number.trim_start_matches(['+', '-']);
    if unsigned.is_empty() || unsigned == "." || unsigned.matches('.').count() > 1 {
        return Err(format!("{:?} is not a valid quantity", value));
    }

    let valid_suffix = match suffix {
        "" | "n" | "u" | "m" | "k" | "M" | "G" | "T" | "P" | "E" => true,
        "Ki" | "Mi" | "Gi" | "Ti" | "Pi" | "Ei" => true,
        s if s.starts_with(['e', 'E']) => {
            let exp = s[1..].trim_start_matches(['+', '-']);
            !exp.is_empty() && exp.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    };
    if !valid_suffix {
        return Err(format!("{:?} has an unknown suffix {:?}", value, suffix));
    }
    Ok(())
}
