//! Builds the transcode pod from a rewritten invocation.

use k8s_openapi::api::core::v1::{
    Container, EnvVar, PersistentVolumeClaimVolumeSource, Pod, PodSecurityContext, PodSpec,
    ResourceRequirements, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

use crate::config::{TranscoderConfig, DEFAULT_LIMIT_CPU};
use crate::domain::invocation::Invocation;
use crate::domain::job::{EnvPair, JobSpec, JobVolumes};
use crate::error::{AppError, Result};

pub const JOB_NAME_PREFIX: &str = "pms-elastic-transcoder-";
pub const CONTAINER_NAME: &str = "plex";
pub const NODE_ARCH: &str = "amd64";

const DATA_VOLUME: &str = "data";
const CONFIG_VOLUME: &str = "config";
const TRANSCODE_VOLUME: &str = "transcode";

pub struct JobSpecBuilder<'a> {
    config: &'a TranscoderConfig,
}

impl<'a> JobSpecBuilder<'a> {
    pub fn new(config: &'a TranscoderConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, invocation: &Invocation) -> Result<JobSpec> {
        let limit_cpu = if self.config.limit_cpu.is_empty() {
            DEFAULT_LIMIT_CPU.to_string()
        } else {
            self.config.limit_cpu.clone()
        };

        Ok(JobSpec {
            generate_name: JOB_NAME_PREFIX.to_string(),
            namespace: self.config.namespace.clone(),
            image: self.config.image.clone(),
            command: invocation.args.clone(),
            working_dir: invocation.cwd.clone(),
            env: to_env_pairs(&invocation.env)?,
            run_as_user: invocation.uid,
            run_as_group: invocation.gid,
            limit_cpu,
            node_arch: NODE_ARCH.to_string(),
            volumes: JobVolumes {
                data_claim: self.config.data_pvc.clone(),
                config_claim: self.config.config_pvc.clone(),
                transcode_claim: self.config.transcode_pvc.clone(),
            },
        })
    }
}

/// Split each `KEY=VALUE` entry on the first `=`.
pub fn to_env_pairs(env: &[String]) -> Result<Vec<EnvPair>> {
    env.iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(name, value)| EnvPair {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .ok_or_else(|| {
                    AppError::ContractViolation(format!(
                        "environment entry {:?} has no '=' separator",
                        entry
                    ))
                })
        })
        .collect()
}

impl JobSpec {
    /// Materialize the spec as a pod. Restart policy is `Never` and only a
    /// CPU limit is set; memory is left unbounded.
    pub fn to_pod(&self) -> Pod {
        let env_vars = self
            .env
            .iter()
            .map(|pair| EnvVar {
                name: pair.name.clone(),
                value: Some(pair.value.clone()),
                value_from: None,
            })
            .collect();

        let mut limits = BTreeMap::new();
        limits.insert("cpu".to_string(), Quantity(self.limit_cpu.clone()));

        let container = Container {
            name: CONTAINER_NAME.to_string(),
            image: Some(self.image.clone()),
            command: Some(self.command.clone()),
            env: Some(env_vars),
            working_dir: Some(self.working_dir.clone()),
            resources: Some(ResourceRequirements {
                limits: Some(limits),
                ..Default::default()
            }),
            volume_mounts: Some(vec![
                mount(DATA_VOLUME, "/data", false),
                mount(CONFIG_VOLUME, "/config", true),
                mount(TRANSCODE_VOLUME, "/transcode", false),
                // Same volume again so scratch files land on shared storage.
                mount(TRANSCODE_VOLUME, "/tmp", false),
            ]),
            ..Default::default()
        };

        Pod {
            metadata: ObjectMeta {
                generate_name: Some(self.generate_name.clone()),
                namespace: Some(self.namespace.clone()),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![container],
                restart_policy: Some("Never".to_string()),
                node_selector: Some(BTreeMap::from([(
                    "kubernetes.io/arch".to_string(),
                    self.node_arch.clone(),
                )])),
                security_context: Some(PodSecurityContext {
                    run_as_user: Some(self.run_as_user),
                    run_as_group: Some(self.run_as_group),
                    ..Default::default()
                }),
                volumes: Some(vec![
                    claim_volume(DATA_VOLUME, &self.volumes.data_claim),
                    claim_volume(CONFIG_VOLUME, &self.volumes.config_claim),
                    claim_volume(TRANSCODE_VOLUME, &self.volumes.transcode_claim),
                ]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn mount(volume: &str, path: &str, read_only: bool) -> VolumeMount {
    VolumeMount {
        name: volume.to_string(),
        mount_path: path.to_string(),
        read_only: read_only.then_some(true),
        ..Default::default()
    }
}

fn claim_volume(volume: &str, claim: &str) -> Volume {
    Volume {
        name: volume.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: claim.to_string(),
            read_only: None,
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogFormat, RunAsIdentity};
    use proptest::prelude::*;

    fn test_config() -> TranscoderConfig {
        TranscoderConfig {
            data_pvc: "plex-data".to_string(),
            config_pvc: "plex-config".to_string(),
            transcode_pvc: "plex-transcode".to_string(),
            namespace: "media".to_string(),
            image: "plexinc/pms-docker:1.40.0".to_string(),
            internal_address: "http://plex.media.svc:32400".to_string(),
            limit_cpu: String::new(),
            identity: RunAsIdentity { uid: 1000, gid: 1001 },
            log_format: LogFormat::Compact,
        }
    }

    fn test_invocation() -> Invocation {
        Invocation {
            cwd: "/transcode/Sessions/abc".to_string(),
            uid: 1000,
            gid: 1001,
            env: vec![
                "PATH=/usr/bin".to_string(),
                "X_PLEX_TOKEN=a=b=c".to_string(),
                "EMPTY=".to_string(),
            ],
            args: vec!["Plex Transcoder".to_string(), "-i".to_string(), "in.mkv".to_string()],
        }
    }

    #[test]
    fn test_build_uses_invocation_and_config() {
        let config = test_config();
        let spec = JobSpecBuilder::new(&config).build(&test_invocation()).unwrap();

        assert_eq!(spec.generate_name, "pms-elastic-transcoder-");
        assert_eq!(spec.namespace, "media");
        assert_eq!(spec.command, vec!["Plex Transcoder", "-i", "in.mkv"]);
        assert_eq!(spec.working_dir, "/transcode/Sessions/abc");
        assert_eq!(spec.run_as_user, 1000);
        assert_eq!(spec.run_as_group, 1001);
        assert_eq!(spec.volumes.transcode_claim, "plex-transcode");
    }

    #[test]
    fn test_build_defaults_cpu_limit() {
        let config = test_config();
        let spec = JobSpecBuilder::new(&config).build(&test_invocation()).unwrap();
        assert_eq!(spec.limit_cpu, "100m");
    }

    #[test]
    fn test_build_keeps_explicit_cpu_limit() {
        let mut config = test_config();
        config.limit_cpu = "4".to_string();
        let spec = JobSpecBuilder::new(&config).build(&test_invocation()).unwrap();
        assert_eq!(spec.limit_cpu, "4");
    }

    #[test]
    fn test_env_split_on_first_equals() {
        let pairs = to_env_pairs(&test_invocation().env).unwrap();
        assert_eq!(pairs[1].name, "X_PLEX_TOKEN");
        assert_eq!(pairs[1].value, "a=b=c");
        assert_eq!(pairs[2].name, "EMPTY");
        assert_eq!(pairs[2].value, "");
    }

    #[test]
    fn test_malformed_env_entry_rejected() {
        let config = test_config();
        let mut invocation = test_invocation();
        invocation.env.push("NO_SEPARATOR".to_string());

        let err = JobSpecBuilder::new(&config).build(&invocation).unwrap_err();
        assert!(matches!(err, AppError::ContractViolation(_)));
        assert!(err.to_string().contains("NO_SEPARATOR"));
    }

    #[test]
    fn test_pod_policies() {
        let config = test_config();
        let pod = JobSpecBuilder::new(&config)
            .build(&test_invocation())
            .unwrap()
            .to_pod();

        assert_eq!(pod.metadata.generate_name.as_deref(), Some(JOB_NAME_PREFIX));
        assert_eq!(pod.metadata.name, None);

        let spec = pod.spec.unwrap();
        assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
        assert_eq!(
            spec.node_selector.unwrap().get("kubernetes.io/arch").map(String::as_str),
            Some("amd64")
        );

        let security = spec.security_context.unwrap();
        assert_eq!(security.run_as_user, Some(1000));
        assert_eq!(security.run_as_group, Some(1001));

        let container = &spec.containers[0];
        assert_eq!(container.name, "plex");
        assert_eq!(container.working_dir.as_deref(), Some("/transcode/Sessions/abc"));

        let resources = container.resources.as_ref().unwrap();
        let limits = resources.limits.as_ref().unwrap();
        assert_eq!(limits.get("cpu"), Some(&Quantity("100m".to_string())));
        assert!(!limits.contains_key("memory"));
        assert!(resources.requests.is_none());

        let env = container.env.as_ref().unwrap();
        assert_eq!(env.len(), 3);
        assert_eq!(env[0].name, "PATH");
        assert_eq!(env[0].value.as_deref(), Some("/usr/bin"));
    }

    #[test]
    fn test_pod_volume_layout() {
        let config = test_config();
        let pod = JobSpecBuilder::new(&config)
            .build(&test_invocation())
            .unwrap()
            .to_pod();
        let spec = pod.spec.unwrap();

        let mounts: Vec<(String, String, bool)> = spec.containers[0]
            .volume_mounts
            .as_ref()
            .unwrap()
            .iter()
            .map(|m| (m.name.clone(), m.mount_path.clone(), m.read_only.unwrap_or(false)))
            .collect();
        assert_eq!(
            mounts,
            vec![
                ("data".to_string(), "/data".to_string(), false),
                ("config".to_string(), "/config".to_string(), true),
                ("transcode".to_string(), "/transcode".to_string(), false),
                ("transcode".to_string(), "/tmp".to_string(), false),
            ]
        );

        let claims: Vec<(String, String)> = spec
            .volumes
            .unwrap()
            .into_iter()
            .map(|v| (v.name, v.persistent_volume_claim.unwrap().claim_name))
            .collect();
        assert_eq!(
            claims,
            vec![
                ("data".to_string(), "plex-data".to_string()),
                ("config".to_string(), "plex-config".to_string()),
                ("transcode".to_string(), "plex-transcode".to_string()),
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_env_translation_matches_first_split(
            entries in prop::collection::vec(("[A-Z_]{1,12}", "[a-z0-9=/:]{0,16}"), 0..8)
        ) {
            let env: Vec<String> = entries.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            let pairs = to_env_pairs(&env).unwrap();

            let expected: std::collections::HashSet<(String, String)> = env
                .iter()
                .map(|e| {
                    let (k, v) = e.split_once('=').unwrap();
                    (k.to_string(), v.to_string())
                })
                .collect();
            let actual: std::collections::HashSet<(String, String)> =
                pairs.into_iter().map(|p| (p.name, p.value)).collect();

            prop_assert_eq!(actual, expected);
        }
    }
}
