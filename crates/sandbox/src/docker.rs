// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker CLI driver for the sandbox runtime.
//!
//! Every operation shells out to the `docker` binary via
//! `tokio::process::Command`; the daemon never links a container runtime.
//! Container and network names are deterministic so recovery can rediscover
//! resources by name and label alone.

use crate::inject;
use crate::subnet::SubnetPool;
use crate::{
    labels, match_id_from_network_name, network_name, LabeledContainer, LabeledNetwork,
    NetworkRef, SandboxError, SandboxRuntime,
};
use arena_core::{
    short, Container, ContainerId, MatchId, NetworkId, ServiceId, ServiceTemplate, TeamId,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sandbox driver backed by the Docker CLI.
#[derive(Clone, Default)]
pub struct DockerRuntime {
    pool: Arc<SubnetPool>,
}

impl DockerRuntime {
    pub fn new() -> Self {
        Self { pool: Arc::new(SubnetPool::new()) }
    }

    pub fn subnet_pool(&self) -> &SubnetPool {
        &self.pool
    }

    /// Make sure the image exists locally, pulling it when absent.
    async fn ensure_image(&self, image: &str) -> Result<(), SandboxError> {
        if run_docker(&["image", "inspect", image]).await.is_ok() {
            return Ok(());
        }
        info!(%image, "pulling image");
        run_docker(&["pull", image]).await.map(|_| ()).map_err(SandboxError::Image)
    }

    /// Create, start, and inspect one service container.
    async fn start_service(
        &self,
        match_id: &MatchId,
        team_id: &TeamId,
        network: &NetworkRef,
        template: &ServiceTemplate,
    ) -> Result<Container, SandboxError> {
        self.ensure_image(&template.docker_image).await?;

        let name = container_name(match_id, team_id, template);
        let args = container_run_args(&name, &network.name, match_id, team_id, template);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let container_id =
            ContainerId::new(run_docker(&arg_refs).await.map_err(SandboxError::Container)?);

        let address = match run_docker(&[
            "inspect",
            "-f",
            "{{range .NetworkSettings.Networks}}{{.IPAddress}}{{end}}",
            container_id.as_str(),
        ])
        .await
        {
            Ok(addr) => addr,
            Err(e) => {
                // The container started but we cannot address it; take it back down.
                let _ = self.stop_and_remove(&container_id).await;
                return Err(SandboxError::Container(e));
            }
        };

        debug!(
            match_id = %match_id,
            container = %name,
            %address,
            port = template.port,
            "service container started"
        );

        Ok(Container {
            container_id,
            address,
            port: template.port,
            kind: template.kind,
            template_id: template.template_id.clone(),
            team_id: team_id.clone(),
            service_id: ServiceId::compose(team_id, &template.template_id),
            flag_path: template.flag_path.clone(),
            health_check: template.health_check.clone(),
        })
    }
}

#[async_trait]
impl SandboxRuntime for DockerRuntime {
    async fn create_network(&self, match_id: &MatchId) -> Result<NetworkRef, SandboxError> {
        let name = network_name(match_id);

        // Duplicate-name creation returns the existing network without
        // allocating a fresh octet.
        if let Ok(existing) = run_docker(&[
            "network",
            "inspect",
            "-f",
            "{{.Id}}|{{(index .IPAM.Config 0).Subnet}}",
            &name,
        ])
        .await
        {
            if let Some((id, subnet)) = existing.split_once('|') {
                self.pool.adopt(&name, subnet);
                return Ok(NetworkRef {
                    id: NetworkId::new(id),
                    name,
                    subnet: subnet.to_string(),
                });
            }
        }

        let subnet = self.pool.allocate(&name)?;
        let label = format!("{}={}", labels::MATCH_ID, match_id);
        match run_docker(&[
            "network", "create", "--driver", "bridge", "--subnet", &subnet.cidr, "--label",
            &label, &name,
        ])
        .await
        {
            Ok(id) => {
                info!(match_id = %match_id, network = %name, subnet = %subnet.cidr, "network created");
                Ok(NetworkRef { id: NetworkId::new(id), name, subnet: subnet.cidr })
            }
            Err(e) => {
                self.pool.release(&name);
                Err(SandboxError::Network(e))
            }
        }
    }

    async fn provision_team(
        &self,
        match_id: &MatchId,
        team_id: &TeamId,
        network: &NetworkRef,
        templates: &[ServiceTemplate],
    ) -> Result<Vec<Container>, SandboxError> {
        let mut created: Vec<Container> = Vec::with_capacity(templates.len());
        for template in templates {
            match self.start_service(match_id, team_id, network, template).await {
                Ok(container) => created.push(container),
                Err(e) => {
                    warn!(
                        match_id = %match_id,
                        team_id = %team_id,
                        template_id = %template.template_id,
                        error = %e,
                        "service start failed, rolling back team containers"
                    );
                    for container in created.iter().rev() {
                        let _ = self.stop_and_remove(&container.container_id).await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(created)
    }

    async fn inject_flag(
        &self,
        container_id: &ContainerId,
        path: &str,
        value: &str,
    ) -> Result<(), SandboxError> {
        let cmd = inject::write_command(path, value)?;
        run_docker(&["exec", container_id.as_str(), "/bin/sh", "-c", &cmd])
            .await
            .map(|_| ())
            .map_err(SandboxError::Inject)
    }

    async fn stop_and_remove(&self, container_id: &ContainerId) -> Result<(), SandboxError> {
        if let Err(e) = run_docker(&["stop", "-t", "10", container_id.as_str()]).await {
            debug!(container_id = %container_id, error = %e, "stop failed (already stopped?)");
        }
        if let Err(e) = run_docker(&["rm", "-f", container_id.as_str()]).await {
            debug!(container_id = %container_id, error = %e, "remove failed (already gone?)");
        }
        Ok(())
    }

    async fn remove_network(&self, match_id: &MatchId) -> Result<(), SandboxError> {
        let name = network_name(match_id);
        if run_docker(&["network", "inspect", "-f", "{{.Id}}", &name]).await.is_err() {
            self.pool.release(&name);
            return Ok(());
        }
        let removed = run_docker(&["network", "rm", &name]).await;
        self.pool.release(&name);
        match removed {
            Ok(_) => {
                info!(match_id = %match_id, network = %name, "network removed");
                Ok(())
            }
            Err(e) => Err(SandboxError::Network(e)),
        }
    }

    async fn list_match_containers(&self) -> Result<Vec<LabeledContainer>, SandboxError> {
        let filter = format!("label={}", labels::MATCH_ID);
        let out = run_docker(&[
            "ps",
            "-a",
            "--filter",
            &filter,
            "--format",
            "{{.ID}}\t{{.Names}}\t{{.Label \"match.id\"}}",
        ])
        .await
        .map_err(SandboxError::Unavailable)?;

        let mut containers = Vec::new();
        for line in out.lines() {
            let mut parts = line.split('\t');
            let (Some(id), Some(name), Some(match_id)) =
                (parts.next(), parts.next(), parts.next())
            else {
                continue;
            };
            if match_id.is_empty() {
                continue;
            }
            let created_at_ms = container_created_ms(id).await;
            containers.push(LabeledContainer {
                id: ContainerId::new(id),
                name: name.to_string(),
                match_id: MatchId::new(match_id),
                created_at_ms,
            });
        }
        Ok(containers)
    }

    async fn list_match_networks(&self) -> Result<Vec<LabeledNetwork>, SandboxError> {
        let label_filter = format!("label={}", labels::MATCH_ID);
        let by_label =
            run_docker(&["network", "ls", "--filter", &label_filter, "--format", "{{.ID}}\t{{.Name}}"])
                .await
                .map_err(SandboxError::Unavailable)?;
        let by_name =
            run_docker(&["network", "ls", "--filter", "name=match_", "--format", "{{.ID}}\t{{.Name}}"])
                .await
                .map_err(SandboxError::Unavailable)?;

        let mut seen = std::collections::HashSet::new();
        let mut networks = Vec::new();
        for line in by_label.lines().chain(by_name.lines()) {
            let Some((id, name)) = line.split_once('\t') else { continue };
            if !seen.insert(id.to_string()) {
                continue;
            }
            let Some(match_id) = match_id_from_network_name(name) else { continue };
            let attached_containers = run_docker(&["network", "inspect", "-f", "{{len .Containers}}", id])
                .await
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            networks.push(LabeledNetwork {
                id: NetworkId::new(id),
                name: name.to_string(),
                match_id,
                attached_containers,
            });
        }
        Ok(networks)
    }
}

/// Deterministic container name for one team's instance of a template.
pub(crate) fn container_name(
    match_id: &MatchId,
    team_id: &TeamId,
    template: &ServiceTemplate,
) -> String {
    format!(
        "match-{}-{}-{}-{}",
        match_id,
        team_id,
        template.kind,
        short(template.template_id.as_str(), 8)
    )
}

/// `docker run` arguments carrying the resource and security policy.
pub(crate) fn container_run_args(
    name: &str,
    network_name: &str,
    match_id: &MatchId,
    team_id: &TeamId,
    template: &ServiceTemplate,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "run",
        "-d",
        "--name",
        name,
        "--network",
        network_name,
        "--memory",
        "512m",
        "--memory-swap",
        "512m",
        "--memory-reservation",
        "256m",
        "--cpu-period",
        "100000",
        "--cpu-quota",
        "50000",
        "--pids-limit",
        "100",
        "--cap-drop",
        "ALL",
        "--security-opt",
        "no-new-privileges",
        "--restart",
        "on-failure:3",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    let kind = template.kind.to_string();
    for (key, value) in [
        (labels::MATCH_ID, match_id.as_str()),
        (labels::TEAM_ID, team_id.as_str()),
        (labels::SERVICE_TYPE, kind.as_str()),
        (labels::TEMPLATE_ID, template.template_id.as_str()),
    ] {
        args.push("--label".to_string());
        args.push(format!("{key}={value}"));
    }

    // Sorted so the command line is stable for a given template.
    let mut env: Vec<_> = template.environment_vars.iter().collect();
    env.sort_by_key(|(k, _)| k.as_str());
    for (key, value) in env {
        args.push("-e".to_string());
        args.push(format!("{key}={value}"));
    }

    args.push(template.docker_image.clone());
    args
}

/// Container creation time in epoch milliseconds, when inspectable.
async fn container_created_ms(container_id: &str) -> Option<u64> {
    let created = run_docker(&["inspect", "-f", "{{.Created}}", container_id]).await.ok()?;
    chrono::DateTime::parse_from_rfc3339(&created).ok().map(|dt| dt.timestamp_millis() as u64)
}

/// Run a docker CLI command and return stdout on success.
async fn run_docker(args: &[&str]) -> Result<String, String> {
    let output = tokio::process::Command::new("docker")
        .args(args)
        .output()
        .await
        .map_err(|e| format!("failed to exec docker: {}", e))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!("docker {} failed: {}", args.first().unwrap_or(&""), stderr.trim()))
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
