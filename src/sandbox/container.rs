//! Docker container-based execution
//!
//! Runs Python batch snippets in an ephemeral, resource-capped container with
//! networking disabled. The code travels as a literal `-c` argument; nothing
//! is mounted into the container.

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, KillContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::Docker;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{parse_memory_limit, SandboxConfig};
use crate::error::{Error, Result};
use crate::sandbox::executor::{BatchRunner, ExecutionResult, Language};
use crate::session::Utf8Decoder;

/// Docker container runner
pub struct ContainerRunner {
    /// Docker client
    docker: Docker,
    /// Sandbox policy and image
    config: SandboxConfig,
}

impl ContainerRunner {
    /// Connect to the local Docker daemon and verify it responds
    pub async fn connect(config: &SandboxConfig) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::Container(format!("Failed to connect to Docker: {}", e)))?;

        docker
            .ping()
            .await
            .map_err(|e| Error::Container(format!("Docker ping failed: {}", e)))?;

        info!("Container runner connected to Docker");

        let runner = ContainerRunner {
            docker,
            config: config.clone(),
        };

        if config.pull_image {
            runner.ensure_image().await?;
        }

        Ok(runner)
    }

    /// Pull the sandbox image if the host does not have it
    async fn ensure_image(&self) -> Result<()> {
        if self.docker.inspect_image(&self.config.image).await.is_ok() {
            return Ok(());
        }

        info!("Pulling Docker image: {}", self.config.image);

        let options = CreateImageOptions {
            from_image: self.config.image.clone(),
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(status) = info.status {
                        debug!("Pull status: {}", status);
                    }
                }
                Err(e) => {
                    return Err(Error::Container(format!("Failed to pull image: {}", e)));
                }
            }
        }

        info!("Image pulled successfully");
        Ok(())
    }

    /// Unique container name: configured prefix plus a random suffix
    fn container_name(&self) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}", self.config.name_prefix, &suffix[..8])
    }

    /// Container creation parameters for one run
    fn container_config(&self, code: &str) -> Config<String> {
        let cmd = vec![
            "python".to_string(),
            "-u".to_string(),
            "-c".to_string(),
            code.to_string(),
        ];

        Config {
            image: Some(self.config.image.clone()),
            cmd: Some(cmd),
            attach_stdin: Some(false),
            open_stdin: Some(false),
            tty: Some(false),
            network_disabled: Some(self.config.network == "none"),
            host_config: Some(bollard::service::HostConfig {
                memory: parse_memory_limit(&self.config.memory_limit),
                cpu_quota: Some(self.config.cpu_quota),
                cpu_period: Some(self.config.cpu_period),
                network_mode: Some(self.config.network.clone()),
                auto_remove: Some(false), // Removed manually after reading logs
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Create, start and await one container; removal is the caller's job
    async fn execute_in(&self, name: &str, code: &str, timeout: Duration) -> Result<ExecutionResult> {
        let create_options = CreateContainerOptions {
            name,
            platform: None,
        };

        self.docker
            .create_container(Some(create_options), self.container_config(code))
            .await?;

        debug!("Created container: {}", name);

        self.docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await?;

        match tokio::time::timeout(timeout, self.wait_for_container(name)).await {
            Ok(exit_code) => {
                let exit_code = exit_code?;
                let (output, stderr) = self.get_container_logs(name).await?;
                let error = if exit_code != 0 { Some(stderr) } else { None };
                Ok(ExecutionResult::completed(exit_code, output, error))
            }
            Err(_) => {
                warn!("Container {} timed out after {:?}", name, timeout);
                let options = KillContainerOptions { signal: "SIGKILL" };
                if let Err(e) = self.docker.kill_container(name, Some(options)).await {
                    debug!("Kill of {} failed: {}", name, e);
                }
                Ok(ExecutionResult::timeout())
            }
        }
    }

    /// Wait for a container to finish and return its exit code
    async fn wait_for_container(&self, name: &str) -> Result<i32> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };

        let mut stream = self.docker.wait_container(name, Some(options));

        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code as i32),
            // Non-zero exits surface as a wait error carrying the code
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code as i32),
            Some(Err(e)) => Err(e.into()),
            None => Err(Error::Container("Container wait stream ended".to_string())),
        }
    }

    /// Read container logs: combined output in arrival order, plus stderr alone
    async fn get_container_logs(&self, name: &str) -> Result<(String, String)> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            ..Default::default()
        };

        let mut stream = self.docker.logs(name, Some(options));

        let mut logs = LogCollector::default();

        while let Some(result) = stream.next().await {
            logs.push(result?);
        }

        Ok(logs.finish())
    }

    /// Force-remove a container; failures are logged and swallowed
    async fn remove_container(&self, name: &str) {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        match self.docker.remove_container(name, Some(options)).await {
            Ok(()) => debug!("Removed container: {}", name),
            Err(e) => debug!("Failed to remove container {}: {}", name, e),
        }
    }
}

/// Accumulates log frames; each stream has its own decoder so a character
/// split across frames is reassembled
#[derive(Default)]
struct LogCollector {
    stdout: Utf8Decoder,
    stderr: Utf8Decoder,
    combined: String,
    stderr_text: String,
}

impl LogCollector {
    fn push(&mut self, frame: LogOutput) {
        match frame {
            LogOutput::StdOut { message } | LogOutput::Console { message } => {
                self.combined.push_str(&self.stdout.decode(&message));
            }
            LogOutput::StdErr { message } => {
                let text = self.stderr.decode(&message);
                self.combined.push_str(&text);
                self.stderr_text.push_str(&text);
            }
            LogOutput::StdIn { .. } => {}
        }
    }

    /// Combined output in arrival order, plus stderr alone
    fn finish(mut self) -> (String, String) {
        self.combined.push_str(&self.stdout.finish());
        let rest = self.stderr.finish();
        self.combined.push_str(&rest);
        self.stderr_text.push_str(&rest);
        (self.combined, self.stderr_text)
    }
}

#[async_trait]
impl BatchRunner for ContainerRunner {
    fn name(&self) -> &str {
        "container"
    }

    fn supports_language(&self, language: Language) -> bool {
        language == Language::Python
    }

    async fn run(&self, code: &str, timeout: Duration, language: Language) -> Result<ExecutionResult> {
        if !self.supports_language(language) {
            return Err(Error::InvalidInput(format!(
                "Container sandbox does not run {}",
                language
            )));
        }

        let name = self.container_name();
        let outcome = self.execute_in(&name, code, timeout).await;
        self.remove_container(&name).await;
        outcome
    }
}
