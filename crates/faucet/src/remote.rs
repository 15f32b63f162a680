use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use fleet::RemoteTarget;
use system_utils::process::{run_captured, run_interactive};
use system_utils::ssh::{
    format_failure, scp_command, ssh_command, SCP_PROGRAM, SSH_PROGRAM,
};
use tracing::debug;

use crate::error::{DeployError, DeployResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ExecMode {
    /// Remote session is wired to this terminal; nothing is captured.
    Interactive,
    /// Remote stdout is collected and returned.
    Captured,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Invocation {
    program: String,
    args: Vec<String>,
}

/// A remote shell command kept as discrete words until it is sent.
///
/// Words are joined with single spaces and chained invocations with ` && `.
/// Nothing is quoted: a word containing spaces or shell metacharacters is
/// interpreted by the remote shell as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RemoteCommand {
    steps: Vec<Invocation>,
}

impl RemoteCommand {
    pub(crate) fn new(program: impl Into<String>) -> Self {
        Self {
            steps: vec![Invocation {
                program: program.into(),
                args: Vec::new(),
            }],
        }
    }

    pub(crate) fn arg(mut self, arg: impl Into<String>) -> Self {
        if let Some(step) = self.steps.last_mut() {
            step.args.push(arg.into());
        }
        self
    }

    pub(crate) fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Starts another invocation that only runs if the previous one succeeded.
    pub(crate) fn and_then(mut self, program: impl Into<String>) -> Self {
        self.steps.push(Invocation {
            program: program.into(),
            args: Vec::new(),
        });
        self
    }

    pub(crate) fn render(&self) -> String {
        self.steps
            .iter()
            .map(|step| {
                let mut words = Vec::with_capacity(step.args.len() + 1);
                words.push(step.program.as_str());
                words.extend(step.args.iter().map(String::as_str));
                words.join(" ")
            })
            .collect::<Vec<_>>()
            .join(" && ")
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[async_trait]
pub(crate) trait RemoteShell: Send + Sync {
    /// Runs `command` on the target. Captured mode returns remote stdout.
    async fn run(
        &self,
        target: &RemoteTarget,
        command: &RemoteCommand,
        mode: ExecMode,
    ) -> DeployResult<Option<String>>;

    /// Copies a local file into the target's home directory.
    async fn copy(&self, target: &RemoteTarget, local: &Path) -> DeployResult<()>;
}

pub(crate) struct SshShell {
    ssh_program: String,
    scp_program: String,
    ssh_args: Vec<String>,
}

impl SshShell {
    pub(crate) fn new(ssh_args: Vec<String>) -> Self {
        Self::with_programs(SSH_PROGRAM, SCP_PROGRAM, ssh_args)
    }

    pub(crate) fn with_programs(
        ssh_program: impl Into<String>,
        scp_program: impl Into<String>,
        ssh_args: Vec<String>,
    ) -> Self {
        Self {
            ssh_program: ssh_program.into(),
            scp_program: scp_program.into(),
            ssh_args,
        }
    }
}

#[async_trait]
impl RemoteShell for SshShell {
    async fn run(
        &self,
        target: &RemoteTarget,
        command: &RemoteCommand,
        mode: ExecMode,
    ) -> DeployResult<Option<String>> {
        let rendered = command.render();
        let exec_error = |message: String| DeployError::Exec {
            machine: target.machine_name.clone(),
            command: rendered.clone(),
            message,
        };
        debug!(
            event = "remote.exec",
            machine = %target.machine_name,
            command = %rendered,
            mode = ?mode,
            "running remote command"
        );
        let mut cmd = ssh_command(&self.ssh_program, &target.address, &self.ssh_args, &rendered);
        match mode {
            ExecMode::Interactive => {
                let output = run_interactive(&mut cmd, "ssh")
                    .await
                    .map_err(|err| exec_error(format!("{err:#}")))?;
                if !output.status.success() {
                    return Err(exec_error(format_failure(
                        "ssh",
                        output.status,
                        b"",
                        &output.stderr,
                    )));
                }
                Ok(None)
            }
            ExecMode::Captured => {
                let output = run_captured(&mut cmd, "ssh")
                    .await
                    .map_err(|err| exec_error(format!("{err:#}")))?;
                if !output.status.success() {
                    return Err(exec_error(format_failure(
                        "ssh",
                        output.status,
                        &output.stdout,
                        &output.stderr,
                    )));
                }
                let stdout = String::from_utf8_lossy(&output.stdout);
                Ok(Some(stdout.trim_end().to_string()))
            }
        }
    }

    async fn copy(&self, target: &RemoteTarget, local: &Path) -> DeployResult<()> {
        let transfer_error = |message: String| DeployError::Transfer {
            file: local.display().to_string(),
            machine: target.machine_name.clone(),
            message,
        };
        debug!(
            event = "remote.copy",
            machine = %target.machine_name,
            file = %local.display(),
            "copying file"
        );
        let mut cmd = scp_command(&self.scp_program, &target.address, &self.ssh_args, local);
        let output = run_interactive(&mut cmd, "scp")
            .await
            .map_err(|err| transfer_error(format!("{err:#}")))?;
        if !output.status.success() {
            return Err(transfer_error(format_failure(
                "scp",
                output.status,
                b"",
                &output.stderr,
            )));
        }
        Ok(())
    }
}
