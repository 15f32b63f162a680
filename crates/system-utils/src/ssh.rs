use std::path::Path;
use std::process::ExitStatus;

use tokio::process::Command;

/// Remote machines are always reached as this user.
pub const SSH_USER: &str = "root";
pub const SSH_PROGRAM: &str = "ssh";
pub const SCP_PROGRAM: &str = "scp";

pub fn destination(address: &str) -> String {
    format!("{SSH_USER}@{address}")
}

/// `<program> [ssh_args] root@<address> <remote_cmd>`, normally with
/// [`SSH_PROGRAM`].
///
/// `remote_cmd` is handed to the remote login shell as a single string and is
/// interpreted there.
pub fn ssh_command(program: &str, address: &str, ssh_args: &[String], remote_cmd: &str) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(ssh_args);
    cmd.arg(destination(address));
    cmd.arg(remote_cmd);
    cmd
}

/// `<program> [ssh_args] <local> root@<address>:` (lands in the remote home
/// directory), normally with [`SCP_PROGRAM`].
pub fn scp_command(program: &str, address: &str, ssh_args: &[String], local: &Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(ssh_args);
    cmd.arg(local);
    cmd.arg(format!("{}:", destination(address)));
    cmd
}

pub fn format_failure(label: &str, status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    let detail = format!("{}{}", stdout, stderr).trim().to_string();
    let code = match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    };
    let mut message = if detail.is_empty() {
        format!("{label} failed ({code})")
    } else {
        format!("{label} failed ({code}): {detail}")
    };
    if let Some(hint) = auth_hint(&detail) {
        message.push('\n');
        message.push_str(hint);
    }
    message
}

fn auth_hint(detail: &str) -> Option<&'static str> {
    let detail = detail.to_lowercase();
    if detail.contains("host key verification failed") {
        return Some("ssh rejected the host key. Check ~/.ssh/known_hosts for a stale entry.");
    }
    if detail.contains("permission denied")
        || detail.contains("authentication failed")
        || detail.contains("no supported authentication methods available")
        || detail.contains("too many authentication failures")
    {
        return Some(
            "ssh authentication failed. Load a key for root into your ssh agent or ~/.ssh/config.",
        );
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::os::unix::process::ExitStatusExt;

    fn program_and_args(cmd: &Command) -> (String, Vec<String>) {
        let std = cmd.as_std();
        let program = lossy(std.get_program());
        let args = std.get_args().map(lossy).collect();
        (program, args)
    }

    fn lossy(value: &OsStr) -> String {
        value.to_string_lossy().to_string()
    }

    #[test]
    fn ssh_command_targets_root() {
        let cmd = ssh_command(SSH_PROGRAM, "1.2.3.4", &[], "docker ps --no-trunc");
        let (program, args) = program_and_args(&cmd);
        assert_eq!(program, "ssh");
        assert_eq!(args, vec!["root@1.2.3.4", "docker ps --no-trunc"]);
    }

    #[test]
    fn ssh_args_precede_destination() {
        let extra = vec!["-p".to_string(), "2222".to_string()];
        let cmd = ssh_command(SSH_PROGRAM, "1.2.3.4", &extra, "ls -l");
        let (_, args) = program_and_args(&cmd);
        assert_eq!(args, vec!["-p", "2222", "root@1.2.3.4", "ls -l"]);
    }

    #[test]
    fn scp_command_copies_into_home() {
        let cmd = scp_command(SCP_PROGRAM, "1.2.3.4", &[], Path::new("/tmp/app-v1.tar.gz"));
        let (program, args) = program_and_args(&cmd);
        assert_eq!(program, "scp");
        assert_eq!(args, vec!["/tmp/app-v1.tar.gz", "root@1.2.3.4:"]);
    }

    #[test]
    fn failure_includes_detail_and_hint() {
        let status = ExitStatus::from_raw(255 << 8);
        let stderr = b"root@1.2.3.4: Permission denied (publickey).\n";
        let message = format_failure("ssh", status, b"", stderr);
        assert!(message.starts_with("ssh failed (exit code 255): root@1.2.3.4: Permission denied"));
        assert!(message.contains("ssh authentication failed"));
    }

    #[test]
    fn failure_without_output() {
        let status = ExitStatus::from_raw(1 << 8);
        assert_eq!(format_failure("scp", status, b"", b""), "scp failed (exit code 1)");
    }
}
